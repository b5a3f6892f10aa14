use csv::{QuoteStyle, Writer, WriterBuilder};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

use super::super::record::{IssueRecord, NamedRecord, UserRecord};
use super::{EncodeContext, FormatEncoder};

/// 常に出力される列
pub const CORE_COLUMNS: [&str; 18] = [
    "Issue Key",
    "Issue ID",
    "Summary",
    "Description",
    "Issue Type",
    "Status",
    "Priority",
    "Resolution",
    "Assignee",
    "Reporter",
    "Created",
    "Updated",
    "Project Key",
    "Project Name",
    "Labels",
    "Components",
    "Fix Versions",
    "Affects Versions",
];

const LIST_SEPARATOR: &str = ", ";
const COMMENT_SEPARATOR: &str = " | ";

/// 列構成。ヘッダーを書く前に課題一覧全体と設定から決める。
#[derive(Debug, Clone, PartialEq)]
struct CsvLayout {
    parent: bool,
    comments: bool,
    attachments: bool,
    worklog: bool,
    subtasks: bool,
    links: bool,
    custom_fields: Vec<String>,
}

impl CsvLayout {
    fn from_context(context: &EncodeContext<'_>) -> Self {
        let config = context.config;
        Self {
            parent: context.issues.iter().any(|i| i.fields.parent.is_some()),
            comments: config.include_comments,
            attachments: config.include_attachments,
            worklog: config.include_worklog,
            subtasks: config.include_subtasks,
            links: config.include_links,
            custom_fields: config.selected_custom_fields().to_vec(),
        }
    }

    fn header(&self) -> Vec<String> {
        let mut columns: Vec<String> = CORE_COLUMNS.iter().map(|c| c.to_string()).collect();
        let mut add = |enabled: bool, names: &[&str]| {
            if enabled {
                columns.extend(names.iter().map(|n| n.to_string()));
            }
        };
        add(self.parent, &["Parent Key", "Parent Summary"]);
        add(self.comments, &["Comment Count", "Comments"]);
        add(self.attachments, &["Attachment Count", "Attachments"]);
        add(
            self.worklog,
            &["Worklog Count", "Total Time Spent (seconds)", "Total Time Spent (hours)"],
        );
        add(self.subtasks, &["Subtask Count", "Subtasks"]);
        add(self.links, &["Link Count", "Linked Issues"]);
        columns.extend(self.custom_fields.iter().cloned());
        columns
    }

    fn row(&self, record: &IssueRecord) -> Vec<String> {
        let mut row = vec![
            record.key.clone(),
            record.id.clone(),
            record.summary.clone(),
            text(record.description.as_deref()),
            text(record.issue_type.as_deref()),
            text(record.status.as_deref()),
            text(record.priority.as_deref()),
            text(record.resolution.as_deref()),
            user(record.assignee.as_ref()),
            user(record.reporter.as_ref()),
            record.created.clone(),
            record.updated.clone(),
            record.project.as_ref().map(|p| p.key.clone()).unwrap_or_default(),
            record.project.as_ref().map(|p| p.name.clone()).unwrap_or_default(),
            record.labels.join(LIST_SEPARATOR),
            names(&record.components),
            names(&record.fix_versions),
            names(&record.versions),
        ];

        if self.parent {
            let parent = record.parent.as_ref();
            row.push(parent.map(|p| p.key.clone()).unwrap_or_default());
            row.push(parent.map(|p| p.summary.clone()).unwrap_or_default());
        }

        if self.comments {
            let comments = record.comments.as_deref().unwrap_or(&[]);
            row.push(comments.len().to_string());
            row.push(
                comments
                    .iter()
                    .map(|c| format!("{}: {}", c.author.as_deref().unwrap_or("Unknown"), c.body))
                    .collect::<Vec<_>>()
                    .join(COMMENT_SEPARATOR),
            );
        }

        if self.attachments {
            let attachments = record.attachments.as_deref().unwrap_or(&[]);
            row.push(attachments.len().to_string());
            row.push(
                attachments
                    .iter()
                    .map(|a| a.filename.as_str())
                    .collect::<Vec<_>>()
                    .join(LIST_SEPARATOR),
            );
        }

        if self.worklog {
            let worklogs = record.worklogs.as_deref().unwrap_or(&[]);
            let total_seconds: u64 = worklogs.iter().map(|w| w.time_spent_seconds).sum();
            row.push(worklogs.len().to_string());
            row.push(total_seconds.to_string());
            row.push(hours(total_seconds).to_string());
        }

        if self.subtasks {
            let subtasks = record.subtasks.as_deref().unwrap_or(&[]);
            row.push(subtasks.len().to_string());
            row.push(
                subtasks
                    .iter()
                    .map(|s| s.key.as_str())
                    .collect::<Vec<_>>()
                    .join(LIST_SEPARATOR),
            );
        }

        if self.links {
            let links = record.links.as_deref().unwrap_or(&[]);
            row.push(links.len().to_string());
            row.push(
                links
                    .iter()
                    .filter_map(|l| {
                        l.linked_issue
                            .as_ref()
                            .map(|issue| format!("{} {}", l.relation(), issue.key))
                    })
                    .collect::<Vec<_>>()
                    .join(LIST_SEPARATOR),
            );
        }

        for key in &self.custom_fields {
            let value = record.custom_fields.as_ref().and_then(|c| c.get(key));
            row.push(value.map(cell).unwrap_or_default());
        }

        row
    }
}

/// 秒を時間へ（小数第2位で四捨五入）
fn hours(seconds: u64) -> f64 {
    (seconds as f64 / 3600.0 * 100.0).round() / 100.0
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn user(value: Option<&UserRecord>) -> String {
    value.map(|u| u.display_name.clone()).unwrap_or_default()
}

fn names(values: &[NamedRecord]) -> String {
    values
        .iter()
        .map(|v| v.name.as_str())
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

/// 正規化済みのカスタムフィールド値を1セルの文字列へ
fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join(LIST_SEPARATOR),
        other => other.to_string(),
    }
}

/// 1課題1行のCSV。すべてのフィールドを引用符で囲む。
pub struct CsvEncoder {
    layout: CsvLayout,
    writer: Writer<Vec<u8>>,
    written: usize,
}

impl CsvEncoder {
    /// ヘッダー行を書き出した状態で作成（0件でもヘッダーは出力される）
    pub fn new(context: &EncodeContext<'_>) -> Result<Self> {
        let layout = CsvLayout::from_context(context);
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .from_writer(Vec::new());
        writer.write_record(layout.header())?;
        debug!("CSV layout: {} columns", layout.header().len());

        Ok(Self {
            layout,
            writer,
            written: 0,
        })
    }
}

impl FormatEncoder for CsvEncoder {
    fn push(&mut self, record: IssueRecord) -> Result<()> {
        self.writer.write_record(self.layout.row(&record))?;
        self.written += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>> {
        let written = self.written;
        let bytes = self
            .writer
            .into_inner()
            .map_err(|e| Error::Encoding(format!("CSV: {}", e)))?;
        debug!("Encoded {} issues as CSV ({} bytes)", written, bytes.len());
        Ok(bytes)
    }
}
