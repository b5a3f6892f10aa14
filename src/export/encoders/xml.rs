//! RSS形式のXMLエンコーダー
//!
//! `<rss><channel>` の下にヘッダーと課題ごとの `<item>` を持つ1つの文書を作る。
//! 値の無い要素や空のグループは出力しない。

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::format_jira_datetime;

use super::super::record::{IssueRecord, NamedRecord, UserRecord};
use super::{EncodeContext, FormatEncoder};

const CHANNEL_TITLE: &str = "JIRA Export";

pub struct XmlEncoder {
    writer: Writer<Vec<u8>>,
    written: usize,
}

impl XmlEncoder {
    /// 宣言とチャンネルヘッダーを書き出した状態で作成
    pub fn new(context: &EncodeContext<'_>) -> Result<Self> {
        let mut encoder = Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
            written: 0,
        };

        encoder.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        encoder.start("rss", &[("version", "0.92")])?;
        encoder.start("channel", &[])?;
        encoder.leaf("title", CHANNEL_TITLE)?;
        encoder.leaf(
            "description",
            &format!("An XML representation of {} issues", context.issues.len()),
        )?;
        encoder.leaf("language", "en-us")?;
        encoder.start("build-info", &[])?;
        encoder.leaf("version", env!("CARGO_PKG_VERSION"))?;
        encoder.leaf("build-date", &format_jira_datetime(&context.export_date))?;
        encoder.end("build-info")?;

        Ok(encoder)
    }

    fn emit(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::Encoding(format!("XML: {}", e)))
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let mut element = BytesStart::new(name);
        for attr in attrs {
            element.push_attribute(*attr);
        }
        self.emit(Event::Start(element))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.emit(Event::End(BytesEnd::new(name)))
    }

    /// 属性とテキストを持つ要素。テキストが空なら空要素として書く。
    fn element(&mut self, name: &str, attrs: &[(&str, &str)], text: Option<&str>) -> Result<()> {
        match text.filter(|t| !t.is_empty()) {
            Some(text) => {
                self.start(name, attrs)?;
                self.emit(Event::Text(BytesText::new(text)))?;
                self.end(name)
            }
            None => {
                let mut element = BytesStart::new(name);
                for attr in attrs {
                    element.push_attribute(*attr);
                }
                self.emit(Event::Empty(element))
            }
        }
    }

    /// テキストのみの要素
    fn leaf(&mut self, name: &str, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.element(name, &[], Some(text))
    }

    fn optional_leaf(&mut self, name: &str, text: Option<&str>) -> Result<()> {
        match text {
            Some(text) => self.leaf(name, text),
            None => Ok(()),
        }
    }

    fn user(&mut self, name: &str, user: Option<&UserRecord>) -> Result<()> {
        let Some(user) = user else {
            return Ok(());
        };
        let attrs: Vec<(&str, &str)> = user
            .username
            .as_deref()
            .map(|u| vec![("username", u)])
            .unwrap_or_default();
        self.element(name, &attrs, Some(user.display_name.as_str()))
    }

    /// 複数値フィールドは要素を繰り返す
    fn repeated(&mut self, name: &str, values: &[NamedRecord]) -> Result<()> {
        for value in values {
            self.element(name, &[("id", value.id.as_str())], Some(value.name.as_str()))?;
        }
        Ok(())
    }

    fn write_item(&mut self, record: &IssueRecord) -> Result<()> {
        self.start("item", &[("id", record.id.as_str())])?;

        self.leaf("title", &format!("[{}] {}", record.key, record.summary))?;
        self.leaf("key", record.key.as_str())?;
        self.leaf("summary", record.summary.as_str())?;
        self.optional_leaf("description", record.description.as_deref())?;
        self.optional_leaf("type", record.issue_type.as_deref())?;
        if let Some(project) = &record.project {
            self.element("project", &[("key", project.key.as_str())], Some(project.name.as_str()))?;
        }
        self.optional_leaf("status", record.status.as_deref())?;
        self.optional_leaf("priority", record.priority.as_deref())?;
        self.optional_leaf("resolution", record.resolution.as_deref())?;
        self.user("assignee", record.assignee.as_ref())?;
        self.user("reporter", record.reporter.as_ref())?;
        self.leaf("created", record.created.as_str())?;
        self.leaf("updated", record.updated.as_str())?;
        self.optional_leaf("resolved", record.resolution_date.as_deref())?;

        if !record.labels.is_empty() {
            self.start("labels", &[])?;
            for label in &record.labels {
                self.leaf("label", label)?;
            }
            self.end("labels")?;
        }
        self.repeated("component", &record.components)?;
        self.repeated("fixVersion", &record.fix_versions)?;
        self.repeated("version", &record.versions)?;

        if let Some(parent) = &record.parent {
            self.start("parent", &[("id", parent.id.as_str())])?;
            self.leaf("key", parent.key.as_str())?;
            self.leaf("summary", parent.summary.as_str())?;
            self.end("parent")?;
        }

        self.write_sections(record)?;

        self.end("item")
    }

    fn write_sections(&mut self, record: &IssueRecord) -> Result<()> {
        if let Some(comments) = record.comments.as_ref().filter(|c| !c.is_empty()) {
            let total = comments.len().to_string();
            self.start("comments", &[("total", total.as_str())])?;
            for comment in comments {
                let mut attrs = vec![("id", comment.id.as_str()), ("created", comment.created.as_str())];
                if let Some(author) = &comment.author {
                    attrs.push(("author", author.as_str()));
                }
                if let Some(updated) = &comment.updated {
                    attrs.push(("updated", updated.as_str()));
                }
                self.element("comment", &attrs, Some(comment.body.as_str()))?;
            }
            self.end("comments")?;
        }

        if let Some(attachments) = record.attachments.as_ref().filter(|a| !a.is_empty()) {
            let total = attachments.len().to_string();
            self.start("attachments", &[("total", total.as_str())])?;
            for attachment in attachments {
                let size = attachment.size.to_string();
                let mut attrs = vec![
                    ("id", attachment.id.as_str()),
                    ("name", attachment.filename.as_str()),
                    ("size", size.as_str()),
                    ("created", attachment.created.as_str()),
                ];
                if let Some(mime_type) = &attachment.mime_type {
                    attrs.push(("mimeType", mime_type.as_str()));
                }
                if let Some(author) = &attachment.author {
                    attrs.push(("author", author.as_str()));
                }
                self.element("attachment", &attrs, attachment.content.as_deref())?;
            }
            self.end("attachments")?;
        }

        if let Some(worklogs) = record.worklogs.as_ref().filter(|w| !w.is_empty()) {
            let total = worklogs.len().to_string();
            self.start("worklogs", &[("total", total.as_str())])?;
            for worklog in worklogs {
                self.start("worklog", &[("id", worklog.id.as_str())])?;
                self.optional_leaf("author", worklog.author.as_deref())?;
                self.optional_leaf("timeSpent", worklog.time_spent.as_deref())?;
                self.leaf("timeSpentSeconds", &worklog.time_spent_seconds.to_string())?;
                self.leaf("started", worklog.started.as_str())?;
                self.optional_leaf("comment", worklog.comment.as_deref())?;
                self.end("worklog")?;
            }
            self.end("worklogs")?;
        }

        if let Some(subtasks) = record.subtasks.as_ref().filter(|s| !s.is_empty()) {
            let total = subtasks.len().to_string();
            self.start("subtasks", &[("total", total.as_str())])?;
            for subtask in subtasks {
                self.start("subtask", &[("id", subtask.id.as_str())])?;
                self.leaf("key", subtask.key.as_str())?;
                self.leaf("summary", subtask.summary.as_str())?;
                self.optional_leaf("status", subtask.status.as_deref())?;
                self.optional_leaf("type", subtask.issue_type.as_deref())?;
                self.end("subtask")?;
            }
            self.end("subtasks")?;
        }

        if let Some(links) = record.links.as_ref().filter(|l| !l.is_empty()) {
            let total = links.len().to_string();
            self.start("issuelinks", &[("total", total.as_str())])?;
            for link in links {
                let mut attrs = vec![
                    ("type", link.link_type.name.as_str()),
                    ("inward", link.link_type.inward.as_str()),
                    ("outward", link.link_type.outward.as_str()),
                    ("direction", link.direction.as_str()),
                ];
                if let Some(id) = &link.id {
                    attrs.insert(0, ("id", id.as_str()));
                }
                match &link.linked_issue {
                    Some(linked) => {
                        self.start("issuelink", &attrs)?;
                        self.element("issuekey", &[], Some(linked.key.as_str()))?;
                        self.leaf("summary", linked.summary.as_str())?;
                        self.end("issuelink")?;
                    }
                    None => self.element("issuelink", &attrs, None)?,
                }
            }
            self.end("issuelinks")?;
        }

        if let Some(custom_fields) = &record.custom_fields {
            let written: Vec<(&str, Vec<String>)> = custom_fields
                .iter()
                .map(|field| (field.key.as_str(), xml_values(&field.value)))
                .filter(|(_, values)| !values.is_empty())
                .collect();
            if !written.is_empty() {
                let total = written.len().to_string();
                self.start("customfields", &[("total", total.as_str())])?;
                for (key, values) in &written {
                    self.start("customfield", &[("key", *key)])?;
                    for value in values {
                        self.leaf("customfieldvalue", value)?;
                    }
                    self.end("customfield")?;
                }
                self.end("customfields")?;
            }
        }

        Ok(())
    }
}

/// 正規化済みの値をXMLテキストの列へ変換（配列は要素ごと）
fn xml_values(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(xml_values).collect(),
        other => vec![other.to_string()],
    }
}

impl FormatEncoder for XmlEncoder {
    fn push(&mut self, record: IssueRecord) -> Result<()> {
        self.write_item(&record)?;
        self.written += 1;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<Vec<u8>> {
        self.end("channel")?;
        self.end("rss")?;
        let written = self.written;
        let bytes = self.writer.into_inner();
        debug!("Encoded {} issues as XML ({} bytes)", written, bytes.len());
        Ok(bytes)
    }
}
