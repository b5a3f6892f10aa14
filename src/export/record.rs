//! 課題フィールドの射影
//!
//! 1件の [`Issue`] とエクスポート設定から、形式に依存しない中間レコード
//! [`IssueRecord`] を生成する。各エンコーダーはこのレコードだけを参照する。

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{format_jira_datetime, Issue, IssueLink, IssueRef, User};

use super::config::ExportConfig;

/// 形式非依存の中間レコード
///
/// 任意セクションは `Option` で表し、設定で無効なセクションは `None`（出力から除外）、
/// 有効だがデータが無い場合は空の `Vec` になる。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRecord {
    pub id: String,
    pub key: String,
    pub summary: String,
    pub description: Option<String>,
    pub issue_type: Option<String>,
    pub project: Option<ProjectRecord>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub resolution: Option<String>,
    pub assignee: Option<UserRecord>,
    pub reporter: Option<UserRecord>,
    pub created: String,
    pub updated: String,
    pub resolution_date: Option<String>,
    pub labels: Vec<String>,
    pub components: Vec<NamedRecord>,
    pub fix_versions: Vec<NamedRecord>,
    pub versions: Vec<NamedRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<AttachmentRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worklogs: Option<Vec<WorklogRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<SubtaskRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<LinkRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<CustomFields>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectRecord {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub display_name: String,
    pub username: Option<String>,
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParentRecord {
    pub id: String,
    pub key: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: String,
    pub author: Option<String>,
    pub body: String,
    pub created: String,
    pub updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRecord {
    pub id: String,
    pub filename: String,
    pub size: u64,
    pub mime_type: Option<String>,
    pub author: Option<String>,
    pub created: String,
    /// 添付本体の参照。XMLのみが出力する。
    #[serde(skip)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorklogRecord {
    pub id: String,
    pub author: Option<String>,
    pub time_spent: Option<String>,
    pub time_spent_seconds: u64,
    pub started: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskRecord {
    pub id: String,
    pub key: String,
    pub summary: String,
    pub status: Option<String>,
    pub issue_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkDirection {
    Outward,
    Inward,
}

impl LinkDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkDirection::Outward => "outward",
            LinkDirection::Inward => "inward",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub link_type: LinkTypeRecord,
    pub linked_issue: Option<LinkedIssueRecord>,
    pub direction: LinkDirection,
}

impl LinkRecord {
    /// リンク方向に応じた関係の表現（"blocks" / "is blocked by" など）
    pub fn relation(&self) -> &str {
        match self.direction {
            LinkDirection::Outward => &self.link_type.outward,
            LinkDirection::Inward => &self.link_type.inward,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkTypeRecord {
    pub name: String,
    pub inward: String,
    pub outward: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedIssueRecord {
    pub key: String,
    pub summary: String,
}

/// 正規化済みカスタムフィールド1件
#[derive(Debug, Clone, PartialEq)]
pub struct CustomFieldValue {
    pub key: String,
    pub value: Value,
}

/// 設定順に並んだカスタムフィールド。JSONではオブジェクトとして出力される。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomFields(pub Vec<CustomFieldValue>);

impl CustomFields {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|f| f.key == key).map(|f| &f.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CustomFieldValue> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for CustomFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for field in &self.0 {
            map.serialize_entry(&field.key, &field.value)?;
        }
        map.end()
    }
}

/// 1件の課題を設定に従って中間レコードへ射影する
pub fn project(issue: &Issue, config: &ExportConfig) -> Result<IssueRecord> {
    let fields = &issue.fields;

    let description = match &fields.description {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        // ADF形式などの構造化された説明はJSON文字列として保持
        Some(other) => Some(serde_json::to_string(other).map_err(|e| Error::Projection {
            key: issue.key.clone(),
            message: format!("description: {}", e),
        })?),
    };

    let comments = config.include_comments.then(|| {
        fields
            .comments()
            .iter()
            .map(|c| CommentRecord {
                id: c.id.clone(),
                author: display_name(c.author.as_ref()),
                body: c.body.clone(),
                created: format_jira_datetime(&c.created),
                updated: c.updated.as_ref().map(format_jira_datetime),
            })
            .collect()
    });

    let attachments = config.include_attachments.then(|| {
        fields
            .attachments
            .iter()
            .map(|a| AttachmentRecord {
                id: a.id.clone(),
                filename: a.filename.clone(),
                size: a.size,
                mime_type: a.mime_type.clone(),
                author: display_name(a.author.as_ref()),
                created: format_jira_datetime(&a.created),
                content: a.content.clone(),
            })
            .collect()
    });

    let worklogs = config.include_worklog.then(|| {
        fields
            .worklogs()
            .iter()
            .map(|w| WorklogRecord {
                id: w.id.clone(),
                author: display_name(w.author.as_ref()),
                time_spent: w.time_spent.clone(),
                time_spent_seconds: w.time_spent_seconds,
                started: format_jira_datetime(&w.started),
                comment: w.comment.clone(),
            })
            .collect()
    });

    let subtasks = config
        .include_subtasks
        .then(|| fields.subtasks.iter().map(project_subtask).collect());

    let links = config
        .include_links
        .then(|| fields.issue_links.iter().map(project_link).collect());

    let custom_fields = if config.include_custom_fields {
        Some(project_custom_fields(issue, config)?)
    } else {
        None
    };

    Ok(IssueRecord {
        id: issue.id.clone(),
        key: issue.key.clone(),
        summary: fields.summary.clone(),
        description,
        issue_type: fields.issue_type.as_ref().map(|t| t.name.clone()),
        project: fields.project.as_ref().map(|p| ProjectRecord {
            key: p.key.clone(),
            name: p.name.clone(),
        }),
        status: fields.status.as_ref().map(|s| s.name.clone()),
        priority: fields.priority.as_ref().map(|p| p.name.clone()),
        resolution: fields.resolution.as_ref().map(|r| r.name.clone()),
        assignee: fields.assignee.as_ref().map(project_user),
        reporter: fields.reporter.as_ref().map(project_user),
        created: format_jira_datetime(&fields.created),
        updated: format_jira_datetime(&fields.updated),
        resolution_date: fields.resolution_date.as_ref().map(format_jira_datetime),
        labels: fields.labels.clone(),
        components: fields
            .components
            .iter()
            .map(|c| NamedRecord {
                id: c.id.clone(),
                name: c.name.clone(),
            })
            .collect(),
        fix_versions: fields
            .fix_versions
            .iter()
            .map(|v| NamedRecord {
                id: v.id.clone(),
                name: v.name.clone(),
            })
            .collect(),
        versions: fields
            .versions
            .iter()
            .map(|v| NamedRecord {
                id: v.id.clone(),
                name: v.name.clone(),
            })
            .collect(),
        parent: fields.parent.as_ref().map(|p| ParentRecord {
            id: p.id.clone(),
            key: p.key.clone(),
            summary: p.fields.summary.clone(),
        }),
        comments,
        attachments,
        worklogs,
        subtasks,
        links,
        custom_fields,
    })
}

/// カスタムフィールド値の正規化
///
/// 配列は要素ごとに、オブジェクトは `value` → `name` → `displayName` の順で
/// 最初に見つかった値へ縮約する。いずれも無いオブジェクトはJSON文字列になる。
/// スカラーはそのまま返す。
pub fn normalize_custom_field(value: &Value) -> serde_json::Result<Value> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(reduce_element)
            .collect::<serde_json::Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(_) => reduce_element(value),
        scalar => Ok(scalar.clone()),
    }
}

fn reduce_element(value: &Value) -> serde_json::Result<Value> {
    match value {
        Value::Object(map) => {
            let reduced = ["value", "name", "displayName"]
                .iter()
                .filter_map(|k| map.get(*k))
                .find(|v| is_present(v));
            match reduced {
                Some(v) => Ok(v.clone()),
                None => serde_json::to_string(value).map(Value::String),
            }
        }
        Value::Array(_) => serde_json::to_string(value).map(Value::String),
        scalar => Ok(scalar.clone()),
    }
}

/// 空文字列・null・false・0 は値として扱わない
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        _ => true,
    }
}

fn project_custom_fields(issue: &Issue, config: &ExportConfig) -> Result<CustomFields> {
    let mut projected = Vec::new();
    for key in config.selected_custom_fields() {
        let Some(raw) = issue.fields.custom_fields.get(key).filter(|v| !v.is_null()) else {
            continue;
        };
        let value = normalize_custom_field(raw).map_err(|e| Error::Projection {
            key: issue.key.clone(),
            message: format!("{}: {}", key, e),
        })?;
        projected.push(CustomFieldValue {
            key: key.clone(),
            value,
        });
    }
    Ok(CustomFields(projected))
}

fn project_user(user: &User) -> UserRecord {
    UserRecord {
        display_name: user.display_name.clone(),
        username: user.username().map(str::to_string),
        email_address: user.email_address.clone(),
    }
}

fn display_name(user: Option<&User>) -> Option<String> {
    user.map(|u| u.display_name.clone())
}

fn project_subtask(subtask: &IssueRef) -> SubtaskRecord {
    SubtaskRecord {
        id: subtask.id.clone(),
        key: subtask.key.clone(),
        summary: subtask.fields.summary.clone(),
        status: subtask.fields.status.as_ref().map(|s| s.name.clone()),
        issue_type: subtask.fields.issue_type.as_ref().map(|t| t.name.clone()),
    }
}

/// outwardIssue を inwardIssue より優先し、どちらも無ければリンク先は `None`
fn project_link(link: &IssueLink) -> LinkRecord {
    let (linked, direction) = match (&link.outward_issue, &link.inward_issue) {
        (Some(outward), _) => (Some(outward), LinkDirection::Outward),
        (None, Some(inward)) => (Some(inward), LinkDirection::Inward),
        (None, None) => (None, LinkDirection::Inward),
    };

    LinkRecord {
        id: link.id.clone(),
        link_type: LinkTypeRecord {
            name: link.link_type.name.clone(),
            inward: link.link_type.inward.clone(),
            outward: link.link_type.outward.clone(),
        },
        linked_issue: linked.map(|issue| LinkedIssueRecord {
            key: issue.key.clone(),
            summary: issue.fields.summary.clone(),
        }),
        direction,
    }
}
