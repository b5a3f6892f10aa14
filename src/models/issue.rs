use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::serde_helpers::{jira_datetime, null_as_default};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub key: String,
    #[serde(rename = "self")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_url: Option<String>,
    pub fields: IssueFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<serde_json::Value>, // Server版は文字列、Cloud版はADF形式のオブジェクト
    #[serde(rename = "issuetype")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<IssueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<User>,
    #[serde(with = "jira_datetime")]
    pub created: DateTime<Utc>,
    #[serde(with = "jira_datetime")]
    pub updated: DateTime<Utc>,
    #[serde(rename = "resolutiondate")]
    #[serde(default, with = "jira_datetime::option", skip_serializing_if = "Option::is_none")]
    pub resolution_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub components: Vec<Component>,
    #[serde(rename = "fixVersions")]
    #[serde(default, deserialize_with = "null_as_default")]
    pub fix_versions: Vec<Version>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub versions: Vec<Version>,

    // 任意のリレーション
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<CommentPage>,
    #[serde(rename = "attachment")]
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worklog: Option<WorklogPage>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtasks: Vec<IssueRef>,
    #[serde(rename = "issuelinks")]
    #[serde(default, deserialize_with = "null_as_default")]
    pub issue_links: Vec<IssueLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<IssueRef>,

    // カスタムフィールド（customfield_NNNNN）は動的に追加
    #[serde(flatten)]
    pub custom_fields: HashMap<String, serde_json::Value>,
}

impl IssueFields {
    /// コメント一覧（`fields.comment` が無い場合は空）
    pub fn comments(&self) -> &[Comment] {
        self.comment.as_ref().map(|c| c.comments.as_slice()).unwrap_or(&[])
    }

    /// 作業ログ一覧（`fields.worklog` が無い場合は空）
    pub fn worklogs(&self) -> &[Worklog] {
        self.worklog.as_ref().map(|w| w.worklogs.as_slice()).unwrap_or(&[])
    }
}

use super::{
    Attachment, Comment, CommentPage, Component, IssueLink, IssueRef, IssueType, Priority,
    Project, Resolution, Status, User, Version, Worklog, WorklogPage,
};
