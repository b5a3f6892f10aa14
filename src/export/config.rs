use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// エクスポート形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Xml,
    Json,
    Csv,
}

impl ExportFormat {
    /// ファイル拡張子
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xml => "xml",
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    /// 成果物のMIMEタイプ
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Xml => "application/xml;charset=utf-8",
            ExportFormat::Json => "application/json;charset=utf-8",
            ExportFormat::Csv => "text/csv;charset=utf-8",
        }
    }

    /// 進捗メッセージ用の表示名
    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Xml => "XML",
            ExportFormat::Json => "JSON",
            ExportFormat::Csv => "CSV",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" => Ok(ExportFormat::Xml),
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

/// エクスポート設定
///
/// 永続化層から渡される形そのままを受けるため、`format` は文字列で保持し
/// エクスポート開始時に [`ExportConfig::format`] で検証する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportConfig {
    /// 出力形式（`xml` / `json` / `csv`）
    pub format: String,
    /// コメントを含める
    pub include_comments: bool,
    /// 添付ファイルを含める
    pub include_attachments: bool,
    /// 作業ログを含める
    pub include_worklog: bool,
    /// サブタスクを含める
    pub include_subtasks: bool,
    /// 課題リンクを含める
    pub include_links: bool,
    /// カスタムフィールドを含める
    pub include_custom_fields: bool,
    /// 出力するカスタムフィールドのキー（この順序で出力される）
    pub custom_fields: Vec<String>,
}

impl ExportConfig {
    /// 指定形式・全セクション無効の設定を作成
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format: format.extension().to_string(),
            ..Self::default()
        }
    }

    /// 保存済みのJSON設定を読み込む
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// 出力形式を検証して返す
    pub fn format(&self) -> Result<ExportFormat> {
        self.format.parse()
    }

    pub fn include_comments(mut self, enabled: bool) -> Self {
        self.include_comments = enabled;
        self
    }

    pub fn include_attachments(mut self, enabled: bool) -> Self {
        self.include_attachments = enabled;
        self
    }

    pub fn include_worklog(mut self, enabled: bool) -> Self {
        self.include_worklog = enabled;
        self
    }

    pub fn include_subtasks(mut self, enabled: bool) -> Self {
        self.include_subtasks = enabled;
        self
    }

    pub fn include_links(mut self, enabled: bool) -> Self {
        self.include_links = enabled;
        self
    }

    /// カスタムフィールドを有効化し、出力するキーを設定
    pub fn custom_fields(mut self, keys: Vec<String>) -> Self {
        self.include_custom_fields = true;
        self.custom_fields = keys;
        self
    }

    /// 実際に出力対象となるカスタムフィールドのキー
    pub fn selected_custom_fields(&self) -> &[String] {
        if self.include_custom_fields {
            &self.custom_fields
        } else {
            &[]
        }
    }

    /// この設定でのエクスポートに必要な検索フィールド一覧
    pub fn search_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = [
            "summary",
            "description",
            "issuetype",
            "project",
            "status",
            "priority",
            "resolution",
            "assignee",
            "reporter",
            "created",
            "updated",
            "resolutiondate",
            "labels",
            "components",
            "fixVersions",
            "versions",
            "parent",
        ]
        .iter()
        .map(|f| f.to_string())
        .collect();

        let optional = [
            (self.include_comments, "comment"),
            (self.include_attachments, "attachment"),
            (self.include_worklog, "worklog"),
            (self.include_subtasks, "subtasks"),
            (self.include_links, "issuelinks"),
        ];
        fields.extend(
            optional
                .iter()
                .filter(|(enabled, _)| *enabled)
                .map(|(_, name)| name.to_string()),
        );
        fields.extend(self.selected_custom_fields().iter().cloned());
        fields
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Json.extension().to_string(),
            include_comments: false,
            include_attachments: false,
            include_worklog: false,
            include_subtasks: false,
            include_links: false,
            include_custom_fields: false,
            custom_fields: Vec::new(),
        }
    }
}
