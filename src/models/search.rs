use super::Issue;
use serde::{Deserialize, Serialize};

/// `/rest/api/2/search` のリクエストパラメータ
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchParams {
    #[serde(rename = "startAt")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<u32>,

    #[serde(rename = "maxResults")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(rename = "startAt")]
    #[serde(default)]
    pub start_at: u32,

    #[serde(rename = "maxResults")]
    #[serde(default)]
    pub max_results: u32,

    #[serde(default)]
    pub total: u32,

    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_at(mut self, start_at: u32) -> Self {
        self.start_at = Some(start_at);
        self
    }

    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }
}
