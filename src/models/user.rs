use serde::{Deserialize, Serialize};

/// JIRAユーザー
///
/// Server版は `name`/`key`、Cloud版は `accountId` で識別されるため、識別子はすべて任意。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "accountId")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "displayName")]
    #[serde(default)]
    pub display_name: String,
    #[serde(rename = "emailAddress")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(rename = "self")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(rename = "timeZone")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl User {
    /// ログイン名（Server版の `name` を優先し、なければ `accountId`、`key` の順）
    pub fn username(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.account_id.as_deref())
            .or(self.key.as_deref())
    }
}
