use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::format_jira_datetime;

use super::super::record::IssueRecord;
use super::{EncodeContext, FormatEncoder};

/// JSON出力の形式バージョン
pub const JSON_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    export_date: String,
    total_issues: usize,
    format: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct JsonDocument {
    metadata: Metadata,
    issues: Vec<IssueRecord>,
}

/// `metadata` と `issues` 配列からなる整形済みJSONを生成する
pub struct JsonEncoder {
    metadata: Metadata,
    issues: Vec<IssueRecord>,
}

impl JsonEncoder {
    pub fn new(context: &EncodeContext<'_>) -> Self {
        Self {
            metadata: Metadata {
                export_date: format_jira_datetime(&context.export_date),
                total_issues: context.issues.len(),
                format: "json",
                version: JSON_FORMAT_VERSION,
            },
            issues: Vec::with_capacity(context.issues.len()),
        }
    }
}

impl FormatEncoder for JsonEncoder {
    fn push(&mut self, record: IssueRecord) -> Result<()> {
        self.issues.push(record);
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>> {
        let count = self.issues.len();
        let document = JsonDocument {
            metadata: self.metadata,
            issues: self.issues,
        };
        // to_string_pretty は2スペースインデント
        let text = serde_json::to_string_pretty(&document)
            .map_err(|e| Error::Encoding(format!("JSON: {}", e)))?;
        debug!("Encoded {} issues as JSON ({} bytes)", count, text.len());
        Ok(text.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::config::ExportConfig;
    use crate::export::record::project;
    use crate::models::Issue;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    fn issue(key: &str) -> Issue {
        serde_json::from_value(json!({
            "id": "1",
            "key": key,
            "fields": {
                "summary": format!("Summary of {}", key),
                "created": "2024-01-01T00:00:00.000Z",
                "updated": "2024-01-01T00:00:00.000Z",
                "components": [{"id": "5", "name": "UI"}]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_json_document_shape() {
        // Given: 2件の課題
        let issues = vec![issue("A-1"), issue("A-2")];
        let config = ExportConfig::default();
        let context = EncodeContext {
            config: &config,
            issues: &issues,
            export_date: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        };
        let mut encoder = Box::new(JsonEncoder::new(&context));

        // When: エンコード
        for i in &issues {
            encoder.push(project(i, &config).unwrap()).unwrap();
        }
        let text = String::from_utf8(encoder.finish().unwrap()).unwrap();

        // Then: 2スペースインデントのmetadata + issues
        assert!(text.starts_with("{\n  \"metadata\": {\n    \"exportDate\""));
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["metadata"]["totalIssues"], 2);
        assert_eq!(value["metadata"]["format"], "json");
        assert_eq!(value["metadata"]["exportDate"], "2024-05-01T00:00:00.000Z");
        assert_eq!(value["issues"][1]["key"], "A-2");
        assert_eq!(value["issues"][0]["components"][0]["name"], "UI");
        // 値の無いリレーションは明示的なnull
        assert_eq!(value["issues"][0]["priority"], Value::Null);
        assert!(value["issues"][0].get("comments").is_none());
    }
}
