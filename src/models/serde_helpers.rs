use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer};

/// JIRAの日時文字列をパース
///
/// RFC 3339 と JIRA Server 形式（`2024-01-01T10:00:00.000+0000`）の両方を受け付ける。
pub fn parse_jira_datetime(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    match DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        // タイムゾーンなしの場合はUTCとして扱う
        Err(_) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc()),
    }
}

/// エクスポート出力用の日時表現（ミリ秒精度、`Z`サフィックス）
pub fn format_jira_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `null` を型のデフォルト値として扱う
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub mod jira_datetime {
    use super::{format_jira_datetime, parse_jira_datetime};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_jira_datetime(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_jira_datetime(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::{format_jira_datetime, parse_jira_datetime};
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            dt: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => serializer.serialize_some(&format_jira_datetime(dt)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) if !raw.is_empty() => parse_jira_datetime(&raw)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}
