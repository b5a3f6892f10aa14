//! 形式別エンコーダー
//!
//! 各エンコーダーは1回のエクスポート実行ごとに新しく生成され、
//! [`IssueRecord`] を入力順に受け取って最後に1つの文書へ直列化する。

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::Issue;

use super::config::{ExportConfig, ExportFormat};
use super::record::IssueRecord;

pub mod csv;
pub mod json;
pub mod xml;

pub use self::csv::CsvEncoder;
pub use self::json::JsonEncoder;
pub use self::xml::XmlEncoder;

/// 中間レコードを1つの文書へ直列化するエンコーダー
pub trait FormatEncoder: Send {
    /// レコードを1件追加（入力順を保持する）
    fn push(&mut self, record: IssueRecord) -> Result<()>;

    /// 文書を完成させてバイト列を返す
    fn finish(self: Box<Self>) -> Result<Vec<u8>>;
}

/// エンコーダーが文書全体について知っておく情報
#[derive(Debug, Clone)]
pub struct EncodeContext<'a> {
    pub config: &'a ExportConfig,
    /// 課題一覧全体（ヘッダーの件数や列構成の決定に使う）
    pub issues: &'a [Issue],
    pub export_date: DateTime<Utc>,
}

/// 形式に対応するエンコーダーを生成
pub fn encoder_for(format: ExportFormat, context: &EncodeContext<'_>) -> Result<Box<dyn FormatEncoder>> {
    Ok(match format {
        ExportFormat::Xml => Box::new(XmlEncoder::new(context)?),
        ExportFormat::Json => Box::new(JsonEncoder::new(context)),
        ExportFormat::Csv => Box::new(CsvEncoder::new(context)?),
    })
}
