//! 課題一覧のエクスポート
//!
//! - [`record`]: 課題を形式非依存の中間レコードへ射影する
//! - [`encoders`]: XML / JSON / CSV への直列化
//! - [`progress`]: 進捗通知
//! - [`service`]: 上記をまとめるオーケストレーター

pub mod config;
pub mod encoders;
pub mod progress;
pub mod record;
pub mod service;

pub use config::{ExportConfig, ExportFormat};
pub use encoders::{CsvEncoder, EncodeContext, FormatEncoder, JsonEncoder, XmlEncoder};
pub use progress::{
    ChannelSink, FnSink, NoopSink, ProgressInfo, ProgressSink, ProgressStage, ProgressTracker,
    PROGRESS_BATCH_SIZE,
};
pub use record::{normalize_custom_field, project, CustomFieldValue, CustomFields, IssueRecord};
pub use service::{export_filename, Artifact, ExportService};
