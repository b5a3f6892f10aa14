pub mod client;
pub mod error;
pub mod export;
pub mod models;

pub use client::{Auth, JiraClient, JiraConfig, DEFAULT_PAGE_SIZE};
pub use error::{Error, Result};
pub use models::*;

// Export module re-exports
pub use export::{
    export_filename, normalize_custom_field, project, Artifact, ChannelSink, CustomFieldValue,
    CustomFields, ExportConfig, ExportFormat, ExportService, FnSink, IssueRecord, NoopSink,
    ProgressInfo, ProgressSink, ProgressStage, ProgressTracker, PROGRESS_BATCH_SIZE,
};
