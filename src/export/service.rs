//! エクスポートのオーケストレーション
//!
//! 課題を入力順に射影してエンコーダーへ渡し、一定間隔で進捗を通知する。
//! 処理中のエラーは1件の `error` イベントを出したうえで呼び出し元へ返し、
//! 部分的な成果物は返さない。

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::models::Issue;

use super::config::{ExportConfig, ExportFormat};
use super::encoders::{encoder_for, EncodeContext, FormatEncoder};
use super::progress::{ProgressSink, ProgressTracker, PROGRESS_BATCH_SIZE};
use super::record::project;

/// エクスポートの成果物
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub content: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

impl Artifact {
    /// 内容をUTF-8テキストとして参照
    pub fn as_text(&self) -> Result<&str> {
        std::str::from_utf8(&self.content).map_err(|e| Error::Encoding(e.to_string()))
    }

    /// 指定ディレクトリへファイル名のまま書き出す
    pub async fn write_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.filename);
        tokio::fs::write(&path, &self.content).await?;
        info!("Wrote export artifact to {}", path.display());
        Ok(path)
    }
}

/// `jira-export-<YYYY-MM-DD>.<ext>`
pub fn export_filename(format: ExportFormat, date: &DateTime<Utc>) -> String {
    format!("jira-export-{}.{}", date.format("%Y-%m-%d"), format.extension())
}

/// エクスポート処理の入口
///
/// 内部に可変状態を持たないため、同時に複数のエクスポートを実行しても
/// それぞれが独立したエンコーダーを使う。
#[derive(Debug, Default, Clone)]
pub struct ExportService;

impl ExportService {
    pub fn new() -> Self {
        Self
    }

    /// 課題一覧を設定に従ってエクスポートする
    ///
    /// 未対応の形式は進捗イベントを一切出さずに `UnsupportedFormat` で失敗する。
    pub async fn export(
        &self,
        issues: &[Issue],
        config: &ExportConfig,
        progress: &dyn ProgressSink,
    ) -> Result<Artifact> {
        let format = config.format()?;
        self.execute(issues, config, format, progress, |context| {
            encoder_for(format, context)
        })
        .await
    }

    /// 呼び出し側のキャンセル要求。実行中のループは中断しない。
    pub fn cancel(&self) {
        debug!("Cancel requested; in-flight exports run to completion");
    }

    async fn execute<F>(
        &self,
        issues: &[Issue],
        config: &ExportConfig,
        format: ExportFormat,
        progress: &dyn ProgressSink,
        build_encoder: F,
    ) -> Result<Artifact>
    where
        F: FnOnce(&EncodeContext<'_>) -> Result<Box<dyn FormatEncoder>>,
    {
        let mut tracker = ProgressTracker::new(issues.len());

        info!("Starting {} export of {} issues", format.label(), issues.len());
        let started = Instant::now();

        let result = self
            .run(issues, config, format, &mut tracker, progress, build_encoder)
            .await;

        match result {
            Ok(artifact) => {
                info!(
                    "Export completed: {} issues, {} bytes, {} ms",
                    issues.len(),
                    artifact.content.len(),
                    started.elapsed().as_millis()
                );
                Ok(artifact)
            }
            Err(e) => {
                error!("Export failed: {}", e);
                progress.report(&tracker.error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run<F>(
        &self,
        issues: &[Issue],
        config: &ExportConfig,
        format: ExportFormat,
        tracker: &mut ProgressTracker,
        progress: &dyn ProgressSink,
        build_encoder: F,
    ) -> Result<Artifact>
    where
        F: FnOnce(&EncodeContext<'_>) -> Result<Box<dyn FormatEncoder>>,
    {
        let export_date = tracker.start_time();
        let context = EncodeContext {
            config,
            issues,
            export_date,
        };
        let mut encoder = build_encoder(&context)?;

        for (index, issue) in issues.iter().enumerate() {
            let record = project(issue, config)?;
            encoder.push(record)?;

            let processed = index + 1;
            if processed % PROGRESS_BATCH_SIZE == 0 {
                debug!("Processed {}/{} issues", processed, issues.len());
                progress.report(&tracker.processing(processed));
                tokio::task::yield_now().await;
            }
        }

        progress.report(&tracker.exporting(format.label()));
        tokio::task::yield_now().await;

        let content = encoder.finish()?;

        progress.report(&tracker.complete());

        Ok(Artifact {
            content,
            filename: export_filename(format, &export_date),
            mime_type: format.mime_type().to_string(),
        })
    }
}
