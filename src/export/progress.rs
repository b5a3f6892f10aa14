//! エクスポートの進捗通知
//!
//! オーケストレーターは [`ProgressInfo`] を [`ProgressSink`] に投げるだけで、
//! 戻り値を待つことも再送することもない。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

/// 進捗イベントを出すバッチ間隔（処理した課題数）
pub const PROGRESS_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    Fetching,
    Processing,
    Exporting,
    Complete,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInfo {
    pub current: usize,
    pub total: usize,
    /// 0〜100の整数（四捨五入）
    pub percentage: u8,
    pub stage: ProgressStage,
    pub message: String,
    pub start_time: DateTime<Utc>,
    /// 残り時間の推定（秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time_remaining: Option<u64>,
}

/// 進捗イベントの受け手
pub trait ProgressSink: Send + Sync {
    fn report(&self, info: &ProgressInfo);
}

/// 何もしないシンク
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn report(&self, _info: &ProgressInfo) {}
}

/// クロージャをシンクとして使うアダプタ
pub struct FnSink<F>(pub F);

impl<F> ProgressSink for FnSink<F>
where
    F: Fn(&ProgressInfo) + Send + Sync,
{
    fn report(&self, info: &ProgressInfo) {
        (self.0)(info)
    }
}

/// 非同期チャネルへ転送するシンク。受信側が閉じていても送信失敗は無視する。
#[derive(Debug, Clone)]
pub struct ChannelSink(pub UnboundedSender<ProgressInfo>);

impl ProgressSink for ChannelSink {
    fn report(&self, info: &ProgressInfo) {
        let _ = self.0.send(info.clone());
    }
}

/// 1回のエクスポート実行に対する進捗計算
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    current: usize,
    start_time: DateTime<Utc>,
    started: Instant,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            current: 0,
            start_time: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// `processed` 件処理済みの時点の processing イベント
    pub fn processing(&mut self, processed: usize) -> ProgressInfo {
        self.current = processed.min(self.total);
        let remaining = estimate_remaining_seconds(self.started.elapsed(), self.current, self.total);
        let mut info = self.event(
            ProgressStage::Processing,
            format!("Processing issues... ({}/{})", self.current, self.total),
        );
        info.estimated_time_remaining = remaining;
        info
    }

    pub fn exporting(&mut self, format_label: &str) -> ProgressInfo {
        self.current = self.total;
        self.event(ProgressStage::Exporting, format!("Generating {}...", format_label))
    }

    /// 完了イベント。total が 0 でも 100% とする。
    pub fn complete(&mut self) -> ProgressInfo {
        self.current = self.total;
        let mut info = self.event(
            ProgressStage::Complete,
            format!("Export complete: {} issues", self.total),
        );
        info.percentage = 100;
        info
    }

    pub fn error(&self, message: impl Into<String>) -> ProgressInfo {
        self.event(ProgressStage::Error, message.into())
    }

    fn event(&self, stage: ProgressStage, message: String) -> ProgressInfo {
        ProgressInfo {
            current: self.current,
            total: self.total,
            percentage: percentage(self.current, self.total),
            stage,
            message,
            start_time: self.start_time,
            estimated_time_remaining: None,
        }
    }
}

/// `round(current / total * 100)`。total が 0 の場合は 0。
pub fn percentage(current: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let ratio = current.min(total) as f64 / total as f64;
    (ratio * 100.0).round() as u8
}

/// 経過時間と処理件数から残り秒数を推定する
///
/// `estimatedTotal = elapsed / processed * total`、`remaining = estimatedTotal - elapsed`
pub fn estimate_remaining_seconds(elapsed: Duration, processed: usize, total: usize) -> Option<u64> {
    if processed == 0 {
        return None;
    }
    let elapsed = elapsed.as_secs_f64();
    let estimated_total = elapsed / processed as f64 * total as f64;
    Some((estimated_total - elapsed).max(0.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(10, 10), 100);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn test_estimate_remaining_seconds() {
        // 10件に5秒 → 全40件で20秒 → 残り15秒
        let remaining = estimate_remaining_seconds(Duration::from_secs(5), 10, 40);
        assert_eq!(remaining, Some(15));
        assert_eq!(estimate_remaining_seconds(Duration::from_secs(5), 0, 40), None);
    }

    #[test]
    fn test_complete_is_forced_to_100_for_empty_run() {
        let mut tracker = ProgressTracker::new(0);

        let info = tracker.complete();

        assert_eq!(info.stage, ProgressStage::Complete);
        assert_eq!(info.percentage, 100);
        assert_eq!(info.current, 0);
    }

    #[test]
    fn test_processing_event_carries_eta() {
        let mut tracker = ProgressTracker::new(20);

        let info = tracker.processing(10);

        assert_eq!(info.stage, ProgressStage::Processing);
        assert_eq!(info.percentage, 50);
        assert!(info.estimated_time_remaining.is_some());
        assert_eq!(info.message, "Processing issues... (10/20)");
    }

    #[test]
    fn test_fn_sink_receives_events() {
        let seen = Mutex::new(Vec::new());
        let sink = FnSink(|info: &ProgressInfo| seen.lock().unwrap().push(info.stage));
        let tracker = ProgressTracker::new(1);

        sink.report(&tracker.error("boom"));

        assert_eq!(*seen.lock().unwrap(), vec![ProgressStage::Error]);
    }

    #[test]
    fn test_progress_info_serializes_camel_case() {
        let info = ProgressTracker::new(5).error("failed");

        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["stage"], "error");
        assert!(json.get("startTime").is_some());
        assert!(json.get("estimatedTimeRemaining").is_none());
    }
}
