//! スキャン履歴（セッション内のみ保持）
//!
//! 新しい順に並ぶ追記専用リスト。容量制限・重複排除・永続化はしない。

use crate::theme::{theme_for_label, Theme};
use crate::types::{Detection, ScanHistoryItem, ScanMode};
use chrono::{Local, TimeZone, Utc};

/// 履歴パネルに表示する検出件数
const SUMMARY_DETECTIONS: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct ScanHistory {
    items: Vec<ScanHistoryItem>,
    last_id: i64,
}

impl ScanHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 現在時刻をIDにして先頭に追加
    ///
    /// 検出が0件の場合は何も記録せず `None` を返す。
    pub fn record(
        &mut self,
        image: String,
        detections: Vec<Detection>,
        mode: ScanMode,
    ) -> Option<&ScanHistoryItem> {
        self.record_at(Utc::now().timestamp_millis(), image, detections, mode)
    }

    /// 時刻を指定して記録（同一ミリ秒内の連続記録でもIDは重複しない）
    pub fn record_at(
        &mut self,
        now_millis: i64,
        image: String,
        detections: Vec<Detection>,
        mode: ScanMode,
    ) -> Option<&ScanHistoryItem> {
        if detections.is_empty() {
            return None;
        }

        let id = now_millis.max(self.last_id + 1);
        self.last_id = id;
        self.items.insert(0, ScanHistoryItem { id, image, detections, mode });
        self.items.first()
    }

    /// 全件削除（元に戻せない）
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// 新しい順
    pub fn items(&self) -> &[ScanHistoryItem] {
        &self.items
    }

    pub fn get(&self, id: i64) -> Option<&ScanHistoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// 履歴パネル1行分の要約
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    pub id: i64,
    pub time: String,
    pub mode: ScanMode,
    /// (ラベル, 信頼度%, 配色) 先頭2件まで
    pub lines: Vec<(String, u32, Theme)>,
}

impl HistorySummary {
    pub fn from_item(item: &ScanHistoryItem) -> Self {
        let time = Local
            .timestamp_millis_opt(item.id)
            .single()
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_default();

        let lines = item
            .detections
            .iter()
            .take(SUMMARY_DETECTIONS)
            .map(|d| (d.label.clone(), d.confidence_percent(), theme_for_label(&d.label)))
            .collect();

        Self { id: item.id, time, mode: item.mode, lines }
    }

    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            return format!("{} [{}] No items detected", self.time, self.mode);
        }
        let body = self
            .lines
            .iter()
            .map(|(label, pct, _)| format!("{} {}%", label, pct))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} [{}] {}", self.time, self.mode, body)
    }
}
