//! 端末表示
//!
//! スキャン結果・履歴パネル・ダッシュボードを標準出力に整形する。

use crate::acquisition::Camera;
use crate::controller::{ViewController, ViewState};
use crate::inference::Inference;
use ecosense_common::dashboard::{self, AlertLevel};
use ecosense_common::{DisplayBox, HistorySummary, Overlay, ScanHistory};

const BAR_WIDTH: usize = 30;

fn bar(percent: f64) -> String {
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round().clamp(0.0, BAR_WIDTH as f64) as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// オーバーレイ1件の表示行（位置・サイズは画像に対する%）
pub fn overlay_line(overlay: &Overlay) -> String {
    let r = &overlay.rect;
    format!(
        "[{}] {}  at {:.0}%,{:.0}%  size {:.0}%x{:.0}%",
        overlay.theme.name(),
        overlay.caption,
        r.left,
        r.top,
        r.width,
        r.height
    )
}

/// 現在の画面状態を表示
pub fn print_view<C: Camera, I: Inference>(controller: &ViewController<C, I>) {
    println!("── {} ── mode: {}", controller.status_text(), controller.mode().button_label());

    if let Some(image) = controller.displayed_image() {
        println!("  画像: {} {}x{}", image.mime_type, image.width, image.height);
    }

    if let ViewState::Result { detections, .. } = controller.state() {
        let overlays = controller.overlays(&DisplayBox::percent());
        for (det, overlay) in detections.iter().zip(&overlays) {
            println!("  {}", overlay_line(overlay));
            if !det.recommendation.is_empty() {
                println!("      → {}", det.recommendation);
            }
        }
    }

    if let Some(message) = controller.error() {
        println!("  ⚠ {}", message);
    }

    if controller.history_visible() {
        print_history(controller.history());
    }
}

/// 履歴パネル
pub fn print_history(history: &ScanHistory) {
    println!("\nRecent Scans");
    if history.is_empty() {
        println!("  No scans yet");
        return;
    }
    for item in history.items() {
        println!("  {}", HistorySummary::from_item(item).render());
    }
}

/// 環境ダッシュボード（固定データ）
pub fn print_dashboard(offline: bool) {
    println!("Environment ({})\n", if offline { "Offline" } else { "Live" });

    let alerts = dashboard::alerts();
    println!("Community Alerts ({} ALERT)", alerts.len());
    for alert in &alerts {
        let marker = match alert.level {
            AlertLevel::Severe => "!!",
            AlertLevel::Warning => " !",
        };
        println!("  {} {} ({})", marker, alert.category, alert.age);
        println!("     {}", alert.message);
    }

    println!("\nSoil Moisture");
    let shares = dashboard::shares(dashboard::SOIL_MOISTURE);
    for ((name, _), share) in dashboard::SOIL_MOISTURE.iter().zip(shares) {
        println!("  {:<10} {} {:>3.0}%", name, bar(share), share);
    }

    println!("\nCrop Yield Forecast");
    for (crop, value) in dashboard::YIELD_FORECAST {
        println!("  {:<10} {} {:>3}", crop, bar(*value as f64), value);
    }

    println!("\nRural IoT Grid");
    for device in dashboard::iot_devices() {
        println!(
            "  {:<16} {:<8} last sync: {}",
            device.name,
            device.status.as_str(),
            device.last_sync
        );
    }

    if offline {
        println!("\n  {} data points queued for sync", dashboard::QUEUED_DATA_POINTS);
    }
}
