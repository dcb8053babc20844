//! 検出結果のオーバーレイ配置
//!
//! 正規化座標を表示領域のピクセル座標に変換する純粋関数群。

use crate::theme::{theme_for_label, Theme};
use crate::types::Detection;

/// 画像の表示領域
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayBox {
    pub width: f64,
    pub height: f64,
}

impl DisplayBox {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// 百分率表示用（100x100）
    pub fn percent() -> Self {
        Self::new(100.0, 100.0)
    }
}

/// 表示領域上の矩形
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl OverlayRect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// 表示領域内に収まっているか
    pub fn fits_within(&self, display: &DisplayBox) -> bool {
        self.left >= 0.0
            && self.top >= 0.0
            && self.right() <= display.width
            && self.bottom() <= display.height
    }
}

/// 描画用にまとめたオーバーレイ1件
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub rect: OverlayRect,
    pub theme: Theme,
    pub caption: String,
}

/// 検出結果1件の表示矩形
pub fn overlay_rect(det: &Detection, display: &DisplayBox) -> OverlayRect {
    let b = &det.bounding_box;
    OverlayRect {
        left: b.x_min * display.width,
        top: b.y_min * display.height,
        width: (b.x_max - b.x_min) * display.width,
        height: (b.y_max - b.y_min) * display.height,
    }
}

/// ラベル表示文字列（"PLASTIC BOTTLE 92%"）
pub fn caption(det: &Detection) -> String {
    format!("{} {}%", det.label.to_uppercase(), det.confidence_percent())
}

/// 検出結果をオーバーレイに変換（順序は入力のまま）
pub fn build_overlays(detections: &[Detection], display: &DisplayBox) -> Vec<Overlay> {
    detections
        .iter()
        .map(|det| Overlay {
            rect: overlay_rect(det, display),
            theme: theme_for_label(&det.label),
            caption: caption(det),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    fn detection(label: &str, confidence: f64, bbox: [f64; 4]) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
            bounding_box: BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]),
            recommendation: String::new(),
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_overlay_rect_percent() {
        let det = detection("Plastic Bottle", 0.92, [0.1, 0.1, 0.5, 0.6]);
        let rect = overlay_rect(&det, &DisplayBox::percent());
        assert!(approx(rect.left, 10.0));
        assert!(approx(rect.top, 10.0));
        assert!(approx(rect.width, 40.0));
        assert!(approx(rect.height, 50.0));
    }

    #[test]
    fn test_overlay_rect_pixels() {
        let det = detection("Tap", 0.5, [0.25, 0.5, 0.75, 1.0]);
        let rect = overlay_rect(&det, &DisplayBox::new(640.0, 480.0));
        assert!(approx(rect.left, 160.0));
        assert!(approx(rect.top, 240.0));
        assert!(approx(rect.width, 320.0));
        assert!(approx(rect.height, 240.0));
    }

    #[test]
    fn test_overlay_within_bounds_grid() {
        // 正規化された矩形は必ず表示領域内に収まる
        let display = DisplayBox::new(375.0, 812.0);
        let steps = [0.0, 0.13, 0.5, 0.77, 1.0];
        for &x0 in &steps {
            for &x1 in steps.iter().filter(|&&v| v >= x0) {
                for &y0 in &steps {
                    for &y1 in steps.iter().filter(|&&v| v >= y0) {
                        let det = detection("x", 0.5, [x0, y0, x1, y1]);
                        let rect = overlay_rect(&det, &display);
                        assert!(
                            rect.right() <= display.width + 1e-9
                                && rect.bottom() <= display.height + 1e-9
                                && rect.left >= 0.0
                                && rect.top >= 0.0,
                            "{:?} escapes {:?}",
                            rect,
                            display
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_full_frame_fits_exactly() {
        let det = detection("x", 0.5, [0.0, 0.0, 1.0, 1.0]);
        let display = DisplayBox::new(300.0, 200.0);
        assert!(overlay_rect(&det, &display).fits_within(&display));
    }

    #[test]
    fn test_caption() {
        let det = detection("Plastic Bottle", 0.924, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(caption(&det), "PLASTIC BOTTLE 92%");
    }

    #[test]
    fn test_build_overlays_keeps_order_and_theme() {
        let dets = vec![
            detection("Metal Can", 0.8, [0.0, 0.0, 0.5, 0.5]),
            detection("Apple Core (Organic)", 0.6, [0.5, 0.5, 1.0, 1.0]),
        ];
        let overlays = build_overlays(&dets, &DisplayBox::percent());
        assert_eq!(overlays.len(), 2);
        assert_eq!(overlays[0].theme, Theme::Slate);
        assert_eq!(overlays[1].theme, Theme::Amber);
        assert_eq!(overlays[1].caption, "APPLE CORE (ORGANIC) 60%");
    }
}
