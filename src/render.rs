//! オーバーレイ描画
//!
//! 検出矩形を配色付きの枠線として画像に焼き込み、ファイルに保存する。

use crate::acquisition::EncodedImage;
use crate::error::{EcoSenseError, Result};
use ecosense_common::{build_overlays, Detection, DisplayBox, OverlayRect, ScanHistoryItem};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::debug;

/// 枠線の太さ（画像短辺に対する比率）
const STROKE_RATIO: f64 = 0.006;
/// 角の強調マーカーの長さ（矩形短辺に対する比率）
const CORNER_RATIO: f64 = 0.2;

fn stroke_width(width: u32, height: u32) -> u32 {
    ((width.min(height) as f64 * STROKE_RATIO).round() as u32).max(2)
}

/// 矩形をピクセル単位に丸める（幅・高さは最低1px）
fn pixel_rect(rect: &OverlayRect) -> (i32, i32, u32, u32) {
    let left = rect.left.floor();
    let top = rect.top.floor();
    let width = (rect.right().ceil() - left).max(1.0) as u32;
    let height = (rect.bottom().ceil() - top).max(1.0) as u32;
    (left as i32, top as i32, width, height)
}

/// 1矩形分の枠線 + 角マーカー（画像外は imageproc が切り落とす）
fn draw_rect(img: &mut RgbImage, rect: &OverlayRect, color: Rgb<u8>, stroke: u32) {
    let (x, y, w, h) = pixel_rect(rect);

    // 内側へ1pxずつずらして線を太くする
    for i in 0..stroke {
        let inset = 2 * i;
        if inset >= w || inset >= h {
            break;
        }
        let r = Rect::at(x + i as i32, y + i as i32).of_size(w - inset, h - inset);
        draw_hollow_rect_mut(img, r, color);
    }

    // 角マーカーは線の2倍の太さ
    let corner = ((w.min(h) as f64 * CORNER_RATIO) as u32).max(1);
    let thick = (stroke * 2).min(w).min(h).max(1);
    let right = x + w as i32;
    let bottom = y + h as i32;
    for (cx, cy) in [
        (x, y),
        (right - corner as i32, y),
        (x, bottom - thick as i32),
        (right - corner as i32, bottom - thick as i32),
    ] {
        draw_filled_rect_mut(img, Rect::at(cx, cy).of_size(corner, thick), color);
    }
    for (cx, cy) in [
        (x, y),
        (right - thick as i32, y),
        (x, bottom - corner as i32),
        (right - thick as i32, bottom - corner as i32),
    ] {
        draw_filled_rect_mut(img, Rect::at(cx, cy).of_size(thick, corner), color);
    }
}

/// 検出結果を描き込んだ画像を返す
pub fn annotate(img: &DynamicImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = img.to_rgb8();
    let (w, h) = canvas.dimensions();
    let display = DisplayBox::new(w as f64, h as f64);
    let stroke = stroke_width(w, h);

    for overlay in build_overlays(detections, &display) {
        debug!(caption = %overlay.caption, theme = overlay.theme.name(), "drawing overlay");
        draw_rect(&mut canvas, &overlay.rect, Rgb(overlay.theme.rgb()), stroke);
    }
    canvas
}

/// 注釈付き画像を保存（形式は拡張子から判定）
pub fn save_annotated(image: &EncodedImage, detections: &[Detection], output: &Path) -> Result<()> {
    let img = image.to_image()?;
    let canvas = annotate(&img, detections);
    canvas
        .save(output)
        .map_err(|e| EcoSenseError::ImageDecode(format!("{}: {}", output.display(), e)))
}

/// 履歴の1件を注釈付きで書き出す
pub fn save_history_item(item: &ScanHistoryItem, output: &Path) -> Result<()> {
    let image = EncodedImage::from_data_url(&item.image)?;
    debug!(id = item.id, mime = %image.mime_type, "exporting history item");
    save_annotated(&image, &item.detections, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecosense_common::{BoundingBox, ScanMode, Theme};

    fn detection(label: &str, bbox: [f64; 4]) -> Detection {
        Detection {
            label: label.to_string(),
            confidence: 0.9,
            bounding_box: BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]),
            recommendation: String::new(),
        }
    }

    fn blank(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([0, 0, 0])))
    }

    #[test]
    fn test_annotate_draws_border_in_theme_color() {
        let img = blank(100, 100);
        let out = annotate(&img, &[detection("Plastic Bottle", [0.1, 0.1, 0.5, 0.6])]);
        let cyan = Rgb(Theme::Cyan.rgb());

        assert_eq!(*out.get_pixel(10, 30), cyan); // 左辺
        assert_eq!(*out.get_pixel(11, 30), cyan); // 線の太さ2px
        assert_eq!(*out.get_pixel(30, 10), cyan); // 上辺
        assert_eq!(*out.get_pixel(49, 30), cyan); // 右辺
        assert_eq!(*out.get_pixel(30, 59), cyan); // 下辺
        assert_eq!(*out.get_pixel(30, 30), Rgb([0, 0, 0])); // 内側は塗らない
        assert_eq!(*out.get_pixel(80, 80), Rgb([0, 0, 0])); // 外側
    }

    #[test]
    fn test_annotate_corner_markers() {
        let img = blank(100, 100);
        let out = annotate(&img, &[detection("Plastic Bottle", [0.1, 0.1, 0.5, 0.6])]);
        let cyan = Rgb(Theme::Cyan.rgb());

        // 角マーカーは線より太い
        assert_eq!(*out.get_pixel(13, 13), cyan);
        assert_eq!(*out.get_pixel(46, 56), cyan);
        assert_eq!(*out.get_pixel(30, 13), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_annotate_full_frame_stays_in_bounds() {
        let img = blank(37, 23);
        let out = annotate(&img, &[detection("Metal Can", [0.0, 0.0, 1.0, 1.0])]);
        assert_eq!(out.dimensions(), (37, 23));
        assert_eq!(*out.get_pixel(36, 22), Rgb(Theme::Slate.rgb()));
    }

    #[test]
    fn test_annotate_degenerate_box() {
        let img = blank(10, 10);
        let out = annotate(&img, &[detection("Rock", [0.5, 0.5, 0.5, 0.5])]);
        assert_eq!(out.dimensions(), (10, 10));
        assert_eq!(*out.get_pixel(5, 5), Rgb(Theme::Slate.rgb()));
    }

    #[test]
    fn test_annotate_no_detections_is_unchanged() {
        let img = blank(8, 8);
        let out = annotate(&img, &[]);
        assert_eq!(out, img.to_rgb8());
    }

    #[test]
    fn test_save_history_item_from_data_url() {
        let encoded = crate::acquisition::encode_frame(blank(40, 30), &Default::default()).unwrap();
        let item = ScanHistoryItem {
            id: 1,
            image: encoded.to_data_url(),
            detections: vec![detection("Organic Waste", [0.0, 0.0, 0.5, 0.5])],
            mode: ScanMode::Waste,
        };
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("scan.png");

        save_history_item(&item, &output).unwrap();

        let saved = image::open(&output).unwrap().to_rgb8();
        assert_eq!(saved.dimensions(), (40, 30));
        assert_eq!(*saved.get_pixel(0, 10), Rgb(Theme::Amber.rgb()));
    }

    #[test]
    fn test_save_history_item_rejects_bad_data_url() {
        let item = ScanHistoryItem {
            id: 1,
            image: "not a data url".to_string(),
            detections: vec![detection("Rock", [0.0, 0.0, 0.5, 0.5])],
            mode: ScanMode::Waste,
        };
        let dir = tempfile::tempdir().unwrap();
        let result = save_history_item(&item, &dir.path().join("out.png"));
        assert!(matches!(result, Err(EcoSenseError::ImageDecode(_))));
    }
}
