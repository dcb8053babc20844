//! スキャン結果の型定義
//!
//! CLIと対話セッションで共有される型:
//! - ScanMode: スキャン対象の領域（廃棄物・作物・水源）
//! - BoundingBox: 正規化済みの矩形 [x_min, y_min, x_max, y_max]
//! - Detection: 推論APIが返す1件の検出結果
//! - ScanHistoryItem: 履歴に残る1回分のスキャン

use serde::{Deserialize, Serialize};
use std::fmt;

/// スキャンモード
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    #[default]
    Waste,
    Crop,
    Water,
}

impl ScanMode {
    pub const ALL: [ScanMode; 3] = [ScanMode::Waste, ScanMode::Crop, ScanMode::Water];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Waste => "waste",
            ScanMode::Crop => "crop",
            ScanMode::Water => "water",
        }
    }

    /// モード切替ボタンの表示名
    pub fn button_label(&self) -> &'static str {
        match self {
            ScanMode::Waste => "Waste",
            ScanMode::Crop => "Crops",
            ScanMode::Water => "Water",
        }
    }

    /// 先頭だけ大文字にした名前（"Waste"）
    pub fn capitalized(&self) -> &'static str {
        match self {
            ScanMode::Waste => "Waste",
            ScanMode::Crop => "Crop",
            ScanMode::Water => "Water",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "waste" | "recycle" => Ok(ScanMode::Waste),
            "crop" | "crops" => Ok(ScanMode::Crop),
            "water" => Ok(ScanMode::Water),
            _ => Err(format!("Unknown mode: {}. Use waste, crop, or water", s)),
        }
    }
}

/// 正規化済みバウンディングボックス
///
/// JSON上は `[x_min, y_min, x_max, y_max]` の4要素配列。
/// 値の範囲チェックは `parser::validate_detection` で行う。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 4]", try_from = "Vec<f64>")]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self { x_min, y_min, x_max, y_max }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// 全座標が [0,1] 内にあり、min <= max を満たすか
    pub fn is_normalized(&self) -> bool {
        let coords = [self.x_min, self.y_min, self.x_max, self.y_max];
        coords.iter().all(|c| c.is_finite() && (0.0..=1.0).contains(c))
            && self.x_min <= self.x_max
            && self.y_min <= self.y_max
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x_min, b.y_min, b.x_max, b.y_max]
    }
}

impl TryFrom<Vec<f64>> for BoundingBox {
    type Error = String;

    fn try_from(v: Vec<f64>) -> Result<Self, Self::Error> {
        match v.as_slice() {
            [x_min, y_min, x_max, y_max] => Ok(Self::new(*x_min, *y_min, *x_max, *y_max)),
            _ => Err(format!("boundingBox must have 4 numbers, got {}", v.len())),
        }
    }
}

/// 検出結果1件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub recommendation: String,
}

impl Detection {
    /// 信頼度の整数パーセント表記（0.92 → 92）
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence * 100.0).round().clamp(0.0, 100.0) as u32
    }
}

/// スキャン履歴1件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanHistoryItem {
    /// 記録時刻（epochミリ秒）。セッション内で単調増加
    pub id: i64,
    /// Data URL形式の画像
    pub image: String,
    pub detections: Vec<Detection>,
    pub mode: ScanMode,
}
