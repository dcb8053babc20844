//! APIレスポンスパーサー
//!
//! 推論APIのレスポンスからJSON配列を抽出し、
//! Detection配列としてパース・検証する

use crate::error::{Error, Result};
use crate::types::Detection;

/// APIレスポンスからJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の [...] 配列
/// 3. エラー
///
/// # Examples
/// ```
/// use ecosense_common::extract_json;
///
/// let response = "Result: [{\"label\": \"Tap\"}]";
/// let json = extract_json(response).unwrap();
/// assert_eq!(json, "[{\"label\": \"Tap\"}]");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    // ```json ... ``` ブロックを探す
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    // 生の [...] を探す
    if let Some(start) = response.find('[') {
        if let Some(end) = response.rfind(']') {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("no JSON array found in response".into()))
}

/// 推論レスポンスをDetection配列にパース
///
/// 1件でも検証に失敗したらレスポンス全体をエラーとする。
/// 空配列は「検出なし」として正常に返す。
pub fn parse_detections(response: &str) -> Result<Vec<Detection>> {
    let json_str = extract_json(response)?;
    let detections: Vec<Detection> = serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("detection JSON: {}", e)))?;

    for (idx, det) in detections.iter().enumerate() {
        validate_detection(det).map_err(|e| match e {
            Error::Validation(msg) => Error::Validation(format!("detection[{}]: {}", idx, msg)),
            other => other,
        })?;
    }

    Ok(detections)
}

/// 検出結果1件の値域チェック
pub fn validate_detection(det: &Detection) -> Result<()> {
    if det.label.trim().is_empty() {
        return Err(Error::Validation("label is empty".into()));
    }
    if !det.confidence.is_finite() || !(0.0..=1.0).contains(&det.confidence) {
        return Err(Error::Validation(format!(
            "confidence {} is outside 0.0-1.0",
            det.confidence
        )));
    }
    if !det.bounding_box.is_normalized() {
        let coords: [f64; 4] = det.bounding_box.into();
        return Err(Error::Validation(format!(
            "boundingBox {:?} is not a normalized [x_min, y_min, x_max, y_max]",
            coords
        )));
    }
    Ok(())
}
