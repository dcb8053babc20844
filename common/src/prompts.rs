//! プロンプト生成モジュール
//!
//! モードごとの指示文と、推論APIに渡すレスポンススキーマ:
//! - mode_instruction: モード別の固定テンプレート
//! - build_prompt: 指示文 + JSON出力指示
//! - response_schema: 構造化出力用のスキーマ

use crate::types::ScanMode;
use serde_json::{json, Value};

const WASTE_INSTRUCTION: &str = "Analyze this image to identify recyclable waste. \
Identify items that are plastic, glass, organic, or metal. For each identified item, \
provide its name (e.g. 'Plastic Bottle', 'Apple Core'), a confidence score, a bounding box, \
and a short recommendation on how to dispose of or recycle it.";

const CROP_INSTRUCTION: &str = "Analyze this image for agricultural health. \
Identify crops (e.g., Maize, Cassava, Tomato), and specifically look for signs of disease \
(Blight, Rust), pests, nutrient deficiency, or healthy growth. Label the detected areas \
(e.g., 'Maize (Healthy)', 'Tomato (Blight)'). Provide confidence, bounding boxes, \
and a short treatment or care recommendation for each area.";

const WATER_INSTRUCTION: &str = "Analyze this image for water source safety. \
Identify the water source (e.g., Borehole, River, Bucket, Tap) and visual indicators of \
quality or risk (e.g., Clear Water, Turbid/Muddy, Algae, Livestock Nearby). Label the \
detected areas. Provide confidence, bounding boxes, and a short safety recommendation \
(e.g., 'Boil before drinking').";

const OUTPUT_INSTRUCTION: &str = "Return the result as a JSON array of objects with \
'label', 'confidence' (0.0-1.0), 'boundingBox' [x_min, y_min, x_max, y_max] normalized to \
0.0-1.0 of the image width and height, and 'recommendation'. \
If nothing relevant is found, return an empty array.";

/// モード別の指示文
pub fn mode_instruction(mode: ScanMode) -> &'static str {
    match mode {
        ScanMode::Waste => WASTE_INSTRUCTION,
        ScanMode::Crop => CROP_INSTRUCTION,
        ScanMode::Water => WATER_INSTRUCTION,
    }
}

/// 推論用プロンプト生成
///
/// モードで変わるのは指示文のみ。出力形式の指示は全モード共通。
pub fn build_prompt(mode: ScanMode) -> String {
    format!("{} {}", mode_instruction(mode), OUTPUT_INSTRUCTION)
}

/// 構造化出力用のレスポンススキーマ（Gemini responseSchema形式）
pub fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "label": {
                    "type": "STRING",
                    "description": "The label of the detected object (e.g., 'Plastic Bottle', 'Maize (Healthy)')."
                },
                "confidence": {
                    "type": "NUMBER",
                    "description": "The confidence score of the detection, from 0.0 to 1.0."
                },
                "boundingBox": {
                    "type": "ARRAY",
                    "description": "The bounding box coordinates [x_min, y_min, x_max, y_max] normalized to image dimensions.",
                    "items": { "type": "NUMBER" },
                    "minItems": 4,
                    "maxItems": 4
                },
                "recommendation": {
                    "type": "STRING",
                    "description": "A short, actionable recommendation for the detected item."
                }
            },
            "required": ["label", "confidence", "boundingBox", "recommendation"]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt_per_mode() {
        assert!(build_prompt(ScanMode::Waste).contains("recyclable waste"));
        assert!(build_prompt(ScanMode::Crop).contains("agricultural health"));
        assert!(build_prompt(ScanMode::Water).contains("water source safety"));
    }

    #[test]
    fn test_output_instruction_shared_across_modes() {
        for mode in ScanMode::ALL {
            let prompt = build_prompt(mode);
            assert!(prompt.ends_with(OUTPUT_INSTRUCTION));
            assert!(prompt.contains("[x_min, y_min, x_max, y_max]"));
        }
    }

    #[test]
    fn test_instructions_are_distinct() {
        assert_ne!(mode_instruction(ScanMode::Waste), mode_instruction(ScanMode::Crop));
        assert_ne!(mode_instruction(ScanMode::Crop), mode_instruction(ScanMode::Water));
    }

    #[test]
    fn test_response_schema_requires_all_fields() {
        let schema = response_schema();
        let required = schema["items"]["required"].as_array().unwrap();
        let names: Vec<&str> = required.iter().filter_map(|v| v.as_str()).collect();
        assert_eq!(names, vec!["label", "confidence", "boundingBox", "recommendation"]);
        assert_eq!(schema["items"]["properties"]["boundingBox"]["minItems"], 4);
    }
}
