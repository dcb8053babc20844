//! Gemini API連携
//!
//! 画像1枚 + モード別プロンプトを送り、構造化JSONで検出結果を受け取る。
//! 1回の呼び出しにつき1リクエストのみ（リトライしない）。

use super::Inference;
use crate::acquisition::EncodedImage;
use crate::config::Config;
use crate::error::{EcoSenseError, Result};
use ecosense_common::{build_prompt, parse_detections, response_schema, Detection, ScanMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini APIリクエスト
#[derive(Serialize)]
pub(crate) struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: serde_json::Value,
}

/// Gemini APIレスポンス
#[derive(Deserialize)]
pub(crate) struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// 画像 + プロンプトのリクエストを組み立てる
pub(crate) fn build_request(image: &EncodedImage, mode: ScanMode) -> GeminiRequest {
    GeminiRequest {
        contents: vec![Content {
            parts: vec![
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: image.mime_type.clone(),
                        data: image.data.clone(),
                    },
                },
                Part::Text { text: build_prompt(mode) },
            ],
        }],
        generation_config: GenerationConfig {
            temperature: 0.1,
            response_mime_type: "application/json".to_string(),
            response_schema: response_schema(),
        },
    }
}

/// レスポンスの最初の候補のテキスト部分を連結
pub(crate) fn response_text(response: &GeminiResponse) -> Option<String> {
    let candidate = response.candidates.first()?;
    let text: String = candidate
        .content
        .parts
        .iter()
        .map(|p| p.text.as_str())
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        timeout_seconds: u64,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if timeout_seconds > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_seconds));
        }
        let http = builder
            .build()
            .map_err(|e| EcoSenseError::Config(format!("HTTPクライアント初期化失敗: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    /// APIキーが見つからなくても生成は成功する（呼び出し時に設定エラー）
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.get_api_key().ok(), config.model.clone(), config.timeout_seconds)
    }

    /// エンドポイントを差し替える（プロキシ・テスト用）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url.trim_end_matches('/'), self.model)
    }

    async fn call_api(
        &self,
        api_key: &str,
        request: &GeminiRequest,
    ) -> std::result::Result<String, String> {
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(request)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("API error {}: {}", status, body));
        }

        let payload: GeminiResponse = response
            .json()
            .await
            .map_err(|e| format!("invalid response body: {}", e))?;

        response_text(&payload).ok_or_else(|| "empty response".to_string())
    }
}

impl Inference for GeminiClient {
    async fn analyze(&self, image: &EncodedImage, mode: ScanMode) -> Result<Vec<Detection>> {
        let api_key = self.api_key.as_deref().ok_or(EcoSenseError::MissingApiKey)?;

        let request = build_request(image, mode);
        debug!(
            model = %self.model,
            mode = %mode,
            mime_type = %image.mime_type,
            payload_chars = image.data.len(),
            "sending inference request"
        );

        let text = self.call_api(api_key, &request).await.map_err(|cause| {
            warn!(%cause, "inference call failed");
            EcoSenseError::Inference
        })?;

        debug!(response_chars = text.len(), "inference response received");

        parse_detections(&text).map_err(|e| {
            warn!(error = %e, "inference response rejected");
            EcoSenseError::Inference
        })
    }
}
