mod gemini;

pub use gemini::{GeminiClient, GEMINI_API_BASE};

use crate::acquisition::EncodedImage;
use crate::error::Result;
use ecosense_common::{Detection, ScanMode};

/// 画像 + モードから検出結果を得る推論バックエンド
///
/// - APIキーなし → `EcoSenseError::MissingApiKey`（通信前に判定）
/// - 通信・パース・スキーマ違反 → `EcoSenseError::Inference`
/// - 検出なし → `Ok(vec![])`
#[allow(async_fn_in_trait)]
pub trait Inference {
    async fn analyze(&self, image: &EncodedImage, mode: ScanMode) -> Result<Vec<Detection>>;
}
