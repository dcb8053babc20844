use thiserror::Error;

/// 推論失敗時にユーザーへ見せるメッセージ（原因はログにのみ出す）
pub const INFERENCE_FAILED_MESSAGE: &str = "Failed to analyze image. Please try again.";

/// カメラ起動失敗時のメッセージ
pub const CAMERA_ACCESS_MESSAGE: &str =
    "Could not access camera. Please check permissions and try again.";

#[derive(Error, Debug)]
pub enum EcoSenseError {
    #[error("Could not access camera: {0}")]
    DeviceAccess(String),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("API key is not set. Export GEMINI_API_KEY or run `ecosense config --set-api-key YOUR_KEY`")]
    MissingApiKey,

    #[error("Failed to analyze image. Please try again.")]
    Inference,

    #[error("画像ファイルではありません: {0}")]
    UnsupportedImage(String),

    #[error("画像読み込みエラー: {0}")]
    ImageDecode(String),

    #[error("処理中のため操作できません")]
    Busy,

    #[error("現在の状態では実行できません: {0}")]
    InvalidTransition(&'static str),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

impl EcoSenseError {
    /// 推論が使えない設定上の問題か（error! で記録し、毎回メッセージで案内する）
    pub fn is_configuration(&self) -> bool {
        matches!(self, EcoSenseError::Config(_) | EcoSenseError::MissingApiKey)
    }

    /// 画面に出すメッセージ
    pub fn user_message(&self) -> String {
        match self {
            EcoSenseError::DeviceAccess(_) => CAMERA_ACCESS_MESSAGE.to_string(),
            EcoSenseError::Inference => INFERENCE_FAILED_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EcoSenseError>;
