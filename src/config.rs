use crate::error::{EcoSenseError, Result};
use ecosense_common::ScanMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// APIキーを読む環境変数（先頭が優先）
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    /// 長辺の最大ピクセル数（超える画像は縮小してから送信）
    pub max_image_size: u32,
    /// キャプチャ画像のJPEG品質 (1-100)
    pub jpeg_quality: u8,
    /// 0ならHTTPクライアントの既定値
    pub timeout_seconds: u64,
    pub camera_device: PathBuf,
    /// 1フレームをstdoutに書き出すコマンド。`{device}` はデバイスパスに置換
    pub capture_command: Vec<String>,
    pub default_mode: ScanMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".into(),
            max_image_size: 1568,
            jpeg_quality: 92,
            timeout_seconds: 0,
            camera_device: PathBuf::from("/dev/video0"),
            capture_command: [
                "ffmpeg", "-loglevel", "error", "-f", "v4l2", "-i", "{device}",
                "-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            default_mode: ScanMode::Waste,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| EcoSenseError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("ecosense").join("config.json"))
    }

    /// APIキー取得（環境変数を優先）
    pub fn get_api_key(&self) -> Result<String> {
        resolve_api_key(
            API_KEY_ENV_VARS.iter().map(|name| std::env::var(name).ok()),
            self.api_key.as_deref(),
        )
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    /// キャプチャコマンドのプレースホルダを置換
    pub fn capture_args(&self) -> Vec<String> {
        let device = self.camera_device.display().to_string();
        self.capture_command
            .iter()
            .map(|arg| arg.replace("{device}", &device))
            .collect()
    }
}

/// 空文字のキーは未設定扱い
fn resolve_api_key(
    env_values: impl IntoIterator<Item = Option<String>>,
    stored: Option<&str>,
) -> Result<String> {
    env_values
        .into_iter()
        .flatten()
        .chain(stored.map(str::to_string))
        .map(|k| k.trim().to_string())
        .find(|k| !k.is_empty())
        .ok_or(EcoSenseError::MissingApiKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.jpeg_quality, 92);
        assert_eq!(config.default_mode, ScanMode::Waste);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"model": "gemini-2.0-flash"}"#).unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.max_image_size, 1568);
        assert_eq!(config.camera_device, PathBuf::from("/dev/video0"));
    }

    #[test]
    fn test_resolve_api_key_env_first() {
        let key = resolve_api_key(vec![Some("env-key".to_string()), None], Some("file-key")).unwrap();
        assert_eq!(key, "env-key");
    }

    #[test]
    fn test_resolve_api_key_fallback_to_stored() {
        let key = resolve_api_key(vec![None, Some("  ".to_string())], Some("file-key")).unwrap();
        assert_eq!(key, "file-key");
    }

    #[test]
    fn test_resolve_api_key_missing() {
        let err = resolve_api_key(vec![None, None], None).unwrap_err();
        assert!(matches!(err, EcoSenseError::MissingApiKey));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_capture_args_substitutes_device() {
        let config = Config {
            camera_device: PathBuf::from("/dev/video2"),
            ..Default::default()
        };
        let args = config.capture_args();
        assert!(args.contains(&"/dev/video2".to_string()));
        assert!(!args.iter().any(|a| a.contains("{device}")));
    }
}
