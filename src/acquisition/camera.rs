//! カメラデバイス
//!
//! `Camera` がストリームを開き、`CameraStream` が1フレームを取得する。
//! ストリームは `stop` かドロップでデバイスを解放する。

use crate::config::Config;
use crate::error::{EcoSenseError, Result};
use image::DynamicImage;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

#[allow(async_fn_in_trait)]
pub trait Camera {
    type Stream: CameraStream;

    /// 背面（環境側）カメラのストリームを開く
    async fn open(&mut self) -> Result<Self::Stream>;
}

#[allow(async_fn_in_trait)]
pub trait CameraStream {
    /// 現在のフレームを取得
    async fn grab_frame(&mut self) -> Result<DynamicImage>;

    /// デバイスを解放（複数回呼んでもよい）
    fn stop(&mut self);
}

/// V4L2デバイスノード + 外部キャプチャコマンドによるカメラ
#[derive(Debug, Clone)]
pub struct DeviceCamera {
    device: PathBuf,
    capture_args: Vec<String>,
}

impl DeviceCamera {
    pub fn new(device: PathBuf, capture_args: Vec<String>) -> Self {
        Self { device, capture_args }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.camera_device.clone(), config.capture_args())
    }
}

impl Camera for DeviceCamera {
    type Stream = DeviceStream;

    async fn open(&mut self) -> Result<DeviceStream> {
        let handle = tokio::fs::File::open(&self.device).await.map_err(|e| {
            let reason = match e.kind() {
                std::io::ErrorKind::NotFound => "device not found".to_string(),
                std::io::ErrorKind::PermissionDenied => "permission denied".to_string(),
                _ => e.to_string(),
            };
            EcoSenseError::DeviceAccess(format!("{}: {}", self.device.display(), reason))
        })?;

        debug!(device = %self.device.display(), "camera stream opened");
        Ok(DeviceStream {
            device: self.device.clone(),
            capture_args: self.capture_args.clone(),
            handle: Some(handle),
        })
    }
}

#[derive(Debug)]
pub struct DeviceStream {
    device: PathBuf,
    capture_args: Vec<String>,
    handle: Option<tokio::fs::File>,
}

impl CameraStream for DeviceStream {
    async fn grab_frame(&mut self) -> Result<DynamicImage> {
        if self.handle.is_none() {
            return Err(EcoSenseError::DeviceAccess("camera stream already stopped".into()));
        }

        let (program, args) = self
            .capture_args
            .split_first()
            .ok_or_else(|| EcoSenseError::Config("capture_command が空です".into()))?;

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| EcoSenseError::DeviceAccess(format!("{} を実行できません: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EcoSenseError::DeviceAccess(format!(
                "capture failed (code {:?}): {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        debug!(bytes = output.stdout.len(), "frame captured");
        image::load_from_memory(&output.stdout)
            .map_err(|e| EcoSenseError::ImageDecode(format!("captured frame: {}", e)))
    }

    fn stop(&mut self) {
        if self.handle.take().is_some() {
            debug!(device = %self.device.display(), "camera stream released");
        }
    }
}

impl Drop for DeviceStream {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_missing_device() {
        let mut camera = DeviceCamera::new(PathBuf::from("/nonexistent/video9"), vec![]);
        let err = camera.open().await.unwrap_err();
        assert!(matches!(err, EcoSenseError::DeviceAccess(_)));
        assert!(err.to_string().contains("device not found"));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut camera = DeviceCamera::new(file.path().to_path_buf(), vec!["true".into()]);
        let mut stream = camera.open().await.unwrap();
        stream.stop();
        stream.stop();
        let err = stream.grab_frame().await.unwrap_err();
        assert!(matches!(err, EcoSenseError::DeviceAccess(_)));
    }

    #[tokio::test]
    async fn test_empty_capture_output_is_decode_error() {
        // `true` は成功するが何も出力しない
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut camera = DeviceCamera::new(file.path().to_path_buf(), vec!["true".into()]);
        let mut stream = camera.open().await.unwrap();
        let err = stream.grab_frame().await.unwrap_err();
        assert!(matches!(err, EcoSenseError::ImageDecode(_)));
    }
}
