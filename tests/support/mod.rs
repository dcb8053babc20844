//! テスト用のカメラ・推論スタブ
//!
//! どちらも共有ログを持ち、コントローラに所有された後も呼び出し状況を確認できる。

#![allow(dead_code)]

use ecosense::acquisition::{Camera, CameraStream, EncodeOptions, EncodedImage, ImageSource};
use ecosense::controller::ViewController;
use ecosense::error::{EcoSenseError, Result};
use ecosense::inference::Inference;
use ecosense_common::{BoundingBox, Detection, ScanMode};
use image::{DynamicImage, Rgb, RgbImage};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// =============================================
// カメラ
// =============================================

#[derive(Debug, Default)]
pub struct CameraLog {
    pub opened: usize,
    pub stopped: usize,
    pub active: usize,
    pub frames: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraBehavior {
    Ok,
    /// 権限拒否
    Deny,
    /// 起動はできるがフレーム取得に失敗
    BrokenFrames,
}

pub struct ScriptedCamera {
    behavior: CameraBehavior,
    log: Arc<Mutex<CameraLog>>,
}

impl ScriptedCamera {
    pub fn new(behavior: CameraBehavior) -> (Self, Arc<Mutex<CameraLog>>) {
        let log = Arc::new(Mutex::new(CameraLog::default()));
        (Self { behavior, log: Arc::clone(&log) }, log)
    }
}

impl Camera for ScriptedCamera {
    type Stream = ScriptedStream;

    async fn open(&mut self) -> Result<ScriptedStream> {
        if self.behavior == CameraBehavior::Deny {
            return Err(EcoSenseError::DeviceAccess("permission denied".to_string()));
        }
        let mut log = self.log.lock().unwrap();
        log.opened += 1;
        log.active += 1;
        Ok(ScriptedStream {
            broken: self.behavior == CameraBehavior::BrokenFrames,
            stopped: false,
            log: Arc::clone(&self.log),
        })
    }
}

pub struct ScriptedStream {
    broken: bool,
    stopped: bool,
    log: Arc<Mutex<CameraLog>>,
}

impl CameraStream for ScriptedStream {
    async fn grab_frame(&mut self) -> Result<DynamicImage> {
        if self.broken {
            return Err(EcoSenseError::ImageDecode("no frame".to_string()));
        }
        self.log.lock().unwrap().frames += 1;
        Ok(test_frame(64, 48))
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let mut log = self.log.lock().unwrap();
        log.stopped += 1;
        log.active -= 1;
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================
// 推論
// =============================================

pub enum Reply {
    Detections(Vec<Detection>),
    Fail,
    MissingKey,
}

#[derive(Debug, Default)]
pub struct InferenceLog {
    pub calls: usize,
    pub modes: Vec<ScanMode>,
}

pub struct ScriptedInference {
    replies: Mutex<VecDeque<Reply>>,
    log: Arc<Mutex<InferenceLog>>,
}

impl ScriptedInference {
    pub fn new(replies: Vec<Reply>) -> (Self, Arc<Mutex<InferenceLog>>) {
        let log = Arc::new(Mutex::new(InferenceLog::default()));
        let inference = Self { replies: Mutex::new(replies.into()), log: Arc::clone(&log) };
        (inference, log)
    }
}

impl Inference for ScriptedInference {
    async fn analyze(&self, _image: &EncodedImage, mode: ScanMode) -> Result<Vec<Detection>> {
        {
            let mut log = self.log.lock().unwrap();
            log.calls += 1;
            log.modes.push(mode);
        }
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Detections(detections)) => Ok(detections),
            Some(Reply::MissingKey) => Err(EcoSenseError::MissingApiKey),
            Some(Reply::Fail) | None => Err(EcoSenseError::Inference),
        }
    }
}

// =============================================
// ヘルパー
// =============================================

pub fn test_frame(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([40, 120, 60])))
}

pub fn detection(label: &str, confidence: f64, bbox: [f64; 4]) -> Detection {
    Detection {
        label: label.to_string(),
        confidence,
        bounding_box: BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]),
        recommendation: format!("Handle {} properly", label.to_lowercase()),
    }
}

pub fn bottle_and_can() -> Vec<Detection> {
    vec![
        detection("Plastic Bottle", 0.92, [0.1, 0.1, 0.5, 0.6]),
        detection("Metal Can", 0.81, [0.55, 0.2, 0.9, 0.7]),
    ]
}

/// PNG画像をディレクトリに書き出してパスを返す
pub fn write_png(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(32, 24, Rgb([200, 200, 200]))
        .save(&path)
        .expect("failed to write test png");
    path
}

pub type TestController = ViewController<ScriptedCamera, ScriptedInference>;

pub struct Harness {
    pub controller: TestController,
    pub camera: Arc<Mutex<CameraLog>>,
    pub inference: Arc<Mutex<InferenceLog>>,
}

pub fn harness(behavior: CameraBehavior, replies: Vec<Reply>) -> Harness {
    let (camera, camera_log) = ScriptedCamera::new(behavior);
    let (inference, inference_log) = ScriptedInference::new(replies);
    let source = ImageSource::new(camera, EncodeOptions::default());
    Harness {
        controller: ViewController::new(source, inference, ScanMode::Waste),
        camera: camera_log,
        inference: inference_log,
    }
}
