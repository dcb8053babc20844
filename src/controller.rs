//! 画面状態の管理
//!
//! 状態遷移:
//! - Idle --start_capture--> CameraActive（失敗時は Idle + エラー）
//! - CameraActive --capture--> Loading --成功--> Result / --失敗--> Idle + エラー
//! - Idle|Result --upload--> Loading --成功--> Result / --失敗--> Idle or 直前のResult + エラー
//! - Result --scan_again--> CameraActive
//!
//! Loading 中は撮影・アップロード・モード変更を受け付けない（推論は同時に1件まで）。
//! 履歴パネルの表示切替はどの状態でも可能。

use crate::acquisition::{Camera, EncodedImage, ImageSource};
use crate::error::{EcoSenseError, Result};
use crate::inference::Inference;
use ecosense_common::{build_overlays, Detection, DisplayBox, Overlay, ScanHistory, ScanMode};
use std::path::Path;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Idle,
    CameraActive,
    Loading,
    Result {
        image: EncodedImage,
        detections: Vec<Detection>,
    },
}

impl ViewState {
    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Idle => "idle",
            ViewState::CameraActive => "camera",
            ViewState::Loading => "loading",
            ViewState::Result { .. } => "result",
        }
    }
}

/// 画像の取得元
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanSource {
    Camera,
    Upload,
}

/// Loading 中のスキャン。`finish_scan` に渡して完了させる
#[derive(Debug)]
pub struct PendingScan {
    image: EncodedImage,
    mode: ScanMode,
    source: ScanSource,
    /// アップロード開始時に表示していた結果（失敗時に戻す）
    previous: Option<(EncodedImage, Vec<Detection>)>,
}

/// 1回のスキャンの結末
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// 検出あり（履歴に記録したID）
    Detected { count: usize, history_id: i64 },
    /// 検出0件（履歴には記録しない）
    NothingFound,
    /// 推論失敗（画面に出したメッセージ）
    Failed(String),
}

pub struct ViewController<C: Camera, I: Inference> {
    source: ImageSource<C>,
    inference: I,
    history: ScanHistory,
    state: ViewState,
    /// Idle でも表示し続ける画像（撮影後に推論が失敗した場合など）
    last_image: Option<EncodedImage>,
    error: Option<String>,
    mode: ScanMode,
    history_visible: bool,
}

impl<C: Camera, I: Inference> ViewController<C, I> {
    pub fn new(source: ImageSource<C>, inference: I, mode: ScanMode) -> Self {
        Self {
            source,
            inference,
            history: ScanHistory::new(),
            state: ViewState::Idle,
            last_image: None,
            error: None,
            mode,
            history_visible: false,
        }
    }

    // =============================================
    // 状態参照
    // =============================================

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, ViewState::Loading)
    }

    pub fn is_camera_active(&self) -> bool {
        self.source.is_camera_active()
    }

    pub fn history(&self) -> &ScanHistory {
        &self.history
    }

    pub fn history_visible(&self) -> bool {
        self.history_visible
    }

    /// 表示中の画像
    pub fn displayed_image(&self) -> Option<&EncodedImage> {
        match &self.state {
            ViewState::Result { image, .. } => Some(image),
            ViewState::CameraActive => None,
            _ => self.last_image.as_ref(),
        }
    }

    /// 表示中の検出結果（Result 以外では空）
    pub fn detections(&self) -> &[Detection] {
        match &self.state {
            ViewState::Result { detections, .. } => detections,
            _ => &[],
        }
    }

    pub fn overlays(&self, display: &DisplayBox) -> Vec<Overlay> {
        build_overlays(self.detections(), display)
    }

    // =============================================
    // 操作
    // =============================================

    fn ensure_not_loading(&self) -> Result<()> {
        if self.is_loading() {
            return Err(EcoSenseError::Busy);
        }
        Ok(())
    }

    fn transition(&mut self, next: ViewState) {
        debug!(from = self.state.name(), to = next.name(), "state transition");
        self.state = next;
    }

    /// カメラ起動
    ///
    /// 失敗はエラーメッセージとして保持し、Idle に戻る。
    pub async fn start_capture(&mut self) -> Result<()> {
        self.ensure_not_loading()?;

        self.error = None;
        self.last_image = None;
        self.transition(ViewState::Idle);

        match self.source.start_capture().await {
            Ok(()) => {
                self.transition(ViewState::CameraActive);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "camera unavailable");
                self.error = Some(e.user_message());
                Ok(())
            }
        }
    }

    /// 結果表示から再撮影
    pub async fn scan_again(&mut self) -> Result<()> {
        self.ensure_not_loading()?;
        if !matches!(self.state, ViewState::Result { .. }) {
            return Err(EcoSenseError::InvalidTransition("scan again requires a result"));
        }
        self.start_capture().await
    }

    /// 撮影してLoadingへ
    ///
    /// フレーム取得に失敗した場合もカメラは解放され、Idle + エラーになる。
    pub async fn begin_capture(&mut self) -> Result<PendingScan> {
        self.ensure_not_loading()?;
        if !matches!(self.state, ViewState::CameraActive) {
            return Err(EcoSenseError::InvalidTransition("camera is not active"));
        }

        let captured = self.source.capture_frame().await;
        match captured {
            Ok(image) => {
                self.error = None;
                self.last_image = Some(image.clone());
                self.transition(ViewState::Loading);
                Ok(PendingScan { image, mode: self.mode, source: ScanSource::Camera, previous: None })
            }
            Err(e) => {
                warn!(error = %e, "frame capture failed");
                self.error = Some(e.user_message());
                self.transition(ViewState::Idle);
                Err(e)
            }
        }
    }

    /// ファイルを読み込んでLoadingへ
    pub async fn begin_upload(&mut self, path: &Path) -> Result<PendingScan> {
        self.ensure_not_loading()?;

        let previous = match &self.state {
            ViewState::Result { image, detections } => Some((image.clone(), detections.clone())),
            _ => None,
        };

        let uploaded = self.source.upload_file(path).await;
        // アップロード時にカメラは止まっている
        if matches!(self.state, ViewState::CameraActive) {
            self.transition(ViewState::Idle);
        }

        match uploaded {
            Ok(image) => {
                self.error = None;
                self.last_image = Some(image.clone());
                self.transition(ViewState::Loading);
                Ok(PendingScan { image, mode: self.mode, source: ScanSource::Upload, previous })
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "upload rejected");
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// 推論結果を反映してLoadingを抜ける
    pub fn finish_scan(
        &mut self,
        pending: PendingScan,
        result: Result<Vec<Detection>>,
    ) -> Result<ScanOutcome> {
        if !self.is_loading() {
            return Err(EcoSenseError::InvalidTransition("no scan in progress"));
        }

        let PendingScan { image, mode, source, previous } = pending;

        match result {
            Ok(detections) => {
                self.error = None;
                let outcome = match self
                    .history
                    .record(image.to_data_url(), detections.clone(), mode)
                {
                    Some(item) => ScanOutcome::Detected { count: detections.len(), history_id: item.id },
                    None => ScanOutcome::NothingFound,
                };
                info!(mode = %mode, detections = detections.len(), ?source, "scan complete");
                self.transition(ViewState::Result { image, detections });
                Ok(outcome)
            }
            Err(e) => {
                if e.is_configuration() {
                    error!(error = %e, "inference is not configured");
                } else {
                    warn!(error = %e, "scan failed");
                }
                let message = e.user_message();
                self.error = Some(message.clone());
                match previous {
                    Some((prev_image, prev_detections)) => self.transition(ViewState::Result {
                        image: prev_image,
                        detections: prev_detections,
                    }),
                    None => self.transition(ViewState::Idle),
                }
                Ok(ScanOutcome::Failed(message))
            }
        }
    }

    /// 推論を1回だけ実行
    pub async fn run_inference(&self, pending: &PendingScan) -> Result<Vec<Detection>> {
        self.inference.analyze(&pending.image, pending.mode).await
    }

    /// 撮影 → 推論 → 結果反映
    pub async fn capture_and_analyze(&mut self) -> Result<ScanOutcome> {
        let pending = self.begin_capture().await?;
        let result = self.run_inference(&pending).await;
        self.finish_scan(pending, result)
    }

    /// アップロード → 推論 → 結果反映
    pub async fn upload_and_analyze(&mut self, path: &Path) -> Result<ScanOutcome> {
        let pending = self.begin_upload(path).await?;
        let result = self.run_inference(&pending).await;
        self.finish_scan(pending, result)
    }

    /// 次回スキャンのモードを変更（Loading中は不可）
    pub fn set_mode(&mut self, mode: ScanMode) -> Result<()> {
        self.ensure_not_loading()?;
        if self.mode != mode {
            debug!(from = %self.mode, to = %mode, "mode changed");
        }
        self.mode = mode;
        Ok(())
    }

    pub fn toggle_history(&mut self) -> bool {
        self.history_visible = !self.history_visible;
        self.history_visible
    }

    pub fn clear_history(&mut self) {
        info!(items = self.history.len(), "history cleared");
        self.history.clear();
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// カメラを止めて Idle へ（画面離脱時など）
    pub fn cancel(&mut self) {
        self.source.cancel();
        if matches!(self.state, ViewState::CameraActive) {
            self.transition(ViewState::Idle);
        }
    }

    // =============================================
    // 表示文言
    // =============================================

    /// メインボタンの表示
    pub fn primary_action_label(&self) -> String {
        match &self.state {
            ViewState::Loading => "Processing...".to_string(),
            ViewState::CameraActive => "Capture".to_string(),
            ViewState::Result { .. } => "Scan New Item".to_string(),
            ViewState::Idle if self.last_image.is_some() => "Scan New Item".to_string(),
            ViewState::Idle => format!("Start {} Scan", self.mode.capitalized()),
        }
    }

    /// 画像領域に出す状態表示
    pub fn status_text(&self) -> String {
        match &self.state {
            ViewState::Loading => format!("ANALYZING {}...", self.mode.as_str().to_uppercase()),
            ViewState::CameraActive => "Camera live".to_string(),
            ViewState::Result { detections, .. } if detections.is_empty() => {
                empty_result_message(self.mode)
            }
            ViewState::Result { detections, .. } => format!("{} item(s) detected", detections.len()),
            ViewState::Idle => format!("Ready to Scan (Mode: {})", self.mode),
        }
    }
}

impl<C: Camera, I: Inference> Drop for ViewController<C, I> {
    fn drop(&mut self) {
        self.source.cancel();
    }
}

/// 検出0件のときの表示
pub fn empty_result_message(mode: ScanMode) -> String {
    format!("No items identified in this frame for {} analysis.", mode)
}
