//! 画像取得
//!
//! カメラ撮影とファイルアップロードを同じ `EncodedImage` に揃える。
//! 表示領域を持てる画像ソースは常に1つ（カメラ起動中のアップロードはカメラを止める）。

mod camera;

pub use camera::{Camera, CameraStream, DeviceCamera, DeviceStream};

use crate::config::Config;
use crate::error::{EcoSenseError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat};
use lazy_static::lazy_static;
use regex::Regex;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

lazy_static! {
    static ref DATA_URL: Regex =
        Regex::new(r"(?s)^data:([A-Za-z0-9.+-]+/[A-Za-z0-9.+-]+)?(?:;[^,]*)?,(.*)$")
            .expect("valid data URL regex");
}

/// 選択時に受け付ける拡張子とMIMEタイプ
const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
];

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// 推論APIに渡す画像
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub mime_type: String,
    /// Base64エンコード済みデータ
    pub data: String,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// "data:image/jpeg;base64,..." 形式
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// 履歴に保存した Data URL から復元
    pub fn from_data_url(data_url: &str) -> Result<Self> {
        let data = extract_base64_from_data_url(data_url)
            .ok_or_else(|| EcoSenseError::ImageDecode("Data URLではありません".into()))?;
        let mut image = Self {
            mime_type: extract_mime_type_from_data_url(data_url).to_string(),
            data: data.to_string(),
            width: 0,
            height: 0,
        };
        let (width, height) = image.to_image()?.dimensions();
        image.width = width;
        image.height = height;
        Ok(image)
    }

    pub fn decode_bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| EcoSenseError::ImageDecode(format!("base64: {}", e)))
    }

    pub fn to_image(&self) -> Result<DynamicImage> {
        let bytes = self.decode_bytes()?;
        image::load_from_memory(&bytes).map_err(|e| EcoSenseError::ImageDecode(e.to_string()))
    }
}

/// Data URLからBase64データ部分を抽出
pub fn extract_base64_from_data_url(data_url: &str) -> Option<&str> {
    DATA_URL
        .captures(data_url)
        .and_then(|c| c.get(2))
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
}

/// Data URLからMIMEタイプを抽出（なければ image/jpeg）
pub fn extract_mime_type_from_data_url(data_url: &str) -> &str {
    DATA_URL
        .captures(data_url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// 拡張子から画像MIMEタイプを判定
pub fn mime_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// 画像エンコード設定
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    pub max_image_size: u32,
    pub jpeg_quality: u8,
}

impl EncodeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_image_size: config.max_image_size,
            jpeg_quality: config.jpeg_quality.clamp(1, 100),
        }
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { max_image_size: 1568, jpeg_quality: 92 }
    }
}

/// 長辺が上限を超える場合のみ縮小
fn fit_within(img: DynamicImage, max_size: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if max_size == 0 || (w <= max_size && h <= max_size) {
        return img;
    }
    debug!(width = w, height = h, max_size, "downscaling image");
    img.resize(max_size, max_size, FilterType::Triangle)
}

/// フレームを固定品質のJPEGにエンコード
pub fn encode_frame(img: DynamicImage, options: &EncodeOptions) -> Result<EncodedImage> {
    let img = fit_within(img, options.max_image_size);
    let (width, height) = img.dimensions();
    let rgb = img.to_rgb8();

    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, options.jpeg_quality);
        encoder
            .encode_image(&rgb)
            .map_err(|e| EcoSenseError::ImageDecode(format!("JPEG encode: {}", e)))?;
    }

    Ok(EncodedImage {
        mime_type: DEFAULT_MIME_TYPE.to_string(),
        data: STANDARD.encode(buf.into_inner()),
        width,
        height,
    })
}

/// アップロードされたファイルの内容を検証してエンコード
///
/// 拡張子で画像MIMEタイプかを確認し、さらに中身をデコードできることを確認する。
/// 上限以下の画像は元のバイト列をそのまま使う。
pub fn encode_upload(path: &Path, bytes: &[u8], options: &EncodeOptions) -> Result<EncodedImage> {
    if mime_type_for_path(path).is_none() {
        return Err(EcoSenseError::UnsupportedImage(path.display().to_string()));
    }

    let format = image::guess_format(bytes)
        .map_err(|_| EcoSenseError::UnsupportedImage(path.display().to_string()))?;
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| EcoSenseError::ImageDecode(format!("{}: {}", path.display(), e)))?;

    let (w, h) = img.dimensions();
    let passthrough = options.max_image_size == 0
        || (w <= options.max_image_size && h <= options.max_image_size);
    if passthrough && is_inline_format(format) {
        return Ok(EncodedImage {
            mime_type: format.to_mime_type().to_string(),
            data: STANDARD.encode(bytes),
            width: w,
            height: h,
        });
    }

    encode_frame(img, options)
}

/// そのまま推論APIへ送れる形式
fn is_inline_format(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP)
}

/// 画像ソース（カメラ1台 + ファイル）
///
/// カメラストリームは同時に1本まで。再取得の前に必ず解放する。
pub struct ImageSource<C: Camera> {
    camera: C,
    stream: Option<C::Stream>,
    options: EncodeOptions,
}

impl<C: Camera> ImageSource<C> {
    pub fn new(camera: C, options: EncodeOptions) -> Self {
        Self { camera, stream: None, options }
    }

    pub fn is_camera_active(&self) -> bool {
        self.stream.is_some()
    }

    /// カメラを起動（既存ストリームは先に解放）
    pub async fn start_capture(&mut self) -> Result<()> {
        self.cancel();
        let stream = self.camera.open().await?;
        self.stream = Some(stream);
        Ok(())
    }

    /// 現在フレームを取得してカメラを止める
    ///
    /// 取得に失敗してもストリームは解放される。
    pub async fn capture_frame(&mut self) -> Result<EncodedImage> {
        let mut stream = self
            .stream
            .take()
            .ok_or(EcoSenseError::InvalidTransition("camera is not active"))?;

        let frame = stream.grab_frame().await;
        stream.stop();
        drop(stream);

        encode_frame(frame?, &self.options)
    }

    /// ファイルを読み込む（カメラ起動中なら先に止める）
    pub async fn upload_file(&mut self, path: &Path) -> Result<EncodedImage> {
        if self.is_camera_active() {
            debug!("stopping camera before upload");
            self.cancel();
        }
        if mime_type_for_path(path).is_none() {
            return Err(EcoSenseError::UnsupportedImage(path.display().to_string()));
        }
        let bytes = tokio::fs::read(path).await?;
        encode_upload(path, &bytes, &self.options)
    }

    /// 保持中のストリームを解放
    pub fn cancel(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
    }
}

impl<C: Camera> Drop for ImageSource<C> {
    fn drop(&mut self) {
        if self.stream.is_some() {
            warn!("image source dropped with an active camera stream; releasing");
            self.cancel();
        }
    }
}
