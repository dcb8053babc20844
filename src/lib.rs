//! EcoSense
//!
//! 画像取得 → AI推論 → オーバーレイ表示 → 履歴記録 のパイプライン

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod inference;
pub mod logging;
pub mod render;
pub mod session;

pub use ecosense_common as common;
