//! EcoSense Common Library
//!
//! CLIと対話セッションで共有される型とユーティリティ

pub mod types;
pub mod error;
pub mod prompts;
pub mod parser;
pub mod theme;
pub mod overlay;
pub mod history;
pub mod dashboard;

pub use types::{BoundingBox, Detection, ScanHistoryItem, ScanMode};
pub use error::{Error, Result};
pub use prompts::{build_prompt, mode_instruction, response_schema};
pub use parser::{extract_json, parse_detections, validate_detection};
pub use theme::{theme_for_label, Theme};
pub use overlay::{build_overlays, overlay_rect, DisplayBox, Overlay, OverlayRect};
pub use history::{HistorySummary, ScanHistory};
