//! tracing の初期化
//!
//! ログは stderr に出す（stdout はスキャン結果の表示用）。

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// フィルタを上書きする環境変数
pub const LOG_ENV_VAR: &str = "ECOSENSE_LOG";

pub fn init_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| default_filter.to_string());

    // 二重初期化（テストなど）は無視
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .without_time(),
        )
        .with(EnvFilter::new(filter))
        .try_init();
}
