use clap::{Parser, Subcommand};
use ecosense_common::ScanMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ecosense")]
#[command(about = "カメラ/画像から廃棄物・作物・水源をAI検出するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 画像1枚をスキャンして検出結果を表示
    Scan {
        /// 解析する画像ファイル
        #[arg(short, long, required_unless_present = "camera", conflicts_with = "camera")]
        image: Option<PathBuf>,

        /// カメラから1フレーム撮影して解析
        #[arg(short, long)]
        camera: bool,

        /// スキャンモード (waste/crop/water)
        #[arg(short, long)]
        mode: Option<ScanMode>,

        /// 検出枠を描き込んだ画像の保存先
        #[arg(short, long)]
        annotate: Option<PathBuf>,

        /// 検出結果JSONの保存先
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 対話セッション（撮影・アップロード・履歴）
    Session {
        /// 初期モード (waste/crop/water)
        #[arg(short, long)]
        mode: Option<ScanMode>,
    },

    /// 環境ダッシュボードを表示
    Dashboard {
        /// オフライン表示
        #[arg(long)]
        offline: bool,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
