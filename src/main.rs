use anyhow::bail;
use clap::Parser;
use ecosense::acquisition::{DeviceCamera, EncodeOptions, ImageSource};
use ecosense::controller::{ScanOutcome, ViewController, ViewState};
use ecosense::inference::GeminiClient;
use ecosense::{cli, config, display, logging, render, session};
use cli::{Cli, Commands};
use config::Config;
use ecosense_common::Detection;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Scan { image, camera, mode, annotate, output } => {
            println!("🌿 ecosense - スキャン\n");

            let mut controller = build_controller(&config)?;
            controller.set_mode(mode.unwrap_or(config.default_mode))?;

            let outcome = if camera {
                println!("[1/2] カメラ起動中...");
                controller.start_capture().await?;
                if let Some(message) = controller.error() {
                    bail!("{}", message);
                }
                println!("[2/2] 撮影・解析中...");
                session::capture_with_progress(&mut controller).await
            } else {
                // clap が --image か --camera のどちらかを保証する
                let Some(path) = image else {
                    bail!("--image か --camera を指定してください");
                };
                println!("[1/1] 解析中: {}", path.display());
                session::upload_with_progress(&mut controller, &path).await
            };

            display::print_view(&controller);

            match outcome {
                Ok(ScanOutcome::Failed(message)) => bail!("{}", message),
                Err(e) => bail!("{}", e.user_message()),
                Ok(ScanOutcome::NothingFound) => {}
                Ok(ScanOutcome::Detected { .. }) => {}
            }

            if let ViewState::Result { image, detections } = controller.state() {
                if let Some(path) = annotate {
                    render::save_annotated(image, detections, &path)?;
                    println!("✔ 検出枠を描画: {}", path.display());
                }
                if let Some(path) = output {
                    write_detections(&path, detections)?;
                    println!("✔ 結果を保存: {}", path.display());
                }
            }

            println!("\n✅ 完了");
        }

        Commands::Session { mode } => {
            let mut controller = build_controller(&config)?;
            controller.set_mode(mode.unwrap_or(config.default_mode))?;
            println!("🌿 ecosense - 対話セッション (Esc / q で終了)");
            session::run(controller).await?;
        }

        Commands::Dashboard { offline } => {
            display::print_dashboard(offline);
        }

        Commands::Config { set_api_key, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if show {
                println!("設定:");
                println!("  パス: {}", Config::config_path()?.display());
                println!("  モデル: {}", config.model);
                println!("  最大画像サイズ: {}px", config.max_image_size);
                println!("  JPEG品質: {}", config.jpeg_quality);
                println!("  カメラ: {}", config.camera_device.display());
                println!("  キャプチャコマンド: {}", config.capture_command.join(" "));
                println!("  既定モード: {}", config.default_mode);
                println!(
                    "  APIキー: {}",
                    if config.get_api_key().is_ok() { "設定済み" } else { "未設定" }
                );
            }
        }
    }

    Ok(())
}

fn build_controller(config: &Config) -> anyhow::Result<ViewController<DeviceCamera, GeminiClient>> {
    let camera = DeviceCamera::from_config(config);
    let source = ImageSource::new(camera, EncodeOptions::from_config(config));
    let client = GeminiClient::from_config(config)?;
    Ok(ViewController::new(source, client, config.default_mode))
}

fn write_detections(path: &std::path::Path, detections: &[Detection]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(detections)?;
    std::fs::write(path, json)?;
    Ok(())
}
