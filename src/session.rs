//! 対話セッション
//!
//! メニューから操作を選び、ViewController の状態遷移を1つずつ進める。
//! セッション終了時にカメラは必ず解放される。

use crate::acquisition::Camera;
use crate::controller::{ScanOutcome, ViewController, ViewState};
use crate::display;
use crate::render;
use crate::error::EcoSenseError;
use crate::inference::Inference;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use ecosense_common::{HistorySummary, ScanMode};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StartCamera,
    Capture,
    ScanAgain,
    Upload,
    ChangeMode,
    ToggleHistory,
    ClearHistory,
    ExportHistory,
    Dashboard,
    Quit,
}

impl Action {
    pub fn label(&self, history_visible: bool) -> &'static str {
        match self {
            Action::StartCamera => "Start camera",
            Action::Capture => "Capture",
            Action::ScanAgain => "Scan new item",
            Action::Upload => "Upload image",
            Action::ChangeMode => "Change mode",
            Action::ToggleHistory if history_visible => "Hide history",
            Action::ToggleHistory => "Show history",
            Action::ClearHistory => "Clear history",
            Action::ExportHistory => "Save annotated scan",
            Action::Dashboard => "Dashboard",
            Action::Quit => "Quit",
        }
    }
}

/// 現在の状態で選べる操作
pub fn available_actions(
    state: &ViewState,
    history_visible: bool,
    history_len: usize,
) -> Vec<Action> {
    let mut actions = match state {
        ViewState::Loading => vec![],
        ViewState::Idle => vec![Action::StartCamera, Action::Upload, Action::ChangeMode],
        ViewState::CameraActive => vec![Action::Capture, Action::Upload, Action::ChangeMode],
        ViewState::Result { .. } => vec![Action::ScanAgain, Action::Upload, Action::ChangeMode],
    };
    actions.push(Action::ToggleHistory);
    if history_visible && history_len > 0 {
        actions.push(Action::ExportHistory);
        actions.push(Action::ClearHistory);
    }
    actions.push(Action::Dashboard);
    actions.push(Action::Quit);
    actions
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// スピナーを出しながら推論を待つ
pub async fn capture_with_progress<C: Camera, I: Inference>(
    controller: &mut ViewController<C, I>,
) -> crate::error::Result<ScanOutcome> {
    let pending = controller.begin_capture().await?;
    let pb = spinner(controller.status_text());
    let result = controller.run_inference(&pending).await;
    pb.finish_and_clear();
    controller.finish_scan(pending, result)
}

pub async fn upload_with_progress<C: Camera, I: Inference>(
    controller: &mut ViewController<C, I>,
    path: &std::path::Path,
) -> crate::error::Result<ScanOutcome> {
    let pending = controller.begin_upload(path).await?;
    let pb = spinner(controller.status_text());
    let result = controller.run_inference(&pending).await;
    pb.finish_and_clear();
    controller.finish_scan(pending, result)
}

fn print_outcome(outcome: &crate::error::Result<ScanOutcome>) {
    match outcome {
        Ok(ScanOutcome::Detected { count, .. }) => {
            println!("✔ {}件検出、履歴に追加しました", count)
        }
        Ok(ScanOutcome::NothingFound) | Ok(ScanOutcome::Failed(_)) => {}
        // 失敗メッセージは画面状態の error に入っている
        Err(e) => debug!(error = %e, "action rejected"),
    }
}

/// 対話ループ
pub async fn run<C: Camera, I: Inference>(
    mut controller: ViewController<C, I>,
) -> anyhow::Result<()> {
    let theme = ColorfulTheme::default();

    loop {
        println!();
        display::print_view(&controller);

        let actions = available_actions(
            controller.state(),
            controller.history_visible(),
            controller.history().len(),
        );
        let labels: Vec<&str> = actions
            .iter()
            .map(|a| a.label(controller.history_visible()))
            .collect();

        let choice = Select::with_theme(&theme)
            .with_prompt(format!("[{}]", controller.primary_action_label()))
            .items(&labels)
            .default(0)
            .interact_opt()?;

        let Some(index) = choice else {
            break;
        };

        match actions[index] {
            Action::StartCamera => {
                controller.start_capture().await?;
            }
            Action::Capture => {
                let outcome = capture_with_progress(&mut controller).await;
                print_outcome(&outcome);
            }
            Action::ScanAgain => {
                controller.scan_again().await?;
            }
            Action::Upload => {
                let path: String = Input::with_theme(&theme)
                    .with_prompt("Image path")
                    .interact_text()?;
                let path = PathBuf::from(path.trim());
                let outcome = upload_with_progress(&mut controller, &path).await;
                print_outcome(&outcome);
            }
            Action::ChangeMode => {
                let modes: Vec<&str> = ScanMode::ALL.iter().map(|m| m.button_label()).collect();
                let current = ScanMode::ALL
                    .iter()
                    .position(|m| *m == controller.mode())
                    .unwrap_or(0);
                let selected = Select::with_theme(&theme)
                    .with_prompt("Mode")
                    .items(&modes)
                    .default(current)
                    .interact()?;
                if let Err(e @ EcoSenseError::Busy) = controller.set_mode(ScanMode::ALL[selected]) {
                    println!("{}", e);
                }
            }
            Action::ToggleHistory => {
                controller.toggle_history();
            }
            Action::ClearHistory => {
                let confirmed = Confirm::with_theme(&theme)
                    .with_prompt("Clear all scan history?")
                    .default(false)
                    .interact()?;
                if confirmed {
                    controller.clear_history();
                }
            }
            Action::ExportHistory => {
                let items = controller.history().items();
                let summaries: Vec<String> = items
                    .iter()
                    .map(|item| HistorySummary::from_item(item).render())
                    .collect();
                let selected = Select::with_theme(&theme)
                    .with_prompt("Scan")
                    .items(&summaries)
                    .default(0)
                    .interact()?;
                let output: String = Input::with_theme(&theme)
                    .with_prompt("Output image path")
                    .default(format!("scan-{}.png", items[selected].id))
                    .interact_text()?;
                let output = PathBuf::from(output.trim());
                match render::save_history_item(&items[selected], &output) {
                    Ok(()) => println!("✔ 検出枠を描画: {}", output.display()),
                    Err(e) => println!("⚠ {}", e),
                }
            }
            Action::Dashboard => {
                println!();
                display::print_dashboard(false);
            }
            Action::Quit => break,
        }
    }

    controller.cancel();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions_idle() {
        let actions = available_actions(&ViewState::Idle, false, 0);
        assert_eq!(actions[0], Action::StartCamera);
        assert!(actions.contains(&Action::Upload));
        assert!(!actions.contains(&Action::Capture));
        assert!(!actions.contains(&Action::ClearHistory));
    }

    #[test]
    fn test_actions_camera_active() {
        let actions = available_actions(&ViewState::CameraActive, false, 0);
        assert_eq!(actions[0], Action::Capture);
        assert!(!actions.contains(&Action::StartCamera));
    }

    #[test]
    fn test_actions_loading_gate() {
        let actions = available_actions(&ViewState::Loading, true, 3);
        assert!(!actions.contains(&Action::Capture));
        assert!(!actions.contains(&Action::Upload));
        assert!(!actions.contains(&Action::ChangeMode));
        assert!(actions.contains(&Action::ToggleHistory));
    }

    #[test]
    fn test_clear_history_only_when_visible_and_non_empty() {
        assert!(!available_actions(&ViewState::Idle, true, 0).contains(&Action::ClearHistory));
        assert!(!available_actions(&ViewState::Idle, false, 2).contains(&Action::ClearHistory));
        assert!(available_actions(&ViewState::Idle, true, 2).contains(&Action::ClearHistory));
    }

    #[test]
    fn test_export_history_only_with_entries() {
        assert!(!available_actions(&ViewState::Idle, true, 0).contains(&Action::ExportHistory));
        assert!(available_actions(&ViewState::Loading, true, 1).contains(&Action::ExportHistory));
    }

    #[test]
    fn test_toggle_history_label() {
        assert_eq!(Action::ToggleHistory.label(false), "Show history");
        assert_eq!(Action::ToggleHistory.label(true), "Hide history");
    }
}
