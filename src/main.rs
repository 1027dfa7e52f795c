use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, watch};

use voicemode::audio::AudioCapture;
use voicemode::config::Config;
use voicemode::context;
use voicemode::input::HotkeyMonitor;
use voicemode::lifecycle::{self, Event, Lifecycle, OverlayIndicator};
use voicemode::output::ClipboardSink;
use voicemode::overlay::OverlayController;
use voicemode::transcription::{download, TranscriptionService};
use voicemode::{permissions, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    telemetry::init(config.telemetry.enabled, &config.telemetry.log_path)?;
    tracing::info!("voicemode starting");

    permissions::request_all_permissions()?;

    // Fetch the model before anything can record
    let model_name = config.model.name.clone();
    let model_path = Config::expand_path(&config.model.path)?;
    tokio::task::spawn_blocking(move || download::ensure_model(&model_name, &model_path))
        .await??;

    let service = Arc::new(TranscriptionService::new(&config.model)?);
    if config.model.preload {
        let preload_service = Arc::clone(&service);
        tokio::task::spawn_blocking(move || preload_service.preload()).await??;
    }

    let mut capture = AudioCapture::new(&config.audio);
    let amplitude = capture.amplitude();

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (overlay_tx, overlay_rx) = mpsc::unbounded_channel();
    let (frame_tx, frame_rx) = watch::channel(None);

    let overlay = OverlayController::new(&config.overlay, amplitude, overlay_rx, frame_tx);
    tokio::spawn(overlay.run());

    let submit = lifecycle::transcription_submitter(
        Arc::clone(&service),
        config.model.timeout(),
        event_tx.clone(),
    );
    let (machine, status_rx) = Lifecycle::new(
        &config,
        Box::new(capture),
        Box::new(OverlayIndicator::new(overlay_tx)),
        Box::new(ClipboardSink::new(true)),
        context::capture_source(&config.context),
        submit,
    );
    let lifecycle_task = tokio::spawn(machine.run(event_rx));

    // The OS hotkey manager must live on the main thread, so the main loop
    // polls it instead of owning a task
    let mut hotkey = HotkeyMonitor::new(
        &config.hotkey,
        config.audio.max_session(),
        event_tx.clone(),
    )?;

    #[cfg(target_os = "macos")]
    let mut tray = voicemode::tray::TrayManager::new()?;
    #[cfg(not(target_os = "macos"))]
    let _ = (&status_rx, &frame_rx);

    tracing::info!("event loop starting (press Ctrl+C to exit)");

    loop {
        hotkey.poll();

        #[cfg(target_os = "macos")]
        {
            let status = *status_rx.borrow();
            let meter = frame_rx.borrow().clone();
            if let Err(e) = tray.update(status, meter.as_deref()) {
                tracing::error!("failed to update tray: {}", e);
            }

            match voicemode::tray::TrayManager::poll_events() {
                Some(voicemode::tray::TrayCommand::TogglePause) => {
                    let event = if status.paused {
                        Event::Resume
                    } else {
                        Event::Pause
                    };
                    let _ = event_tx.send(event);
                }
                Some(voicemode::tray::TrayCommand::OpenConfigFile) => open_config_file(),
                Some(voicemode::tray::TrayCommand::Quit) => {
                    tracing::info!("quit selected from menu");
                    let _ = event_tx.send(Event::Shutdown);
                    break;
                }
                None => {}
            }
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                let _ = event_tx.send(Event::Shutdown);
                break;
            }
            () = tokio::time::sleep(tokio::time::Duration::from_millis(10)) => {
                // Poll interval (10ms to avoid busy-waiting)
            }
        }
    }

    let _ = lifecycle_task.await;
    tracing::info!("voicemode stopped");
    Ok(())
}

#[cfg(target_os = "macos")]
fn open_config_file() {
    let Ok(home) = std::env::var("HOME") else {
        tracing::error!("HOME not set, cannot open config file");
        return;
    };
    let path = std::path::PathBuf::from(home).join(".voicemode.toml");
    if let Err(e) = std::process::Command::new("open").arg(&path).spawn() {
        tracing::error!("failed to open config file: {}", e);
    }
}
