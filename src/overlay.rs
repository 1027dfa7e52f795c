//! Recording overlay: renders a live amplitude meter while a session is open.
//!
//! The controller owns no OS surface itself. It publishes rendered frames
//! through a `watch` channel and the main-thread surface (the menu bar item)
//! displays the latest frame, so rendering stays off the audio and lifecycle
//! paths entirely.

use std::time::Duration;

use tokio::sync::{mpsc::UnboundedReceiver, watch};
use tracing::debug;

use crate::audio::AmplitudeHandle;
use crate::config::OverlayConfig;

/// Commands from the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayCommand {
    Show,
    Hide,
}

/// Meter cells in a rendered frame
const METER_WIDTH: usize = 12;

/// Speech RMS sits well below full scale, boost before rendering
const METER_GAIN: f32 = 8.0;

const GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render an amplitude level in `0.0..=1.0` as a fixed-width bar meter
#[must_use]
pub fn render_meter(level: f32, width: usize) -> String {
    let level = if level.is_finite() {
        level.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let cells = level * width as f32;
    (0..width)
        .map(|i| {
            let fill = (cells - i as f32).clamp(0.0, 1.0);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let idx = (fill * 7.0).round() as usize;
            GLYPHS[idx]
        })
        .collect()
}

/// Periodically renders the microphone amplitude while visible
pub struct OverlayController {
    enabled: bool,
    refresh: Duration,
    amplitude: AmplitudeHandle,
    commands: UnboundedReceiver<OverlayCommand>,
    frames: watch::Sender<Option<String>>,
}

impl OverlayController {
    pub fn new(
        config: &OverlayConfig,
        amplitude: AmplitudeHandle,
        commands: UnboundedReceiver<OverlayCommand>,
        frames: watch::Sender<Option<String>>,
    ) -> Self {
        Self {
            enabled: config.enabled,
            refresh: config.refresh(),
            amplitude,
            commands,
            frames,
        }
    }

    /// Command and render loop; runs until the command channel closes
    pub async fn run(mut self) {
        let mut visible = false;
        let mut ticker = tokio::time::interval(self.refresh);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(OverlayCommand::Show) => {
                        if self.enabled {
                            debug!("overlay shown");
                            visible = true;
                        }
                    }
                    Some(OverlayCommand::Hide) => {
                        if visible {
                            debug!("overlay hidden");
                        }
                        visible = false;
                        self.frames.send_replace(None);
                    }
                    None => break,
                },
                _ = ticker.tick(), if visible => {
                    let level = (self.amplitude.level() * METER_GAIN).min(1.0);
                    self.frames
                        .send_replace(Some(render_meter(level, METER_WIDTH)));
                }
            }
        }
        self.frames.send_replace(None);
    }
}
