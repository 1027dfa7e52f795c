use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use global_hotkey::{
    hotkey::{Code, HotKey, Modifiers},
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::config::{HotkeyConfig, HotkeyMode};
use crate::input::toggle::{DetectionMode, Edge, EdgeDetector};
use crate::lifecycle::Event;

/// Global hotkey registration plus edge detection.
///
/// Must live on the main thread (the OS hotkey manager is not `Send` on
/// macOS), so instead of owning a task it exposes [`poll`](Self::poll) for
/// the main-thread loop to call. Logical press/release edges are forwarded
/// into the lifecycle event channel.
pub struct HotkeyMonitor {
    manager: GlobalHotKeyManager,
    hotkey: HotKey,
    detector: EdgeDetector,
    events: UnboundedSender<Event>,
}

impl HotkeyMonitor {
    /// Register the configured hotkey and wire edges into `events`.
    ///
    /// `hold_timeout` bounds how long a toggle-style hold may run before a
    /// release is synthesized.
    pub fn new(
        config: &HotkeyConfig,
        hold_timeout: Duration,
        events: UnboundedSender<Event>,
    ) -> Result<Self> {
        let manager = GlobalHotKeyManager::new().context("failed to create hotkey manager")?;

        let (hotkey, mode) = match config.mode {
            HotkeyMode::Toggle => {
                let code = parse_toggle_key(&config.toggle_key)?;
                (HotKey::new(None, code), DetectionMode::Toggle)
            }
            HotkeyMode::Momentary => {
                let modifiers = parse_modifiers(&config.modifiers)?;
                let code = parse_key(&config.key)?;
                (HotKey::new(Some(modifiers), code), DetectionMode::Momentary)
            }
        };

        manager
            .register(hotkey)
            .context("failed to register hotkey")?;

        match config.mode {
            HotkeyMode::Toggle => info!("registered toggle key: {}", config.toggle_key),
            HotkeyMode::Momentary => {
                info!("registered hotkey: {:?} + {}", config.modifiers, config.key);
            }
        }

        Ok(Self {
            manager,
            hotkey,
            detector: EdgeDetector::new(mode, config.debounce(), hold_timeout),
            events,
        })
    }

    /// Drain pending OS hotkey events and forward any resulting edges.
    /// Called periodically from the main-thread loop.
    pub fn poll(&mut self) {
        let now = Instant::now();
        let receiver = GlobalHotKeyEvent::receiver();
        while let Ok(event) = receiver.try_recv() {
            if event.id != self.hotkey.id() {
                continue;
            }
            let edge = match event.state {
                HotKeyState::Pressed => self.detector.on_key_down(now),
                HotKeyState::Released => self.detector.on_key_up(now),
            };
            if let Some(edge) = edge {
                self.forward(edge);
            }
        }

        if let Some(edge) = self.detector.poll_timeout(now) {
            self.forward(edge);
        }
    }

    fn forward(&self, edge: Edge) {
        let event = match edge {
            Edge::Press => Event::HotkeyPressed,
            Edge::Release => Event::HotkeyReleased,
        };
        if self.events.send(event).is_err() {
            warn!("lifecycle channel closed, dropping hotkey edge");
        }
    }
}

impl Drop for HotkeyMonitor {
    fn drop(&mut self) {
        if let Err(e) = self.manager.unregister(self.hotkey) {
            tracing::error!("failed to unregister hotkey: {}", e);
        }
    }
}

fn parse_modifiers(modifiers: &[String]) -> Result<Modifiers> {
    let mut result = Modifiers::empty();
    for modifier in modifiers {
        match modifier.as_str() {
            "Control" | "Ctrl" => result |= Modifiers::CONTROL,
            "Option" | "Alt" => result |= Modifiers::ALT,
            "Command" | "Super" => result |= Modifiers::SUPER,
            "Shift" => result |= Modifiers::SHIFT,
            _ => return Err(anyhow!("unknown modifier: {}", modifier)),
        }
    }
    Ok(result)
}

/// Keys usable as a standalone toggle key
fn parse_toggle_key(key: &str) -> Result<Code> {
    match key {
        "CapsLock" => Ok(Code::CapsLock),
        "ScrollLock" => Ok(Code::ScrollLock),
        "F13" => Ok(Code::F13),
        "F14" => Ok(Code::F14),
        "F15" => Ok(Code::F15),
        "F16" => Ok(Code::F16),
        "F17" => Ok(Code::F17),
        "F18" => Ok(Code::F18),
        "F19" => Ok(Code::F19),
        _ => Err(anyhow!("unsupported toggle key: {}", key)),
    }
}

fn parse_key(key: &str) -> Result<Code> {
    match key {
        "A" => Ok(Code::KeyA),
        "B" => Ok(Code::KeyB),
        "C" => Ok(Code::KeyC),
        "D" => Ok(Code::KeyD),
        "E" => Ok(Code::KeyE),
        "F" => Ok(Code::KeyF),
        "G" => Ok(Code::KeyG),
        "H" => Ok(Code::KeyH),
        "I" => Ok(Code::KeyI),
        "J" => Ok(Code::KeyJ),
        "K" => Ok(Code::KeyK),
        "L" => Ok(Code::KeyL),
        "M" => Ok(Code::KeyM),
        "N" => Ok(Code::KeyN),
        "O" => Ok(Code::KeyO),
        "P" => Ok(Code::KeyP),
        "Q" => Ok(Code::KeyQ),
        "R" => Ok(Code::KeyR),
        "S" => Ok(Code::KeyS),
        "T" => Ok(Code::KeyT),
        "U" => Ok(Code::KeyU),
        "V" => Ok(Code::KeyV),
        "W" => Ok(Code::KeyW),
        "X" => Ok(Code::KeyX),
        "Y" => Ok(Code::KeyY),
        "Z" => Ok(Code::KeyZ),
        "Space" => Ok(Code::Space),
        _ => Err(anyhow!("unsupported key: {}", key)),
    }
}
