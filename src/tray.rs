//! Menu bar surface: a status icon per lifecycle state, the live amplitude
//! meter as the item title, and a small control menu.

use anyhow::{Context, Result};
use std::collections::HashMap;
use tray_icon::menu::{Menu, MenuEvent, MenuItem, PredefinedMenuItem};
use tray_icon::{Icon, TrayIconBuilder};

use crate::lifecycle::{LifecycleState, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayCommand {
    TogglePause,
    OpenConfigFile,
    Quit,
}

const ICON_SIZE: u32 = 32;

// Stable menu item ids. MenuItem::new assigns auto-generated numeric ids,
// which cannot be matched against when dispatching MenuEvents.
const PAUSE_ID: &str = "pause";
const OPEN_CONFIG_ID: &str = "open-config";
const QUIT_ID: &str = "quit";

/// Fill color per state (RGBA)
const fn state_color(state: LifecycleState) -> [u8; 4] {
    match state {
        LifecycleState::Idle => [120, 120, 120, 255],
        LifecycleState::Recording => [220, 60, 60, 255],
        LifecycleState::Transcribing => [230, 170, 40, 255],
        LifecycleState::Error => [150, 30, 30, 255],
    }
}

/// Render a filled-circle status icon for a state
#[allow(clippy::cast_precision_loss)]
fn icon_pixels(state: LifecycleState) -> Vec<u8> {
    let color = state_color(state);
    let mut image = image::RgbaImage::new(ICON_SIZE, ICON_SIZE);
    let center = (ICON_SIZE as f32 - 1.0) / 2.0;
    let radius = ICON_SIZE as f32 / 2.0 - 2.0;
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let dx = x as f32 - center;
        let dy = y as f32 - center;
        if (dx * dx + dy * dy).sqrt() <= radius {
            *pixel = image::Rgba(color);
        }
    }
    image.into_raw()
}

fn status_text(status: Status) -> &'static str {
    if status.paused {
        return "Voice Mode - Paused";
    }
    match status.state {
        LifecycleState::Idle => "Voice Mode - Ready",
        LifecycleState::Recording => "Recording...",
        LifecycleState::Transcribing => "Transcribing...",
        LifecycleState::Error => "Voice Mode - Error",
    }
}

fn pause_label(status: Status) -> &'static str {
    if status.paused {
        "Resume Dictation"
    } else {
        "Pause Dictation"
    }
}

pub struct TrayManager {
    tray: tray_icon::TrayIcon,
    current: Status,
    cached_icons: HashMap<LifecycleState, Icon>,
}

impl TrayManager {
    pub fn new() -> Result<Self> {
        let mut cached_icons = HashMap::new();
        for state in [
            LifecycleState::Idle,
            LifecycleState::Recording,
            LifecycleState::Transcribing,
            LifecycleState::Error,
        ] {
            let icon = Icon::from_rgba(icon_pixels(state), ICON_SIZE, ICON_SIZE)
                .context("failed to create icon from RGBA data")?;
            cached_icons.insert(state, icon);
        }

        let initial = Status {
            state: LifecycleState::Idle,
            paused: false,
        };
        let tray = Self::build_tray(initial, &cached_icons)?;

        Ok(Self {
            tray,
            current: initial,
            cached_icons,
        })
    }

    fn build_tray(
        status: Status,
        cached_icons: &HashMap<LifecycleState, Icon>,
    ) -> Result<tray_icon::TrayIcon> {
        let icon = cached_icons
            .get(&status.state)
            .with_context(|| format!("icon for state {:?} not in cache", status.state))?
            .clone();
        let menu = Self::build_menu(status)?;

        TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_tooltip("Voice Mode")
            .with_icon(icon)
            .build()
            .context("failed to build tray icon")
    }

    fn build_menu(status: Status) -> Result<Menu> {
        let menu = Menu::new();

        let status_item = MenuItem::new(status_text(status), false, None);
        menu.append(&status_item)
            .context("failed to append status item")?;
        menu.append(&PredefinedMenuItem::separator())
            .context("failed to append separator")?;

        let pause = MenuItem::with_id(PAUSE_ID, pause_label(status), true, None);
        menu.append(&pause).context("failed to append pause item")?;

        let open_config = MenuItem::with_id(OPEN_CONFIG_ID, "Open Config File", true, None);
        menu.append(&open_config)
            .context("failed to append open config item")?;

        menu.append(&PredefinedMenuItem::separator())
            .context("failed to append separator")?;

        // A plain item, not PredefinedMenuItem::quit: the native quit selector
        // bypasses the event channel and would skip lifecycle shutdown
        let quit = MenuItem::with_id(QUIT_ID, "Quit Voice Mode", true, None);
        menu.append(&quit).context("failed to append quit item")?;

        Ok(menu)
    }

    /// Reflect a lifecycle status change and the latest meter frame
    pub fn update(&mut self, status: Status, meter: Option<&str>) -> Result<()> {
        if status != self.current {
            tracing::debug!(?status, "tray status change");
            // Rebuild the whole tray on change (macOS set_icon does not
            // reliably repaint an existing item)
            self.tray = Self::build_tray(status, &self.cached_icons)?;
            self.current = status;
        }
        self.tray.set_title(meter);
        Ok(())
    }

    pub fn poll_events() -> Option<TrayCommand> {
        if let Ok(event) = MenuEvent::receiver().try_recv() {
            let id = event.id.0.as_str();
            tracing::debug!("tray menu event received: id={:?}", id);
            return parse_menu_event(id);
        }
        None
    }
}

fn parse_menu_event(id: &str) -> Option<TrayCommand> {
    match id {
        PAUSE_ID => Some(TrayCommand::TogglePause),
        OPEN_CONFIG_ID => Some(TrayCommand::OpenConfigFile),
        QUIT_ID => Some(TrayCommand::Quit),
        _ => None,
    }
}
