//! Hotkey observation: OS-level registration and logical edge detection

pub mod hotkey;
pub mod toggle;

pub use hotkey::HotkeyMonitor;
pub use toggle::{DetectionMode, Edge, EdgeDetector};
