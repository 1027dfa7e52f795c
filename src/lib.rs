//! Voice Mode - macOS menu bar dictation app
//!
//! Hold the toggle key, speak, tap it again: the transcript lands on the
//! clipboard. This library exports the core modules for testing.

/// Audio capture and sample conversion
pub mod audio;
/// Configuration management
pub mod config;
/// Frontmost-application context hints
pub mod context;
/// Input handling (hotkey registration, edge detection)
pub mod input;
/// Recording lifecycle state machine
pub mod lifecycle;
/// Transcript delivery (clipboard, notification)
pub mod output;
/// Recording overlay (amplitude meter)
pub mod overlay;
/// macOS permission checks
pub mod permissions;
/// Telemetry and crash logging
pub mod telemetry;
/// Menu bar surface
#[cfg(target_os = "macos")]
pub mod tray;
/// Whisper transcription engine
pub mod transcription;
