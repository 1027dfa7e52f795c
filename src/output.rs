//! Transcript delivery: clipboard plus a user-facing notification.

use arboard::Clipboard;
use thiserror::Error;
use tracing::{info, warn};

use crate::transcription::Transcript;

/// Errors delivering a transcript
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
}

/// Destination for finished transcripts.
///
/// The lifecycle only talks to this trait; tests substitute a recording fake.
#[cfg_attr(test, mockall::automock)]
pub trait OutputSink: Send {
    /// Deliver a non-empty transcript to the user
    ///
    /// # Errors
    /// Returns error if the transcript could not be handed over
    fn deliver(&mut self, transcript: &Transcript) -> Result<(), OutputError>;

    /// Tell the user a session produced nothing (error or empty result)
    fn announce_failure(&mut self, message: &str);
}

/// Generate preview of text for logging and notifications (pure, testable)
///
/// Truncates text >50 chars with "..." suffix. Respects UTF-8 char boundaries.
#[must_use]
pub fn preview(text: &str) -> String {
    if text.len() > 50 {
        // Find char boundary at or before byte 47
        let mut end = 47.min(text.len());
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            return "...".to_owned();
        }
        format!("{}...", &text[..end])
    } else {
        text.to_owned()
    }
}

/// Notification body for a delivered transcript
#[must_use]
pub fn notification_body(transcript: &Transcript) -> String {
    format!(
        "{} ({:.1}s)",
        preview(&transcript.text),
        transcript.audio_duration.as_secs_f64()
    )
}

/// Copies transcripts to the system clipboard and posts a notification
pub struct ClipboardSink {
    notify: bool,
}

impl ClipboardSink {
    #[must_use]
    pub const fn new(notify: bool) -> Self {
        Self { notify }
    }

    fn post_notification(summary: &str, body: &str) {
        // Notification failure never fails the delivery, the text is already
        // on the clipboard
        if let Err(e) = notify_rust::Notification::new()
            .summary(summary)
            .body(body)
            .show()
        {
            warn!("failed to post notification: {}", e);
        }
    }
}

impl OutputSink for ClipboardSink {
    fn deliver(&mut self, transcript: &Transcript) -> Result<(), OutputError> {
        let mut clipboard =
            Clipboard::new().map_err(|e| OutputError::Clipboard(e.to_string()))?;
        clipboard
            .set_text(transcript.text.clone())
            .map_err(|e| OutputError::Clipboard(e.to_string()))?;

        info!(
            text_len = transcript.text.len(),
            text_preview = %preview(&transcript.text),
            "transcript copied to clipboard"
        );

        if self.notify {
            Self::post_notification("Voice Mode", &notification_body(transcript));
        }
        Ok(())
    }

    fn announce_failure(&mut self, message: &str) {
        warn!(message, "announcing failed session");
        if self.notify {
            Self::post_notification("Voice Mode", message);
        }
    }
}
