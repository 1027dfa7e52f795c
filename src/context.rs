//! Frontmost-application snapshot, taken when a recording starts and passed
//! to transcription as a prompt hint.

use tracing::debug;

use crate::config::ContextConfig;

/// What was on screen when the user started dictating
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub application: String,
}

impl ContextSnapshot {
    /// Hint string fed to the transcription prompt
    #[must_use]
    pub fn hint(&self) -> String {
        format!("Dictating into {}.", self.application)
    }
}

/// Source of context snapshots
pub trait ContextCapture: Send {
    fn capture(&self) -> Option<ContextSnapshot>;
}

/// Capture disabled or unsupported on this platform
pub struct NullContext;

impl ContextCapture for NullContext {
    fn capture(&self) -> Option<ContextSnapshot> {
        None
    }
}

#[cfg(target_os = "macos")]
pub struct WorkspaceContext;

#[cfg(target_os = "macos")]
impl ContextCapture for WorkspaceContext {
    fn capture(&self) -> Option<ContextSnapshot> {
        let workspace = objc2_app_kit::NSWorkspace::sharedWorkspace();
        let app = workspace.frontmostApplication()?;
        let name = app.localizedName()?;
        let snapshot = ContextSnapshot {
            application: name.to_string(),
        };
        debug!(application = %snapshot.application, "captured context");
        Some(snapshot)
    }
}

/// Build the capture source for this configuration and platform
#[must_use]
pub fn capture_source(config: &ContextConfig) -> Box<dyn ContextCapture> {
    if !config.enabled {
        return Box::new(NullContext);
    }
    #[cfg(target_os = "macos")]
    {
        Box::new(WorkspaceContext)
    }
    #[cfg(not(target_os = "macos"))]
    {
        debug!("context capture unsupported on this platform");
        Box::new(NullContext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_names_application() {
        let snapshot = ContextSnapshot {
            application: "Notes".to_string(),
        };
        assert_eq!(snapshot.hint(), "Dictating into Notes.");
    }

    #[test]
    fn test_null_context_captures_nothing() {
        assert!(NullContext.capture().is_none());
    }

    #[test]
    fn test_disabled_config_is_null() {
        let source = capture_source(&ContextConfig { enabled: false });
        assert!(source.capture().is_none());
    }
}
