use std::time::{Duration, Instant};
use tracing::debug;

/// Logical hold edge produced by the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// The hold began
    Press,
    /// The hold ended
    Release,
}

/// How physical key events map to logical hold edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMode {
    /// Toggle key (CapsLock-style): key-down edges only. First key-down is
    /// the logical press, the next key-down is the logical release; physical
    /// key-up is ignored because toggle keys report it unreliably.
    Toggle,
    /// Momentary combination: physical down/up map 1:1 to press/release.
    Momentary,
}

/// Detector state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoldState {
    WaitingForPress,
    Holding { since: Instant },
}

/// Translates physical key events into logical hold press/release edges.
///
/// Kept deliberately separate from the recording lifecycle: this machine only
/// knows about key edges and time, and is driven with explicit `Instant`s so
/// synthetic event sequences can exercise every path.
///
/// Policy in toggle mode: key-downs inside the debounce window after a press
/// are treated as key repeat and ignored; a hold that outlives `hold_timeout`
/// synthesizes a release (the user toggled and walked away).
#[derive(Debug)]
pub struct EdgeDetector {
    mode: DetectionMode,
    state: HoldState,
    debounce: Duration,
    hold_timeout: Duration,
}

impl EdgeDetector {
    #[must_use]
    pub const fn new(mode: DetectionMode, debounce: Duration, hold_timeout: Duration) -> Self {
        Self {
            mode,
            state: HoldState::WaitingForPress,
            debounce,
            hold_timeout,
        }
    }

    /// Whether a hold is currently in progress
    #[must_use]
    pub const fn is_holding(&self) -> bool {
        matches!(self.state, HoldState::Holding { .. })
    }

    /// Feed a physical key-down at `now`
    pub fn on_key_down(&mut self, now: Instant) -> Option<Edge> {
        match self.state {
            HoldState::WaitingForPress => {
                self.state = HoldState::Holding { since: now };
                Some(Edge::Press)
            }
            HoldState::Holding { since } => match self.mode {
                DetectionMode::Toggle => {
                    if now.duration_since(since) < self.debounce {
                        debug!("key-down inside debounce window (key repeat, ignored)");
                        None
                    } else {
                        self.state = HoldState::WaitingForPress;
                        Some(Edge::Release)
                    }
                }
                // A second down while held is key repeat for a momentary combo
                DetectionMode::Momentary => None,
            },
        }
    }

    /// Feed a physical key-up at `now`
    pub fn on_key_up(&mut self, _now: Instant) -> Option<Edge> {
        match (self.mode, self.state) {
            (DetectionMode::Momentary, HoldState::Holding { .. }) => {
                self.state = HoldState::WaitingForPress;
                Some(Edge::Release)
            }
            // Toggle keys report up events unreliably: ignore them entirely,
            // and ignore up while not holding in either mode
            _ => None,
        }
    }

    /// Poll for a timed-out hold; call periodically from the observer loop
    pub fn poll_timeout(&mut self, now: Instant) -> Option<Edge> {
        if let HoldState::Holding { since } = self.state {
            if now.duration_since(since) >= self.hold_timeout {
                debug!("hold exceeded timeout, synthesizing release");
                self.state = HoldState::WaitingForPress;
                return Some(Edge::Release);
            }
        }
        None
    }
}
