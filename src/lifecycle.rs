//! Recording lifecycle: the single owner of session state.
//!
//! All state lives in one task. Hotkey edges, pause/resume, and finished
//! transcriptions arrive as [`Event`]s on one channel; the synchronous
//! [`Lifecycle::handle_event`] core applies every transition, and the async
//! [`Lifecycle::run`] shell only does channel plumbing and the max-session
//! deadline. Keeping the core synchronous makes every transition testable
//! with plain fakes.

use std::time::{Duration, Instant};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioCapture, CaptureError};
use crate::config::Config;
use crate::context::ContextCapture;
use crate::output::OutputSink;
use crate::overlay::OverlayCommand;
use crate::transcription::{
    audio_duration, Transcriber, Transcript, TranscriptionError, TranscriptionService,
};

/// Lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Idle,
    Recording,
    Transcribing,
    Error,
}

/// Published status, consumed by the menu bar surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub state: LifecycleState,
    pub paused: bool,
}

impl Status {
    const IDLE: Self = Self {
        state: LifecycleState::Idle,
        paused: false,
    };
}

/// Everything that can drive a transition
#[derive(Debug)]
pub enum Event {
    HotkeyPressed,
    HotkeyReleased,
    /// A recording hold hit the max-session cap
    MaxDurationReached,
    Pause,
    Resume,
    TranscriptionFinished {
        /// Session counter value captured at submit time; stale results
        /// carry an old value and are dropped
        generation: u64,
        outcome: Result<Transcript, TranscriptionError>,
    },
    Shutdown,
}

/// One recording hold from press to submitted audio
struct RecordingSession {
    started_at: Instant,
    generation: u64,
    hint: Option<String>,
}

/// Audio source seam
#[cfg_attr(test, mockall::automock)]
pub trait Recorder: Send {
    /// Open the device and start buffering
    ///
    /// # Errors
    /// Returns error if the device cannot be opened
    fn acquire(&mut self) -> Result<(), CaptureError>;

    /// Stop buffering and drain the captured 16kHz mono samples
    fn release(&mut self) -> Vec<f32>;
}

impl Recorder for AudioCapture {
    fn acquire(&mut self) -> Result<(), CaptureError> {
        AudioCapture::acquire(self)
    }

    fn release(&mut self) -> Vec<f32> {
        AudioCapture::release(self)
    }
}

/// Recording indicator seam (the overlay in production)
#[cfg_attr(test, mockall::automock)]
pub trait Indicator: Send {
    fn show(&mut self);
    fn hide(&mut self);
}

/// Forwards show/hide to the overlay task
pub struct OverlayIndicator(UnboundedSender<OverlayCommand>);

impl OverlayIndicator {
    #[must_use]
    pub const fn new(commands: UnboundedSender<OverlayCommand>) -> Self {
        Self(commands)
    }
}

impl Indicator for OverlayIndicator {
    fn show(&mut self) {
        let _ = self.0.send(OverlayCommand::Show);
    }

    fn hide(&mut self) {
        let _ = self.0.send(OverlayCommand::Hide);
    }
}

/// Hands drained audio to the transcription worker; called with the session
/// generation, the samples, and the context hint
pub type SubmitFn = Box<dyn FnMut(u64, Vec<f32>, Option<String>) + Send>;

/// Spawns transcription work and routes the outcome back into the lifecycle
/// channel as [`Event::TranscriptionFinished`].
#[must_use]
pub fn transcription_submitter(
    service: std::sync::Arc<TranscriptionService>,
    timeout: Duration,
    events: UnboundedSender<Event>,
) -> SubmitFn {
    Box::new(move |generation, samples, hint| {
        let service = std::sync::Arc::clone(&service);
        let events = events.clone();
        tokio::spawn(async move {
            let work = tokio::task::spawn_blocking(move || {
                let engine = service.get_or_load()?;
                engine.transcribe(&samples, hint.as_deref())
            });
            // Inference cannot be cancelled; on timeout the worker is left
            // to finish and its result is discarded by the generation check
            let outcome = match tokio::time::timeout(timeout, work).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_err)) => Err(TranscriptionError::Failed(anyhow::anyhow!(
                    "transcription task panicked: {join_err}"
                ))),
                Err(_) => Err(TranscriptionError::Timeout),
            };
            let _ = events.send(Event::TranscriptionFinished {
                generation,
                outcome,
            });
        });
    })
}

/// The state machine itself
pub struct Lifecycle {
    state: LifecycleState,
    paused: bool,
    /// Bumped on every session start and on pause-abort; a finished
    /// transcription must match it to be accepted
    generation: u64,
    session: Option<RecordingSession>,
    recorder: Box<dyn Recorder>,
    indicator: Box<dyn Indicator>,
    sink: Box<dyn OutputSink>,
    context: Box<dyn ContextCapture>,
    submit: SubmitFn,
    min_duration: Duration,
    max_session: Duration,
    status: watch::Sender<Status>,
}

impl Lifecycle {
    pub fn new(
        config: &Config,
        recorder: Box<dyn Recorder>,
        indicator: Box<dyn Indicator>,
        sink: Box<dyn OutputSink>,
        context: Box<dyn ContextCapture>,
        submit: SubmitFn,
    ) -> (Self, watch::Receiver<Status>) {
        let (status, status_rx) = watch::channel(Status::IDLE);
        (
            Self {
                state: LifecycleState::Idle,
                paused: false,
                generation: 0,
                session: None,
                recorder,
                indicator,
                sink,
                context,
                submit,
                min_duration: config.recording.min_duration(),
                max_session: config.audio.max_session(),
                status,
            },
            status_rx,
        )
    }

    fn publish(&self) {
        self.status.send_replace(Status {
            state: self.state,
            paused: self.paused,
        });
    }

    /// Deadline at which the current hold must be force-stopped
    fn recording_deadline(&self) -> Option<Instant> {
        match (&self.session, self.state) {
            (Some(session), LifecycleState::Recording) => {
                Some(session.started_at + self.max_session)
            }
            _ => None,
        }
    }

    /// Apply one event; returns false when the loop should stop
    pub fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::HotkeyPressed => self.on_press(),
            Event::HotkeyReleased => self.on_release(false),
            Event::MaxDurationReached => self.on_release(true),
            Event::Pause => self.on_pause(),
            Event::Resume => self.on_resume(),
            Event::TranscriptionFinished {
                generation,
                outcome,
            } => self.on_finished(generation, outcome),
            Event::Shutdown => {
                info!("shutting down");
                if self.state == LifecycleState::Recording {
                    let _ = self.recorder.release();
                    self.indicator.hide();
                }
                return false;
            }
        }
        true
    }

    fn on_press(&mut self) {
        if self.paused {
            debug!("hotkey pressed while paused (ignored)");
            return;
        }
        match self.state {
            LifecycleState::Idle => self.start_recording(),
            LifecycleState::Recording => {
                debug!("hotkey pressed while recording (duplicate, ignored)");
            }
            LifecycleState::Transcribing => {
                debug!("hotkey pressed while transcribing (ignored)");
            }
            LifecycleState::Error => {
                debug!("hotkey pressed in error state (ignored)");
            }
        }
    }

    fn start_recording(&mut self) {
        let hint = self.context.capture().map(|snapshot| snapshot.hint());

        if let Err(e) = self.recorder.acquire() {
            // The indicator is never shown for a session that failed to open
            error!("failed to start recording: {}", e);
            self.enter_error(&capture_failure_message(&e));
            return;
        }

        self.generation += 1;
        self.session = Some(RecordingSession {
            started_at: Instant::now(),
            generation: self.generation,
            hint,
        });
        self.state = LifecycleState::Recording;
        self.indicator.show();
        self.publish();
        info!(generation = self.generation, "recording started");
    }

    fn on_release(&mut self, forced: bool) {
        if self.state != LifecycleState::Recording {
            debug!("hotkey released outside recording (ignored)");
            return;
        }
        let Some(session) = self.session.take() else {
            warn!("recording state without session, resetting");
            self.state = LifecycleState::Idle;
            self.publish();
            return;
        };

        if forced {
            warn!("max session duration reached, force-stopping recording");
        }

        let samples = self.recorder.release();
        self.indicator.hide();

        // Duration comes from the drained buffer, not wall clock, so device
        // startup latency never counts against the minimum
        let duration = audio_duration(samples.len());
        if duration < self.min_duration {
            info!(
                duration_ms = duration.as_millis(),
                "recording too short, discarding"
            );
            self.state = LifecycleState::Idle;
            self.publish();
            return;
        }

        info!(
            duration_ms = duration.as_millis(),
            generation = session.generation,
            "recording stopped, transcribing"
        );
        self.state = LifecycleState::Transcribing;
        self.publish();
        (self.submit)(session.generation, samples, session.hint);
    }

    fn on_pause(&mut self) {
        if self.paused {
            return;
        }
        self.paused = true;
        match self.state {
            LifecycleState::Recording => {
                info!("paused mid-recording, discarding session");
                let _ = self.recorder.release();
                self.indicator.hide();
                self.session = None;
                self.state = LifecycleState::Idle;
            }
            LifecycleState::Transcribing => {
                info!("paused mid-transcription, result will be discarded");
                // Invalidate the in-flight result
                self.generation += 1;
                self.session = None;
                self.state = LifecycleState::Idle;
            }
            LifecycleState::Idle | LifecycleState::Error => {}
        }
        self.publish();
        info!("dictation paused");
    }

    fn on_resume(&mut self) {
        if !self.paused {
            return;
        }
        self.paused = false;
        self.publish();
        info!("dictation resumed");
    }

    fn on_finished(&mut self, generation: u64, outcome: Result<Transcript, TranscriptionError>) {
        if generation != self.generation || self.state != LifecycleState::Transcribing {
            debug!(
                generation,
                current = self.generation,
                "stale transcription result dropped"
            );
            return;
        }

        match outcome {
            Ok(transcript) if transcript.is_empty() => {
                info!("transcription produced no text");
                self.enter_error("No speech detected");
            }
            Ok(transcript) => {
                if let Err(e) = self.sink.deliver(&transcript) {
                    error!("failed to deliver transcript: {}", e);
                    self.enter_error("Could not copy transcript");
                    return;
                }
                info!(
                    text_len = transcript.text.len(),
                    inference_ms = transcript.inference_duration.as_millis(),
                    "transcript delivered"
                );
                self.state = LifecycleState::Idle;
                self.publish();
            }
            Err(TranscriptionError::Timeout) => {
                error!("transcription timed out");
                self.enter_error("Transcription timed out");
            }
            Err(e) => {
                error!("transcription failed: {}", e);
                self.enter_error("Transcription failed");
            }
        }
    }

    /// Announce the failure, surface the error state, then recover to idle.
    /// Error is transient: no user action is needed to dictate again.
    fn enter_error(&mut self, message: &str) {
        self.session = None;
        self.state = LifecycleState::Error;
        self.publish();
        self.sink.announce_failure(message);
        self.state = LifecycleState::Idle;
        self.publish();
    }

    /// Event loop; runs until [`Event::Shutdown`] or the channel closes
    pub async fn run(mut self, mut events: UnboundedReceiver<Event>) {
        loop {
            let event = if let Some(deadline) = self.recording_deadline() {
                tokio::select! {
                    event = events.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                    () = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {
                        Event::MaxDurationReached
                    }
                }
            } else {
                match events.recv().await {
                    Some(event) => event,
                    None => break,
                }
            };

            if !self.handle_event(event) {
                break;
            }
        }
    }
}

fn capture_failure_message(error: &CaptureError) -> String {
    match error {
        CaptureError::DeviceUnavailable(_) => "Microphone unavailable".to_owned(),
        CaptureError::PermissionDenied => "Microphone permission denied".to_owned(),
        CaptureError::Stream(_) => "Audio stream error".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NullContext;
    use crate::output::MockOutputSink;
    use std::sync::mpsc as std_mpsc;

    const SAMPLE_RATE: usize = 16_000;

    fn test_config() -> Config {
        toml::from_str(
            r#"
[hotkey]
mode = "toggle"
toggle_key = "CapsLock"
modifiers = ["Control", "Option"]
key = "D"
debounce_ms = 150

[audio]
max_session_secs = 30

[recording]
min_duration_ms = 500

[model]
name = "small"
path = "/tmp/ggml-small.bin"
preload = false
threads = 4
beam_size = 5
timeout_secs = 30

[overlay]
enabled = true
refresh_ms = 80

[context]
enabled = false

[telemetry]
enabled = false
log_path = "/tmp/voicemode.log"
"#,
        )
        .unwrap()
    }

    struct Harness {
        lifecycle: Lifecycle,
        status: watch::Receiver<Status>,
        submissions: std_mpsc::Receiver<(u64, usize, Option<String>)>,
    }

    /// Build a lifecycle around mocks; `samples` is what release() drains
    fn harness(
        recorder: MockRecorder,
        indicator: MockIndicator,
        sink: MockOutputSink,
    ) -> Harness {
        let (tx, rx) = std_mpsc::channel();
        let submit: SubmitFn = Box::new(move |generation, samples, hint| {
            let _ = tx.send((generation, samples.len(), hint));
        });
        let (lifecycle, status) = Lifecycle::new(
            &test_config(),
            Box::new(recorder),
            Box::new(indicator),
            Box::new(sink),
            Box::new(NullContext),
            submit,
        );
        Harness {
            lifecycle,
            status,
            submissions: rx,
        }
    }

    fn recorder_with_samples(samples: usize) -> MockRecorder {
        let mut recorder = MockRecorder::new();
        recorder.expect_acquire().returning(|| Ok(()));
        recorder
            .expect_release()
            .returning(move || vec![0.0_f32; samples]);
        recorder
    }

    fn visible_indicator() -> MockIndicator {
        let mut indicator = MockIndicator::new();
        indicator.expect_show().return_const(());
        indicator.expect_hide().return_const(());
        indicator
    }

    fn transcript(text: &str) -> Transcript {
        Transcript {
            text: text.to_owned(),
            language: "auto".to_owned(),
            audio_duration: Duration::from_secs(1),
            inference_duration: Duration::from_millis(100),
        }
    }

    #[test]
    fn test_press_release_submits_full_buffer() {
        let mut sink = MockOutputSink::new();
        sink.expect_deliver().never();
        let mut h = harness(
            recorder_with_samples(3 * SAMPLE_RATE),
            visible_indicator(),
            sink,
        );

        h.lifecycle.handle_event(Event::HotkeyPressed);
        assert_eq!(h.status.borrow().state, LifecycleState::Recording);

        h.lifecycle.handle_event(Event::HotkeyReleased);
        assert_eq!(h.status.borrow().state, LifecycleState::Transcribing);

        let (generation, samples, hint) = h.submissions.try_recv().unwrap();
        assert_eq!(generation, 1);
        assert_eq!(samples, 3 * SAMPLE_RATE);
        assert_eq!(hint, None);
    }

    #[test]
    fn test_short_recording_discarded_without_submit() {
        // 400ms of audio against a 500ms minimum
        let mut h = harness(
            recorder_with_samples(SAMPLE_RATE * 2 / 5),
            visible_indicator(),
            MockOutputSink::new(),
        );

        h.lifecycle.handle_event(Event::HotkeyPressed);
        h.lifecycle.handle_event(Event::HotkeyReleased);

        assert_eq!(h.status.borrow().state, LifecycleState::Idle);
        assert!(h.submissions.try_recv().is_err());
    }

    #[test]
    fn test_duplicate_press_is_ignored() {
        let mut recorder = MockRecorder::new();
        recorder.expect_acquire().times(1).returning(|| Ok(()));
        recorder
            .expect_release()
            .times(1)
            .returning(|| vec![0.0; SAMPLE_RATE]);
        let mut h = harness(recorder, visible_indicator(), MockOutputSink::new());

        h.lifecycle.handle_event(Event::HotkeyPressed);
        h.lifecycle.handle_event(Event::HotkeyPressed);
        h.lifecycle.handle_event(Event::HotkeyPressed);
        assert_eq!(h.status.borrow().state, LifecycleState::Recording);

        h.lifecycle.handle_event(Event::HotkeyReleased);
        assert_eq!(h.submissions.try_recv().unwrap().0, 1);
    }

    #[test]
    fn test_release_while_idle_is_ignored() {
        let mut recorder = MockRecorder::new();
        recorder.expect_release().never();
        let mut h = harness(recorder, MockIndicator::new(), MockOutputSink::new());

        h.lifecycle.handle_event(Event::HotkeyReleased);
        assert_eq!(h.status.borrow().state, LifecycleState::Idle);
    }

    #[test]
    fn test_acquire_failure_never_shows_indicator() {
        let mut recorder = MockRecorder::new();
        recorder
            .expect_acquire()
            .returning(|| Err(CaptureError::DeviceUnavailable("gone".to_owned())));
        let mut indicator = MockIndicator::new();
        indicator.expect_show().never();
        let mut sink = MockOutputSink::new();
        sink.expect_announce_failure()
            .withf(|msg| msg == "Microphone unavailable")
            .times(1)
            .return_const(());

        let mut h = harness(recorder, indicator, sink);
        h.lifecycle.handle_event(Event::HotkeyPressed);

        // Error state is transient, we land back in Idle
        assert_eq!(h.status.borrow().state, LifecycleState::Idle);
    }

    #[test]
    fn test_successful_transcription_delivered() {
        let mut sink = MockOutputSink::new();
        sink.expect_deliver()
            .withf(|t| t.text == "hello world")
            .times(1)
            .returning(|_| Ok(()));
        let mut h = harness(
            recorder_with_samples(2 * SAMPLE_RATE),
            visible_indicator(),
            sink,
        );

        h.lifecycle.handle_event(Event::HotkeyPressed);
        h.lifecycle.handle_event(Event::HotkeyReleased);
        let (generation, _, _) = h.submissions.try_recv().unwrap();

        h.lifecycle.handle_event(Event::TranscriptionFinished {
            generation,
            outcome: Ok(transcript("hello world")),
        });
        assert_eq!(h.status.borrow().state, LifecycleState::Idle);
    }

    #[test]
    fn test_empty_transcript_announced_not_delivered() {
        let mut sink = MockOutputSink::new();
        sink.expect_deliver().never();
        sink.expect_announce_failure()
            .withf(|msg| msg == "No speech detected")
            .times(1)
            .return_const(());
        let mut h = harness(
            recorder_with_samples(2 * SAMPLE_RATE),
            visible_indicator(),
            sink,
        );

        h.lifecycle.handle_event(Event::HotkeyPressed);
        h.lifecycle.handle_event(Event::HotkeyReleased);
        let (generation, _, _) = h.submissions.try_recv().unwrap();

        h.lifecycle.handle_event(Event::TranscriptionFinished {
            generation,
            outcome: Ok(transcript("")),
        });
        assert_eq!(h.status.borrow().state, LifecycleState::Idle);
    }

    #[test]
    fn test_timeout_announced_without_delivery() {
        let mut sink = MockOutputSink::new();
        sink.expect_deliver().never();
        sink.expect_announce_failure()
            .withf(|msg| msg == "Transcription timed out")
            .times(1)
            .return_const(());
        let mut h = harness(
            recorder_with_samples(2 * SAMPLE_RATE),
            visible_indicator(),
            sink,
        );

        h.lifecycle.handle_event(Event::HotkeyPressed);
        h.lifecycle.handle_event(Event::HotkeyReleased);
        let (generation, _, _) = h.submissions.try_recv().unwrap();

        h.lifecycle.handle_event(Event::TranscriptionFinished {
            generation,
            outcome: Err(TranscriptionError::Timeout),
        });
        assert_eq!(h.status.borrow().state, LifecycleState::Idle);
    }

    #[test]
    fn test_pause_aborts_recording() {
        let mut h = harness(
            recorder_with_samples(2 * SAMPLE_RATE),
            visible_indicator(),
            MockOutputSink::new(),
        );

        h.lifecycle.handle_event(Event::HotkeyPressed);
        h.lifecycle.handle_event(Event::Pause);

        let status = *h.status.borrow();
        assert_eq!(status.state, LifecycleState::Idle);
        assert!(status.paused);
        // The aborted session never reached transcription
        assert!(h.submissions.try_recv().is_err());
    }

    #[test]
    fn test_paused_press_ignored_until_resume() {
        let mut h = harness(
            recorder_with_samples(2 * SAMPLE_RATE),
            visible_indicator(),
            MockOutputSink::new(),
        );

        h.lifecycle.handle_event(Event::Pause);
        h.lifecycle.handle_event(Event::HotkeyPressed);
        assert_eq!(h.status.borrow().state, LifecycleState::Idle);

        h.lifecycle.handle_event(Event::Resume);
        h.lifecycle.handle_event(Event::HotkeyPressed);
        assert_eq!(h.status.borrow().state, LifecycleState::Recording);
    }

    #[test]
    fn test_pause_during_transcription_discards_result() {
        let mut sink = MockOutputSink::new();
        sink.expect_deliver().never();
        let mut h = harness(
            recorder_with_samples(2 * SAMPLE_RATE),
            visible_indicator(),
            sink,
        );

        h.lifecycle.handle_event(Event::HotkeyPressed);
        h.lifecycle.handle_event(Event::HotkeyReleased);
        let (generation, _, _) = h.submissions.try_recv().unwrap();

        h.lifecycle.handle_event(Event::Pause);

        // The in-flight result arrives after the pause and must be dropped
        h.lifecycle.handle_event(Event::TranscriptionFinished {
            generation,
            outcome: Ok(transcript("late result")),
        });
        assert_eq!(h.status.borrow().state, LifecycleState::Idle);
    }

    #[test]
    fn test_stale_generation_dropped() {
        let mut sink = MockOutputSink::new();
        sink.expect_deliver()
            .withf(|t| t.text == "second")
            .times(1)
            .returning(|_| Ok(()));
        let mut h = harness(
            recorder_with_samples(2 * SAMPLE_RATE),
            visible_indicator(),
            sink,
        );

        // First session submitted then superseded by a second
        h.lifecycle.handle_event(Event::HotkeyPressed);
        h.lifecycle.handle_event(Event::HotkeyReleased);
        let (first_gen, _, _) = h.submissions.try_recv().unwrap();
        h.lifecycle.handle_event(Event::Pause);
        h.lifecycle.handle_event(Event::Resume);
        h.lifecycle.handle_event(Event::HotkeyPressed);
        h.lifecycle.handle_event(Event::HotkeyReleased);
        let (second_gen, _, _) = h.submissions.try_recv().unwrap();
        assert_ne!(first_gen, second_gen);

        h.lifecycle.handle_event(Event::TranscriptionFinished {
            generation: first_gen,
            outcome: Ok(transcript("first")),
        });
        h.lifecycle.handle_event(Event::TranscriptionFinished {
            generation: second_gen,
            outcome: Ok(transcript("second")),
        });
        assert_eq!(h.status.borrow().state, LifecycleState::Idle);
    }

    #[test]
    fn test_max_duration_forces_stop() {
        let mut h = harness(
            recorder_with_samples(30 * SAMPLE_RATE),
            visible_indicator(),
            MockOutputSink::new(),
        );

        h.lifecycle.handle_event(Event::HotkeyPressed);
        assert!(h.lifecycle.recording_deadline().is_some());

        h.lifecycle.handle_event(Event::MaxDurationReached);
        assert_eq!(h.status.borrow().state, LifecycleState::Transcribing);
        assert!(h.lifecycle.recording_deadline().is_none());
        assert!(h.submissions.try_recv().is_ok());

        // A late release after the forced stop is a no-op
        h.lifecycle.handle_event(Event::HotkeyReleased);
        assert!(h.submissions.try_recv().is_err());
    }

    #[test]
    fn test_no_deadline_outside_recording() {
        let h = harness(
            recorder_with_samples(SAMPLE_RATE),
            MockIndicator::new(),
            MockOutputSink::new(),
        );
        assert!(h.lifecycle.recording_deadline().is_none());
    }

    #[test]
    fn test_shutdown_releases_open_recording() {
        let mut recorder = MockRecorder::new();
        recorder.expect_acquire().returning(|| Ok(()));
        recorder
            .expect_release()
            .times(1)
            .returning(|| vec![0.0; SAMPLE_RATE]);
        let mut h = harness(recorder, visible_indicator(), MockOutputSink::new());

        h.lifecycle.handle_event(Event::HotkeyPressed);
        assert!(!h.lifecycle.handle_event(Event::Shutdown));
    }

    #[test]
    fn test_delivery_failure_enters_transient_error() {
        let mut sink = MockOutputSink::new();
        sink.expect_deliver()
            .returning(|_| Err(crate::output::OutputError::Clipboard("denied".to_owned())));
        sink.expect_announce_failure()
            .withf(|msg| msg == "Could not copy transcript")
            .times(1)
            .return_const(());
        let mut h = harness(
            recorder_with_samples(2 * SAMPLE_RATE),
            visible_indicator(),
            sink,
        );

        h.lifecycle.handle_event(Event::HotkeyPressed);
        h.lifecycle.handle_event(Event::HotkeyReleased);
        let (generation, _, _) = h.submissions.try_recv().unwrap();
        h.lifecycle.handle_event(Event::TranscriptionFinished {
            generation,
            outcome: Ok(transcript("hello")),
        });
        assert_eq!(h.status.borrow().state, LifecycleState::Idle);
    }
}
