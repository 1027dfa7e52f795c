use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::TARGET_SAMPLE_RATE;
use crate::config::{Config, ModelConfig};

/// Transcription seam for the lifecycle and its tests.
///
/// Production code hands [`TranscriptionEngine`] across this trait; tests
/// substitute `MockTranscriber` (via `mockall`).
#[cfg_attr(test, mockall::automock)]
pub trait Transcriber: Send + Sync {
    /// Transcribe 16kHz mono samples, optionally primed with a context hint
    ///
    /// # Errors
    /// Returns error if Whisper inference fails
    fn transcribe<'a>(
        &self,
        audio: &[f32],
        hint: Option<&'a str>,
    ) -> Result<Transcript, TranscriptionError>;
}

/// Errors that can occur during transcription
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// Failed to load Whisper model
    #[error("failed to load whisper model from {path}: {source}")]
    ModelLoad {
        /// Path to model file
        path: String,
        /// Underlying error
        source: anyhow::Error,
    },

    /// Failed to create Whisper inference state
    #[error("failed to create whisper state")]
    StateCreation,

    /// Transcription inference failed
    #[error("failed to transcribe audio")]
    Failed(#[from] anyhow::Error),

    /// Inference did not finish inside the configured budget
    #[error("transcription timed out")]
    Timeout,
}

/// One completed transcription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    /// Configured language tag, or "auto" when detection was left to the model
    pub language: String,
    pub audio_duration: Duration,
    pub inference_duration: Duration,
}

impl Transcript {
    /// Whether the model produced no usable text (silence, breath, noise)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Duration represented by a 16kHz mono buffer
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn audio_duration(samples: usize) -> Duration {
    Duration::from_secs_f64(samples as f64 / f64::from(TARGET_SAMPLE_RATE))
}

/// Whisper transcription engine
pub struct TranscriptionEngine {
    /// Whisper context (thread-safe)
    ctx: Arc<Mutex<WhisperContext>>,
    /// Number of CPU threads for inference
    threads: i32,
    /// Beam search width
    beam_size: i32,
    /// Language code (None = auto-detect)
    language: Option<String>,
}

impl TranscriptionEngine {
    /// Determines sampling strategy based on beam size (pure, testable)
    const fn get_sampling_strategy(beam_size: i32) -> SamplingStrategy {
        if beam_size > 1 {
            SamplingStrategy::BeamSearch {
                beam_size,
                patience: -1.0,
            }
        } else {
            SamplingStrategy::Greedy { best_of: 1 }
        }
    }

    /// Creates a new `TranscriptionEngine` by loading the model from the given path
    ///
    /// # Errors
    /// Returns error if model file doesn't exist, is invalid, or if `threads`/`beam_size` exceed `i32::MAX`
    pub fn new(
        model_path: &Path,
        threads: usize,
        beam_size: usize,
        language: Option<String>,
    ) -> Result<Self, TranscriptionError> {
        if threads == 0 {
            return Err(TranscriptionError::ModelLoad {
                path: model_path.display().to_string(),
                source: anyhow::anyhow!("threads must be > 0"),
            });
        }
        if beam_size == 0 {
            return Err(TranscriptionError::ModelLoad {
                path: model_path.display().to_string(),
                source: anyhow::anyhow!("beam_size must be > 0"),
            });
        }

        let threads_i32 = i32::try_from(threads).map_err(|_| TranscriptionError::ModelLoad {
            path: model_path.display().to_string(),
            source: anyhow::anyhow!("threads value too large (max: {})", i32::MAX),
        })?;
        let beam_size_i32 =
            i32::try_from(beam_size).map_err(|_| TranscriptionError::ModelLoad {
                path: model_path.display().to_string(),
                source: anyhow::anyhow!("beam_size value too large (max: {})", i32::MAX),
            })?;

        tracing::info!(
            path = %model_path.display(),
            threads = threads,
            beam_size = beam_size,
            language = ?language,
            "loading whisper model"
        );

        let path_str = model_path
            .to_str()
            .ok_or_else(|| TranscriptionError::ModelLoad {
                path: model_path.display().to_string(),
                source: anyhow::anyhow!("model path contains invalid UTF-8"),
            })?;

        let params = WhisperContextParameters::default();
        let ctx = WhisperContext::new_with_params(path_str, params).map_err(|e| {
            TranscriptionError::ModelLoad {
                path: model_path.display().to_string(),
                source: anyhow::anyhow!("{e:?}"),
            }
        })?;

        tracing::info!("whisper model loaded");

        Ok(Self {
            ctx: Arc::new(Mutex::new(ctx)),
            threads: threads_i32,
            beam_size: beam_size_i32,
            language,
        })
    }

    fn transcribe_impl(
        &self,
        audio: &[f32],
        hint: Option<&str>,
    ) -> Result<Transcript, TranscriptionError> {
        let _span = tracing::debug_span!("transcription", samples = audio.len()).entered();
        tracing::debug!("starting transcription");

        // One state per transcription, the context itself is reused
        let mut state = self
            .ctx
            .lock()
            .map_err(|e| anyhow::anyhow!("mutex poisoned: {e}"))?
            .create_state()
            .map_err(|_| TranscriptionError::StateCreation)?;

        let strategy = Self::get_sampling_strategy(self.beam_size);
        let mut params = FullParams::new(strategy);
        params.set_n_threads(self.threads);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_language(self.language.as_deref());
        params.set_translate(false);
        if let Some(hint) = hint {
            params.set_initial_prompt(hint);
        }

        let start = std::time::Instant::now();
        state
            .full(params, audio)
            .context("whisper inference failed")?;
        let inference_duration = start.elapsed();

        let mut text = String::new();
        for segment in state.as_iter() {
            text.push_str(&segment.to_string());
        }
        let text = text.trim().to_owned();

        tracing::info!(
            segments = state.full_n_segments(),
            text_len = text.len(),
            inference_ms = inference_duration.as_millis(),
            "transcription completed"
        );

        Ok(Transcript {
            text,
            language: self
                .language
                .clone()
                .unwrap_or_else(|| "auto".to_owned()),
            audio_duration: audio_duration(audio.len()),
            inference_duration,
        })
    }
}

impl Transcriber for TranscriptionEngine {
    fn transcribe<'a>(
        &self,
        audio: &[f32],
        hint: Option<&'a str>,
    ) -> Result<Transcript, TranscriptionError> {
        self.transcribe_impl(audio, hint)
    }
}

// SAFETY: the WhisperContext is only reached through the Arc<Mutex<>>, which
// serializes all access; whisper-rs contexts are safe to use from any thread
// under external synchronization.
#[allow(unsafe_code)]
unsafe impl Send for TranscriptionEngine {}
#[allow(unsafe_code)]
unsafe impl Sync for TranscriptionEngine {}

/// Lazily loads the configured model and hands out the shared engine.
///
/// With `preload = true` the model is loaded at startup; otherwise the first
/// transcription pays the load cost.
pub struct TranscriptionService {
    model_path: PathBuf,
    threads: usize,
    beam_size: usize,
    language: Option<String>,
    engine: Mutex<Option<Arc<TranscriptionEngine>>>,
}

impl TranscriptionService {
    /// # Errors
    /// Returns error if the configured model path cannot be expanded
    pub fn new(config: &ModelConfig) -> Result<Self> {
        Ok(Self {
            model_path: Config::expand_path(&config.path)?,
            threads: config.threads,
            beam_size: config.beam_size,
            language: config.language.clone(),
            engine: Mutex::new(None),
        })
    }

    /// Load the model now instead of on first use
    ///
    /// # Errors
    /// Returns error if the model fails to load
    pub fn preload(&self) -> Result<(), TranscriptionError> {
        self.get_or_load().map(|_| ())
    }

    /// Returns the engine, loading the model on first call
    ///
    /// # Errors
    /// Returns error if the model fails to load
    pub fn get_or_load(&self) -> Result<Arc<TranscriptionEngine>, TranscriptionError> {
        let mut guard = self
            .engine
            .lock()
            .map_err(|e| anyhow::anyhow!("mutex poisoned: {e}"))?;

        if let Some(engine) = guard.as_ref() {
            return Ok(Arc::clone(engine));
        }

        tracing::info!("lazy loading model");
        let engine = Arc::new(TranscriptionEngine::new(
            &self.model_path,
            self.threads,
            self.beam_size,
            self.language.clone(),
        )?);
        *guard = Some(Arc::clone(&engine));
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_model_config(path: &str) -> ModelConfig {
        ModelConfig {
            name: "small".to_owned(),
            path: path.to_owned(),
            preload: false,
            threads: 4,
            beam_size: 5,
            language: None,
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_model_load_nonexistent_path() {
        let nonexistent_path = Path::new("/tmp/nonexistent_model.bin");
        let result = TranscriptionEngine::new(nonexistent_path, 4, 5, None);

        assert!(matches!(result, Err(TranscriptionError::ModelLoad { .. })));
        if let Err(TranscriptionError::ModelLoad { path, .. }) = result {
            assert!(path.contains("nonexistent_model.bin"));
        }
    }

    #[test]
    fn test_new_with_zero_threads() {
        let path = Path::new("/tmp/dummy.bin");
        let result = TranscriptionEngine::new(path, 0, 5, None);
        assert!(matches!(result, Err(TranscriptionError::ModelLoad { .. })));
        if let Err(TranscriptionError::ModelLoad { source, .. }) = result {
            assert!(source.to_string().contains("threads must be > 0"));
        }
    }

    #[test]
    fn test_new_with_zero_beam_size() {
        let path = Path::new("/tmp/dummy.bin");
        let result = TranscriptionEngine::new(path, 4, 0, None);
        assert!(matches!(result, Err(TranscriptionError::ModelLoad { .. })));
        if let Err(TranscriptionError::ModelLoad { source, .. }) = result {
            assert!(source.to_string().contains("beam_size must be > 0"));
        }
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_thread_count_overflow() {
        let path = Path::new("/tmp/dummy.bin");
        let result = TranscriptionEngine::new(path, (i32::MAX as usize) + 1, 5, None);
        assert!(matches!(result, Err(TranscriptionError::ModelLoad { .. })));
        if let Err(TranscriptionError::ModelLoad { source, .. }) = result {
            assert!(source.to_string().contains("threads value too large"));
        }
    }

    #[test]
    fn test_get_sampling_strategy_greedy() {
        let strategy = TranscriptionEngine::get_sampling_strategy(1);
        assert!(matches!(strategy, SamplingStrategy::Greedy { best_of: 1 }));
    }

    #[test]
    fn test_get_sampling_strategy_beam_search() {
        let strategy = TranscriptionEngine::get_sampling_strategy(5);
        assert!(matches!(
            strategy,
            SamplingStrategy::BeamSearch {
                beam_size: 5,
                patience: -1.0
            }
        ));
    }

    #[test]
    fn test_get_sampling_strategy_boundary() {
        assert!(matches!(
            TranscriptionEngine::get_sampling_strategy(1),
            SamplingStrategy::Greedy { .. }
        ));
        assert!(matches!(
            TranscriptionEngine::get_sampling_strategy(2),
            SamplingStrategy::BeamSearch { .. }
        ));
    }

    #[test]
    fn test_audio_duration() {
        assert_eq!(audio_duration(16_000), Duration::from_secs(1));
        assert_eq!(audio_duration(8_000), Duration::from_millis(500));
        assert_eq!(audio_duration(0), Duration::ZERO);
    }

    #[test]
    fn test_transcript_is_empty() {
        let transcript = Transcript {
            text: String::new(),
            language: "auto".to_owned(),
            audio_duration: Duration::from_secs(1),
            inference_duration: Duration::from_millis(120),
        };
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<TranscriptionEngine>();
        assert_sync::<TranscriptionEngine>();
    }

    #[test]
    fn test_service_load_failure_is_retryable() {
        let service = TranscriptionService::new(&test_model_config("/tmp/no_such_model.bin"))
            .unwrap();

        assert!(service.get_or_load().is_err());
        // A failed load leaves no cached engine behind
        assert!(service.get_or_load().is_err());
    }

    #[test]
    fn test_service_preload_propagates_load_error() {
        let service = TranscriptionService::new(&test_model_config("/tmp/no_such_model.bin"))
            .unwrap();
        assert!(matches!(
            service.preload(),
            Err(TranscriptionError::ModelLoad { .. })
        ));
    }

    #[test]
    fn test_service_expands_model_path() {
        let home = std::env::var("HOME").unwrap();
        let service =
            TranscriptionService::new(&test_model_config("~/.voicemode/models/ggml-small.bin"))
                .unwrap();
        assert!(service.model_path.starts_with(home));
    }

    #[test]
    #[ignore = "requires actual model file"]
    fn test_transcribe_silence() {
        let home = std::env::var("HOME").unwrap();
        let model_path = PathBuf::from(home)
            .join(".voicemode")
            .join("models")
            .join("ggml-tiny.bin");
        if !model_path.exists() {
            return;
        }

        let engine = TranscriptionEngine::new(&model_path, 4, 5, None).unwrap();

        // 1 second of silence (16kHz)
        let silence: Vec<f32> = vec![0.0; 16_000];
        let transcript = engine.transcribe(&silence, None).unwrap();

        assert!(transcript.text.is_empty() || transcript.text.len() < 50);
        assert_eq!(transcript.audio_duration, Duration::from_secs(1));
    }
}
