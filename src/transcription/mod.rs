//! Speech-to-text: model download, the Whisper engine, and the lazily
//! loaded service handed to the lifecycle.

pub mod download;
pub mod engine;

pub use engine::{
    audio_duration, Transcriber, Transcript, TranscriptionEngine, TranscriptionError,
    TranscriptionService,
};
