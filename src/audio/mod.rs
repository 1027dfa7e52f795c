/// Microphone capture and sample conversion
pub mod capture;

pub use capture::{AmplitudeHandle, AudioCapture, CaptureError, TARGET_SAMPLE_RATE};
