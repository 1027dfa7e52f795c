use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapCons, HeapRb,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AudioConfig;

/// Sample rate the transcription engine expects (16kHz mono f32)
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Capture failures surfaced to the lifecycle
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No input device, or the device cannot be opened (busy/unplugged)
    #[error("input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// OS denied microphone access
    #[error("microphone permission denied")]
    PermissionDenied,

    /// Stream-level failure after the device was opened
    #[error("audio stream error: {0}")]
    Stream(String),
}

/// Shared read-only view of the latest capture amplitude (RMS, 0.0..=1.0).
///
/// Written by the audio callback, read by the overlay tick. Lock-free so
/// neither side can stall the other.
#[derive(Debug, Clone, Default)]
pub struct AmplitudeHandle(Arc<AtomicU32>);

impl AmplitudeHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self, level: f32) {
        self.0.store(level.to_bits(), Ordering::Relaxed);
    }

    /// Latest RMS level published by the capture callback
    #[must_use]
    pub fn level(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Trait for controlling audio stream lifecycle
trait StreamControl: Send {
    /// Resume audio stream (activate microphone)
    fn play(&self) -> Result<(), CaptureError>;
    /// Pause audio stream (deactivate microphone)
    fn pause(&self) -> Result<(), CaptureError>;
}

/// CPAL stream wrapper implementing `StreamControl`
struct CpalStreamControl {
    stream: cpal::Stream,
}

// SAFETY: cpal marks Stream !Send because some platform handles are
// thread-affine. The stream is owned and driven by a single task at a time
// (acquire, play/pause, drop all go through `AudioCapture`), which the
// multi-threaded runtime may migrate across worker threads between calls.
// CoreAudio, the host this app targets, documents its stream handles as
// usable from any thread. On other cpal hosts (ALSA, WASAPI) that guarantee
// has not been verified; anyone porting off macOS should re-audit this impl.
#[allow(unsafe_code)]
unsafe impl Send for CpalStreamControl {}

impl StreamControl for CpalStreamControl {
    fn play(&self) -> Result<(), CaptureError> {
        self.stream
            .play()
            .map_err(|e| CaptureError::Stream(e.to_string()))
    }

    fn pause(&self) -> Result<(), CaptureError> {
        self.stream
            .pause()
            .map_err(|e| CaptureError::Stream(e.to_string()))
    }
}

/// One open microphone stream plus its sample sink
struct ActiveCapture {
    /// Stream controller (kept alive to prevent stream drop)
    stream_control: Box<dyn StreamControl>,
    /// Ring buffer consumer for reading captured samples
    consumer: HeapCons<f32>,
    /// Device sample rate in Hz
    device_sample_rate: u32,
    /// Number of audio channels
    device_channels: u16,
}

/// Microphone capture via CoreAudio/CPAL.
///
/// The device is opened per session: [`AudioCapture::acquire`] builds the
/// input stream and starts buffering, [`AudioCapture::release`] closes it and
/// returns everything captured, converted to 16kHz mono. `release` is
/// idempotent; calling it without an acquired stream returns an empty buffer.
pub struct AudioCapture {
    max_session: Duration,
    is_recording: Arc<AtomicBool>,
    amplitude: AmplitudeHandle,
    active: Option<ActiveCapture>,
}

impl AudioCapture {
    #[must_use]
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            max_session: config.max_session(),
            is_recording: Arc::new(AtomicBool::new(false)),
            amplitude: AmplitudeHandle::new(),
            active: None,
        }
    }

    /// Handle the overlay uses to read the live level
    #[must_use]
    pub fn amplitude(&self) -> AmplitudeHandle {
        self.amplitude.clone()
    }

    /// Open the default input device and start buffering samples.
    ///
    /// # Errors
    /// `DeviceUnavailable` if no input device exists or the device cannot be
    /// opened; `Stream` if the stream fails to start.
    pub fn acquire(&mut self) -> Result<(), CaptureError> {
        let _span = tracing::debug_span!("audio_acquire").entered();
        let start = std::time::Instant::now();

        if self.active.is_some() {
            // Lifecycle guards against this, but keep the device single-owner
            debug!("acquire called while stream already open (ignored)");
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| CaptureError::DeviceUnavailable("no input device".to_owned()))?;

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_owned());

        let supported_config = device
            .default_input_config()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        let device_sample_rate = supported_config.sample_rate();
        let device_channels = supported_config.channels();

        info!(
            device = %device_name,
            sample_rate = device_sample_rate,
            channels = device_channels,
            "opening input device"
        );

        // Ring buffer sized for the whole session cap so no samples drop
        let capacity = (device_sample_rate as usize)
            * (device_channels as usize)
            * (self.max_session.as_secs() as usize).max(1);
        let (mut producer, consumer) = HeapRb::<f32>::new(capacity).split();

        let is_recording = Arc::clone(&self.is_recording);
        let amplitude = self.amplitude.clone();

        let stream_config = supported_config.into();
        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if is_recording.load(Ordering::Relaxed) {
                        // Lock-free push to ring buffer
                        let pushed = producer.push_slice(data);
                        if pushed < data.len() {
                            warn!("ring buffer full, dropped {} samples", data.len() - pushed);
                        }
                        amplitude.store(rms(data));
                    }
                },
                move |err| {
                    warn!("audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| match e {
                cpal::BuildStreamError::DeviceNotAvailable => {
                    CaptureError::DeviceUnavailable("device not available".to_owned())
                }
                other => CaptureError::Stream(other.to_string()),
            })?;

        let stream_control = CpalStreamControl { stream };

        // Flag first so the very first callback already records
        self.is_recording.store(true, Ordering::Relaxed);
        stream_control.play()?;

        self.active = Some(ActiveCapture {
            stream_control: Box::new(stream_control),
            consumer,
            device_sample_rate,
            device_channels,
        });

        info!(latency_us = start.elapsed().as_micros(), "capture acquired");
        Ok(())
    }

    /// Close the device and return the accumulated buffer as 16kHz mono.
    ///
    /// No sample arriving after this call is included; the recording flag is
    /// cleared before the buffer is drained.
    pub fn release(&mut self) -> Vec<f32> {
        let _span = tracing::debug_span!("audio_release").entered();
        let start = std::time::Instant::now();

        self.is_recording.store(false, Ordering::Relaxed);
        self.amplitude.store(0.0);

        let Some(mut active) = self.active.take() else {
            debug!("release called with no open stream (no-op)");
            return Vec::new();
        };

        if let Err(e) = active.stream_control.pause() {
            warn!("failed to pause audio stream on release: {}", e);
        }

        let mut samples = Vec::new();
        while let Some(sample) = active.consumer.try_pop() {
            samples.push(sample);
        }

        let mono = downmix_to_mono(&samples, active.device_channels);
        let converted = resample_linear(&mono, active.device_sample_rate, TARGET_SAMPLE_RATE);

        info!(
            raw_samples = samples.len(),
            out_samples = converted.len(),
            total_us = start.elapsed().as_micros(),
            "capture released"
        );

        converted
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        if self.active.is_some() {
            debug!("capture dropped while open, releasing");
            let _ = self.release();
        }
    }
}

/// Root-mean-square level of one callback chunk
fn rms(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = data.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    // f64 → f32: levels are display telemetry, precision sufficient
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    {
        (sum_sq / data.len() as f64).sqrt() as f32
    }
}

/// Average interleaved channels down to mono
fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let channels_f64 = f64::from(channels);
    samples
        .chunks(channels as usize)
        .map(|frame| {
            let sum: f64 = frame.iter().map(|&s| f64::from(s)).sum();
            // f64 → f32: audio samples are stored as f32, precision sufficient
            #[allow(clippy::cast_possible_truncation)]
            {
                (sum / channels_f64) as f32
            }
        })
        .collect()
}

/// Linear-interpolation resample from `from_rate` to `to_rate`
// Fractional index math requires f64 ↔ usize conversions
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = f64::from(from_rate) / f64::from(to_rate);
    let output_len = ((samples.len() as f64) / ratio).ceil() as usize;

    let mut resampled = Vec::with_capacity(output_len);
    for i in 0..output_len {
        let src_idx = (i as f64) * ratio;
        let lo = (src_idx.floor() as usize).min(samples.len() - 1);
        let hi = (lo + 1).min(samples.len() - 1);
        let fract = src_idx - src_idx.floor();

        let s1 = f64::from(samples[lo]);
        let s2 = f64::from(samples[hi]);
        resampled.push(s1.mul_add(1.0 - fract, s2 * fract) as f32);
    }

    resampled
}
