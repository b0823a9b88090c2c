//! Real audio capture using CPAL (Cross-Platform Audio Library).

use crate::audio::ring_buffer::SampleRing;
use crate::audio::source::CaptureSource;
use crate::defaults;
use crate::error::{ChordscopeError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex, PoisonError};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing to users.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2 (stderr).
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Device name patterns to filter out (not useful for instrument input).
const FILTERED_PATTERNS: &[&str] = &[
    "surround",
    "front:",
    "rear:",
    "center:",
    "side:",
    "Digital Output",
    "HDMI",
    "S/PDIF",
];

/// Check if a device name should be filtered out.
fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

/// An input device as presented to callers.
///
/// `id` is the position in the filtered enumeration and is the value
/// accepted by [`CaptureSource::start`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AudioDevice {
    pub id: usize,
    pub name: String,
    pub input_channels: u16,
}

/// Enumerate usable input devices, in a stable order.
fn enumerate_inputs() -> Result<Vec<cpal::Device>> {
    let devices = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        host.input_devices()
    })
    .map_err(|e| ChordscopeError::AudioCapture {
        message: format!("Failed to enumerate input devices: {}", e),
    })?;

    Ok(devices
        .filter(|device| {
            device
                .name()
                .map(|name| !should_filter_device(&name))
                .unwrap_or(false)
        })
        .collect())
}

/// List all available audio input devices.
///
/// # Errors
/// Returns `ChordscopeError::AudioCapture` if device enumeration fails.
///
/// # Note
/// During enumeration, cpal may probe multiple audio backends (ALSA, JACK,
/// Pulse); their warnings are suppressed. Obviously unusable devices
/// (surround channels, HDMI, S/PDIF) are filtered out.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let mut listed = Vec::new();
    for (id, device) in enumerate_inputs()?.into_iter().enumerate() {
        let Ok(name) = device.name() else { continue };
        let input_channels = device
            .default_input_config()
            .map(|config| config.channels())
            .unwrap_or(0);
        listed.push(AudioDevice {
            id,
            name,
            input_channels,
        });
    }
    Ok(listed)
}

/// Resolve a device by enumeration index, or the system default.
fn resolve_device(device: Option<usize>) -> Result<cpal::Device> {
    match device {
        Some(id) => {
            let mut devices = enumerate_inputs()?;
            if id < devices.len() {
                Ok(devices.swap_remove(id))
            } else {
                Err(ChordscopeError::AudioDeviceNotFound {
                    device: id.to_string(),
                })
            }
        }
        None => with_suppressed_stderr(|| cpal::default_host().default_input_device()).ok_or_else(
            || ChordscopeError::AudioDeviceNotFound {
                device: "default".to_string(),
            },
        ),
    }
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: The stream is only accessed from one thread at a time through the
/// Mutex wrapper in CpalCapture; its methods are called synchronously.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Real capture producer backed by CPAL.
///
/// Captures f32 mono at the configured sample rate; the data callback writes
/// straight into the shared [`SampleRing`] and is the ring's only producer.
/// Tries the preferred format first (f32/mono/target rate), then falls back
/// to the device's default config with software conversion (channel mixing +
/// linear resampling).
pub struct CpalCapture {
    sample_rate: u32,
    stream: Mutex<Option<SendableStream>>,
}

impl CpalCapture {
    /// Create a capture source targeting the given sample rate.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            stream: Mutex::new(None),
        }
    }

    /// Create a capture source at the default rate.
    pub fn with_default_rate() -> Self {
        Self::new(defaults::SAMPLE_RATE)
    }

    fn build_stream(&self, device: &cpal::Device, sink: Arc<SampleRing>) -> Result<cpal::Stream> {
        let preferred_config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            eprintln!("chordscope: audio stream error: {}", err);
        };

        // Preferred path: f32 mono at the target rate. PipeWire/PulseAudio
        // convert transparently on most setups.
        let ring = Arc::clone(&sink);
        if let Ok(stream) = device.build_input_stream(
            &preferred_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                ring.push(data);
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        self.build_stream_native(device, sink)
    }

    /// Build a stream at the device's default/native config, with software
    /// channel mixing and resampling down to the target rate.
    fn build_stream_native(
        &self,
        device: &cpal::Device,
        sink: Arc<SampleRing>,
    ) -> Result<cpal::Stream> {
        use cpal::SampleFormat;

        let default_config =
            device
                .default_input_config()
                .map_err(|e| ChordscopeError::AudioCapture {
                    message: format!("Failed to query default input config: {}", e),
                })?;

        let native_rate = default_config.sample_rate().0;
        let native_channels = default_config.channels() as usize;
        let target_rate = self.sample_rate;

        let stream_config: cpal::StreamConfig = default_config.clone().into();

        eprintln!(
            "chordscope: using native audio format ({}ch/{}Hz/{:?}), converting in software",
            native_channels,
            native_rate,
            default_config.sample_format(),
        );

        let err_callback = |err| {
            eprintln!("chordscope: audio stream error: {}", err);
        };

        match default_config.sample_format() {
            SampleFormat::F32 => device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        let converted = convert_to_mono_target_rate(
                            data,
                            native_channels,
                            native_rate,
                            target_rate,
                        );
                        sink.push(&converted);
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| ChordscopeError::AudioCapture {
                    message: format!("Failed to build native f32 stream: {}", e),
                }),
            SampleFormat::I16 => device
                .build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let float_data: Vec<f32> =
                            data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                        let converted = convert_to_mono_target_rate(
                            &float_data,
                            native_channels,
                            native_rate,
                            target_rate,
                        );
                        sink.push(&converted);
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| ChordscopeError::AudioCapture {
                    message: format!("Failed to build native i16 stream: {}", e),
                }),
            fmt => Err(ChordscopeError::AudioCapture {
                message: format!("Unsupported native sample format: {:?}", fmt),
            }),
        }
    }
}

/// Mix multi-channel audio to mono and resample to the target rate.
fn convert_to_mono_target_rate(
    samples: &[f32],
    channels: usize,
    source_rate: u32,
    target_rate: u32,
) -> Vec<f32> {
    let mono: Vec<f32> = if channels <= 1 {
        samples.to_vec()
    } else {
        samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    if source_rate == target_rate {
        mono
    } else {
        resample_linear(&mono, source_rate, target_rate)
    }
}

/// Linear-interpolation resampler. Good enough for capture conversion; the
/// classifier's features are robust to the interpolation error.
fn resample_linear(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if samples.is_empty() || source_rate == 0 || target_rate == 0 {
        return Vec::new();
    }
    let ratio = source_rate as f64 / target_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let base = pos.floor() as usize;
        let frac = (pos - base as f64) as f32;
        let a = samples[base];
        let b = samples[(base + 1).min(samples.len() - 1)];
        out.push(a + (b - a) * frac);
    }
    out
}

impl CaptureSource for CpalCapture {
    fn start(&mut self, device: Option<usize>, sink: Arc<SampleRing>) -> Result<()> {
        // A live stream keeps writing into the sink it was built with, so a
        // restart must tear it down and rebuild against the new ring.
        self.stop()?;

        let device = resolve_device(device)?;
        let stream = self.build_stream(&device, sink)?;
        stream.play().map_err(|e| ChordscopeError::AudioCapture {
            message: format!("Failed to start audio stream: {}", e),
        })?;

        let mut stream_guard = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        *stream_guard = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut stream_guard = self.stream.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(sendable_stream) = stream_guard.take() {
            sendable_stream
                .0
                .pause()
                .map_err(|e| ChordscopeError::AudioCapture {
                    message: format!("Failed to stop audio stream: {}", e),
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_filter_device() {
        assert!(should_filter_device("surround51"));
        assert!(should_filter_device("front:CARD=PCH"));
        assert!(should_filter_device("HDMI Output"));
        assert!(should_filter_device("Digital Output S/PDIF"));
        assert!(!should_filter_device("pipewire"));
        assert!(!should_filter_device("Built-in Audio"));
    }

    #[test]
    fn test_convert_stereo_to_mono() {
        let stereo = [0.2, 0.4, -0.2, -0.4, 1.0, 0.0];
        let mono = convert_to_mono_target_rate(&stereo, 2, 22_050, 22_050);
        assert_eq!(mono.len(), 3);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert!((mono[1] + 0.3).abs() < 1e-6);
        assert!((mono[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_resample_halves_sample_count() {
        let samples: Vec<f32> = (0..1000).map(|i| i as f32).collect();
        let out = resample_linear(&samples, 44_100, 22_050);
        assert_eq!(out.len(), 500);
        // Linear interpolation of a linear ramp reproduces the ramp
        assert!((out[250] - 500.0).abs() < 1.0);
    }

    #[test]
    fn test_resample_identity_rate_passthrough() {
        let samples = vec![0.1, 0.2, 0.3];
        let out = convert_to_mono_target_rate(&samples, 1, 22_050, 22_050);
        assert_eq!(out, samples);
    }

    #[test]
    fn test_resample_empty_input() {
        assert!(resample_linear(&[], 44_100, 22_050).is_empty());
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_list_devices_returns_at_least_one_device() {
        let devices = list_devices().expect("Failed to list devices");
        assert!(!devices.is_empty(), "Expected at least one audio device");
        // Ids must match enumeration order
        for (i, device) in devices.iter().enumerate() {
            assert_eq!(device.id, i);
        }
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_start_stop_with_default_device() {
        let mut capture = CpalCapture::with_default_rate();
        let ring = Arc::new(SampleRing::new(66_150));

        capture
            .start(None, Arc::clone(&ring))
            .expect("start failed");
        std::thread::sleep(std::time::Duration::from_millis(200));
        capture.stop().expect("stop failed");

        assert!(ring.written() > 0, "callback should have produced samples");
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_restart_rewires_to_new_ring() {
        let mut capture = CpalCapture::with_default_rate();
        let first = Arc::new(SampleRing::new(66_150));
        let second = Arc::new(SampleRing::new(66_150));

        capture
            .start(None, Arc::clone(&first))
            .expect("first start failed");
        capture
            .start(None, Arc::clone(&second))
            .expect("second start failed");
        let first_written = first.written();
        std::thread::sleep(std::time::Duration::from_millis(200));
        capture.stop().expect("stop failed");

        assert_eq!(
            first.written(),
            first_written,
            "old ring must stop receiving samples"
        );
        assert!(second.written() > 0, "new ring should receive samples");
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_start_with_out_of_range_device_index() {
        let mut capture = CpalCapture::with_default_rate();
        let ring = Arc::new(SampleRing::new(1024));

        let result = capture.start(Some(9999), ring);
        assert!(matches!(
            result,
            Err(ChordscopeError::AudioDeviceNotFound { .. })
        ));
    }
}
