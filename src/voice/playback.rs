//! Audio playback to speakers

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{RecvTimeoutError, SyncSender, sync_channel};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SampleRate, SizedSample, StreamConfig};
use rubato::{FftFixedIn, Resampler};

use crate::{Error, Result};

/// Extra time allowed past the clip length before giving up on the completion signal
const COMPLETION_GRACE: Duration = Duration::from_millis(500);

/// Time left for the device buffer to drain after the last sample is handed over
const DRAIN_TAIL: Duration = Duration::from_millis(100);

/// Plays audio files, one at a time
///
/// Starting playback stops whatever is playing; `play_file` returns once the
/// clip has finished or was stopped.
pub trait AudioPlayer: Send + Sync {
    /// Play `path` to completion
    ///
    /// # Errors
    ///
    /// Returns [`Error::Playback`] if the file is missing, cannot be decoded
    /// or the output device fails
    fn play_file(&self, path: &Path) -> Result<()>;

    /// Stop the clip currently playing, if any
    fn stop(&self);
}

/// Decoded mono audio
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Clip {
    /// Length of the clip at its sample rate
    #[must_use]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let millis = (self.samples.len() as u64 * 1000) / u64::from(self.sample_rate);
        Duration::from_millis(millis)
    }

    /// Decode an MP3 or WAV file, chosen by extension
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing or cannot be decoded
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Playback(format!(
                "audio file not found: {}",
                path.display()
            )));
        }

        let is_wav = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("wav"));

        if is_wav {
            decode_wav(path)
        } else {
            decode_mp3(&std::fs::read(path)?)
        }
    }
}

/// Stop flag of the clip currently playing
///
/// At most one flag is registered. Registering a new one raises the previous
/// flag, which ends that clip's stream.
#[derive(Debug, Default)]
struct PlaybackSlot {
    current: Mutex<Option<Arc<AtomicBool>>>,
}

impl PlaybackSlot {
    /// Register a fresh stop flag, stopping the previous clip
    fn replace(&self) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.replace(Arc::clone(&flag)) {
            previous.store(true, Ordering::Release);
        }
        flag
    }

    /// Unregister `flag` if it is still the current one
    fn release(&self, flag: &Arc<AtomicBool>) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|c| Arc::ptr_eq(c, flag)) {
            *current = None;
        }
    }

    fn stop(&self) {
        if let Some(flag) = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            flag.store(true, Ordering::Release);
        }
    }
}

/// Plays audio to the default output device
pub struct AudioPlayback {
    slot: PlaybackSlot,
}

impl AudioPlayback {
    /// Create a new audio playback instance
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Playback("no output device available".to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            "audio playback initialized"
        );

        Ok(Self {
            slot: PlaybackSlot::default(),
        })
    }

    /// Play a clip, blocking until it finishes or is stopped
    fn play_clip_blocking(&self, clip: Clip, stop: &Arc<AtomicBool>) -> Result<()> {
        if clip.samples.is_empty() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Playback("no output device".to_string()))?;

        let (config, format, clip) = output_config_for(&device, clip)?;
        let wait = clip.duration() + COMPLETION_GRACE;
        let sample_count = clip.samples.len();

        let (done_tx, done_rx) = sync_channel::<()>(1);
        let stop = Arc::clone(stop);

        let samples = clip.samples;
        let stream = match format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, samples, stop, done_tx),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, samples, stop, done_tx),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, samples, stop, done_tx),
            other => {
                return Err(Error::Playback(format!(
                    "unsupported output sample format: {other:?}"
                )));
            }
        }?;

        stream.play().map_err(|e| Error::Playback(e.to_string()))?;

        match done_rx.recv_timeout(wait) {
            Ok(()) => std::thread::sleep(DRAIN_TAIL),
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(?wait, "playback did not signal completion in time");
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(Error::Playback("output stream closed unexpectedly".to_string()));
            }
        }

        drop(stream);
        tracing::debug!(samples = sample_count, "playback complete");

        Ok(())
    }
}

impl AudioPlayer for AudioPlayback {
    fn play_file(&self, path: &Path) -> Result<()> {
        let clip = Clip::load(path)?;
        let stop = self.slot.replace();
        let result = self.play_clip_blocking(clip, &stop);
        self.slot.release(&stop);
        result.map_err(|e| match e {
            Error::Playback(msg) => {
                Error::Playback(format!("{msg} (file: {})", path.display()))
            }
            other => other,
        })
    }

    fn stop(&self) {
        self.slot.stop();
    }
}

/// Output stream that plays `samples` on every channel in the device's sample type
///
/// Sends on `done` once the clip is exhausted or `stop` is raised.
fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    samples: Vec<f32>,
    stop: Arc<AtomicBool>,
    done: SyncSender<()>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = usize::from(config.channels);
    let mut position = 0usize;
    let mut signalled = false;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let stopped = stop.load(Ordering::Acquire);
                let finished = fill_frames(data, channels, &samples, &mut position, stopped);

                if !signalled && finished {
                    signalled = true;
                    let _ = done.try_send(());
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Playback(e.to_string()))
}

/// Copy mono samples from `position` into interleaved frames, padding with silence
///
/// Returns true once the clip is exhausted or `stopped` is set.
fn fill_frames<T>(
    data: &mut [T],
    channels: usize,
    samples: &[f32],
    position: &mut usize,
    stopped: bool,
) -> bool
where
    T: Sample + FromSample<f32>,
{
    for frame in data.chunks_mut(channels.max(1)) {
        let value = if !stopped && *position < samples.len() {
            *position += 1;
            T::from_sample(samples[*position - 1])
        } else {
            T::EQUILIBRIUM
        };
        frame.fill(value);
    }

    stopped || *position >= samples.len()
}

/// Sample formats the output stream can be built with
const fn is_playable(format: SampleFormat) -> bool {
    matches!(
        format,
        SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
    )
}

/// Pick an output config for the clip, resampling when the device cannot match its rate
fn output_config_for(
    device: &cpal::Device,
    clip: Clip,
) -> Result<(StreamConfig, SampleFormat, Clip)> {
    let rate = SampleRate(clip.sample_rate);
    let fits = |c: &cpal::SupportedStreamConfigRange, channels: u16| {
        c.channels() == channels
            && is_playable(c.sample_format())
            && c.min_sample_rate() <= rate
            && c.max_sample_rate() >= rate
    };

    let exact = device
        .supported_output_configs()
        .map_err(|e| Error::Playback(e.to_string()))?
        .find(|c| fits(c, 1))
        .or_else(|| {
            // Fallback: try stereo
            device.supported_output_configs().ok()?.find(|c| fits(c, 2))
        });

    if let Some(supported) = exact {
        let format = supported.sample_format();
        return Ok((supported.with_sample_rate(rate).config(), format, clip));
    }

    let supported = device
        .default_output_config()
        .map_err(|e| Error::Playback(e.to_string()))?;
    let format = supported.sample_format();
    if !is_playable(format) {
        return Err(Error::Playback(format!(
            "unsupported output sample format: {format:?}"
        )));
    }
    let config = supported.config();

    tracing::debug!(
        from = clip.sample_rate,
        to = config.sample_rate.0,
        ?format,
        "resampling clip for output device"
    );
    let clip = resample(&clip, config.sample_rate.0)?;
    Ok((config, format, clip))
}

/// Resample a clip to `target_rate`
#[allow(clippy::cast_possible_truncation)]
fn resample(clip: &Clip, target_rate: u32) -> Result<Clip> {
    if clip.sample_rate == target_rate || clip.samples.is_empty() {
        return Ok(Clip {
            samples: clip.samples.clone(),
            sample_rate: target_rate,
        });
    }
    if clip.sample_rate == 0 || target_rate == 0 {
        return Err(Error::Playback("cannot resample a zero sample rate".to_string()));
    }

    let chunk_size = 1024;
    let sub_chunks = 2;

    let mut resampler = FftFixedIn::<f32>::new(
        clip.sample_rate as usize,
        target_rate as usize,
        chunk_size,
        sub_chunks,
        1, // mono
    )
    .map_err(|e| Error::Playback(format!("failed to create resampler: {e}")))?;

    let expected = (clip.samples.len() as u64 * u64::from(target_rate)
        / u64::from(clip.sample_rate)) as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected + delay);
    let mut chunks = clip.samples.chunks(chunk_size);

    // Zero-pad the last chunk and flush the filter delay so the tail is kept
    while output.len() < delay + expected {
        let mut chunk = chunks.next().map(<[f32]>::to_vec).unwrap_or_default();
        chunk.resize(chunk_size, 0.0);
        let result = resampler
            .process(&[chunk], None)
            .map_err(|e| Error::Playback(format!("resampling failed: {e}")))?;
        output.extend_from_slice(&result[0]);
    }

    output.drain(..delay);
    output.truncate(expected);

    Ok(Clip {
        samples: output,
        sample_rate: target_rate,
    })
}

/// Decode MP3 bytes to mono f32 samples
fn decode_mp3(mp3_data: &[u8]) -> Result<Clip> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                #[allow(clippy::cast_sign_loss)]
                {
                    sample_rate = frame.sample_rate as u32;
                }

                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            // ID3 tags and padding between frames
            Err(minimp3::Error::SkippedData) => {}
            Err(e) => return Err(Error::Playback(format!("MP3 decode error: {e}"))),
        }
    }

    if samples.is_empty() {
        return Err(Error::Playback("MP3 contained no audio frames".to_string()));
    }

    Ok(Clip {
        samples,
        sample_rate,
    })
}

/// Decode a WAV file to mono f32 samples
#[allow(clippy::cast_precision_loss)]
fn decode_wav(path: &Path) -> Result<Clip> {
    let mut reader =
        hound::WavReader::open(path).map_err(|e| Error::Playback(format!("WAV decode error: {e}")))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Playback(format!("WAV decode error: {e}")))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Playback(format!("WAV decode error: {e}")))?
        }
    };

    let samples = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    Ok(Clip {
        samples,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_duration_from_rate() {
        let clip = Clip {
            samples: vec![0.0; 24_000],
            sample_rate: 24_000,
        };
        assert_eq!(clip.duration(), Duration::from_secs(1));
    }

    #[test]
    fn resample_doubles_length_when_upsampling() {
        // 0.1 s of a 440 Hz tone
        #[allow(clippy::cast_precision_loss)]
        let samples = (0..2_400)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 24_000.0).sin() * 0.5)
            .collect();
        let clip = Clip {
            samples,
            sample_rate: 24_000,
        };

        let out = resample(&clip, 48_000).unwrap();
        assert_eq!(out.sample_rate, 48_000);
        assert_eq!(out.samples.len(), 4_800);
        assert_eq!(out.duration(), clip.duration());

        let peak = out.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((0.4..0.6).contains(&peak), "peak {peak}");
    }

    #[test]
    fn resample_same_rate_is_identity() {
        let clip = Clip {
            samples: vec![0.25, -0.25],
            sample_rate: 44_100,
        };
        assert_eq!(resample(&clip, 44_100).unwrap(), clip);
    }

    #[test]
    fn resample_keeps_short_clip() {
        let clip = Clip {
            samples: vec![0.1; 300],
            sample_rate: 22_050,
        };
        let out = resample(&clip, 44_100).unwrap();
        assert_eq!(out.samples.len(), 600);
    }

    #[test]
    fn replacing_stops_previous_clip() {
        let slot = PlaybackSlot::default();
        let first = slot.replace();
        assert!(!first.load(Ordering::Acquire));

        let second = slot.replace();
        assert!(first.load(Ordering::Acquire));
        assert!(!second.load(Ordering::Acquire));
    }

    #[test]
    fn stale_release_keeps_newer_clip() {
        let slot = PlaybackSlot::default();
        let first = slot.replace();
        let second = slot.replace();

        // the first clip finishes after the second one started
        slot.release(&first);
        slot.stop();
        assert!(second.load(Ordering::Acquire));
    }

    #[test]
    fn stop_after_release_is_a_no_op() {
        let slot = PlaybackSlot::default();
        let flag = slot.replace();
        slot.release(&flag);
        slot.stop();
        assert!(!flag.load(Ordering::Acquire));
    }

    #[test]
    fn fills_every_channel_in_device_format() {
        let samples = [0.5f32, -0.5];
        let mut position = 0;

        let mut out = [0i16; 6];
        let finished = fill_frames(&mut out, 2, &samples, &mut position, false);
        assert!(finished);
        assert_eq!(out[0], out[1]);
        assert!(out[0] > 16_000);
        assert!(out[2] < -16_000);
        assert_eq!(&out[4..], &[0, 0]);

        // u16 silence sits at the midpoint
        let mut position = 0;
        let mut out = [0u16; 4];
        fill_frames(&mut out, 1, &samples, &mut position, true);
        assert_eq!(out, [u16::EQUILIBRIUM; 4]);
        assert_eq!(position, 0);
    }

    #[test]
    fn only_known_formats_are_playable() {
        assert!(is_playable(SampleFormat::F32));
        assert!(is_playable(SampleFormat::I16));
        assert!(is_playable(SampleFormat::U16));
        assert!(!is_playable(SampleFormat::I8));
        assert!(!is_playable(SampleFormat::F64));
    }

    #[test]
    fn missing_file_is_playback_error() {
        let err = Clip::load(Path::new("/nonexistent/voice.mp3")).unwrap_err();
        assert!(matches!(err, Error::Playback(_)));
    }

    #[test]
    fn decodes_stereo_wav_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ready.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(16_384i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let clip = Clip::load(&path).unwrap();
        assert_eq!(clip.sample_rate, 16_000);
        assert_eq!(clip.samples.len(), 100);
        assert!((clip.samples[0] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn garbage_mp3_is_rejected() {
        assert!(decode_mp3(b"definitely not audio").is_err());
    }
}
