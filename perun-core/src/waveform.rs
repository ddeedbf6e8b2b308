//! Volume envelope for the waveform chart.
//!
//! Amplitudes come from an [`AmplitudeProbe`] when one is available. WAV is
//! read with hound, every other container with symphonia. If the
//! probe is missing or fails, a deterministic synthetic envelope is used so
//! the chart always has a shape. Points falling inside a flagged span are
//! tagged with that span.

use crate::annotation::{AnnotationSpan, Flag};
use crate::error::{PerunError, Result};
use crate::timestamp;
use hound::{SampleFormat, WavReader};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::io::{Cursor, Read};
use std::sync::Arc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

pub const MIN_POINTS: usize = 50;
pub const MAX_POINTS: usize = 200;

/// Samples read per point; matches a 2048-bin analyser window
pub const WINDOW_SIZE: usize = 2048;

/// Something that can report the raw signal around a media position
pub trait AmplitudeProbe {
    fn seek(&mut self, seconds: f64) -> Result<()>;
    /// Fill `buffer` with samples in `[-1, 1]` from the current position;
    /// returns how many were written.
    fn time_domain(&mut self, buffer: &mut [f32]) -> Result<usize>;
    /// Return to the start so playback is not disturbed
    fn rewind(&mut self) -> Result<()>;
}

/// Probe over decoded PCM, mixed down to mono.
///
/// Clones share the decoded samples and only copy the cursor.
#[derive(Debug, Clone)]
pub struct PcmProbe {
    samples: Arc<[f32]>,
    sample_rate: u32,
    cursor: usize,
}

impl PcmProbe {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            cursor: 0,
        }
    }

    /// Decode any supported container: WAV through hound, MP3, AAC/M4A,
    /// MP4, FLAC and Ogg through symphonia. `extension` helps the container
    /// probe when the bytes are ambiguous.
    pub fn from_media_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<Self> {
        if is_riff_wave(&bytes) {
            return Self::from_wav_bytes(&bytes);
        }

        let source = MediaSourceStream::new(
            Box::new(Cursor::new(bytes)),
            MediaSourceStreamOptions::default(),
        );
        let mut hint = Hint::new();
        if let Some(extension) = extension {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
            .cloned()
            .ok_or_else(|| PerunError::Media("no audio track found".into()))?;
        let sample_rate = track
            .codec_params
            .sample_rate
            .filter(|rate| *rate > 0)
            .ok_or_else(|| PerunError::Media("audio track has no sample rate".into()))?;

        let mut decoder =
            symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

        let mut samples = Vec::new();
        // Scratch buffer and the frame capacity it was sized for
        let mut scratch: Option<(usize, SampleBuffer<f32>)> = None;
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(_)) => break,
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != track.id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!("Skipping undecodable frame: {}", e);
                    continue;
                }
                Err(SymphoniaError::IoError(_)) => break,
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            if channels == 0 {
                return Err(PerunError::Media("decoded audio has no channels".into()));
            }
            let capacity = decoded.capacity();
            if scratch.as_ref().map_or(true, |(size, _)| *size < capacity) {
                scratch = Some((capacity, SampleBuffer::<f32>::new(capacity as u64, spec)));
            }
            if let Some((_, buffer)) = scratch.as_mut() {
                buffer.copy_interleaved_ref(decoded);
                samples.extend(mix_down(buffer.samples(), channels));
            }
        }

        if samples.is_empty() {
            return Err(PerunError::Media("media contains no audio samples".into()));
        }
        debug!(
            "Decoded {} sample(s) at {} Hz with symphonia",
            samples.len(),
            sample_rate
        );
        Ok(Self::new(samples, sample_rate))
    }

    /// Decode a WAV stream of any integer or float sample format
    pub fn from_wav<R: Read>(reader: R) -> Result<Self> {
        let reader = WavReader::new(reader)?;
        let spec = reader.spec();
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(PerunError::Media("WAV header has no channels".into()));
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        let samples = mix_down(&interleaved, spec.channels as usize).collect();

        debug!(
            "Decoded WAV: {} Hz, {} channel(s), {}-bit",
            spec.sample_rate, spec.channels, spec.bits_per_sample
        );
        Ok(Self::new(samples, spec.sample_rate))
    }

    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_wav(Cursor::new(bytes))
    }

    /// Length of the decoded signal in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

impl AmplitudeProbe for PcmProbe {
    fn seek(&mut self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(PerunError::Media(format!("cannot seek to {}", seconds)));
        }
        let index = (seconds * self.sample_rate as f64) as usize;
        self.cursor = index.min(self.samples.len());
        Ok(())
    }

    fn time_domain(&mut self, buffer: &mut [f32]) -> Result<usize> {
        if self.samples.is_empty() {
            return Err(PerunError::Media("no decoded samples".into()));
        }
        let available = &self.samples[self.cursor..];
        let n = available.len().min(buffer.len());
        buffer[..n].copy_from_slice(&available[..n]);
        Ok(n)
    }

    fn rewind(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }
}

/// One bar of the chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WavePoint {
    /// Seconds
    pub time: f64,
    /// In `[0, 100]`
    pub amplitude: f32,
    /// Index into the span list passed to [`Waveform::build`]
    pub span_index: Option<usize>,
    pub flag: Option<Flag>,
}

impl WavePoint {
    pub fn is_flagged(&self) -> bool {
        self.span_index.is_some()
    }

    pub fn time_label(&self) -> String {
        timestamp::format_clock(self.time)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    pub points: Vec<WavePoint>,
    /// Whether the amplitudes are synthetic
    pub synthetic: bool,
}

impl Waveform {
    /// Sample `duration` seconds of media and tag the points with `spans`.
    ///
    /// Falls back to the synthetic envelope when `probe` is `None` or fails.
    /// A non-positive duration gives an empty waveform.
    pub fn build<P: AmplitudeProbe + ?Sized>(
        probe: Option<&mut P>,
        duration: f64,
        gain: f32,
        spans: &[AnnotationSpan],
    ) -> Self {
        if !duration.is_finite() || duration <= 0.0 {
            return Self::default();
        }

        let times = sample_times(duration);
        let live = probe.map(|p| sample_live(p, &times, gain));
        let (amplitudes, synthetic) = match live {
            Some(Ok(amplitudes)) => (amplitudes, false),
            Some(Err(e)) => {
                warn!("Amplitude sampling failed, using synthetic waveform: {}", e);
                (synthetic_envelope(times.len()), true)
            }
            None => (synthetic_envelope(times.len()), true),
        };

        let tolerance = duration / times.len() as f64 * 2.0;
        let points = times
            .into_iter()
            .zip(amplitudes)
            .map(|(time, amplitude)| {
                let span_index = spans
                    .iter()
                    .position(|span| span_covers(span, time, tolerance));
                WavePoint {
                    time,
                    amplitude,
                    span_index,
                    flag: span_index.map(|i| spans[i].flag()),
                }
            })
            .collect();

        Self { points, synthetic }
    }

    pub fn flagged_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_flagged()).count()
    }

    /// Index of the last point at or before `position`
    pub fn index_at(&self, position: f64) -> Option<usize> {
        let count = self.points.iter().take_while(|p| p.time <= position).count();
        count.checked_sub(1)
    }
}

/// `clamp(floor(duration / 2), 50, 200)`
pub fn sample_count(duration: f64) -> usize {
    let raw = if duration.is_finite() && duration > 0.0 {
        (duration / 2.0).floor() as usize
    } else {
        0
    };
    raw.clamp(MIN_POINTS, MAX_POINTS)
}

/// Evenly spaced times covering `[0, duration]`, both ends included
pub fn sample_times(duration: f64) -> Vec<f64> {
    let n = sample_count(duration);
    (0..n)
        .map(|i| duration * i as f64 / (n - 1) as f64)
        .collect()
}

/// RMS amplitude at each time, scaled to `[0, 100]`
pub fn sample_live<P: AmplitudeProbe + ?Sized>(
    probe: &mut P,
    times: &[f64],
    gain: f32,
) -> Result<Vec<f32>> {
    let sampled = sample_windows(probe, times, gain);
    // Rewind even when sampling stopped partway
    let rewound = probe.rewind();
    let amplitudes = sampled?;
    rewound?;
    Ok(amplitudes)
}

fn sample_windows<P: AmplitudeProbe + ?Sized>(
    probe: &mut P,
    times: &[f64],
    gain: f32,
) -> Result<Vec<f32>> {
    let mut buffer = vec![0.0f32; WINDOW_SIZE];
    let mut amplitudes = Vec::with_capacity(times.len());
    for &time in times {
        probe.seek(time)?;
        let n = probe.time_domain(&mut buffer)?;
        let rms = rms(&buffer[..n]);
        amplitudes.push((rms * 100.0 * gain).min(100.0));
    }
    Ok(amplitudes)
}

fn is_riff_wave(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// Average interleaved frames down to mono
fn mix_down(interleaved: &[f32], channels: usize) -> impl Iterator<Item = f32> + '_ {
    interleaved
        .chunks(channels.max(1))
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
}

/// Deterministic stand-in envelope used when the signal is unavailable
pub fn synthetic_envelope(count: usize) -> Vec<f32> {
    (0..count)
        .map(|i| {
            let i = i as f64;
            let base = (i * 0.3).sin().abs() * 30.0;
            let detail = (i * 0.8 + PI / 3.0).sin().abs() * 20.0;
            let texture = (i * 0.6 + PI / 4.0).sin().abs() * 15.0;
            (base + detail + texture + 5.0).max(8.0) as f32
        })
        .collect()
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

fn span_covers(span: &AnnotationSpan, time: f64, tolerance: f64) -> bool {
    let Some(start) = span.start else {
        return false;
    };
    let end = span.end.unwrap_or(start).max(start);
    time >= start - tolerance && time <= end + tolerance
}
