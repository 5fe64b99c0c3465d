//! Audio playback engine with real-time sample monitoring.
//!
//! This module provides the playback side of the player: the `PlaybackSink`
//! trait the player talks to, and `AudioEngine`, its rodio implementation.
//! Tracks are decoded from their in-memory bytes (WAV via hound, FLAC via
//! claxon) and played through a monitoring source that forwards every played
//! frame, folded to mono, into the analysis tap.
//!
//! The tap is created together with the engine and handed out once. Loading
//! another track swaps the content behind the sink; the tap stays wired to
//! the same receiver for the life of the engine.

use super::track::{AudioFormat, Track};
use rodio::{OutputStream, OutputStreamBuilder, Sink, Source};
use std::error::Error;
use std::io::Cursor;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
    mpsc,
};
use std::time::Duration;

/// Mono samples per chunk pushed through the tap
const TAP_CHUNK: usize = 512;

/// Sentinel for "no seek requested"
const NO_SEEK: usize = usize::MAX;

/// Receiving end of the analysis tap
pub type Tap = mpsc::Receiver<Vec<f32>>;

// Type alias for the audio engine creation result
type AudioEngineResult = Result<AudioEngine, Box<dyn Error>>;

/// The playback element the player drives.
///
/// Mirrors the surface of a media element: content is swapped with `load`,
/// playback state is read back from the sink rather than tracked twice.
pub trait PlaybackSink {
    /// Hand out the analysis tap. Returns `None` once it has been taken.
    fn take_tap(&mut self) -> Option<Tap>;
    /// Replace the current content. Playback starts paused.
    fn load(&mut self, track: &Track) -> Result<(), Box<dyn Error>>;
    /// Start or resume playback. May be rejected.
    fn play(&mut self) -> Result<(), Box<dyn Error>>;
    fn pause(&mut self);
    /// True when paused, ended or empty
    fn is_paused(&self) -> bool;
    fn is_loaded(&self) -> bool;
    fn has_ended(&self) -> bool;
    /// Current position in seconds
    fn position(&self) -> f64;
    /// Duration in seconds, once known
    fn duration(&self) -> Option<f64>;
    fn seek(&mut self, seconds: f64);
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);
}

/// Fully decoded, interleaved audio normalized to [-1.0, 1.0]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

pub fn decode_track(track: &Track) -> Result<DecodedAudio, Box<dyn Error>> {
    match track.format {
        AudioFormat::Wav => decode_wav(track.content()),
        AudioFormat::Flac => decode_flac(track.content()),
        AudioFormat::Unknown => Err(format!("Unsupported audio format: {}", track.name).into()),
    }
}

fn decode_wav(bytes: &[u8]) -> Result<DecodedAudio, Box<dyn Error>> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    log::info!(
        "WAV format: {} Hz, {} channels, {} bits, {:?}",
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        spec.sample_format
    );

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            if !matches!(spec.bits_per_sample, 8 | 16 | 24 | 32) {
                return Err(format!("Unsupported bit depth: {}", spec.bits_per_sample).into());
            }
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(DecodedAudio {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}

fn decode_flac(bytes: &[u8]) -> Result<DecodedAudio, Box<dyn Error>> {
    let mut reader = claxon::FlacReader::new(Cursor::new(bytes))?;
    let info = reader.streaminfo();
    let scale = (1i64 << (info.bits_per_sample - 1)) as f32;

    log::info!(
        "FLAC format: {} Hz, {} channels, {} bits",
        info.sample_rate,
        info.channels,
        info.bits_per_sample
    );

    let mut samples = Vec::new();
    for sample in reader.samples() {
        samples.push(sample? as f32 / scale);
    }

    Ok(DecodedAudio {
        samples,
        channels: info.channels as u16,
        sample_rate: info.sample_rate,
    })
}

/// Read position shared between the control thread and the audio thread.
///
/// Only the audio thread moves `cursor`. Seeks are posted to `pending_seek`
/// and picked up between frames, so a jump never lands on the wrong channel.
#[derive(Debug)]
pub struct PlayHead {
    cursor: AtomicUsize,
    pending_seek: AtomicUsize,
}

impl Default for PlayHead {
    fn default() -> Self {
        Self {
            cursor: AtomicUsize::new(0),
            pending_seek: AtomicUsize::new(NO_SEEK),
        }
    }
}

impl PlayHead {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample index playback is at, or about to jump to
    pub fn position(&self) -> usize {
        match self.pending_seek.load(Ordering::Acquire) {
            NO_SEEK => self.cursor.load(Ordering::Relaxed),
            target => target,
        }
    }

    /// Post a jump to `index`; it must be the first sample of a frame
    pub fn request_seek(&self, index: usize) {
        self.pending_seek.store(index, Ordering::Release);
    }

    /// Claim the next sample index. A posted seek is applied only when
    /// `frame_start` is true.
    fn advance(&self, frame_start: bool) -> usize {
        if frame_start {
            let target = self.pending_seek.swap(NO_SEEK, Ordering::AcqRel);
            if target != NO_SEEK {
                self.cursor.store(target, Ordering::Relaxed);
            }
        }
        self.cursor.fetch_add(1, Ordering::Relaxed)
    }

    fn pin(&self, index: usize) {
        self.cursor.store(index, Ordering::Relaxed);
    }
}

pub struct AudioEngine {
    stream: OutputStream,
    sink: Sink,
    samples_tx: mpsc::Sender<Vec<f32>>,
    tap: Option<Tap>,
    audio: Option<Arc<DecodedAudio>>,
    head: Arc<PlayHead>,
    volume: f32,
}

impl AudioEngine {
    pub fn new() -> AudioEngineResult {
        let mut stream = OutputStreamBuilder::open_default_stream()?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());
        let (samples_tx, samples_rx) = mpsc::channel();

        Ok(Self {
            stream,
            sink,
            samples_tx,
            tap: Some(samples_rx),
            audio: None,
            head: Arc::new(PlayHead::new()),
            volume: 1.0,
        })
    }
}

impl PlaybackSink for AudioEngine {
    fn take_tap(&mut self) -> Option<Tap> {
        self.tap.take()
    }

    fn load(&mut self, track: &Track) -> Result<(), Box<dyn Error>> {
        let audio = Arc::new(decode_track(track)?);

        // Stop whatever is playing and start from a fresh sink
        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.sink.set_volume(self.volume);
        self.sink.pause();

        self.head = Arc::new(PlayHead::new());
        let source =
            MonitoredSource::new(audio.clone(), self.head.clone(), self.samples_tx.clone());
        self.sink.append(source);

        log::info!(
            "Loaded {}: {} frames, {:.1}s",
            track.name,
            audio.frames(),
            audio.duration_secs()
        );
        self.audio = Some(audio);
        Ok(())
    }

    fn play(&mut self) -> Result<(), Box<dyn Error>> {
        if self.audio.is_none() {
            return Err("No track loaded".into());
        }
        if self.sink.empty() {
            return Err("Track has finished; load it again to replay".into());
        }
        self.sink.play();
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn is_paused(&self) -> bool {
        self.sink.is_paused() || self.sink.empty()
    }

    fn is_loaded(&self) -> bool {
        self.audio.is_some()
    }

    fn has_ended(&self) -> bool {
        self.audio.is_some() && self.sink.empty()
    }

    fn position(&self) -> f64 {
        match &self.audio {
            Some(audio) if audio.sample_rate > 0 => {
                let channels = audio.channels.max(1) as usize;
                let frame = self.head.position() / channels;
                frame as f64 / audio.sample_rate as f64
            }
            _ => 0.0,
        }
    }

    fn duration(&self) -> Option<f64> {
        self.audio.as_ref().map(|a| a.duration_secs())
    }

    fn seek(&mut self, seconds: f64) {
        if let Some(audio) = &self.audio {
            let target = seconds.clamp(0.0, audio.duration_secs());
            let frame = (target * audio.sample_rate as f64) as usize;
            let index = (frame * audio.channels.max(1) as usize).min(audio.samples.len());
            self.head.request_seek(index);
            log::debug!("Seek to {target:.2}s (sample {index})");
        }
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.sink.set_volume(volume);
    }
}

/// Source that plays decoded audio from a shared play head and copies every
/// frame, folded to mono, into the tap.
pub struct MonitoredSource {
    audio: Arc<DecodedAudio>,
    head: Arc<PlayHead>,
    samples_tx: mpsc::Sender<Vec<f32>>,
    monitor_buffer: Vec<f32>,
    frame_sum: f32,
    frame_fill: u16,
}

impl MonitoredSource {
    pub fn new(
        audio: Arc<DecodedAudio>,
        head: Arc<PlayHead>,
        samples_tx: mpsc::Sender<Vec<f32>>,
    ) -> Self {
        Self {
            audio,
            head,
            samples_tx,
            monitor_buffer: Vec::with_capacity(TAP_CHUNK),
            frame_sum: 0.0,
            frame_fill: 0,
        }
    }

    fn flush(&mut self) {
        if !self.monitor_buffer.is_empty() {
            let _ = self.samples_tx.send(std::mem::take(&mut self.monitor_buffer));
            self.monitor_buffer.reserve(TAP_CHUNK);
        }
    }
}

impl Iterator for MonitoredSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let position = self.head.advance(self.frame_fill == 0);
        let Some(&sample) = self.audio.samples.get(position) else {
            // Keep the cursor pinned at the end
            self.head.pin(self.audio.samples.len());
            self.flush();
            return None;
        };

        let channels = self.audio.channels.max(1);
        self.frame_sum += sample;
        self.frame_fill += 1;
        if self.frame_fill >= channels {
            self.monitor_buffer.push(self.frame_sum / channels as f32);
            self.frame_sum = 0.0;
            self.frame_fill = 0;
            if self.monitor_buffer.len() >= TAP_CHUNK {
                self.flush();
            }
        }

        Some(sample)
    }
}

impl Source for MonitoredSource {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.audio.channels
    }

    fn sample_rate(&self) -> u32 {
        self.audio.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f64(self.audio.duration_secs()))
    }
}
