//! Transport state shown under the visualizer.
//!
//! Nothing here is a second source of truth for playback: the label, the
//! seek bar and the time labels are all recomputed from the sink on `sync`.

use super::engine::PlaybackSink;
use super::time::{format_duration, format_time};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayLabel {
    /// Sink is paused, ended or empty; pressing the control will play
    Play,
    /// Sink is playing; pressing the control will pause
    Pause,
}

impl PlayLabel {
    pub fn from_paused(paused: bool) -> Self {
        if paused {
            PlayLabel::Play
        } else {
            PlayLabel::Pause
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayLabel::Play => "play",
            PlayLabel::Pause => "pause",
        }
    }
}

impl fmt::Display for PlayLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Range input over `[0, max]` seconds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SeekBar {
    pub max: f64,
    pub value: f64,
}

impl SeekBar {
    /// Filled fraction in `[0, 1]`; 0 while the duration is unknown
    pub fn ratio(&self) -> f64 {
        if self.max > 0.0 {
            (self.value / self.max).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Position in seconds for a click at `fraction` of the bar's width
    pub fn position_at(&self, fraction: f64) -> f64 {
        if !fraction.is_finite() {
            return 0.0;
        }
        fraction.clamp(0.0, 1.0) * self.max
    }
}

/// Clamp a volume into `[0, 1]`. `None` for NaN, so the caller keeps the
/// previous volume.
pub fn clamp_volume(volume: f32) -> Option<f32> {
    if volume.is_nan() {
        None
    } else {
        Some(volume.clamp(0.0, 1.0))
    }
}

/// Parse user text as a volume. Non-numeric text is rejected.
pub fn parse_volume(input: &str) -> Option<f32> {
    input.trim().parse::<f32>().ok().and_then(clamp_volume)
}

#[derive(Debug, Clone)]
pub struct Transport {
    pub label: PlayLabel,
    pub seek: SeekBar,
    pub current_time: String,
    pub total_time: String,
    pub volume: f32,
}

impl Transport {
    pub fn new(volume: f32) -> Self {
        Self {
            label: PlayLabel::Play,
            seek: SeekBar::default(),
            current_time: format_time(0.0),
            total_time: format_duration(None),
            volume: clamp_volume(volume).unwrap_or(1.0),
        }
    }

    /// Re-read everything from the sink
    pub fn sync(&mut self, sink: &dyn PlaybackSink) {
        self.label = PlayLabel::from_paused(sink.is_paused());
        self.volume = sink.volume();

        let duration = sink.duration().filter(|d| d.is_finite() && *d > 0.0);
        self.seek.max = duration.unwrap_or(0.0);

        let position = sink.position();
        self.seek.value = match duration {
            Some(d) if position.is_finite() => position.clamp(0.0, d),
            _ => 0.0,
        };

        self.current_time = format_time(self.seek.value);
        self.total_time = format_duration(duration);
    }
}
