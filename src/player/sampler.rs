//! Frequency and waveform sampling of the playing audio.
//!
//! The sampler is the analysis stage between the playback sink and the
//! visualizer. It is attached once to the sink's tap, keeps a sliding window
//! of the most recent mono samples and turns that window into byte snapshots
//! on demand: magnitudes per frequency bin, or the raw waveform recentered on
//! 128. Until it is resumed the sampler reports silence, the same way a
//! suspended audio context does before a user gesture.

use super::engine::Tap;
use crate::config::validate_fft_size;
use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::collections::VecDeque;
use std::error::Error;
use std::f32::consts::PI;
use std::sync::Arc;

pub const DEFAULT_MIN_DECIBELS: f32 = -100.0;
pub const DEFAULT_MAX_DECIBELS: f32 = -30.0;
pub const DEFAULT_TIME_SMOOTHING: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Magnitude per frequency bin, 0-255
    Frequency,
    /// Time-domain samples, 0-255 centered on 128
    Waveform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
}

/// Fixed-size sliding window over the newest samples.
pub struct SampleWindow {
    samples: VecDeque<f32>,
    max_samples: usize,
}

impl SampleWindow {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::from(vec![0.0; max_samples]),
            max_samples,
        }
    }

    pub fn push_samples(&mut self, new_samples: &[f32]) {
        for &sample in new_samples {
            self.samples.push_back(sample);
        }
        // Keep only the most recent samples
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.samples.iter()
    }

    pub fn clear(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0.0);
    }
}

pub struct FrequencySampler {
    tap: Tap,
    window: SampleWindow,
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    blackman: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed_magnitudes: Vec<f32>,
    state: ContextState,
    pub min_decibels: f32,
    pub max_decibels: f32,
    pub time_smoothing: f32,
}

impl FrequencySampler {
    /// Bind the sampler to a tap. The window size must be a power of two in
    /// the range the platform analysers accept.
    pub fn attach(tap: Tap, fft_size: usize) -> Result<Self, Box<dyn Error>> {
        let fft_size = validate_fft_size(fft_size)?;
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);

        log::info!("Analyser attached: window {fft_size}, {} bins", fft_size / 2);

        Ok(Self {
            tap,
            window: SampleWindow::new(fft_size),
            fft,
            fft_size,
            blackman: blackman_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed_magnitudes: vec![0.0; fft_size / 2],
            state: ContextState::Suspended,
            min_decibels: DEFAULT_MIN_DECIBELS,
            max_decibels: DEFAULT_MAX_DECIBELS,
            time_smoothing: DEFAULT_TIME_SMOOTHING,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ContextState::Running
    }

    /// Leave the suspended state. Returns true if the state changed.
    pub fn resume(&mut self) -> bool {
        let changed = self.state == ContextState::Suspended;
        self.state = ContextState::Running;
        changed
    }

    pub fn suspend(&mut self) {
        self.state = ContextState::Suspended;
    }

    /// Move everything waiting in the tap into the window
    pub fn pump(&mut self) {
        while let Ok(chunk) = self.tap.try_recv() {
            self.window.push_samples(&chunk);
        }
    }

    /// Forget the window contents, e.g. after switching tracks
    pub fn reset(&mut self) {
        self.pump();
        self.window.clear();
        self.smoothed_magnitudes.iter_mut().for_each(|m| *m = 0.0);
    }

    /// Snapshot of `frequency_bin_count()` bytes in the requested mode
    pub fn sample(&mut self, mode: CaptureMode) -> Vec<u8> {
        let mut out = vec![0u8; self.frequency_bin_count()];
        match mode {
            CaptureMode::Frequency => self.byte_frequency_data(&mut out),
            CaptureMode::Waveform => self.byte_time_domain_data(&mut out),
        }
        out
    }

    pub fn byte_frequency_data(&mut self, out: &mut [u8]) {
        self.pump();
        if !self.is_running() {
            out.fill(0);
            return;
        }

        for (slot, (&sample, &w)) in self
            .buffer
            .iter_mut()
            .zip(self.window.iter().zip(self.blackman.iter()))
        {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.buffer);

        let range = self.max_decibels - self.min_decibels;
        let scale = 1.0 / self.fft_size as f32;
        for (i, byte) in out.iter_mut().enumerate() {
            let magnitude = self.buffer.get(i).map(|c| c.norm() * scale).unwrap_or(0.0);
            let Some(previous) = self.smoothed_magnitudes.get_mut(i) else {
                *byte = 0;
                continue;
            };
            *previous = self.time_smoothing * *previous + (1.0 - self.time_smoothing) * magnitude;

            let db = if *previous > 0.0 {
                20.0 * previous.log10()
            } else {
                f32::NEG_INFINITY
            };
            let scaled = 255.0 * (db - self.min_decibels) / range;
            *byte = scaled.clamp(0.0, 255.0) as u8;
        }
    }

    pub fn byte_time_domain_data(&mut self, out: &mut [u8]) {
        self.pump();
        if !self.is_running() {
            out.fill(0);
            return;
        }

        for (byte, &sample) in out.iter_mut().zip(self.window.iter()) {
            *byte = (128.0 + sample * 128.0).clamp(0.0, 255.0) as u8;
        }
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let alpha = 0.16;
    let a0 = 0.5 * (1.0 - alpha);
    let a1 = 0.5;
    let a2 = 0.5 * alpha;
    (0..size)
        .map(|i| {
            let x = i as f32 / size as f32;
            a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
        })
        .collect()
}
