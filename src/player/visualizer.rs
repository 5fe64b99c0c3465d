//! Smoothed waveform and spectrum rendering.
//!
//! Each visual frame the visualizer takes one byte snapshot from the sampler,
//! folds it into its smoothing traces and paints the result onto a `Surface`.
//! Surfaces record draw commands in logical pixels with the origin at the top
//! left; the terminal UI replays the recorded `Scene` onto a ratatui canvas.
//!
//! The frame cadence is owned by `FrameLoop`, a start/stop gate the event
//! loop polls. It is started once when the player is built and only the
//! content it draws changes afterwards.

use super::sampler::{CaptureMode, FrequencySampler};
use crate::config::VisualStyle;
use crate::constants::{SMOOTHING_DECAY, TRACE_BLENDS, WAVEFORM_GAIN};
use std::time::{Duration, Instant};

pub type Rgb = (u8, u8, u8);

pub const BACKGROUND: Rgb = (0x22, 0x22, 0x22);
const BAR_PITCH: f64 = 10.0;
const BAR_WIDTH: f64 = 8.0;

const TRACE_STYLES: [(Rgb, f32); 3] = [
    ((0, 255, 100), 2.0),
    ((0, 170, 255), 1.5),
    ((255, 80, 200), 1.0),
];

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Rgb),
    Polyline {
        points: Vec<(f64, f64)>,
        color: Rgb,
        width: f32,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Rgb,
    },
}

/// Anything the visualizer can paint on.
pub trait Surface {
    /// Set the logical size; `pixel_ratio` is device pixels per logical pixel
    /// along each axis. Resizing resets the transform to that ratio.
    fn resize(&mut self, width: f64, height: f64, pixel_ratio: (f64, f64));
    fn logical_size(&self) -> (f64, f64);
    fn clear(&mut self, color: Rgb);
    fn stroke(&mut self, points: Vec<(f64, f64)>, color: Rgb, width: f32);
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgb);
}

/// Recording surface: keeps the draw commands of the latest frame.
#[derive(Debug)]
pub struct Scene {
    width: f64,
    height: f64,
    scale: (f64, f64),
    commands: Vec<DrawCommand>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            scale: (1.0, 1.0),
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Size of the backing store in device pixels
    pub fn device_size(&self) -> (f64, f64) {
        (self.width * self.scale.0, self.height * self.scale.1)
    }

    /// Map a logical point to device pixels with the current transform
    pub fn to_device(&self, point: (f64, f64)) -> (f64, f64) {
        (point.0 * self.scale.0, point.1 * self.scale.1)
    }
}

impl Surface for Scene {
    fn resize(&mut self, width: f64, height: f64, pixel_ratio: (f64, f64)) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self.scale = pixel_ratio;
        self.commands.clear();
    }

    fn logical_size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Rgb) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear(color));
    }

    fn stroke(&mut self, points: Vec<(f64, f64)>, color: Rgb, width: f32) {
        if points.len() > 1 {
            self.commands.push(DrawCommand::Polyline {
                points,
                color,
                width,
            });
        }
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgb) {
        self.commands.push(DrawCommand::Rect {
            x,
            y,
            width,
            height,
            color,
        });
    }
}

/// Map a raw byte onto a signed unit range around 128, times `gain`
pub fn normalize(byte: u8, gain: f32) -> f32 {
    (byte as f32 - 128.0) / 128.0 * gain
}

/// One exponentially smoothed polyline
#[derive(Debug, Clone)]
pub struct Trace {
    pub smoothed: Vec<f32>,
    pub blend: f32,
    pub color: Rgb,
    pub width: f32,
}

impl Trace {
    pub fn new(bins: usize, blend: f32, color: Rgb, width: f32) -> Self {
        Self {
            smoothed: vec![0.0; bins],
            blend,
            color,
            width,
        }
    }

    pub fn update(&mut self, bytes: &[u8], gain: f32) {
        for (value, &byte) in self.smoothed.iter_mut().zip(bytes) {
            *value = *value * SMOOTHING_DECAY + normalize(byte, gain) * self.blend;
        }
    }
}

pub struct Visualizer {
    style: VisualStyle,
    traces: Vec<Trace>,
    amplitude_px: f64,
    frames_drawn: u64,
}

impl Visualizer {
    pub fn new(style: VisualStyle, bins: usize, amplitude_px: f64) -> Self {
        let traces = TRACE_BLENDS
            .iter()
            .zip(TRACE_STYLES)
            .map(|(&blend, (color, width))| Trace::new(bins, blend, color, width))
            .collect();

        Self {
            style,
            traces,
            amplitude_px,
            frames_drawn: 0,
        }
    }

    pub fn style(&self) -> VisualStyle {
        self.style
    }

    pub fn set_style(&mut self, style: VisualStyle) {
        if style != self.style {
            self.style = style;
            for trace in &mut self.traces {
                trace.smoothed.iter_mut().for_each(|v| *v = 0.0);
            }
        }
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn capture_mode(&self) -> CaptureMode {
        match self.style {
            VisualStyle::Bars => CaptureMode::Frequency,
            VisualStyle::Linear | VisualStyle::Mirrored => CaptureMode::Waveform,
        }
    }

    fn gain(&self) -> f32 {
        match self.capture_mode() {
            CaptureMode::Waveform => WAVEFORM_GAIN,
            CaptureMode::Frequency => 1.0,
        }
    }

    /// Read one snapshot and paint it
    pub fn render_frame(&mut self, sampler: &mut FrequencySampler, surface: &mut dyn Surface) {
        let bytes = sampler.sample(self.capture_mode());
        self.draw(&bytes, surface);
    }

    pub fn draw(&mut self, bytes: &[u8], surface: &mut dyn Surface) {
        surface.clear(BACKGROUND);
        let gain = self.gain();

        match self.style {
            VisualStyle::Linear => {
                self.traces[0].update(bytes, gain);
                draw_linear(&self.traces[0], surface);
            }
            VisualStyle::Mirrored => {
                for trace in &mut self.traces {
                    trace.update(bytes, gain);
                }
                for trace in self.traces.iter().rev() {
                    draw_mirrored(trace, self.amplitude_px, surface);
                }
            }
            VisualStyle::Bars => draw_bars(bytes, surface),
        }

        self.frames_drawn += 1;
    }
}

fn draw_linear(trace: &Trace, surface: &mut dyn Surface) {
    let (width, height) = surface.logical_size();
    let bins = trace.smoothed.len().max(1);
    let step = width / bins as f64;
    let center = height / 2.0;

    let points = trace
        .smoothed
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64 * step, center + v as f64 * center))
        .collect();
    surface.stroke(points, trace.color, trace.width);
}

fn draw_mirrored(trace: &Trace, amplitude_px: f64, surface: &mut dyn Surface) {
    let (width, height) = surface.logical_size();
    let bins = trace.smoothed.len().max(1);
    let center_x = width / 2.0;
    let center_y = height / 2.0;
    let step = center_x / bins as f64;

    let offsets: Vec<(f64, f64)> = trace
        .smoothed
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64 * step, center_y + v as f64 * amplitude_px))
        .collect();

    let right = offsets.iter().map(|&(dx, y)| (center_x + dx, y)).collect();
    let left = offsets.iter().map(|&(dx, y)| (center_x - dx, y)).collect();
    surface.stroke(right, trace.color, trace.width);
    surface.stroke(left, trace.color, trace.width);
}

fn draw_bars(bytes: &[u8], surface: &mut dyn Surface) {
    let (_, height) = surface.logical_size();

    for (i, &b) in bytes.iter().enumerate() {
        let bar_height = b as f64;
        let color = (b.saturating_add(100), 50, 255 - b);
        surface.fill_rect(
            i as f64 * BAR_PITCH,
            height - bar_height,
            BAR_WIDTH,
            bar_height,
            color,
        );
    }
}

/// Start/stop gate for the per-frame render callback
pub struct FrameLoop {
    running: bool,
    interval: Duration,
    next_due: Option<Instant>,
    frames: u64,
}

impl FrameLoop {
    pub fn new(frame_rate_hz: u32) -> Self {
        Self {
            running: false,
            interval: Duration::from_secs_f64(1.0 / frame_rate_hz.max(1) as f64),
            next_due: None,
            frames: 0,
        }
    }

    /// Returns false if the loop was already running
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.next_due = None;
        true
    }

    /// Returns false if the loop was not running
    pub fn stop(&mut self) -> bool {
        let was_running = self.running;
        self.running = false;
        self.next_due = None;
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// True when a frame should be drawn at `now`; schedules the next one
    pub fn due(&mut self, now: Instant) -> bool {
        if !self.running {
            return false;
        }
        match self.next_due {
            Some(at) if now < at => false,
            _ => {
                self.next_due = Some(now + self.interval);
                self.frames += 1;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(width: f64, height: f64) -> Scene {
        let mut scene = Scene::new();
        scene.resize(width, height, (1.0, 1.0));
        scene
    }

    fn polylines(scene: &Scene) -> Vec<&Vec<(f64, f64)>> {
        scene
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Polyline { points, .. } => Some(points),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(128, 1.0), 0.0);
        assert_eq!(normalize(0, 1.0), -1.0);
        assert_eq!(normalize(192, 2.0), 1.0);
    }

    #[test]
    fn test_smoothing_moves_strictly_between_old_and_new() {
        let mut trace = Trace::new(4, TRACE_BLENDS[0], (0, 0, 0), 1.0);
        let frames: [[u8; 4]; 3] = [[255, 0, 200, 60], [0, 255, 10, 250], [128, 30, 220, 90]];

        for frame in frames {
            let before = trace.smoothed.clone();
            trace.update(&frame, 1.0);
            for i in 0..4 {
                let target = normalize(frame[i], 1.0);
                let (lo, hi) = if before[i] < target {
                    (before[i], target)
                } else {
                    (target, before[i])
                };
                assert!(trace.smoothed[i] > lo && trace.smoothed[i] < hi);
            }
        }
    }

    #[test]
    fn test_smoothing_law() {
        let mut trace = Trace::new(1, 0.2, (0, 0, 0), 1.0);
        trace.smoothed[0] = 0.5;
        trace.update(&[0], 1.0);
        assert!((trace.smoothed[0] - (0.5 * 0.8 - 0.2)).abs() < 1e-6);

        let mut secondary = Trace::new(1, 0.15, (0, 0, 0), 1.0);
        secondary.update(&[255], 2.0);
        assert!((secondary.smoothed[0] - normalize(255, 2.0) * 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_capture_mode_follows_style() {
        let mut visualizer = Visualizer::new(VisualStyle::Linear, 8, 150.0);
        assert_eq!(visualizer.capture_mode(), CaptureMode::Waveform);
        visualizer.set_style(VisualStyle::Bars);
        assert_eq!(visualizer.capture_mode(), CaptureMode::Frequency);
    }

    #[test]
    fn test_linear_trace_spans_width() {
        let mut visualizer = Visualizer::new(VisualStyle::Linear, 4, 150.0);
        let mut surface = scene(400.0, 100.0);

        visualizer.draw(&[128, 192, 128, 64], &mut surface);

        assert_eq!(surface.commands()[0], DrawCommand::Clear(BACKGROUND));
        let lines = polylines(&surface);
        assert_eq!(lines.len(), 1);
        let xs: Vec<f64> = lines[0].iter().map(|p| p.0).collect();
        assert_eq!(xs, vec![0.0, 100.0, 200.0, 300.0]);
        // 192 -> +1.0 with gain 2, smoothed by 0.2, scaled by half height
        assert!((lines[0][1].1 - (50.0 + 0.2 * 50.0)).abs() < 1e-4);
        assert!((lines[0][0].1 - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_mirrored_traces_are_symmetric() {
        let mut visualizer = Visualizer::new(VisualStyle::Mirrored, 4, 150.0);
        let mut surface = scene(200.0, 400.0);

        visualizer.draw(&[255, 200, 100, 0], &mut surface);

        let lines = polylines(&surface);
        assert_eq!(lines.len(), 6);
        for pair in lines.chunks(2) {
            let (right, left) = (pair[0], pair[1]);
            for (r, l) in right.iter().zip(left.iter()) {
                assert!((r.0 - 100.0 + (l.0 - 100.0)).abs() < 1e-9);
                assert_eq!(r.1, l.1);
            }
        }

        // Tertiary trace is drawn first, primary last and loudest
        let primary = lines[4][0].1 - 200.0;
        let tertiary = lines[0][0].1 - 200.0;
        let expected = normalize(255, WAVEFORM_GAIN) as f64 * 0.2 * 150.0;
        assert!((primary - expected).abs() < 1e-3);
        assert!(tertiary.abs() < primary.abs());
    }

    #[test]
    fn test_bars_use_raw_bytes() {
        let mut visualizer = Visualizer::new(VisualStyle::Bars, 3, 150.0);
        let mut surface = scene(600.0, 200.0);

        visualizer.draw(&[0, 100, 255], &mut surface);

        let rects: Vec<&DrawCommand> = surface
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Rect { .. }))
            .collect();
        assert_eq!(rects.len(), 3);
        assert_eq!(
            rects[1],
            &DrawCommand::Rect {
                x: 10.0,
                y: 100.0,
                width: 8.0,
                height: 100.0,
                color: (200, 50, 155),
            }
        );
        if let DrawCommand::Rect { color, .. } = rects[2] {
            assert_eq!(*color, (255, 50, 0));
        }
    }

    #[test]
    fn test_scene_resize_resets_transform() {
        let mut surface = Scene::new();
        surface.resize(300.0, 150.0, (2.0, 2.0));
        surface.clear(BACKGROUND);

        assert_eq!(surface.logical_size(), (300.0, 150.0));
        assert_eq!(surface.device_size(), (600.0, 300.0));
        assert_eq!(surface.to_device((10.0, 5.0)), (20.0, 10.0));

        surface.resize(100.0, 50.0, (1.0, 1.0));
        assert!(surface.commands().is_empty());
        assert_eq!(surface.to_device((10.0, 5.0)), (10.0, 5.0));
    }

    #[test]
    fn test_frame_loop_start_is_idempotent() {
        let mut frames = FrameLoop::new(30);
        assert!(!frames.is_running());
        assert!(!frames.due(Instant::now()));

        assert!(frames.start());
        assert!(!frames.start());
        assert!(frames.is_running());

        assert!(frames.stop());
        assert!(!frames.stop());
        assert!(!frames.due(Instant::now()));
    }

    #[test]
    fn test_frame_loop_rate_limits() {
        let mut frames = FrameLoop::new(10);
        frames.start();
        let t0 = Instant::now();

        assert!(frames.due(t0));
        assert!(!frames.due(t0 + Duration::from_millis(50)));
        assert!(frames.due(t0 + frames.interval()));
        assert_eq!(frames.frames(), 2);
    }
}
