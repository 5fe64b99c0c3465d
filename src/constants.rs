//! Project-wide constants used across multiple modules.
//!
//! This module centralizes constant definitions to avoid duplication and ensure
//! consistency across the codebase.

/// Supported audio file extensions
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "flac"];

/// Number of entries kept in the activity log panel
pub const ACTIVITY_LOG_CAPACITY: usize = 30;

/// Prefix put in front of every activity log line
pub const ACTIVITY_LOG_MARKER: &str = "♪";

/// Smallest and largest analysis window the sampler accepts
pub const MIN_FFT_SIZE: usize = 32;
pub const MAX_FFT_SIZE: usize = 32768;

/// Decay applied to the previous smoothed value of every bin
pub const SMOOTHING_DECAY: f32 = 0.8;

/// Blend factors for the primary, secondary and tertiary traces
pub const TRACE_BLENDS: [f32; 3] = [0.2, 0.15, 0.1];

/// Gain applied to waveform captures before smoothing
pub const WAVEFORM_GAIN: f32 = 2.0;

/// Directories to skip when expanding a directory into tracks
pub const SKIP_DIRECTORIES: &[&str] = &["node_modules", ".git", "temp"];
