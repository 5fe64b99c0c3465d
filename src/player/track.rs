//! In-memory track references.
//!
//! A track is the display name plus the raw bytes of a user-selected file.
//! The bytes are read once when the file is picked and shared, never mutated,
//! for as long as the playlist holds the track.

use crate::constants::{AUDIO_EXTENSIONS, SKIP_DIRECTORIES};
use rayon::prelude::*;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Flac,
    Unknown,
}

impl AudioFormat {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "wav" | "wave" => AudioFormat::Wav,
            "flac" => AudioFormat::Flac,
            _ => AudioFormat::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(AudioFormat::Unknown)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, AudioFormat::Unknown)
    }
}

#[derive(Clone)]
pub struct Track {
    pub name: String,
    pub format: AudioFormat,
    content: Arc<[u8]>,
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("name", &self.name)
            .field("format", &self.format)
            .field("bytes", &self.content.len())
            .finish()
    }
}

impl Track {
    pub fn new(name: impl Into<String>, format: AudioFormat, content: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            format,
            content: content.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, Box<dyn Error>> {
        let format = AudioFormat::from_path(path);
        if !format.is_supported() {
            return Err(format!("Unsupported audio format: {}", path.display()).into());
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let content = fs::read(path)
            .map_err(|e| format!("Could not read {}: {e}", path.display()))?;

        Ok(Self::new(name, format, content))
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

/// Expand user input (files, directories, `~`) into audio file paths.
///
/// Directories are walked recursively; the files found in each directory are
/// sorted by name so a folder loads in a stable order. Hidden entries and
/// the usual junk directories are skipped.
pub fn expand_inputs<S: AsRef<str>>(inputs: &[S]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for input in inputs {
        let expanded = shellexpand::tilde(input.as_ref());
        let path = PathBuf::from(expanded.as_ref());
        if path.is_dir() {
            collect_audio_files(&path, &mut paths);
        } else {
            paths.push(path);
        }
    }
    paths
}

fn collect_audio_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Could not read directory {}: {e}", dir.display());
            return;
        }
    };

    let mut entries: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    entries.sort();

    for path in entries {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if name.starts_with('.') {
            continue;
        }

        if path.is_dir() {
            if !SKIP_DIRECTORIES.contains(&name.as_str()) {
                collect_audio_files(&path, out);
            }
        } else if path
            .extension()
            .map(|e| AUDIO_EXTENSIONS.contains(&e.to_string_lossy().to_lowercase().as_str()))
            .unwrap_or(false)
        {
            out.push(path);
        }
    }
}

/// Read every path into a track, in parallel, keeping the input order.
///
/// Files that cannot be read are returned as errors next to the tracks that
/// could, so one bad file does not drop the rest of the batch.
pub fn load_tracks(paths: &[PathBuf]) -> (Vec<Track>, Vec<String>) {
    let results: Vec<Result<Track, String>> = paths
        .par_iter()
        .map(|path| Track::from_path(path).map_err(|e| e.to_string()))
        .collect();

    let mut tracks = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(track) => tracks.push(track),
            Err(e) => errors.push(e),
        }
    }
    (tracks, errors)
}
