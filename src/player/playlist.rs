//! Ordered playlist with a current position.
//!
//! The playlist only holds state. Whatever must happen when the current track
//! changes (loading it into the sink, logging) is done by the caller with the
//! index these methods return.

use super::track::Track;

/// One visible playlist line
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistRow {
    pub index: usize,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
    current: Option<usize>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append tracks in the given order. Returns the index of the first
    /// appended track, if any were given.
    pub fn append(&mut self, tracks: Vec<Track>) -> Option<usize> {
        if tracks.is_empty() {
            return None;
        }
        let first = self.tracks.len();
        self.tracks.extend(tracks);
        Some(first)
    }

    /// Make `index` current if it is in range
    pub fn select(&mut self, index: usize) -> Option<usize> {
        if index < self.tracks.len() {
            self.current = Some(index);
            Some(index)
        } else {
            None
        }
    }

    /// Index `delta` steps away from `from`, wrapping around. Starting from
    /// nothing gives the first track; `None` on an empty playlist.
    ///
    /// Does not move the current position; the caller selects once the
    /// track is actually playing.
    pub fn step_from(&self, from: Option<usize>, delta: isize) -> Option<usize> {
        let len = self.tracks.len();
        if len == 0 {
            return None;
        }
        Some(match from {
            Some(index) => (index as isize + delta).rem_euclid(len as isize) as usize,
            None => 0,
        })
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Full view of the playlist, rebuilt from scratch on every call
    pub fn rows(&self) -> Vec<PlaylistRow> {
        self.tracks
            .iter()
            .enumerate()
            .map(|(index, track)| PlaylistRow {
                index,
                name: track.name.clone(),
                active: self.current == Some(index),
            })
            .collect()
    }
}
