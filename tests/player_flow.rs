#![cfg(feature = "player")]

use ratatui::{Terminal, backend::TestBackend};
use std::error::Error;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tonedeck::config::{Config, VisualStyle};
use tonedeck::player::app::Player;
use tonedeck::player::engine::{PlaybackSink, Tap};
use tonedeck::player::track::{AudioFormat, Track};
use tonedeck::player::transport::PlayLabel;
use tonedeck::player::ui;
use tonedeck::player::visualizer::{DrawCommand, Scene};

/// Playback element stand-in that records what it was asked to do
struct FakeSink {
    tap: Option<Tap>,
    feed: mpsc::Sender<Vec<f32>>,
    source: Option<String>,
    history: Vec<String>,
    paused: bool,
    ended: bool,
    position: f64,
    volume: f32,
}

impl FakeSink {
    fn new() -> Self {
        let (feed, tap) = mpsc::channel();
        Self {
            tap: Some(tap),
            feed,
            source: None,
            history: Vec::new(),
            paused: true,
            ended: false,
            position: 0.0,
            volume: 1.0,
        }
    }

    fn end_of_track(&mut self) {
        self.position = 30.0;
        self.ended = true;
    }
}

impl PlaybackSink for FakeSink {
    fn take_tap(&mut self) -> Option<Tap> {
        self.tap.take()
    }

    fn load(&mut self, track: &Track) -> Result<(), Box<dyn Error>> {
        self.source = Some(track.name.clone());
        self.history.push(track.name.clone());
        self.paused = true;
        self.ended = false;
        self.position = 0.0;
        Ok(())
    }

    fn play(&mut self) -> Result<(), Box<dyn Error>> {
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused || self.ended || self.source.is_none()
    }

    fn is_loaded(&self) -> bool {
        self.source.is_some()
    }

    fn has_ended(&self) -> bool {
        self.ended
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> Option<f64> {
        self.source.as_ref().map(|_| 30.0)
    }

    fn seek(&mut self, seconds: f64) {
        self.position = seconds;
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }
}

fn new_player() -> Player<FakeSink> {
    Player::new(FakeSink::new(), Scene::new(), &Config::default()).unwrap()
}

fn track(name: &str) -> Track {
    Track::new(name, AudioFormat::Wav, vec![0u8; 16])
}

#[test]
fn test_select_two_files_then_click_and_wrap() {
    let mut player = new_player();

    // Select 2 files: the first one loads and plays
    player.add_tracks(vec![track("one.wav"), track("two.wav")]);
    assert_eq!(player.sink().source.as_deref(), Some("one.wav"));
    assert!(!player.sink().is_paused());

    let rows = player.playlist_rows();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].active);
    assert!(!rows[1].active);

    // Click row 1
    let layout = ui::layout(ratatui::layout::Rect::new(0, 0, 120, 40));
    let inner_top = layout.playlist.y + 1;
    let index = ui::playlist_row_at(
        layout.playlist,
        player.cursor(),
        rows.len(),
        layout.playlist.x + 2,
        inner_top + 1,
    )
    .unwrap();
    player.select_track(index);

    let rows = player.playlist_rows();
    assert!(rows[1].active);
    assert_eq!(player.sink().source.as_deref(), Some("two.wav"));

    // Track 1 ends: playback wraps to track 0 and the label tells the truth
    player.sink_mut().end_of_track();
    player.tick(Instant::now());

    assert_eq!(player.current_index(), Some(0));
    assert_eq!(player.sink().source.as_deref(), Some("one.wav"));
    assert_eq!(player.sink().history, vec!["one.wav", "two.wav", "one.wav"]);
    assert_eq!(
        player.transport().label,
        PlayLabel::from_paused(player.sink().is_paused())
    );
    assert_eq!(player.transport().label, PlayLabel::Pause);
}

#[test]
fn test_adding_while_playing_leaves_selection_alone() {
    let mut player = new_player();
    player.add_tracks(vec![track("one.wav")]);
    player.add_tracks(vec![track("two.wav"), track("three.wav")]);

    assert_eq!(player.current_index(), Some(0));
    assert_eq!(player.sink().history, vec!["one.wav"]);
    assert_eq!(player.playlist_rows().len(), 3);
}

#[test]
fn test_activity_log_keeps_newest_thirty() {
    let mut player = new_player();
    player.add_tracks(vec![track("one.wav")]);

    for _ in 0..25 {
        player.toggle_playback();
    }

    let entries: Vec<_> = player.activity().entries().collect();
    assert_eq!(entries.len(), 27);
    assert!(entries.iter().all(|e| e.text.starts_with("♪ ")));

    for _ in 0..10 {
        player.toggle_playback();
    }
    let entries: Vec<_> = player.activity().entries().collect();
    assert_eq!(entries.len(), 30);
    assert_eq!(entries[0].seq, 7);
    assert_eq!(entries[29].seq, 36);
}

#[test]
fn test_add_paths_reads_files_from_disk() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("b.wav"), b"RIFF").unwrap();
    std::fs::write(temp.path().join("a.flac"), b"fLaC").unwrap();
    std::fs::write(temp.path().join("notes.txt"), b"x").unwrap();

    let mut player = new_player();
    let dir = temp.path().to_string_lossy().to_string();
    player.add_paths(&[dir]);

    let names: Vec<String> = player.playlist_rows().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["a.flac", "b.wav"]);
    assert_eq!(player.sink().source.as_deref(), Some("a.flac"));
}

#[test]
fn test_frames_follow_the_tap_once_resumed() {
    let mut player = new_player();
    player.resize_surface(160.0, 64.0);
    player.add_tracks(vec![track("one.wav")]);

    // Suspended: the waveform reads as all-zero bytes
    player.sink().feed.send(vec![0.25; 256]).unwrap();
    let t0 = Instant::now();
    player.tick(t0);
    assert_eq!(player.frames_drawn(), 1);

    player.resume_audio();
    player.sink().feed.send(vec![0.25; 256]).unwrap();
    player.tick(t0 + Duration::from_secs(1));
    assert_eq!(player.frames_drawn(), 2);

    let lines = player
        .surface()
        .commands()
        .iter()
        .filter(|c| matches!(c, DrawCommand::Polyline { .. }))
        .count();
    // Mirrored: three traces, two halves each
    assert_eq!(lines, 6);
}

#[test]
fn test_style_switch_to_bars_draws_rects() {
    let config = Config {
        visual_style: VisualStyle::Bars,
        fft_size: 64,
        ..Config::default()
    };
    let mut player = Player::new(FakeSink::new(), Scene::new(), &config).unwrap();
    player.resize_surface(400.0, 100.0);
    player.resume_audio();
    player.tick(Instant::now());

    let rects = player
        .surface()
        .commands()
        .iter()
        .filter(|c| matches!(c, DrawCommand::Rect { .. }))
        .count();
    assert_eq!(rects, 32);
}

#[test]
fn test_two_players_are_independent() {
    let mut first = new_player();
    let second = new_player();

    first.add_tracks(vec![track("one.wav")]);
    assert_eq!(first.playlist_rows().len(), 1);
    assert!(second.playlist_rows().is_empty());
    assert!(!second.sink().is_loaded());
}

#[test]
fn test_full_frame_renders() {
    let mut player = new_player();
    player.add_tracks(vec![track("one.wav"), track("two.wav")]);

    let mut terminal = Terminal::new(TestBackend::new(100, 36)).unwrap();
    let area = terminal.get_frame().area();
    let (width, height) = ui::canvas_resolution(ui::layout(area).visualizer);
    player.resize_surface(width, height);
    player.tick(Instant::now());

    terminal.draw(|f| ui::draw(f, &player)).unwrap();

    let buffer = terminal.backend().buffer();
    let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
    assert!(text.contains("tonedeck"));
    assert!(text.contains("one.wav"));
    assert!(text.contains("Loaded: one.wav"));
}
