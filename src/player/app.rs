//! Player state and control flow.
//!
//! `Player` is the one owner of everything the terminal player is made of:
//! the playback sink, the sampler attached to the sink's tap, the visualizer
//! with its drawing surface and frame loop, the playlist, the transport and
//! the activity log. It is constructed against an injected sink and surface,
//! so several players can coexist and tests can drive one without an audio
//! device.
//!
//! Every change of what is playing goes through `load_track`.

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::info;
use ratatui::{Terminal, backend::CrosstermBackend, layout::Rect};
use std::{
    error::Error,
    io,
    time::{Duration, Instant},
};

use super::activity_log::ActivityLog;
use super::engine::{AudioEngine, PlaybackSink};
use super::playlist::{Playlist, PlaylistRow};
use super::prompt::Prompt;
use super::sampler::{ContextState, FrequencySampler};
use super::track::{Track, expand_inputs, load_tracks};
use super::transport::{Transport, clamp_volume};
use super::ui;
use super::visualizer::{FrameLoop, Scene, Surface, Visualizer};
use crate::config::{Config, VisualStyle};

pub struct Player<S: PlaybackSink, D: Surface = Scene> {
    pub should_quit: bool,
    pub prompt: Prompt,
    sink: S,
    sampler: FrequencySampler,
    visualizer: Visualizer,
    surface: D,
    frames: FrameLoop,
    playlist: Playlist,
    transport: Transport,
    activity: ActivityLog,
    cursor: usize,
    ended_handled: bool,
    seek_step_secs: f64,
    volume_step: f32,
}

impl<S: PlaybackSink, D: Surface> Player<S, D> {
    /// Bind a player to its sink and surface.
    ///
    /// The sink's tap is taken here and never again; a sink whose tap is
    /// already gone cannot back a second player.
    pub fn new(mut sink: S, surface: D, config: &Config) -> Result<Self, Box<dyn Error>> {
        let tap = sink
            .take_tap()
            .ok_or("Audio graph already attached to this sink")?;
        let sampler = FrequencySampler::attach(tap, config.fft_size)?;
        let visualizer = Visualizer::new(
            config.visual_style,
            sampler.frequency_bin_count(),
            config.amplitude_px,
        );

        if let Some(volume) = clamp_volume(config.volume) {
            sink.set_volume(volume);
        }
        let mut transport = Transport::new(sink.volume());
        transport.sync(&sink);

        let mut frames = FrameLoop::new(config.frame_rate_hz);
        frames.start();

        Ok(Self {
            should_quit: false,
            prompt: Prompt::new(),
            sink,
            sampler,
            visualizer,
            surface,
            frames,
            playlist: Playlist::new(),
            transport,
            activity: ActivityLog::new(),
            cursor: 0,
            ended_handled: false,
            seek_step_secs: config.seek_step_secs,
            volume_step: config.volume_step,
        })
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn surface(&self) -> &D {
        &self.surface
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn playlist_rows(&self) -> Vec<PlaylistRow> {
        self.playlist.rows()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.playlist.current()
    }

    pub fn current_track_name(&self) -> Option<&str> {
        self.playlist.current_track().map(|t| t.name.as_str())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn style(&self) -> VisualStyle {
        self.visualizer.style()
    }

    pub fn audio_state(&self) -> ContextState {
        self.sampler.state()
    }

    pub fn visuals_running(&self) -> bool {
        self.frames.is_running()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.visualizer.frames_drawn()
    }

    pub fn frame_interval(&self) -> Duration {
        self.frames.interval()
    }

    /// Leave the suspended audio state. Must follow a user action.
    pub fn resume_audio(&mut self) -> bool {
        let resumed = self.sampler.resume();
        if resumed {
            info!("Audio analysis resumed");
        }
        resumed
    }

    /// Append tracks; if nothing is playing or queued, load the first new
    /// one that decodes.
    pub fn add_tracks(&mut self, tracks: Vec<Track>) {
        let count = tracks.len();
        let idle = !self.sink.is_loaded() || self.sink.has_ended();

        let Some(first) = self.playlist.append(tracks) else {
            return;
        };
        self.activity.log(format!(
            "Added {count} track{}",
            if count == 1 { "" } else { "s" }
        ));

        if idle {
            for index in first..self.playlist.len() {
                if self.load_track(index) {
                    break;
                }
            }
        }
    }

    /// Expand user paths into tracks and add them. Unreadable files are
    /// reported and skipped.
    pub fn add_paths<T: AsRef<str>>(&mut self, inputs: &[T]) {
        let paths = expand_inputs(inputs);
        if paths.is_empty() {
            self.activity.log("No audio files found");
            return;
        }

        let (tracks, errors) = load_tracks(&paths);
        for error in errors {
            self.activity.log(error);
        }
        self.add_tracks(tracks);
    }

    pub fn select_track(&mut self, index: usize) {
        if index < self.playlist.len() {
            self.load_track(index);
        } else {
            log::warn!("Ignoring selection of missing track {index}");
        }
    }

    pub fn next(&mut self) {
        self.step_to_playable(1);
    }

    pub fn previous(&mut self) {
        self.step_to_playable(-1);
    }

    /// Walk the playlist in `delta` steps until a track loads. Each track is
    /// tried at most once per call.
    fn step_to_playable(&mut self, delta: isize) {
        let mut from = self.playlist.current();
        for _ in 0..self.playlist.len() {
            let Some(index) = self.playlist.step_from(from, delta) else {
                return;
            };
            if self.load_track(index) {
                return;
            }
            from = Some(index);
        }
    }

    /// Swap the sink's content to the track at `index` and start playing it.
    ///
    /// The selection only moves once the sink accepted the track; on failure
    /// the previous track stays current and keeps playing. Returns whether
    /// the track loaded.
    pub fn load_track(&mut self, index: usize) -> bool {
        let Some(track) = self.playlist.get(index).cloned() else {
            return false;
        };

        if let Err(e) = self.sink.load(&track) {
            self.activity.log(format!("Could not load {}: {e}", track.name));
            self.transport.sync(&self.sink);
            return false;
        }
        self.playlist.select(index);
        self.cursor = index;
        self.sampler.reset();
        self.ended_handled = false;
        self.activity.log(format!("Loaded: {}", track.name));

        if let Err(e) = self.sink.play() {
            self.activity.log(format!("Playback rejected: {e}"));
        }
        self.transport.sync(&self.sink);
        true
    }

    pub fn toggle_playback(&mut self) {
        if !self.sink.is_loaded() {
            if self.playlist.is_empty() {
                self.activity.log("Add a track before pressing play");
            } else {
                self.activity.log("No playable track loaded");
            }
            return;
        }
        self.resume_audio();

        if self.sink.has_ended() {
            // Replay the finished track from the start
            if let Some(index) = self.playlist.current() {
                self.load_track(index);
            }
            return;
        }

        if self.sink.is_paused() {
            match self.sink.play() {
                Ok(()) => self.activity.log("Playing"),
                Err(e) => self.activity.log(format!("Playback rejected: {e}")),
            }
        } else {
            self.sink.pause();
            self.activity.log("Paused");
        }
        self.transport.sync(&self.sink);
    }

    /// Set the volume. NaN leaves the current volume in place.
    pub fn set_volume(&mut self, volume: f32) {
        if let Some(volume) = clamp_volume(volume) {
            self.sink.set_volume(volume);
            self.transport.volume = volume;
        }
    }

    pub fn adjust_volume(&mut self, steps: f32) {
        self.set_volume(self.sink.volume() + steps * self.volume_step);
    }

    pub fn seek_to(&mut self, seconds: f64) {
        if !self.sink.is_loaded() || !seconds.is_finite() {
            return;
        }
        let max = self.sink.duration().unwrap_or(0.0).max(0.0);
        self.sink.seek(seconds.clamp(0.0, max));
        self.transport.sync(&self.sink);
    }

    pub fn seek_relative(&mut self, steps: f64) {
        self.seek_to(self.sink.position() + steps * self.seek_step_secs);
    }

    /// Seek to a fraction of the seek bar, e.g. from a mouse click
    pub fn seek_fraction(&mut self, fraction: f64) {
        let target = self.transport.seek.position_at(fraction);
        self.seek_to(target);
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.playlist.len();
        if len == 0 {
            return;
        }
        self.cursor = (self.cursor as isize + delta).clamp(0, len as isize - 1) as usize;
    }

    pub fn activate_cursor(&mut self) {
        self.select_track(self.cursor);
    }

    pub fn cycle_style(&mut self) {
        let style = self.visualizer.style().next();
        self.visualizer.set_style(style);
        self.activity.log(format!("Visual style: {style}"));
    }

    pub fn start_visuals(&mut self) -> bool {
        self.frames.start()
    }

    pub fn stop_visuals(&mut self) -> bool {
        self.frames.stop()
    }

    pub fn toggle_visuals(&mut self) {
        if self.frames.is_running() {
            self.stop_visuals();
            self.activity.log("Visualizer stopped");
        } else {
            self.start_visuals();
            self.activity.log("Visualizer started");
        }
    }

    /// Track the on-screen size of the visualizer, in logical pixels
    pub fn resize_surface(&mut self, width: f64, height: f64) {
        if self.surface.logical_size() != (width, height) {
            self.surface.resize(width, height, (1.0, 1.0));
        }
    }

    /// One pass of the control loop: follow the sink, auto-advance at the
    /// end of a track, draw a visual frame when one is due.
    pub fn tick(&mut self, now: Instant) {
        if self.sink.has_ended() && !self.ended_handled {
            self.ended_handled = true;
            if let Some(name) = self.current_track_name() {
                info!("Finished {name}");
            }
            self.next();
        }

        self.transport.sync(&self.sink);

        if self.frames.due(now) {
            self.visualizer
                .render_frame(&mut self.sampler, &mut self.surface);
        }
    }
}

pub fn run(files: &[String], config: &Config) -> Result<(), Box<dyn Error>> {
    init_logging(&config.log_file)?;
    info!("Starting tonedeck");

    let engine = AudioEngine::new()?;
    let mut player = Player::new(engine, Scene::new(), config)?;

    // Launching the player is the gesture that unlocks audio analysis
    player.resume_audio();
    if !files.is_empty() {
        player.add_paths(files);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut player);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    info!("Exiting tonedeck");
    res
}

fn run_app<B: ratatui::backend::Backend, S: PlaybackSink>(
    terminal: &mut Terminal<B>,
    player: &mut Player<S>,
) -> Result<(), Box<dyn Error>> {
    let poll_timeout = player.frame_interval().min(Duration::from_millis(50));

    loop {
        let size = terminal.size()?;
        let layout = ui::layout(Rect::new(0, 0, size.width, size.height));
        let (width, height) = ui::canvas_resolution(layout.visualizer);
        player.resize_surface(width, height);

        player.tick(Instant::now());
        terminal.draw(|f| ui::draw(f, player))?;

        // Poll for events with a short timeout to allow continuous rendering
        if event::poll(poll_timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_key_event(player, key)
                }
                Event::Mouse(mouse) => handle_mouse_event(player, mouse, &layout),
                _ => {}
            }
        }

        if player.should_quit {
            return Ok(());
        }
    }
}

pub fn handle_key_event<S: PlaybackSink, D: Surface>(player: &mut Player<S, D>, key: KeyEvent) {
    if player.prompt.is_active {
        handle_prompt_keys(player, key);
    } else {
        handle_player_keys(player, key);
    }
}

fn handle_prompt_keys<S: PlaybackSink, D: Surface>(player: &mut Player<S, D>, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => player.prompt.cancel(),
        KeyCode::Backspace => player.prompt.pop_char(),
        KeyCode::Enter => {
            if let Some(path) = player.prompt.submit() {
                player.add_paths(&[path]);
            }
        }
        KeyCode::Char(c) => player.prompt.push_char(c),
        _ => {}
    }
}

fn handle_player_keys<S: PlaybackSink, D: Surface>(player: &mut Player<S, D>, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => player.should_quit = true,
        KeyCode::Char(' ') => player.toggle_playback(),
        KeyCode::Char('n') => player.next(),
        KeyCode::Char('p') => player.previous(),
        KeyCode::Left => player.seek_relative(-1.0),
        KeyCode::Right => player.seek_relative(1.0),
        KeyCode::Char('+') | KeyCode::Char('=') => player.adjust_volume(1.0),
        KeyCode::Char('-') => player.adjust_volume(-1.0),
        KeyCode::Up => player.move_cursor(-1),
        KeyCode::Down => player.move_cursor(1),
        KeyCode::Enter => player.activate_cursor(),
        KeyCode::Char('v') => player.cycle_style(),
        KeyCode::Char('f') => player.toggle_visuals(),
        KeyCode::Char('a') => player.prompt.open(),
        _ => {}
    }
}

pub fn handle_mouse_event<S: PlaybackSink, D: Surface>(
    player: &mut Player<S, D>,
    mouse: MouseEvent,
    layout: &ui::AppLayout,
) {
    if player.prompt.is_active {
        return;
    }
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let rows = player.playlist_rows().len();
            if let Some(index) =
                ui::playlist_row_at(layout.playlist, player.cursor(), rows, mouse.column, mouse.row)
            {
                player.select_track(index);
            } else if let Some(fraction) = ui::seek_fraction_at(layout.seek_bar, mouse.column, mouse.row)
            {
                player.seek_fraction(fraction);
            }
        }
        MouseEventKind::ScrollUp => player.move_cursor(-1),
        MouseEventKind::ScrollDown => player.move_cursor(1),
        _ => {}
    }
}

fn init_logging(log_file: &str) -> Result<(), Box<dyn Error>> {
    use simplelog::{CombinedLogger, LevelFilter, WriteLogger};
    use std::fs::File;

    CombinedLogger::init(vec![WriteLogger::new(
        LevelFilter::Debug,
        simplelog::Config::default(),
        File::create(log_file)?,
    )])?;

    Ok(())
}
