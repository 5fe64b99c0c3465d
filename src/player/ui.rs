use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, Gauge, List, ListItem, Paragraph,
        canvas::{Canvas, Context, Line as CanvasLine},
    },
};

use super::app::Player;
use super::engine::PlaybackSink;
use super::sampler::ContextState;
use super::transport::PlayLabel;
use super::visualizer::{BACKGROUND, DrawCommand, Rgb, Scene, Surface};

/// Screen regions, shared by drawing and mouse hit-testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppLayout {
    pub title: Rect,
    pub status: Rect,
    pub seek_bar: Rect,
    pub time: Rect,
    pub visualizer: Rect,
    pub playlist: Rect,
    pub activity: Rect,
    pub controls: Rect,
}

pub fn layout(area: Rect) -> AppLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // Title
            Constraint::Length(2), // Now playing
            Constraint::Length(3), // Seek bar + time
            Constraint::Min(8),    // Visualizer + side panels
            Constraint::Length(3), // Controls
        ])
        .split(area);

    let seek = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(15)])
        .split(rows[2]);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(rows[3]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(main[1]);

    AppLayout {
        title: rows[0],
        status: rows[1],
        seek_bar: seek[0],
        time: seek[1],
        visualizer: main[0],
        playlist: side[0],
        activity: side[1],
        controls: rows[4],
    }
}

fn bordered_inner(area: Rect) -> Rect {
    area.inner(Margin {
        horizontal: 1,
        vertical: 1,
    })
}

fn within(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x && column < area.x + area.width && row >= area.y && row < area.y + area.height
}

/// Logical drawing size of the visualizer: braille cells are 2x4 dots
pub fn canvas_resolution(area: Rect) -> (f64, f64) {
    let inner = bordered_inner(area);
    (inner.width as f64 * 2.0, inner.height as f64 * 4.0)
}

/// First visible playlist row so that the cursor stays on screen
pub fn playlist_offset(cursor: usize, visible_rows: usize) -> usize {
    cursor.saturating_sub(visible_rows.saturating_sub(1))
}

/// Playlist index under a click, if the click hit a row
pub fn playlist_row_at(
    area: Rect,
    cursor: usize,
    row_count: usize,
    column: u16,
    row: u16,
) -> Option<usize> {
    let inner = bordered_inner(area);
    if !within(inner, column, row) {
        return None;
    }
    let offset = playlist_offset(cursor, inner.height as usize);
    let index = offset + (row - inner.y) as usize;
    (index < row_count).then_some(index)
}

/// Fraction of the seek bar under a click, in `[0, 1]`
pub fn seek_fraction_at(area: Rect, column: u16, row: u16) -> Option<f64> {
    let inner = bordered_inner(area);
    if !within(inner, column, row) {
        return None;
    }
    let span = inner.width.saturating_sub(1).max(1) as f64;
    Some(((column - inner.x) as f64 / span).clamp(0.0, 1.0))
}

fn rgb(color: Rgb) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}

pub fn draw<S: PlaybackSink>(f: &mut Frame, player: &Player<S>) {
    let size = f.area();
    let regions = layout(size);

    let title = Paragraph::new("♪ tonedeck")
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, regions.title);

    draw_status(f, regions.status, player);
    draw_seek_bar(f, regions.seek_bar, regions.time, player);
    draw_visualizer(f, regions.visualizer, player);
    draw_playlist(f, regions.playlist, player);
    draw_activity(f, regions.activity, player);
    draw_controls(f, regions.controls, player);

    if player.prompt.is_active {
        draw_prompt(f, size, player);
    }
}

fn draw_status<S: PlaybackSink>(f: &mut Frame, area: Rect, player: &Player<S>) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(30)])
        .split(area);

    let now_playing = match player.current_track_name() {
        Some(name) => Line::from(vec![
            Span::styled(
                if player.transport().label == PlayLabel::Pause {
                    "▶ "
                } else {
                    "⏸ "
                },
                Style::default().fg(Color::Green),
            ),
            Span::styled(name.to_string(), Style::default().fg(Color::White)),
        ]),
        None => Line::from(Span::styled(
            "No track loaded - press [a] to add files",
            Style::default().fg(Color::DarkGray),
        )),
    };
    f.render_widget(Paragraph::new(now_playing), chunks[0]);

    let audio = match player.audio_state() {
        ContextState::Running => Span::styled("●", Style::default().fg(Color::Green)),
        ContextState::Suspended => Span::styled("○", Style::default().fg(Color::DarkGray)),
    };
    let info = Line::from(vec![
        Span::raw(format!(
            "vol {:>3.0}%  {}  ",
            player.transport().volume * 100.0,
            player.style()
        )),
        audio,
    ]);
    f.render_widget(
        Paragraph::new(info).alignment(Alignment::Right),
        chunks[1],
    );

    let border = Block::default().borders(Borders::BOTTOM);
    f.render_widget(border, area);
}

fn draw_seek_bar<S: PlaybackSink>(f: &mut Frame, bar: Rect, time: Rect, player: &Player<S>) {
    let transport = player.transport();
    let ratio = transport.seek.ratio();

    let label_style = if ratio >= 0.5 {
        Style::default()
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(ratio)
        .label(Span::styled(transport.label.to_string(), label_style));
    f.render_widget(gauge, bar);

    let time_widget = Paragraph::new(format!(
        "{} / {}",
        transport.current_time, transport.total_time
    ))
    .style(Style::default().fg(Color::White))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(time_widget, time);
}

fn draw_visualizer<S: PlaybackSink>(f: &mut Frame, area: Rect, player: &Player<S>) {
    let scene = player.surface();
    let (width, height) = scene.logical_size();
    let background = scene
        .commands()
        .iter()
        .find_map(|c| match c {
            DrawCommand::Clear(color) => Some(*color),
            _ => None,
        })
        .unwrap_or(BACKGROUND);

    let border_color = if player.visuals_running() {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let canvas = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(format!(" {} ", player.style())),
        )
        .background_color(rgb(background))
        .marker(Marker::Braille)
        .paint(|ctx| paint_scene(ctx, scene))
        .x_bounds([0.0, width.max(1.0)])
        .y_bounds([0.0, height.max(1.0)]);

    f.render_widget(canvas, area);
}

/// Replay recorded commands. Scene y grows downward, canvas y grows upward.
fn paint_scene(ctx: &mut Context, scene: &Scene) {
    let (width, height) = scene.logical_size();
    let flip = |y: f64| (height - y).clamp(0.0, height);

    for command in scene.commands() {
        match command {
            DrawCommand::Clear(_) => {}
            DrawCommand::Polyline { points, color, .. } => {
                for pair in points.windows(2) {
                    ctx.draw(&CanvasLine {
                        x1: pair[0].0,
                        y1: flip(pair[0].1),
                        x2: pair[1].0,
                        y2: flip(pair[1].1),
                        color: rgb(*color),
                    });
                }
            }
            DrawCommand::Rect {
                x,
                y,
                width: bar_width,
                height: bar_height,
                color,
            } => {
                // Filled rectangle as adjacent vertical dot columns
                let top = flip(*y);
                let bottom = flip(y + bar_height);
                let mut dx = 0.0;
                while dx < *bar_width && x + dx <= width {
                    ctx.draw(&CanvasLine {
                        x1: x + dx,
                        y1: bottom,
                        x2: x + dx,
                        y2: top,
                        color: rgb(*color),
                    });
                    dx += 1.0;
                }
            }
        }
    }
}

fn draw_playlist<S: PlaybackSink>(f: &mut Frame, area: Rect, player: &Player<S>) {
    let rows = player.playlist_rows();
    let visible = bordered_inner(area).height as usize;
    let offset = playlist_offset(player.cursor(), visible);

    let items: Vec<ListItem> = rows
        .iter()
        .skip(offset)
        .take(visible)
        .map(|row| {
            let marker = if row.active { "▶ " } else { "  " };
            let mut style = if row.active {
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            if row.index == player.cursor() {
                style = style.bg(Color::DarkGray);
            }
            ListItem::new(Line::from(Span::styled(
                format!("{marker}{}. {}", row.index + 1, row.name),
                style,
            )))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Playlist ({}) ", rows.len())),
    );
    f.render_widget(list, area);
}

fn draw_activity<S: PlaybackSink>(f: &mut Frame, area: Rect, player: &Player<S>) {
    let visible = bordered_inner(area).height as usize;
    let entries: Vec<_> = player.activity().entries().collect();
    let start = entries.len().saturating_sub(visible);

    let items: Vec<ListItem> = entries[start..]
        .iter()
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    entry.at.format("%H:%M:%S ").to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(entry.text.clone()),
            ]))
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Log "));
    f.render_widget(list, area);
}

fn draw_controls<S: PlaybackSink>(f: &mut Frame, area: Rect, player: &Player<S>) {
    let playing = player.transport().label == PlayLabel::Pause;

    let control_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    let controls_row1 = vec![
        if playing {
            Span::styled("[space]", Style::default().fg(Color::Yellow))
        } else {
            Span::styled("[space]", Style::default().fg(Color::Green))
        },
        Span::raw(if playing { " pause  " } else { " play  " }),
        Span::styled("[n/p]", Style::default().fg(Color::Blue)),
        Span::raw(" next/prev  "),
        Span::styled("[←→]", Style::default().fg(Color::Magenta)),
        Span::raw(" seek  "),
        Span::styled("[+/-]", Style::default().fg(Color::Cyan)),
        Span::raw(" volume  "),
        Span::styled("[q]", Style::default().fg(Color::Red)),
        Span::raw(" quit"),
    ];

    let controls_row2 = vec![
        Span::styled("[↑↓ enter]", Style::default().fg(Color::Green)),
        Span::raw(" pick  "),
        Span::styled("[a]", Style::default().fg(Color::Green)),
        Span::raw(" add  "),
        Span::styled("[v]", Style::default().fg(Color::Magenta)),
        Span::raw(" style  "),
        if player.visuals_running() {
            Span::styled("[f]", Style::default().fg(Color::Yellow))
        } else {
            Span::styled("[f]", Style::default().fg(Color::Yellow).bg(Color::DarkGray))
        },
        Span::raw(if player.visuals_running() {
            " freeze"
        } else {
            " freeze ●"
        }),
    ];

    let border_widget = Block::default().borders(Borders::TOP);
    f.render_widget(border_widget, area);

    f.render_widget(
        Paragraph::new(Line::from(controls_row1)).alignment(Alignment::Center),
        control_chunks[1],
    );
    f.render_widget(
        Paragraph::new(Line::from(controls_row2)).alignment(Alignment::Center),
        control_chunks[2],
    );
}

fn draw_prompt<S: PlaybackSink>(f: &mut Frame, area: Rect, player: &Player<S>) {
    let width = area.width.saturating_sub(4).min(70);
    let height = 4.min(area.height);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    let text = vec![
        Line::from(vec![
            Span::raw(player.prompt.input().to_string()),
            Span::styled("▏", Style::default().fg(Color::Yellow)),
        ]),
        Line::from(Span::styled(
            "enter add · esc cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(text).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Add files or folders "),
        ),
        popup,
    );
}
