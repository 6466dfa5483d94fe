use std::collections::VecDeque;

use geofill_core::runtime::{FieldName, Theme};
use geofill_core::ServiceEvent;
use ratatui::layout::{Constraint, Direction, Layout, Margin};
use ratatui::prelude::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::ViewState;

pub struct UiState {
    pub view: ViewState,
    pub selected: usize,
    /// Mutating commands queued but not yet answered.
    pub in_flight: usize,
    /// Command line being typed after `:`.
    pub input: Option<String>,
    pub output: Vec<String>,
    pub logs: VecDeque<String>,
    pub max_logs: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            view: ViewState::default(),
            selected: 0,
            in_flight: 0,
            input: None,
            output: Vec::new(),
            logs: VecDeque::new(),
            max_logs: 8,
        }
    }
}

impl UiState {
    pub fn set_view(&mut self, view: ViewState) {
        self.view = view;
        if self.selected >= self.view.fields.len() {
            self.selected = self.view.fields.len().saturating_sub(1);
        }
    }

    pub fn busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn command_queued(&mut self, read_only: bool) {
        if !read_only {
            self.in_flight += 1;
        }
    }

    pub fn command_finished(&mut self, read_only: bool) {
        if !read_only {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
    }

    pub fn push_event(&mut self, event: ServiceEvent) {
        for toast in &event.toasts {
            self.push_log(toast.clone());
        }
        if !event.lines.is_empty() {
            self.output = event.lines;
        }
    }

    pub fn push_log<S: Into<String>>(&mut self, line: S) {
        let mut text: String = line.into();
        while text.ends_with('\n') || text.ends_with('\r') {
            text.pop();
        }
        if text.is_empty() {
            return;
        }
        self.logs.push_front(text);
        while self.logs.len() > self.max_logs {
            self.logs.pop_back();
        }
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.view.fields.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_field(&self) -> Option<FieldName> {
        self.view.fields.get(self.selected).map(|view| view.field)
    }
}

struct Palette {
    accent: Color,
    text: Color,
    muted: Color,
    locked: Color,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Dark => Palette {
            accent: Color::Yellow,
            text: Color::White,
            muted: Color::DarkGray,
            locked: Color::Cyan,
        },
        Theme::Light => Palette {
            accent: Color::Blue,
            text: Color::Black,
            muted: Color::Gray,
            locked: Color::Magenta,
        },
    }
}

pub fn draw_ui(frame: &mut Frame, state: &UiState) {
    let palette = palette(state.view.theme);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(15),
            Constraint::Length(6),
            Constraint::Length(10),
        ])
        .split(frame.size());
    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    draw_header(frame, chunks[0], state, &palette);
    draw_profile(frame, middle[0], state, &palette);
    draw_output(frame, middle[1], state, &palette);
    draw_commands(frame, chunks[2], state, &palette);
    draw_logs(frame, chunks[3], state);
}

fn inner(area: Rect) -> Rect {
    area.inner(&Margin {
        vertical: 1,
        horizontal: 1,
    })
}

fn draw_header(frame: &mut Frame, area: Rect, state: &UiState, palette: &Palette) {
    let block = Block::default().borders(Borders::ALL).title("GeoFill");
    let ai = match (state.view.use_ai, state.view.ai_ready) {
        (true, true) => Span::styled("AI on", Style::default().fg(Color::Green)),
        (true, false) => Span::styled("AI on (not configured)", Style::default().fg(Color::Red)),
        (false, _) => Span::styled("AI off", Style::default().fg(palette.muted)),
    };
    let mut spans = vec![
        Span::styled(state.view.location.clone(), Style::default().fg(palette.accent)),
        Span::raw(" | "),
        ai,
    ];
    if state.busy() {
        spans.push(Span::styled(" | working…", Style::default().fg(palette.accent)));
    }
    let text = Paragraph::new(Line::from(spans)).wrap(Wrap { trim: true });
    frame.render_widget(block, area);
    frame.render_widget(text, inner(area));
}

fn draw_profile(frame: &mut Frame, area: Rect, state: &UiState, palette: &Palette) {
    let block = Block::default().borders(Borders::ALL).title("Profile");
    let lines: Vec<Line> = state
        .view
        .fields
        .iter()
        .enumerate()
        .map(|(index, view)| {
            let marker = if view.locked { "🔒" } else { "  " };
            let mut name_style = Style::default().fg(if view.locked {
                palette.locked
            } else {
                palette.muted
            });
            if index == state.selected {
                name_style = name_style.add_modifier(Modifier::REVERSED);
            }
            Line::from(vec![
                Span::raw(format!("{marker} ")),
                Span::styled(format!("{:<10}", view.field.as_str()), name_style),
                Span::styled(view.value.clone(), Style::default().fg(palette.text)),
            ])
        })
        .collect();
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(block, area);
    frame.render_widget(paragraph, inner(area));
}

fn draw_output(frame: &mut Frame, area: Rect, state: &UiState, palette: &Palette) {
    let block = Block::default().borders(Borders::ALL).title("Output");
    let lines: Vec<Line> = state
        .output
        .iter()
        .map(|line| Line::from(Span::styled(line.clone(), Style::default().fg(palette.text))))
        .collect();
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(block, area);
    frame.render_widget(paragraph, inner(area));
}

fn draw_commands(frame: &mut Frame, area: Rect, state: &UiState, palette: &Palette) {
    let key = |text: &'static str| Span::styled(text, Style::default().fg(palette.accent));
    let lines = match &state.input {
        Some(input) => vec![
            Line::from(vec![key(":"), Span::raw(input.clone())]),
            Line::from(Span::styled(
                "enter run | esc cancel | e.g. country Japan, archive save work, setting passwordLength 16",
                Style::default().fg(palette.muted),
            )),
        ],
        None => vec![
            Line::from(vec![
                key("r"),
                Span::raw(" regenerate  "),
                key("a"),
                Span::raw(" AI generate  "),
                key("l"),
                Span::raw(" relocate  "),
                key("i"),
                Span::raw(" toggle AI"),
            ]),
            Line::from(vec![
                key("↑/↓"),
                Span::raw(" select  "),
                key("space"),
                Span::raw(" lock  "),
                key("e"),
                Span::raw(" refresh field  "),
                key("c"),
                Span::raw(" copy all"),
            ]),
            Line::from(vec![
                key("f"),
                Span::raw(" smart fill  "),
                key("n"),
                Span::raw(" normal fill  "),
                key("t"),
                Span::raw(" theme  "),
                key(":"),
                Span::raw(" command  "),
                key("q"),
                Span::raw(" quit"),
            ]),
        ],
    };
    let block = Block::default().borders(Borders::ALL).title("Commands");
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(block, area);
    frame.render_widget(paragraph, inner(area));
}

fn draw_logs(frame: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default().borders(Borders::ALL).title("Logs");
    let lines: Vec<Line> = state
        .logs
        .iter()
        .map(|entry| Line::from(Span::raw(entry)))
        .collect();
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(block, area);
    frame.render_widget(paragraph, inner(area));
}
