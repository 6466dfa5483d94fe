use std::sync::mpsc::Receiver;
use std::time::Instant;

use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use geofill_core::runtime::{
    parse_command_line, FieldName, FillMode, ProfileCommand, Theme, ThemeChoice,
};
use geofill_core::{ProfileService, ServiceEvent};
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::*;
use rand::Rng;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{error, trace};

use crate::ui::{draw_ui, UiState};

/// What the UI needs to render, captured after every command.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub location: String,
    pub fields: Vec<FieldView>,
    pub theme: Theme,
    pub use_ai: bool,
    pub ai_ready: bool,
}

#[derive(Debug, Clone)]
pub struct FieldView {
    pub field: FieldName,
    pub value: String,
    pub locked: bool,
}

impl ViewState {
    pub fn capture<R: Rng>(service: &ProfileService<R>) -> Self {
        let fields = FieldName::ALL
            .iter()
            .map(|field| FieldView {
                field: *field,
                value: service.profile().get(*field).to_string(),
                locked: service.locks().contains(*field),
            })
            .collect();
        Self {
            location: service.location_label().to_string(),
            fields,
            theme: service.theme(),
            use_ai: service.use_ai(),
            ai_ready: service.settings().ai_ready(),
        }
    }
}

#[derive(Debug)]
pub enum UiUpdate {
    State(ViewState),
    /// Notice not tied to a queued command, such as the session start.
    Event(ServiceEvent),
    /// Result of a queued command.
    Completed {
        event: ServiceEvent,
        read_only: bool,
    },
}

pub struct GeofillApp {
    terminal: Terminal<CrosstermBackend<std::io::Stdout>>,
    ui_state: UiState,
    receiver: UnboundedReceiver<UiUpdate>,
    command_sender: UnboundedSender<ProfileCommand>,
    log_receiver: Receiver<String>,
}

impl GeofillApp {
    pub fn new(
        receiver: UnboundedReceiver<UiUpdate>,
        command_sender: UnboundedSender<ProfileCommand>,
        log_receiver: Receiver<String>,
    ) -> Result<Self> {
        let stdout = std::io::stdout();
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        crossterm::terminal::enable_raw_mode()?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(Self {
            terminal,
            ui_state: UiState::default(),
            receiver,
            command_sender,
            log_receiver,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let mut last_draw = Instant::now();

        loop {
            while let Ok(update) = self.receiver.try_recv() {
                match update {
                    UiUpdate::State(view) => self.ui_state.set_view(view),
                    UiUpdate::Event(event) => self.ui_state.push_event(event),
                    UiUpdate::Completed { event, read_only } => {
                        self.ui_state.command_finished(read_only);
                        self.ui_state.push_event(event);
                    }
                }
            }

            while let Ok(line) = self.log_receiver.try_recv() {
                self.ui_state.push_log(line);
            }

            if last_draw.elapsed() >= std::time::Duration::from_millis(100) {
                self.terminal.draw(|frame| draw_ui(frame, &self.ui_state))?;
                last_draw = Instant::now();
            }

            if event::poll(std::time::Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.ui_state.input.is_some() {
                        self.handle_input_key(key.code);
                        continue;
                    }
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => break,
                        KeyCode::Up | KeyCode::Char('k') => self.ui_state.select_previous(),
                        KeyCode::Down | KeyCode::Char('j') => self.ui_state.select_next(),
                        KeyCode::Char(' ') => {
                            if let Some(field) = self.ui_state.selected_field() {
                                self.send(ProfileCommand::ToggleLock(field));
                            }
                        }
                        KeyCode::Char('e') => {
                            if let Some(field) = self.ui_state.selected_field() {
                                self.send(ProfileCommand::RefreshField(field));
                            }
                        }
                        KeyCode::Char('r') => self.send(ProfileCommand::Regenerate),
                        KeyCode::Char('a') => self.send(ProfileCommand::GenerateWithAi),
                        KeyCode::Char('l') => self.send(ProfileCommand::RefreshLocation),
                        KeyCode::Char('f') => self.send(ProfileCommand::FillForm(FillMode::Smart)),
                        KeyCode::Char('n') => {
                            self.send(ProfileCommand::FillForm(FillMode::Normal))
                        }
                        KeyCode::Char('c') => self.send(ProfileCommand::CopyAll),
                        KeyCode::Char('i') => {
                            let enabled = !self.ui_state.view.use_ai;
                            self.send(ProfileCommand::SetUseAi(enabled));
                        }
                        KeyCode::Char('t') => {
                            self.send(ProfileCommand::Theme(ThemeChoice::Toggle))
                        }
                        KeyCode::Char(':') => self.ui_state.input = Some(String::new()),
                        _ => {}
                    }
                }
            }
        }

        self.terminal.show_cursor()?;
        crossterm::terminal::disable_raw_mode()?;
        Ok(())
    }

    fn handle_input_key(&mut self, code: KeyCode) {
        let Some(input) = self.ui_state.input.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => self.ui_state.input = None,
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(ch) => input.push(ch),
            KeyCode::Enter => {
                let line = self.ui_state.input.take().unwrap_or_default();
                match parse_command_line(&line) {
                    Ok(command) => self.send(command),
                    Err(err) => self.ui_state.push_log(format!("{line}: {err}")),
                }
            }
            _ => {}
        }
    }

    fn send(&mut self, command: ProfileCommand) {
        let read_only = command.is_read_only();
        if let Err(err) = self.command_sender.send(command) {
            error!("Failed to queue command: {}", err);
            return;
        }
        self.ui_state.command_queued(read_only);
        trace!("command.queued");
    }
}
