use std::io::Stdout;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use thiserror::Error;

use crate::config::AppConfig;
use crate::notes::NoteRepository;
use crate::richtext::{Document, FormatKind};
use crate::ui;

mod actions;
pub mod state;

pub use actions::SurfaceAction;
pub use state::{AppState, FocusPane, OverlayState};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("format buttons not found: {0}")]
    MissingUiElement(String),
}

/// Resolves the configured toolbar into controls.
///
/// An empty toolbar or an unknown control name aborts startup.
pub fn resolve_toolbar(names: &[String]) -> Result<Vec<FormatKind>, StartupError> {
    if names.is_empty() {
        return Err(StartupError::MissingUiElement(
            "toolbar has no controls".into(),
        ));
    }
    names
        .iter()
        .map(|name| {
            FormatKind::from_str(name.trim()).map_err(|_| {
                StartupError::MissingUiElement(format!("unknown toolbar control `{name}`"))
            })
        })
        .collect()
}

enum Action {
    Quit,
    Surface(SurfaceAction),
    RequestDelete,
    StartSearch,
    ToggleFocus,
    SelectAll,
}

pub struct App {
    pub config: Arc<AppConfig>,
    state: AppState,
    view: ui::ViewState,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: Arc<AppConfig>, repo: NoteRepository) -> Result<Self> {
        let toolbar = resolve_toolbar(&config.toolbar)?;
        let mut state = AppState::new(repo, &config, toolbar);
        state.initialize(Instant::now());
        Ok(Self {
            config,
            state,
            view: ui::ViewState::default(),
            should_quit: false,
            tick_rate: Duration::from_millis(100),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        self.shut_down(|| restore_terminal(&mut terminal))?;
        result
    }

    /// Saves pending edits before handing the terminal back, so a failed
    /// restore cannot drop them.
    fn shut_down(&mut self, restore: impl FnOnce() -> Result<()>) -> Result<()> {
        self.state.flush_pending(Instant::now());
        restore()
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| ui::draw_app(frame, &self.state, &mut self.view))
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                if let Event::Key(key) = event::read().context("reading terminal event")? {
                    self.handle_key(key);
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.state.tick(Instant::now());
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        let now = Instant::now();
        // Hints last until the next key; search keeps its own.
        if !self.state.is_search_active() {
            self.state.set_status_message(None::<String>);
        }

        if self.handle_overlay_key(key, now) {
            return;
        }
        if self.state.is_search_active() && self.handle_search_key(key) {
            return;
        }

        if let Some(action) = global_action(key) {
            self.handle_action(action, now);
            return;
        }

        match self.state.focus {
            FocusPane::List => self.handle_list_key(key, now),
            FocusPane::Title => self.handle_title_key(key, now),
            FocusPane::Content => self.handle_content_key(key, now),
        }
    }

    fn handle_action(&mut self, action: Action, now: Instant) {
        match action {
            Action::Quit => {
                self.state.flush_pending(now);
                self.should_quit = true;
            }
            Action::Surface(action) => self.state.dispatch(action, now),
            Action::RequestDelete => self.state.request_delete(now),
            Action::StartSearch => {
                self.state.begin_search();
                self.state
                    .set_status_message(Some("Type to filter • Enter keep • Esc clear"));
            }
            Action::ToggleFocus => self.state.cycle_focus(),
            Action::SelectAll => {
                if self.state.focus == FocusPane::Content {
                    self.state.editor_navigate(|doc| {
                        doc.select_all();
                        true
                    });
                }
            }
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        match self.state.overlay() {
            Some(OverlayState::DeleteNote(_)) => {
                match key.code {
                    KeyCode::Enter | KeyCode::Char('y') => {
                        self.state.dispatch(SurfaceAction::DeleteNote, now);
                    }
                    KeyCode::Esc | KeyCode::Char('n') => {
                        self.state.close_overlay();
                        self.state.set_status_message(Some("Delete canceled"));
                    }
                    _ => {}
                }
                true
            }
            None => false,
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.state.finish_search();
                self.state.set_search("");
                self.state.set_status_message(None::<String>);
                true
            }
            KeyCode::Enter => {
                self.state.finish_search();
                self.state.set_status_message(None::<String>);
                true
            }
            KeyCode::Backspace => {
                self.state.pop_search_char();
                true
            }
            KeyCode::Char(ch) if plain(key) => {
                self.state.push_search_char(ch);
                true
            }
            _ => false,
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent, now: Instant) {
        let len = self.state.list_entries().len();
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.state.list_mut().move_cursor(1, len),
            KeyCode::Up | KeyCode::Char('k') => self.state.list_mut().move_cursor(-1, len),
            KeyCode::Enter => {
                let entries = self.state.list_entries();
                if let Some(entry) = entries.get(self.state.list().cursor()) {
                    self.state
                        .dispatch(SurfaceAction::SelectNote(entry.id.clone()), now);
                }
            }
            KeyCode::Esc => self.state.dispatch(SurfaceAction::ToggleListView, now),
            _ => {}
        }
    }

    fn handle_title_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Enter | KeyCode::Down => self.state.cycle_focus(),
            KeyCode::Backspace => {
                self.state.title_backspace(now);
            }
            KeyCode::Char(ch) if plain(key) => self.state.input_title_char(ch, now),
            _ => {}
        }
    }

    fn handle_content_key(&mut self, key: KeyEvent, now: Instant) {
        if key.modifiers.contains(KeyModifiers::ALT) {
            if let Some(kind) = format_shortcut(key.code) {
                self.state.dispatch(SurfaceAction::ApplyFormat(kind), now);
            }
            return;
        }
        let extend = key.modifiers.contains(KeyModifiers::SHIFT);
        let navigate: Option<fn(&mut Document, bool) -> bool> = match key.code {
            KeyCode::Left => Some(Document::move_left),
            KeyCode::Right => Some(Document::move_right),
            KeyCode::Up => Some(Document::move_up),
            KeyCode::Down => Some(Document::move_down),
            KeyCode::Home => Some(Document::move_home),
            KeyCode::End => Some(Document::move_end),
            _ => None,
        };
        if let Some(navigate) = navigate {
            self.state.editor_navigate(|doc| navigate(doc, extend));
            return;
        }
        match key.code {
            KeyCode::Enter => {
                self.state.edit_content(now, Document::insert_newline);
            }
            KeyCode::Backspace => {
                self.state.edit_content(now, Document::backspace);
            }
            KeyCode::Delete => {
                self.state.edit_content(now, Document::delete_forward);
            }
            KeyCode::Tab => {}
            KeyCode::Char(ch) if plain(key) => {
                self.state.edit_content(now, |doc| doc.insert_char(ch));
            }
            _ => {}
        }
    }
}

fn plain(key: KeyEvent) -> bool {
    !key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
}

fn global_action(key: KeyEvent) -> Option<Action> {
    if key.code == KeyCode::Tab {
        return Some(Action::ToggleFocus);
    }
    if !key.modifiers.contains(KeyModifiers::CONTROL) {
        return None;
    }
    let action = match key.code {
        KeyCode::Char('q') | KeyCode::Char('c') => Action::Quit,
        KeyCode::Char('n') => Action::Surface(SurfaceAction::NewNote),
        KeyCode::Char('s') => Action::Surface(SurfaceAction::SaveNote),
        KeyCode::Char('d') => Action::RequestDelete,
        KeyCode::Char('f') => Action::StartSearch,
        KeyCode::Char('l') => Action::Surface(SurfaceAction::ToggleListView),
        KeyCode::Char('a') => Action::SelectAll,
        _ => return None,
    };
    Some(action)
}

fn format_shortcut(code: KeyCode) -> Option<FormatKind> {
    let kind = match code {
        KeyCode::Char('b') => FormatKind::Bold,
        KeyCode::Char('i') => FormatKind::Italic,
        KeyCode::Char('u') => FormatKind::Underline,
        KeyCode::Char('l') => FormatKind::List,
        KeyCode::Char('h') => FormatKind::Heading,
        KeyCode::Char('1') => FormatKind::AlignLeft,
        KeyCode::Char('2') => FormatKind::AlignCenter,
        KeyCode::Char('3') => FormatKind::AlignRight,
        KeyCode::Char('4') => FormatKind::AlignJustify,
        _ => return None,
    };
    Some(kind)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("creating terminal backend")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("restoring screen state")?;
    Ok(())
}
