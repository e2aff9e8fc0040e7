use crate::app::{
    update, AppMsg, Confirm, Draft, Effect, Entities, Globals, JobKey, Page, TaskMenu,
};
use crate::model::ConsoleConfig;
use crate::panels::backups::BackupTable;
use crate::panels::Panel;
use crate::services::cli_runner::{ConnectionContext, Executor, ProcessExecutor};
use crate::theme::Theme;
use crate::widgets::backups::draw_backups;
use crate::widgets::chrome::{draw_choices, draw_confirm, panel_block};
use crate::widgets::editor::{draw_editor, FieldEditor};
use crate::widgets::form::{draw_form, FormView};
use crate::widgets::menu::draw_tree;
use crate::widgets::status_bar::{draw_footer, draw_header};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    pub expires_at_tick: u64,
}

/// Outcome of one worker job.
pub struct LoadMsg {
    pub key: JobKey,
    pub outcome: Result<Vec<JsonValue>, String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Tree,
    Form,
}

#[derive(Default)]
pub struct AppState {
    pub config: ConsoleConfig,
    pub ctx: ConnectionContext,
    pub selected: usize,
    pub menu_offset: usize,
    pub menu_viewport_h: u16,
    pub focus: Focus,
    pub field_cursor: usize,
    pub open: Option<Page>,
    pub globals: Globals,
    pub entities: Entities,
    pub backups: BackupTable,
    pub draft: Option<Draft>,
    pub editor: Option<FieldEditor>,
    pub confirm: Option<Confirm>,
    pub task_menu: Option<TaskMenu>,
    pub toast: Option<Toast>,
    pub tick: u64,
    pub debug_log: VecDeque<String>,
    pub last_command: Option<String>,
    pub last_error: Option<String>,
    /// Set by a save that changed a restart-only attribute.
    pub restart_suggested: bool,
    pub in_flight: usize,
    pub jobs_done: usize,
    pub theme: Theme,
    pub tx: Option<Sender<LoadMsg>>,
    pub rx: Option<Receiver<LoadMsg>>,
    pub exec: Option<Arc<dyn Executor>>,
}

impl AppState {
    pub fn new(config: ConsoleConfig, exec: Arc<dyn Executor>) -> Self {
        let (tx, rx) = mpsc::channel::<LoadMsg>();
        Self {
            ctx: ConnectionContext::from_config(&config),
            config,
            theme: Theme::console_dark(),
            tx: Some(tx),
            rx: Some(rx),
            exec: Some(exec),
            ..Default::default()
        }
    }

    pub fn dbg(&mut self, msg: impl Into<String>) {
        let max = self.config.log_lines.max(1);
        while self.debug_log.len() >= max {
            self.debug_log.pop_front();
        }
        self.debug_log.push_back(msg.into());
    }

    pub fn open_panel(&self) -> Option<&Panel> {
        match &self.open {
            Some(Page::Global(g)) => Some(self.globals.get(*g)),
            Some(Page::Entity(kind, id)) => self.entities.get(*kind).get(id),
            Some(Page::Backups) | None => None,
        }
    }

    pub fn open_panel_mut(&mut self) -> Option<&mut Panel> {
        match &self.open {
            Some(Page::Global(g)) => Some(self.globals.get_mut(*g)),
            Some(Page::Entity(kind, id)) => self.entities.get_mut(*kind).get_mut(id),
            Some(Page::Backups) | None => None,
        }
    }

    fn ticks_for(&self, seconds: u64) -> u64 {
        (seconds * 1000 / self.config.tick_ms.max(1)).max(1)
    }
}

pub(crate) fn run_effects(state: &mut AppState, effects: Vec<Effect>) {
    for eff in effects {
        match eff {
            Effect::Run { key, steps } => {
                tracing::debug!(?key, steps = steps.len(), "job dispatched");
                for inv in &steps {
                    let line = state.ctx.render(inv);
                    state.dbg(format!("$ {line}"));
                    state.last_command = Some(line);
                }
                let (Some(exec), Some(tx)) = (state.exec.clone(), state.tx.clone()) else {
                    state.dbg(format!("no executor for {key:?}"));
                    continue;
                };
                state.in_flight += 1;
                crate::services::loader::spawn_job(exec, state.ctx.clone(), key, steps, tx);
            }
            Effect::ShowToast {
                text,
                level,
                seconds,
            } => {
                if level == ToastLevel::Error {
                    tracing::warn!(%text, "operation failed");
                }
                state.dbg(text.clone());
                state.toast = Some(Toast {
                    text,
                    level,
                    expires_at_tick: state.tick + state.ticks_for(seconds),
                });
            }
            Effect::CopyToClipboard(text) => {
                let copied = arboard::Clipboard::new().and_then(|mut c| c.set_text(text.clone()));
                let (msg, level) = match copied {
                    Ok(()) => ("Copied to clipboard".to_string(), ToastLevel::Success),
                    Err(e) => (format!("Clipboard unavailable: {e}"), ToastLevel::Warning),
                };
                state.toast = Some(Toast {
                    text: msg,
                    level,
                    expires_at_tick: state.tick + state.ticks_for(4),
                });
            }
        }
    }
}

/// Drain finished jobs into `update`.
fn pump(state: &mut AppState) {
    let mut drained: Vec<LoadMsg> = Vec::new();
    if let Some(rx) = &state.rx {
        while let Ok(msg) = rx.try_recv() {
            drained.push(msg);
        }
    }
    for msg in drained {
        state.in_flight = state.in_flight.saturating_sub(1);
        state.jobs_done += 1;
        let effects = update(
            state,
            AppMsg::JobDone {
                key: msg.key,
                outcome: msg.outcome,
            },
        );
        run_effects(state, effects);
    }
}

fn is_quit(state: &AppState, key: &KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }
    state.editor.is_none()
        && state.confirm.is_none()
        && state.task_menu.is_none()
        && key.code == KeyCode::Char('q')
}

/// Modal editor first, then the confirmation dialog and task menu, then global keys.
pub(crate) fn key_to_msg(state: &AppState, key: KeyEvent) -> Option<AppMsg> {
    if let Some(ed) = &state.editor {
        return Some(match key.code {
            KeyCode::Esc => AppMsg::CancelEdit,
            KeyCode::Enter if !ed.multiline => AppMsg::CommitEdit,
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                AppMsg::CommitEdit
            }
            _ => AppMsg::EditorKey(key),
        });
    }
    if state.confirm.is_some() {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Enter => Some(AppMsg::Confirm(true)),
            KeyCode::Char('n') | KeyCode::Esc => Some(AppMsg::Confirm(false)),
            _ => None,
        };
    }
    if state.task_menu.is_some() {
        return match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(AppMsg::TaskCursor(-1)),
            KeyCode::Down | KeyCode::Char('j') => Some(AppMsg::TaskCursor(1)),
            KeyCode::Enter => Some(AppMsg::ChooseTask),
            KeyCode::Esc => Some(AppMsg::CloseTasks),
            _ => None,
        };
    }
    let msg = match key.code {
        KeyCode::Up | KeyCode::Char('k') => AppMsg::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => AppMsg::MoveDown,
        KeyCode::PageUp => AppMsg::PageUp,
        KeyCode::PageDown => AppMsg::PageDown,
        KeyCode::Tab | KeyCode::BackTab => AppMsg::SwitchFocus,
        KeyCode::Enter | KeyCode::Right => AppMsg::Activate,
        KeyCode::Esc | KeyCode::Left => AppMsg::Back,
        KeyCode::Char('s') => AppMsg::Save,
        KeyCode::Char('r') => AppMsg::Reload,
        KeyCode::Char('u') => AppMsg::Revert,
        KeyCode::Char('n') => AppMsg::Create,
        KeyCode::Char('l') => AppMsg::CreateLink,
        KeyCode::Char('d') => AppMsg::Delete,
        KeyCode::Char('i') => AppMsg::Reindex,
        KeyCode::Char('a') => AppMsg::Tasks,
        KeyCode::Char('R') => AppMsg::Restart,
        KeyCode::Char('y') => AppMsg::CopyLastCommand,
        KeyCode::Char('t') => AppMsg::TestRegex,
        _ => return None,
    };
    Some(msg)
}

pub fn run(config: ConsoleConfig, headless: bool, ticks: u64) -> Result<()> {
    let tick_rate = Duration::from_millis(config.tick_ms.max(1));
    let mut state = AppState::new(config, Arc::new(ProcessExecutor));
    tracing::info!(
        server_id = %state.ctx.server_id,
        ldapi = %state.ctx.ldapi_url(),
        headless,
        "console starting"
    );
    let boot = update(&mut state, AppMsg::Boot);
    run_effects(&mut state, boot);

    if headless {
        let backend = ratatui::backend::TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend)?;
        for _ in 0..ticks {
            terminal.draw(|f| ui(f, &mut state))?;
            pump(&mut state);
            state.tick = state.tick.wrapping_add(1);
            std::thread::sleep(tick_rate);
        }
        let open = state.open.as_ref().map(|p| crate::nav::keys::page_key(p));
        let summary = serde_json::json!({
            "ok": state.last_error.is_none(),
            "server_id": state.ctx.server_id,
            "open": open,
            "loaded": state.open_panel().map(|p| p.is_loaded()).unwrap_or(false),
            "jobs_done": state.jobs_done,
            "in_flight": state.in_flight,
            "last_command": state.last_command,
            "last_error": state.last_error,
        });
        println!("{summary}");
        return Ok(());
    }

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut last_tick = Instant::now();
    let res: Result<()> = loop {
        if let Err(e) = terminal.draw(|f| ui(f, &mut state)) {
            break Err(e.into());
        }
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));
        match event::poll(timeout) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if is_quit(&state, &key) {
                        break Ok(());
                    }
                    if let Some(msg) = key_to_msg(&state, key) {
                        let effects = update(&mut state, msg);
                        run_effects(&mut state, effects);
                    }
                }
                Ok(_) => {}
                Err(e) => break Err(e.into()),
            },
            Ok(false) => {}
            Err(e) => break Err(e.into()),
        }
        pump(&mut state);
        if last_tick.elapsed() >= tick_rate {
            state.tick = state.tick.wrapping_add(1);
            last_tick = Instant::now();
        }
    };
    disable_raw_mode()?;
    execute!(std::io::stdout(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    tracing::info!(jobs = state.jobs_done, "console stopped");
    res
}

fn ui(f: &mut Frame, state: &mut AppState) {
    if let Some(t) = &state.toast {
        if state.tick >= t.expires_at_tick {
            state.toast = None;
        }
    }
    let screen = f.area();
    f.render_widget(Block::default().style(state.theme.base_style()), screen);

    const DEBUG_H: u16 = 5;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(DEBUG_H),
            Constraint::Length(1),
        ])
        .split(screen);
    draw_header(f, rows[0], state);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[1]);
    state.menu_viewport_h = cols[0].height.saturating_sub(2);
    draw_tree(f, cols[0], state);

    let form_focused = state.focus == crate::ui::Focus::Form;
    if let Some(d) = &state.draft {
        let view = match d.task {
            Some(_) => FormView::of_task(&d.form),
            None => FormView::of_draft(&d.form),
        };
        draw_form(f, cols[1], &view, state.field_cursor, form_focused, &state.theme);
    } else if state.open == Some(Page::Backups) {
        draw_backups(f, cols[1], &state.backups, form_focused, &state.theme);
    } else if let Some(p) = state.open_panel() {
        let view = FormView::of_panel(p);
        draw_form(f, cols[1], &view, state.field_cursor, form_focused, &state.theme);
    } else {
        let msg = match &state.open {
            Some(Page::Entity(..)) => "Loading…",
            _ => "Select a page on the left and press Enter.",
        };
        let p = Paragraph::new(msg)
            .style(state.theme.text_muted())
            .block(panel_block(" Directory Server ", false, &state.theme));
        f.render_widget(p, cols[1]);
    }

    draw_debug(f, rows[2], state);
    draw_footer(f, rows[3], state);

    if let Some(menu) = &state.task_menu {
        let labels: Vec<&str> = menu.tasks.iter().map(|t| t.label()).collect();
        let title = match &menu.suffix {
            Some(dn) => format!(" Tasks for {dn} "),
            None => " LDIF tasks ".to_string(),
        };
        draw_choices(f, screen, &title, &labels, menu.cursor, &state.theme);
    }
    if let Some(c) = &state.confirm {
        draw_confirm(f, screen, &c.prompt, &state.theme);
    }
    if let Some(ed) = &state.editor {
        draw_editor(f, screen, ed, &state.theme);
    }
}

fn draw_debug(f: &mut Frame, area: Rect, state: &AppState) {
    let b = Block::default()
        .borders(Borders::TOP)
        .border_style(state.theme.border_unfocused())
        .title(Span::styled(
            "Commands",
            state.theme.text_muted().add_modifier(Modifier::BOLD),
        ));
    let h = area.height.saturating_sub(1) as usize;
    let start = state.debug_log.len().saturating_sub(h);
    let lines: Vec<Line> = state
        .debug_log
        .iter()
        .skip(start)
        .map(|s| Line::raw(s.clone()))
        .collect();
    let p = Paragraph::new(lines)
        .style(state.theme.text_muted())
        .block(b)
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cli_runner::testing::StubExecutor;
    use ratatui::backend::TestBackend;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn editor_and_confirm_capture_keys_first() {
        let mut state = AppState::default();
        assert!(matches!(key_to_msg(&state, key(KeyCode::Char('s'))), Some(AppMsg::Save)));
        state.confirm = Some(Confirm {
            prompt: "Restart?".into(),
            action: crate::app::PendingAction::Restart,
        });
        assert!(matches!(
            key_to_msg(&state, key(KeyCode::Char('y'))),
            Some(AppMsg::Confirm(true))
        ));
        assert!(key_to_msg(&state, key(KeyCode::Char('s'))).is_none());
        state.editor = Some(FieldEditor::new(
            crate::widgets::editor::EditTarget::BackupName,
            "Backup name",
            "",
            false,
        ));
        assert!(matches!(
            key_to_msg(&state, key(KeyCode::Char('s'))),
            Some(AppMsg::EditorKey(_))
        ));
        assert!(matches!(key_to_msg(&state, key(KeyCode::Enter)), Some(AppMsg::CommitEdit)));
        assert!(!is_quit(&state, &key(KeyCode::Char('q'))));
    }

    #[test]
    fn debug_log_is_bounded() {
        let mut state = AppState::default();
        state.config.log_lines = 3;
        for i in 0..10 {
            state.dbg(format!("line {i}"));
        }
        assert_eq!(state.debug_log.len(), 3);
        assert_eq!(state.debug_log.front().map(String::as_str), Some("line 7"));
    }

    #[test]
    fn effects_log_commands_and_dispatch_jobs() {
        let stub = Arc::new(StubExecutor::default());
        let mut state = AppState::new(ConsoleConfig::default(), stub.clone());
        let effects = update(&mut state, AppMsg::Boot);
        run_effects(&mut state, effects);
        assert!(state.in_flight >= 4);
        assert!(state.debug_log.iter().any(|l| l.contains("backend get-tree")));
        assert!(state
            .last_command
            .as_deref()
            .is_some_and(|c| c.contains("ldapi://")));
    }

    #[test]
    fn link_password_stays_out_of_the_command_log() {
        use crate::panels::chaining::LinkCreate;
        use crate::panels::CreateDraft;

        let stub = Arc::new(StubExecutor::default());
        let mut state = AppState::new(ConsoleConfig::default(), stub.clone());
        let mut draft = CreateDraft::new(Box::new(LinkCreate {
            parent: "dc=example,dc=com".into(),
        }));
        for (name, value) in [
            ("link_name", "l1"),
            ("link_rdn", "ou=remote"),
            ("nsfarmserverurl", "ldap://remote.example.com:389"),
            ("nsmultiplexorbinddn", "cn=proxy,cn=config"),
            (crate::panels::chaining::PASSWORD, "S3cret!"),
            (crate::panels::chaining::PASSWORD_CONFIRM, "S3cret!"),
        ] {
            draft.set_text(name, value);
        }
        let (id, steps) = draft.submit().unwrap();
        run_effects(
            &mut state,
            vec![Effect::Run {
                key: crate::app::JobKey::CreateEntity(crate::app::EntityKind::Suffixes, id),
                steps,
            }],
        );
        let last = state.last_command.clone().unwrap_or_default();
        assert!(last.contains("--bind-pw=REDACTED"));
        assert!(!last.contains("S3cret!"));
        assert!(state.debug_log.iter().all(|l| !l.contains("S3cret!")));
    }

    #[test]
    fn toast_expires_after_its_ticks() {
        let mut state = AppState::default();
        run_effects(
            &mut state,
            vec![Effect::ShowToast {
                text: "Saved".into(),
                level: ToastLevel::Success,
                seconds: 1,
            }],
        );
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| ui(f, &mut state)).unwrap();
        assert!(state.toast.is_some());
        state.tick += 5;
        terminal.draw(|f| ui(f, &mut state)).unwrap();
        assert!(state.toast.is_none());
    }
}
