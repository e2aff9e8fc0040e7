use crate::coordinator::{Coordinator, EntityRow, Selection};
use crate::nav::flatten::{flatten_nav, select_key, NavTarget};
use crate::nav::keys::page_key;
use crate::panels::backups::{restart_instance, BackupAction};
use crate::panels::suffix::NodeKind;
use crate::panels::suffix_tasks::{SuffixTask, TaskForm, TASK_SUFFIX};
use crate::panels::{chaining, db_config, pwpolicy, sasl, suffix};
use crate::panels::{CreateDraft, CreateSpec, Notice, Panel, PanelSpec, SaveStart};
use crate::services::cli_runner::Invocation;
use crate::ui::{AppState, Focus, ToastLevel};
use crate::widgets::editor::{EditTarget, FieldEditor};
use crate::widgets::form::{field_at, field_count};
use crossterm::event::KeyEvent;
use serde_json::Value as JsonValue;

/// Row tag of database links in the suffix tree.
pub const DBLINK: &str = "dblink";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GlobalPanel {
    DbConfig,
    ChainingDefaults,
    GlobalPolicy,
    SaslSettings,
}

impl GlobalPanel {
    pub const ALL: [GlobalPanel; 4] = [
        GlobalPanel::DbConfig,
        GlobalPanel::ChainingDefaults,
        GlobalPanel::GlobalPolicy,
        GlobalPanel::SaslSettings,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GlobalPanel::DbConfig => "Global Configuration",
            GlobalPanel::ChainingDefaults => "Chaining Defaults",
            GlobalPanel::GlobalPolicy => "Global Policy",
            GlobalPanel::SaslSettings => "SASL Settings",
        }
    }

    fn panel(self) -> Panel {
        let spec: Box<dyn PanelSpec> = match self {
            GlobalPanel::DbConfig => Box::new(db_config::DbConfig),
            GlobalPanel::ChainingDefaults => Box::new(chaining::ChainingDefaults),
            GlobalPanel::GlobalPolicy => Box::new(pwpolicy::GlobalPolicy),
            GlobalPanel::SaslSettings => Box::new(sasl::SaslSettings),
        };
        Panel::new(spec)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Suffixes,
    LocalPolicies,
    SaslMappings,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Suffixes,
        EntityKind::LocalPolicies,
        EntityKind::SaslMappings,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Suffixes => "Suffixes",
            EntityKind::LocalPolicies => "Local Policies",
            EntityKind::SaslMappings => "SASL Mappings",
        }
    }

    fn list_plan(self) -> Vec<Invocation> {
        match self {
            EntityKind::Suffixes => suffix::load_tree(),
            EntityKind::LocalPolicies => pwpolicy::list_policies(),
            EntityKind::SaslMappings => sasl::list_mappings(),
        }
    }

    fn parse_list(self, outputs: &[JsonValue]) -> Vec<EntityRow> {
        let doc = outputs.first().cloned().unwrap_or(JsonValue::Null);
        match self {
            EntityKind::Suffixes => suffix::flatten_tree(&doc)
                .into_iter()
                .map(|n| {
                    let tag = match n.kind {
                        NodeKind::Suffix => "suffix",
                        NodeKind::SubSuffix => "subsuffix",
                        NodeKind::DbLink => DBLINK,
                    };
                    let mut row = EntityRow::new(n.id).tagged(tag).at_depth(n.depth);
                    row.label = n.label;
                    row
                })
                .collect(),
            EntityKind::LocalPolicies => pwpolicy::parse_policy_list(&doc)
                .into_iter()
                .map(|p| EntityRow::new(p.target).tagged(p.kind))
                .collect(),
            EntityKind::SaslMappings => sasl::parse_mapping_list(&doc)
                .into_iter()
                .map(EntityRow::new)
                .collect(),
        }
    }
}

/// Which page the right pane shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Page {
    Global(GlobalPanel),
    Backups,
    Entity(EntityKind, String),
}

/// Identifies a worker job so its outcome can be routed back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobKey {
    LoadGlobal(GlobalPanel),
    SaveGlobal(GlobalPanel),
    ListEntities(EntityKind),
    LoadEntity(EntityKind, String),
    SaveEntity(EntityKind, String),
    CreateEntity(EntityKind, String),
    DeleteEntity(EntityKind, String),
    Backups(BackupAction),
    Reindex(String),
    Task(SuffixTask, String),
    Restart,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingAction {
    Delete(EntityKind, String),
    DeleteBackup(String),
    RestoreBackup(String),
    Restart,
}

pub struct Confirm {
    pub prompt: String,
    pub action: PendingAction,
}

/// A create form, or a task form when `task` is set.
pub struct Draft {
    pub kind: EntityKind,
    pub form: CreateDraft,
    pub task: Option<SuffixTask>,
}

/// Task chooser; `suffix` is fixed when opened from a suffix page.
pub struct TaskMenu {
    pub suffix: Option<String>,
    pub tasks: Vec<SuffixTask>,
    pub cursor: usize,
}

/// The four singleton configuration panels, loaded on first open.
pub struct Globals {
    panels: Vec<Panel>,
}

impl Default for Globals {
    fn default() -> Self {
        Self {
            panels: GlobalPanel::ALL.iter().map(|g| g.panel()).collect(),
        }
    }
}

impl Globals {
    pub fn get(&self, g: GlobalPanel) -> &Panel {
        &self.panels[g as usize]
    }

    pub fn get_mut(&mut self, g: GlobalPanel) -> &mut Panel {
        &mut self.panels[g as usize]
    }
}

#[derive(Default)]
pub struct Entities {
    suffixes: Coordinator<Panel>,
    policies: Coordinator<Panel>,
    mappings: Coordinator<Panel>,
}

impl Entities {
    pub fn get(&self, kind: EntityKind) -> &Coordinator<Panel> {
        match kind {
            EntityKind::Suffixes => &self.suffixes,
            EntityKind::LocalPolicies => &self.policies,
            EntityKind::SaslMappings => &self.mappings,
        }
    }

    pub fn get_mut(&mut self, kind: EntityKind) -> &mut Coordinator<Panel> {
        match kind {
            EntityKind::Suffixes => &mut self.suffixes,
            EntityKind::LocalPolicies => &mut self.policies,
            EntityKind::SaslMappings => &mut self.mappings,
        }
    }

    pub fn tag(&self, kind: EntityKind, id: &str) -> String {
        self.get(kind)
            .entities()
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.tag.clone())
            .unwrap_or_default()
    }
}

fn entity_panel(kind: EntityKind, id: &str, tag: &str) -> Panel {
    let id = id.to_string();
    let spec: Box<dyn PanelSpec> = match kind {
        EntityKind::Suffixes if tag == DBLINK => Box::new(chaining::ChainingLink { suffix: id }),
        EntityKind::Suffixes => Box::new(suffix::Suffix { dn: id }),
        EntityKind::LocalPolicies => Box::new(pwpolicy::LocalPolicy { target: id }),
        EntityKind::SaslMappings => Box::new(sasl::SaslMapping { name: id }),
    };
    Panel::new(spec)
}

fn delete_plan(kind: EntityKind, id: &str, tag: &str) -> Vec<Invocation> {
    match kind {
        EntityKind::Suffixes if tag == DBLINK => chaining::delete_link(id),
        EntityKind::Suffixes => suffix::delete_suffix(id),
        EntityKind::LocalPolicies => pwpolicy::remove_policy(id),
        EntityKind::SaslMappings => sasl::delete_mapping(id),
    }
}

pub enum AppMsg {
    /// First frame: list every entity kind and open the database page.
    Boot,
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    SwitchFocus,
    Activate,
    Back,
    Save,
    Reload,
    Revert,
    Create,
    CreateLink,
    Delete,
    Reindex,
    Tasks,
    TaskCursor(isize),
    ChooseTask,
    CloseTasks,
    Restart,
    CopyLastCommand,
    TestRegex,
    EditorKey(KeyEvent),
    CommitEdit,
    CancelEdit,
    Confirm(bool),
    JobDone {
        key: JobKey,
        outcome: Result<Vec<JsonValue>, String>,
    },
}

pub enum Effect {
    Run {
        key: JobKey,
        steps: Vec<Invocation>,
    },
    ShowToast {
        text: String,
        level: ToastLevel,
        seconds: u64,
    },
    CopyToClipboard(String),
}

pub fn update(state: &mut AppState, msg: AppMsg) -> Vec<Effect> {
    let mut effects: Vec<Effect> = Vec::new();
    match msg {
        AppMsg::Boot => {
            for kind in EntityKind::ALL {
                refresh_list(state, kind, &mut effects);
            }
            open_page(state, Page::Global(GlobalPanel::DbConfig), &mut effects);
        }
        AppMsg::MoveUp => move_cursor(state, -1),
        AppMsg::MoveDown => move_cursor(state, 1),
        AppMsg::PageUp => {
            let page = state.menu_viewport_h.max(1) as isize;
            move_cursor(state, -page)
        }
        AppMsg::PageDown => {
            let page = state.menu_viewport_h.max(1) as isize;
            move_cursor(state, page)
        }
        AppMsg::SwitchFocus => {
            state.focus = match state.focus {
                Focus::Tree if state.open.is_some() || state.draft.is_some() => Focus::Form,
                _ => Focus::Tree,
            };
        }
        AppMsg::Activate => activate(state, &mut effects),
        AppMsg::Back => {
            if state.draft.take().is_some() {
                state.field_cursor = 0;
            } else {
                state.focus = Focus::Tree;
            }
        }
        AppMsg::Save => save(state, &mut effects),
        AppMsg::Reload => reload(state, &mut effects),
        AppMsg::Revert => {
            if let Some(p) = state.open_panel_mut() {
                p.revert();
            }
        }
        AppMsg::Create => create(state, false, &mut effects),
        AppMsg::CreateLink => create(state, true, &mut effects),
        AppMsg::Delete => request_delete(state, &mut effects),
        AppMsg::Reindex => match &state.open {
            Some(Page::Entity(EntityKind::Suffixes, dn))
                if state.entities.tag(EntityKind::Suffixes, dn) != DBLINK =>
            {
                effects.push(Effect::Run {
                    key: JobKey::Reindex(dn.clone()),
                    steps: suffix::reindex_suffix(dn),
                });
            }
            _ => info(&mut effects, "Open a suffix to reindex it"),
        },
        AppMsg::Tasks => open_tasks(state, &mut effects),
        AppMsg::TaskCursor(delta) => {
            if let Some(menu) = state.task_menu.as_mut() {
                menu.cursor = step(menu.cursor, delta, menu.tasks.len());
            }
        }
        AppMsg::ChooseTask => choose_task(state, &mut effects),
        AppMsg::CloseTasks => state.task_menu = None,
        AppMsg::Restart => {
            state.confirm = Some(Confirm {
                prompt: "Restart the Directory Server instance?".into(),
                action: PendingAction::Restart,
            });
        }
        AppMsg::CopyLastCommand => match &state.last_command {
            Some(cmd) => effects.push(Effect::CopyToClipboard(cmd.clone())),
            None => info(&mut effects, "No command has been run yet"),
        },
        AppMsg::TestRegex => {
            if mapping_regex(state).is_some() {
                state.editor = Some(FieldEditor::new(
                    EditTarget::RegexSample,
                    "Test string",
                    "",
                    false,
                ));
            } else {
                info(&mut effects, "Open a SASL mapping to test its regular expression");
            }
        }
        AppMsg::EditorKey(key) => {
            if let Some(ed) = state.editor.as_mut() {
                ed.input(key);
            }
        }
        AppMsg::CommitEdit => commit_edit(state, &mut effects),
        AppMsg::CancelEdit => state.editor = None,
        AppMsg::Confirm(yes) => {
            if let Some(c) = state.confirm.take() {
                if yes {
                    run_confirmed(state, c.action, &mut effects);
                }
            }
        }
        AppMsg::JobDone { key, outcome } => job_done(state, key, outcome, &mut effects),
    }
    effects
}

fn notify(effects: &mut Vec<Effect>, n: Notice) {
    let seconds = match n.level {
        ToastLevel::Error | ToastLevel::Warning => 8,
        ToastLevel::Success | ToastLevel::Info => 4,
    };
    effects.push(Effect::ShowToast {
        text: n.text,
        level: n.level,
        seconds,
    });
}

fn info(effects: &mut Vec<Effect>, text: impl Into<String>) {
    notify(effects, Notice::new(ToastLevel::Info, text));
}

fn error(effects: &mut Vec<Effect>, text: impl Into<String>) {
    notify(effects, Notice::new(ToastLevel::Error, text));
}

fn busy(effects: &mut Vec<Effect>) {
    info(effects, "Another operation is in progress");
}

/// Tree row under the cursor, or the open page when the form has focus.
fn context(state: &AppState) -> Option<NavTarget> {
    match state.focus {
        Focus::Tree => flatten_nav(state)
            .into_iter()
            .nth(state.selected)
            .map(|r| r.target),
        Focus::Form => state.open.clone().map(NavTarget::Page),
    }
}

fn move_cursor(state: &mut AppState, delta: isize) {
    if state.focus == Focus::Form {
        if state.open == Some(Page::Backups) && state.draft.is_none() {
            state.backups.move_selection(delta);
            return;
        }
        let total = match (&state.draft, state.open_panel()) {
            (Some(d), _) => field_count(d.form.sections()),
            (None, Some(p)) => field_count(p.sections()),
            (None, None) => 0,
        };
        state.field_cursor = step(state.field_cursor, delta, total);
        return;
    }
    let total = flatten_nav(state).len();
    state.selected = step(state.selected, delta, total);
    keep_selected_visible(state);
}

fn step(cur: usize, delta: isize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    (cur as isize + delta).clamp(0, total as isize - 1) as usize
}

fn keep_selected_visible(state: &mut AppState) {
    let h = state.menu_viewport_h as usize;
    if h == 0 {
        return;
    }
    if state.selected < state.menu_offset {
        state.menu_offset = state.selected;
    } else if state.selected >= state.menu_offset + h {
        state.menu_offset = state.selected + 1 - h;
    }
}

fn activate(state: &mut AppState, effects: &mut Vec<Effect>) {
    if state.focus == Focus::Form {
        if state.open == Some(Page::Backups) && state.draft.is_none() {
            if let Some(row) = state.backups.selected_backup() {
                state.confirm = Some(Confirm {
                    prompt: format!("Restore backup {}? The instance data will be replaced.", row.name),
                    action: PendingAction::RestoreBackup(row.name.clone()),
                });
            }
            return;
        }
        edit_field(state, effects);
        return;
    }
    match context(state) {
        Some(NavTarget::Group(kind)) => refresh_list(state, kind, effects),
        Some(NavTarget::Page(page)) => open_page(state, page, effects),
        Some(NavTarget::Header(_)) | None => {}
    }
}

fn open_page(state: &mut AppState, page: Page, effects: &mut Vec<Effect>) {
    match &page {
        Page::Global(g) => {
            let panel = state.globals.get_mut(*g);
            if panel.phase == crate::panels::Phase::Uninitialized {
                if let Some(steps) = panel.begin_load() {
                    effects.push(Effect::Run {
                        key: JobKey::LoadGlobal(*g),
                        steps,
                    });
                }
            }
        }
        Page::Backups => refresh_backups(state, effects),
        Page::Entity(kind, id) => {
            let tag = state.entities.tag(*kind, id);
            match state.entities.get_mut(*kind).select(id) {
                Selection::Cached => {}
                Selection::NeedsLoad => {
                    let mut panel = entity_panel(*kind, id, &tag);
                    if let Some(steps) = panel.begin_load() {
                        effects.push(Effect::Run {
                            key: JobKey::LoadEntity(*kind, id.clone()),
                            steps,
                        });
                    }
                }
                Selection::Busy => return busy(effects),
                Selection::Unknown => return,
            }
        }
    }
    state.draft = None;
    state.field_cursor = 0;
    state.open = Some(page);
}

fn refresh_list(state: &mut AppState, kind: EntityKind, effects: &mut Vec<Effect>) {
    if state.entities.get_mut(kind).begin_list() {
        effects.push(Effect::Run {
            key: JobKey::ListEntities(kind),
            steps: kind.list_plan(),
        });
    } else {
        busy(effects);
    }
}

fn refresh_backups(state: &mut AppState, effects: &mut Vec<Effect>) {
    if state.backups.begin() {
        effects.push(Effect::Run {
            key: JobKey::Backups(BackupAction::Refresh),
            steps: state.backups.refresh_plan(),
        });
    }
}

fn edit_field(state: &mut AppState, effects: &mut Vec<Effect>) {
    let cursor = state.field_cursor;
    if let Some(draft) = state.draft.as_mut() {
        let Some(spec) = field_at(draft.form.sections(), cursor) else {
            return;
        };
        if spec.kind == crate::attrs::diff::AttrKind::Bool {
            draft.form.toggle(spec.name);
        } else if spec.editable() {
            state.editor = Some(FieldEditor::for_field(spec, draft.form.values.get(spec.name)));
        }
        return;
    }
    let editor = {
        let Some(panel) = state.open_panel_mut() else {
            return;
        };
        let Some(spec) = field_at(panel.sections(), cursor) else {
            return;
        };
        if !spec.editable() {
            return;
        }
        if panel.is_busy() {
            return busy(effects);
        }
        if let Some(why) = panel.locked(spec.name) {
            return info(effects, why);
        }
        if spec.kind == crate::attrs::diff::AttrKind::Bool {
            panel.toggle(spec.name);
            return;
        }
        FieldEditor::for_field(spec, panel.current.get(spec.name))
    };
    state.editor = Some(editor);
}

fn commit_edit(state: &mut AppState, effects: &mut Vec<Effect>) {
    let Some(editor) = state.editor.take() else {
        return;
    };
    let text = editor.text();
    match editor.target {
        EditTarget::Field(name) => {
            if let Some(draft) = state.draft.as_mut() {
                draft.form.set_text(name, &text);
            } else if let Some(panel) = state.open_panel_mut() {
                if !panel.set_text(name, &text) {
                    busy(effects);
                }
            }
        }
        EditTarget::BackupName => match state.backups.create_plan(&text) {
            Err(m) => error(effects, m),
            Ok(steps) => {
                if state.backups.begin() {
                    effects.push(Effect::Run {
                        key: JobKey::Backups(BackupAction::Create),
                        steps,
                    });
                } else {
                    busy(effects);
                }
            }
        },
        EditTarget::RegexSample => {
            let Some(pattern) = mapping_regex(state) else {
                return;
            };
            match sasl::regex_test(&pattern, &text) {
                Ok(true) => notify(
                    effects,
                    Notice::new(ToastLevel::Success, "The test string matches the regular expression"),
                ),
                Ok(false) => notify(
                    effects,
                    Notice::new(ToastLevel::Warning, "The test string does not match the regular expression"),
                ),
                Err(m) => error(effects, m),
            }
        }
    }
}

/// Regex of the mapping being created or shown.
fn mapping_regex(state: &AppState) -> Option<String> {
    if let Some(d) = &state.draft {
        return (d.kind == EntityKind::SaslMappings).then(|| d.form.values.text(sasl::MAP_REGEX));
    }
    match &state.open {
        Some(Page::Entity(EntityKind::SaslMappings, _)) => state
            .open_panel()
            .map(|p| p.current.text(sasl::MAP_REGEX)),
        _ => None,
    }
}

fn save(state: &mut AppState, effects: &mut Vec<Effect>) {
    if state.draft.is_some() {
        return submit_draft(state, effects);
    }
    let key = match state.open.clone() {
        Some(Page::Global(g)) => JobKey::SaveGlobal(g),
        Some(Page::Entity(kind, id)) => JobKey::SaveEntity(kind, id),
        Some(Page::Backups) | None => return,
    };
    let Some(panel) = state.open_panel_mut() else {
        return;
    };
    match panel.begin_save() {
        SaveStart::Busy => busy(effects),
        SaveStart::Clean => info(effects, "No changes to save"),
        SaveStart::Unsent => info(
            effects,
            "None of these edits are written on their own; press u to undo them",
        ),
        SaveStart::Invalid(errors) => error(
            effects,
            format!("{} field(s) need attention before saving", errors.len()),
        ),
        SaveStart::Run(steps) => effects.push(Effect::Run { key, steps }),
    }
}

fn submit_draft(state: &mut AppState, effects: &mut Vec<Effect>) {
    let Some(draft) = state.draft.as_mut() else {
        return;
    };
    let kind = draft.kind;
    if draft.form.submitting || state.entities.get(kind).disable_tree() {
        return busy(effects);
    }
    match draft.form.submit() {
        Err(errors) => error(
            effects,
            format!("{} field(s) need attention before creating", errors.len()),
        ),
        Ok((id, steps)) => {
            let coord = state.entities.get_mut(kind);
            let key = match draft.task {
                None => {
                    coord.begin_create(&id);
                    JobKey::CreateEntity(kind, id)
                }
                Some(task) => {
                    if !coord.is_listed(&id) {
                        draft.form.submitting = false;
                        return error(effects, format!("{id} is not a suffix of this instance"));
                    }
                    if !coord.begin_task(&id) {
                        draft.form.submitting = false;
                        return busy(effects);
                    }
                    JobKey::Task(task, id)
                }
            };
            effects.push(Effect::Run { key, steps });
        }
    }
}

fn open_tasks(state: &mut AppState, effects: &mut Vec<Effect>) {
    let menu = match state.open.clone() {
        Some(Page::Entity(EntityKind::Suffixes, dn))
            if state.entities.tag(EntityKind::Suffixes, &dn) != DBLINK =>
        {
            TaskMenu {
                suffix: Some(dn),
                tasks: SuffixTask::ALL.to_vec(),
                cursor: 0,
            }
        }
        Some(Page::Backups) => TaskMenu {
            suffix: None,
            tasks: SuffixTask::LDIF.to_vec(),
            cursor: 0,
        },
        _ => return info(effects, "Open a suffix or the backups page to run a task"),
    };
    state.task_menu = Some(menu);
}

fn choose_task(state: &mut AppState, effects: &mut Vec<Effect>) {
    let Some(menu) = state.task_menu.take() else {
        return;
    };
    let Some(task) = menu.tasks.get(menu.cursor).copied() else {
        return;
    };
    let coord = state.entities.get(EntityKind::Suffixes);
    if coord.disable_tree() {
        return busy(effects);
    }
    let form = match menu.suffix {
        Some(dn) => CreateDraft::new(Box::new(TaskForm::on(task, dn))),
        None => {
            let mut form = CreateDraft::new(Box::new(TaskForm::any_suffix(task)));
            if let Some(root) = coord.entities().iter().find(|e| e.tag != DBLINK) {
                form.set_text(TASK_SUFFIX, &root.id);
            }
            form
        }
    };
    state.draft = Some(Draft {
        kind: EntityKind::Suffixes,
        form,
        task: Some(task),
    });
    state.field_cursor = 0;
    state.focus = Focus::Form;
}

fn reload(state: &mut AppState, effects: &mut Vec<Effect>) {
    if state.focus == Focus::Tree {
        if let Some(NavTarget::Group(kind)) = context(state) {
            return refresh_list(state, kind, effects);
        }
    }
    match state.open.clone() {
        Some(Page::Global(g)) => match state.globals.get_mut(g).begin_load() {
            Some(steps) => effects.push(Effect::Run {
                key: JobKey::LoadGlobal(g),
                steps,
            }),
            None => busy(effects),
        },
        Some(Page::Entity(kind, id)) => {
            if !state.entities.get(kind).is_cached(&id) {
                return open_page(state, Page::Entity(kind, id), effects);
            }
            if !reload_entity(state, kind, &id, effects) {
                busy(effects);
            }
        }
        Some(Page::Backups) => refresh_backups(state, effects),
        None => {}
    }
}

/// Re-read a cached entity; false while anything else is outstanding.
fn reload_entity(state: &mut AppState, kind: EntityKind, id: &str, effects: &mut Vec<Effect>) -> bool {
    let coord = state.entities.get_mut(kind);
    if !coord.begin_reload(id) {
        return false;
    }
    match coord.get_mut(id).and_then(Panel::begin_load) {
        Some(steps) => effects.push(Effect::Run {
            key: JobKey::LoadEntity(kind, id.to_string()),
            steps,
        }),
        None => coord.settle_load(id),
    }
    true
}

fn create(state: &mut AppState, link: bool, effects: &mut Vec<Effect>) {
    let ctx = context(state);
    let (kind, spec): (EntityKind, Box<dyn CreateSpec>) = match ctx {
        Some(NavTarget::Group(EntityKind::Suffixes)) if !link => {
            (EntityKind::Suffixes, Box::new(suffix::SuffixCreate { parent: None }))
        }
        Some(NavTarget::Page(Page::Entity(EntityKind::Suffixes, id)))
            if state.entities.tag(EntityKind::Suffixes, &id) != DBLINK =>
        {
            if link {
                (EntityKind::Suffixes, Box::new(chaining::LinkCreate { parent: id }))
            } else {
                (EntityKind::Suffixes, Box::new(suffix::SuffixCreate { parent: Some(id) }))
            }
        }
        Some(NavTarget::Group(EntityKind::LocalPolicies))
        | Some(NavTarget::Page(Page::Entity(EntityKind::LocalPolicies, _)))
            if !link =>
        {
            (EntityKind::LocalPolicies, Box::new(pwpolicy::PolicyCreate))
        }
        Some(NavTarget::Group(EntityKind::SaslMappings))
        | Some(NavTarget::Page(Page::Entity(EntityKind::SaslMappings, _)))
            if !link =>
        {
            (EntityKind::SaslMappings, Box::new(sasl::MappingCreate))
        }
        Some(NavTarget::Page(Page::Backups)) if !link => {
            state.editor = Some(FieldEditor::new(EditTarget::BackupName, "Backup name", "", false));
            return;
        }
        _ if link => return info(effects, "Select a suffix to add a database link below it"),
        _ => return info(effects, "Nothing can be created here"),
    };
    if state.entities.get(kind).disable_tree() {
        return busy(effects);
    }
    state.draft = Some(Draft {
        kind,
        form: CreateDraft::new(spec),
        task: None,
    });
    state.field_cursor = 0;
    state.focus = Focus::Form;
}

fn request_delete(state: &mut AppState, effects: &mut Vec<Effect>) {
    match context(state) {
        Some(NavTarget::Page(Page::Entity(kind, id))) => {
            state.confirm = Some(Confirm {
                prompt: format!("Delete {id}? This cannot be undone."),
                action: PendingAction::Delete(kind, id),
            });
        }
        Some(NavTarget::Page(Page::Backups)) => match state.backups.selected_backup() {
            Some(row) => {
                state.confirm = Some(Confirm {
                    prompt: format!("Delete backup {}?", row.name),
                    action: PendingAction::DeleteBackup(row.name.clone()),
                });
            }
            None => info(effects, "No backup selected"),
        },
        _ => info(effects, "Nothing can be deleted here"),
    }
}

fn run_confirmed(state: &mut AppState, action: PendingAction, effects: &mut Vec<Effect>) {
    match action {
        PendingAction::Delete(kind, id) => {
            let tag = state.entities.tag(kind, &id);
            if state.entities.get_mut(kind).begin_delete(&id) {
                effects.push(Effect::Run {
                    steps: delete_plan(kind, &id, &tag),
                    key: JobKey::DeleteEntity(kind, id),
                });
            } else {
                busy(effects);
            }
        }
        PendingAction::DeleteBackup(name) => {
            if state.backups.begin() {
                effects.push(Effect::Run {
                    key: JobKey::Backups(BackupAction::Delete),
                    steps: state.backups.delete_plan(&name),
                });
            } else {
                busy(effects);
            }
        }
        PendingAction::RestoreBackup(name) => {
            if state.backups.begin() {
                effects.push(Effect::Run {
                    key: JobKey::Backups(BackupAction::Restore),
                    steps: state.backups.restore_plan(&name),
                });
            } else {
                busy(effects);
            }
        }
        PendingAction::Restart => effects.push(Effect::Run {
            key: JobKey::Restart,
            steps: restart_instance(),
        }),
    }
}

fn job_done(
    state: &mut AppState,
    key: JobKey,
    outcome: Result<Vec<JsonValue>, String>,
    effects: &mut Vec<Effect>,
) {
    if let Err(desc) = &outcome {
        state.last_error = Some(desc.clone());
    }
    match key {
        JobKey::LoadGlobal(g) => {
            if let Some(n) = state.globals.get_mut(g).finish_load(outcome) {
                notify(effects, n);
            }
        }
        JobKey::SaveGlobal(g) => {
            let (notices, steps) = state.globals.get_mut(g).finish_save(outcome.map(|_| ()));
            saved(state, notices, effects);
            effects.push(Effect::Run {
                key: JobKey::LoadGlobal(g),
                steps,
            });
        }
        JobKey::ListEntities(kind) => entities_listed(state, kind, outcome, effects),
        JobKey::LoadEntity(kind, id) => entity_loaded(state, kind, &id, outcome, effects),
        JobKey::SaveEntity(kind, id) => {
            let succeeded = outcome.is_ok();
            let coord = state.entities.get_mut(kind);
            let Some(panel) = coord.get_mut(&id) else {
                tracing::debug!(?kind, %id, "save finished for an evicted entity");
                return;
            };
            let (notices, steps) = panel.finish_save(outcome.map(|_| ()));
            let renamed = panel.saved_identity().filter(|n| succeeded && *n != id);
            let reload_id = match renamed {
                Some(new_id) => {
                    coord.rename(&id, &new_id);
                    if state.open == Some(Page::Entity(kind, id.clone())) {
                        state.open = Some(Page::Entity(kind, new_id.clone()));
                    }
                    select_key(state, &page_key(&Page::Entity(kind, new_id.clone())));
                    new_id
                }
                None => id,
            };
            saved(state, notices, effects);
            effects.push(Effect::Run {
                key: JobKey::LoadEntity(kind, reload_id),
                steps,
            });
        }
        JobKey::CreateEntity(kind, id) => {
            state.entities.get_mut(kind).finish_create(outcome.is_ok());
            match outcome {
                Ok(_) => {
                    notify(
                        effects,
                        Notice::new(ToastLevel::Success, format!("Successfully created {id}")),
                    );
                    state.draft = None;
                    state.field_cursor = 0;
                    refresh_list(state, kind, effects);
                }
                Err(desc) => {
                    if let Some(d) = state.draft.as_mut() {
                        d.form.submitting = false;
                    }
                    error(effects, format!("Failed to create {id} - {desc}"));
                }
            }
        }
        JobKey::DeleteEntity(kind, id) => {
            state.entities.get_mut(kind).finish_delete(outcome.is_ok());
            match outcome {
                Ok(_) => {
                    notify(
                        effects,
                        Notice::new(ToastLevel::Success, format!("Successfully deleted {id}")),
                    );
                    if state.open == Some(Page::Entity(kind, id)) {
                        state.open = None;
                        state.focus = Focus::Tree;
                    }
                    refresh_list(state, kind, effects);
                }
                Err(desc) => error(effects, format!("Failed to delete {id} - {desc}")),
            }
        }
        JobKey::Reindex(dn) => match outcome {
            Ok(_) => notify(
                effects,
                Notice::new(ToastLevel::Success, format!("Reindexed {dn}")),
            ),
            Err(desc) => error(effects, format!("Failed to reindex {dn} - {desc}")),
        },
        JobKey::Task(task, dn) => task_done(state, task, &dn, outcome, effects),
        JobKey::Backups(action) => backups_done(state, action, outcome, effects),
        JobKey::Restart => match outcome {
            Ok(_) => {
                state.restart_suggested = false;
                notify(
                    effects,
                    Notice::new(ToastLevel::Success, "Directory Server restarted"),
                );
            }
            Err(desc) => error(effects, format!("Failed to restart the instance - {desc}")),
        },
    }
}

fn backups_done(
    state: &mut AppState,
    action: BackupAction,
    outcome: Result<Vec<JsonValue>, String>,
    effects: &mut Vec<Effect>,
) {
    let verb = match action {
        BackupAction::Refresh => {
            state.backups.finish_refresh(outcome);
            if let Some(desc) = &state.backups.last_error {
                error(effects, format!("Error loading backups - {desc}"));
            }
            return;
        }
        BackupAction::Create => "create",
        BackupAction::Restore => "restore",
        BackupAction::Delete => "delete",
    };
    match state.backups.finish_action(outcome.map(|_| ())) {
        Ok(()) => {
            notify(
                effects,
                Notice::new(ToastLevel::Success, format!("Backup {verb} finished")),
            );
            refresh_backups(state, effects);
        }
        Err(desc) => error(effects, format!("Failed to {verb} backup - {desc}")),
    }
}

fn task_done(
    state: &mut AppState,
    task: SuffixTask,
    dn: &str,
    outcome: Result<Vec<JsonValue>, String>,
    effects: &mut Vec<Effect>,
) {
    state.entities.get_mut(EntityKind::Suffixes).finish_task();
    if let Err(desc) = outcome {
        if let Some(d) = state.draft.as_mut() {
            d.form.submitting = false;
        }
        return error(effects, format!("{} failed for {dn} - {desc}", task.label()));
    }
    notify(
        effects,
        Notice::new(ToastLevel::Success, format!("{} finished for {dn}", task.label())),
    );
    if state.draft.as_ref().is_some_and(|d| d.task == Some(task)) {
        state.draft = None;
        state.field_cursor = 0;
    }
    if task.changes_suffix() && state.entities.get(EntityKind::Suffixes).is_cached(dn) {
        reload_entity(state, EntityKind::Suffixes, dn, effects);
    }
    if task.changes_ldifs() {
        refresh_backups(state, effects);
    }
}

fn saved(state: &mut AppState, notices: Vec<Notice>, effects: &mut Vec<Effect>) {
    if notices.iter().any(|n| n.level == ToastLevel::Warning) {
        state.restart_suggested = true;
    }
    for n in notices {
        notify(effects, n);
    }
}

fn entities_listed(
    state: &mut AppState,
    kind: EntityKind,
    outcome: Result<Vec<JsonValue>, String>,
    effects: &mut Vec<Effect>,
) {
    let cursor_key = flatten_nav(state)
        .into_iter()
        .nth(state.selected)
        .map(|r| crate::nav::keys::node_key(&r.target));
    match outcome {
        Ok(outputs) => {
            let rows = kind.parse_list(&outputs);
            let next = state.entities.get_mut(kind).set_entities(rows);
            if let Some(Page::Entity(k, id)) = &state.open {
                if *k == kind && state.entities.get(kind).selected() != Some(id.as_str()) {
                    state.open = None;
                }
            }
            if let Some(id) = next {
                let page = Page::Entity(kind, id);
                select_key(state, &page_key(&page));
                open_page(state, page, effects);
                return;
            }
        }
        Err(desc) => {
            state.entities.get_mut(kind).list_failed(&desc);
            error(effects, format!("Error loading {} - {desc}", kind.label()));
        }
    }
    if let Some(k) = cursor_key {
        select_key(state, &k);
    }
}

fn entity_loaded(
    state: &mut AppState,
    kind: EntityKind,
    id: &str,
    outcome: Result<Vec<JsonValue>, String>,
    effects: &mut Vec<Effect>,
) {
    let tag = state.entities.tag(kind, id);
    let coord = state.entities.get_mut(kind);
    if !coord.is_listed(id) {
        coord.settle_load(id);
        tracing::debug!(?kind, %id, "dropping load result for an entity no longer listed");
        return;
    }
    if coord.is_cached(id) {
        coord.settle_load(id);
    }
    if let Some(panel) = coord.get_mut(id) {
        if let Some(n) = panel.finish_load(outcome) {
            notify(effects, n);
        }
        return;
    }
    let mut panel = entity_panel(kind, id, &tag);
    panel.begin_load();
    match panel.finish_load(outcome) {
        None => coord.finish_load(id, panel),
        Some(n) => {
            coord.load_failed(id, panel.last_error.as_deref().unwrap_or_default());
            notify(effects, n);
        }
    }
}

#[cfg(test)]
mod tests;
