use super::*;
use crate::ui::AppState;
use serde_json::json;

fn runs(effects: &[Effect]) -> Vec<JobKey> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Run { key, .. } => Some(key.clone()),
            _ => None,
        })
        .collect()
}

fn steps_for<'a>(effects: &'a [Effect], wanted: &JobKey) -> Option<&'a Vec<Invocation>> {
    effects.iter().find_map(|e| match e {
        Effect::Run { key, steps } if key == wanted => Some(steps),
        _ => None,
    })
}

fn toasts(effects: &[Effect]) -> Vec<(ToastLevel, String)> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::ShowToast { text, level, .. } => Some((*level, text.clone())),
            _ => None,
        })
        .collect()
}

fn mapping_doc(name: &str) -> JsonValue {
    json!({"dn": format!("cn={name},cn=mapping,cn=sasl,cn=config"), "attrs": {
        "cn": [name],
        "nssaslmapregexstring": ["\\(.*\\)@example.com"],
        "nssaslmapbasedntemplate": ["ou=people,dc=example,dc=com"],
        "nssaslmapfiltertemplate": ["(uid=\\1)"],
        "nssaslmappriority": ["50"],
    }})
}

fn done(state: &mut AppState, key: JobKey, outcome: Result<Vec<JsonValue>, String>) -> Vec<Effect> {
    update(state, AppMsg::JobDone { key, outcome })
}

fn with_mappings(names: &[&str]) -> AppState {
    let mut state = AppState::default();
    let items: Vec<JsonValue> = names.iter().map(|n| mapping_doc(n)).collect();
    assert!(state.entities.get_mut(EntityKind::SaslMappings).begin_list());
    done(
        &mut state,
        JobKey::ListEntities(EntityKind::SaslMappings),
        Ok(vec![json!({"type": "list", "items": items})]),
    );
    state
}

fn open_mapping(state: &mut AppState, name: &str) -> Vec<Effect> {
    let page = Page::Entity(EntityKind::SaslMappings, name.to_string());
    assert!(select_key(state, &page_key(&page)));
    state.focus = Focus::Tree;
    update(state, AppMsg::Activate)
}

fn load_mapping(state: &mut AppState, name: &str) {
    let effects = open_mapping(state, name);
    let key = JobKey::LoadEntity(EntityKind::SaslMappings, name.to_string());
    assert_eq!(runs(&effects), vec![key.clone()]);
    done(state, key, Ok(vec![mapping_doc(name)]));
}

#[test]
fn boot_lists_every_kind_and_opens_database_config() {
    let mut state = AppState::default();
    let effects = update(&mut state, AppMsg::Boot);
    let keys = runs(&effects);
    for kind in EntityKind::ALL {
        assert!(keys.contains(&JobKey::ListEntities(kind)));
    }
    assert!(keys.contains(&JobKey::LoadGlobal(GlobalPanel::DbConfig)));
    assert_eq!(state.open, Some(Page::Global(GlobalPanel::DbConfig)));
    assert!(state.globals.get(GlobalPanel::DbConfig).is_busy());
}

#[test]
fn revisiting_a_loaded_entity_uses_the_cache() {
    let mut state = with_mappings(&["a", "b"]);
    load_mapping(&mut state, "a");
    load_mapping(&mut state, "b");
    let effects = open_mapping(&mut state, "a");
    assert!(runs(&effects).is_empty());
    assert_eq!(
        state.open,
        Some(Page::Entity(EntityKind::SaslMappings, "a".into()))
    );
    let panel = state.open_panel().unwrap();
    assert!(panel.is_loaded());
    assert_eq!(panel.current.text(sasl::MAP_PRIORITY), "50");
}

#[test]
fn selection_is_refused_while_an_entity_loads() {
    let mut state = with_mappings(&["a", "b"]);
    let effects = open_mapping(&mut state, "a");
    assert_eq!(runs(&effects).len(), 1);
    let effects = open_mapping(&mut state, "b");
    assert!(runs(&effects).is_empty());
    assert!(toasts(&effects)
        .iter()
        .any(|(_, t)| t.contains("in progress")));
    assert_eq!(
        state.open,
        Some(Page::Entity(EntityKind::SaslMappings, "a".into()))
    );
}

#[test]
fn failed_load_is_not_cached_and_can_be_retried() {
    let mut state = with_mappings(&["a"]);
    open_mapping(&mut state, "a");
    let effects = done(
        &mut state,
        JobKey::LoadEntity(EntityKind::SaslMappings, "a".into()),
        Err("No such object".into()),
    );
    assert!(toasts(&effects)
        .iter()
        .any(|(l, t)| *l == ToastLevel::Error && t.contains("No such object")));
    let coord = state.entities.get(EntityKind::SaslMappings);
    assert!(!coord.is_cached("a"));
    assert!(!coord.disable_tree());
    assert_eq!(state.last_error.as_deref(), Some("No such object"));
    let effects = open_mapping(&mut state, "a");
    assert_eq!(runs(&effects).len(), 1);
}

#[test]
fn renaming_a_mapping_rekeys_it_and_reloads_under_the_new_name() {
    let mut state = with_mappings(&["a"]);
    load_mapping(&mut state, "a");
    state.focus = Focus::Form;
    assert!(state.open_panel_mut().unwrap().set_text(sasl::MAP_NAME, "renamed"));
    let effects = update(&mut state, AppMsg::Save);
    let save_key = JobKey::SaveEntity(EntityKind::SaslMappings, "a".into());
    let steps = steps_for(&effects, &save_key).unwrap();
    assert_eq!(steps[0].args, vec!["sasl", "delete", "a"]);
    assert!(steps[1].has_arg("--cn=renamed"));

    let effects = done(&mut state, save_key, Ok(vec![JsonValue::Null, JsonValue::Null]));
    let reload = JobKey::LoadEntity(EntityKind::SaslMappings, "renamed".into());
    assert!(runs(&effects).contains(&reload));
    assert!(toasts(&effects)
        .iter()
        .any(|(l, _)| *l == ToastLevel::Success));
    assert_eq!(
        state.open,
        Some(Page::Entity(EntityKind::SaslMappings, "renamed".into()))
    );
    let coord = state.entities.get(EntityKind::SaslMappings);
    assert!(coord.is_cached("renamed"));
    assert!(!coord.is_cached("a"));

    done(&mut state, reload, Ok(vec![mapping_doc("renamed")]));
    let panel = state.open_panel().unwrap();
    assert!(panel.is_loaded());
    assert!(!panel.dirty);
}

#[test]
fn saving_without_changes_runs_nothing() {
    let mut state = with_mappings(&["a"]);
    load_mapping(&mut state, "a");
    let effects = update(&mut state, AppMsg::Save);
    assert!(runs(&effects).is_empty());
    assert!(toasts(&effects)
        .iter()
        .any(|(_, t)| t == "No changes to save"));
}

#[test]
fn created_entity_is_selected_after_the_list_refresh() {
    let mut state = with_mappings(&["a"]);
    assert!(select_key(&mut state, "group:sasl"));
    update(&mut state, AppMsg::Create);
    assert_eq!(state.focus, Focus::Form);
    let draft = state.draft.as_mut().unwrap();
    assert_eq!(draft.kind, EntityKind::SaslMappings);
    draft.form.set_text(sasl::MAP_NAME, "krb");
    draft.form.set_text(sasl::MAP_REGEX, "\\(.*\\)@EXAMPLE.COM");
    draft.form.set_text(sasl::MAP_BASE, "dc=example,dc=com");
    draft.form.set_text(sasl::MAP_FILTER, "(uid=\\1)");

    let effects = update(&mut state, AppMsg::Save);
    let create = JobKey::CreateEntity(EntityKind::SaslMappings, "krb".into());
    assert_eq!(runs(&effects), vec![create.clone()]);
    assert!(state.entities.get(EntityKind::SaslMappings).disable_tree());

    let effects = done(&mut state, create, Ok(vec![JsonValue::Null]));
    assert!(state.draft.is_none());
    assert!(toasts(&effects)
        .iter()
        .any(|(_, t)| t == "Successfully created krb"));
    let list = JobKey::ListEntities(EntityKind::SaslMappings);
    assert_eq!(runs(&effects), vec![list.clone()]);

    let effects = done(
        &mut state,
        list,
        Ok(vec![json!({"items": [mapping_doc("a"), mapping_doc("krb")]})]),
    );
    assert_eq!(
        runs(&effects),
        vec![JobKey::LoadEntity(EntityKind::SaslMappings, "krb".into())]
    );
    assert_eq!(
        state.open,
        Some(Page::Entity(EntityKind::SaslMappings, "krb".into()))
    );
    let rows = flatten_nav(&state);
    assert_eq!(
        crate::nav::keys::node_key(&rows[state.selected].target),
        "sasl/krb"
    );
}

#[test]
fn invalid_draft_is_not_submitted() {
    let mut state = with_mappings(&[]);
    assert!(select_key(&mut state, "group:sasl"));
    update(&mut state, AppMsg::Create);
    let effects = update(&mut state, AppMsg::Save);
    assert!(runs(&effects).is_empty());
    let draft = state.draft.as_ref().unwrap();
    assert!(!draft.form.submitting);
    assert!(draft.form.field_error(sasl::MAP_NAME).is_some());
    update(&mut state, AppMsg::Back);
    assert!(state.draft.is_none());
}

#[test]
fn delete_needs_confirmation_and_closes_the_page() {
    let mut state = with_mappings(&["a", "b"]);
    load_mapping(&mut state, "a");
    state.focus = Focus::Form;
    update(&mut state, AppMsg::Delete);
    assert!(state.confirm.is_some());
    let effects = update(&mut state, AppMsg::Confirm(false));
    assert!(runs(&effects).is_empty());
    assert!(state.confirm.is_none());

    update(&mut state, AppMsg::Delete);
    let effects = update(&mut state, AppMsg::Confirm(true));
    let key = JobKey::DeleteEntity(EntityKind::SaslMappings, "a".into());
    assert_eq!(steps_for(&effects, &key).unwrap()[0].args, vec!["sasl", "delete", "a"]);

    let effects = done(&mut state, key, Ok(vec![JsonValue::Null]));
    assert_eq!(state.open, None);
    assert_eq!(state.focus, Focus::Tree);
    assert!(runs(&effects).contains(&JobKey::ListEntities(EntityKind::SaslMappings)));
    assert_eq!(state.entities.get(EntityKind::SaslMappings).entities().len(), 1);
}

#[test]
fn restart_only_change_suggests_a_restart() {
    let mut state = AppState::default();
    let effects = open(&mut state, Page::Global(GlobalPanel::SaslSettings));
    let load = JobKey::LoadGlobal(GlobalPanel::SaslSettings);
    assert_eq!(runs(&effects), vec![load.clone()]);
    done(
        &mut state,
        load,
        Ok(vec![
            json!({"attrs": {"nsslapd-sasl-max-buffer-size": ["2097152"]}}),
            json!({"items": ["GSSAPI", "EXTERNAL"]}),
        ]),
    );
    let panel = state.globals.get_mut(GlobalPanel::SaslSettings);
    assert!(panel.set_text("nsslapd-sasl-max-buffer-size", "4194304"));
    let effects = update(&mut state, AppMsg::Save);
    let save = JobKey::SaveGlobal(GlobalPanel::SaslSettings);
    let steps = steps_for(&effects, &save).unwrap();
    assert!(steps[0].has_arg("nsslapd-sasl-max-buffer-size=4194304"));

    let effects = done(&mut state, save, Ok(vec![JsonValue::Null]));
    assert!(state.restart_suggested);
    assert!(toasts(&effects)
        .iter()
        .any(|(l, _)| *l == ToastLevel::Warning));
    assert!(runs(&effects).contains(&JobKey::LoadGlobal(GlobalPanel::SaslSettings)));

    update(&mut state, AppMsg::Restart);
    let effects = update(&mut state, AppMsg::Confirm(true));
    assert_eq!(runs(&effects), vec![JobKey::Restart]);
    done(&mut state, JobKey::Restart, Ok(vec![JsonValue::Null]));
    assert!(!state.restart_suggested);
}

fn open(state: &mut AppState, page: Page) -> Vec<Effect> {
    assert!(select_key(state, &page_key(&page)));
    state.focus = Focus::Tree;
    update(state, AppMsg::Activate)
}

#[test]
fn backups_refresh_then_restore_selected_row() {
    let mut state = AppState::default();
    let effects = open(&mut state, Page::Backups);
    let refresh = JobKey::Backups(BackupAction::Refresh);
    assert_eq!(runs(&effects), vec![refresh.clone()]);
    done(
        &mut state,
        refresh,
        Ok(vec![
            json!({"items": [["nightly", "2024-01-02 02:00", "13 MB"]]}),
            json!({"items": []}),
            json!({"running": false}),
        ]),
    );
    state.focus = Focus::Form;
    update(&mut state, AppMsg::Activate);
    assert!(matches!(
        state.confirm.as_ref().map(|c| &c.action),
        Some(PendingAction::RestoreBackup(n)) if n == "nightly"
    ));
    let effects = update(&mut state, AppMsg::Confirm(true));
    let restore = JobKey::Backups(BackupAction::Restore);
    assert_eq!(steps_for(&effects, &restore).unwrap()[0].args, vec!["bak2db", "nightly"]);

    let effects = done(&mut state, restore, Ok(vec![JsonValue::Null]));
    assert!(runs(&effects).contains(&JobKey::Backups(BackupAction::Refresh)));
}

#[test]
fn backup_name_editor_starts_a_create() {
    let mut state = AppState::default();
    open(&mut state, Page::Backups);
    state.backups.busy = false;
    assert!(select_key(&mut state, "backups"));
    update(&mut state, AppMsg::Create);
    assert_eq!(
        state.editor.as_ref().map(|e| e.target.clone()),
        Some(EditTarget::BackupName)
    );
    let effects = update(&mut state, AppMsg::CommitEdit);
    assert_eq!(runs(&effects), vec![JobKey::Backups(BackupAction::Create)]);
}

#[test]
fn regex_sample_is_checked_against_the_open_mapping() {
    use crossterm::event::{KeyCode, KeyModifiers};
    let mut state = with_mappings(&["a"]);
    load_mapping(&mut state, "a");
    update(&mut state, AppMsg::TestRegex);
    assert!(state.editor.is_some());
    for c in "jdoe@example.com".chars() {
        update(
            &mut state,
            AppMsg::EditorKey(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)),
        );
    }
    let effects = update(&mut state, AppMsg::CommitEdit);
    assert!(toasts(&effects)
        .iter()
        .any(|(l, t)| *l == ToastLevel::Success && t.contains("matches")));
    assert!(state.editor.is_none());
}

#[test]
fn enter_toggles_bool_fields_and_edits_others() {
    let mut state = AppState::default();
    open(&mut state, Page::Global(GlobalPanel::SaslSettings));
    done(
        &mut state,
        JobKey::LoadGlobal(GlobalPanel::SaslSettings),
        Ok(vec![json!({"attrs": {}}), json!({"items": []})]),
    );
    state.focus = Focus::Form;
    state.field_cursor = 1;
    update(&mut state, AppMsg::Activate);
    let panel = state.globals.get(GlobalPanel::SaslSettings);
    assert!(panel.dirty);
    assert!(state.editor.is_none());
    state.field_cursor = 0;
    update(&mut state, AppMsg::Activate);
    assert!(state.editor.as_ref().is_some_and(|e| e.multiline));
    update(&mut state, AppMsg::CancelEdit);
    update(&mut state, AppMsg::Revert);
    assert!(!state.globals.get(GlobalPanel::SaslSettings).dirty);
}

#[test]
fn dblink_rows_open_link_pages() {
    let mut state = AppState::default();
    state.entities.get_mut(EntityKind::Suffixes).begin_list();
    done(
        &mut state,
        JobKey::ListEntities(EntityKind::Suffixes),
        Ok(vec![json!([
            {"id": "dc=example,dc=com", "text": "dc=example,dc=com", "type": "suffix", "be": "userroot", "nodes": [
                {"id": "ou=remote,dc=example,dc=com", "text": "ou=remote,dc=example,dc=com", "type": "dblink", "be": "link1", "nodes": []}
            ]}
        ])]),
    );
    let rows = state.entities.get(EntityKind::Suffixes).entities().to_vec();
    let link = rows.iter().find(|r| r.tag == DBLINK).unwrap();
    assert_eq!(link.depth, 1);
    let effects = open(
        &mut state,
        Page::Entity(EntityKind::Suffixes, link.id.clone()),
    );
    let steps = steps_for(
        &effects,
        &JobKey::LoadEntity(EntityKind::Suffixes, link.id.clone()),
    )
    .unwrap();
    assert_eq!(steps[0].args[..2], ["chaining", "link-get"]);
}

#[test]
fn delete_is_refused_while_the_entity_saves() {
    let mut state = with_mappings(&["a"]);
    load_mapping(&mut state, "a");
    state.focus = Focus::Form;
    assert!(state.open_panel_mut().unwrap().set_text(sasl::MAP_PRIORITY, "60"));
    let effects = update(&mut state, AppMsg::Save);
    let save_key = JobKey::SaveEntity(EntityKind::SaslMappings, "a".into());
    assert_eq!(runs(&effects), vec![save_key.clone()]);

    update(&mut state, AppMsg::Delete);
    let effects = update(&mut state, AppMsg::Confirm(true));
    assert!(runs(&effects).is_empty());
    assert!(toasts(&effects).iter().any(|(_, t)| t.contains("in progress")));

    let effects = done(&mut state, save_key, Ok(vec![JsonValue::Null]));
    let reload = JobKey::LoadEntity(EntityKind::SaslMappings, "a".into());
    assert!(runs(&effects).contains(&reload));
    update(&mut state, AppMsg::Delete);
    let effects = update(&mut state, AppMsg::Confirm(true));
    assert!(runs(&effects).is_empty());

    done(&mut state, reload, Ok(vec![mapping_doc("a")]));
    update(&mut state, AppMsg::Delete);
    let effects = update(&mut state, AppMsg::Confirm(true));
    assert_eq!(
        runs(&effects),
        vec![JobKey::DeleteEntity(EntityKind::SaslMappings, "a".into())]
    );
}

#[test]
fn reload_freezes_the_tree_and_blocks_delete() {
    let mut state = with_mappings(&["a", "b"]);
    load_mapping(&mut state, "a");
    state.focus = Focus::Form;
    let effects = update(&mut state, AppMsg::Reload);
    let reload = JobKey::LoadEntity(EntityKind::SaslMappings, "a".into());
    assert_eq!(runs(&effects), vec![reload.clone()]);
    assert!(state.entities.get(EntityKind::SaslMappings).disable_tree());

    update(&mut state, AppMsg::Delete);
    let effects = update(&mut state, AppMsg::Confirm(true));
    assert!(runs(&effects).is_empty());
    let effects = open_mapping(&mut state, "b");
    assert!(runs(&effects).is_empty());

    done(&mut state, reload, Ok(vec![mapping_doc("a")]));
    let coord = state.entities.get(EntityKind::SaslMappings);
    assert!(!coord.disable_tree());
    assert!(coord.is_cached("a"));
}

#[test]
fn late_load_result_for_a_deleted_entity_is_dropped() {
    let mut state = with_mappings(&["a", "b"]);
    load_mapping(&mut state, "a");
    state.focus = Focus::Form;
    update(&mut state, AppMsg::Delete);
    let effects = update(&mut state, AppMsg::Confirm(true));
    let delete = JobKey::DeleteEntity(EntityKind::SaslMappings, "a".into());
    assert_eq!(runs(&effects), vec![delete.clone()]);
    done(&mut state, delete, Ok(vec![JsonValue::Null]));

    done(
        &mut state,
        JobKey::LoadEntity(EntityKind::SaslMappings, "a".into()),
        Ok(vec![mapping_doc("a")]),
    );
    let coord = state.entities.get(EntityKind::SaslMappings);
    assert!(!coord.is_cached("a"));
    assert!(!coord.is_listed("a"));
}

const ROOT: &str = "dc=example,dc=com";

fn with_suffix() -> AppState {
    let mut state = AppState::default();
    state.entities.get_mut(EntityKind::Suffixes).begin_list();
    done(
        &mut state,
        JobKey::ListEntities(EntityKind::Suffixes),
        Ok(vec![json!([
            {"id": ROOT, "text": ROOT, "type": "suffix", "be": "userroot", "nodes": []}
        ])]),
    );
    state
}

fn pick_task(state: &mut AppState, task: SuffixTask) {
    update(state, AppMsg::Tasks);
    let at = state
        .task_menu
        .as_ref()
        .and_then(|m| m.tasks.iter().position(|t| *t == task))
        .unwrap();
    for _ in 0..at {
        update(state, AppMsg::TaskCursor(1));
    }
    update(state, AppMsg::ChooseTask);
    assert!(state.task_menu.is_none());
    assert_eq!(state.draft.as_ref().and_then(|d| d.task), Some(task));
}

#[test]
fn index_task_freezes_the_tree_and_reloads_the_suffix() {
    let mut state = with_suffix();
    open(&mut state, Page::Entity(EntityKind::Suffixes, ROOT.into()));
    let empty = json!({"items": []});
    done(
        &mut state,
        JobKey::LoadEntity(EntityKind::Suffixes, ROOT.into()),
        Ok(vec![json!({"attrs": {}}), empty.clone(), empty.clone(), empty]),
    );
    state.focus = Focus::Form;
    pick_task(&mut state, SuffixTask::AddIndex);
    state
        .draft
        .as_mut()
        .unwrap()
        .form
        .set_text(crate::panels::suffix_tasks::INDEX_ATTR, "mail");

    let effects = update(&mut state, AppMsg::Save);
    let task = JobKey::Task(SuffixTask::AddIndex, ROOT.into());
    assert_eq!(steps_for(&effects, &task).unwrap()[0].args[..4], ["backend", "index", "add", "--attr=mail"]);
    assert!(state.entities.get(EntityKind::Suffixes).disable_tree());
    update(&mut state, AppMsg::Delete);
    let effects = update(&mut state, AppMsg::Confirm(true));
    assert!(runs(&effects).is_empty());
    assert!(toasts(&effects).iter().any(|(_, t)| t.contains("in progress")));

    let effects = done(&mut state, task, Ok(vec![JsonValue::Null]));
    assert!(toasts(&effects)
        .iter()
        .any(|(l, t)| *l == ToastLevel::Success && t.contains("Add index finished")));
    assert!(state.draft.is_none());
    assert_eq!(
        runs(&effects),
        vec![JobKey::LoadEntity(EntityKind::Suffixes, ROOT.into())]
    );
}

#[test]
fn failed_task_keeps_the_form_open() {
    let mut state = with_suffix();
    open(&mut state, Page::Entity(EntityKind::Suffixes, ROOT.into()));
    let empty = json!({"items": []});
    done(
        &mut state,
        JobKey::LoadEntity(EntityKind::Suffixes, ROOT.into()),
        Ok(vec![json!({"attrs": {}}), empty.clone(), empty.clone(), empty]),
    );
    pick_task(&mut state, SuffixTask::EncryptAttr);
    state
        .draft
        .as_mut()
        .unwrap()
        .form
        .set_text(crate::panels::suffix_tasks::INDEX_ATTR, "telephoneNumber");
    let effects = update(&mut state, AppMsg::Save);
    let task = JobKey::Task(SuffixTask::EncryptAttr, ROOT.into());
    assert_eq!(runs(&effects), vec![task.clone()]);

    let effects = done(&mut state, task, Err("Attribute already encrypted".into()));
    assert!(toasts(&effects)
        .iter()
        .any(|(l, t)| *l == ToastLevel::Error && t.contains("Attribute already encrypted")));
    let draft = state.draft.as_ref().unwrap();
    assert!(!draft.form.submitting);
    assert!(!state.entities.get(EntityKind::Suffixes).disable_tree());
}

#[test]
fn export_from_backups_page_targets_a_listed_suffix_and_refreshes_ldifs() {
    use crate::panels::suffix_tasks::LDIF_NAME;
    let mut state = with_suffix();
    let effects = open(&mut state, Page::Backups);
    let refresh = JobKey::Backups(BackupAction::Refresh);
    assert_eq!(runs(&effects), vec![refresh.clone()]);
    done(
        &mut state,
        refresh.clone(),
        Ok(vec![json!({"items": []}), json!({"items": []}), json!({"running": true})]),
    );

    update(&mut state, AppMsg::Tasks);
    assert_eq!(
        state.task_menu.as_ref().map(|m| m.tasks.clone()),
        Some(SuffixTask::LDIF.to_vec())
    );
    update(&mut state, AppMsg::CloseTasks);
    assert!(state.task_menu.is_none());

    pick_task(&mut state, SuffixTask::ExportLdif);
    let form = &mut state.draft.as_mut().unwrap().form;
    assert_eq!(form.values.text(TASK_SUFFIX), ROOT);
    form.set_text(LDIF_NAME, "nightly.ldif");
    form.set_text(TASK_SUFFIX, "dc=nowhere");
    let effects = update(&mut state, AppMsg::Save);
    assert!(runs(&effects).is_empty());
    assert!(toasts(&effects)
        .iter()
        .any(|(l, t)| *l == ToastLevel::Error && t.contains("not a suffix")));

    state.draft.as_mut().unwrap().form.set_text(TASK_SUFFIX, ROOT);
    let effects = update(&mut state, AppMsg::Save);
    let task = JobKey::Task(SuffixTask::ExportLdif, ROOT.into());
    assert_eq!(runs(&effects), vec![task.clone()]);
    let effects = done(&mut state, task, Ok(vec![JsonValue::Null]));
    assert_eq!(runs(&effects), vec![refresh]);
}

#[test]
fn tasks_are_offered_only_for_suffixes_and_backups() {
    let mut state = with_mappings(&["a"]);
    load_mapping(&mut state, "a");
    let effects = update(&mut state, AppMsg::Tasks);
    assert!(state.task_menu.is_none());
    assert!(toasts(&effects).iter().any(|(l, _)| *l == ToastLevel::Info));
}

#[test]
fn failed_backup_listing_is_reported_as_a_load_error() {
    let mut state = AppState::default();
    open(&mut state, Page::Backups);
    let effects = done(
        &mut state,
        JobKey::Backups(BackupAction::Refresh),
        Err("Instance is not running".into()),
    );
    let texts = toasts(&effects);
    assert!(texts
        .iter()
        .any(|(_, t)| t == "Error loading backups - Instance is not running"));
    assert!(!texts.iter().any(|(_, t)| t.contains("delete")));
    assert!(!state.backups.busy);
}

#[test]
fn locked_autosize_explains_instead_of_editing() {
    use crate::panels::db_config::{AUTOSIZE_LOCKED, CACHE_AUTOSIZE, SECTIONS};
    let mut state = AppState::default();
    update(&mut state, AppMsg::Boot);
    done(
        &mut state,
        JobKey::LoadGlobal(GlobalPanel::DbConfig),
        Ok(vec![json!({"attrs": {"nsslapd-cache-autosize": ["0"]}})]),
    );
    state.focus = Focus::Form;
    state.field_cursor = SECTIONS
        .iter()
        .flat_map(|d| d.attrs.iter())
        .position(|a| a.name == CACHE_AUTOSIZE)
        .unwrap();
    let effects = update(&mut state, AppMsg::Activate);
    assert!(state.editor.is_none());
    assert!(toasts(&effects)
        .iter()
        .any(|(l, t)| *l == ToastLevel::Info && t == AUTOSIZE_LOCKED));
    assert!(!state.globals.get(GlobalPanel::DbConfig).dirty);
}
