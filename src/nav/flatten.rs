use crate::app::{EntityKind, GlobalPanel, Page};
use crate::nav::keys::node_key;
use crate::ui::AppState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavTarget {
    Header(&'static str),
    /// Entity list heading; its rows follow at a deeper depth.
    Group(EntityKind),
    Page(Page),
}

#[derive(Clone, Debug)]
pub struct NavRow {
    pub target: NavTarget,
    pub label: String,
    pub tag: String,
    pub depth: usize,
}

impl NavRow {
    fn new(target: NavTarget, label: impl Into<String>, depth: usize) -> Self {
        Self {
            target,
            label: label.into(),
            tag: String::new(),
            depth,
        }
    }
}

/// Fixed pages plus the current rows of every entity list, in display order.
pub fn flatten_nav(state: &AppState) -> Vec<NavRow> {
    let mut out = Vec::new();
    out.push(NavRow::new(NavTarget::Header("Database"), "Database", 0));
    global(&mut out, GlobalPanel::DbConfig);
    global(&mut out, GlobalPanel::ChainingDefaults);
    out.push(NavRow::new(NavTarget::Page(Page::Backups), "Backups & LDIFs", 1));
    group(&mut out, state, EntityKind::Suffixes);

    out.push(NavRow::new(
        NavTarget::Header("Password Policies"),
        "Password Policies",
        0,
    ));
    global(&mut out, GlobalPanel::GlobalPolicy);
    group(&mut out, state, EntityKind::LocalPolicies);

    out.push(NavRow::new(NavTarget::Header("Server"), "Server", 0));
    global(&mut out, GlobalPanel::SaslSettings);
    group(&mut out, state, EntityKind::SaslMappings);
    out
}

fn global(out: &mut Vec<NavRow>, g: GlobalPanel) {
    out.push(NavRow::new(NavTarget::Page(Page::Global(g)), g.label(), 1));
}

fn group(out: &mut Vec<NavRow>, state: &AppState, kind: EntityKind) {
    out.push(NavRow::new(NavTarget::Group(kind), kind.label(), 1));
    for e in state.entities.get(kind).entities() {
        out.push(NavRow {
            target: NavTarget::Page(Page::Entity(kind, e.id.clone())),
            label: e.label.clone(),
            tag: e.tag.clone(),
            depth: 2 + e.depth,
        });
    }
}

/// Move the tree cursor onto the row with `key`; false when it is gone.
pub fn select_key(state: &mut AppState, key: &str) -> bool {
    let rows = flatten_nav(state);
    match rows.iter().position(|r| node_key(&r.target) == key) {
        Some(i) => {
            state.selected = i;
            true
        }
        None => {
            state.selected = state.selected.min(rows.len().saturating_sub(1));
            false
        }
    }
}
