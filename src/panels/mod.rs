//! Single-panel load/save cycle shared by every configuration page.
//!
//! A [`Panel`] owns the current and baseline snapshots of one entity. It
//! never runs commands itself: `begin_*` hands back the invocations to run
//! and `finish_*` takes their outcome, so the same code drives worker
//! threads in the UI and a stub executor in tests.

pub mod backups;
pub mod chaining;
pub mod db_config;
pub mod pwpolicy;
pub mod sasl;
pub mod suffix;
pub mod suffix_tasks;

use crate::attrs::diff::{find_spec, AttrKind, AttrSpec, AttributeDescriptor, Diff, DiffEngine};
use crate::attrs::{AttrValue, AttributeSnapshot};
use crate::services::cli_runner::Invocation;
use crate::ui::ToastLevel;
use serde_json::Value as JsonValue;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    Saving,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: ToastLevel,
    pub text: String,
}

impl Notice {
    pub fn new(level: ToastLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Per-page behaviour plugged into [`Panel`].
pub trait PanelSpec: Send {
    fn title(&self) -> String;

    fn sections(&self) -> &'static [AttributeDescriptor];

    fn read_plan(&self) -> Vec<Invocation>;

    /// Turn the read plan's outputs (one per step) into a snapshot.
    fn parse(&self, outputs: &[JsonValue]) -> Result<AttributeSnapshot, String> {
        let doc = outputs.first().cloned().unwrap_or(JsonValue::Null);
        Ok(AttributeSnapshot::from_attrs(&doc, self.sections()))
    }

    fn engine(&self) -> DiffEngine {
        DiffEngine::new(self.sections())
    }

    /// Invocations for a non-empty diff.
    fn write_plan(
        &self,
        diff: &Diff,
        baseline: &AttributeSnapshot,
        current: &AttributeSnapshot,
    ) -> Vec<Invocation>;

    fn validate(&self, _current: &AttributeSnapshot, _diff: &Diff) -> Vec<FieldError> {
        Vec::new()
    }

    /// Attribute holding the entity's name when a save can rename it.
    fn identity_attr(&self) -> Option<&'static str> {
        None
    }

    /// Called after a successful save that changed the identity.
    fn set_identity(&mut self, _id: &str) {}

    /// Why `name` cannot be edited given the other values, if it can't.
    fn locked(&self, _current: &AttributeSnapshot, _name: &str) -> Option<&'static str> {
        None
    }
}

/// Result of asking a panel to save.
#[derive(Debug, PartialEq, Eq)]
pub enum SaveStart {
    /// A load or save is already outstanding.
    Busy,
    Clean,
    /// Dirty, but none of the edits would be written.
    Unsent,
    Invalid(Vec<FieldError>),
    Run(Vec<Invocation>),
}

pub struct Panel {
    spec: Box<dyn PanelSpec>,
    engine: DiffEngine,
    pub current: AttributeSnapshot,
    pub baseline: AttributeSnapshot,
    pub phase: Phase,
    pub dirty: bool,
    pub errors: Vec<FieldError>,
    pub last_error: Option<String>,
    restart_pending: bool,
}

impl Panel {
    pub fn new(spec: Box<dyn PanelSpec>) -> Self {
        let engine = spec.engine();
        Self {
            spec,
            engine,
            current: AttributeSnapshot::new(),
            baseline: AttributeSnapshot::new(),
            phase: Phase::Uninitialized,
            dirty: false,
            errors: Vec::new(),
            last_error: None,
            restart_pending: false,
        }
    }

    pub fn title(&self) -> String {
        self.spec.title()
    }

    pub fn sections(&self) -> &'static [AttributeDescriptor] {
        self.spec.sections()
    }

    pub fn spec_for(&self, name: &str) -> Option<&'static AttrSpec> {
        find_spec(self.sections(), name)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Loading | Phase::Saving)
    }

    pub fn is_loaded(&self) -> bool {
        !matches!(self.phase, Phase::Uninitialized | Phase::Loading) || !self.baseline.is_empty()
    }

    pub fn begin_load(&mut self) -> Option<Vec<Invocation>> {
        if self.is_busy() {
            return None;
        }
        tracing::debug!(panel = %self.title(), "load");
        self.phase = Phase::Loading;
        Some(self.spec.read_plan())
    }

    /// Replace both snapshots on success. A failure keeps whatever was
    /// shown before; either way the panel is `Ready` afterwards.
    pub fn finish_load(&mut self, outcome: Result<Vec<JsonValue>, String>) -> Option<Notice> {
        self.phase = Phase::Ready;
        match outcome.and_then(|outputs| self.spec.parse(&outputs)) {
            Ok(snapshot) => {
                self.baseline = snapshot.clone();
                self.current = snapshot;
                self.dirty = false;
                self.errors.clear();
                self.last_error = None;
                None
            }
            Err(desc) => {
                tracing::warn!(panel = %self.title(), %desc, "load failed");
                self.last_error = Some(desc.clone());
                Some(Notice::new(
                    ToastLevel::Error,
                    format!("Error loading {} - {desc}", self.title()),
                ))
            }
        }
    }

    /// Local edit; refused while a call is outstanding.
    pub fn set_field(&mut self, name: &str, value: AttrValue) -> bool {
        if self.is_busy() {
            return false;
        }
        match self.spec_for(name) {
            Some(spec) if spec.editable() => {}
            _ => return false,
        }
        if self.locked(name).is_some() {
            return false;
        }
        self.current.set(name, value);
        self.errors.retain(|e| e.field != name);
        self.dirty = self.engine.is_dirty(&self.baseline, &self.current);
        true
    }

    /// Edit from the textual form used by the editor.
    pub fn set_text(&mut self, name: &str, raw: &str) -> bool {
        let Some(spec) = self.spec_for(name) else {
            return false;
        };
        self.set_field(name, AttrValue::parse(spec.kind, raw))
    }

    pub fn toggle(&mut self, name: &str) -> bool {
        let now = self.current.flag(name);
        self.set_field(name, AttrValue::Bool(!now))
    }

    pub fn locked(&self, name: &str) -> Option<&'static str> {
        self.spec.locked(&self.current, name)
    }

    pub fn locked_fields(&self) -> Vec<&'static str> {
        self.sections()
            .iter()
            .flat_map(|d| d.attrs.iter())
            .filter(|a| self.locked(a.name).is_some())
            .map(|a| a.name)
            .collect()
    }

    /// Drop local edits.
    pub fn revert(&mut self) {
        if self.is_busy() {
            return;
        }
        self.current = self.baseline.clone();
        self.errors.clear();
        self.dirty = false;
    }

    pub fn diff(&self) -> Diff {
        self.engine.diff(&self.baseline, &self.current)
    }

    pub fn field_error(&self, name: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == name)
            .map(|e| e.message.as_str())
    }

    pub fn begin_save(&mut self) -> SaveStart {
        if self.phase != Phase::Ready {
            return SaveStart::Busy;
        }
        if !self.dirty {
            return SaveStart::Clean;
        }
        let diff = self.diff();
        let mut errors = check_changed_ints(self.sections(), &self.current, &diff);
        errors.extend(self.spec.validate(&self.current, &diff));
        if !errors.is_empty() {
            self.errors = errors.clone();
            return SaveStart::Invalid(errors);
        }
        self.errors.clear();
        let plan = self.spec.write_plan(&diff, &self.baseline, &self.current);
        if plan.is_empty() {
            return SaveStart::Unsent;
        }
        tracing::debug!(panel = %self.title(), args = ?diff.args, "save");
        self.restart_pending = diff.restart;
        self.phase = Phase::Saving;
        SaveStart::Run(plan)
    }

    /// Always reloads; the returned plan must be run and fed to `finish_load`.
    pub fn finish_save(&mut self, outcome: Result<(), String>) -> (Vec<Notice>, Vec<Invocation>) {
        let mut notices = Vec::new();
        match outcome {
            Ok(()) => {
                if let Some(id) = self.saved_identity() {
                    self.spec.set_identity(&id);
                }
                notices.push(Notice::new(
                    ToastLevel::Success,
                    format!("Successfully updated {}", self.title()),
                ));
                if self.restart_pending {
                    notices.push(Notice::new(
                        ToastLevel::Warning,
                        "You must restart the Directory Server for these changes to take effect.",
                    ));
                }
            }
            Err(desc) => {
                tracing::warn!(panel = %self.title(), %desc, "save failed");
                self.last_error = Some(desc.clone());
                notices.push(Notice::new(
                    ToastLevel::Error,
                    format!("Failed to update {} - {desc}", self.title()),
                ));
            }
        }
        self.restart_pending = false;
        self.phase = Phase::Loading;
        (notices, self.spec.read_plan())
    }

    /// Identity after a save, when the page supports renaming.
    pub fn saved_identity(&self) -> Option<String> {
        self.spec
            .identity_attr()
            .map(|name| self.current.text(name))
            .filter(|s| !s.is_empty())
    }
}

impl crate::coordinator::Outstanding for Panel {
    fn outstanding(&self) -> bool {
        self.is_busy()
    }
}

fn check_changed_ints(
    sections: &[AttributeDescriptor],
    current: &AttributeSnapshot,
    diff: &Diff,
) -> Vec<FieldError> {
    diff.changed
        .iter()
        .filter_map(|name| find_spec(sections, name))
        .filter(|spec| spec.kind == AttrKind::Int)
        .filter_map(|spec| {
            crate::validate::check_int(&current.text(spec.name), None, None)
                .map(|m| FieldError::new(spec.name, m))
        })
        .collect()
}

/// Integer fields of a create form that no longer hold their default.
fn check_entered_ints(sections: &[AttributeDescriptor], values: &AttributeSnapshot) -> Vec<FieldError> {
    sections
        .iter()
        .flat_map(|d| d.attrs.iter())
        .filter(|spec| spec.kind == AttrKind::Int)
        .filter(|spec| values.text(spec.name).trim() != spec.default)
        .filter_map(|spec| {
            crate::validate::check_int(&values.text(spec.name), None, None)
                .map(|m| FieldError::new(spec.name, m))
        })
        .collect()
}

/// Shared parse for pages whose read plan is a single `get`.
pub fn snapshot_from_first(
    outputs: &[JsonValue],
    sections: &[AttributeDescriptor],
) -> AttributeSnapshot {
    let doc = outputs.first().cloned().unwrap_or(JsonValue::Null);
    AttributeSnapshot::from_attrs(&doc, sections)
}

/// A form for creating a new entity. Fields start at their defaults and
/// every field is submitted through the page's create plan.
pub trait CreateSpec: Send {
    fn title(&self) -> String;

    fn sections(&self) -> &'static [AttributeDescriptor];

    fn defaults(&self) -> AttributeSnapshot {
        let mut snap = AttributeSnapshot::new();
        for spec in self.sections().iter().flat_map(|d| d.attrs.iter()) {
            snap.set(spec.name, AttrValue::parse(spec.kind, spec.default));
        }
        snap
    }

    fn validate(&self, values: &AttributeSnapshot) -> Vec<FieldError>;

    /// Name of the entity the plan will create.
    fn identity(&self, values: &AttributeSnapshot) -> String;

    fn create_plan(&self, values: &AttributeSnapshot) -> Vec<Invocation>;
}

pub struct CreateDraft {
    spec: Box<dyn CreateSpec>,
    pub values: AttributeSnapshot,
    pub errors: Vec<FieldError>,
    pub submitting: bool,
}

impl CreateDraft {
    pub fn new(spec: Box<dyn CreateSpec>) -> Self {
        let values = spec.defaults();
        Self {
            spec,
            values,
            errors: Vec::new(),
            submitting: false,
        }
    }

    pub fn title(&self) -> String {
        self.spec.title()
    }

    pub fn sections(&self) -> &'static [AttributeDescriptor] {
        self.spec.sections()
    }

    pub fn spec_for(&self, name: &str) -> Option<&'static AttrSpec> {
        find_spec(self.sections(), name)
    }

    pub fn set_text(&mut self, name: &str, raw: &str) {
        if self.submitting {
            return;
        }
        if let Some(spec) = self.spec_for(name) {
            self.values.set(name, AttrValue::parse(spec.kind, raw));
            self.errors.retain(|e| e.field != name);
        }
    }

    pub fn toggle(&mut self, name: &str) {
        if self.submitting {
            return;
        }
        let now = self.values.flag(name);
        self.values.set(name, AttrValue::Bool(!now));
    }

    pub fn field_error(&self, name: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == name)
            .map(|e| e.message.as_str())
    }

    /// Validated plan plus the identity it creates.
    pub fn submit(&mut self) -> Result<(String, Vec<Invocation>), Vec<FieldError>> {
        let mut errors = check_entered_ints(self.sections(), &self.values);
        for e in self.spec.validate(&self.values) {
            if !errors.iter().any(|seen| seen.field == e.field) {
                errors.push(e);
            }
        }
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Err(errors);
        }
        self.errors.clear();
        self.submitting = true;
        Ok((self.spec.identity(&self.values), self.spec.create_plan(&self.values)))
    }
}

/// `base` followed by the diff's arguments; nothing when the diff emits none.
pub fn args_plan(base: Invocation, diff: &Diff) -> Vec<Invocation> {
    if diff.args.is_empty() {
        return Vec::new();
    }
    vec![base.extend(diff.args.iter().cloned())]
}

/// Arguments for every attribute of `values` differing from `defaults`.
pub fn args_against_defaults(
    engine: &DiffEngine,
    defaults: &AttributeSnapshot,
    values: &AttributeSnapshot,
) -> Vec<String> {
    engine.diff(defaults, values).args
}
