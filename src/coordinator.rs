//! Tree/table coordinator for pages that manage many entities of one kind.
//!
//! Holds the entity list, a cache of loaded entities keyed by identity and
//! the single outstanding-operation flag that freezes navigation. Like
//! [`crate::panels::Panel`] it never runs commands; callers act on the
//! returned decision and report back through the `finish_*` methods.

use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityRow {
    pub id: String,
    pub label: String,
    /// Free-form tag shown next to the label (policy type, link marker).
    pub tag: String,
    pub depth: usize,
}

impl EntityRow {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            tag: String::new(),
            depth: 0,
        }
    }

    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn at_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }
}

/// Cached entities report whether a read or write of their own is still
/// outstanding; a delete waits for it.
pub trait Outstanding {
    fn outstanding(&self) -> bool;
}

#[derive(Debug, PartialEq, Eq)]
pub enum Selection {
    /// Already loaded; shown without a call.
    Cached,
    /// Not loaded yet; the caller must issue a load and report it.
    NeedsLoad,
    /// Another operation is outstanding.
    Busy,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Pending {
    Load(String),
    Create(String),
    Delete(String),
    Task(String),
    List,
}

pub struct Coordinator<T> {
    entities: Vec<EntityRow>,
    cache: HashMap<String, T>,
    selected: Option<String>,
    pending: Option<Pending>,
    /// Identity created last; selected once the list refresh shows it.
    pending_select: Option<String>,
    pub last_error: Option<String>,
}

impl<T> Default for Coordinator<T> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            cache: HashMap::new(),
            selected: None,
            pending: None,
            pending_select: None,
            last_error: None,
        }
    }
}

impl<T> Coordinator<T> {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disable_tree(&self) -> bool {
        self.pending.is_some()
    }

    pub fn entities(&self) -> &[EntityRow] {
        &self.entities
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_cached(&self, id: &str) -> bool {
        self.cache.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.cache.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.cache.get_mut(id)
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<&T> {
        self.selected.as_deref().and_then(|id| self.cache.get(id))
    }

    pub fn select(&mut self, id: &str) -> Selection {
        if self.disable_tree() {
            return Selection::Busy;
        }
        if !self.entities.iter().any(|e| e.id == id) {
            return Selection::Unknown;
        }
        self.selected = Some(id.to_string());
        if self.cache.contains_key(id) {
            return Selection::Cached;
        }
        tracing::debug!(id, "entity load requested");
        self.pending = Some(Pending::Load(id.to_string()));
        Selection::NeedsLoad
    }

    pub fn is_listed(&self, id: &str) -> bool {
        self.entities.iter().any(|e| e.id == id)
    }

    /// Unfreeze navigation after a load of `id`, whatever its outcome.
    pub fn settle_load(&mut self, id: &str) {
        if self.pending == Some(Pending::Load(id.to_string())) {
            self.pending = None;
        }
    }

    /// Cache a loaded entity and unfreeze navigation.
    pub fn finish_load(&mut self, id: &str, value: T) {
        self.settle_load(id);
        self.last_error = None;
        self.cache.insert(id.to_string(), value);
    }

    /// Nothing is cached, so selecting the entity again retries.
    pub fn load_failed(&mut self, id: &str, desc: &str) {
        self.settle_load(id);
        self.last_error = Some(desc.to_string());
    }

    pub fn begin_list(&mut self) -> bool {
        if self.disable_tree() {
            return false;
        }
        self.pending = Some(Pending::List);
        true
    }

    /// Replace the list; cache entries that disappeared are evicted and a
    /// vanished selection is cleared. Returns the identity to select next,
    /// if a create is waiting for it.
    pub fn set_entities(&mut self, rows: Vec<EntityRow>) -> Option<String> {
        if self.pending == Some(Pending::List) {
            self.pending = None;
        }
        self.cache.retain(|id, _| rows.iter().any(|r| &r.id == id));
        if let Some(sel) = &self.selected {
            if !rows.iter().any(|r| &r.id == sel) {
                self.selected = None;
            }
        }
        self.entities = rows;
        let wanted = self.pending_select.take()?;
        self.entities.iter().any(|r| r.id == wanted).then_some(wanted)
    }

    pub fn list_failed(&mut self, desc: &str) {
        if self.pending == Some(Pending::List) {
            self.pending = None;
        }
        self.last_error = Some(desc.to_string());
    }

    pub fn begin_create(&mut self, id: &str) -> bool {
        if self.disable_tree() {
            return false;
        }
        self.pending = Some(Pending::Create(id.to_string()));
        true
    }

    /// On success the caller refreshes the list; the new identity is
    /// selected when it shows up.
    pub fn finish_create(&mut self, ok: bool) {
        if let Some(Pending::Create(id)) = self.pending.take() {
            if ok {
                self.pending_select = Some(id);
            }
        }
    }

    pub fn finish_delete(&mut self, ok: bool) {
        let Some(Pending::Delete(id)) = self.pending.take() else {
            return;
        };
        if !ok {
            return;
        }
        self.cache.remove(&id);
        self.entities.retain(|e| e.id != id);
        if self.selected.as_deref() == Some(id.as_str()) {
            self.selected = None;
        }
    }

    pub fn finish_task(&mut self) {
        if matches!(self.pending, Some(Pending::Task(_))) {
            self.pending = None;
        }
    }

    /// Re-key a cached entity after a rename.
    pub fn rename(&mut self, old: &str, new: &str) {
        if let Some(v) = self.cache.remove(old) {
            self.cache.insert(new.to_string(), v);
        }
        for e in self.entities.iter_mut().filter(|e| e.id == old) {
            e.id = new.to_string();
            e.label = new.to_string();
        }
        if self.selected.as_deref() == Some(old) {
            self.selected = Some(new.to_string());
        }
    }
}

impl<T: Outstanding> Coordinator<T> {
    /// Re-read a cached entity; navigation stays frozen until
    /// [`Coordinator::settle_load`].
    pub fn begin_reload(&mut self, id: &str) -> bool {
        if self.disable_tree() || self.cache.get(id).map_or(true, T::outstanding) {
            return false;
        }
        tracing::debug!(id, "entity reload requested");
        self.pending = Some(Pending::Load(id.to_string()));
        true
    }

    /// A one-shot operation against a listed entity; freezes navigation
    /// like a create or delete.
    pub fn begin_task(&mut self, id: &str) -> bool {
        if self.disable_tree() || !self.is_listed(id) {
            return false;
        }
        if self.cache.get(id).is_some_and(T::outstanding) {
            return false;
        }
        self.pending = Some(Pending::Task(id.to_string()));
        true
    }

    /// Refused while anything is pending, or while the entity's own save
    /// or reload has not come back.
    pub fn begin_delete(&mut self, id: &str) -> bool {
        if self.disable_tree() || !self.is_listed(id) {
            return false;
        }
        if self.cache.get(id).is_some_and(T::outstanding) {
            return false;
        }
        self.pending = Some(Pending::Delete(id.to_string()));
        true
    }
}
