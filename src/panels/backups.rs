//! Backups and LDIF files of the instance. Not an attribute form: a table
//! refreshed from `dsctl` plus create/restore/delete actions.

use crate::services::cli_runner::Invocation;
use crate::services::loader::items_of;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupRow {
    pub name: String,
    pub date: String,
    pub size: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LdifRow {
    pub name: String,
    pub date: String,
    pub size: String,
    pub suffix: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackupAction {
    Refresh,
    Create,
    Restore,
    Delete,
}

#[derive(Debug, Default)]
pub struct BackupTable {
    pub backups: Vec<BackupRow>,
    pub ldifs: Vec<LdifRow>,
    /// From the last refresh; picks the online or offline tool.
    pub running: Option<bool>,
    pub selected: usize,
    pub busy: bool,
    pub last_error: Option<String>,
}

fn cells(item: &JsonValue) -> Vec<String> {
    item.as_array()
        .map(|a| {
            a.iter()
                .map(|c| match c {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_backups(v: &JsonValue) -> Vec<BackupRow> {
    items_of(v)
        .iter()
        .map(cells)
        .filter(|c| c.len() >= 3)
        .map(|c| BackupRow {
            name: c[0].clone(),
            date: c[1].clone(),
            size: c[2].clone(),
        })
        .collect()
}

pub fn parse_ldifs(v: &JsonValue) -> Vec<LdifRow> {
    items_of(v)
        .iter()
        .map(cells)
        .filter(|c| c.len() >= 4)
        .map(|c| LdifRow {
            name: c[0].clone(),
            date: c[1].clone(),
            size: c[2].clone(),
            suffix: c[3].clone(),
        })
        .collect()
}

/// Backups live in the server's backup directory, so a name is never a path.
pub fn check_backup_name(name: &str) -> Option<String> {
    if name.contains('/') || name.contains("..") {
        Some("Backup name should not be a path".into())
    } else {
        None
    }
}

impl BackupTable {
    pub fn refresh_plan(&self) -> Vec<Invocation> {
        vec![
            Invocation::dsctl(["backups"]),
            Invocation::dsctl(["ldifs"]),
            Invocation::dsctl(["status"]),
        ]
    }

    pub fn begin(&mut self) -> bool {
        if self.busy {
            return false;
        }
        self.busy = true;
        true
    }

    pub fn finish_refresh(&mut self, outcome: Result<Vec<JsonValue>, String>) {
        self.busy = false;
        match outcome {
            Ok(outputs) => {
                let empty = JsonValue::Null;
                self.backups = parse_backups(outputs.first().unwrap_or(&empty));
                self.ldifs = parse_ldifs(outputs.get(1).unwrap_or(&empty));
                self.running = outputs
                    .get(2)
                    .and_then(|s| s.get("running"))
                    .and_then(|r| r.as_bool());
                self.selected = self.selected.min(self.backups.len().saturating_sub(1));
                self.last_error = None;
            }
            Err(desc) => self.last_error = Some(desc),
        }
    }

    pub fn selected_backup(&self) -> Option<&BackupRow> {
        self.backups.get(self.selected)
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.backups.is_empty() {
            self.selected = 0;
            return;
        }
        let last = self.backups.len() as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, last) as usize;
    }

    /// Online task when the server runs, offline `db2bak` otherwise. An
    /// empty name lets the server pick one.
    pub fn create_plan(&self, name: &str) -> Result<Vec<Invocation>, String> {
        if let Some(m) = check_backup_name(name) {
            return Err(m);
        }
        let name = name.trim();
        let inv = if self.running.unwrap_or(true) {
            Invocation::dsconf(["backup", "create"])
        } else {
            Invocation::dsctl(["db2bak"])
        };
        Ok(vec![if name.is_empty() { inv } else { inv.arg(name) }])
    }

    pub fn restore_plan(&self, name: &str) -> Vec<Invocation> {
        let inv = if self.running.unwrap_or(true) {
            Invocation::dsconf(["backup", "restore"])
        } else {
            Invocation::dsctl(["bak2db"])
        };
        vec![inv.arg(name)]
    }

    pub fn delete_plan(&self, name: &str) -> Vec<Invocation> {
        vec![Invocation::dsctl(["backups", "--delete"]).arg(name)]
    }

    pub fn finish_action(&mut self, outcome: Result<(), String>) -> Result<(), String> {
        self.busy = false;
        if let Err(desc) = &outcome {
            self.last_error = Some(desc.clone());
        }
        outcome
    }
}

pub fn restart_instance() -> Vec<Invocation> {
    vec![Invocation::dsctl(["restart"])]
}
