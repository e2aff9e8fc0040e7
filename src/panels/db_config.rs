//! Global database configuration (`backend config get|set`).

use super::{FieldError, PanelSpec};
use crate::attrs::diff::{AttrKind, AttrSpec, AttributeDescriptor, Diff, DiffContext, DiffEngine, Transform};
use crate::attrs::{AttrValue, AttributeSnapshot};
use crate::services::cli_runner::Invocation;
use crate::validate::check_int;
use serde_json::Value as JsonValue;

pub const DB_CACHE_AUTO: &str = "db_cache_auto";
pub const IMPORT_CACHE_AUTO: &str = "import_cache_auto";
pub const CACHE_AUTOSIZE: &str = "nsslapd-cache-autosize";
pub const IMPORT_AUTOSIZE: &str = "nsslapd-import-cache-autosize";

static LIMITS: &[AttrSpec] = &[
    AttrSpec::flag("nsslapd-lookthroughlimit", "Lookthrough limit", AttrKind::Int, "--lookthroughlimit"),
    AttrSpec::flag("nsslapd-idlistscanlimit", "ID list scan limit", AttrKind::Int, "--idlistscanlimit"),
    AttrSpec::flag(
        "nsslapd-pagedlookthroughlimit",
        "Paged lookthrough limit",
        AttrKind::Int,
        "--pagedlookthroughlimit",
    ),
    AttrSpec::flag(
        "nsslapd-pagedidlistscanlimit",
        "Paged ID list scan limit",
        AttrKind::Int,
        "--pagedidlistscanlimit",
    ),
    AttrSpec::flag(
        "nsslapd-rangelookthroughlimit",
        "Range lookthrough limit",
        AttrKind::Int,
        "--rangelookthroughlimit",
    ),
];

static CACHE: &[AttrSpec] = &[
    AttrSpec::local(DB_CACHE_AUTO, "Automatic cache tuning", AttrKind::Bool),
    AttrSpec::flag(CACHE_AUTOSIZE, "Memory percentage", AttrKind::Int, "--cache-autosize")
        .default_value("0")
        .needs_restart(),
    AttrSpec::flag(
        "nsslapd-cache-autosize-split",
        "DB cache percentage",
        AttrKind::Int,
        "--cache-autosize-split",
    )
    .needs_restart(),
    AttrSpec::flag("nsslapd-dbcachesize", "DB cache size", AttrKind::Int, "--dbcachesize").needs_restart(),
];

static IMPORT: &[AttrSpec] = &[
    AttrSpec::local(IMPORT_CACHE_AUTO, "Automatic import cache tuning", AttrKind::Bool),
    AttrSpec::flag(IMPORT_AUTOSIZE, "Import memory percentage", AttrKind::Int, "--import-cache-autosize")
        .default_value("0"),
    AttrSpec::flag("nsslapd-import-cachesize", "Import cache size", AttrKind::Int, "--import-cachesize"),
];

static DATABASE: &[AttrSpec] = &[
    AttrSpec::flag("nsslapd-db-logdirectory", "Transaction log directory", AttrKind::Text, "--logdirectory")
        .needs_restart(),
    AttrSpec::flag(
        "nsslapd-db-home-directory",
        "Database home directory",
        AttrKind::Text,
        "--db-home-directory",
    )
    .needs_restart(),
    AttrSpec::flag("nsslapd-db-locks", "Database locks", AttrKind::Int, "--locks").needs_restart(),
    AttrSpec::flag(
        "nsslapd-db-locks-monitoring-enabled",
        "Lock monitoring",
        AttrKind::Bool,
        "--locks-monitoring-enabled",
    )
    .needs_restart(),
    AttrSpec::flag(
        "nsslapd-db-locks-monitoring-threshold",
        "Lock threshold (%)",
        AttrKind::Int,
        "--locks-monitoring-threshold",
    )
    .needs_restart(),
    AttrSpec::flag(
        "nsslapd-db-locks-monitoring-pause",
        "Lock monitoring pause (ms)",
        AttrKind::Int,
        "--locks-monitoring-pause",
    ),
    AttrSpec::flag(
        "nsslapd-db-checkpoint-interval",
        "Checkpoint interval",
        AttrKind::Int,
        "--checkpoint-interval",
    )
    .needs_restart(),
    AttrSpec::flag(
        "nsslapd-db-compactdb-interval",
        "Compaction interval",
        AttrKind::Int,
        "--compactdb-interval",
    )
    .needs_restart(),
    AttrSpec::flag("nsslapd-db-compactdb-time", "Compaction time", AttrKind::Text, "--compactdb-time")
        .default_value("23:59")
        .needs_restart(),
];

pub static SECTIONS: &[AttributeDescriptor] = &[
    AttributeDescriptor::new("Database Limits", LIMITS),
    AttributeDescriptor::new("Database Cache", CACHE),
    AttributeDescriptor::new("Import Cache", IMPORT),
    AttributeDescriptor::new("Database Settings", DATABASE),
];

/// Shared by both autosize attributes: switching the companion on writes
/// the value (or `enable_with` when it still reads "0"), switching it off
/// writes "0", and with auto off a changed value is not written.
fn autosize_rule(ctx: &DiffContext<'_>, auto: &str, enable_with: &str) -> Transform {
    let auto_on = ctx.current.flag(auto);
    let auto_changed = ctx.companion_changed(auto);
    match (auto_on, auto_changed) {
        (true, true) => {
            let v = ctx.current.text(ctx.spec.name);
            if v.trim() == "0" || v.trim().is_empty() {
                Transform::Emit(enable_with.to_string())
            } else {
                Transform::Emit(v)
            }
        }
        (true, false) => Transform::Default,
        (false, true) => Transform::Emit("0".into()),
        (false, false) => Transform::Skip,
    }
}

fn cache_autosize(ctx: &DiffContext<'_>) -> Transform {
    autosize_rule(ctx, DB_CACHE_AUTO, "10")
}

fn import_autosize(ctx: &DiffContext<'_>) -> Transform {
    autosize_rule(ctx, IMPORT_CACHE_AUTO, "-1")
}

pub const AUTOSIZE_LOCKED: &str = "Turn on automatic tuning to edit this value";
pub const MANUAL_LOCKED: &str = "Turn off automatic tuning to edit this value";

pub struct DbConfig;

impl PanelSpec for DbConfig {
    fn title(&self) -> String {
        "database configuration".into()
    }

    fn sections(&self) -> &'static [AttributeDescriptor] {
        SECTIONS
    }

    fn read_plan(&self) -> Vec<Invocation> {
        vec![Invocation::dsconf(["backend", "config", "get"])]
    }

    fn parse(&self, outputs: &[JsonValue]) -> Result<AttributeSnapshot, String> {
        let mut snap = super::snapshot_from_first(outputs, SECTIONS);
        let db_auto = snap.text(CACHE_AUTOSIZE).trim() != "0";
        let import_auto = snap.text(IMPORT_AUTOSIZE).trim() != "0";
        snap.set(DB_CACHE_AUTO, AttrValue::Bool(db_auto));
        snap.set(IMPORT_CACHE_AUTO, AttrValue::Bool(import_auto));
        Ok(snap)
    }

    fn engine(&self) -> DiffEngine {
        DiffEngine::new(SECTIONS)
            .with_transform(CACHE_AUTOSIZE, cache_autosize)
            .with_transform(IMPORT_AUTOSIZE, import_autosize)
    }

    fn write_plan(&self, diff: &Diff, _: &AttributeSnapshot, _: &AttributeSnapshot) -> Vec<Invocation> {
        super::args_plan(Invocation::dsconf(["backend", "config", "set"]), diff)
    }

    fn locked(&self, current: &AttributeSnapshot, name: &str) -> Option<&'static str> {
        let (auto, locked_while_on) = match name {
            CACHE_AUTOSIZE => (DB_CACHE_AUTO, false),
            IMPORT_AUTOSIZE => (IMPORT_CACHE_AUTO, false),
            "nsslapd-dbcachesize" => (DB_CACHE_AUTO, true),
            "nsslapd-import-cachesize" => (IMPORT_CACHE_AUTO, true),
            _ => return None,
        };
        match (current.flag(auto), locked_while_on) {
            (false, false) => Some(AUTOSIZE_LOCKED),
            (true, true) => Some(MANUAL_LOCKED),
            _ => None,
        }
    }

    fn validate(&self, current: &AttributeSnapshot, diff: &Diff) -> Vec<FieldError> {
        let ranges: [(&str, Option<i64>, Option<i64>); 4] = [
            (CACHE_AUTOSIZE, Some(0), Some(100)),
            ("nsslapd-cache-autosize-split", Some(0), Some(100)),
            (IMPORT_AUTOSIZE, Some(-1), Some(100)),
            ("nsslapd-db-locks-monitoring-threshold", Some(70), Some(95)),
        ];
        ranges
            .iter()
            .filter(|(name, _, _)| diff.changed.contains(name))
            .filter_map(|(name, lo, hi)| {
                check_int(&current.text(name), *lo, *hi).map(|m| FieldError::new(*name, m))
            })
            .collect()
    }
}
