//! SASL settings and identity mappings.

use super::{CreateSpec, FieldError, PanelSpec};
use crate::attrs::diff::{AttrKind, AttrSpec, AttributeDescriptor, Diff};
use crate::attrs::{AttrValue, AttributeSnapshot};
use crate::services::cli_runner::Invocation;
use crate::services::loader::{first_attr, items_of};
use crate::validate::{check_int, check_required};
use regex::Regex;
use serde_json::Value as JsonValue;

pub const SUPPORTED_MECHS: &str = "supported_mechanisms";

static SETTINGS: &[AttrSpec] = &[
    AttrSpec::assign("nsslapd-allowed-sasl-mechanisms", "Allowed mechanisms", AttrKind::List).needs_restart(),
    AttrSpec::assign("nsslapd-sasl-mapping-fallback", "Mapping fallback", AttrKind::Bool).needs_restart(),
    AttrSpec::assign("nsslapd-sasl-max-buffer-size", "Max buffer size", AttrKind::Int).needs_restart(),
    AttrSpec::read_only(SUPPORTED_MECHS, "Supported mechanisms", AttrKind::List),
];

pub static SETTINGS_SECTIONS: &[AttributeDescriptor] = &[AttributeDescriptor::new("SASL Settings", SETTINGS)];

pub struct SaslSettings;

impl PanelSpec for SaslSettings {
    fn title(&self) -> String {
        "SASL configuration".into()
    }

    fn sections(&self) -> &'static [AttributeDescriptor] {
        SETTINGS_SECTIONS
    }

    fn read_plan(&self) -> Vec<Invocation> {
        vec![
            Invocation::dsconf(["config", "get"]),
            Invocation::dsconf(["sasl", "get-mechs"]),
        ]
    }

    fn parse(&self, outputs: &[JsonValue]) -> Result<AttributeSnapshot, String> {
        let mut snap = super::snapshot_from_first(outputs, SETTINGS_SECTIONS);
        let mechs = outputs
            .get(1)
            .map(items_of)
            .unwrap_or_default()
            .iter()
            .filter_map(|m| m.as_str().map(str::to_string))
            .collect();
        snap.set(SUPPORTED_MECHS, AttrValue::List(mechs));
        Ok(snap)
    }

    fn write_plan(&self, diff: &Diff, _: &AttributeSnapshot, _: &AttributeSnapshot) -> Vec<Invocation> {
        super::args_plan(Invocation::dsconf(["config", "replace"]), diff)
    }
}

pub const MAP_NAME: &str = "cn";
pub const MAP_REGEX: &str = "nssaslmapregexstring";
pub const MAP_BASE: &str = "nssaslmapbasedntemplate";
pub const MAP_FILTER: &str = "nssaslmapfiltertemplate";
pub const MAP_PRIORITY: &str = "nssaslmappriority";

static MAPPING: &[AttrSpec] = &[
    AttrSpec::flag(MAP_NAME, "Mapping name", AttrKind::Text, "--cn"),
    AttrSpec::flag(MAP_REGEX, "Regular expression", AttrKind::Text, "--nsSaslMapRegexString"),
    AttrSpec::flag(MAP_BASE, "Search base DN", AttrKind::Text, "--nsSaslMapBaseDNTemplate"),
    AttrSpec::flag(MAP_FILTER, "Search filter", AttrKind::Text, "--nsSaslMapFilterTemplate"),
    AttrSpec::flag(MAP_PRIORITY, "Priority", AttrKind::Int, "--nsSaslMapPriority").default_value("100"),
];

pub static MAPPING_SECTIONS: &[AttributeDescriptor] = &[AttributeDescriptor::new("SASL Mapping", MAPPING)];

/// Every mapping field is required and the priority is 1..=100.
fn validate_mapping(values: &AttributeSnapshot) -> Vec<FieldError> {
    let mut errors: Vec<FieldError> = MAPPING
        .iter()
        .filter_map(|s| check_required(&values.text(s.name)).map(|m| FieldError::new(s.name, m)))
        .collect();
    if errors.iter().all(|e| e.field != MAP_PRIORITY) {
        if let Some(m) = check_int(&values.text(MAP_PRIORITY), Some(1), Some(100)) {
            errors.push(FieldError::new(MAP_PRIORITY, m));
        }
    }
    errors
}

fn create_invocation(values: &AttributeSnapshot) -> Invocation {
    Invocation::dsconf(["sasl", "create"]).extend([
        format!("--cn={}", values.text(MAP_NAME)),
        format!("--nsSaslMapFilterTemplate={}", values.text(MAP_FILTER)),
        format!("--nsSaslMapRegexString={}", values.text(MAP_REGEX)),
        format!("--nsSaslMapBaseDNTemplate={}", values.text(MAP_BASE)),
        format!("--nsSaslMapPriority={}", values.text(MAP_PRIORITY)),
    ])
}

/// One mapping. The tool cannot modify a mapping in place, so a save
/// deletes it and creates it again under the (possibly new) name.
pub struct SaslMapping {
    pub name: String,
}

impl PanelSpec for SaslMapping {
    fn title(&self) -> String {
        format!("SASL mapping {}", self.name)
    }

    fn sections(&self) -> &'static [AttributeDescriptor] {
        MAPPING_SECTIONS
    }

    fn read_plan(&self) -> Vec<Invocation> {
        vec![Invocation::dsconf(["sasl", "get"]).arg(self.name.clone())]
    }

    fn write_plan(&self, diff: &Diff, _: &AttributeSnapshot, current: &AttributeSnapshot) -> Vec<Invocation> {
        if diff.args.is_empty() {
            return Vec::new();
        }
        vec![
            Invocation::dsconf(["sasl", "delete"]).arg(self.name.clone()),
            create_invocation(current),
        ]
    }

    fn validate(&self, current: &AttributeSnapshot, _: &Diff) -> Vec<FieldError> {
        validate_mapping(current)
    }

    fn identity_attr(&self) -> Option<&'static str> {
        Some(MAP_NAME)
    }

    fn set_identity(&mut self, id: &str) {
        self.name = id.to_string();
    }
}

pub struct MappingCreate;

impl CreateSpec for MappingCreate {
    fn title(&self) -> String {
        "SASL mapping".into()
    }

    fn sections(&self) -> &'static [AttributeDescriptor] {
        MAPPING_SECTIONS
    }

    fn validate(&self, values: &AttributeSnapshot) -> Vec<FieldError> {
        validate_mapping(values)
    }

    fn identity(&self, values: &AttributeSnapshot) -> String {
        values.text(MAP_NAME).trim().to_string()
    }

    fn create_plan(&self, values: &AttributeSnapshot) -> Vec<Invocation> {
        vec![create_invocation(values)]
    }
}

pub fn list_mappings() -> Vec<Invocation> {
    vec![Invocation::dsconf(["sasl", "list", "--details"])]
}

/// Mapping names from `sasl list --details`, which also accepts a plain
/// list of names.
pub fn parse_mapping_list(v: &JsonValue) -> Vec<String> {
    items_of(v)
        .iter()
        .filter_map(|item| match item {
            JsonValue::String(s) => Some(s.clone()),
            other => first_attr(other, MAP_NAME),
        })
        .collect()
}

pub fn delete_mapping(name: &str) -> Vec<Invocation> {
    vec![Invocation::dsconf(["sasl", "delete"]).arg(name)]
}

/// Match `sample` against a mapping regex. Escaped parentheses are the
/// server's group syntax and are unescaped first.
pub fn regex_test(pattern: &str, sample: &str) -> Result<bool, String> {
    let cleaned = pattern.replace("\\(", "(").replace("\\)", ")");
    let re = Regex::new(&cleaned).map_err(|e| format!("Invalid regular expression: {e}"))?;
    Ok(re.is_match(sample))
}
