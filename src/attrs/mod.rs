pub mod diff;

use diff::{AttrKind, AttrSpec, AttributeDescriptor};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttrValue {
    Text(String),
    Bool(bool),
    List(Vec<String>),
}

impl AttrValue {
    /// Build a value of `kind` from the tool's textual form.
    pub fn parse(kind: AttrKind, raw: &str) -> Self {
        match kind {
            AttrKind::Bool => AttrValue::Bool(parse_on_off(raw)),
            AttrKind::List => AttrValue::List(split_list(raw)),
            AttrKind::Text | AttrKind::Int | AttrKind::Secret => AttrValue::Text(raw.to_string()),
        }
    }

    /// Command-line rendering: `on`/`off`, lists joined by one space.
    pub fn render(&self) -> String {
        match self {
            AttrValue::Text(s) => s.clone(),
            AttrValue::Bool(b) => on_off(*b).to_string(),
            AttrValue::List(items) => items.join(" "),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            AttrValue::Bool(b) => *b,
            AttrValue::Text(s) => parse_on_off(s),
            AttrValue::List(items) => items.first().map(|s| parse_on_off(s)).unwrap_or(false),
        }
    }
}

pub fn on_off(b: bool) -> &'static str {
    if b {
        "on"
    } else {
        "off"
    }
}

pub fn parse_on_off(raw: &str) -> bool {
    let t = raw.trim();
    t.eq_ignore_ascii_case("on") || t.eq_ignore_ascii_case("true")
}

/// Split a multi-valued attribute on commas and whitespace, dropping empties.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Attribute name -> value for one panel instance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeSnapshot {
    values: BTreeMap<String, AttrValue>,
}

impl AttributeSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: AttrValue) {
        self.values.insert(name.into(), value);
    }

    #[cfg(test)]
    pub fn with(mut self, name: &str, value: AttrValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn text(&self, name: &str) -> String {
        self.values.get(name).map(AttrValue::render).unwrap_or_default()
    }

    pub fn flag(&self, name: &str) -> bool {
        self.values.get(name).map(AttrValue::as_bool).unwrap_or(false)
    }

    pub fn list(&self, name: &str) -> Vec<String> {
        match self.values.get(name) {
            Some(AttrValue::List(items)) => items.clone(),
            Some(other) => split_list(&other.render()),
            None => Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fill every attribute named by `sections` from a `{"attrs": {...}}`
    /// document. Missing attributes take the spec's default.
    pub fn from_attrs(doc: &JsonValue, sections: &[AttributeDescriptor]) -> Self {
        let attrs = doc.get("attrs").unwrap_or(doc);
        let mut snap = Self::new();
        for spec in sections.iter().flat_map(|d| d.attrs.iter()) {
            snap.set(spec.name, value_from_json(attrs, spec));
        }
        snap
    }
}

fn lookup<'a>(attrs: &'a JsonValue, name: &str) -> Option<&'a JsonValue> {
    attrs.get(name).or_else(|| {
        // dsconf lower-cases keys, schema spellings may not be
        let lower = name.to_ascii_lowercase();
        attrs.as_object().and_then(|m| {
            m.iter()
                .find(|(k, _)| k.to_ascii_lowercase() == lower)
                .map(|(_, v)| v)
        })
    })
}

fn json_scalar(v: &JsonValue) -> Option<String> {
    match v {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(on_off(*b).to_string()),
        _ => None,
    }
}

pub(crate) fn value_from_json(attrs: &JsonValue, spec: &AttrSpec) -> AttrValue {
    let raw: Vec<String> = match lookup(attrs, spec.name) {
        Some(JsonValue::Array(items)) => items.iter().filter_map(json_scalar).collect(),
        Some(v) => json_scalar(v).into_iter().collect(),
        None => Vec::new(),
    };
    if raw.is_empty() {
        return AttrValue::parse(spec.kind, spec.default);
    }
    match spec.kind {
        AttrKind::List => AttrValue::List(raw.iter().flat_map(|s| split_list(s)).collect()),
        kind => AttrValue::parse(kind, &raw[0]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bool_round_trip() {
        for b in [true, false] {
            let encoded = AttrValue::Bool(b).render();
            assert_eq!(encoded, if b { "on" } else { "off" });
            assert_eq!(AttrValue::parse(AttrKind::Bool, &encoded), AttrValue::Bool(b));
        }
        assert!(parse_on_off("TRUE"));
        assert!(parse_on_off(" On "));
        assert!(!parse_on_off("yes"));
    }

    #[test]
    fn list_split_accepts_both_separators() {
        assert_eq!(split_list("uid, cn  mail,,sn"), vec!["uid", "cn", "mail", "sn"]);
        assert!(split_list("  ").is_empty());
    }

    #[test]
    fn snapshot_from_attrs_uses_first_value_and_defaults() {
        static SPECS: &[AttrSpec] = &[
            AttrSpec::flag("nsslapd-cachesize", "Entries", AttrKind::Int, "--cache-size"),
            AttrSpec::flag("nsslapd-readonly", "Read-only", AttrKind::Bool, "--readonly"),
            AttrSpec::flag("passworduserattributes", "User attrs", AttrKind::List, "--pwduserattrs"),
            AttrSpec::flag("passwordminage", "Min age", AttrKind::Int, "--pwdminage").default_value("0"),
        ];
        static SECTIONS: &[AttributeDescriptor] = &[AttributeDescriptor::new("s", SPECS)];
        let doc = json!({"attrs": {
            "nsslapd-cachesize": ["-1", "ignored"],
            "nsslapd-readonly": ["on"],
            "passworduserattributes": ["uid,cn", "mail"]
        }});
        let snap = AttributeSnapshot::from_attrs(&doc, SECTIONS);
        assert_eq!(snap.text("nsslapd-cachesize"), "-1");
        assert!(snap.flag("nsslapd-readonly"));
        assert_eq!(snap.list("passworduserattributes"), vec!["uid", "cn", "mail"]);
        assert_eq!(snap.text("passwordminage"), "0");
        assert_eq!(snap.len(), 4);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        static SPECS: &[AttrSpec] = &[AttrSpec::assign("nsslapd-pwpolicy-local", "Local", AttrKind::Bool)];
        static SECTIONS: &[AttributeDescriptor] = &[AttributeDescriptor::new("s", SPECS)];
        let doc = json!({"attrs": {"nsslapd-pwpolicy-Local": ["on"]}});
        assert!(AttributeSnapshot::from_attrs(&doc, SECTIONS).flag("nsslapd-pwpolicy-local"));
    }
}
