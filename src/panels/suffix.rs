//! Suffixes: the backend tree, per-suffix settings and lifecycle.

use super::{CreateSpec, FieldError, PanelSpec};
use crate::attrs::diff::{AttrKind, AttrSpec, AttributeDescriptor, Diff};
use crate::attrs::{AttrValue, AttributeSnapshot};
use crate::services::cli_runner::Invocation;
use crate::services::loader::{first_attr, items_of};
use crate::validate::{check_dn, check_required};
use serde_json::Value as JsonValue;

pub const INDEXES: &str = "indexes";
pub const VLV_INDEXES: &str = "vlv_indexes";
pub const ENCRYPTED: &str = "encrypted_attrs";

static SETTINGS: &[AttrSpec] = &[
    AttrSpec::flag("nsslapd-cachememsize", "Entry cache size (bytes)", AttrKind::Int, "--cache-memsize"),
    AttrSpec::flag("nsslapd-cachesize", "Entry cache max entries", AttrKind::Int, "--cache-size"),
    AttrSpec::flag("nsslapd-dncachememsize", "DN cache size (bytes)", AttrKind::Int, "--dncache-memsize"),
    AttrSpec::toggle("nsslapd-readonly", "Read-only", "--enable-readonly", "--disable-readonly"),
    AttrSpec::toggle("nsslapd-require-index", "Reject unindexed searches", "--require-index", "--ignore-index"),
];

static INDEXING: &[AttrSpec] = &[
    AttrSpec::read_only(INDEXES, "Indexes", AttrKind::List),
    AttrSpec::read_only(VLV_INDEXES, "VLV indexes", AttrKind::List),
    AttrSpec::read_only(ENCRYPTED, "Encrypted attributes", AttrKind::List),
];

pub static SECTIONS: &[AttributeDescriptor] = &[
    AttributeDescriptor::new("Suffix Settings", SETTINGS),
    AttributeDescriptor::new("Indexes & Encryption", INDEXING),
];

/// Name of a list row: a plain string or the first `cn` of an entry.
fn row_name(item: &JsonValue) -> Option<String> {
    match item {
        JsonValue::String(s) => Some(s.clone()),
        other => first_attr(other, "cn"),
    }
}

fn index_label(item: &JsonValue) -> Option<String> {
    let name = row_name(item)?;
    let types = item
        .get("attrs")
        .and_then(|a| a.get("nsindextype"))
        .and_then(|t| t.as_array())
        .map(|t| t.iter().filter_map(|x| x.as_str()).collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    Some(if types.is_empty() { name } else { format!("{name}: {types}") })
}

pub struct Suffix {
    pub dn: String,
}

impl PanelSpec for Suffix {
    fn title(&self) -> String {
        format!("suffix {}", self.dn)
    }

    fn sections(&self) -> &'static [AttributeDescriptor] {
        SECTIONS
    }

    /// Settings, then indexes, VLV indexes and encrypted attributes.
    fn read_plan(&self) -> Vec<Invocation> {
        let dn = self.dn.clone();
        vec![
            Invocation::dsconf(["backend", "suffix", "get"]).arg(dn.clone()),
            Invocation::dsconf(["backend", "index", "list"]).arg(dn.clone()),
            Invocation::dsconf(["backend", "vlv-index", "list"]).arg(dn.clone()),
            Invocation::dsconf(["backend", "attr-encrypt", "--list", "--just-names"]).arg(dn),
        ]
    }

    fn parse(&self, outputs: &[JsonValue]) -> Result<AttributeSnapshot, String> {
        if outputs.len() < 4 {
            return Err(format!("incomplete suffix data for {}", self.dn));
        }
        let mut snap = super::snapshot_from_first(outputs, SECTIONS);
        let indexes = items_of(&outputs[1]).iter().filter_map(index_label).collect();
        let vlv = items_of(&outputs[2]).iter().filter_map(row_name).collect();
        let encrypted = items_of(&outputs[3]).iter().filter_map(row_name).collect();
        snap.set(INDEXES, AttrValue::List(indexes));
        snap.set(VLV_INDEXES, AttrValue::List(vlv));
        snap.set(ENCRYPTED, AttrValue::List(encrypted));
        Ok(snap)
    }

    fn write_plan(&self, diff: &Diff, _: &AttributeSnapshot, _: &AttributeSnapshot) -> Vec<Invocation> {
        super::args_plan(
            Invocation::dsconf(["backend", "suffix", "set"]).arg(self.dn.clone()),
            diff,
        )
    }
}

pub fn delete_suffix(dn: &str) -> Vec<Invocation> {
    vec![Invocation::dsconf(["backend", "delete"]).arg(dn)]
}

pub fn reindex_suffix(dn: &str) -> Vec<Invocation> {
    vec![Invocation::dsconf(["backend", "index", "reindex", "--wait"]).arg(dn)]
}

pub fn load_tree() -> Vec<Invocation> {
    vec![Invocation::dsconf(["backend", "get-tree"])]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Suffix,
    SubSuffix,
    DbLink,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuffixNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub depth: usize,
}

/// Depth-first flattening of `backend get-tree`.
pub fn flatten_tree(v: &JsonValue) -> Vec<SuffixNode> {
    let mut out = Vec::new();
    for node in items_of(v) {
        walk(&node, 0, &mut out);
    }
    out
}

fn walk(node: &JsonValue, depth: usize, out: &mut Vec<SuffixNode>) {
    let text = |k: &str| node.get(k).and_then(|x| x.as_str()).unwrap_or("").to_string();
    let id = text("id");
    if id.is_empty() {
        return;
    }
    let kind = match text("type").as_str() {
        "dblink" => NodeKind::DbLink,
        "subsuffix" => NodeKind::SubSuffix,
        _ => NodeKind::Suffix,
    };
    let label = match text("text") {
        t if t.is_empty() => id.clone(),
        t => t,
    };
    out.push(SuffixNode {
        id,
        label,
        kind,
        depth,
    });
    if let Some(children) = node.get("nodes").and_then(|n| n.as_array()) {
        for child in children {
            walk(child, depth + 1, out);
        }
    }
}

pub const BE_NAME: &str = "be_name";
pub const SUFFIX_DN: &str = "suffix_dn";
pub const CREATE_ENTRIES: &str = "create_entries";
pub const CREATE_SUFFIX: &str = "create_suffix";

static ROOT_FIELDS: &[AttrSpec] = &[
    AttrSpec::local(SUFFIX_DN, "Suffix DN", AttrKind::Text),
    AttrSpec::local(BE_NAME, "Backend name", AttrKind::Text),
    AttrSpec::local(CREATE_SUFFIX, "Create the top suffix entry", AttrKind::Bool),
    AttrSpec::local(CREATE_ENTRIES, "Add sample entries", AttrKind::Bool),
];

static SUB_FIELDS: &[AttrSpec] = &[
    AttrSpec::local(SUFFIX_DN, "Sub-suffix RDN", AttrKind::Text),
    AttrSpec::local(BE_NAME, "Backend name", AttrKind::Text),
];

static ROOT_SECTIONS: &[AttributeDescriptor] = &[AttributeDescriptor::new("New Suffix", ROOT_FIELDS)];
static SUB_SECTIONS: &[AttributeDescriptor] = &[AttributeDescriptor::new("New Sub-Suffix", SUB_FIELDS)];

/// A root suffix, or a sub-suffix when `parent` is set.
pub struct SuffixCreate {
    pub parent: Option<String>,
}

impl CreateSpec for SuffixCreate {
    fn title(&self) -> String {
        match &self.parent {
            Some(p) => format!("sub-suffix of {p}"),
            None => "suffix".into(),
        }
    }

    fn sections(&self) -> &'static [AttributeDescriptor] {
        if self.parent.is_some() {
            SUB_SECTIONS
        } else {
            ROOT_SECTIONS
        }
    }

    fn validate(&self, values: &AttributeSnapshot) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(m) = check_required(&values.text(BE_NAME)) {
            errors.push(FieldError::new(BE_NAME, m));
        } else if values.text(BE_NAME).contains(char::is_whitespace) {
            errors.push(FieldError::new(BE_NAME, "Must not contain spaces"));
        }
        if let Some(m) = check_dn(&values.text(SUFFIX_DN)) {
            errors.push(FieldError::new(SUFFIX_DN, m));
        }
        errors
    }

    fn identity(&self, values: &AttributeSnapshot) -> String {
        let dn = values.text(SUFFIX_DN).trim().to_string();
        match &self.parent {
            Some(p) => format!("{dn},{p}"),
            None => dn,
        }
    }

    fn create_plan(&self, values: &AttributeSnapshot) -> Vec<Invocation> {
        let inv = Invocation::dsconf(["backend", "create", "--be-name"]).arg(values.text(BE_NAME));
        let inv = match &self.parent {
            Some(p) => inv.extend([
                format!("--suffix={}", self.identity(values)),
                format!("--parent-suffix={p}"),
            ]),
            None => {
                let mut inv = inv.arg("--suffix").arg(self.identity(values));
                if values.flag(CREATE_ENTRIES) {
                    inv = inv.arg("--create-entries");
                }
                if values.flag(CREATE_SUFFIX) {
                    inv = inv.arg("--create-suffix");
                }
                inv
            }
        };
        vec![inv]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panels::{CreateDraft, Panel, SaveStart};
    use serde_json::json;

    fn outputs() -> Vec<JsonValue> {
        vec![
            json!({"attrs": {
                "nsslapd-cachememsize": ["512000"],
                "nsslapd-cachesize": ["-1"],
                "nsslapd-readonly": ["off"],
                "nsslapd-require-index": ["off"],
            }}),
            json!({"items": [
                {"attrs": {"cn": ["uid"], "nsindextype": ["eq", "pres"]}},
                {"attrs": {"cn": ["entryrdn"], "nsindextype": ["subtree"]}},
            ]}),
            json!({"items": []}),
            json!({"items": ["userPassword"]}),
        ]
    }

    #[test]
    fn pipeline_outputs_merge_into_one_snapshot() {
        let s = Suffix { dn: "dc=example,dc=com".into() };
        assert_eq!(s.read_plan().len(), 4);
        let snap = s.parse(&outputs()).unwrap();
        assert_eq!(snap.list(INDEXES), vec!["uid: eq pres", "entryrdn: subtree"]);
        assert_eq!(snap.list(ENCRYPTED), vec!["userPassword"]);
        assert!(s.parse(&outputs()[..2]).is_err());
    }

    #[test]
    fn readonly_uses_toggle_flags() {
        let mut p = Panel::new(Box::new(Suffix { dn: "dc=example,dc=com".into() }));
        p.begin_load();
        p.finish_load(Ok(outputs()));
        assert!(!p.set_text(INDEXES, "x"));
        p.toggle("nsslapd-readonly");
        p.set_text("nsslapd-cachesize", "10000");
        let SaveStart::Run(plan) = p.begin_save() else {
            panic!("expected a plan");
        };
        assert_eq!(
            plan[0].args,
            vec![
                "backend",
                "suffix",
                "set",
                "dc=example,dc=com",
                "--cache-size=10000",
                "--enable-readonly",
            ]
        );
    }

    #[test]
    fn tree_flattens_depth_first() {
        let tree = json!([
            {"id": "dc=example,dc=com", "text": "dc=example,dc=com", "type": "suffix", "be": "userroot", "nodes": [
                {"id": "ou=remote,dc=example,dc=com", "text": "ou=remote,dc=example,dc=com", "type": "dblink", "be": "link1", "nodes": []},
                {"id": "ou=sub,dc=example,dc=com", "text": "ou=sub,dc=example,dc=com", "type": "subsuffix", "be": "sub"},
            ]},
            {"id": "o=other", "text": "o=other", "type": "suffix", "be": "other"},
        ]);
        let rows = flatten_tree(&tree);
        let kinds: Vec<_> = rows.iter().map(|r| (r.kind, r.depth)).collect();
        assert_eq!(
            kinds,
            vec![
                (NodeKind::Suffix, 0),
                (NodeKind::DbLink, 1),
                (NodeKind::SubSuffix, 1),
                (NodeKind::Suffix, 0),
            ]
        );
        assert!(flatten_tree(&JsonValue::Null).is_empty());
    }

    #[test]
    fn root_create_flags() {
        let mut draft = CreateDraft::new(Box::new(SuffixCreate { parent: None }));
        draft.set_text(SUFFIX_DN, "dc=example,dc=org");
        draft.set_text(BE_NAME, "example");
        draft.toggle(CREATE_SUFFIX);
        let (id, plan) = draft.submit().unwrap();
        assert_eq!(id, "dc=example,dc=org");
        assert_eq!(
            plan[0].args,
            vec!["backend", "create", "--be-name", "example", "--suffix", "dc=example,dc=org", "--create-suffix"]
        );
    }

    #[test]
    fn sub_suffix_names_its_parent() {
        let mut draft = CreateDraft::new(Box::new(SuffixCreate {
            parent: Some("dc=example,dc=com".into()),
        }));
        draft.set_text(SUFFIX_DN, "ou=sales");
        draft.set_text(BE_NAME, "bad name");
        assert!(draft.submit().is_err());
        draft.set_text(BE_NAME, "sales");
        let (id, plan) = draft.submit().unwrap();
        assert_eq!(id, "ou=sales,dc=example,dc=com");
        assert!(plan[0].has_arg("--parent-suffix=dc=example,dc=com"));
    }
}
