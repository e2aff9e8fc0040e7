//! One-shot operations against a suffix: LDIF export and import, index,
//! VLV search and attribute encryption maintenance.
//!
//! Each task is a small form submitted through [`super::CreateDraft`]; the
//! draft's identity is the suffix the plan targets.

use super::{CreateSpec, FieldError};
use crate::attrs::diff::{AttrKind, AttrSpec, AttributeDescriptor};
use crate::attrs::AttributeSnapshot;
use crate::services::cli_runner::Invocation;
use crate::validate::{check_dn, check_required};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SuffixTask {
    ExportLdif,
    ImportLdif,
    AddIndex,
    DeleteIndex,
    AddVlvSearch,
    DeleteVlvSearch,
    EncryptAttr,
    DecryptAttr,
}

impl SuffixTask {
    pub const ALL: [SuffixTask; 8] = [
        SuffixTask::ExportLdif,
        SuffixTask::ImportLdif,
        SuffixTask::AddIndex,
        SuffixTask::DeleteIndex,
        SuffixTask::AddVlvSearch,
        SuffixTask::DeleteVlvSearch,
        SuffixTask::EncryptAttr,
        SuffixTask::DecryptAttr,
    ];

    /// Offered on the backups page, where the suffix is a form field.
    pub const LDIF: [SuffixTask; 2] = [SuffixTask::ExportLdif, SuffixTask::ImportLdif];

    pub fn label(self) -> &'static str {
        match self {
            SuffixTask::ExportLdif => "Export to LDIF",
            SuffixTask::ImportLdif => "Import LDIF",
            SuffixTask::AddIndex => "Add index",
            SuffixTask::DeleteIndex => "Delete index",
            SuffixTask::AddVlvSearch => "Add VLV search",
            SuffixTask::DeleteVlvSearch => "Delete VLV search",
            SuffixTask::EncryptAttr => "Encrypt attribute",
            SuffixTask::DecryptAttr => "Stop encrypting attribute",
        }
    }

    /// Index, VLV and encryption lists shown on the suffix page change.
    pub fn changes_suffix(self) -> bool {
        !matches!(self, SuffixTask::ExportLdif | SuffixTask::ImportLdif)
    }

    /// A new file shows up in the LDIF table.
    pub fn changes_ldifs(self) -> bool {
        self == SuffixTask::ExportLdif
    }
}

pub const TASK_SUFFIX: &str = "task_suffix";
pub const LDIF_NAME: &str = "ldif_name";
pub const LDIF_ENCRYPTED: &str = "ldif_encrypted";
pub const INDEX_ATTR: &str = "index_attr";
pub const MATCHING_RULES: &str = "matching_rules";
pub const REINDEX: &str = "reindex";
pub const VLV_NAME: &str = "vlv_name";
pub const VLV_BASE: &str = "vlv_base";
pub const VLV_FILTER: &str = "vlv_filter";
pub const VLV_SCOPE: &str = "vlv_scope";
pub const VLV_SORTS: &str = "vlv_sorts";

const INDEX_TYPES: [(&str, &str); 4] = [
    ("index_eq", "eq"),
    ("index_pres", "pres"),
    ("index_sub", "sub"),
    ("index_approx", "approx"),
];

static EXPORT: &[AttrSpec] = &[
    AttrSpec::local(LDIF_NAME, "LDIF file name", AttrKind::Text),
    AttrSpec::local(LDIF_ENCRYPTED, "Decrypt encrypted attributes", AttrKind::Bool).default_value("on"),
];

static EXPORT_ANY: &[AttrSpec] = &[
    AttrSpec::local(TASK_SUFFIX, "Suffix", AttrKind::Text),
    AttrSpec::local(LDIF_NAME, "LDIF file name", AttrKind::Text),
    AttrSpec::local(LDIF_ENCRYPTED, "Decrypt encrypted attributes", AttrKind::Bool).default_value("on"),
];

static IMPORT: &[AttrSpec] = &[
    AttrSpec::local(LDIF_NAME, "LDIF file", AttrKind::Text),
    AttrSpec::local(LDIF_ENCRYPTED, "Encrypt configured attributes", AttrKind::Bool).default_value("on"),
];

static IMPORT_ANY: &[AttrSpec] = &[
    AttrSpec::local(TASK_SUFFIX, "Suffix", AttrKind::Text),
    AttrSpec::local(LDIF_NAME, "LDIF file", AttrKind::Text),
    AttrSpec::local(LDIF_ENCRYPTED, "Encrypt configured attributes", AttrKind::Bool).default_value("on"),
];

static ADD_INDEX: &[AttrSpec] = &[
    AttrSpec::local(INDEX_ATTR, "Attribute", AttrKind::Text),
    AttrSpec::local("index_eq", "Equality", AttrKind::Bool).default_value("on"),
    AttrSpec::local("index_pres", "Presence", AttrKind::Bool),
    AttrSpec::local("index_sub", "Substring", AttrKind::Bool),
    AttrSpec::local("index_approx", "Approximate", AttrKind::Bool),
    AttrSpec::local(MATCHING_RULES, "Matching rules", AttrKind::List),
    AttrSpec::local(REINDEX, "Reindex after adding", AttrKind::Bool),
];

static ATTR_ONLY: &[AttrSpec] = &[AttrSpec::local(INDEX_ATTR, "Attribute", AttrKind::Text)];

static ADD_VLV: &[AttrSpec] = &[
    AttrSpec::local(VLV_NAME, "Search name", AttrKind::Text),
    AttrSpec::local(VLV_BASE, "Search base", AttrKind::Text),
    AttrSpec::local(VLV_FILTER, "Search filter", AttrKind::Text).default_value("(objectClass=*)"),
    AttrSpec::local(VLV_SCOPE, "Scope (base, one, subtree)", AttrKind::Text).default_value("subtree"),
    AttrSpec::local(VLV_SORTS, "Sort attributes (one index each)", AttrKind::List),
    AttrSpec::local(REINDEX, "Build the indexes now", AttrKind::Bool),
];

static VLV_NAME_ONLY: &[AttrSpec] = &[AttrSpec::local(VLV_NAME, "Search name", AttrKind::Text)];

static EXPORT_SECTIONS: &[AttributeDescriptor] = &[AttributeDescriptor::new("Export to LDIF", EXPORT)];
static EXPORT_ANY_SECTIONS: &[AttributeDescriptor] = &[AttributeDescriptor::new("Export to LDIF", EXPORT_ANY)];
static IMPORT_SECTIONS: &[AttributeDescriptor] = &[AttributeDescriptor::new("Import LDIF", IMPORT)];
static IMPORT_ANY_SECTIONS: &[AttributeDescriptor] = &[AttributeDescriptor::new("Import LDIF", IMPORT_ANY)];
static ADD_INDEX_SECTIONS: &[AttributeDescriptor] = &[AttributeDescriptor::new("New Index", ADD_INDEX)];
static DELETE_INDEX_SECTIONS: &[AttributeDescriptor] = &[AttributeDescriptor::new("Delete Index", ATTR_ONLY)];
static ADD_VLV_SECTIONS: &[AttributeDescriptor] = &[AttributeDescriptor::new("New VLV Search", ADD_VLV)];
static DELETE_VLV_SECTIONS: &[AttributeDescriptor] = &[AttributeDescriptor::new("Delete VLV Search", VLV_NAME_ONLY)];
static ENCRYPT_SECTIONS: &[AttributeDescriptor] = &[AttributeDescriptor::new("Encrypt Attribute", ATTR_ONLY)];
static DECRYPT_SECTIONS: &[AttributeDescriptor] =
    &[AttributeDescriptor::new("Stop Encrypting Attribute", ATTR_ONLY)];

/// Scope name to the numeric value `vlv-index` expects.
fn scope_value(scope: &str) -> Option<&'static str> {
    match scope.trim().to_ascii_lowercase().as_str() {
        "base" => Some("0"),
        "one" | "onelevel" => Some("1"),
        "sub" | "subtree" => Some("2"),
        _ => None,
    }
}

/// A task form. Without a fixed `suffix` the form asks for one.
pub struct TaskForm {
    pub task: SuffixTask,
    pub suffix: Option<String>,
}

impl TaskForm {
    pub fn on(task: SuffixTask, suffix: impl Into<String>) -> Self {
        Self {
            task,
            suffix: Some(suffix.into()),
        }
    }

    pub fn any_suffix(task: SuffixTask) -> Self {
        Self { task, suffix: None }
    }

    fn target(&self, values: &AttributeSnapshot) -> String {
        match &self.suffix {
            Some(s) => s.clone(),
            None => values.text(TASK_SUFFIX).trim().to_string(),
        }
    }
}

fn required(values: &AttributeSnapshot, names: &[&'static str]) -> Vec<FieldError> {
    names
        .iter()
        .filter_map(|n| check_required(&values.text(n)).map(|m| FieldError::new(*n, m)))
        .collect()
}

impl CreateSpec for TaskForm {
    fn title(&self) -> String {
        match &self.suffix {
            Some(s) => format!("{} ({s})", self.task.label()),
            None => self.task.label().to_string(),
        }
    }

    fn sections(&self) -> &'static [AttributeDescriptor] {
        let fixed = self.suffix.is_some();
        match self.task {
            SuffixTask::ExportLdif if fixed => EXPORT_SECTIONS,
            SuffixTask::ExportLdif => EXPORT_ANY_SECTIONS,
            SuffixTask::ImportLdif if fixed => IMPORT_SECTIONS,
            SuffixTask::ImportLdif => IMPORT_ANY_SECTIONS,
            SuffixTask::AddIndex => ADD_INDEX_SECTIONS,
            SuffixTask::DeleteIndex => DELETE_INDEX_SECTIONS,
            SuffixTask::AddVlvSearch => ADD_VLV_SECTIONS,
            SuffixTask::DeleteVlvSearch => DELETE_VLV_SECTIONS,
            SuffixTask::EncryptAttr => ENCRYPT_SECTIONS,
            SuffixTask::DecryptAttr => DECRYPT_SECTIONS,
        }
    }

    fn validate(&self, values: &AttributeSnapshot) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.suffix.is_none() {
            if let Some(m) = check_dn(&values.text(TASK_SUFFIX)) {
                errors.push(FieldError::new(TASK_SUFFIX, m));
            }
        }
        match self.task {
            SuffixTask::ExportLdif | SuffixTask::ImportLdif => {
                errors.extend(required(values, &[LDIF_NAME]));
            }
            SuffixTask::AddIndex => {
                errors.extend(required(values, &[INDEX_ATTR]));
                let any_type = INDEX_TYPES.iter().any(|(name, _)| values.flag(name));
                if !any_type {
                    errors.push(FieldError::new("index_eq", "Choose at least one index type"));
                }
            }
            SuffixTask::DeleteIndex | SuffixTask::EncryptAttr | SuffixTask::DecryptAttr => {
                errors.extend(required(values, &[INDEX_ATTR]));
            }
            SuffixTask::AddVlvSearch => {
                errors.extend(required(values, &[VLV_NAME, VLV_FILTER]));
                if let Some(m) = check_dn(&values.text(VLV_BASE)) {
                    errors.push(FieldError::new(VLV_BASE, m));
                }
                if scope_value(&values.text(VLV_SCOPE)).is_none() {
                    errors.push(FieldError::new(VLV_SCOPE, "Must be base, one or subtree"));
                }
                if values.list(VLV_SORTS).is_empty() {
                    errors.push(FieldError::new(VLV_SORTS, "Required"));
                }
            }
            SuffixTask::DeleteVlvSearch => errors.extend(required(values, &[VLV_NAME])),
        }
        errors
    }

    fn identity(&self, values: &AttributeSnapshot) -> String {
        self.target(values)
    }

    fn create_plan(&self, values: &AttributeSnapshot) -> Vec<Invocation> {
        let suffix = self.target(values);
        let attr = || format!("--attr={}", values.text(INDEX_ATTR).trim());
        let backend = |cmd: &[&str]| Invocation::dsconf(["backend"]).extend(cmd.iter().copied());
        match self.task {
            SuffixTask::ExportLdif => {
                let inv = backend(&["export"])
                    .arg(suffix)
                    .arg(format!("--ldif={}", values.text(LDIF_NAME).trim()));
                vec![if values.flag(LDIF_ENCRYPTED) { inv.arg("--encrypted") } else { inv }]
            }
            SuffixTask::ImportLdif => {
                let inv = backend(&["import"]).arg(suffix).arg(values.text(LDIF_NAME).trim());
                vec![if values.flag(LDIF_ENCRYPTED) { inv.arg("--encrypted") } else { inv }]
            }
            SuffixTask::AddIndex => {
                let mut inv = backend(&["index", "add"]).arg(attr()).arg(suffix);
                for (name, kind) in INDEX_TYPES {
                    if values.flag(name) {
                        inv = inv.arg(format!("--index-type={kind}"));
                    }
                }
                for rule in values.list(MATCHING_RULES) {
                    inv = inv.arg(format!("--matching-rule={rule}"));
                }
                if values.flag(REINDEX) {
                    inv = inv.arg("--reindex");
                }
                vec![inv]
            }
            SuffixTask::DeleteIndex => vec![backend(&["index", "delete"]).arg(attr()).arg(suffix)],
            SuffixTask::AddVlvSearch => {
                let name = values.text(VLV_NAME).trim().to_string();
                let scope = scope_value(&values.text(VLV_SCOPE)).unwrap_or("2");
                let mut steps = vec![backend(&["vlv-index", "add-search"]).extend([
                    format!("--name={name}"),
                    format!("--search-base={}", values.text(VLV_BASE).trim()),
                    format!("--search-filter={}", values.text(VLV_FILTER).trim()),
                    format!("--search-scope={scope}"),
                    suffix.clone(),
                ])];
                for sort in values.list(VLV_SORTS) {
                    let inv = backend(&["vlv-index", "add-index"]).extend([
                        format!("--parent-name={name}"),
                        format!("--index-name={name} - {sort}"),
                        format!("--sort={sort}"),
                        suffix.clone(),
                    ]);
                    steps.push(if values.flag(REINDEX) { inv.arg("--index") } else { inv });
                }
                steps
            }
            SuffixTask::DeleteVlvSearch => vec![backend(&["vlv-index", "del-search"])
                .arg(format!("--name={}", values.text(VLV_NAME).trim()))
                .arg(suffix)],
            SuffixTask::EncryptAttr => vec![backend(&["attr-encrypt"])
                .arg(format!("--add-attr={}", values.text(INDEX_ATTR).trim()))
                .arg(suffix)],
            SuffixTask::DecryptAttr => vec![backend(&["attr-encrypt"])
                .arg(format!("--del-attr={}", values.text(INDEX_ATTR).trim()))
                .arg(suffix)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panels::CreateDraft;

    const SUFFIX: &str = "dc=example,dc=com";

    fn draft(task: SuffixTask) -> CreateDraft {
        CreateDraft::new(Box::new(TaskForm::on(task, SUFFIX)))
    }

    #[test]
    fn export_names_suffix_and_file() {
        let mut d = draft(SuffixTask::ExportLdif);
        assert!(d.submit().is_err());
        d.set_text(LDIF_NAME, "example-2024.ldif");
        let (id, plan) = d.submit().unwrap();
        assert_eq!(id, SUFFIX);
        assert_eq!(
            plan[0].args,
            vec!["backend", "export", SUFFIX, "--ldif=example-2024.ldif", "--encrypted"]
        );
    }

    #[test]
    fn import_from_backups_page_asks_for_the_suffix() {
        let mut d = CreateDraft::new(Box::new(TaskForm::any_suffix(SuffixTask::ImportLdif)));
        d.set_text(LDIF_NAME, "/var/lib/dirsrv/slapd-ldap1/ldif/example.ldif");
        d.toggle(LDIF_ENCRYPTED);
        let errors = d.submit().unwrap_err();
        assert_eq!(errors[0].field, TASK_SUFFIX);
        d.set_text(TASK_SUFFIX, SUFFIX);
        let (id, plan) = d.submit().unwrap();
        assert_eq!(id, SUFFIX);
        assert_eq!(
            plan[0].args,
            vec!["backend", "import", SUFFIX, "/var/lib/dirsrv/slapd-ldap1/ldif/example.ldif"]
        );
    }

    #[test]
    fn add_index_lists_types_rules_and_reindex() {
        let mut d = draft(SuffixTask::AddIndex);
        d.set_text(INDEX_ATTR, "mail");
        d.toggle("index_sub");
        d.set_text(MATCHING_RULES, "caseIgnoreIA5Match");
        d.toggle(REINDEX);
        let (_, plan) = d.submit().unwrap();
        assert_eq!(
            plan[0].args,
            vec![
                "backend",
                "index",
                "add",
                "--attr=mail",
                SUFFIX,
                "--index-type=eq",
                "--index-type=sub",
                "--matching-rule=caseIgnoreIA5Match",
                "--reindex",
            ]
        );
    }

    #[test]
    fn add_index_needs_a_type() {
        let mut d = draft(SuffixTask::AddIndex);
        d.set_text(INDEX_ATTR, "mail");
        d.toggle("index_eq");
        let errors = d.submit().unwrap_err();
        assert_eq!(errors[0].field, "index_eq");
    }

    #[test]
    fn vlv_search_adds_one_index_per_sort() {
        let mut d = draft(SuffixTask::AddVlvSearch);
        d.set_text(VLV_NAME, "people");
        d.set_text(VLV_BASE, "ou=people,dc=example,dc=com");
        d.set_text(VLV_SCOPE, "one");
        d.set_text(VLV_SORTS, "cn sn");
        let (_, plan) = d.submit().unwrap();
        assert_eq!(plan.len(), 3);
        assert!(plan[0].has_arg("--search-scope=1"));
        assert!(plan[0].has_arg("--search-filter=(objectClass=*)"));
        assert_eq!(
            plan[2].args,
            vec![
                "backend",
                "vlv-index",
                "add-index",
                "--parent-name=people",
                "--index-name=people - sn",
                "--sort=sn",
                SUFFIX,
            ]
        );

        d.submitting = false;
        d.set_text(VLV_SCOPE, "everything");
        assert_eq!(d.submit().unwrap_err()[0].field, VLV_SCOPE);
    }

    #[test]
    fn attribute_tasks_use_the_attribute_flag() {
        for (task, expected) in [
            (SuffixTask::DeleteIndex, vec!["backend", "index", "delete", "--attr=cn", SUFFIX]),
            (SuffixTask::EncryptAttr, vec!["backend", "attr-encrypt", "--add-attr=cn", SUFFIX]),
            (SuffixTask::DecryptAttr, vec!["backend", "attr-encrypt", "--del-attr=cn", SUFFIX]),
        ] {
            let mut d = draft(task);
            d.set_text(INDEX_ATTR, "cn");
            assert_eq!(d.submit().unwrap().1[0].args, expected);
        }
    }
}
