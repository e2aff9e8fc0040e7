//! Password policies: the global policy (`config replace`) and local
//! subtree/user policies (`localpwp`).

use super::{CreateSpec, FieldError, PanelSpec};
use crate::attrs::diff::{AttrKind, AttrSpec, AttributeDescriptor, Diff, DiffEngine};
use crate::attrs::AttributeSnapshot;
use crate::services::cli_runner::Invocation;
use crate::services::loader::items_of;
use crate::validate::check_dn;
use serde_json::Value as JsonValue;

static GLOBAL_GENERAL: &[AttrSpec] = &[
    AttrSpec::assign("nsslapd-pwpolicy-local", "Allow local policies", AttrKind::Bool),
    AttrSpec::assign("nsslapd-pwpolicy-inherit-global", "Local policies inherit global", AttrKind::Bool),
    AttrSpec::assign("passwordisglobalpolicy", "Replicate password state", AttrKind::Bool),
    AttrSpec::assign("passwordstoragescheme", "Storage scheme", AttrKind::Text),
    AttrSpec::assign("passwordadmindn", "Password administrator", AttrKind::Text),
    AttrSpec::assign("passwordadminskipinfoupdate", "Admin skips info update", AttrKind::Bool),
    AttrSpec::assign("passwordtrackupdatetime", "Track update time", AttrKind::Bool),
    AttrSpec::assign("nsslapd-allow-hashed-passwords", "Allow pre-hashed passwords", AttrKind::Bool),
    AttrSpec::assign("passwordchange", "Users may change password", AttrKind::Bool),
    AttrSpec::assign("passwordmustchange", "Change after reset", AttrKind::Bool),
    AttrSpec::assign("passwordhistory", "Keep password history", AttrKind::Bool),
    AttrSpec::assign("passwordinhistory", "History size", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordminage", "Minimum age (s)", AttrKind::Int).default_value("0"),
];

static GLOBAL_EXPIRATION: &[AttrSpec] = &[
    AttrSpec::assign("passwordexp", "Enforce expiration", AttrKind::Bool),
    AttrSpec::assign("passwordmaxage", "Maximum age (s)", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordgracelimit", "Grace logins", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordwarning", "Warn before expiry (s)", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordsendexpiringtime", "Always send expiring control", AttrKind::Bool),
];

static GLOBAL_LOCKOUT: &[AttrSpec] = &[
    AttrSpec::assign("passwordlockout", "Enable lockout", AttrKind::Bool),
    AttrSpec::assign("passwordmaxfailure", "Failures before lockout", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordresetfailurecount", "Reset failure count after (s)", AttrKind::Int)
        .default_value("0"),
    AttrSpec::assign("passwordunlock", "Unlock after duration", AttrKind::Bool),
    AttrSpec::assign("passwordlockoutduration", "Lockout duration (s)", AttrKind::Int).default_value("0"),
];

static GLOBAL_SYNTAX: &[AttrSpec] = &[
    AttrSpec::assign("passwordchecksyntax", "Check syntax", AttrKind::Bool),
    AttrSpec::assign("passwordminlength", "Minimum length", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordmindigits", "Minimum digits", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordminalphas", "Minimum alphas", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordminuppers", "Minimum uppercase", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordminlowers", "Minimum lowercase", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordminspecials", "Minimum specials", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordmin8bit", "Minimum 8-bit", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordmaxrepeats", "Maximum repeats", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordmaxsequence", "Maximum sequence", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordmaxseqsets", "Maximum sequence sets", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordmaxclasschars", "Maximum class chars", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordmincategories", "Minimum categories", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordmintokenlength", "Minimum token length", AttrKind::Int).default_value("0"),
    AttrSpec::assign("passwordpalindrome", "Reject palindromes", AttrKind::Bool),
    AttrSpec::assign("passworddictcheck", "Dictionary check", AttrKind::Bool),
    AttrSpec::assign("passwordbadwords", "Prohibited words", AttrKind::Text),
    AttrSpec::assign("passworduserattributes", "Check user attributes", AttrKind::List),
];

pub static GLOBAL_SECTIONS: &[AttributeDescriptor] = &[
    AttributeDescriptor::new("General Settings", GLOBAL_GENERAL),
    AttributeDescriptor::new("Expiration", GLOBAL_EXPIRATION),
    AttributeDescriptor::new("Account Lockout", GLOBAL_LOCKOUT),
    AttributeDescriptor::new("Syntax Checking", GLOBAL_SYNTAX),
];

pub struct GlobalPolicy;

impl PanelSpec for GlobalPolicy {
    fn title(&self) -> String {
        "global password policy".into()
    }

    fn sections(&self) -> &'static [AttributeDescriptor] {
        GLOBAL_SECTIONS
    }

    fn read_plan(&self) -> Vec<Invocation> {
        vec![Invocation::dsconf(["config", "get"])]
    }

    fn write_plan(&self, diff: &Diff, _: &AttributeSnapshot, _: &AttributeSnapshot) -> Vec<Invocation> {
        super::args_plan(Invocation::dsconf(["config", "replace"]), diff)
    }
}

static LOCAL_GENERAL: &[AttrSpec] = &[
    AttrSpec::flag("passwordstoragescheme", "Storage scheme", AttrKind::Text, "--pwdscheme"),
    AttrSpec::flag("passwordtrackupdatetime", "Track update time", AttrKind::Bool, "--pwdtrack"),
    AttrSpec::flag("passwordchange", "Users may change password", AttrKind::Bool, "--pwdchange"),
    AttrSpec::flag("passwordmustchange", "Change after reset", AttrKind::Bool, "--pwdmustchange"),
    AttrSpec::flag("passwordhistory", "Keep password history", AttrKind::Bool, "--pwdhistory"),
    AttrSpec::flag("passwordinhistory", "History size", AttrKind::Int, "--pwdhistorycount").default_value("0"),
    AttrSpec::flag("passwordminage", "Minimum age (s)", AttrKind::Int, "--pwdminage").default_value("0"),
];

static LOCAL_EXPIRATION: &[AttrSpec] = &[
    AttrSpec::flag("passwordexp", "Enforce expiration", AttrKind::Bool, "--pwdexpire"),
    AttrSpec::flag("passwordmaxage", "Maximum age (s)", AttrKind::Int, "--pwdmaxage").default_value("0"),
    AttrSpec::flag("passwordgracelimit", "Grace logins", AttrKind::Int, "--pwdgracelimit").default_value("0"),
    AttrSpec::flag("passwordwarning", "Warn before expiry (s)", AttrKind::Int, "--pwdwarning").default_value("0"),
    AttrSpec::flag(
        "passwordsendexpiringtime",
        "Always send expiring control",
        AttrKind::Bool,
        "--pwdsendexpiring",
    ),
];

static LOCAL_LOCKOUT: &[AttrSpec] = &[
    AttrSpec::flag("passwordlockout", "Enable lockout", AttrKind::Bool, "--pwdlockout"),
    AttrSpec::flag("passwordmaxfailure", "Failures before lockout", AttrKind::Int, "--pwdmaxfailures")
        .default_value("0"),
    AttrSpec::flag(
        "passwordresetfailurecount",
        "Reset failure count after (s)",
        AttrKind::Int,
        "--pwdresetfailcount",
    )
    .default_value("0"),
    AttrSpec::flag("passwordunlock", "Unlock after duration", AttrKind::Bool, "--pwdunlock"),
    AttrSpec::flag(
        "passwordlockoutduration",
        "Lockout duration (s)",
        AttrKind::Int,
        "--pwdlockoutduration",
    )
    .default_value("0"),
];

static LOCAL_SYNTAX: &[AttrSpec] = &[
    AttrSpec::flag("passwordchecksyntax", "Check syntax", AttrKind::Bool, "--pwdchecksyntax"),
    AttrSpec::flag("passwordminlength", "Minimum length", AttrKind::Int, "--pwdminlen").default_value("0"),
    AttrSpec::flag("passwordmindigits", "Minimum digits", AttrKind::Int, "--pwdmindigits").default_value("0"),
    AttrSpec::flag("passwordminalphas", "Minimum alphas", AttrKind::Int, "--pwdminalphas").default_value("0"),
    AttrSpec::flag("passwordminuppers", "Minimum uppercase", AttrKind::Int, "--pwdminuppers").default_value("0"),
    AttrSpec::flag("passwordminlowers", "Minimum lowercase", AttrKind::Int, "--pwdminlowers").default_value("0"),
    AttrSpec::flag("passwordminspecials", "Minimum specials", AttrKind::Int, "--pwdminspecials")
        .default_value("0"),
    AttrSpec::flag("passwordmin8bit", "Minimum 8-bit", AttrKind::Int, "--pwdmin8bits").default_value("0"),
    AttrSpec::flag("passwordmaxrepeats", "Maximum repeats", AttrKind::Int, "--pwdmaxrepeats").default_value("0"),
    AttrSpec::flag("passwordmaxsequence", "Maximum sequence", AttrKind::Int, "--pwdmaxseq").default_value("0"),
    AttrSpec::flag("passwordmaxseqsets", "Maximum sequence sets", AttrKind::Int, "--pwdmaxseqsets")
        .default_value("0"),
    AttrSpec::flag("passwordmaxclasschars", "Maximum class chars", AttrKind::Int, "--pwdmaxclasschars")
        .default_value("0"),
    // the tool spells this flag "catagories"
    AttrSpec::flag("passwordmincategories", "Minimum categories", AttrKind::Int, "--pwdmincatagories")
        .default_value("0"),
    AttrSpec::flag("passwordmintokenlength", "Minimum token length", AttrKind::Int, "--pwdmintokenlen")
        .default_value("0"),
    AttrSpec::flag("passwordpalindrome", "Reject palindromes", AttrKind::Bool, "--pwdpalindrome"),
    AttrSpec::flag("passworddictcheck", "Dictionary check", AttrKind::Bool, "--pwddictcheck"),
    AttrSpec::flag("passwordbadwords", "Prohibited words", AttrKind::Text, "--pwdbadwords"),
    AttrSpec::flag("passworduserattributes", "Check user attributes", AttrKind::List, "--pwduserattrs"),
];

pub static LOCAL_SECTIONS: &[AttributeDescriptor] = &[
    AttributeDescriptor::new("General Settings", LOCAL_GENERAL),
    AttributeDescriptor::new("Expiration", LOCAL_EXPIRATION),
    AttributeDescriptor::new("Account Lockout", LOCAL_LOCKOUT),
    AttributeDescriptor::new("Syntax Checking", LOCAL_SYNTAX),
];

/// A subtree or user policy, keyed by its target DN.
pub struct LocalPolicy {
    pub target: String,
}

impl PanelSpec for LocalPolicy {
    fn title(&self) -> String {
        format!("password policy for {}", self.target)
    }

    fn sections(&self) -> &'static [AttributeDescriptor] {
        LOCAL_SECTIONS
    }

    fn read_plan(&self) -> Vec<Invocation> {
        vec![Invocation::dsconf(["localpwp", "get"]).arg(self.target.clone())]
    }

    fn write_plan(&self, diff: &Diff, _: &AttributeSnapshot, _: &AttributeSnapshot) -> Vec<Invocation> {
        super::args_plan(
            Invocation::dsconf(["localpwp", "set"]).arg(self.target.clone()),
            diff,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyRow {
    pub target: String,
    pub kind: String,
}

/// Rows of `localpwp list`.
pub fn parse_policy_list(v: &JsonValue) -> Vec<PolicyRow> {
    items_of(v)
        .iter()
        .filter_map(|item| {
            let field = |k: &str| item.get(k).and_then(|x| x.as_str()).unwrap_or("").to_string();
            let target = field("targetdn");
            (!target.is_empty()).then(|| PolicyRow {
                target,
                kind: field("pwp_type"),
            })
        })
        .collect()
}

pub fn list_policies() -> Vec<Invocation> {
    vec![Invocation::dsconf(["localpwp", "list"])]
}

pub fn remove_policy(target: &str) -> Vec<Invocation> {
    vec![Invocation::dsconf(["localpwp", "remove"]).arg(target)]
}

pub const POLICY_DN: &str = "policy_dn";
pub const USER_POLICY: &str = "user_policy";

static TARGET: &[AttrSpec] = &[
    AttrSpec::local(POLICY_DN, "Target DN", AttrKind::Text),
    AttrSpec::local(USER_POLICY, "User policy (off = subtree)", AttrKind::Bool),
];

static CREATE_SECTIONS: &[AttributeDescriptor] = &[
    AttributeDescriptor::new("New Policy", TARGET),
    AttributeDescriptor::new("General Settings", LOCAL_GENERAL),
    AttributeDescriptor::new("Expiration", LOCAL_EXPIRATION),
    AttributeDescriptor::new("Account Lockout", LOCAL_LOCKOUT),
    AttributeDescriptor::new("Syntax Checking", LOCAL_SYNTAX),
];

pub struct PolicyCreate;

impl CreateSpec for PolicyCreate {
    fn title(&self) -> String {
        "local password policy".into()
    }

    fn sections(&self) -> &'static [AttributeDescriptor] {
        CREATE_SECTIONS
    }

    fn validate(&self, values: &AttributeSnapshot) -> Vec<FieldError> {
        check_dn(&values.text(POLICY_DN))
            .map(|m| vec![FieldError::new(POLICY_DN, m)])
            .unwrap_or_default()
    }

    fn identity(&self, values: &AttributeSnapshot) -> String {
        values.text(POLICY_DN).trim().to_string()
    }

    fn create_plan(&self, values: &AttributeSnapshot) -> Vec<Invocation> {
        let action = if values.flag(USER_POLICY) { "adduser" } else { "addsubtree" };
        let engine = DiffEngine::new(CREATE_SECTIONS);
        let args = super::args_against_defaults(&engine, &self.defaults(), values);
        vec![Invocation::dsconf(["localpwp", action])
            .arg(self.identity(values))
            .extend(args)]
    }
}
