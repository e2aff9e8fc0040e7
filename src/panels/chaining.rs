//! Database chaining: default link settings and per-suffix database links.

use super::{CreateSpec, FieldError, PanelSpec};
use crate::attrs::diff::{AttrKind, AttrSpec, AttributeDescriptor, Diff};
use crate::attrs::{AttrValue, AttributeSnapshot};
use crate::services::cli_runner::Invocation;
use crate::validate::{check_dn, check_required};
use serde_json::Value as JsonValue;

pub const CONTROLS: &str = "nstransmittedcontrols";
pub const PASSWORD: &str = "nsmultiplexorcredentials";
pub const PASSWORD_CONFIRM: &str = "nsmultiplexorcredentials_confirm";

static DEFAULT_LIMITS: &[AttrSpec] = &[
    AttrSpec::flag("nsslapd-sizelimit", "Size limit", AttrKind::Int, "--size-limit"),
    AttrSpec::flag("nsslapd-timelimit", "Time limit", AttrKind::Int, "--time-limit"),
    AttrSpec::flag("nsbindconnectionslimit", "Max TCP connections", AttrKind::Int, "--conn-bind-limit"),
    AttrSpec::flag("nsoperationconnectionslimit", "Max LDAP connections", AttrKind::Int, "--conn-op-limit"),
    AttrSpec::flag("nsconcurrentbindlimit", "Max binds per connection", AttrKind::Int, "--bind-limit"),
    AttrSpec::flag("nsbindtimeout", "Bind timeout", AttrKind::Int, "--bind-timeout"),
    AttrSpec::flag("nsbindretrylimit", "Bind retries", AttrKind::Int, "--bind-attempts"),
    AttrSpec::flag("nsconcurrentoperationslimit", "Max ops per connection", AttrKind::Int, "--op-limit"),
    AttrSpec::flag("nsconnectionlife", "Connection lifetime", AttrKind::Int, "--conn-lifetime"),
    AttrSpec::flag(
        "nsabandonedsearchcheckinterval",
        "Abandoned op check interval",
        AttrKind::Int,
        "--abandon-check-interval",
    ),
    AttrSpec::flag("nshoplimit", "Hop limit", AttrKind::Int, "--hop-limit"),
    AttrSpec::flag("nsmaxresponsedelay", "Response delay", AttrKind::Int, "--response-delay"),
    AttrSpec::flag("nsmaxtestresponsedelay", "Test response delay", AttrKind::Int, "--test-response-delay"),
];

static LINK_LIMITS: &[AttrSpec] = &[
    AttrSpec::flag("nsslapd-sizelimit", "Size limit", AttrKind::Int, "--size-limit"),
    AttrSpec::flag("nsslapd-timelimit", "Time limit", AttrKind::Int, "--time-limit"),
    AttrSpec::flag("nsbindconnectionslimit", "Max TCP connections", AttrKind::Int, "--conn-bind-limit"),
    AttrSpec::flag("nsoperationconnectionslimit", "Max LDAP connections", AttrKind::Int, "--conn-op-limit"),
    AttrSpec::flag("nsconcurrentbindlimit", "Max binds per connection", AttrKind::Int, "--bind-limit"),
    AttrSpec::flag("nsbindtimeout", "Bind timeout", AttrKind::Int, "--bind-timeout"),
    AttrSpec::flag("nsbindretrylimit", "Bind retries", AttrKind::Int, "--bind-attempts"),
    AttrSpec::flag("nsconcurrentoperationslimit", "Max ops per connection", AttrKind::Int, "--op-limit"),
    AttrSpec::flag("nsconnectionlife", "Connection lifetime", AttrKind::Int, "--conn-lifetime"),
    AttrSpec::flag(
        "nsabandonedsearchcheckinterval",
        "Abandoned op check interval",
        AttrKind::Int,
        "--abandon-check-interval",
    ),
    AttrSpec::flag("nshoplimit", "Hop limit", AttrKind::Int, "--hop-limit"),
];

static SWITCHES: &[AttrSpec] = &[
    AttrSpec::flag("nschecklocalaci", "Check local ACIs", AttrKind::Bool, "--check-aci"),
    AttrSpec::flag("nsreferralonscopedsearch", "Send referral on scoped search", AttrKind::Bool, "--return-ref"),
    AttrSpec::flag("nsproxiedauthorization", "Allow proxied authorization", AttrKind::Bool, "--proxied-auth"),
    AttrSpec::flag("nsusestarttls", "Use StartTLS", AttrKind::Bool, "--use-starttls"),
];

static FORWARDING: &[AttrSpec] = &[
    AttrSpec::local(CONTROLS, "Forwarded LDAP controls", AttrKind::List),
];

pub static DEFAULT_SECTIONS: &[AttributeDescriptor] = &[
    AttributeDescriptor::new("Default Link Limits", DEFAULT_LIMITS),
    AttributeDescriptor::new("Default Link Options", SWITCHES),
    AttributeDescriptor::new("Forwarded Controls", FORWARDING),
];

static CONNECTION: &[AttrSpec] = &[
    AttrSpec::flag("nsfarmserverurl", "Remote server URL", AttrKind::Text, "--server-url"),
    AttrSpec::flag("nsmultiplexorbinddn", "Bind DN", AttrKind::Text, "--bind-dn"),
    AttrSpec::flag(PASSWORD, "Bind password", AttrKind::Secret, "--bind-pw"),
    AttrSpec::local(PASSWORD_CONFIRM, "Confirm password", AttrKind::Secret),
    AttrSpec::flag("nsbindmechanism", "Bind method", AttrKind::Text, "--bind-mech").default_value("Simple"),
];

pub static LINK_SECTIONS: &[AttributeDescriptor] = &[
    AttributeDescriptor::new("Connection", CONNECTION),
    AttributeDescriptor::new("Limits", LINK_LIMITS),
    AttributeDescriptor::new("Options", SWITCHES),
];

/// `--add-x=` / `--del-x=` arguments turning `before` into `after`.
fn set_delta(before: &[String], after: &[String], add: &str, del: &str) -> Vec<String> {
    let mut args: Vec<String> = after
        .iter()
        .filter(|v| !before.contains(v))
        .map(|v| format!("{add}={v}"))
        .collect();
    args.extend(
        before
            .iter()
            .filter(|v| !after.contains(v))
            .map(|v| format!("{del}={v}")),
    );
    args
}

pub struct ChainingDefaults;

impl PanelSpec for ChainingDefaults {
    fn title(&self) -> String {
        "default chaining configuration".into()
    }

    fn sections(&self) -> &'static [AttributeDescriptor] {
        DEFAULT_SECTIONS
    }

    fn read_plan(&self) -> Vec<Invocation> {
        vec![
            Invocation::dsconf(["chaining", "config-get-def"]),
            Invocation::dsconf(["chaining", "config-get"]),
        ]
    }

    fn parse(&self, outputs: &[JsonValue]) -> Result<AttributeSnapshot, String> {
        let mut snap = super::snapshot_from_first(outputs, DEFAULT_SECTIONS);
        if let Some(doc) = outputs.get(1) {
            let forwarding = AttributeSnapshot::from_attrs(doc, &DEFAULT_SECTIONS[2..]);
            snap.set(CONTROLS, AttrValue::List(forwarding.list(CONTROLS)));
        }
        Ok(snap)
    }

    fn write_plan(
        &self,
        diff: &Diff,
        baseline: &AttributeSnapshot,
        current: &AttributeSnapshot,
    ) -> Vec<Invocation> {
        let mut plan = super::args_plan(Invocation::dsconf(["chaining", "config-set-def"]), diff);
        let forwarding = set_delta(
            &baseline.list(CONTROLS),
            &current.list(CONTROLS),
            "--add-control",
            "--del-control",
        );
        if !forwarding.is_empty() {
            plan.push(Invocation::dsconf(["chaining", "config-set"]).extend(forwarding));
        }
        plan
    }
}

/// One database link, identified by its suffix.
pub struct ChainingLink {
    pub suffix: String,
}

impl PanelSpec for ChainingLink {
    fn title(&self) -> String {
        format!("database link {}", self.suffix)
    }

    fn sections(&self) -> &'static [AttributeDescriptor] {
        LINK_SECTIONS
    }

    fn read_plan(&self) -> Vec<Invocation> {
        vec![Invocation::dsconf(["chaining", "link-get"]).arg(self.suffix.clone())]
    }

    fn parse(&self, outputs: &[JsonValue]) -> Result<AttributeSnapshot, String> {
        let mut snap = super::snapshot_from_first(outputs, LINK_SECTIONS);
        let pw = snap.text(PASSWORD);
        snap.set(PASSWORD_CONFIRM, AttrValue::Text(pw));
        Ok(snap)
    }

    fn write_plan(&self, diff: &Diff, _: &AttributeSnapshot, _: &AttributeSnapshot) -> Vec<Invocation> {
        super::args_plan(
            Invocation::dsconf(["chaining", "link-set"]).arg(self.suffix.clone()),
            diff,
        )
    }

    fn validate(&self, current: &AttributeSnapshot, diff: &Diff) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(m) = check_required(&current.text("nsfarmserverurl")) {
            errors.push(FieldError::new("nsfarmserverurl", m));
        }
        if diff.changed.contains(&"nsmultiplexorbinddn") {
            if let Some(m) = check_dn(&current.text("nsmultiplexorbinddn")) {
                errors.push(FieldError::new("nsmultiplexorbinddn", m));
            }
        }
        if current.text(PASSWORD) != current.text(PASSWORD_CONFIRM) {
            errors.push(FieldError::new(PASSWORD_CONFIRM, "Passwords do not match"));
        }
        errors
    }
}

pub fn delete_link(suffix: &str) -> Vec<Invocation> {
    vec![Invocation::dsconf(["chaining", "link-delete"]).arg(suffix)]
}

static CREATE_FIELDS: &[AttrSpec] = &[
    AttrSpec::local("link_name", "Link name", AttrKind::Text),
    AttrSpec::local("link_rdn", "New suffix RDN", AttrKind::Text),
    AttrSpec::local("nsfarmserverurl", "Remote server URL", AttrKind::Text).default_value("ldap://"),
    AttrSpec::local("nsbindmechanism", "Bind method", AttrKind::Text).default_value("Simple"),
    AttrSpec::local("nsmultiplexorbinddn", "Bind DN", AttrKind::Text),
    AttrSpec::local(PASSWORD, "Bind password", AttrKind::Secret),
    AttrSpec::local(PASSWORD_CONFIRM, "Confirm password", AttrKind::Secret),
    AttrSpec::local("nsusestarttls", "Use StartTLS", AttrKind::Bool),
];

static CREATE_SECTIONS: &[AttributeDescriptor] = &[AttributeDescriptor::new("New Database Link", CREATE_FIELDS)];

/// New link placed below an existing suffix.
pub struct LinkCreate {
    pub parent: String,
}

impl CreateSpec for LinkCreate {
    fn title(&self) -> String {
        format!("database link under {}", self.parent)
    }

    fn sections(&self) -> &'static [AttributeDescriptor] {
        CREATE_SECTIONS
    }

    fn validate(&self, values: &AttributeSnapshot) -> Vec<FieldError> {
        let mut errors: Vec<FieldError> = CREATE_FIELDS
            .iter()
            .filter(|s| s.kind != AttrKind::Bool)
            .filter_map(|s| check_required(&values.text(s.name)).map(|m| FieldError::new(s.name, m)))
            .collect();
        for name in ["link_rdn", "nsmultiplexorbinddn"] {
            let v = values.text(name);
            if !v.is_empty() {
                if let Some(m) = check_dn(&v) {
                    errors.push(FieldError::new(name, m));
                }
            }
        }
        if values.text(PASSWORD) != values.text(PASSWORD_CONFIRM) {
            errors.push(FieldError::new(PASSWORD_CONFIRM, "Passwords do not match"));
        }
        errors
    }

    fn identity(&self, values: &AttributeSnapshot) -> String {
        format!("{},{}", values.text("link_rdn").trim(), self.parent)
    }

    fn create_plan(&self, values: &AttributeSnapshot) -> Vec<Invocation> {
        let mut inv = Invocation::dsconf(["chaining", "link-create"]).extend([
            format!("--suffix={}", self.identity(values)),
            format!("--server-url={}", values.text("nsfarmserverurl")),
            format!("--bind-mech={}", values.text("nsbindmechanism")),
            format!("--bind-dn={}", values.text("nsmultiplexorbinddn")),
            format!("--bind-pw={}", values.text(PASSWORD)),
        ]);
        if values.flag("nsusestarttls") {
            inv = inv.arg("--use-starttls");
        }
        vec![inv.arg(values.text("link_name"))]
    }
}
