//! Baseline/current comparison and compilation of the changed attributes
//! into command arguments.

use super::{AttrValue, AttributeSnapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttrKind {
    Text,
    Int,
    /// Text rendered masked in the form.
    Secret,
    Bool,
    List,
}

/// How a changed attribute is spelled on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgStyle {
    /// `--flag=value`
    Flag(&'static str),
    /// `name=value`, as taken by `config replace`
    Assign,
    /// Bare flag picked by the boolean value, e.g. `--enable-readonly`.
    Toggle {
        on: &'static str,
        off: &'static str,
    },
    /// Edited and tracked for dirtiness, emitted only through a transform.
    Local,
    /// Shown, never edited, never compared.
    ReadOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttrSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: AttrKind,
    pub arg: ArgStyle,
    /// Value assumed when the tool omits the attribute.
    pub default: &'static str,
    /// Writing this attribute only takes effect after an instance restart.
    pub restart: bool,
}

impl AttrSpec {
    pub const fn flag(
        name: &'static str,
        label: &'static str,
        kind: AttrKind,
        flag: &'static str,
    ) -> Self {
        Self::with_style(name, label, kind, ArgStyle::Flag(flag))
    }

    pub const fn assign(name: &'static str, label: &'static str, kind: AttrKind) -> Self {
        Self::with_style(name, label, kind, ArgStyle::Assign)
    }

    pub const fn toggle(
        name: &'static str,
        label: &'static str,
        on: &'static str,
        off: &'static str,
    ) -> Self {
        Self::with_style(name, label, AttrKind::Bool, ArgStyle::Toggle { on, off })
    }

    pub const fn local(name: &'static str, label: &'static str, kind: AttrKind) -> Self {
        Self::with_style(name, label, kind, ArgStyle::Local)
    }

    pub const fn read_only(name: &'static str, label: &'static str, kind: AttrKind) -> Self {
        Self::with_style(name, label, kind, ArgStyle::ReadOnly)
    }

    const fn with_style(
        name: &'static str,
        label: &'static str,
        kind: AttrKind,
        arg: ArgStyle,
    ) -> Self {
        Self {
            name,
            label,
            kind,
            arg,
            default: "",
            restart: false,
        }
    }

    pub const fn default_value(self, default: &'static str) -> Self {
        Self { default, ..self }
    }

    pub const fn needs_restart(self) -> Self {
        Self {
            restart: true,
            ..self
        }
    }

    pub fn editable(&self) -> bool {
        !matches!(self.arg, ArgStyle::ReadOnly)
    }

    /// Render `value` in this attribute's argument style.
    pub fn render_arg(&self, value: &str) -> Option<String> {
        match self.arg {
            ArgStyle::Flag(flag) => Some(format!("{flag}={value}")),
            ArgStyle::Assign => Some(format!("{}={value}", self.name)),
            ArgStyle::Toggle { on, off } => {
                Some(if super::parse_on_off(value) { on } else { off }.to_string())
            }
            ArgStyle::Local | ArgStyle::ReadOnly => None,
        }
    }
}

/// One logical form section.
#[derive(Clone, Copy, Debug)]
pub struct AttributeDescriptor {
    pub section: &'static str,
    pub attrs: &'static [AttrSpec],
}

impl AttributeDescriptor {
    pub const fn new(section: &'static str, attrs: &'static [AttrSpec]) -> Self {
        Self { section, attrs }
    }
}

pub fn find_spec(sections: &[AttributeDescriptor], name: &str) -> Option<&'static AttrSpec> {
    sections
        .iter()
        .flat_map(|d| d.attrs.iter())
        .find(|s| s.name == name)
}

pub struct DiffContext<'a> {
    pub spec: &'a AttrSpec,
    pub baseline: &'a AttributeSnapshot,
    pub current: &'a AttributeSnapshot,
    /// Whether this attribute itself differs from baseline.
    pub changed: bool,
}

impl DiffContext<'_> {
    pub fn companion_changed(&self, name: &str) -> bool {
        let kind = self
            .current
            .get(name)
            .or_else(|| self.baseline.get(name))
            .map(kind_of)
            .unwrap_or(AttrKind::Text);
        !values_equal(kind, self.baseline.get(name), self.current.get(name))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transform {
    /// Fall back to the attribute's own rule.
    Default,
    Skip,
    /// Emit this value in the attribute's argument style.
    Emit(String),
}

pub type TransformFn = fn(&DiffContext<'_>) -> Transform;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diff {
    pub dirty: bool,
    pub args: Vec<String>,
    pub changed: Vec<&'static str>,
    pub restart: bool,
}

/// Diff engine over a fixed, ordered set of sections. Transforms are
/// consulted for their attribute whether or not it changed.
#[derive(Clone)]
pub struct DiffEngine {
    sections: &'static [AttributeDescriptor],
    transforms: Vec<(&'static str, TransformFn)>,
}

impl DiffEngine {
    pub fn new(sections: &'static [AttributeDescriptor]) -> Self {
        Self {
            sections,
            transforms: Vec::new(),
        }
    }

    pub fn with_transform(mut self, name: &'static str, f: TransformFn) -> Self {
        self.transforms.push((name, f));
        self
    }

    pub fn sections(&self) -> &'static [AttributeDescriptor] {
        self.sections
    }

    pub fn is_dirty(&self, baseline: &AttributeSnapshot, current: &AttributeSnapshot) -> bool {
        self.specs()
            .filter(|s| s.editable())
            .any(|s| !values_equal(s.kind, baseline.get(s.name), current.get(s.name)))
    }

    pub fn diff(&self, baseline: &AttributeSnapshot, current: &AttributeSnapshot) -> Diff {
        let mut out = Diff::default();
        for spec in self.specs().filter(|s| s.editable()) {
            let changed = !values_equal(spec.kind, baseline.get(spec.name), current.get(spec.name));
            if changed {
                out.dirty = true;
                out.changed.push(spec.name);
            }
            let ctx = DiffContext {
                spec,
                baseline,
                current,
                changed,
            };
            let emitted = match self.transform_for(spec.name).map(|f| f(&ctx)) {
                Some(Transform::Skip) => None,
                Some(Transform::Emit(v)) => spec.render_arg(&v),
                Some(Transform::Default) | None if changed => {
                    spec.render_arg(&current.get(spec.name).map(AttrValue::render).unwrap_or_default())
                }
                _ => None,
            };
            if let Some(arg) = emitted {
                out.restart |= spec.restart;
                out.args.push(arg);
            }
        }
        out
    }

    fn specs(&self) -> impl Iterator<Item = &'static AttrSpec> {
        self.sections.iter().flat_map(|d| d.attrs.iter())
    }

    fn transform_for(&self, name: &str) -> Option<TransformFn> {
        self.transforms
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, f)| *f)
    }
}

fn kind_of(v: &AttrValue) -> AttrKind {
    match v {
        AttrValue::Text(_) => AttrKind::Text,
        AttrValue::Bool(_) => AttrKind::Bool,
        AttrValue::List(_) => AttrKind::List,
    }
}

fn canonical_set(v: Option<&AttrValue>) -> Vec<String> {
    let mut items = match v {
        Some(AttrValue::List(items)) => items
            .iter()
            .flat_map(|s| super::split_list(s))
            .collect::<Vec<_>>(),
        Some(other) => super::split_list(&other.render()),
        None => Vec::new(),
    };
    items.sort();
    items.dedup();
    items
}

/// Lists compare as sets; booleans by truth; everything else by text.
pub fn values_equal(kind: AttrKind, a: Option<&AttrValue>, b: Option<&AttrValue>) -> bool {
    match kind {
        AttrKind::List => canonical_set(a) == canonical_set(b),
        AttrKind::Bool => {
            a.map(AttrValue::as_bool).unwrap_or(false) == b.map(AttrValue::as_bool).unwrap_or(false)
        }
        AttrKind::Text | AttrKind::Int | AttrKind::Secret => {
            a.map(AttrValue::render).unwrap_or_default() == b.map(AttrValue::render).unwrap_or_default()
        }
    }
}
