use crate::app::{EntityKind, Page};
use crate::nav::flatten::NavTarget;

/// Stable identity of a tree row; survives list refreshes.
pub fn node_key(target: &NavTarget) -> String {
    match target {
        NavTarget::Header(title) => format!("hdr:{title}"),
        NavTarget::Group(kind) => format!("group:{}", kind_key(*kind)),
        NavTarget::Page(page) => page_key(page),
    }
}

pub fn page_key(page: &Page) -> String {
    match page {
        Page::Global(g) => format!("global:{g:?}"),
        Page::Backups => "backups".to_string(),
        Page::Entity(kind, id) => format!("{}/{id}", kind_key(*kind)),
    }
}

fn kind_key(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Suffixes => "suffix",
        EntityKind::LocalPolicies => "localpwp",
        EntityKind::SaslMappings => "sasl",
    }
}
