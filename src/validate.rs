use regex::Regex;
use std::sync::OnceLock;

fn dn_regex() -> &'static Regex {
    static DN_RE: OnceLock<Regex> = OnceLock::new();
    DN_RE.get_or_init(|| {
        // attr=value[,attr=value]*, attr is a name or a numeric OID, values may escape commas
        let rdn = r"(?:[A-Za-z][A-Za-z0-9-]*|[0-9]+(?:\.[0-9]+)*)\s*=\s*(?:\\.|[^,\\])+";
        Regex::new(&format!(r"^{rdn}(?:\s*,\s*{rdn})*$")).expect("DN pattern compiles")
    })
}

pub fn valid_dn(dn: &str) -> bool {
    let dn = dn.trim();
    !dn.is_empty() && dn_regex().is_match(dn)
}

pub fn parse_int(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

/// Inline error for an integer field, `None` when acceptable.
pub fn check_int(value: &str, min: Option<i64>, max: Option<i64>) -> Option<String> {
    let Some(n) = parse_int(value) else {
        return Some("Must be a number".into());
    };
    match (min, max) {
        (Some(lo), Some(hi)) if n < lo || n > hi => Some(format!("Must be between {lo} and {hi}")),
        (Some(lo), None) if n < lo => Some(format!("Must be at least {lo}")),
        (None, Some(hi)) if n > hi => Some(format!("Must be at most {hi}")),
        _ => None,
    }
}

pub fn check_required(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        Some("Required".into())
    } else {
        None
    }
}

pub fn check_dn(value: &str) -> Option<String> {
    if valid_dn(value) {
        None
    } else {
        Some("Invalid DN".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dn_syntax() {
        assert!(valid_dn("dc=example,dc=com"));
        assert!(valid_dn("ou=People, dc=example,dc=com"));
        assert!(valid_dn("cn=Smith\\, John,ou=People,dc=example,dc=com"));
        assert!(valid_dn("2.5.4.3=x"));
        assert!(!valid_dn(""));
        assert!(!valid_dn("example.com"));
        assert!(!valid_dn("dc=example,"));
        assert!(!valid_dn("=x,dc=com"));
    }

    #[test]
    fn int_ranges() {
        assert_eq!(check_int("50", Some(1), Some(100)), None);
        assert!(check_int("0", Some(1), Some(100)).is_some());
        assert!(check_int("101", Some(1), Some(100)).is_some());
        assert!(check_int("abc", None, None).is_some());
        assert_eq!(check_int("-1", None, None), None);
        assert!(check_int("5", Some(10), None).is_some());
    }
}
