//! Distinguished name helpers
//!
//! Splitting honours backslash escapes and double-quoted values, so a comma
//! inside `cn=Smith\, John` or `o="Acme, Inc."` does not end a component.
//! All comparisons follow the LDAP convention and ignore case.

use crate::{Error, Result};

/// Split a DN into its RDN components, outermost last.
///
/// An empty DN (the root DSE) yields no components.
pub fn explode_dn(dn: &str) -> Result<Vec<String>> {
    let mut components = Vec::new();
    if dn.trim().is_empty() {
        return Ok(components);
    }

    let mut current = String::new();
    let mut chars = dn.chars();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| Error::InvalidDn(format!("trailing escape in '{}'", dn)))?;
                current.push(c);
                current.push(escaped);
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' | ';' if !in_quotes => {
                components.push(finish_component(&current, dn)?);
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err(Error::InvalidDn(format!("unterminated quote in '{}'", dn)));
    }
    components.push(finish_component(&current, dn)?);

    Ok(components)
}

fn finish_component(raw: &str, dn: &str) -> Result<String> {
    let component = raw.trim();
    if component.is_empty() || !component.contains('=') {
        return Err(Error::InvalidDn(format!("malformed component in '{}'", dn)));
    }
    Ok(component.to_string())
}

/// The entry's own relative name, e.g. `cn=foo` for `cn=foo,dc=example,dc=com`.
pub fn leading_rdn(dn: &str) -> Result<String> {
    explode_dn(dn)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::InvalidDn("the root DSE has no RDN".to_string()))
}

/// The DN of the entry's parent, or `None` for a single-component DN.
pub fn parent_dn(dn: &str) -> Result<Option<String>> {
    let components = explode_dn(dn)?;
    if components.len() <= 1 {
        return Ok(None);
    }
    Ok(Some(components[1..].join(",")))
}

/// Place `rdn` directly below `parent`.
pub fn child_dn(rdn: &str, parent: &str) -> String {
    if parent.trim().is_empty() {
        rdn.to_string()
    } else {
        format!("{},{}", rdn, parent)
    }
}

/// Canonical comparison form: trimmed components, lowercased, comma-joined.
pub fn normalize_dn(dn: &str) -> Result<String> {
    Ok(explode_dn(dn)?
        .iter()
        .map(|c| c.to_lowercase())
        .collect::<Vec<_>>()
        .join(","))
}

/// Case-insensitive DN equality.
///
/// DNs that fail to parse are compared as plain strings.
pub fn dn_eq(a: &str, b: &str) -> bool {
    match (normalize_dn(a), normalize_dn(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.to_lowercase() == b.to_lowercase(),
    }
}

/// Whether `dn` is `ancestor` itself or lies anywhere below it.
///
/// Walks `dn` outward one RDN at a time and compares each accumulated suffix
/// against `ancestor`, so `cn=ab,dc=x` is not mistaken for a child of `cn=b,dc=x`.
pub fn is_same_or_descendant(dn: &str, ancestor: &str) -> bool {
    let (Ok(components), Ok(ancestor)) = (explode_dn(dn), normalize_dn(ancestor)) else {
        return false;
    };

    let lowered: Vec<String> = components.iter().map(|c| c.to_lowercase()).collect();
    (0..lowered.len()).any(|i| lowered[i..].join(",") == ancestor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explode_simple() {
        assert_eq!(
            explode_dn("cn=foo,ou=people,dc=example,dc=com").unwrap(),
            vec!["cn=foo", "ou=people", "dc=example", "dc=com"]
        );
        assert!(explode_dn("").unwrap().is_empty());
    }

    #[test]
    fn test_explode_escapes_and_quotes() {
        assert_eq!(
            explode_dn(r"cn=Smith\, John, o=Acme").unwrap(),
            vec![r"cn=Smith\, John", "o=Acme"]
        );
        assert_eq!(
            explode_dn(r#"o="Acme, Inc.",c=US"#).unwrap(),
            vec![r#"o="Acme, Inc.""#, "c=US"]
        );
    }

    #[test]
    fn test_explode_rejects_malformed() {
        assert!(explode_dn("cn=a,,dc=com").is_err());
        assert!(explode_dn(r#"o="open"#).is_err());
        assert!(explode_dn(r"cn=a\").is_err());
        assert!(explode_dn("justtext").is_err());
    }

    #[test]
    fn test_leading_rdn_and_parent() {
        assert_eq!(leading_rdn("uid=jdoe,ou=people,dc=x").unwrap(), "uid=jdoe");
        assert_eq!(
            parent_dn("uid=jdoe,ou=people,dc=x").unwrap().as_deref(),
            Some("ou=people,dc=x")
        );
        assert_eq!(parent_dn("dc=x").unwrap(), None);
        assert!(leading_rdn("").is_err());
    }

    #[test]
    fn test_child_dn() {
        assert_eq!(child_dn("cn=a", "ou=b,dc=c"), "cn=a,ou=b,dc=c");
        assert_eq!(child_dn("dc=com", ""), "dc=com");
    }

    #[test]
    fn test_dn_eq_ignores_case_and_spacing() {
        assert!(dn_eq("CN=Foo, DC=Example,DC=com", "cn=foo,dc=example,dc=com"));
        assert!(!dn_eq("cn=foo,dc=example", "cn=bar,dc=example"));
    }

    #[test]
    fn test_descendant_checks_component_boundaries() {
        let source = "ou=People,dc=example,dc=com";
        assert!(is_same_or_descendant("ou=people,dc=example,dc=com", source));
        assert!(is_same_or_descendant("ou=Sub,OU=People,dc=example,dc=com", source));
        assert!(!is_same_or_descendant("dc=example,dc=com", source));
        assert!(!is_same_or_descendant("ou=MorePeople,dc=example,dc=com", source));
        assert!(!is_same_or_descendant("cn=ab,dc=x", "cn=b,dc=x"));
    }
}
