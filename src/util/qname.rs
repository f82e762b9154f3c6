//! `QName` (qualified name) handling for namespace mode.
//!
//! With the `namespaces` feature on, element and attribute names are reported
//! by their local part, and namespace declarations (`xmlns`, `xmlns:*`) are
//! recognised so they can be dropped from the attribute set. Prefixes must
//! be bound by a declaration in scope.
//!
//! See <https://www.w3.org/TR/xml-names/#NT-QName>

/// Splits a `QName` into its prefix and local name parts.
///
/// Only the first colon separates the prefix.
#[must_use]
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

/// Returns the local part of a `QName`.
#[must_use]
pub fn local_name(qname: &str) -> &str {
    split_qname(qname).1
}

/// Validates a `QName` per Namespaces in XML 1.0 §4.
///
/// A `QName` has at most one colon, and neither prefix nor local part may be
/// empty. Returns an error message if invalid, or `None` if valid.
#[must_use]
pub fn validate_qname(qname: &str) -> Option<&'static str> {
    match qname.split_once(':') {
        None => None,
        Some((_, local)) if local.contains(':') => Some("QName contains multiple colons"),
        Some(("", _) | (_, "")) => Some("QName has empty prefix or local part"),
        Some(_) => None,
    }
}

/// Returns `true` for namespace declaration attributes.
#[must_use]
pub fn is_namespace_declaration(attribute: &str) -> bool {
    attribute == "xmlns" || attribute.starts_with("xmlns:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("xsl:template"), (Some("xsl"), "template"));
        assert_eq!(split_qname("div"), (None, "div"));
        assert_eq!(split_qname("a:b:c"), (Some("a"), "b:c"));
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("xsl:for-each"), "for-each");
        assert_eq!(local_name("table"), "table");
        assert_eq!(local_name("prefix:"), "");
    }

    #[test]
    fn test_validate_qname() {
        assert_eq!(validate_qname("xsl:template"), None);
        assert_eq!(validate_qname("plain"), None);
        assert!(validate_qname("p:").is_some());
        assert!(validate_qname(":a").is_some());
        assert!(validate_qname("a:b:c").is_some());
    }

    #[test]
    fn test_namespace_declarations() {
        assert!(is_namespace_declaration("xmlns"));
        assert!(is_namespace_declaration("xmlns:xsl"));
        assert!(!is_namespace_declaration("xmlnsfoo"));
        assert!(!is_namespace_declaration("version"));
    }
}
