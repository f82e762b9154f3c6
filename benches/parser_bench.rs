#![allow(clippy::expect_used)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fmt::Write;
use untangle::sax::{parse_sax_str, SaxHandler};
use untangle::{parse_str, Error, Node, ParseOptions};

// ---------------------------------------------------------------------------
// Document generators
// ---------------------------------------------------------------------------

/// A small document with about 10 elements.
fn make_small_xml() -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root>\n");
    for i in 0..10 {
        let _ = writeln!(xml, "  <item id=\"{i}\">Value {i}</item>");
    }
    xml.push_str("</root>\n");
    xml
}

/// A catalog with 1000 grouped siblings.
fn make_catalog_xml() -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<catalog>\n");
    for i in 0..1000 {
        let _ = writeln!(
            xml,
            "  <book id=\"bk{i}\"><title>Title {i}</title>\
             <author-name>Author {i}</author-name>\
             <price>{}.99</price></book>",
            10 + i
        );
    }
    xml.push_str("</catalog>\n");
    xml
}

/// Prefixed names throughout, so every name goes through sanitization.
fn make_namespace_heavy_xml() -> String {
    let mut xml = String::from(
        "<xsl:stylesheet version=\"1.0\" xmlns:xsl=\"http://www.w3.org/1999/XSL/Transform\">\n",
    );
    for i in 0..200 {
        let _ = writeln!(
            xml,
            "  <xsl:template match=\"m{i}\"><xsl:value-of select=\".\"/></xsl:template>"
        );
    }
    xml.push_str("</xsl:stylesheet>\n");
    xml
}

/// Entity references in every text node.
fn make_entity_xml() -> String {
    let mut xml = String::from("<!DOCTYPE doc [<!ENTITY co \"Example &amp; Co.\">]>\n<doc>\n");
    for i in 0..500 {
        let _ = writeln!(xml, "  <line n=\"{i}\">&co; &#169; &lt;{i}&gt;</line>");
    }
    xml.push_str("</doc>\n");
    xml
}

fn build(xml: &str, options: &ParseOptions) -> Node {
    parse_str(black_box(xml), options).expect("benchmark document parses")
}

// ---------------------------------------------------------------------------
// Tree building
// ---------------------------------------------------------------------------

fn bench_parse_small(c: &mut Criterion) {
    let xml = make_small_xml();
    let options = ParseOptions::default();
    c.bench_function("parse_small", |b| b.iter(|| build(&xml, &options)));
}

fn bench_parse_catalog(c: &mut Criterion) {
    let xml = make_catalog_xml();
    let options = ParseOptions::default();
    c.bench_function("parse_catalog", |b| b.iter(|| build(&xml, &options)));
}

fn bench_parse_catalog_interned(c: &mut Criterion) {
    let xml = make_catalog_xml();
    let options = ParseOptions::default().string_interning(true);
    c.bench_function("parse_catalog_interned", |b| {
        b.iter(|| build(&xml, &options));
    });
}

fn bench_parse_namespace_heavy(c: &mut Criterion) {
    let xml = make_namespace_heavy_xml();
    let options = ParseOptions::default();
    c.bench_function("parse_namespace_heavy", |b| b.iter(|| build(&xml, &options)));
}

fn bench_parse_entities(c: &mut Criterion) {
    let xml = make_entity_xml();
    let options = ParseOptions::default();
    c.bench_function("parse_entities", |b| b.iter(|| build(&xml, &options)));
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

fn bench_group_lookup(c: &mut Criterion) {
    let root = build(&make_catalog_xml(), &ParseOptions::default());
    c.bench_function("group_lookup", |b| {
        b.iter(|| {
            let books = root
                .child("catalog")
                .and_then(|catalog| catalog.child("book"))
                .expect("catalog has books");
            black_box(books.iter().filter_map(|book| book.attribute("id")).count())
        });
    });
}

// ---------------------------------------------------------------------------
// SAX only
// ---------------------------------------------------------------------------

struct CountingHandler {
    elements: usize,
    chars: usize,
}

impl SaxHandler for CountingHandler {
    fn start_element(&mut self, _name: &str, _attrs: &[(String, String)]) -> Result<(), Error> {
        self.elements += 1;
        Ok(())
    }

    fn characters(&mut self, content: &str) -> Result<(), Error> {
        self.chars += content.len();
        Ok(())
    }
}

fn bench_sax_parse(c: &mut Criterion) {
    let xml = make_catalog_xml();
    let options = ParseOptions::default();
    c.bench_function("sax_parse", |b| {
        b.iter(|| {
            let mut handler = CountingHandler {
                elements: 0,
                chars: 0,
            };
            parse_sax_str(black_box(&xml), &options, &mut handler).expect("sax parse");
            black_box((handler.elements, handler.chars))
        });
    });
}

criterion_group!(
    parsing,
    bench_parse_small,
    bench_parse_catalog,
    bench_parse_catalog_interned,
    bench_parse_namespace_heavy,
    bench_parse_entities,
);

criterion_group!(navigation, bench_group_lookup);

criterion_group!(sax, bench_sax_parse);

criterion_main!(parsing, navigation, sax);
