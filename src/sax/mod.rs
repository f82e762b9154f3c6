//! SAX-style event API.
//!
//! The tokenizer (`quick-xml`) produces raw events. This module turns them
//! into the balanced callback sequence a [`SaxHandler`] expects:
//! every `start_element` is matched by a later `end_element`, character
//! data only arrives inside an element, entity and character references are
//! already expanded, and CDATA sections arrive as plain character data.
//! Markup in the replacement text of an entity is parsed like any other
//! content, so `&e;` can produce elements.
//!
//! The tokenizer does not check characters or names, so the driver does:
//! illegal characters, invalid names, `<` in attribute values, `]]>` in
//! character data and attributes run together without whitespace are all
//! errors. Anything that breaks the contract stops the parse with a
//! [`ParseError`] and no further events are delivered.
//!
//! # Examples
//!
//! ```
//! use untangle::error::Error;
//! use untangle::parser::ParseOptions;
//! use untangle::sax::{parse_sax_str, SaxHandler};
//!
//! struct Counter {
//!     elements: usize,
//! }
//!
//! impl SaxHandler for Counter {
//!     fn start_element(&mut self, _name: &str, _attributes: &[(String, String)]) -> Result<(), Error> {
//!         self.elements += 1;
//!         Ok(())
//!     }
//! }
//!
//! let mut counter = Counter { elements: 0 };
//! parse_sax_str("<root><a/><b/><c/></root>", &ParseOptions::default(), &mut counter).unwrap();
//! assert_eq!(counter.elements, 4);
//! ```

pub(crate) mod entities;

use std::borrow::Cow;
use std::io::BufRead;

use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesCData, BytesStart, BytesText, Event};
use quick_xml::Reader;

use crate::error::{Error, ParseError};
use crate::parser::source::Base;
use crate::parser::ParseOptions;
use crate::util::chars::{find_illegal_char, is_name, is_xml_whitespace};
use crate::util::qname::{is_namespace_declaration, local_name, split_qname, validate_qname};

use entities::{Context, EntityError, EntityTable, Segment};

/// Nesting limit for general entities referenced from content.
const MAX_ENTITY_DEPTH: usize = 64;

/// Receiver of parse events.
///
/// All methods have default no-op implementations. Returning an error from
/// any callback aborts the parse and the error is handed back to the caller.
///
/// # Attribute pairs
///
/// Attributes are passed as `(name, value)` pairs with references expanded
/// and whitespace normalized. Names are qualified names unless the
/// `namespaces` feature is on, in which case they are local names.
#[allow(unused_variables)]
pub trait SaxHandler {
    /// Called once before any other event.
    fn start_document(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Called once after the document element has been closed.
    fn end_document(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Called for each element start tag (and for self-closing tags).
    fn start_element(&mut self, name: &str, attributes: &[(String, String)]) -> Result<(), Error> {
        Ok(())
    }

    /// Called for each element end tag (and right after a self-closing tag).
    fn end_element(&mut self, name: &str) -> Result<(), Error> {
        Ok(())
    }

    /// Called for character data, including CDATA sections.
    fn characters(&mut self, content: &str) -> Result<(), Error> {
        Ok(())
    }
}

/// A handler that ignores every event. Useful for well-formedness checks.
pub struct DefaultHandler;

impl SaxHandler for DefaultHandler {}

/// Parses XML from a buffered reader, firing events on `handler`.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the input is not well-formed,
/// [`Error::ForbiddenEntity`] if it needs an external entity that the
/// options do not allow, or whatever error the handler returned.
pub fn parse_sax<R: BufRead>(
    input: R,
    options: &ParseOptions,
    handler: &mut dyn SaxHandler,
) -> Result<(), Error> {
    drive(input, options, None, handler)
}

/// Parses XML from a string, firing events on `handler`.
///
/// The string is taken as UTF-8 whatever encoding its XML declaration
/// names.
///
/// # Errors
///
/// Same as [`parse_sax`].
pub fn parse_sax_str(
    input: &str,
    options: &ParseOptions,
    handler: &mut dyn SaxHandler,
) -> Result<(), Error> {
    drive_str(input, options, handler)
}

/// Runs a full parse over a byte stream. `base` is where relative external
/// identifiers are resolved from.
pub(crate) fn drive<R: BufRead>(
    input: R,
    options: &ParseOptions,
    base: Option<Base>,
    handler: &mut dyn SaxHandler,
) -> Result<(), Error> {
    SaxDriver::new(Reader::from_reader(input), options, base, handler).run()
}

/// Runs a full parse over text that is already decoded.
pub(crate) fn drive_str(
    input: &str,
    options: &ParseOptions,
    handler: &mut dyn SaxHandler,
) -> Result<(), Error> {
    SaxDriver::new(Reader::from_str(input), options, None, handler).run()
}

fn configure<R>(reader: &mut Reader<R>) {
    let config = reader.config_mut();
    config.trim_text(false);
    config.expand_empty_elements = false;
    config.check_end_names = true;
}

struct OpenElement {
    /// Name as reported to the handler.
    name: String,
    /// Namespace prefixes declared on this element.
    prefixes: Vec<String>,
}

struct SaxDriver<'o, 'h, R> {
    reader: Reader<R>,
    options: &'o ParseOptions,
    handler: &'h mut dyn SaxHandler,
    entities: EntityTable,
    open: Vec<OpenElement>,
    /// General entities whose replacement text is being parsed.
    entity_stack: Vec<String>,
    seen_root: bool,
}

impl<'o, 'h, R: BufRead> SaxDriver<'o, 'h, R> {
    fn new(
        mut reader: Reader<R>,
        options: &'o ParseOptions,
        base: Option<Base>,
        handler: &'h mut dyn SaxHandler,
    ) -> Self {
        configure(&mut reader);
        Self {
            reader,
            options,
            handler,
            entities: EntityTable::new(options, base),
            open: Vec::new(),
            entity_stack: Vec::new(),
            seen_root: false,
        }
    }

    fn run(&mut self) -> Result<(), Error> {
        self.handler.start_document()?;

        let mut buf = Vec::new();
        loop {
            let event = match self.reader.read_event_into(&mut buf) {
                Ok(event) => event,
                Err(err) => {
                    let position = self.reader.error_position() as u64;
                    return Err(ParseError::from_xml(err, position).into());
                }
            };
            let decoder = self.reader.decoder();
            match event {
                Event::Start(e) => self.start_element(&e, decoder)?,
                Event::Empty(e) => {
                    self.start_element(&e, decoder)?;
                    self.end_element()?;
                }
                Event::End(_) => self.end_element()?,
                Event::Text(e) => self.text(&e, decoder)?,
                Event::CData(e) => self.cdata(&e, decoder)?,
                Event::DocType(e) => self.doctype(&e, decoder)?,
                Event::Comment(e) => self.check_markup(&e, decoder)?,
                Event::PI(e) => self.check_markup(&e, decoder)?,
                Event::Decl(_) => {}
                Event::Eof => break,
            }
            buf.clear();
        }

        if let Some(element) = self.open.last() {
            return Err(self.fatal(format!("unclosed element <{}>", element.name)));
        }
        if !self.seen_root {
            return Err(self.fatal("no element found"));
        }
        self.handler.end_document()
    }

    // --- Elements ---

    fn start_element(&mut self, e: &BytesStart<'_>, decoder: Decoder) -> Result<(), Error> {
        if self.open.is_empty() && self.seen_root {
            return Err(self.fatal("junk after document element"));
        }
        if self.open.len() >= self.options.max_depth as usize {
            return Err(self.fatal(format!(
                "maximum element depth of {} exceeded",
                self.options.max_depth
            )));
        }

        let qname = e.name();
        let raw_name = self.decode(decoder, qname.as_ref())?.into_owned();
        if raw_name.len() > self.options.max_name_length {
            return Err(self.fatal("element name exceeds maximum length"));
        }
        if !is_name(&raw_name) {
            return Err(self.fatal(format!("invalid element name '{raw_name}'")));
        }
        self.check_attribute_spacing(e.attributes_raw())?;

        let mut attributes: Vec<(String, String)> = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| self.xml_error(err.into()))?;
            let key = self.decode(decoder, attr.key.as_ref())?.into_owned();
            if !is_name(&key) {
                return Err(self.fatal(format!("invalid attribute name '{key}'")));
            }
            if attributes.len() >= self.options.max_attributes as usize {
                return Err(self.fatal(format!(
                    "element <{raw_name}> has more than {} attributes",
                    self.options.max_attributes
                )));
            }
            let raw_value = self.decode(decoder, &attr.value)?;
            if raw_value.len() > self.options.max_attribute_length {
                return Err(self.fatal(format!(
                    "value of attribute '{key}' exceeds maximum length"
                )));
            }
            let value = self.expand(&normalize_line_endings(&raw_value), Context::Attribute)?;
            self.check_chars(&value, "attribute value")?;
            attributes.push((key, value));
        }

        let (name, attributes, prefixes) = if self.options.namespaces {
            self.resolve_namespaces(&raw_name, attributes)?
        } else {
            (raw_name, attributes, Vec::new())
        };

        self.handler.start_element(&name, &attributes)?;
        self.open.push(OpenElement { name, prefixes });
        self.seen_root = true;
        Ok(())
    }

    fn end_element(&mut self) -> Result<(), Error> {
        let Some(element) = self.open.pop() else {
            return Err(self.fatal("end tag without matching start tag"));
        };
        self.handler.end_element(&element.name)
    }

    /// Checks every prefix against the declarations in scope and reduces
    /// names to their local part. Declarations are dropped unless
    /// `namespace_prefixes` is on.
    #[allow(clippy::type_complexity)]
    fn resolve_namespaces(
        &self,
        qname: &str,
        attributes: Vec<(String, String)>,
    ) -> Result<(String, Vec<(String, String)>, Vec<String>), Error> {
        let mut declared = Vec::new();
        for (key, _) in &attributes {
            if let Some(prefix) = key.strip_prefix("xmlns:") {
                if let Some(problem) = validate_qname(key) {
                    return Err(self.fatal(format!("{problem}: '{key}'")));
                }
                declared.push(prefix.to_string());
            }
        }

        self.check_qname(qname, &declared)?;
        let mut resolved = Vec::with_capacity(attributes.len());
        for (key, value) in attributes {
            if is_namespace_declaration(&key) {
                if self.options.namespace_prefixes {
                    resolved.push((key, value));
                }
                continue;
            }
            self.check_qname(&key, &declared)?;
            resolved.push((local_name(&key).to_string(), value));
        }
        Ok((local_name(qname).to_string(), resolved, declared))
    }

    fn check_qname(&self, qname: &str, declared: &[String]) -> Result<(), Error> {
        if let Some(problem) = validate_qname(qname) {
            return Err(self.fatal(format!("{problem}: '{qname}'")));
        }
        if let (Some(prefix), _) = split_qname(qname) {
            let bound = prefix == "xml"
                || declared.iter().any(|p| p == prefix)
                || self
                    .open
                    .iter()
                    .any(|element| element.prefixes.iter().any(|p| p == prefix));
            if !bound {
                return Err(self.fatal(format!("unbound namespace prefix '{prefix}' in '{qname}'")));
            }
        }
        Ok(())
    }

    /// quick-xml accepts `a="1"b="2"`; XML requires whitespace between the
    /// closing quote and the next attribute.
    fn check_attribute_spacing(&self, raw: &[u8]) -> Result<(), Error> {
        let mut quote = None;
        let mut after_value = false;
        for &b in raw {
            match quote {
                Some(q) if b == q => {
                    quote = None;
                    after_value = true;
                }
                Some(_) => {}
                None => {
                    if after_value && !matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'/') {
                        return Err(self.fatal("whitespace required between attributes"));
                    }
                    after_value = false;
                    if matches!(b, b'"' | b'\'') {
                        quote = Some(b);
                    }
                }
            }
        }
        Ok(())
    }

    // --- Character data ---

    fn text(&mut self, e: &BytesText<'_>, decoder: Decoder) -> Result<(), Error> {
        let raw = self.decode(decoder, e)?;
        if self.open.is_empty() {
            if raw.chars().all(is_xml_whitespace) {
                return Ok(());
            }
            return Err(self.fatal("text outside the document element"));
        }
        self.check_chars(&raw, "character data")?;
        if raw.contains("]]>") {
            return Err(self.fatal("']]>' not allowed in character data"));
        }

        let segments = self
            .entities
            .split_content(&normalize_line_endings(&raw))
            .map_err(|err| self.entity_error(err))?;
        for segment in segments {
            match segment {
                Segment::Text(text) => self.handler.characters(&text)?,
                Segment::Entity(name) => self.include_entity(&name)?,
            }
        }
        Ok(())
    }

    fn cdata(&mut self, e: &BytesCData<'_>, decoder: Decoder) -> Result<(), Error> {
        if self.open.is_empty() {
            return Err(self.fatal("CDATA section outside the document element"));
        }
        let raw = self.decode(decoder, e)?;
        self.check_chars(&raw, "CDATA section")?;
        let text = normalize_line_endings(&raw);
        if text.len() > self.options.max_text_length {
            return Err(self.fatal("CDATA section exceeds maximum length"));
        }
        self.handler.characters(&text)
    }

    // --- Entities ---

    fn include_entity(&mut self, name: &str) -> Result<(), Error> {
        if self.entity_stack.iter().any(|open| open == name) {
            return Err(self.fatal(format!("entity '{name}' references itself")));
        }
        if self.entity_stack.len() >= MAX_ENTITY_DEPTH {
            return Err(self.fatal("entity references nested too deeply"));
        }
        let replacement = self
            .entities
            .replacement(name, Context::Content)
            .map_err(|err| self.entity_error(err))?;
        let Some(replacement) = replacement else {
            return Ok(());
        };

        self.entity_stack.push(name.to_string());
        let result = self.parse_entity_content(name, &replacement);
        self.entity_stack.pop();
        result
    }

    /// Parses replacement text as content. Elements opened inside it must
    /// also be closed inside it.
    fn parse_entity_content(&mut self, name: &str, replacement: &str) -> Result<(), Error> {
        let mut reader = Reader::from_str(replacement);
        configure(&mut reader);
        let decoder = reader.decoder();
        let depth = self.open.len();

        loop {
            let event = reader.read_event().map_err(|err| self.xml_error(err))?;
            match event {
                Event::Start(e) => self.start_element(&e, decoder)?,
                Event::Empty(e) => {
                    self.start_element(&e, decoder)?;
                    self.end_element()?;
                }
                Event::End(_) => {
                    if self.open.len() <= depth {
                        return Err(self.fatal(format!(
                            "entity '{name}' closes an element it did not open"
                        )));
                    }
                    self.end_element()?;
                }
                Event::Text(e) => self.text(&e, decoder)?,
                Event::CData(e) => self.cdata(&e, decoder)?,
                Event::Comment(e) => self.check_markup(&e, decoder)?,
                Event::PI(e) => self.check_markup(&e, decoder)?,
                Event::Decl(_) | Event::DocType(_) => {
                    return Err(self.fatal(format!(
                        "declaration not allowed in replacement text of entity '{name}'"
                    )));
                }
                Event::Eof => break,
            }
        }

        if self.open.len() != depth {
            return Err(self.fatal(format!("entity '{name}' leaves an element unclosed")));
        }
        Ok(())
    }

    // --- DOCTYPE ---

    fn doctype(&mut self, e: &BytesText<'_>, decoder: Decoder) -> Result<(), Error> {
        if self.seen_root {
            return Err(self.fatal("document type declaration after document element"));
        }
        let content = self.decode(decoder, e)?.into_owned();
        self.check_chars(&content, "document type declaration")?;
        self.entities
            .declare_doctype(&content)
            .map_err(|err| self.entity_error(err))
    }

    // --- Helpers ---

    fn expand(&mut self, raw: &str, context: Context) -> Result<String, Error> {
        self.entities
            .expand(raw, context)
            .map_err(|err| self.entity_error(err))
    }

    /// Comments and processing instructions are not reported, but their
    /// characters must still be legal.
    fn check_markup(&self, content: &[u8], decoder: Decoder) -> Result<(), Error> {
        let content = self.decode(decoder, content)?;
        self.check_chars(&content, "markup")
    }

    fn check_chars(&self, text: &str, what: &str) -> Result<(), Error> {
        match find_illegal_char(text) {
            Some(c) => Err(self.fatal(format!(
                "illegal character U+{:04X} in {what}",
                u32::from(c)
            ))),
            None => Ok(()),
        }
    }

    fn decode<'b>(&self, decoder: Decoder, bytes: &'b [u8]) -> Result<Cow<'b, str>, Error> {
        decoder
            .decode(bytes)
            .map_err(|err| self.xml_error(quick_xml::Error::from(err)))
    }

    fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    fn fatal(&self, message: impl Into<String>) -> Error {
        ParseError::new(message, self.position()).into()
    }

    fn xml_error(&self, err: quick_xml::Error) -> Error {
        ParseError::from_xml(err, self.position()).into()
    }

    fn entity_error(&self, err: EntityError) -> Error {
        match err {
            EntityError::Malformed(message) => self.fatal(message),
            EntityError::External(err) => err,
        }
    }
}

/// Normalizes `\r\n` and lone `\r` to `\n`.
fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}
