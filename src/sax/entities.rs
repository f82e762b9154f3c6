//! Entity declarations and reference expansion.
//!
//! The tokenizer hands over DOCTYPE content and character data verbatim.
//! This module reads the entity declarations out of the document type
//! declaration and expands `&name;`, `&#N;` and `&#xN;` references in text
//! and attribute values. In attribute values everything is expanded here; in
//! content, named references are handed back as [`Segment::Entity`] so the
//! driver can parse their replacement text as markup.
//!
//! External entities (SYSTEM/PUBLIC) are only ever loaded when the matching
//! feature is on. With `external_ges` off, the external DTD subset is not
//! fetched and a reference to an external general entity fails with
//! [`Error::ForbiddenEntity`]; `external_pes` gates external parameter
//! entities the same way. While an external subset goes unread, a reference
//! to an undeclared entity is skipped, since its declaration may be in there.
//!
//! Every expansion counts against `max_entity_expansions`, and expanded text
//! is capped at `max_text_length`, which stops exponential ("billion laughs")
//! documents early.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::error::Error;
use crate::parser::source::{load_external, Base};
use crate::parser::ParseOptions;
use crate::util::chars::{is_name, is_name_char, is_xml_char, is_xml_whitespace};

/// Nesting limit for parameter entities inside the DTD.
const MAX_PARAMETER_DEPTH: u32 = 16;

/// Where a reference is being expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Context {
    Content,
    Attribute,
}

/// Character data split at general entity references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Text(String),
    Entity(String),
}

#[derive(Debug)]
pub(crate) enum EntityError {
    /// The document is malformed; the driver attaches a position.
    Malformed(String),
    /// Policy or I/O failure, passed through unchanged.
    External(Error),
}

impl From<Error> for EntityError {
    fn from(err: Error) -> Self {
        Self::External(err)
    }
}

fn malformed(message: impl Into<String>) -> EntityError {
    EntityError::Malformed(message.into())
}

/// A SYSTEM or PUBLIC external identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExternalId {
    pub(crate) system_id: String,
    pub(crate) public_id: Option<String>,
}

#[derive(Debug, Clone)]
enum Declaration {
    Internal(String),
    External(ExternalId),
    /// An NDATA entity; it can be declared but never referenced.
    Unparsed,
}

#[derive(Debug)]
struct Policy {
    external_general: bool,
    external_parameter: bool,
    max_expansions: u32,
    max_length: usize,
    base: Option<Base>,
    timeout: Duration,
}

/// Declared entities for one document, plus expansion bookkeeping.
#[derive(Debug)]
pub(crate) struct EntityTable {
    general: HashMap<String, Declaration>,
    parameter: HashMap<String, Declaration>,
    /// Replacement text of external entities, by system id.
    loaded: HashMap<String, String>,
    policy: Policy,
    expansions: u32,
    /// Set when an external subset was declared but not read. References
    /// to undeclared entities are then skipped instead of rejected.
    incomplete: bool,
}

impl EntityTable {
    pub(crate) fn new(options: &ParseOptions, base: Option<Base>) -> Self {
        Self {
            general: HashMap::new(),
            parameter: HashMap::new(),
            loaded: HashMap::new(),
            policy: Policy {
                external_general: options.external_general_entities,
                external_parameter: options.external_parameter_entities,
                max_expansions: options.max_entity_expansions,
                max_length: options.max_text_length,
                base,
                timeout: options.fetch_timeout,
            },
            expansions: 0,
            incomplete: false,
        }
    }

    // --- Declarations ---

    /// Reads a document type declaration (everything after `<!DOCTYPE`).
    pub(crate) fn declare_doctype(&mut self, content: &str) -> Result<(), EntityError> {
        let mut scanner = Scanner::new(content);
        scanner.skip_whitespace();
        let root = scanner.name()?;
        scanner.skip_whitespace();
        let external = scanner.external_id()?;
        scanner.skip_whitespace();

        if scanner.eat("[") {
            let start = scanner.pos;
            let end = content
                .rfind(']')
                .filter(|&end| end >= start)
                .ok_or_else(|| malformed("unterminated internal subset"))?;
            self.declare_subset(&content[start..end], 0)?;
        }

        // Declarations in the internal subset take precedence, so the
        // external subset is read second.
        if let Some(id) = external {
            if self.policy.external_general {
                let text = self.load(&id)?;
                self.declare_subset(&text, 0)?;
            } else {
                debug!(root, system_id = %id.system_id, "external DTD subset not loaded");
                self.incomplete = true;
            }
        }
        Ok(())
    }

    fn declare_subset(&mut self, text: &str, depth: u32) -> Result<(), EntityError> {
        if depth > MAX_PARAMETER_DEPTH {
            return Err(malformed("parameter entities nested too deeply"));
        }
        let mut scanner = Scanner::new(text);
        loop {
            scanner.skip_whitespace();
            if scanner.at_end() {
                return Ok(());
            }
            if scanner.eat("<!ENTITY") {
                self.entity_declaration(&mut scanner, depth)?;
            } else if scanner.eat("<!--") {
                scanner.skip_past("-->")?;
            } else if scanner.eat("<?") {
                scanner.skip_past("?>")?;
            } else if scanner.eat("<![") {
                // Conditional sections only occur in external subsets and
                // carry no entity declarations we honour.
                scanner.skip_past("]]>")?;
            } else if scanner.eat("<!") {
                scanner.skip_declaration()?;
            } else if scanner.eat("%") {
                let name = scanner.name()?;
                scanner.expect(";")?;
                let text = self.parameter_text(name)?;
                self.declare_subset(&text, depth + 1)?;
            } else {
                return Err(malformed("unexpected content in document type declaration"));
            }
        }
    }

    fn entity_declaration(&mut self, scanner: &mut Scanner<'_>, depth: u32) -> Result<(), EntityError> {
        scanner.require_whitespace()?;
        let parameter = scanner.eat("%");
        if parameter {
            scanner.require_whitespace()?;
        }
        let name = scanner.name()?.to_string();
        scanner.require_whitespace()?;

        let declaration = if scanner.peek_quote() {
            let literal = scanner.quoted()?;
            Declaration::Internal(self.entity_value(literal, depth)?)
        } else {
            let id = scanner
                .external_id()?
                .ok_or_else(|| malformed(format!("entity '{name}' has no value")))?;
            if scanner.skip_whitespace() && scanner.eat("NDATA") {
                if parameter {
                    return Err(malformed(format!("parameter entity '{name}' cannot be unparsed")));
                }
                scanner.require_whitespace()?;
                scanner.name()?;
                Declaration::Unparsed
            } else {
                Declaration::External(id)
            }
        };
        scanner.skip_whitespace();
        scanner.expect(">")?;

        let table = if parameter {
            &mut self.parameter
        } else {
            &mut self.general
        };
        // The first declaration of a name is binding.
        table.entry(name).or_insert(declaration);
        Ok(())
    }

    /// Builds replacement text from an entity value literal: character and
    /// parameter references are resolved now, general references are kept
    /// for expansion at the point of use.
    fn entity_value(&mut self, literal: &str, depth: u32) -> Result<String, EntityError> {
        if depth > MAX_PARAMETER_DEPTH {
            return Err(malformed("parameter entities nested too deeply"));
        }
        let mut out = String::with_capacity(literal.len());
        let mut rest = literal;
        while let Some(i) = rest.find(['&', '%']) {
            out.push_str(&rest[..i]);
            let marker = rest.as_bytes()[i];
            let after = &rest[i + 1..];
            let semi = after
                .find(';')
                .ok_or_else(|| malformed("unterminated reference in entity value"))?;
            let reference = &after[..semi];
            rest = &after[semi + 1..];

            if marker == b'%' {
                let text = self.parameter_text(reference)?;
                out.push_str(&self.entity_value(&text, depth + 1)?);
            } else if let Some(code) = reference.strip_prefix('#') {
                out.push(parse_char_ref(code)?);
            } else {
                out.push('&');
                out.push_str(reference);
                out.push(';');
            }
        }
        out.push_str(rest);
        Ok(out)
    }

    fn parameter_text(&mut self, name: &str) -> Result<String, EntityError> {
        let declaration = self
            .parameter
            .get(name)
            .cloned()
            .ok_or_else(|| malformed(format!("undefined parameter entity '%{name};'")))?;
        self.count_expansion()?;
        match declaration {
            Declaration::Internal(text) => Ok(text),
            Declaration::External(id) => {
                if !self.policy.external_parameter {
                    return Err(Error::ForbiddenEntity {
                        name: format!("%{name}"),
                        system_id: id.system_id,
                    }
                    .into());
                }
                self.load(&id)
            }
            Declaration::Unparsed => Err(malformed(format!("reference to unparsed entity '{name}'"))),
        }
    }

    // --- Expansion ---

    /// Expands all references in `raw`.
    pub(crate) fn expand(&mut self, raw: &str, context: Context) -> Result<String, EntityError> {
        let mut out = String::with_capacity(raw.len());
        let mut active = Vec::new();
        self.expand_into(raw, context, &mut out, &mut active)?;
        Ok(out)
    }

    fn expand_into(
        &mut self,
        raw: &str,
        context: Context,
        out: &mut String,
        active: &mut Vec<String>,
    ) -> Result<(), EntityError> {
        let mut rest = raw;
        while let Some(amp) = rest.find('&') {
            push_literal(out, &rest[..amp], context)?;
            let after = &rest[amp + 1..];
            let semi = after
                .find(';')
                .ok_or_else(|| malformed("unterminated entity reference"))?;
            let reference = &after[..semi];
            rest = &after[semi + 1..];

            if let Some(code) = reference.strip_prefix('#') {
                out.push(parse_char_ref(code)?);
            } else if let Some(c) = predefined(reference) {
                out.push(c);
            } else if is_name(reference) {
                self.expand_named(reference, context, out, active)?;
            } else {
                return Err(malformed(format!("invalid entity reference '&{reference};'")));
            }
            self.check_length(out)?;
        }
        push_literal(out, rest, context)?;
        self.check_length(out)
    }

    /// Resolves character and predefined references in content and splits
    /// the text at every other entity reference.
    pub(crate) fn split_content(&self, raw: &str) -> Result<Vec<Segment>, EntityError> {
        let mut segments = Vec::new();
        let mut text = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(amp) = rest.find('&') {
            text.push_str(&rest[..amp]);
            let after = &rest[amp + 1..];
            let semi = after
                .find(';')
                .ok_or_else(|| malformed("unterminated entity reference"))?;
            let reference = &after[..semi];
            rest = &after[semi + 1..];

            if let Some(code) = reference.strip_prefix('#') {
                text.push(parse_char_ref(code)?);
            } else if let Some(c) = predefined(reference) {
                text.push(c);
            } else if is_name(reference) {
                if !text.is_empty() {
                    self.check_length(&text)?;
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Entity(reference.to_string()));
            } else {
                return Err(malformed(format!("invalid entity reference '&{reference};'")));
            }
        }
        text.push_str(rest);
        if !text.is_empty() {
            self.check_length(&text)?;
            segments.push(Segment::Text(text));
        }
        Ok(segments)
    }

    fn expand_named(
        &mut self,
        name: &str,
        context: Context,
        out: &mut String,
        active: &mut Vec<String>,
    ) -> Result<(), EntityError> {
        if active.iter().any(|open| open == name) {
            return Err(malformed(format!("entity '{name}' references itself")));
        }
        let Some(replacement) = self.replacement(name, context)? else {
            return Ok(());
        };
        active.push(name.to_string());
        self.expand_into(&replacement, context, out, active)?;
        active.pop();
        Ok(())
    }

    /// Returns the replacement text of general entity `name`, counting one
    /// expansion. `None` means the reference is skipped because the entity
    /// may be declared in the unread external subset.
    pub(crate) fn replacement(
        &mut self,
        name: &str,
        context: Context,
    ) -> Result<Option<String>, EntityError> {
        let Some(declaration) = self.general.get(name).cloned() else {
            if self.incomplete {
                debug!(name, "skipped reference to undeclared entity");
                return Ok(None);
            }
            return Err(malformed(format!("undefined entity '{name}'")));
        };
        self.count_expansion()?;

        let text = match declaration {
            Declaration::Internal(text) => text,
            Declaration::Unparsed => {
                return Err(malformed(format!("reference to unparsed entity '{name}'")));
            }
            Declaration::External(id) => {
                if context == Context::Attribute {
                    return Err(malformed(format!(
                        "external entity '{name}' referenced in attribute value"
                    )));
                }
                if !self.policy.external_general {
                    return Err(Error::ForbiddenEntity {
                        name: name.to_string(),
                        system_id: id.system_id,
                    }
                    .into());
                }
                self.load(&id)?
            }
        };
        Ok(Some(text))
    }

    fn count_expansion(&mut self) -> Result<(), EntityError> {
        self.expansions += 1;
        if self.expansions > self.policy.max_expansions {
            return Err(malformed(format!(
                "entity expansion limit of {} exceeded",
                self.policy.max_expansions
            )));
        }
        Ok(())
    }

    fn check_length(&self, out: &str) -> Result<(), EntityError> {
        if out.len() > self.policy.max_length {
            return Err(malformed(format!(
                "text exceeds maximum length of {} bytes",
                self.policy.max_length
            )));
        }
        Ok(())
    }

    fn load(&mut self, id: &ExternalId) -> Result<String, EntityError> {
        if let Some(text) = self.loaded.get(&id.system_id) {
            return Ok(text.clone());
        }
        debug!(
            system_id = %id.system_id,
            public_id = ?id.public_id,
            "loading external entity"
        );
        let text = load_external(&id.system_id, self.policy.base.as_ref(), self.policy.timeout)?;
        let text = strip_text_declaration(&text).to_string();
        self.loaded.insert(id.system_id.clone(), text.clone());
        Ok(text)
    }
}

/// Appends literal text; attribute values get tabs and newlines turned
/// into spaces and may not contain `<`.
fn push_literal(out: &mut String, text: &str, context: Context) -> Result<(), EntityError> {
    match context {
        Context::Content => out.push_str(text),
        Context::Attribute => {
            if text.contains('<') {
                return Err(malformed("'<' not allowed in attribute value"));
            }
            out.extend(
                text.chars()
                    .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c }),
            );
        }
    }
    Ok(())
}

fn predefined(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => None,
    }
}

fn parse_char_ref(code: &str) -> Result<char, EntityError> {
    let value = match code.strip_prefix('x') {
        Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            u32::from_str_radix(hex, 16).ok()
        }
        None if !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit()) => code.parse().ok(),
        _ => None,
    };
    value
        .and_then(char::from_u32)
        .filter(|&c| is_xml_char(c))
        .ok_or_else(|| malformed(format!("invalid character reference '&#{code};'")))
}

/// Drops a leading `<?xml ...?>` text declaration from external entity text.
fn strip_text_declaration(text: &str) -> &str {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.starts_with("<?xml") && text[5..].starts_with(is_xml_whitespace) {
        if let Some(end) = text.find("?>") {
            return &text[end + 2..];
        }
    }
    text
}

/// Cursor over declaration text.
struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn skip_whitespace(&mut self) -> bool {
        let rest = self.rest();
        let skipped = rest.len() - rest.trim_start_matches(is_xml_whitespace).len();
        self.pos += skipped;
        skipped > 0
    }

    fn require_whitespace(&mut self) -> Result<(), EntityError> {
        if self.skip_whitespace() {
            Ok(())
        } else {
            Err(malformed("whitespace required in declaration"))
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), EntityError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(malformed(format!("expected '{token}' in declaration")))
        }
    }

    fn name(&mut self) -> Result<&'a str, EntityError> {
        let rest = self.rest();
        let end = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
        if end == 0 {
            return Err(malformed("name expected in declaration"));
        }
        self.pos += end;
        Ok(&rest[..end])
    }

    fn peek_quote(&self) -> bool {
        self.rest().starts_with(['"', '\''])
    }

    fn quoted(&mut self) -> Result<&'a str, EntityError> {
        let rest = self.rest();
        let quote = match rest.chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(malformed("quoted literal expected in declaration")),
        };
        let body = &rest[1..];
        let end = body
            .find(quote)
            .ok_or_else(|| malformed("unterminated literal in declaration"))?;
        self.pos += end + 2;
        Ok(&body[..end])
    }

    fn skip_past(&mut self, token: &str) -> Result<(), EntityError> {
        match self.rest().find(token) {
            Some(i) => {
                self.pos += i + token.len();
                Ok(())
            }
            None => Err(malformed(format!("expected '{token}' in declaration"))),
        }
    }

    /// Skips an `<!ELEMENT`, `<!ATTLIST` or `<!NOTATION` declaration.
    fn skip_declaration(&mut self) -> Result<(), EntityError> {
        let mut quote = None;
        for (i, c) in self.rest().char_indices() {
            match (quote, c) {
                (None, '"' | '\'') => quote = Some(c),
                (Some(q), _) if c == q => quote = None,
                (None, '>') => {
                    self.pos += i + 1;
                    return Ok(());
                }
                _ => {}
            }
        }
        Err(malformed("unterminated markup declaration"))
    }

    fn external_id(&mut self) -> Result<Option<ExternalId>, EntityError> {
        if self.eat("SYSTEM") {
            self.require_whitespace()?;
            let system_id = self.quoted()?.to_string();
            Ok(Some(ExternalId {
                system_id,
                public_id: None,
            }))
        } else if self.eat("PUBLIC") {
            self.require_whitespace()?;
            let public_id = self.quoted()?.to_string();
            self.require_whitespace()?;
            let system_id = self.quoted()?.to_string();
            Ok(Some(ExternalId {
                system_id,
                public_id: Some(public_id),
            }))
        } else {
            Ok(None)
        }
    }
}
