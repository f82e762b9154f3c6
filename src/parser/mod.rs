//! Parse entry points and options.
//!
//! Every entry point ends in the same pipeline: resolve the input to a
//! byte stream, drive the SAX layer over it with a fresh
//! [`TreeBuilder`](crate::builder::TreeBuilder), and hand back the root
//! [`Node`].
//!
//! External entities and the external DTD subset are never loaded unless
//! the caller turns on [`Feature::ExternalGeneralEntities`] or
//! [`Feature::ExternalParameterEntities`].

pub mod features;
pub mod source;

pub use features::Feature;
pub use source::{is_pathname_valid, is_url, Source};

use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::builder::TreeBuilder;
use crate::error::{Error, Result};
use crate::sax;
use crate::tree::Node;

use source::Base;

/// Default maximum element nesting depth.
pub const DEFAULT_MAX_DEPTH: u32 = 256;
/// Default maximum number of attributes on one element.
pub const DEFAULT_MAX_ATTRIBUTES: u32 = 256;
/// Default maximum attribute value length in bytes (10 MB).
pub const DEFAULT_MAX_ATTRIBUTE_LENGTH: usize = 10_000_000;
/// Default maximum text length in bytes (10 MB).
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 10_000_000;
/// Default maximum name length in bytes.
pub const DEFAULT_MAX_NAME_LENGTH: usize = 50_000;
/// Default maximum number of entity expansions per document.
pub const DEFAULT_MAX_ENTITY_EXPANSIONS: u32 = 10_000;
/// Default timeout for URL fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Parse options: feature toggles and security limits.
///
/// Use the builder pattern to configure options:
///
/// ```
/// use untangle::parser::ParseOptions;
///
/// let opts = ParseOptions::default()
///     .namespaces(true)
///     .string_interning(true)
///     .max_depth(64);
/// assert!(opts.namespaces);
/// ```
///
/// Or set features by name:
///
/// ```
/// use untangle::parser::ParseOptions;
///
/// let opts = ParseOptions::default()
///     .feature("feature_external_ges", false)
///     .unwrap();
/// assert!(!opts.external_general_entities);
/// ```
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Report local names and drop `xmlns` attributes.
    pub namespaces: bool,
    /// With `namespaces`, keep `xmlns` attributes.
    pub namespace_prefixes: bool,
    /// Intern element and attribute names.
    pub string_interning: bool,
    /// Load the external DTD subset and external general entities.
    pub external_general_entities: bool,
    /// Load external parameter entities.
    pub external_parameter_entities: bool,

    // -- Security limits --
    /// Maximum element nesting depth (default: 256).
    pub max_depth: u32,
    /// Maximum number of attributes on a single element (default: 256).
    pub max_attributes: u32,
    /// Maximum length in bytes of a single attribute value (default: 10 MB).
    pub max_attribute_length: usize,
    /// Maximum length in bytes of a text run after expansion (default: 10 MB).
    pub max_text_length: usize,
    /// Maximum length in bytes of an element name (default: 50,000).
    pub max_name_length: usize,
    /// Maximum number of entity reference expansions per document (default: 10,000).
    pub max_entity_expansions: u32,
    /// Timeout applied to each URL fetch (default: 30 s).
    pub fetch_timeout: Duration,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            namespaces: false,
            namespace_prefixes: false,
            string_interning: false,
            external_general_entities: false,
            external_parameter_entities: false,
            max_depth: DEFAULT_MAX_DEPTH,
            max_attributes: DEFAULT_MAX_ATTRIBUTES,
            max_attribute_length: DEFAULT_MAX_ATTRIBUTE_LENGTH,
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            max_entity_expansions: DEFAULT_MAX_ENTITY_EXPANSIONS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl ParseOptions {
    /// Enables or disables namespace processing.
    #[must_use]
    pub fn namespaces(mut self, yes: bool) -> Self {
        self.namespaces = yes;
        self
    }

    /// Keeps or drops `xmlns` attributes under namespace processing.
    #[must_use]
    pub fn namespace_prefixes(mut self, yes: bool) -> Self {
        self.namespace_prefixes = yes;
        self
    }

    /// Enables or disables name interning.
    #[must_use]
    pub fn string_interning(mut self, yes: bool) -> Self {
        self.string_interning = yes;
        self
    }

    /// Allows or forbids external general entities and the external DTD subset.
    ///
    /// # Security
    ///
    /// **Warning:** enabling this opens the door to XML External Entity
    /// (XXE) attacks. Only use it with trusted input.
    #[must_use]
    pub fn external_general_entities(mut self, yes: bool) -> Self {
        self.external_general_entities = yes;
        self
    }

    /// Allows or forbids external parameter entities.
    #[must_use]
    pub fn external_parameter_entities(mut self, yes: bool) -> Self {
        self.external_parameter_entities = yes;
        self
    }

    /// Sets the maximum element nesting depth.
    #[must_use]
    pub fn max_depth(mut self, max: u32) -> Self {
        self.max_depth = max;
        self
    }

    /// Sets the maximum number of attributes per element.
    #[must_use]
    pub fn max_attributes(mut self, max: u32) -> Self {
        self.max_attributes = max;
        self
    }

    /// Sets the maximum attribute value length in bytes.
    #[must_use]
    pub fn max_attribute_length(mut self, max: usize) -> Self {
        self.max_attribute_length = max;
        self
    }

    /// Sets the maximum text length in bytes.
    #[must_use]
    pub fn max_text_length(mut self, max: usize) -> Self {
        self.max_text_length = max;
        self
    }

    /// Sets the maximum element name length in bytes.
    #[must_use]
    pub fn max_name_length(mut self, max: usize) -> Self {
        self.max_name_length = max;
        self
    }

    /// Sets the maximum number of entity reference expansions.
    #[must_use]
    pub fn max_entity_expansions(mut self, max: u32) -> Self {
        self.max_entity_expansions = max;
        self
    }

    /// Sets the URL fetch timeout.
    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Sets a feature by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFeature`] for a name that is not a
    /// [`Feature`], and [`Error::UnsupportedFeature`] for `validation`
    /// set to `true`.
    pub fn feature(mut self, name: &str, value: bool) -> Result<Self> {
        self.set_feature(name.parse()?, value)?;
        Ok(self)
    }

    /// Sets several features by name, stopping at the first bad one.
    ///
    /// # Errors
    ///
    /// Same as [`ParseOptions::feature`].
    pub fn features<I, S>(self, features: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, bool)>,
        S: AsRef<str>,
    {
        features
            .into_iter()
            .try_fold(self, |options, (name, value)| options.feature(name.as_ref(), value))
    }

    /// Sets a feature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] for `validation` set to `true`.
    pub fn set_feature(&mut self, feature: Feature, value: bool) -> Result<()> {
        match feature {
            Feature::Namespaces => self.namespaces = value,
            Feature::NamespacePrefixes => self.namespace_prefixes = value,
            Feature::StringInterning => self.string_interning = value,
            Feature::Validation => {
                if value {
                    return Err(Error::UnsupportedFeature {
                        feature: feature.name(),
                        value,
                    });
                }
            }
            Feature::ExternalGeneralEntities => self.external_general_entities = value,
            Feature::ExternalParameterEntities => self.external_parameter_entities = value,
        }
        Ok(())
    }

    /// Current value of a feature.
    #[must_use]
    pub fn get_feature(&self, feature: Feature) -> bool {
        match feature {
            Feature::Namespaces => self.namespaces,
            Feature::NamespacePrefixes => self.namespace_prefixes,
            Feature::StringInterning => self.string_interning,
            Feature::Validation => false,
            Feature::ExternalGeneralEntities => self.external_general_entities,
            Feature::ExternalParameterEntities => self.external_parameter_entities,
        }
    }
}

/// Parses a path, URL or XML string with default options.
///
/// # Errors
///
/// Returns [`Error::MissingInput`] for a blank string, [`Error::Parse`]
/// if the XML is not well-formed, and I/O or fetch errors for file and URL
/// input.
///
/// # Examples
///
/// ```
/// let root = untangle::parse(r#"<Soup name="Tomato soup"><Water qty="1l"/></Soup>"#).unwrap();
/// let soup = root.child("Soup").unwrap();
/// assert_eq!(soup.attribute("name"), Some("Tomato soup"));
/// assert_eq!(soup.child("Water").unwrap().attribute("qty"), Some("1l"));
/// ```
pub fn parse(source: &str) -> Result<Node> {
    parse_with(source, &ParseOptions::default())
}

/// Parses a path, URL or XML string.
///
/// # Errors
///
/// Same as [`parse`].
pub fn parse_with(source: &str, options: &ParseOptions) -> Result<Node> {
    parse_source(Source::resolve(source)?, options)
}

/// Parses a path, URL or XML string with named features applied on top of
/// the defaults.
///
/// Feature names are checked before any input is read.
///
/// # Errors
///
/// Returns [`Error::UnknownFeature`] or [`Error::UnsupportedFeature`] for
/// a bad toggle, otherwise the same as [`parse`].
///
/// # Examples
///
/// ```
/// use untangle::error::Error;
///
/// let err = untangle::parse_with_features("<a/>", [("invalid_feature", true)]).unwrap_err();
/// assert!(matches!(err, Error::UnknownFeature(_)));
/// ```
pub fn parse_with_features<I, S>(source: &str, features: I) -> Result<Node>
where
    I: IntoIterator<Item = (S, bool)>,
    S: AsRef<str>,
{
    if source.trim().is_empty() {
        return Err(Error::MissingInput);
    }
    let options = ParseOptions::default().features(features)?;
    parse_with(source, &options)
}

/// Parses an XML string without path or URL resolution.
///
/// # Errors
///
/// Returns [`Error::MissingInput`] for a blank string and [`Error::Parse`]
/// if the XML is not well-formed.
pub fn parse_str(xml: &str, options: &ParseOptions) -> Result<Node> {
    if xml.trim().is_empty() {
        return Err(Error::MissingInput);
    }
    parse_source(Source::Literal(xml), options)
}

/// Parses a file.
///
/// # Errors
///
/// Returns [`Error::Open`] if the file cannot be opened, otherwise the
/// same as [`parse`].
pub fn parse_file(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Node> {
    parse_source(Source::File(path.as_ref().to_path_buf()), options)
}

/// Fetches and parses an HTTP(S) resource.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] or [`Error::Fetch`] if the resource
/// cannot be retrieved, otherwise the same as [`parse`].
pub fn parse_url(url: &str, options: &ParseOptions) -> Result<Node> {
    parse_source(Source::Url(source::parse_url(url)?), options)
}

/// Parses XML read from an open stream.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the XML is not well-formed.
pub fn parse_reader<R: Read>(reader: R, options: &ParseOptions) -> Result<Node> {
    parse_source(Source::from_reader(reader), options)
}

/// Parses an already resolved source.
///
/// # Errors
///
/// Same as [`parse`].
pub fn parse_source(source: Source<'_>, options: &ParseOptions) -> Result<Node> {
    debug!(kind = source.kind(), "parsing");
    match source {
        // Already decoded, so the declared encoding must not apply again.
        Source::Literal(xml) => build(options, |builder| sax::drive_str(xml, options, builder)),
        Source::File(path) => {
            let file = source::open_file(&path)?;
            let base = Some(Base::for_file(&path));
            build(options, |builder| sax::drive(BufReader::new(file), options, base, builder))
        }
        Source::Url(url) => {
            let body = source::fetch(&url, options.fetch_timeout)?;
            let base = Some(Base::Url(url));
            build(options, |builder| sax::drive(BufReader::new(body), options, base, builder))
        }
        Source::Reader(reader) => {
            build(options, |builder| sax::drive(BufReader::new(reader), options, None, builder))
        }
    }
}

fn build(options: &ParseOptions, run: impl FnOnce(&mut TreeBuilder) -> Result<()>) -> Result<Node> {
    let mut builder = TreeBuilder::new(options.string_interning);
    run(&mut builder)?;
    builder.finish()
}
