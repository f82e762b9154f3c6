//! Input resolution.
//!
//! A string handed to [`parse`](crate::parser::parse) may be a path, a URL
//! or the XML itself. [`Source::resolve`] decides which, in this order:
//!
//! 1. a syntactically valid path that exists on disk is a file;
//! 2. a string starting with `http://` or `https://` is a URL;
//! 3. anything else is literal XML.
//!
//! Open streams skip resolution entirely via [`Source::Reader`].

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::Error;

/// Longest path accepted by [`is_pathname_valid`].
const MAX_PATH_LENGTH: usize = 4096;
/// Longest single path component accepted by [`is_pathname_valid`].
const MAX_COMPONENT_LENGTH: usize = 255;

/// Where the XML comes from.
pub enum Source<'a> {
    /// XML text held in memory.
    Literal(&'a str),
    /// A file on the local filesystem.
    File(PathBuf),
    /// An HTTP or HTTPS resource.
    Url(Url),
    /// An already open stream.
    Reader(Box<dyn Read + 'a>),
}

impl<'a> Source<'a> {
    /// Classifies a string argument.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingInput`] for an empty or blank string, and
    /// [`Error::InvalidUrl`] for an `http(s)://` string that is not a
    /// valid URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use untangle::parser::Source;
    ///
    /// let source = Source::resolve("<root/>").unwrap();
    /// assert!(matches!(source, Source::Literal("<root/>")));
    ///
    /// let source = Source::resolve("https://example.com/feed.xml").unwrap();
    /// assert!(matches!(source, Source::Url(_)));
    /// ```
    pub fn resolve(input: &'a str) -> Result<Self, Error> {
        if input.trim().is_empty() {
            return Err(Error::MissingInput);
        }
        if is_pathname_valid(input) && Path::new(input).exists() {
            return Ok(Source::File(PathBuf::from(input)));
        }
        if is_url(input) {
            return parse_url(input).map(Source::Url);
        }
        Ok(Source::Literal(input))
    }

    /// Wraps an open stream.
    pub fn from_reader(reader: impl Read + 'a) -> Self {
        Source::Reader(Box::new(reader))
    }

    /// Short label for log output.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Source::Literal(_) => "literal",
            Source::File(_) => "file",
            Source::Url(_) => "url",
            Source::Reader(_) => "reader",
        }
    }
}

impl fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Literal(xml) => f.debug_tuple("Literal").field(xml).finish(),
            Source::File(path) => f.debug_tuple("File").field(path).finish(),
            Source::Url(url) => f.debug_tuple("Url").field(&url.as_str()).finish(),
            Source::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

/// Returns `true` if `s` starts with `http://` or `https://`.
#[must_use]
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Returns `true` if `s` could name a file: non-empty, no NUL bytes, and
/// within the usual length limits for the whole path and each component.
///
/// This is a syntactic check only; the file need not exist.
#[must_use]
pub fn is_pathname_valid(s: &str) -> bool {
    if s.is_empty() || s.len() > MAX_PATH_LENGTH || s.contains('\0') {
        return false;
    }
    s.split(['/', '\\'])
        .all(|component| component.len() <= MAX_COMPONENT_LENGTH)
}

/// Location that relative external identifiers resolve against.
#[derive(Debug, Clone)]
pub(crate) enum Base {
    Dir(PathBuf),
    Url(Url),
}

impl Base {
    /// The base for a document read from `path`.
    pub(crate) fn for_file(path: &Path) -> Self {
        Base::Dir(path.parent().map(Path::to_path_buf).unwrap_or_default())
    }
}

pub(crate) fn parse_url(input: &str) -> Result<Url, Error> {
    Url::parse(input).map_err(|source| Error::InvalidUrl {
        url: input.to_string(),
        source,
    })
}

/// Opens an HTTP(S) resource for reading.
pub(crate) fn fetch(url: &Url, timeout: Duration) -> Result<Box<dyn Read + Send + Sync>, Error> {
    debug!(url = %url, ?timeout, "fetching");
    let agent = ureq::AgentBuilder::new().timeout(timeout).build();
    let response = agent.get(url.as_str()).call().map_err(|err| Error::Fetch {
        url: url.to_string(),
        source: Box::new(err),
    })?;
    Ok(response.into_reader())
}

pub(crate) fn open_file(path: &Path) -> Result<fs::File, Error> {
    fs::File::open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })
}

enum Location {
    File(PathBuf),
    Remote(Url),
}

fn locate(system_id: &str, base: Option<&Base>) -> Result<Location, Error> {
    if is_url(system_id) {
        return parse_url(system_id).map(Location::Remote);
    }
    if system_id.starts_with("file:") {
        let url = parse_url(system_id)?;
        return url
            .to_file_path()
            .map(Location::File)
            .map_err(|()| Error::Open {
                path: PathBuf::from(system_id),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "not a local file URL",
                ),
            });
    }
    match base {
        Some(Base::Url(base)) => {
            let url = base.join(system_id).map_err(|source| Error::InvalidUrl {
                url: system_id.to_string(),
                source,
            })?;
            if url.scheme() == "file" {
                if let Ok(path) = url.to_file_path() {
                    return Ok(Location::File(path));
                }
            }
            Ok(Location::Remote(url))
        }
        Some(Base::Dir(dir)) => Ok(Location::File(dir.join(system_id))),
        None => Ok(Location::File(PathBuf::from(system_id))),
    }
}

/// Reads the text of an external entity or DTD subset.
pub(crate) fn load_external(
    system_id: &str,
    base: Option<&Base>,
    timeout: Duration,
) -> Result<String, Error> {
    let mut text = String::new();
    match locate(system_id, base)? {
        Location::File(path) => {
            open_file(&path)?.read_to_string(&mut text)?;
        }
        Location::Remote(url) => {
            fetch(&url, timeout)?.read_to_string(&mut text)?;
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input_is_missing() {
        assert!(matches!(Source::resolve(""), Err(Error::MissingInput)));
        assert!(matches!(Source::resolve("  \n\t"), Err(Error::MissingInput)));
    }

    #[test]
    fn test_literal_xml() {
        let source = Source::resolve("<a><b/></a>").unwrap();
        assert!(matches!(source, Source::Literal("<a><b/></a>")));
        assert_eq!(source.kind(), "literal");
    }

    #[test]
    fn test_existing_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml");
        let source = Source::resolve(path).unwrap();
        assert!(matches!(source, Source::File(ref p) if p == Path::new(path)));
    }

    #[test]
    fn test_missing_file_is_literal() {
        let source = Source::resolve("no/such/file.xml").unwrap();
        assert!(matches!(source, Source::Literal(_)));
    }

    #[test]
    fn test_url() {
        let source = Source::resolve("http://example.com/a.xml").unwrap();
        match source {
            Source::Url(url) => assert_eq!(url.host_str(), Some("example.com")),
            other => panic!("expected url, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_url() {
        let err = Source::resolve("http://256.0.0.1/foo.dtd").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("http://x"));
        assert!(is_url("https://x"));
        assert!(!is_url("ftp://x"));
        assert!(!is_url("<http://x/>"));
    }

    #[test]
    fn test_is_pathname_valid() {
        assert!(is_pathname_valid("tests/res/pom.xml"));
        assert!(is_pathname_valid("<root><child/></root>"));
        assert!(!is_pathname_valid(""));
        assert!(!is_pathname_valid("a\0b"));
        assert!(!is_pathname_valid(&"x".repeat(MAX_COMPONENT_LENGTH + 1)));
        assert!(!is_pathname_valid(&"ab/".repeat(MAX_PATH_LENGTH)));
    }

    #[test]
    fn test_locate_relative_to_dir() {
        let base = Base::for_file(Path::new("docs/feed.xml"));
        match locate("entities.dtd", Some(&base)).unwrap() {
            Location::File(path) => assert_eq!(path, Path::new("docs/entities.dtd")),
            Location::Remote(url) => panic!("expected file, got {url}"),
        }
    }

    #[test]
    fn test_locate_relative_to_url() {
        let base = Base::Url(Url::parse("http://example.com/feeds/a.xml").unwrap());
        match locate("b.dtd", Some(&base)).unwrap() {
            Location::Remote(url) => assert_eq!(url.as_str(), "http://example.com/feeds/b.dtd"),
            Location::File(path) => panic!("expected url, got {}", path.display()),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_external("does-not-exist.dtd", None, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::Open { .. }));
    }

    #[test]
    fn test_debug_hides_reader() {
        let source = Source::from_reader(&b"<a/>"[..]);
        assert_eq!(format!("{source:?}"), "Reader(..)");
    }
}
