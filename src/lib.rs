//! # untangle
//!
//! Converts an XML document into a tree of generic [`Node`]s that can be
//! navigated by child name, without writing any schema-specific types.
//!
//! Tag names are sanitized into identifier-like keys (`-`, `.` and `:`
//! become `_`, reserved words get a trailing `_`), siblings with the same
//! name form a group, attributes are read with [`Node::attribute`], and
//! character data is concatenated into [`Node::text`].
//!
//! ## Quick Start
//!
//! ```
//! let root = untangle::parse(
//!     r#"<Soup name="Tomato soup" version="1">
//!          <Ingredients><Water qty="1l"/></Ingredients>
//!        </Soup>"#,
//! )
//! .unwrap();
//!
//! let soup = root.child("Soup").unwrap();
//! assert_eq!(soup.attribute("name"), Some("Tomato soup"));
//! let water = soup.child("Ingredients").unwrap().child("Water").unwrap();
//! assert_eq!(water.attribute("qty"), Some("1l"));
//! ```
//!
//! [`parse`] accepts a file path, an `http(s)://` URL or XML text. External
//! entities and external DTDs are not loaded unless enabled through
//! [`ParseOptions`].

pub mod builder;
pub mod error;
pub mod parser;
pub mod sax;
pub mod tree;
pub mod util;

// Re-export primary types at the crate root for convenience.
pub use error::{Error, ParseError, Result};
pub use parser::{
    parse, parse_file, parse_reader, parse_source, parse_str, parse_url, parse_with,
    parse_with_features, Feature, ParseOptions, Source,
};
pub use tree::{Lookup, Node};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
