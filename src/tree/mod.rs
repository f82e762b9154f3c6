//! Generic element tree.
//!
//! A parsed document is a tree of [`Node`]s. The node returned by the parser
//! is a synthetic root (`is_root() == true`) whose single child is the
//! document element. Each node owns its children, so the whole tree belongs
//! to whoever called `parse` and nothing is shared between two parses.
//!
//! Children are addressed by their sanitized tag name. Siblings that share a
//! name form a *group*, returned as a [`Lookup`]:
//!
//! ```
//! use untangle::parse;
//!
//! let root = parse("<a><b/><b/><c/></a>").unwrap();
//! let a = root.child("a").unwrap();
//! assert_eq!(a.child("b").unwrap().len(), 2);
//! assert_eq!(a.child("c").unwrap().len(), 1);
//! assert!(a.child("d").unwrap_err().is_missing_member());
//! ```
//!
//! Attribute lookups never fail; a missing attribute is simply `None`.
//!
//! Equality between nodes compares **text only**. That lets a located node
//! be compared against a literal string or against an empty sentinel node
//! without caring about names or attributes. Use [`Node::deep_eq`] for a
//! full structural comparison.

mod lookup;

pub use lookup::{Iter, Lookup};

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::iter;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::Error;

/// One XML element, or the synthetic document root.
#[derive(Debug, Clone, Default)]
pub struct Node {
    name: Option<Arc<str>>,
    attributes: BTreeMap<Arc<str>, String>,
    children: Vec<Node>,
    text: String,
    is_root: bool,
}

impl Node {
    /// Creates a detached element node with the given (already sanitized)
    /// name and no attributes, children or text.
    ///
    /// Mostly useful as a sentinel to compare located nodes against.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::element(Arc::from(name), BTreeMap::new())
    }

    /// Creates an absent node: no name, not a root. [`Node::exists`] is
    /// `false` for it.
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    /// Returns this node with an extra attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(Arc::from(key), value.into());
        self
    }

    /// Returns this node with the given text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub(crate) fn root() -> Self {
        Self {
            is_root: true,
            ..Self::default()
        }
    }

    pub(crate) fn element(name: Arc<str>, attributes: BTreeMap<Arc<str>, String>) -> Self {
        Self {
            name: Some(name),
            attributes,
            ..Self::default()
        }
    }

    pub(crate) fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub(crate) fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// The sanitized tag name, or `None` for the root and absent nodes.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns `true` only for the synthetic root returned by the parser.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// Character data seen directly inside this element, concatenated in
    /// document order. Text between child elements is included; text inside
    /// children is not.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the raw value of an attribute, or `None` if it is not set.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Iterates over all attributes as `(key, value)` pairs, sorted by key.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.attributes.iter().map(|(k, v)| (&**k, v.as_str()))
    }

    /// All direct children in document order.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Finds the group of direct children named `name`.
    ///
    /// Never fails: an unknown name yields [`Lookup::Absent`].
    #[must_use]
    pub fn lookup(&self, name: &str) -> Lookup<'_> {
        let mut matches = self.children.iter().filter(|c| c.name() == Some(name));
        let Some(first) = matches.next() else {
            return Lookup::Absent;
        };
        match matches.next() {
            None => Lookup::Single(first),
            Some(second) => {
                let mut group = vec![first, second];
                group.extend(matches);
                Lookup::Many(group)
            }
        }
    }

    /// Finds the group of direct children named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingMember`] if no direct child has that name.
    pub fn child(&self, name: &str) -> Result<Lookup<'_>, Error> {
        match self.lookup(name) {
            Lookup::Absent => Err(self.missing(name)),
            found => Ok(found),
        }
    }

    pub(crate) fn missing(&self, name: &str) -> Error {
        Error::MissingMember {
            parent: self.name().unwrap_or("").to_string(),
            name: name.to_string(),
        }
    }

    /// Returns `true` if a direct child named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.children.iter().any(|c| c.name() == Some(name))
    }

    /// The distinct names of the direct children, in order of first
    /// appearance. Attribute keys are not included.
    #[must_use]
    pub fn child_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.children
            .iter()
            .filter_map(Node::name)
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Number of direct children (not descendants).
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if this node has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns `true` for the root and for any node that has a name.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.is_root || self.name.is_some()
    }

    /// Yields this node exactly once, so code written for a group of
    /// matches also works on a single node.
    pub fn iter(&self) -> iter::Once<&Node> {
        iter::once(self)
    }

    /// Recursive structural comparison: names, attributes, text and
    /// children all have to match.
    #[must_use]
    pub fn deep_eq(&self, other: &Node) -> bool {
        self.name == other.name
            && self.is_root == other.is_root
            && self.text == other.text
            && self.attributes == other.attributes
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.deep_eq(b))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl PartialEq<str> for Node {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl PartialEq<&str> for Node {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

impl PartialEq<String> for Node {
    fn eq(&self, other: &String) -> bool {
        self.text == *other
    }
}

impl PartialEq<Node> for str {
    fn eq(&self, other: &Node) -> bool {
        self == other.text
    }
}

impl PartialEq<Node> for &str {
    fn eq(&self, other: &Node) -> bool {
        *self == other.text
    }
}

impl<'a> IntoIterator for &'a Node {
    type Item = &'a Node;
    type IntoIter = iter::Once<&'a Node>;

    fn into_iter(self) -> Self::IntoIter {
        iter::once(self)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element <{}> with attributes {{", self.name().unwrap_or(""))?;
        for (i, (key, value)) in self.attributes().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key:?}: {value:?}")?;
        }
        write!(
            f,
            "}}, children {:?} and text {:?}",
            self.child_names(),
            self.text
        )
    }
}

impl FromStr for Node {
    type Err = Error;

    /// Parses literal XML. Unlike [`crate::parse`], the string is never
    /// interpreted as a path or URL.
    fn from_str(xml: &str) -> Result<Self, Self::Err> {
        crate::parser::parse_str(xml, &crate::parser::ParseOptions::default())
    }
}
