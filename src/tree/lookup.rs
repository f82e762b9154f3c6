//! The result of looking up children by name.

use std::slice;

use super::Node;
use crate::error::Error;

/// The group of direct children sharing one sanitized name.
///
/// Whether one or many children matched, a `Lookup` iterates over every
/// match in document order, so call sites do not have to care which case
/// they got.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<'a> {
    /// No child has that name.
    Absent,
    /// Exactly one child has that name.
    Single(&'a Node),
    /// More than one child has that name, in document order.
    Many(Vec<&'a Node>),
}

impl<'a> Lookup<'a> {
    /// Returns `true` if nothing matched.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns `true` if at least one child matched.
    #[must_use]
    pub fn exists(&self) -> bool {
        !self.is_absent()
    }

    /// Number of matched children.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Absent => 0,
            Self::Single(_) => 1,
            Self::Many(nodes) => nodes.len(),
        }
    }

    /// Returns `true` if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the `index`-th match.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&'a Node> {
        match self {
            Self::Absent => None,
            Self::Single(node) => (index == 0).then_some(*node),
            Self::Many(nodes) => nodes.get(index).copied(),
        }
    }

    /// The first match.
    #[must_use]
    pub fn first(&self) -> Option<&'a Node> {
        self.get(0)
    }

    /// The last match.
    #[must_use]
    pub fn last(&self) -> Option<&'a Node> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// The matched node, if exactly one child matched.
    #[must_use]
    pub fn node(&self) -> Option<&'a Node> {
        match self {
            Self::Single(node) => Some(*node),
            _ => None,
        }
    }

    /// Iterates over all matches in document order.
    pub fn iter(&self) -> Iter<'_, 'a> {
        match self {
            Self::Absent => Iter::Single(None),
            Self::Single(node) => Iter::Single(Some(*node)),
            Self::Many(nodes) => Iter::Slice(nodes.iter()),
        }
    }

    /// Looks up a grandchild group through a single match.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingMember`] if this lookup is not a single node
    /// or that node has no child named `name`.
    pub fn child(&self, name: &str) -> Result<Lookup<'a>, Error> {
        match self {
            Self::Single(node) => node.child(name),
            Self::Absent | Self::Many(_) => Err(Error::MissingMember {
                parent: self.first().and_then(Node::name).unwrap_or("").to_string(),
                name: name.to_string(),
            }),
        }
    }

    /// Attribute of a single match; `None` for groups and absent lookups.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&'a str> {
        self.node().and_then(|node| node.attribute(key))
    }

    /// Text of a single match; `None` for groups and absent lookups.
    #[must_use]
    pub fn text(&self) -> Option<&'a str> {
        self.node().map(Node::text)
    }

    /// Collects the matches into a vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<&'a Node> {
        match self {
            Self::Absent => Vec::new(),
            Self::Single(node) => vec![node],
            Self::Many(nodes) => nodes,
        }
    }
}

impl PartialEq<str> for Lookup<'_> {
    fn eq(&self, other: &str) -> bool {
        self.text() == Some(other)
    }
}

impl PartialEq<&str> for Lookup<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.text() == Some(*other)
    }
}

impl PartialEq<Node> for Lookup<'_> {
    fn eq(&self, other: &Node) -> bool {
        self.node().is_some_and(|node| node == other)
    }
}

/// Borrowing iterator over a [`Lookup`].
#[derive(Debug, Clone)]
pub enum Iter<'l, 'a> {
    #[doc(hidden)]
    Single(Option<&'a Node>),
    #[doc(hidden)]
    Slice(slice::Iter<'l, &'a Node>),
}

impl<'a> Iterator for Iter<'_, 'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Single(node) => node.take(),
            Self::Slice(nodes) => nodes.next().copied(),
        }
    }
}

impl<'a> IntoIterator for Lookup<'a> {
    type Item = &'a Node;
    type IntoIter = std::vec::IntoIter<&'a Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

impl<'l, 'a> IntoIterator for &'l Lookup<'a> {
    type Item = &'a Node;
    type IntoIter = Iter<'l, 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes() -> [Node; 3] {
        [
            Node::new("item").with_text("one"),
            Node::new("item").with_text("two"),
            Node::new("item").with_text("three"),
        ]
    }

    #[test]
    fn test_absent() {
        let lookup = Lookup::Absent;
        assert!(lookup.is_absent());
        assert_eq!(lookup.len(), 0);
        assert!(lookup.first().is_none());
        assert!(lookup.last().is_none());
        assert_eq!(lookup.iter().count(), 0);
        assert!(lookup.child("x").unwrap_err().is_missing_member());
    }

    #[test]
    fn test_single_behaves_like_one_element_group() {
        let node = Node::new("item").with_attribute("qty", "1l").with_text("water");
        let lookup = Lookup::Single(&node);
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.iter().count(), 1);
        assert_eq!(lookup.get(0).unwrap().text(), "water");
        assert!(lookup.get(1).is_none());
        assert_eq!(lookup.attribute("qty"), Some("1l"));
        assert_eq!(lookup, "water");
    }

    #[test]
    fn test_many_indexing_and_order() {
        let items = nodes();
        let lookup = Lookup::Many(items.iter().collect());
        assert_eq!(lookup.len(), 3);
        assert_eq!(lookup.first().unwrap().text(), "one");
        assert_eq!(lookup.last().unwrap().text(), "three");
        assert_eq!(lookup.get(1).unwrap().text(), "two");
        let texts: Vec<_> = (&lookup).into_iter().map(Node::text).collect();
        assert_eq!(texts, ["one", "two", "three"]);
    }

    #[test]
    fn test_many_has_no_single_accessors() {
        let items = nodes();
        let lookup = Lookup::Many(items.iter().collect());
        assert!(lookup.node().is_none());
        assert!(lookup.attribute("qty").is_none());
        assert!(lookup.text().is_none());
        assert!(lookup.child("name").unwrap_err().is_missing_member());
    }

    #[test]
    fn test_owned_iteration() {
        let items = nodes();
        let count = Lookup::Many(items.iter().collect()).into_iter().count();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_compare_with_sentinel_node() {
        let node = Node::new("xsl_apply_templates");
        assert_eq!(Lookup::Single(&node), Node::new(""));
        assert_ne!(Lookup::Absent, Node::new(""));
    }
}
