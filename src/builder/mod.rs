//! Event-to-tree builder.
//!
//! [`TreeBuilder`] is a [`SaxHandler`] that turns a balanced event stream
//! into a [`Node`] tree. It keeps a stack of open elements: a start event
//! pushes a new node, character data is appended to the node on top, and an
//! end event pops the top node and attaches it to the node below (or to the
//! root when the stack becomes empty).
//!
//! Nodes are owned by the stack while open, so a node joins its parent when
//! it closes rather than when it opens. Siblings still end up in document
//! order, since each one closes before the next one opens; the only visible
//! difference is that [`TreeBuilder::root`] does not show open elements.
//!
//! Element names are sanitized on the way in; attribute keys are kept as
//! written. A builder serves exactly one parse.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::sax::SaxHandler;
use crate::tree::Node;
use crate::util::dict::Dict;
use crate::util::sanitize::sanitize_name;

/// Builds a [`Node`] tree from SAX events.
///
/// # Examples
///
/// ```
/// use untangle::builder::TreeBuilder;
/// use untangle::sax::SaxHandler;
///
/// let mut builder = TreeBuilder::new(false);
/// builder.start_element("my-item", &[("id".into(), "7".into())]).unwrap();
/// builder.characters("hello").unwrap();
/// builder.end_element("my-item").unwrap();
///
/// let root = builder.finish().unwrap();
/// let item = root.child("my_item").unwrap();
/// assert_eq!(item.attribute("id"), Some("7"));
/// assert_eq!(item.text(), Some("hello"));
/// ```
#[derive(Debug)]
pub struct TreeBuilder {
    root: Node,
    open: Vec<Node>,
    dict: Option<Dict>,
}

impl TreeBuilder {
    /// Creates a builder with an empty root. With `string_interning`,
    /// names are shared through a [`Dict`].
    #[must_use]
    pub fn new(string_interning: bool) -> Self {
        Self {
            root: Node::root(),
            open: Vec::new(),
            dict: string_interning.then(Dict::new),
        }
    }

    /// The root built so far.
    ///
    /// Only closed elements are reachable from it. An element still open
    /// (and everything under it) is attached when its end event arrives, so
    /// mid-parse this is a prefix of the final tree, not a live view.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Number of currently open elements.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Consumes the builder and returns the finished root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnclosedElements`] if any element is still open.
    pub fn finish(self) -> Result<Node> {
        if !self.open.is_empty() {
            return Err(Error::UnclosedElements(self.open.len()));
        }
        debug!(
            children = self.root.len(),
            interned = self.dict.as_ref().map_or(0, Dict::len),
            "tree complete"
        );
        Ok(self.root)
    }

    fn intern(&mut self, s: &str) -> Arc<str> {
        match &mut self.dict {
            Some(dict) => dict.intern(s),
            None => Arc::from(s),
        }
    }
}

impl SaxHandler for TreeBuilder {
    fn start_element(&mut self, name: &str, attributes: &[(String, String)]) -> Result<()> {
        let name = sanitize_name(name);
        trace!(name = %name, depth = self.open.len(), "open element");
        let name = self.intern(&name);
        let mut attrs = BTreeMap::new();
        for (key, value) in attributes {
            attrs.insert(self.intern(key), value.clone());
        }
        self.open.push(Node::element(name, attrs));
        Ok(())
    }

    fn end_element(&mut self, _name: &str) -> Result<()> {
        let node = self
            .open
            .pop()
            .ok_or(Error::BuilderUnderflow { event: "end_element" })?;
        match self.open.last_mut() {
            Some(parent) => parent.add_child(node),
            None => self.root.add_child(node),
        }
        Ok(())
    }

    fn characters(&mut self, content: &str) -> Result<()> {
        let node = self
            .open
            .last_mut()
            .ok_or(Error::BuilderUnderflow { event: "characters" })?;
        node.push_text(content);
        Ok(())
    }
}
