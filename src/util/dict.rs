//! String interning dictionary.
//!
//! With the `string_interning` feature on, the tree builder routes every
//! element name and attribute key through a `Dict`, so repeated names across
//! the tree share a single allocation. Interned strings are handed out as
//! `Arc<str>` and stay valid after the dictionary is dropped.

use std::collections::HashSet;
use std::sync::Arc;

/// A string interning dictionary.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use untangle::util::dict::Dict;
///
/// let mut dict = Dict::new();
/// let a = dict.intern("item");
/// let b = dict.intern("item");
/// let c = dict.intern("other");
///
/// assert!(Arc::ptr_eq(&a, &b));
/// assert!(!Arc::ptr_eq(&a, &c));
/// assert_eq!(&*a, "item");
/// ```
#[derive(Debug, Default)]
pub struct Dict {
    strings: HashSet<Arc<str>>,
}

impl Dict {
    /// Creates a new empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared copy of `s`, storing it first if it is new.
    pub fn intern(&mut self, s: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(s) {
            return Arc::clone(existing);
        }
        let interned: Arc<str> = Arc::from(s);
        self.strings.insert(Arc::clone(&interned));
        interned
    }

    /// Returns the number of distinct interned strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns `true` if nothing has been interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_shares_allocation() {
        let mut dict = Dict::new();
        let a = dict.intern("hello");
        let b = dict.intern("hello");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_intern_distinct_strings() {
        let mut dict = Dict::new();
        let a = dict.intern("hello");
        let b = dict.intern("world");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(&*b, "world");
    }

    #[test]
    fn test_len_and_is_empty() {
        let mut dict = Dict::new();
        assert!(dict.is_empty());

        dict.intern("a");
        dict.intern("b");
        dict.intern("a");
        assert_eq!(dict.len(), 2);
        assert!(!dict.is_empty());
    }

    #[test]
    fn test_interned_string_outlives_dict() {
        let name = {
            let mut dict = Dict::new();
            dict.intern("survivor")
        };
        assert_eq!(&*name, "survivor");
    }

    #[test]
    fn test_empty_string_interning() {
        let mut dict = Dict::new();
        assert_eq!(&*dict.intern(""), "");
        assert_eq!(dict.len(), 1);
    }
}
