//! Utility modules for untangle.
//!
//! Contains XML character classes, tag-name sanitization, the string
//! interning dictionary used by the `string_interning` feature, and `QName`
//! handling for namespace mode.

pub mod chars;
pub mod dict;
pub mod qname;
pub mod sanitize;
