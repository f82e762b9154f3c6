//! Tag-name sanitization.
//!
//! XML names may contain characters that cannot appear in an identifier.
//! Every element name is rewritten before it enters the tree so that it can
//! be used as a plain lookup key:
//!
//! 1. each `-`, `.` and `:` becomes `_`;
//! 2. if the result is a reserved word, a single `_` is appended.
//!
//! The reserved-word table is the union of the Rust keywords (strict,
//! reserved and weak) and the Python keywords. The latter keeps names such as
//! `class` or `None` compatible with trees produced by earlier releases.
//!
//! Sanitization is idempotent, and two raw names that sanitize to the same
//! string (`foo-bar` and `foo_bar`) are deliberately grouped together.

use std::borrow::Cow;

/// Characters that are rewritten to `_`.
const REPLACED: [char; 3] = ['-', '.', ':'];

/// Reserved identifiers, sorted for binary search.
const RESERVED_WORDS: &[&str] = &[
    "False", "None", "Self", "True", "abstract", "and", "as", "assert", "async", "await",
    "become", "box", "break", "class", "const", "continue", "crate", "def", "del", "do", "dyn",
    "elif", "else", "enum", "except", "extern", "false", "final", "finally", "fn", "for",
    "from", "gen", "global", "if", "impl", "import", "in", "is", "lambda", "let", "loop",
    "macro", "match", "mod", "move", "mut", "nonlocal", "not", "or", "override", "pass", "priv",
    "pub", "raise", "ref", "return", "self", "static", "struct", "super", "trait", "true", "try",
    "type", "typeof", "union", "unsafe", "unsized", "use", "virtual", "where", "while", "with",
    "yield",
];

/// Returns `true` if `name` is in the reserved-word table.
#[must_use]
pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.binary_search(&name).is_ok()
}

/// Rewrites a raw XML tag name into its sanitized form.
///
/// Borrows the input when nothing needs to change.
///
/// # Examples
///
/// ```
/// use untangle::util::sanitize::sanitize_name;
///
/// assert_eq!(sanitize_name("foo-bar:baz.qux"), "foo_bar_baz_qux");
/// assert_eq!(sanitize_name("class"), "class_");
/// assert_eq!(sanitize_name("plain"), "plain");
/// ```
#[must_use]
pub fn sanitize_name(raw: &str) -> Cow<'_, str> {
    let mut name = if raw.contains(REPLACED) {
        Cow::Owned(raw.replace(REPLACED, "_"))
    } else {
        Cow::Borrowed(raw)
    };
    if is_reserved_word(&name) {
        name.to_mut().push('_');
    }
    name
}
