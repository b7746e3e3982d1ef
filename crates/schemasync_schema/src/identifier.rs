//! Identifier rules shared by databases, branches, tables and columns.

use crate::error::{SchemaError, SchemaResult};

/// Returns true if `id` is a valid identifier for the remote service.
///
/// An identifier is non-empty, starts with a letter or a digit, and
/// continues with letters, digits, `-`, `_` or `~`.
pub fn is_valid_identifier(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) if is_letter_or_digit(first) => {}
        _ => return false,
    }
    chars.all(|c| is_letter_or_digit(c) || matches!(c, '-' | '_' | '~'))
}

/// Checks `name` and returns a [`SchemaError::InvalidIdentifier`] naming `kind` when it is invalid.
pub fn validate_identifier(kind: &'static str, name: &str) -> SchemaResult<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(SchemaError::invalid_identifier(kind, name))
    }
}

fn is_letter_or_digit(c: char) -> bool {
    c.is_alphabetic() || c.is_numeric()
}
