//! Validated SQL identifiers.
//!
//! Table and column names are the only caller-supplied text that is rendered into SQL
//! verbatim, so every one of them goes through [`Ident::parse`]. Only ASCII letters,
//! digits and `_` are accepted; there is no quoting and no dotted notation.
//!
//! # Example
//! ```ignore
//! use pgtable::Ident;
//!
//! let col = Ident::parse("created_at")?;
//! assert!(Ident::parse("name; DROP TABLE users").is_err());
//! # Ok::<(), pgtable::QbError>(())
//! ```

use crate::error::{QbError, QbResult};
use std::fmt;

/// A table or column name matching `[A-Za-z0-9_]+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    /// Validate an identifier.
    pub fn parse(s: &str) -> QbResult<Self> {
        if s.is_empty() {
            return Err(QbError::invalid_argument("Identifier cannot be empty"));
        }
        if let Some(c) = s.chars().find(|c| !(*c == '_' || c.is_ascii_alphanumeric())) {
            return Err(QbError::invalid_argument(format!(
                "Invalid character {c:?} in identifier {s:?}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validate a list of identifiers, failing on the first bad one.
pub(crate) fn parse_all<S: AsRef<str>>(names: &[S]) -> QbResult<Vec<Ident>> {
    names.iter().map(|n| Ident::parse(n.as_ref())).collect()
}
