//! The closed set of terminal operations a table session supports.

use crate::error::{QbError, QbResult};
use std::fmt;
use std::str::FromStr;

/// A terminal operation on a [`Table`](crate::Table).
///
/// Every operation is an inherent method on the session, so unsupported calls do not compile.
/// This enum names them for error context and logging, and for callers that dispatch on
/// operation names at runtime (see [`FromStr`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    First,
    Find,
    Value,
    Count,
    Max,
    Avg,
    Insert,
    InsertGetId,
    Upsert,
    Update,
    Delete,
}

impl Operation {
    /// All supported operations.
    pub const ALL: [Operation; 12] = [
        Operation::Get,
        Operation::First,
        Operation::Find,
        Operation::Value,
        Operation::Count,
        Operation::Max,
        Operation::Avg,
        Operation::Insert,
        Operation::InsertGetId,
        Operation::Upsert,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::First => "first",
            Operation::Find => "find",
            Operation::Value => "value",
            Operation::Count => "count",
            Operation::Max => "max",
            Operation::Avg => "avg",
            Operation::Insert => "insert",
            Operation::InsertGetId => "insert_get_id",
            Operation::Upsert => "upsert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `snake_case` and `camelCase` spellings, case-insensitively.
impl FromStr for Operation {
    type Err = QbError;

    fn from_str(s: &str) -> QbResult<Self> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str().replace('_', "") == wanted)
            .ok_or_else(|| QbError::UnknownOperation(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_spellings() {
        assert_eq!("insert_get_id".parse::<Operation>().unwrap(), Operation::InsertGetId);
        assert_eq!("insertGetId".parse::<Operation>().unwrap(), Operation::InsertGetId);
        assert_eq!("COUNT".parse::<Operation>().unwrap(), Operation::Count);
    }

    #[test]
    fn rejects_unknown_names() {
        let err = "truncate".parse::<Operation>().unwrap_err();
        assert!(matches!(err, QbError::UnknownOperation(ref name) if name == "truncate"));
        assert!("".parse::<Operation>().is_err());
    }

    #[test]
    fn display_round_trips_for_every_operation() {
        for op in Operation::ALL {
            assert_eq!(op.to_string().parse::<Operation>().unwrap(), op);
        }
    }
}
