//! Typed clause fragments accumulated by a table session.
//!
//! Clauses carry no rendering logic; see [`expr`](super::expr) and
//! [`compile`](super::compile) for that.

use crate::error::{QbError, QbResult};
use crate::ident::Ident;
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// Comparison operator allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
    ILike,
    NotILike,
}

impl Op {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "<>",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Like => "LIKE",
            Op::NotLike => "NOT LIKE",
            Op::ILike => "ILIKE",
            Op::NotILike => "NOT ILIKE",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Case-insensitive; inner whitespace in `NOT LIKE` may be any run of spaces.
impl FromStr for Op {
    type Err = QbError;

    fn from_str(s: &str) -> QbResult<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_uppercase();
        let op = match normalized.as_str() {
            "=" => Op::Eq,
            "!=" | "<>" => Op::Ne,
            "<" => Op::Lt,
            "<=" => Op::Lte,
            ">" => Op::Gt,
            ">=" => Op::Gte,
            "LIKE" => Op::Like,
            "NOT LIKE" => Op::NotLike,
            "ILIKE" => Op::ILike,
            "NOT ILIKE" => Op::NotILike,
            _ => {
                return Err(QbError::invalid_argument(format!(
                    "Unsupported comparison operator {s:?}"
                )));
            }
        };
        Ok(op)
    }
}

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = QbError;

    fn from_str(s: &str) -> QbResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            _ => Err(QbError::invalid_argument(format!(
                "Sort direction must be \"asc\" or \"desc\", got {s:?}"
            ))),
        }
    }
}

/// Calendar component compared by the date-part filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Date,
    Month,
    Day,
    Year,
}

impl DatePart {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            DatePart::Date => "date",
            DatePart::Month => "month",
            DatePart::Day => "day",
            DatePart::Year => "year",
        }
    }
}

/// One filter fragment of a WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `column op value`, AND-joined with the other primary comparisons.
    Compare { column: Ident, op: Op, value: Value },
    /// `column op value`, OR-joined against the primary group.
    OrCompare { column: Ident, op: Op, value: Value },
    /// `column [NOT] BETWEEN low AND high` with bound bounds.
    Between {
        column: Ident,
        low: Value,
        high: Value,
        negated: bool,
    },
    /// `column [NOT] BETWEEN low_column AND high_column`.
    BetweenColumns {
        column: Ident,
        low: Ident,
        high: Ident,
        negated: bool,
    },
    /// `column [NOT] IN (...)`, one placeholder per element.
    In {
        column: Ident,
        values: Vec<Value>,
        negated: bool,
    },
    /// `column IS [NOT] NULL`.
    Null { column: Ident, negated: bool },
    DatePart {
        column: Ident,
        part: DatePart,
        value: Value,
    },
    /// `CAST(column AS TIME) op value`.
    TimePart { column: Ident, op: Op, value: Value },
    /// `left op right`, both columns.
    ColumnCompare { left: Ident, op: Op, right: Ident },
}

/// Render group of a filter clause; groups render in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Category {
    Primary,
    Disjunctive,
    Between,
    BetweenColumns,
    In,
    Null,
    DatePart,
    ColumnCompare,
}

impl Clause {
    pub(crate) fn category(&self) -> Category {
        match self {
            Clause::Compare { .. } => Category::Primary,
            Clause::OrCompare { .. } => Category::Disjunctive,
            Clause::Between { .. } => Category::Between,
            Clause::BetweenColumns { .. } => Category::BetweenColumns,
            Clause::In { .. } => Category::In,
            Clause::Null { .. } => Category::Null,
            Clause::DatePart { .. } | Clause::TimePart { .. } => Category::DatePart,
            Clause::ColumnCompare { .. } => Category::ColumnCompare,
        }
    }
}

/// One ORDER BY entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    pub column: Ident,
    pub direction: Direction,
}

/// One HAVING predicate: `column op value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Having {
    pub column: Ident,
    pub op: Op,
    pub value: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_parsing_is_case_and_space_insensitive() {
        assert_eq!("not   like".parse::<Op>().unwrap(), Op::NotLike);
        assert_eq!("ilike".parse::<Op>().unwrap(), Op::ILike);
        assert_eq!("!=".parse::<Op>().unwrap(), Op::Ne);
        assert_eq!(" >= ".parse::<Op>().unwrap(), Op::Gte);
    }

    #[test]
    fn op_rejects_anything_outside_the_list() {
        for bad in ["= 1 OR 1", "==", "", "; DROP", "IS"] {
            assert!(bad.parse::<Op>().unwrap_err().is_invalid_argument(), "{bad}");
        }
    }

    #[test]
    fn direction_parsing() {
        assert_eq!("DESC".parse::<Direction>().unwrap(), Direction::Desc);
        assert_eq!("asc".parse::<Direction>().unwrap(), Direction::Asc);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn time_part_shares_the_date_part_group() {
        let column = Ident::parse("created_at").unwrap();
        let time = Clause::TimePart {
            column: column.clone(),
            op: Op::Gt,
            value: Value::from("12:00"),
        };
        let date = Clause::DatePart {
            column,
            part: DatePart::Year,
            value: Value::from(2024),
        };
        assert_eq!(time.category(), date.category());
        assert!(Category::In < Category::DatePart);
    }
}
