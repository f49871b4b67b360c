//! Clause model, parameter binding and SQL compilation.
//!
//! Everything in this module is synchronous and side-effect free. A [`Table`](crate::Table)
//! session owns the clause state and calls into the compiler once per terminal operation;
//! the resulting [`Statement`] is handed to an [`Executor`](crate::Executor).
//!
//! # Rendering
//!
//! - One WHERE clause. Plain comparisons are AND-ed; `or_where` comparisons are OR-ed
//!   against that group; ranges, IN lists, null checks, date parts and column comparisons
//!   are AND-ed on in that order, with parentheses wherever AND and OR meet.
//! - Every value becomes a `$n` placeholder, allocated left to right.
//! - Identifiers are validated before they reach this module.

pub(crate) mod clause;
pub(crate) mod compile;
pub(crate) mod expr;
mod param;
mod statement;

pub use clause::{Clause, DatePart, Direction, Having, Op, Ordering};
pub use param::{Binder, BoundParam};
pub use statement::Statement;
