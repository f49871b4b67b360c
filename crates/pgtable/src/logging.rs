//! `tracing` events for compiled statements.
//!
//! Enabled by the `tracing` feature. Statements are emitted at DEBUG on the `pgtable.sql`
//! target before they run; failures at WARN. Bound values are never logged, only their
//! labels and kinds at TRACE.

use crate::operation::Operation;
use crate::qb::Statement;

#[cfg(feature = "tracing")]
const MAX_SQL_LENGTH: usize = 200;

#[cfg(feature = "tracing")]
fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(feature = "tracing")]
fn display_sql(sql: &str) -> String {
    if sql.len() > MAX_SQL_LENGTH {
        format!("{}...", truncate_sql_bytes(sql, MAX_SQL_LENGTH))
    } else {
        sql.to_string()
    }
}

#[cfg(feature = "tracing")]
pub(crate) fn statement(table: &str, operation: Operation, stmt: &Statement) {
    tracing::debug!(
        target: "pgtable.sql",
        table,
        operation = %operation,
        param_count = stmt.params().len(),
        sql = %display_sql(stmt.sql()),
    );
    for param in stmt.params() {
        tracing::trace!(
            target: "pgtable.sql",
            placeholder = %param.placeholder,
            label = %param.label,
            kind = ?param.kind(),
        );
    }
}

#[cfg(feature = "tracing")]
pub(crate) fn failure(table: &str, operation: Operation, stmt: &Statement, error: &crate::QbError) {
    tracing::warn!(
        target: "pgtable.sql",
        table,
        operation = %operation,
        param_count = stmt.params().len(),
        sql = %display_sql(stmt.sql()),
        error = %error,
    );
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn statement(_table: &str, _operation: Operation, _stmt: &Statement) {}

#[cfg(not(feature = "tracing"))]
pub(crate) fn failure(
    _table: &str,
    _operation: Operation,
    _stmt: &Statement,
    _error: &crate::QbError,
) {
}

#[cfg(all(test, feature = "tracing"))]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundary() {
        let sql = "SELECT 'é'";
        // 'é' is two bytes starting at index 8.
        assert_eq!(truncate_sql_bytes(sql, 9), "SELECT '");
        assert_eq!(truncate_sql_bytes(sql, 100), sql);
    }

    #[test]
    fn long_sql_gets_ellipsis() {
        let sql = format!("SELECT {} FROM t", "a, ".repeat(100));
        let shown = display_sql(&sql);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.len(), MAX_SQL_LENGTH + 3);
    }
}
