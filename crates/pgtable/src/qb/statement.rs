//! Compiled statements.

use crate::qb::param::BoundParam;
use crate::value::Value;
use tokio_postgres::types::ToSql;

/// SQL text plus its bound parameters, produced once per terminal call.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<BoundParam>,
}

impl Statement {
    pub(crate) fn new(sql: String, params: Vec<BoundParam>) -> Self {
        Self { sql, params }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[BoundParam] {
        &self.params
    }

    /// Bound values in placeholder order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.params.iter().map(|p| &p.value)
    }

    /// Parameters as references for tokio-postgres, in placeholder order.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| &p.value as &(dyn ToSql + Sync))
            .collect()
    }
}
