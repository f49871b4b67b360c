//! The per-table query session.
//!
//! A [`Table`] accumulates clauses through `&mut self` builder calls and runs them with a
//! terminal operation. Two kinds of state live on the session:
//!
//! - **Filters** (`where_*`, `or_where*`) are consumed by every terminal call that reads,
//!   updates or deletes, whether or not it succeeds.
//! - **Shape** (`select`, ordering, `limit`/`offset`, `group_by`, `having`) persists across
//!   terminal calls until [`Table::reset`]. Single-row helpers (`first`, `value`, `find`) and
//!   aggregates (`count`, `max`, `avg`) override it for that call only.
//!
//! Invalid identifiers, operators or directions do not panic and do not break the chain:
//! the first such error is kept and returned by the next terminal operation before any SQL
//! is sent.
//!
//! ```ignore
//! let mut users = pgtable::table(&client, "users")?;
//! let adults = users
//!     .where_op("age", ">=", 18)
//!     .where_not_null("email")
//!     .order_by_desc("created_at")
//!     .take(20)
//!     .get()
//!     .await?;
//! ```

use crate::client::Executor;
use crate::error::{QbError, QbResult};
use crate::ident::{self, Ident};
use crate::logging;
use crate::operation::Operation;
use crate::qb::compile::{self, Projection, SelectShape};
use crate::qb::{Clause, DatePart, Direction, Having, Op, Ordering, Statement};
use crate::row::{IntoRows, Record};
use crate::value::Value;

/// Start a session on table `name` using `client`.
///
/// `client` may be owned or a reference; `&E` is an executor whenever `E` is.
pub fn table<C: Executor>(client: C, name: &str) -> QbResult<Table<C>> {
    Table::new(client, name)
}

/// A query session bound to one table.
#[derive(Debug)]
pub struct Table<C> {
    client: C,
    name: Ident,
    filters: Vec<Clause>,
    shape: SelectShape,
    build_error: Option<String>,
}

impl<C> Table<C> {
    /// Create a session; fails if `name` is not a valid identifier.
    pub fn new(client: C, name: &str) -> QbResult<Self> {
        Ok(Self {
            client,
            name: Ident::parse(name)?,
            filters: Vec::new(),
            shape: SelectShape::default(),
            build_error: None,
        })
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    /// Number of filter clauses waiting for the next terminal operation.
    pub fn pending_filters(&self) -> usize {
        self.filters.len()
    }

    fn record_error(&mut self, err: QbError) {
        if self.build_error.is_none() {
            let message = match err {
                QbError::InvalidArgument(message) => message,
                other => other.to_string(),
            };
            self.build_error = Some(message);
        }
    }

    fn ident(&mut self, name: &str) -> Option<Ident> {
        match Ident::parse(name) {
            Ok(ident) => Some(ident),
            Err(err) => {
                self.record_error(err);
                None
            }
        }
    }

    fn idents<S: AsRef<str>>(&mut self, names: &[S]) -> Option<Vec<Ident>> {
        match ident::parse_all(names) {
            Ok(idents) => Some(idents),
            Err(err) => {
                self.record_error(err);
                None
            }
        }
    }

    fn op(&mut self, op: &str) -> Option<Op> {
        match op.parse() {
            Ok(op) => Some(op),
            Err(err) => {
                self.record_error(err);
                None
            }
        }
    }

    fn push_filter(&mut self, clause: Option<Clause>) -> &mut Self {
        if let Some(clause) = clause {
            self.filters.push(clause);
        }
        self
    }

    fn compare(&mut self, column: &str, op: Option<Op>, value: Value, disjunctive: bool) -> &mut Self {
        let clause = match (self.ident(column), op) {
            (Some(column), Some(op)) if disjunctive => Some(Clause::OrCompare { column, op, value }),
            (Some(column), Some(op)) => Some(Clause::Compare { column, op, value }),
            _ => None,
        };
        self.push_filter(clause)
    }

    // ==================== WHERE ====================

    /// Add `column = value`.
    pub fn where_(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.compare(column, Some(Op::Eq), value.into(), false)
    }

    /// Add `column op value`; `op` must be one of `=`, `!=`, `<>`, `<`, `<=`, `>`, `>=`,
    /// `LIKE`, `NOT LIKE`, `ILIKE`, `NOT ILIKE`.
    pub fn where_op(&mut self, column: &str, op: &str, value: impl Into<Value>) -> &mut Self {
        let op = self.op(op);
        self.compare(column, op, value.into(), false)
    }

    /// Add `OR column = value` against the plain `where` group.
    pub fn or_where(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.compare(column, Some(Op::Eq), value.into(), true)
    }

    pub fn or_where_op(&mut self, column: &str, op: &str, value: impl Into<Value>) -> &mut Self {
        let op = self.op(op);
        self.compare(column, op, value.into(), true)
    }

    fn between(&mut self, column: &str, [low, high]: [Value; 2], negated: bool) -> &mut Self {
        let clause = self.ident(column).map(|column| Clause::Between {
            column,
            low,
            high,
            negated,
        });
        self.push_filter(clause)
    }

    /// Add `column BETWEEN low AND high`.
    pub fn where_between<V: Into<Value>>(&mut self, column: &str, [low, high]: [V; 2]) -> &mut Self {
        self.between(column, [low.into(), high.into()], false)
    }

    pub fn where_not_between<V: Into<Value>>(
        &mut self,
        column: &str,
        [low, high]: [V; 2],
    ) -> &mut Self {
        self.between(column, [low.into(), high.into()], true)
    }

    fn between_columns(&mut self, column: &str, bounds: [&str; 2], negated: bool) -> &mut Self {
        let [low, high] = bounds;
        let clause = match (self.ident(column), self.ident(low), self.ident(high)) {
            (Some(column), Some(low), Some(high)) => Some(Clause::BetweenColumns {
                column,
                low,
                high,
                negated,
            }),
            _ => None,
        };
        self.push_filter(clause)
    }

    /// Add `column BETWEEN low_column AND high_column`.
    pub fn where_between_columns(&mut self, column: &str, bounds: [&str; 2]) -> &mut Self {
        self.between_columns(column, bounds, false)
    }

    pub fn where_not_between_columns(&mut self, column: &str, bounds: [&str; 2]) -> &mut Self {
        self.between_columns(column, bounds, true)
    }

    fn in_list<V: Into<Value>>(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
        negated: bool,
    ) -> &mut Self {
        let clause = self.ident(column).map(|column| Clause::In {
            column,
            values: values.into_iter().map(Into::into).collect(),
            negated,
        });
        self.push_filter(clause)
    }

    /// Add `column IN (...)`. An empty list matches nothing.
    pub fn where_in<V: Into<Value>>(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.in_list(column, values, false)
    }

    /// Add `column NOT IN (...)`. An empty list matches everything.
    pub fn where_not_in<V: Into<Value>>(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.in_list(column, values, true)
    }

    pub fn where_null(&mut self, column: &str) -> &mut Self {
        let clause = self.ident(column).map(|column| Clause::Null {
            column,
            negated: false,
        });
        self.push_filter(clause)
    }

    pub fn where_not_null(&mut self, column: &str) -> &mut Self {
        let clause = self.ident(column).map(|column| Clause::Null {
            column,
            negated: true,
        });
        self.push_filter(clause)
    }

    fn date_part(&mut self, column: &str, part: DatePart, value: Value) -> &mut Self {
        let clause = self
            .ident(column)
            .map(|column| Clause::DatePart { column, part, value });
        self.push_filter(clause)
    }

    /// Match the calendar date of a date or timestamp column, e.g. `"2024-01-15"`.
    pub fn where_date(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.date_part(column, DatePart::Date, value.into())
    }

    /// Match the month number (1-12).
    pub fn where_month(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.date_part(column, DatePart::Month, value.into())
    }

    /// Match the day of the month.
    pub fn where_day(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.date_part(column, DatePart::Day, value.into())
    }

    pub fn where_year(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.date_part(column, DatePart::Year, value.into())
    }

    /// Compare the time-of-day part, e.g. `where_time("created_at", ">=", "09:00")`.
    pub fn where_time(&mut self, column: &str, op: &str, value: impl Into<Value>) -> &mut Self {
        let clause = match (self.ident(column), self.op(op)) {
            (Some(column), Some(op)) => Some(Clause::TimePart {
                column,
                op,
                value: value.into(),
            }),
            _ => None,
        };
        self.push_filter(clause)
    }

    /// Add `left = right` between two columns.
    pub fn where_column(&mut self, left: &str, right: &str) -> &mut Self {
        self.where_column_op(left, "=", right)
    }

    pub fn where_column_op(&mut self, left: &str, op: &str, right: &str) -> &mut Self {
        let clause = match (self.ident(left), self.op(op), self.ident(right)) {
            (Some(left), Some(op), Some(right)) => Some(Clause::ColumnCompare { left, op, right }),
            _ => None,
        };
        self.push_filter(clause)
    }

    // ==================== Shape ====================

    /// Replace the selected columns. An empty list selects `*`.
    pub fn select<S: AsRef<str>>(&mut self, columns: &[S]) -> &mut Self {
        if let Some(columns) = self.idents(columns) {
            self.shape.columns = columns;
        }
        self
    }

    fn push_order(&mut self, column: &str, direction: Direction) -> &mut Self {
        if let Some(column) = self.ident(column) {
            self.shape.orders.push(Ordering { column, direction });
        }
        self
    }

    /// Order ascending by `column`. Orderings accumulate in call order.
    pub fn order_by(&mut self, column: &str) -> &mut Self {
        self.push_order(column, Direction::Asc)
    }

    pub fn order_by_desc(&mut self, column: &str) -> &mut Self {
        self.push_order(column, Direction::Desc)
    }

    /// Order by `column` in `direction` (`"asc"` or `"desc"`, any case).
    pub fn order_by_dir(&mut self, column: &str, direction: &str) -> &mut Self {
        match direction.parse::<Direction>() {
            Ok(direction) => self.push_order(column, direction),
            Err(err) => {
                self.record_error(err);
                self
            }
        }
    }

    /// Newest first by `created_at`.
    pub fn latest(&mut self) -> &mut Self {
        self.latest_by("created_at")
    }

    pub fn latest_by(&mut self, column: &str) -> &mut Self {
        self.push_order(column, Direction::Desc)
    }

    /// Order by `RANDOM()`; takes precedence over any `order_by`.
    pub fn in_random_order(&mut self) -> &mut Self {
        self.shape.random_order = true;
        self
    }

    pub fn limit(&mut self, n: u64) -> &mut Self {
        self.shape.limit = Some(n);
        self
    }

    /// Alias for [`Table::limit`].
    pub fn take(&mut self, n: u64) -> &mut Self {
        self.limit(n)
    }

    pub fn offset(&mut self, n: u64) -> &mut Self {
        self.shape.offset = Some(n);
        self
    }

    /// Alias for [`Table::offset`].
    pub fn skip(&mut self, n: u64) -> &mut Self {
        self.offset(n)
    }

    /// Append GROUP BY columns.
    pub fn group_by<S: AsRef<str>>(&mut self, columns: &[S]) -> &mut Self {
        if let Some(columns) = self.idents(columns) {
            self.shape.groups.extend(columns);
        }
        self
    }

    /// Add `HAVING column = value`.
    pub fn having(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.having_op(column, "=", value)
    }

    pub fn having_op(&mut self, column: &str, op: &str, value: impl Into<Value>) -> &mut Self {
        if let (Some(column), Some(op)) = (self.ident(column), self.op(op)) {
            self.shape.having.push(Having {
                column,
                op,
                value: value.into(),
            });
        }
        self
    }

    /// Drop all pending filters, the select shape and any recorded argument error.
    pub fn reset(&mut self) -> &mut Self {
        self.filters.clear();
        self.shape = SelectShape::default();
        self.build_error = None;
        self
    }

    /// Compile what [`Table::get`] would run, without running it or consuming anything.
    pub fn to_statement(&self) -> QbResult<Statement> {
        if let Some(message) = &self.build_error {
            return Err(QbError::InvalidArgument(message.clone()));
        }
        Ok(compile::select(
            &self.name,
            &self.filters,
            &self.shape,
            &Projection::Rows,
        ))
    }

    // ==================== Terminal bookkeeping ====================

    fn take_build_error(&mut self) -> QbResult<()> {
        match self.build_error.take() {
            Some(message) => Err(QbError::InvalidArgument(message)),
            None => Ok(()),
        }
    }

    /// Consume pending filters and surface any recorded argument error.
    fn take_filters(&mut self) -> QbResult<Vec<Clause>> {
        let filters = std::mem::take(&mut self.filters);
        self.take_build_error()?;
        Ok(filters)
    }
}

/// First row's `column`, with NULL as `None`.
fn scalar(rows: Vec<Record>, column: &str) -> Option<Value> {
    rows.into_iter()
        .next()
        .and_then(|row| row.get(column).cloned())
        .filter(|v| !v.is_null())
}

impl<C: Executor> Table<C> {
    async fn fetch(&self, operation: Operation, stmt: Statement) -> QbResult<Vec<Record>> {
        logging::statement(self.name.as_str(), operation, &stmt);
        match self.client.fetch_all(&stmt).await {
            Ok(rows) => Ok(rows),
            Err(err) => {
                logging::failure(self.name.as_str(), operation, &stmt, &err);
                Err(QbError::execution(self.name.as_str(), operation, err))
            }
        }
    }

    async fn execute(&self, operation: Operation, stmt: Statement) -> QbResult<u64> {
        logging::statement(self.name.as_str(), operation, &stmt);
        match self.client.execute(&stmt).await {
            Ok(n) => Ok(n),
            Err(err) => {
                logging::failure(self.name.as_str(), operation, &stmt, &err);
                Err(QbError::execution(self.name.as_str(), operation, err))
            }
        }
    }

    async fn select_with(
        &mut self,
        operation: Operation,
        projection: Projection,
    ) -> QbResult<Vec<Record>> {
        let filters = self.take_filters()?;
        let stmt = compile::select(&self.name, &filters, &self.shape, &projection);
        self.fetch(operation, stmt).await
    }

    // ==================== Reads ====================

    /// Run the query and return every matching row.
    pub async fn get(&mut self) -> QbResult<Vec<Record>> {
        self.select_with(Operation::Get, Projection::Rows).await
    }

    /// Every row of the table: pending filters are discarded, select shaping still applies.
    pub async fn all(&mut self) -> QbResult<Vec<Record>> {
        self.filters.clear();
        self.get().await
    }

    /// Run the query limited to one row.
    pub async fn first(&mut self) -> QbResult<Option<Record>> {
        let rows = self.select_with(Operation::First, Projection::First).await?;
        Ok(rows.into_iter().next())
    }

    /// Shorthand for `where_("id", id).first()`.
    pub async fn find(&mut self, id: impl Into<Value>) -> QbResult<Option<Record>> {
        self.where_("id", id);
        let rows = self.select_with(Operation::Find, Projection::First).await?;
        Ok(rows.into_iter().next())
    }

    /// Select only `column` from the first matching row.
    pub async fn value(&mut self, column: &str) -> QbResult<Option<Value>> {
        let Some(ident) = self.ident(column) else {
            self.take_filters()?;
            return Ok(None);
        };
        let rows = self
            .select_with(Operation::Value, Projection::Value(ident))
            .await?;
        Ok(scalar(rows, column))
    }

    /// Number of matching rows; grouped queries count groups.
    pub async fn count(&mut self) -> QbResult<i64> {
        let filters = self.take_filters()?;
        let stmt = compile::count(&self.name, &filters, &self.shape);
        let rows = self.fetch(Operation::Count, stmt).await?;
        match scalar(rows, "count") {
            None => Ok(0),
            Some(Value::Int(n)) => Ok(n),
            Some(other) => Err(QbError::decode(
                "count",
                format!("expected an integer, got {other:?}"),
            )),
        }
    }

    /// `MAX(column)` over matching rows; `None` when there are none.
    pub async fn max(&mut self, column: &str) -> QbResult<Option<Value>> {
        let Some(ident) = self.ident(column) else {
            self.take_filters()?;
            return Ok(None);
        };
        let rows = self.select_with(Operation::Max, Projection::Max(ident)).await?;
        Ok(scalar(rows, "max"))
    }

    /// `AVG(column)` as a float; `None` when there are no matching rows.
    pub async fn avg(&mut self, column: &str) -> QbResult<Option<Value>> {
        let Some(ident) = self.ident(column) else {
            self.take_filters()?;
            return Ok(None);
        };
        let rows = self.select_with(Operation::Avg, Projection::Avg(ident)).await?;
        Ok(scalar(rows, "avg"))
    }

    // ==================== Writes ====================

    /// Insert one row or several with the same columns; returns the affected row count.
    pub async fn insert(&mut self, rows: impl IntoRows) -> QbResult<u64> {
        self.take_build_error()?;
        let stmt = compile::insert(&self.name, &rows.into_rows(), None)?;
        self.execute(Operation::Insert, stmt).await
    }

    /// Insert and return the `id` generated for the last row the server reports.
    pub async fn insert_get_id(&mut self, rows: impl IntoRows) -> QbResult<Value> {
        self.take_build_error()?;
        let id = Ident::parse("id")?;
        let stmt = compile::insert(&self.name, &rows.into_rows(), Some(&id))?;
        let rows = self.fetch(Operation::InsertGetId, stmt).await?;
        rows.into_iter()
            .last()
            .and_then(|row| row.get("id").cloned())
            .ok_or_else(|| QbError::decode("id", "INSERT ... RETURNING id returned no rows"))
    }

    /// Insert, updating `update_columns` from the proposed row when a row with the same
    /// `unique_keys` already exists. With no update columns, conflicting rows are skipped.
    pub async fn upsert<S: AsRef<str>>(
        &mut self,
        rows: impl IntoRows,
        unique_keys: &[S],
        update_columns: &[S],
    ) -> QbResult<u64> {
        self.take_build_error()?;
        let unique_keys = ident::parse_all(unique_keys)?;
        let update_columns = ident::parse_all(update_columns)?;
        let stmt = compile::upsert(&self.name, &rows.into_rows(), &unique_keys, &update_columns)?;
        self.execute(Operation::Upsert, stmt).await
    }

    /// Update matching rows; requires at least one pending filter.
    pub async fn update(&mut self, data: Record) -> QbResult<u64> {
        let filters = self.take_filters()?;
        if filters.is_empty() {
            return Err(QbError::precondition(format!(
                "update on '{}' requires a where clause",
                self.name
            )));
        }
        let stmt = compile::update(&self.name, &data, &filters)?;
        self.execute(Operation::Update, stmt).await
    }

    /// Delete matching rows.
    ///
    /// With no pending filter this deletes **every row in the table**.
    pub async fn delete(&mut self) -> QbResult<u64> {
        let filters = self.take_filters()?;
        let stmt = compile::delete(&self.name, &filters);
        self.execute(Operation::Delete, stmt).await
    }
}
