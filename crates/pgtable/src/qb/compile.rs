//! Statement compiler.
//!
//! Pure functions from a table name, the pending filters and the persistent select shape
//! to a [`Statement`]. Nothing here touches a connection.

use crate::error::{QbError, QbResult};
use crate::ident::Ident;
use crate::qb::clause::{Clause, Having, Ordering};
use crate::qb::expr::Expr;
use crate::qb::param::Binder;
use crate::qb::statement::Statement;
use crate::row::Record;

/// Select-shaping state that survives terminal calls until the session is reset.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SelectShape {
    /// Empty means `*`.
    pub columns: Vec<Ident>,
    pub orders: Vec<Ordering>,
    pub random_order: bool,
    pub groups: Vec<Ident>,
    pub having: Vec<Having>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// What a SELECT returns, overriding the shape for a single call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Projection {
    /// The shape as configured.
    Rows,
    /// The configured columns, one row.
    First,
    /// One column, one row.
    Value(Ident),
    Max(Ident),
    Avg(Ident),
}

impl Projection {
    fn is_aggregate(&self) -> bool {
        matches!(self, Projection::Max(_) | Projection::Avg(_))
    }
}

fn push_where(sql: &mut String, binder: &mut Binder, filters: &[Clause]) {
    if let Some(expr) = Expr::filter(filters) {
        sql.push_str(" WHERE ");
        sql.push_str(&expr.build(binder));
    }
}

fn push_grouping(sql: &mut String, binder: &mut Binder, shape: &SelectShape) {
    if !shape.groups.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&join_idents(&shape.groups));
    }
    if !shape.having.is_empty() {
        let parts: Vec<String> = shape
            .having
            .iter()
            .map(|h| {
                let p = binder.bind(format!("having_{}", h.column), h.value.clone());
                format!("{} {} {}", h.column, h.op, p)
            })
            .collect();
        sql.push_str(" HAVING ");
        sql.push_str(&parts.join(" AND "));
    }
}

fn push_order(sql: &mut String, shape: &SelectShape) {
    if shape.random_order {
        sql.push_str(" ORDER BY RANDOM()");
    } else if !shape.orders.is_empty() {
        let parts: Vec<String> = shape
            .orders
            .iter()
            .map(|o| format!("{} {}", o.column, o.direction.as_sql()))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&parts.join(", "));
    }
}

fn join_idents(idents: &[Ident]) -> String {
    idents
        .iter()
        .map(Ident::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Compile a SELECT.
///
/// Clause order: WHERE, GROUP BY, HAVING, ORDER BY, LIMIT, OFFSET. Aggregate projections
/// drop ORDER BY and OFFSET since they read a single computed row.
pub(crate) fn select(
    table: &Ident,
    filters: &[Clause],
    shape: &SelectShape,
    projection: &Projection,
) -> Statement {
    let list = match projection {
        Projection::Rows | Projection::First if shape.columns.is_empty() => "*".to_string(),
        Projection::Rows | Projection::First => join_idents(&shape.columns),
        Projection::Value(column) => column.to_string(),
        Projection::Max(column) => format!("MAX({column}) AS max"),
        Projection::Avg(column) => format!("AVG({column})::float8 AS avg"),
    };

    let mut binder = Binder::new();
    let mut sql = format!("SELECT {list} FROM {table}");
    push_where(&mut sql, &mut binder, filters);
    push_grouping(&mut sql, &mut binder, shape);

    if !projection.is_aggregate() {
        push_order(&mut sql, shape);
    }

    let limit = match projection {
        Projection::Rows => shape.limit,
        _ => Some(1),
    };
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    if !projection.is_aggregate() {
        if let Some(offset) = shape.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }

    Statement::new(sql, binder.into_params())
}

/// Compile `COUNT(*) AS count`, wrapping grouped queries in a subquery.
pub(crate) fn count(table: &Ident, filters: &[Clause], shape: &SelectShape) -> Statement {
    let mut binder = Binder::new();
    let grouped = !shape.groups.is_empty() || !shape.having.is_empty();

    let sql = if grouped {
        let mut inner = format!("SELECT 1 FROM {table}");
        push_where(&mut inner, &mut binder, filters);
        push_grouping(&mut inner, &mut binder, shape);
        format!("SELECT COUNT(*) AS count FROM ({inner}) AS t")
    } else {
        let mut sql = format!("SELECT COUNT(*) AS count FROM {table}");
        push_where(&mut sql, &mut binder, filters);
        sql
    };

    Statement::new(sql, binder.into_params())
}

/// Validate insert rows: non-empty, identifier column names, one column set for every row.
///
/// Returns the column order taken from the first row.
fn insert_columns(rows: &[Record]) -> QbResult<Vec<Ident>> {
    let first = rows
        .first()
        .ok_or_else(|| QbError::invalid_argument("insert requires at least one row"))?;
    if first.is_empty() {
        return Err(QbError::invalid_argument("insert row has no columns"));
    }
    let columns: Vec<Ident> = first.columns().map(Ident::parse).collect::<QbResult<_>>()?;

    for (i, row) in rows.iter().enumerate().skip(1) {
        let same = row.len() == columns.len() && columns.iter().all(|c| row.contains(c.as_str()));
        if !same {
            return Err(QbError::invalid_argument(format!(
                "insert row {} has columns [{}], expected [{}]",
                i + 1,
                row.columns().collect::<Vec<_>>().join(", "),
                join_idents(&columns)
            )));
        }
    }
    Ok(columns)
}

fn push_insert(
    sql: &mut String,
    binder: &mut Binder,
    table: &Ident,
    columns: &[Ident],
    rows: &[Record],
) {
    sql.push_str(&format!("INSERT INTO {table} ({}) VALUES ", join_idents(columns)));
    for (r, row) in rows.iter().enumerate() {
        if r > 0 {
            sql.push_str(", ");
        }
        let placeholders: Vec<String> = columns
            .iter()
            .map(|c| {
                let value = row.get(c.as_str()).cloned().unwrap_or_default();
                binder.bind(format!("row{}_{c}", r + 1), value)
            })
            .collect();
        sql.push('(');
        sql.push_str(&placeholders.join(", "));
        sql.push(')');
    }
}

/// Compile a multi-row INSERT, optionally with `RETURNING column`.
pub(crate) fn insert(
    table: &Ident,
    rows: &[Record],
    returning: Option<&Ident>,
) -> QbResult<Statement> {
    let columns = insert_columns(rows)?;
    let mut binder = Binder::new();
    let mut sql = String::new();
    push_insert(&mut sql, &mut binder, table, &columns, rows);
    if let Some(col) = returning {
        sql.push_str(&format!(" RETURNING {col}"));
    }
    Ok(Statement::new(sql, binder.into_params()))
}

/// Compile an INSERT with `ON CONFLICT (keys) DO UPDATE SET c = EXCLUDED.c`.
///
/// With no update columns the conflict resolves to `DO NOTHING`, and then the key list
/// may be empty too.
pub(crate) fn upsert(
    table: &Ident,
    rows: &[Record],
    unique_keys: &[Ident],
    update_columns: &[Ident],
) -> QbResult<Statement> {
    let columns = insert_columns(rows)?;
    if !update_columns.is_empty() && unique_keys.is_empty() {
        return Err(QbError::invalid_argument(
            "upsert with update columns requires at least one unique key",
        ));
    }

    let mut binder = Binder::new();
    let mut sql = String::new();
    push_insert(&mut sql, &mut binder, table, &columns, rows);

    sql.push_str(" ON CONFLICT");
    if !unique_keys.is_empty() {
        sql.push_str(&format!(" ({})", join_idents(unique_keys)));
    }
    if update_columns.is_empty() {
        sql.push_str(" DO NOTHING");
    } else {
        let sets: Vec<String> = update_columns
            .iter()
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect();
        sql.push_str(" DO UPDATE SET ");
        sql.push_str(&sets.join(", "));
    }
    Ok(Statement::new(sql, binder.into_params()))
}

/// Compile `UPDATE table SET ... WHERE ...`.
///
/// SET and WHERE values share one placeholder counter; SET labels are prefixed with `set_`.
pub(crate) fn update(table: &Ident, data: &Record, filters: &[Clause]) -> QbResult<Statement> {
    if data.is_empty() {
        return Err(QbError::invalid_argument("update requires at least one column"));
    }
    let mut binder = Binder::new();
    let mut sets = Vec::with_capacity(data.len());
    for (column, value) in data.iter() {
        let column = Ident::parse(column)?;
        let p = binder.bind(format!("set_{column}"), value.clone());
        sets.push(format!("{column} = {p}"));
    }

    let mut sql = format!("UPDATE {table} SET {}", sets.join(", "));
    push_where(&mut sql, &mut binder, filters);
    Ok(Statement::new(sql, binder.into_params()))
}

/// Compile `DELETE FROM table [WHERE ...]`. No filters deletes every row.
pub(crate) fn delete(table: &Ident, filters: &[Clause]) -> Statement {
    let mut binder = Binder::new();
    let mut sql = format!("DELETE FROM {table}");
    push_where(&mut sql, &mut binder, filters);
    Statement::new(sql, binder.into_params())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qb::clause::{Direction, Op};
    use crate::record;
    use crate::value::Value;

    fn id(name: &str) -> Ident {
        Ident::parse(name).unwrap()
    }

    fn eq(column: &str, value: impl Into<Value>) -> Clause {
        Clause::Compare {
            column: id(column),
            op: Op::Eq,
            value: value.into(),
        }
    }

    #[test]
    fn select_star_by_default() {
        let stmt = select(&id("users"), &[], &SelectShape::default(), &Projection::Rows);
        assert_eq!(stmt.sql(), "SELECT * FROM users");
        assert!(stmt.params().is_empty());
    }

    #[test]
    fn select_full_clause_order() {
        let shape = SelectShape {
            columns: vec![id("status"), id("age")],
            orders: vec![Ordering {
                column: id("age"),
                direction: Direction::Desc,
            }],
            groups: vec![id("status"), id("age")],
            having: vec![Having {
                column: id("age"),
                op: Op::Gt,
                value: Value::from(18),
            }],
            limit: Some(10),
            offset: Some(20),
            ..Default::default()
        };
        let stmt = select(&id("users"), &[eq("status", "active")], &shape, &Projection::Rows);
        assert_eq!(
            stmt.sql(),
            "SELECT status, age FROM users WHERE status = $1 GROUP BY status, age \
             HAVING age > $2 ORDER BY age DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(stmt.params()[1].label, "having_age");
    }

    #[test]
    fn random_order_wins_over_explicit_order() {
        let shape = SelectShape {
            orders: vec![Ordering {
                column: id("name"),
                direction: Direction::Asc,
            }],
            random_order: true,
            ..Default::default()
        };
        let stmt = select(&id("users"), &[], &shape, &Projection::Rows);
        assert_eq!(stmt.sql(), "SELECT * FROM users ORDER BY RANDOM()");
    }

    #[test]
    fn first_and_value_force_one_row() {
        let shape = SelectShape {
            columns: vec![id("name")],
            limit: Some(50),
            offset: Some(5),
            ..Default::default()
        };
        let first = select(&id("users"), &[], &shape, &Projection::First);
        assert_eq!(first.sql(), "SELECT name FROM users LIMIT 1 OFFSET 5");

        let value = select(&id("users"), &[], &shape, &Projection::Value(id("email")));
        assert_eq!(value.sql(), "SELECT email FROM users LIMIT 1 OFFSET 5");
    }

    #[test]
    fn aggregates_replace_selection_and_skip_order() {
        let shape = SelectShape {
            columns: vec![id("name")],
            orders: vec![Ordering {
                column: id("name"),
                direction: Direction::Asc,
            }],
            offset: Some(3),
            ..Default::default()
        };
        let max = select(&id("users"), &[eq("active", true)], &shape, &Projection::Max(id("age")));
        assert_eq!(max.sql(), "SELECT MAX(age) AS max FROM users WHERE active = $1 LIMIT 1");

        let avg = select(&id("users"), &[], &shape, &Projection::Avg(id("age")));
        assert_eq!(avg.sql(), "SELECT AVG(age)::float8 AS avg FROM users LIMIT 1");
    }

    #[test]
    fn count_plain_and_grouped() {
        let plain = count(&id("users"), &[eq("status", "active")], &SelectShape::default());
        assert_eq!(plain.sql(), "SELECT COUNT(*) AS count FROM users WHERE status = $1");

        let shape = SelectShape {
            groups: vec![id("status")],
            limit: Some(5),
            ..Default::default()
        };
        let grouped = count(&id("users"), &[eq("age", 30)], &shape);
        assert_eq!(
            grouped.sql(),
            "SELECT COUNT(*) AS count FROM (SELECT 1 FROM users WHERE age = $1 GROUP BY status) AS t"
        );
    }

    #[test]
    fn insert_multiple_rows() {
        let rows = vec![
            record! { "name" => "A", "age" => 1 },
            record! { "age" => 2, "name" => "B" },
        ];
        let stmt = insert(&id("users"), &rows, None).unwrap();
        assert_eq!(
            stmt.sql(),
            "INSERT INTO users (name, age) VALUES ($1, $2), ($3, $4)"
        );
        let values: Vec<&Value> = stmt.values().collect();
        assert_eq!(values[2], &Value::from("B"));
        assert_eq!(values[3], &Value::from(2));
        assert_eq!(stmt.params()[3].label, "row2_age");
    }

    #[test]
    fn insert_returning() {
        let stmt = insert(&id("users"), &[record! { "name" => "A" }], Some(&id("id"))).unwrap();
        assert_eq!(stmt.sql(), "INSERT INTO users (name) VALUES ($1) RETURNING id");
    }

    #[test]
    fn insert_rejects_bad_shapes() {
        assert!(insert(&id("users"), &[], None).unwrap_err().is_invalid_argument());
        assert!(insert(&id("users"), &[Record::new()], None).is_err());

        let mismatched = [record! { "name" => "A" }, record! { "email" => "b@x" }];
        let err = insert(&id("users"), &mismatched, None).unwrap_err();
        assert!(err.to_string().contains("insert row 2"));

        let extra = [record! { "name" => "A" }, record! { "name" => "B", "age" => 3 }];
        assert!(insert(&id("users"), &extra, None).is_err());

        let bad_column = [record! { "name; --" => "A" }];
        assert!(insert(&id("users"), &bad_column, None).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn upsert_copies_excluded_values() {
        let rows = [record! { "email" => "a@x", "name" => "A" }];
        let stmt = upsert(&id("users"), &rows, &[id("email")], &[id("name")]).unwrap();
        assert_eq!(
            stmt.sql(),
            "INSERT INTO users (email, name) VALUES ($1, $2) ON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name"
        );
    }

    #[test]
    fn upsert_without_update_columns_does_nothing() {
        let rows = [record! { "email" => "a@x" }];
        let stmt = upsert(&id("users"), &rows, &[], &[]).unwrap();
        assert_eq!(stmt.sql(), "INSERT INTO users (email) VALUES ($1) ON CONFLICT DO NOTHING");
        assert!(upsert(&id("users"), &rows, &[], &[id("email")]).is_err());
    }

    #[test]
    fn update_set_then_where() {
        let data = record! { "name" => "B", "age" => 2 };
        let stmt = update(&id("users"), &data, &[eq("name", "A")]).unwrap();
        assert_eq!(stmt.sql(), "UPDATE users SET name = $1, age = $2 WHERE name = $3");
        let labels: Vec<&str> = stmt.params().iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["set_name", "set_age", "name"]);
    }

    #[test]
    fn update_rejects_empty_data() {
        let err = update(&id("users"), &Record::new(), &[eq("id", 1)]).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn delete_with_and_without_filters() {
        assert_eq!(delete(&id("users"), &[]).sql(), "DELETE FROM users");
        let stmt = delete(&id("users"), &[eq("status", "inactive")]);
        assert_eq!(stmt.sql(), "DELETE FROM users WHERE status = $1");
        assert_eq!(stmt.params().len(), 1);
    }
}
