//! Boolean filter tree for the WHERE clause.
//!
//! All pending filter clauses become one tree: the primary comparisons form an AND group,
//! disjunctive comparisons are OR-ed against that group, and every other category is AND-ed
//! onto the result in a fixed order. Placeholders are allocated while rendering, so their
//! numbering always follows their position in the SQL text.

use crate::qb::clause::{Category, Clause, DatePart};
use crate::qb::param::Binder;

/// Expression node borrowing the clauses it renders.
#[derive(Debug, Clone)]
pub(crate) enum Expr<'a> {
    And(Vec<Expr<'a>>),
    Or(Vec<Expr<'a>>),
    Pred(&'a Clause),
}

impl<'a> Expr<'a> {
    /// Build the filter tree for `filters`, or `None` when there is nothing to filter on.
    pub(crate) fn filter(filters: &'a [Clause]) -> Option<Self> {
        let mut sorted: Vec<&Clause> = filters.iter().collect();
        // Stable: call order is kept within a category.
        sorted.sort_by_key(|c| c.category());

        let (head, rest): (Vec<&Clause>, Vec<&Clause>) = sorted
            .into_iter()
            .partition(|c| matches!(c.category(), Category::Primary | Category::Disjunctive));
        let (primary, disjunctive): (Vec<&Clause>, Vec<&Clause>) = head
            .into_iter()
            .partition(|c| c.category() == Category::Primary);

        let mut root = Vec::new();
        match (primary.is_empty(), disjunctive.is_empty()) {
            (true, true) => {}
            (false, true) => root.extend(primary.into_iter().map(Expr::Pred)),
            (true, false) => root.push(Expr::Or(disjunctive.into_iter().map(Expr::Pred).collect())),
            (false, false) => {
                let mut alternatives = vec![Expr::And(primary.into_iter().map(Expr::Pred).collect())];
                alternatives.extend(disjunctive.into_iter().map(Expr::Pred));
                root.push(Expr::Or(alternatives));
            }
        }
        root.extend(rest.into_iter().map(Expr::Pred));

        match root.len() {
            0 => None,
            1 => root.pop(),
            _ => Some(Expr::And(root)),
        }
    }

    /// Render the expression, binding values as they are reached.
    pub(crate) fn build(&self, binder: &mut Binder) -> String {
        match self {
            Expr::And(items) => join(items, " AND ", binder, |e| {
                matches!(e, Expr::Or(v) if v.len() > 1)
            }),
            Expr::Or(items) => join(items, " OR ", binder, |e| {
                matches!(e, Expr::And(v) if v.len() > 1)
            }),
            Expr::Pred(clause) => render_clause(clause, binder),
        }
    }
}

fn join(
    items: &[Expr<'_>],
    sep: &str,
    binder: &mut Binder,
    needs_parens: impl Fn(&Expr<'_>) -> bool,
) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        let sql = item.build(binder);
        if needs_parens(item) {
            out.push('(');
            out.push_str(&sql);
            out.push(')');
        } else {
            out.push_str(&sql);
        }
    }
    out
}

fn render_clause(clause: &Clause, binder: &mut Binder) -> String {
    match clause {
        Clause::Compare { column, op, value } => {
            let p = binder.bind(column.as_str(), value.clone());
            format!("{column} {op} {p}")
        }
        Clause::OrCompare { column, op, value } => {
            let p = binder.bind(format!("or_{column}"), value.clone());
            format!("{column} {op} {p}")
        }
        Clause::Between {
            column,
            low,
            high,
            negated,
        } => {
            let lo = binder.bind(format!("{column}_start"), low.clone());
            let hi = binder.bind(format!("{column}_end"), high.clone());
            let not = if *negated { "NOT " } else { "" };
            format!("{column} {not}BETWEEN {lo} AND {hi}")
        }
        Clause::BetweenColumns {
            column,
            low,
            high,
            negated,
        } => {
            let not = if *negated { "NOT " } else { "" };
            format!("{column} {not}BETWEEN {low} AND {high}")
        }
        Clause::In {
            column,
            values,
            negated,
        } => {
            if values.is_empty() {
                return if *negated { "1=1" } else { "1=0" }.to_string();
            }
            let placeholders: Vec<String> = values
                .iter()
                .enumerate()
                .map(|(i, v)| binder.bind(format!("{column}_in_{}", i + 1), v.clone()))
                .collect();
            let op = if *negated { "NOT IN" } else { "IN" };
            format!("{column} {op} ({})", placeholders.join(", "))
        }
        Clause::Null { column, negated } => {
            if *negated {
                format!("{column} IS NOT NULL")
            } else {
                format!("{column} IS NULL")
            }
        }
        Clause::DatePart {
            column,
            part,
            value,
        } => {
            let p = binder.bind(format!("{column}_{}", part.label()), value.clone());
            match part {
                DatePart::Date => format!("CAST({column} AS DATE) = {p}"),
                DatePart::Month => format!("EXTRACT(MONTH FROM {column})::int = {p}"),
                DatePart::Day => format!("EXTRACT(DAY FROM {column})::int = {p}"),
                DatePart::Year => format!("EXTRACT(YEAR FROM {column})::int = {p}"),
            }
        }
        Clause::TimePart { column, op, value } => {
            let p = binder.bind(format!("{column}_time"), value.clone());
            format!("CAST({column} AS TIME) {op} {p}")
        }
        Clause::ColumnCompare { left, op, right } => format!("{left} {op} {right}"),
    }
}
