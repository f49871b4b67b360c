//! Parameter binding with one placeholder counter per statement.

use crate::value::{ParamKind, Value};

/// A value bound to a statement placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    /// Positional placeholder as it appears in the SQL (`$1`, `$2`, ...).
    pub placeholder: String,
    /// Human-readable origin of the value (`age`, `age_start`, `set_name`, ...).
    pub label: String,
    pub value: Value,
}

impl BoundParam {
    pub fn kind(&self) -> ParamKind {
        self.value.kind()
    }
}

/// Allocates placeholders for one statement.
///
/// Every call to [`Binder::bind`] returns a fresh `$n`, so two bindings can never share a
/// placeholder even when they come from the same column.
#[derive(Debug, Default)]
pub struct Binder {
    params: Vec<BoundParam>,
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value and return its placeholder.
    pub fn bind(&mut self, label: impl Into<String>, value: Value) -> String {
        let placeholder = format!("${}", self.params.len() + 1);
        self.params.push(BoundParam {
            placeholder: placeholder.clone(),
            label: label.into(),
            value,
        });
        placeholder
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn into_params(self) -> Vec<BoundParam> {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_sequential_and_unique() {
        let mut binder = Binder::new();
        assert_eq!(binder.bind("age", Value::Int(1)), "$1");
        assert_eq!(binder.bind("age", Value::Int(2)), "$2");
        assert_eq!(binder.bind("age_end", Value::Int(3)), "$3");

        let params = binder.into_params();
        assert_eq!(params.len(), 3);
        assert_eq!(params[1].label, "age");
        assert_eq!(params[1].value, Value::Int(2));
        assert_eq!(params[2].kind(), ParamKind::Int);
    }
}
