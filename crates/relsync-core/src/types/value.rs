use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

///
/// Value
///
/// Scalar property value carried by object records.
/// Ordering is total so sort expressions can be applied to loaded rows;
/// `Null` sorts first.
///

#[derive(
    Clone, Debug, Default, Deserialize, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum Value {
    #[default]
    #[display("null")]
    #[from(ignore)]
    Null,

    Bool(bool),
    Int(i64),

    #[display("{_0:?}")]
    Text(String),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sorts_before_everything() {
        let mut values = vec![Value::Int(3), Value::Null, Value::from("a"), Value::from(false)];
        values.sort();

        assert_eq!(values[0], Value::Null);
        assert!(Value::Null.is_null());
    }

    #[test]
    fn display_quotes_text() {
        assert_eq!(Value::from("x").to_string(), "\"x\"");
        assert_eq!(Value::Int(4).to_string(), "4");
        assert_eq!(Value::Null.to_string(), "null");
    }
}
