//! value representation for variable override files
//!
//! Values files only carry constants, so the model covers exactly the
//! literal subset of HCL:
//! - boolean (true/false)
//! - integer (signed, currently: i64 - may change)
//! - decimal (currently: f64 - may change)
//! - string (utf-8)
//! - array ("list" of values)
//! - object (order-preserving "map"/"dictionary", where the key is of type string)
//! - null
//!
//! Anything that would need an evaluation context - variable references,
//! function calls, templates with interpolation - is rejected with
//! [ValueError::NotLiteral]. Evaluating expressions is out of scope for this
//! crate; rule evaluation downstream decides what to do with raw literals.

use crate::diagnostics::SourceRange;
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(indexmap::IndexMap<String, Value>),
}

/// A single variable assignment from a values file.
#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct InputValue {
    pub value: Value,
    pub range: SourceRange,
}

/// One values file worth of assignments, keyed by variable name.
///
/// A `Vec<InputValues>` encodes precedence: later sets override earlier ones
/// when the caller merges them. This crate never merges across sets.
pub type InputValues = indexmap::IndexMap<String, InputValue>;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValueError {
    #[error("the expression is not a constant literal")]
    NotLiteral,
    #[error("the number is out of the representable range")]
    NumberOutOfRange,
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl TryFrom<hcl::Number> for Value {
    type Error = ValueError;

    fn try_from(value: hcl::Number) -> Result<Self, Self::Error> {
        if let Some(int) = value.as_i64() {
            return Ok(Value::Integer(int));
        }

        value
            .as_f64()
            .map(Value::Decimal)
            .ok_or(ValueError::NumberOutOfRange)
    }
}

impl TryFrom<hcl::Expression> for Value {
    type Error = ValueError;

    fn try_from(value: hcl::Expression) -> Result<Self, Self::Error> {
        use hcl::Expression;

        match value {
            Expression::Null => Ok(Value::Null),
            Expression::Bool(bool) => Ok(bool.into()),
            Expression::Number(num) => num.try_into(),
            Expression::String(s) => Ok(s.into()),
            Expression::Array(array) => array
                .into_iter()
                .map(Value::try_from)
                .collect::<Result<Vec<Value>, ValueError>>()
                .map(Value::Array),
            Expression::Object(object) => object
                .into_iter()
                .map(|(key, value)| {
                    let key = match key {
                        hcl::ObjectKey::Identifier(ident) => ident.to_string(),
                        hcl::ObjectKey::Expression(Expression::String(s)) => s,
                        _ => return Err(ValueError::NotLiteral),
                    };
                    Ok((key, Value::try_from(value)?))
                })
                .collect::<Result<indexmap::IndexMap<String, Value>, ValueError>>()
                .map(Value::Object),
            Expression::Parenthesis(inner) => Value::try_from(*inner),
            _ => Err(ValueError::NotLiteral),
        }
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn expr(src: &str) -> hcl::Expression {
        let body = hcl_edit::parser::parse_body(&format!("x = {src}")).expect("body must parse");
        let attr = body.attributes().next().expect("one attribute");
        attr.value.clone().into()
    }

    #[test]
    fn converts_literal_expressions() {
        assert_eq!(Value::try_from(expr("true")), Ok(Value::Boolean(true)));
        assert_eq!(Value::try_from(expr("42")), Ok(Value::Integer(42)));
        assert_eq!(Value::try_from(expr("4.5")), Ok(Value::Decimal(4.5)));
        assert_eq!(
            Value::try_from(expr("\"ami-123\"")),
            Ok(Value::String("ami-123".to_string()))
        );
        assert_eq!(Value::try_from(expr("null")), Ok(Value::Null));
        assert_eq!(
            Value::try_from(expr("[1, 2]")),
            Ok(Value::Array(vec![Value::Integer(1), Value::Integer(2)]))
        );
    }

    #[test]
    fn converts_objects_preserving_key_order() {
        let Ok(Value::Object(object)) = Value::try_from(expr("{ b = 1, a = 2 }")) else {
            panic!("expected an object");
        };
        let keys: Vec<&String> = object.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn rejects_expressions_that_need_evaluation() {
        assert_eq!(Value::try_from(expr("var.foo")), Err(ValueError::NotLiteral));
        assert_eq!(Value::try_from(expr("max(1, 2)")), Err(ValueError::NotLiteral));
        assert_eq!(
            Value::try_from(expr("\"prefix-${var.x}\"")),
            Err(ValueError::NotLiteral)
        );
    }

    #[test]
    fn serializes_like_plain_json() {
        let value = Value::Object(indexmap::IndexMap::from([
            ("name".to_string(), Value::String("web".to_string())),
            ("count".to_string(), Value::Integer(2)),
        ]));
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"name":"web","count":2}"#
        );
    }
}
