//! Argument binding and validation
//!
//! Turns a raw JSON argument object into an [`ArgumentBag`] that satisfies an
//! [`OperationSpec`]: required parameters present, values correctly typed,
//! defaults applied. Keys the operation does not declare are ignored so that
//! callers built against a newer tool schema keep working. JSON `null` is
//! treated as an absent value.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::OperationError;
use crate::registry::{OperationSpec, ParameterKind, ParameterSpec};

/// A bound, type-checked argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    String(String),
    StringList(Vec<String>),
    Integer(i64),
    Boolean(bool),
}

impl ArgValue {
    pub fn kind(&self) -> ParameterKind {
        match self {
            Self::String(_) => ParameterKind::String,
            Self::StringList(_) => ParameterKind::StringList,
            Self::Integer(_) => ParameterKind::Integer,
            Self::Boolean(_) => ParameterKind::Boolean,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::from(s.as_str()),
            Self::StringList(items) => Value::from(items.clone()),
            Self::Integer(n) => Value::from(*n),
            Self::Boolean(b) => Value::from(*b),
        }
    }
}

/// Validated arguments of one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentBag {
    values: BTreeMap<&'static str, ArgValue>,
}

impl ArgumentBag {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(ArgValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn strings(&self, name: &str) -> Option<&[String]> {
        match self.get(name) {
            Some(ArgValue::StringList(items)) => Some(items),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(ArgValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(ArgValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    /// A string the operation declares as required (or defaulted).
    pub fn require_string(&self, name: &str) -> Result<&str, OperationError> {
        self.string(name)
            .ok_or_else(|| OperationError::missing_argument(name))
    }

    pub fn require_strings(&self, name: &str) -> Result<&[String], OperationError> {
        self.strings(name)
            .ok_or_else(|| OperationError::missing_argument(name))
    }

    pub fn require_integer(&self, name: &str) -> Result<i64, OperationError> {
        self.integer(name)
            .ok_or_else(|| OperationError::missing_argument(name))
    }

    pub fn require_boolean(&self, name: &str) -> Result<bool, OperationError> {
        self.boolean(name)
            .ok_or_else(|| OperationError::missing_argument(name))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// JSON type name used in mismatch messages
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn convert(param: &ParameterSpec, value: &Value) -> Result<ArgValue, OperationError> {
    let mismatch = |got: &str| OperationError::type_mismatch(param.name, param.kind.name(), got);

    match (param.kind, value) {
        (ParameterKind::String, Value::String(s)) => Ok(ArgValue::String(s.clone())),
        (ParameterKind::Boolean, Value::Bool(b)) => Ok(ArgValue::Boolean(*b)),
        (ParameterKind::Integer, Value::Number(n)) => n
            .as_i64()
            .map(ArgValue::Integer)
            .ok_or_else(|| mismatch(if n.is_u64() { "integer out of range" } else { "number" })),
        (ParameterKind::StringList, Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(mismatch(&format!("array containing {}", json_type_name(other)))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ArgValue::StringList),
        (_, other) => Err(mismatch(json_type_name(other))),
    }
}

/// Validate `raw` against the parameters of `spec`, producing the bound arguments.
///
/// Parameters are checked in declaration order and the first problem is
/// reported; nothing is bound partially.
pub fn bind(spec: &OperationSpec, raw: &Map<String, Value>) -> Result<ArgumentBag, OperationError> {
    let mut values = BTreeMap::new();

    for param in &spec.parameters {
        match raw.get(param.name).filter(|v| !v.is_null()) {
            Some(value) => {
                values.insert(param.name, convert(param, value)?);
            }
            None if param.required => return Err(OperationError::missing_argument(param.name)),
            None => {
                if let Some(default) = &param.default {
                    values.insert(param.name, default.clone());
                }
            }
        }
    }

    Ok(ArgumentBag { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::registry;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn raw(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn spec(name: &str) -> &'static OperationSpec {
        &registry().lookup(name).unwrap().spec
    }

    #[test]
    fn applies_defaults() {
        let bag = bind(spec("push"), &raw(json!({}))).unwrap();
        assert_eq!(bag.string("remote"), Some("origin"));
        assert_eq!(bag.boolean("set_upstream"), Some(false));
        assert_eq!(bag.string("branch"), None);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let bag = bind(spec("log"), &raw(json!({ "max_count": 3 }))).unwrap();
        assert_eq!(bag.integer("max_count"), Some(3));
    }

    #[test]
    fn null_counts_as_absent() {
        let bag = bind(spec("log"), &raw(json!({ "max_count": null }))).unwrap();
        assert_eq!(bag.integer("max_count"), Some(10));

        let err = bind(spec("commit"), &raw(json!({ "message": null }))).unwrap_err();
        assert_eq!(err, OperationError::missing_argument("message"));
    }

    #[test]
    fn missing_required_argument_is_named() {
        let err = bind(spec("remote_add"), &raw(json!({ "name": "upstream" }))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingArgument);
        assert!(err.message.contains("'url'"));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let bag = bind(
            spec("commit"),
            &raw(json!({ "message": "m", "amend": true, "future_flag": [1, 2] })),
        )
        .unwrap();
        assert_eq!(bag.len(), 1);
        assert_eq!(bag.string("message"), Some("m"));
    }

    #[rstest]
    #[case("log", json!({ "max_count": "10" }), "argument 'max_count' must be integer, got string")]
    #[case("log", json!({ "max_count": 2.5 }), "argument 'max_count' must be integer, got number")]
    #[case("switch", json!({ "branch_name": "b", "create_branch": "yes" }), "argument 'create_branch' must be boolean, got string")]
    #[case("add", json!({ "files": "a.txt" }), "argument 'files' must be string-list, got string")]
    #[case("add", json!({ "files": ["a.txt", 3] }), "argument 'files' must be string-list, got array containing integer")]
    #[case("commit", json!({ "message": ["m"] }), "argument 'message' must be string, got array")]
    fn type_mismatches(#[case] op: &str, #[case] args: Value, #[case] message: &str) {
        let err = bind(spec(op), &raw(args)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
        assert_eq!(err.message, message);
    }

    #[test]
    fn integer_beyond_i64_is_a_mismatch() {
        let err = bind(spec("log"), &raw(json!({ "max_count": u64::MAX }))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn first_problem_in_declaration_order_wins() {
        let err = bind(spec("remote_add"), &raw(json!({ "url": 7 }))).unwrap_err();
        assert_eq!(err, OperationError::missing_argument("name"));
    }
}
