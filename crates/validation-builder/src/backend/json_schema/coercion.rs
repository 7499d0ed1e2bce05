// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Scalar coercion ahead of JSON Schema validation.
//!
//! Walks the value alongside its schema (through `$ref`, `anyOf`, `allOf`, `items` and
//! `properties`) and converts scalars whose JSON type does not match the declared one, when a
//! lossless conversion exists. Values that cannot be converted are left for the validator to
//! reject.

use serde_json::{Map, Number, Value};

use super::DEFINITIONS_PREFIX;

const MAX_REFERENCE_DEPTH: usize = 64;

pub(super) fn coerce(schema: &Value, definitions: &Map<String, Value>, value: Value) -> Value {
    coerce_at(schema, definitions, value, 0)
}

fn coerce_at(
    schema: &Value,
    definitions: &Map<String, Value>,
    value: Value,
    depth: usize,
) -> Value {
    let Some(schema) = schema.as_object() else {
        return value;
    };
    if depth > MAX_REFERENCE_DEPTH || value.is_null() {
        return value;
    }

    if let Some(target) = schema
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(|reference| reference.strip_prefix(DEFINITIONS_PREFIX))
        .and_then(|name| definitions.get(name))
    {
        return coerce_at(target, definitions, value, depth + 1);
    }

    let mut value = value;

    if let Some(branch) = schema
        .get("anyOf")
        .and_then(Value::as_array)
        .and_then(|branches| branches.iter().find(|branch| !is_null_schema(branch)))
    {
        value = coerce_at(branch, definitions, value, depth + 1);
    }

    if let Some(branches) = schema.get("allOf").and_then(Value::as_array) {
        for branch in branches {
            value = coerce_at(branch, definitions, value, depth + 1);
        }
    }

    let types = declared_types(schema);
    if !types.is_empty() && !types.iter().any(|t| matches_type(&value, t)) {
        if let Some(coerced) = types.iter().find_map(|t| coerce_scalar(&value, t)) {
            value = coerced;
        }
    }

    match &mut value {
        Value::Array(elements) => {
            if let Some(items) = schema.get("items") {
                for element in elements.iter_mut() {
                    *element = coerce_at(items, definitions, element.take(), depth);
                }
            }
        }
        Value::Object(fields) => {
            if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
                for (name, property) in properties {
                    if let Some(field) = fields.get_mut(name) {
                        *field = coerce_at(property, definitions, field.take(), depth);
                    }
                }
            }
        }
        _ => {}
    }

    value
}

fn is_null_schema(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("null")
}

fn declared_types(schema: &Map<String, Value>) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .filter(|t| *t != "null")
            .collect(),
        _ => vec![],
    }
}

fn matches_type(value: &Value, type_name: &str) -> bool {
    match (type_name, value) {
        ("string", Value::String(_)) => true,
        ("number", Value::Number(_)) => true,
        ("integer", Value::Number(n)) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        ("boolean", Value::Bool(_)) => true,
        ("array", Value::Array(_)) => true,
        ("object", Value::Object(_)) => true,
        _ => false,
    }
}

fn coerce_scalar(value: &Value, type_name: &str) -> Option<Value> {
    match (type_name, value) {
        ("string", Value::Number(n)) => Some(Value::String(n.to_string())),
        ("string", Value::Bool(b)) => Some(Value::String(b.to_string())),

        ("integer", Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
        ("integer", Value::Bool(b)) => Some(Value::from(i64::from(*b))),

        ("number", Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(|n| match n.as_f64() {
                // Keep integral values integral, so they also satisfy "integer"
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Value::from(f as i64),
                _ => Value::Number(n),
            }),
        ("number", Value::Bool(b)) => Some(Value::from(i64::from(*b))),

        ("boolean", Value::String(s)) => match s.as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        ("boolean", Value::Number(n)) => match n.as_i64() {
            Some(0) => Some(Value::Bool(false)),
            Some(1) => Some(Value::Bool(true)),
            _ => None,
        },

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn definitions() -> Map<String, Value> {
        json!({
            "Filters": {
                "type": "object",
                "properties": {
                    "id": { "type": ["string", "null"] },
                    "limit": { "type": "integer" },
                    "nested": { "anyOf": [{ "$ref": "#/definitions/Filters" }, { "type": "null" }] }
                }
            }
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn scalars() {
        let definitions = Map::new();
        let coerce_to = |type_name: &str, value: Value| {
            coerce(&json!({ "type": type_name }), &definitions, value)
        };

        assert_eq!(coerce_to("string", json!(42)), json!("42"));
        assert_eq!(coerce_to("string", json!(true)), json!("true"));
        assert_eq!(coerce_to("integer", json!("7")), json!(7));
        assert_eq!(coerce_to("number", json!("1.5")), json!(1.5));
        assert_eq!(coerce_to("boolean", json!("false")), json!(false));
        assert_eq!(coerce_to("boolean", json!(1)), json!(true));
    }

    #[test]
    fn unconvertible_values_are_kept() {
        let definitions = Map::new();

        assert_eq!(
            coerce(&json!({ "type": "integer" }), &definitions, json!("seven")),
            json!("seven")
        );
        assert_eq!(
            coerce(&json!({ "type": ["string", "null"] }), &definitions, json!(null)),
            json!(null)
        );
        assert_eq!(coerce(&json!({ "type": "string" }), &definitions, json!([1])), json!([1]));
    }

    #[test]
    fn through_references_and_nesting() {
        let schema = json!({
            "type": "object",
            "properties": {
                "filters": { "$ref": "#/definitions/Filters" },
                "ids": { "type": "array", "items": { "type": "string" } }
            }
        });

        let value = coerce(
            &schema,
            &definitions(),
            json!({
                "filters": { "id": 1, "limit": "5", "nested": { "id": 2 } },
                "ids": [3, "four"],
                "other": 5
            }),
        );

        assert_eq!(
            value,
            json!({
                "filters": { "id": "1", "limit": 5, "nested": { "id": "2" } },
                "ids": ["3", "four"],
                "other": 5
            })
        );
    }
}
