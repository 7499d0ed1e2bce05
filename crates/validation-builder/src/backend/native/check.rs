// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;

use serde_json::{Number, Value};

use super::shape::{Kind, Shape};
use crate::backend::ValueFailure;

const MAX_REFERENCE_HOPS: usize = 64;

pub(super) struct Checker<'a> {
    pub table: &'a HashMap<String, Shape>,
    pub coerce_types: bool,
}

impl Checker<'_> {
    pub(super) fn check(&self, shape: &Shape, value: Value) -> Result<Value, Vec<ValueFailure>> {
        let mut failures = vec![];
        let value = self.check_at(shape, value, &mut vec![], &mut failures, 0);

        if failures.is_empty() {
            Ok(value)
        } else {
            Err(failures)
        }
    }

    fn check_at(
        &self,
        shape: &Shape,
        value: Value,
        path: &mut Vec<String>,
        failures: &mut Vec<ValueFailure>,
        hops: usize,
    ) -> Value {
        let mut fail = |message: String| {
            failures.push(ValueFailure {
                path: json_pointer(path),
                message,
            })
        };

        if value.is_null() {
            if !shape.nullable && shape.kind.is_some() {
                fail("must not be null".into());
            }
            return value;
        }

        let kind = match shape.kind {
            Some(Kind::Ref) => {
                let reference = shape.reference.as_deref().unwrap_or_default();
                return match self.table.get(reference) {
                    Some(_) if hops >= MAX_REFERENCE_HOPS => {
                        fail(format!("reference chain through '{reference}' is too deep"));
                        value
                    }
                    Some(target) => self.check_at(target, value, path, failures, hops + 1),
                    None => {
                        fail(format!("unresolved reference '{reference}'"));
                        value
                    }
                };
            }
            kind => kind,
        };

        let mut value = match kind {
            Some(kind) => match self.coerce(kind, value) {
                Ok(value) => value,
                Err(value) => {
                    fail(format!("expected {}, found {}", kind.name(), json_kind(&value)));
                    return value;
                }
            },
            None => value,
        };

        check_scalar_constraints(shape, &value, &mut fail);

        if let Some(allowed) = &shape.allowed {
            if !allowed.contains(&value) {
                fail(format!(
                    "must be one of {}",
                    allowed
                        .iter()
                        .map(Value::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
        }

        match &mut value {
            Value::Array(elements) => {
                if let Some(min) = shape.min_items.filter(|min| elements.len() < *min) {
                    fail(format!("must have at least {min} items"));
                }
                if let Some(max) = shape.max_items.filter(|max| elements.len() > *max) {
                    fail(format!("must have at most {max} items"));
                }
                if shape.unique_items && has_duplicates(elements) {
                    fail("items must be unique".into());
                }

                if let Some(items) = &shape.items {
                    for (index, element) in elements.iter_mut().enumerate() {
                        path.push(index.to_string());
                        *element = self.check_at(items, element.take(), path, failures, 0);
                        path.pop();
                    }
                }
            }
            Value::Object(fields) => {
                for name in &shape.required {
                    if !fields.contains_key(name) {
                        fail(format!("missing required property '{name}'"));
                    }
                }

                let unexpected: Vec<String> = if shape.closed {
                    fields
                        .keys()
                        .filter(|name| !shape.properties.contains_key(*name))
                        .cloned()
                        .collect()
                } else {
                    vec![]
                };

                for (name, property) in &shape.properties {
                    if let Some(field) = fields.get_mut(name) {
                        path.push(name.clone());
                        *field = self.check_at(property, field.take(), path, failures, 0);
                        path.pop();
                    }
                }

                for name in unexpected {
                    path.push(name);
                    failures.push(ValueFailure {
                        path: json_pointer(path),
                        message: "unexpected property".into(),
                    });
                    path.pop();
                }
            }
            _ => {}
        }

        value
    }

    /// The value converted to the kind, or the original value if it cannot be
    fn coerce(&self, kind: Kind, value: Value) -> Result<Value, Value> {
        let converted = match (kind, &value) {
            (Kind::String, Value::String(_))
            | (Kind::Float, Value::Number(_))
            | (Kind::Boolean, Value::Bool(_))
            | (Kind::Id, Value::String(_))
            | (Kind::Array, Value::Array(_))
            | (Kind::Object, Value::Object(_)) => return Ok(value),
            (Kind::Integer, Value::Number(n)) if is_integral(n) => return Ok(value),
            (Kind::Id, Value::Number(n)) if is_integral(n) => {
                if self.coerce_types {
                    return Ok(Value::String(n.to_string()));
                } else {
                    return Ok(value);
                }
            }
            _ if !self.coerce_types => None,

            (Kind::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (Kind::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

            (Kind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (Kind::Integer | Kind::Float, Value::Bool(b)) => Some(Value::from(i64::from(*b))),
            (Kind::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),

            (Kind::Boolean, Value::String(s)) => match s.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            (Kind::Boolean, Value::Number(n)) => match n.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },

            _ => None,
        };

        converted.ok_or(value)
    }
}

fn check_scalar_constraints(shape: &Shape, value: &Value, fail: &mut impl FnMut(String)) {
    match value {
        Value::String(s) => {
            let length = s.chars().count();
            if let Some(min) = shape.min_length.filter(|min| length < *min) {
                fail(format!("must be at least {min} characters long"));
            }
            if let Some(max) = shape.max_length.filter(|max| length > *max) {
                fail(format!("must be at most {max} characters long"));
            }
            if let Some(pattern) = shape.pattern.as_ref().filter(|p| !p.is_match(s)) {
                fail(format!("must match the pattern '{pattern}'"));
            }
            if let Some(format) = shape.format.filter(|format| !format.matches(s)) {
                fail(format!("must be a valid {}", format.name()));
            }
        }
        Value::Number(n) => {
            let Some(n) = n.as_f64() else {
                return;
            };
            if let Some(minimum) = shape.minimum.filter(|minimum| n < *minimum) {
                fail(format!("must be at least {minimum}"));
            }
            if let Some(maximum) = shape.maximum.filter(|maximum| n > *maximum) {
                fail(format!("must be at most {maximum}"));
            }
            if let Some(minimum) = shape.exclusive_minimum.filter(|minimum| n <= *minimum) {
                fail(format!("must be greater than {minimum}"));
            }
            if let Some(maximum) = shape.exclusive_maximum.filter(|maximum| n >= *maximum) {
                fail(format!("must be less than {maximum}"));
            }
            if let Some(divisor) = shape.multiple_of {
                let quotient = n / divisor;
                if (quotient - quotient.round()).abs() > 1e-9 {
                    fail(format!("must be a multiple of {divisor}"));
                }
            }
        }
        _ => {}
    }
}

fn is_integral(n: &Number) -> bool {
    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
}

fn has_duplicates(elements: &[Value]) -> bool {
    elements
        .iter()
        .enumerate()
        .any(|(index, element)| elements[index + 1..].contains(element))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn json_pointer(path: &[String]) -> String {
    path.iter()
        .map(|segment| format!("/{}", segment.replace('~', "~0").replace('/', "~1")))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn shape(value: Value) -> Shape {
        Shape::parse(value.as_object().unwrap()).unwrap()
    }

    fn check(shape: &Shape, value: Value) -> Result<Value, Vec<ValueFailure>> {
        let table = HashMap::new();
        Checker {
            table: &table,
            coerce_types: true,
        }
        .check(shape, value)
    }

    #[test]
    fn strings() {
        let text = shape(json!({ "kind": "string", "minLength": 3, "pattern": "^[a-z]+$" }));

        assert_eq!(check(&text, json!("abcd")), Ok(json!("abcd")));

        let failures = check(&text, json!("A")).unwrap_err();
        assert_eq!(failures.len(), 2);
        insta::assert_snapshot!(failures[0].message, @"must be at least 3 characters long");
    }

    #[test]
    fn nullability() {
        let nullable = shape(json!({ "kind": "string", "nullable": true }));
        let non_null = shape(json!({ "kind": "string", "nullable": false }));

        assert_eq!(check(&nullable, json!(null)), Ok(json!(null)));
        assert!(check(&non_null, json!(null)).is_err());
    }

    #[test]
    fn coercion() {
        let id = shape(json!({ "kind": "id" }));
        let integer = shape(json!({ "kind": "integer", "maximum": 10 }));
        let boolean = shape(json!({ "kind": "boolean" }));

        assert_eq!(check(&id, json!(42)), Ok(json!("42")));
        assert_eq!(check(&integer, json!("7")), Ok(json!(7)));
        assert!(check(&integer, json!("11")).is_err());
        assert!(check(&integer, json!(1.5)).is_err());
        assert_eq!(check(&boolean, json!("true")), Ok(json!(true)));

        let failures = check(&integer, json!("seven")).unwrap_err();
        insta::assert_snapshot!(failures[0].message, @"expected integer, found string");
    }

    #[test]
    fn item_failures_carry_their_index() {
        let tags = shape(json!({
            "kind": "array",
            "nullable": true,
            "items": { "kind": "string", "nullable": false }
        }));

        assert!(check(&tags, json!(["a", "b"])).is_ok());

        let failures = check(&tags, json!(["a", null])).unwrap_err();
        assert_eq!(
            failures,
            vec![ValueFailure {
                path: "/1".into(),
                message: "must not be null".into()
            }]
        );
    }

    #[test]
    fn objects() {
        let filters = shape(json!({
            "kind": "object",
            "properties": {
                "id": { "kind": "id", "nullable": true },
                "text": { "kind": "string", "nullable": true, "minLength": 3 }
            },
            "required": ["id"],
            "additionalProperties": false
        }));

        let failures = check(&filters, json!({ "text": "ab", "other": 1 })).unwrap_err();
        let paths: Vec<_> = failures.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["", "/text", "/other"]);
    }

    #[test]
    fn references_through_the_table() {
        let mut table = HashMap::new();
        table.insert(
            "Filters".to_string(),
            shape(json!({
                "kind": "object",
                "properties": { "text": { "kind": "string", "minLength": 3 } }
            })),
        );
        let checker = Checker {
            table: &table,
            coerce_types: true,
        };

        let search = shape(json!({
            "kind": "object",
            "properties": { "filters": { "ref": "Filters" }, "missing": { "ref": "Missing" } }
        }));

        let failures = checker
            .check(&search, json!({ "filters": { "text": "ab" }, "missing": 1 }))
            .unwrap_err();
        let paths: Vec<_> = failures.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["/filters/text", "/missing"]);
    }
}
