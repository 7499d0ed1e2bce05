// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").unwrap());
static DATE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])[Tt ]([01]\d|2[0-3]):[0-5]\d:[0-5]\d(\.\d+)?([Zz]|[+-]([01]\d|2[0-3]):[0-5]\d)$",
    )
    .unwrap()
});
static URI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:\S+$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Kind {
    String,
    Integer,
    Float,
    Boolean,
    /// A string, or an integer standing for one
    Id,
    Array,
    Object,
    Ref,
}

impl Kind {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "string" => Kind::String,
            "integer" => Kind::Integer,
            "float" => Kind::Float,
            "boolean" => Kind::Boolean,
            "id" => Kind::Id,
            "array" => Kind::Array,
            "object" => Kind::Object,
            "ref" => Kind::Ref,
            _ => return None,
        })
    }

    pub(super) fn name(&self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::Boolean => "boolean",
            Kind::Id => "id",
            Kind::Array => "array",
            Kind::Object => "object",
            Kind::Ref => "ref",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Format {
    Email,
    Uuid,
    Date,
    DateTime,
    Uri,
}

impl Format {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "email" => Format::Email,
            "uuid" => Format::Uuid,
            "date" => Format::Date,
            "date-time" => Format::DateTime,
            "uri" => Format::Uri,
            _ => return None,
        })
    }

    pub(super) fn name(&self) -> &'static str {
        match self {
            Format::Email => "email",
            Format::Uuid => "uuid",
            Format::Date => "date",
            Format::DateTime => "date-time",
            Format::Uri => "uri",
        }
    }

    pub(super) fn matches(&self, value: &str) -> bool {
        let re = match self {
            Format::Email => &EMAIL_RE,
            Format::Uuid => &UUID_RE,
            Format::Date => &DATE_RE,
            Format::DateTime => &DATE_TIME_RE,
            Format::Uri => &URI_RE,
        };
        re.is_match(value)
    }
}

/// A parsed native fragment. A shape with no kind accepts any value its constraints allow.
#[derive(Debug, Default)]
pub(super) struct Shape {
    pub kind: Option<Kind>,
    pub nullable: bool,
    pub reference: Option<String>,
    pub items: Option<Box<Shape>>,
    pub properties: IndexMap<String, Shape>,
    pub required: Vec<String>,
    /// `additionalProperties: false`
    pub closed: bool,

    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
    pub format: Option<Format>,

    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,

    pub allowed: Option<Vec<Value>>,

    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub unique_items: bool,
}

impl Shape {
    /// Unknown keys are ignored; a known key with a value of the wrong form is an error.
    pub(super) fn parse(fragment: &Map<String, Value>) -> Result<Self, String> {
        let mut shape = Shape::default();

        for (key, value) in fragment {
            match key.as_str() {
                "kind" => {
                    let name = expect_str(key, value)?;
                    shape.kind =
                        Some(Kind::parse(name).ok_or_else(|| format!("unknown kind '{name}'"))?);
                }
                "nullable" => shape.nullable = expect_bool(key, value)?,
                "ref" => shape.reference = Some(expect_str(key, value)?.to_string()),
                "items" => {
                    let items = expect_object(key, value)?;
                    shape.items =
                        Some(Box::new(Self::parse(items).map_err(|e| format!("items: {e}"))?));
                }
                "properties" => {
                    for (name, property) in expect_object(key, value)? {
                        let property = expect_object(name, property)?;
                        shape.properties.insert(
                            name.clone(),
                            Self::parse(property).map_err(|e| format!("{name}: {e}"))?,
                        );
                    }
                }
                "required" => {
                    shape.required = expect_array(key, value)?
                        .iter()
                        .map(|name| expect_str(key, name).map(str::to_string))
                        .collect::<Result<_, _>>()?;
                }
                "additionalProperties" => shape.closed = !expect_bool(key, value)?,
                "minLength" => shape.min_length = Some(expect_count(key, value)?),
                "maxLength" => shape.max_length = Some(expect_count(key, value)?),
                "pattern" => {
                    let pattern = expect_str(key, value)?;
                    shape.pattern = Some(
                        Regex::new(pattern).map_err(|e| format!("invalid pattern: {e}"))?,
                    );
                }
                "format" => {
                    let name = expect_str(key, value)?;
                    shape.format = Some(
                        Format::parse(name).ok_or_else(|| format!("unknown format '{name}'"))?,
                    );
                }
                "minimum" => shape.minimum = Some(expect_number(key, value)?),
                "maximum" => shape.maximum = Some(expect_number(key, value)?),
                "exclusiveMinimum" => shape.exclusive_minimum = Some(expect_number(key, value)?),
                "exclusiveMaximum" => shape.exclusive_maximum = Some(expect_number(key, value)?),
                "multipleOf" => {
                    let divisor = expect_number(key, value)?;
                    if divisor <= 0.0 {
                        return Err(format!("'{key}' must be greater than 0"));
                    }
                    shape.multiple_of = Some(divisor);
                }
                "enum" => shape.allowed = Some(expect_array(key, value)?.clone()),
                "minItems" => shape.min_items = Some(expect_count(key, value)?),
                "maxItems" => shape.max_items = Some(expect_count(key, value)?),
                "uniqueItems" => shape.unique_items = expect_bool(key, value)?,
                _ => {}
            }
        }

        match (shape.kind, &shape.reference) {
            (None, Some(_)) => shape.kind = Some(Kind::Ref),
            (Some(Kind::Ref), None) => return Err("kind 'ref' without a 'ref' target".into()),
            (Some(kind), Some(_)) if kind != Kind::Ref => {
                return Err(format!("'ref' given for kind '{}'", kind.name()));
            }
            _ => {}
        }

        Ok(shape)
    }
}

fn expect_str<'a>(key: &str, value: &'a Value) -> Result<&'a str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("'{key}' must be a string"))
}

fn expect_bool(key: &str, value: &Value) -> Result<bool, String> {
    value
        .as_bool()
        .ok_or_else(|| format!("'{key}' must be a boolean"))
}

fn expect_number(key: &str, value: &Value) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("'{key}' must be a number"))
}

fn expect_count(key: &str, value: &Value) -> Result<usize, String> {
    value
        .as_u64()
        .and_then(|count| usize::try_from(count).ok())
        .ok_or_else(|| format!("'{key}' must be a non-negative integer"))
}

fn expect_array<'a>(key: &str, value: &'a Value) -> Result<&'a Vec<Value>, String> {
    value
        .as_array()
        .ok_or_else(|| format!("'{key}' must be an array"))
}

fn expect_object<'a>(key: &str, value: &'a Value) -> Result<&'a Map<String, Value>, String> {
    value
        .as_object()
        .ok_or_else(|| format!("'{key}' must be an object"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: Value) -> Result<Shape, String> {
        Shape::parse(value.as_object().unwrap())
    }

    #[test]
    fn nested_shape() {
        let shape = parse(json!({
            "kind": "object",
            "properties": {
                "tags": { "kind": "array", "items": { "kind": "string", "minLength": 1 } },
                "filters": { "ref": "Filters", "nullable": true }
            },
            "required": ["tags"],
            "description": "ignored"
        }))
        .unwrap();

        assert_eq!(shape.kind, Some(Kind::Object));
        assert_eq!(shape.required, vec!["tags"]);

        let tags = &shape.properties["tags"];
        assert_eq!(tags.items.as_ref().unwrap().min_length, Some(1));

        let filters = &shape.properties["filters"];
        assert_eq!(filters.kind, Some(Kind::Ref));
        assert!(filters.nullable);
    }

    #[test]
    fn malformed_constraints() {
        insta::assert_snapshot!(
            parse(json!({ "kind": "string", "minLength": "three" })).unwrap_err(),
            @"'minLength' must be a non-negative integer"
        );
        insta::assert_snapshot!(
            parse(json!({ "kind": "text" })).unwrap_err(),
            @"unknown kind 'text'"
        );
        let unknown_format = json!({
            "kind": "object",
            "properties": { "a": { "format": "color" } }
        });
        insta::assert_snapshot!(parse(unknown_format).unwrap_err(), @"a: unknown format 'color'");
        assert!(parse(json!({ "pattern": "(" })).is_err());
        assert!(parse(json!({ "kind": "ref" })).is_err());
    }

    #[test]
    fn formats() {
        assert!(Format::Email.matches("someone@example.com"));
        assert!(!Format::Email.matches("someone"));
        assert!(Format::Uuid.matches("123e4567-e89b-12d3-a456-426614174000"));
        assert!(Format::Date.matches("2024-02-29"));
        assert!(!Format::Date.matches("2024-13-01"));
        assert!(Format::DateTime.matches("2024-02-29T10:15:00Z"));
        assert!(Format::Uri.matches("https://example.com/a"));
    }
}
