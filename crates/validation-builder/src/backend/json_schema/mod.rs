// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! JSON Schema units, compiled with the `jsonschema` crate.
//!
//! Every unit lives under `#/definitions/<name>` of a single document, so references between
//! units are local JSON pointers. Units are checked against the draft's meta-schema one at a
//! time when registered. The document is then loaded once into a shared [`Registry`], and each
//! unit compiles from a root that only points into it:
//!
//! ```json
//! { "$ref": "json-schema:///gql-validate/units#/definitions/Query.search" }
//! ```

mod coercion;

use std::{fmt::Debug, sync::Arc};

use indexmap::IndexMap;
use jsonschema::{Draft, Registry, Validator};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;
use validation_model::{Fragment, PrimitiveKind};

use super::{CompiledValidator, SchemaBackend, SchemaDialect, ValueFailure, unit_name};
use crate::error::CompileError;

const DEFINITIONS_PREFIX: &str = "#/definitions/";
const UNITS_URI: &str = "json-schema:///gql-validate/units";

pub struct JsonSchemaDialect;

impl JsonSchemaDialect {
    fn type_value(type_name: &str, nullable: bool) -> Value {
        if nullable {
            json!([type_name, "null"])
        } else {
            json!(type_name)
        }
    }
}

impl SchemaDialect for JsonSchemaDialect {
    fn reference_id(
        &self,
        type_name: &str,
        field_name: Option<&str>,
        argument_name: Option<&str>,
    ) -> String {
        format!(
            "{DEFINITIONS_PREFIX}{}",
            unit_name(type_name, field_name, argument_name)
        )
    }

    fn tag_key(&self) -> &'static str {
        "$comment"
    }

    fn identity_keys(&self) -> &'static [&'static str] {
        &["$comment", "type", "$ref", "allOf", "anyOf"]
    }

    fn reference_key(&self) -> &'static str {
        "$ref"
    }

    fn primitive(&self, kind: PrimitiveKind, nullable: bool) -> Fragment {
        let type_name = match kind {
            PrimitiveKind::Int => "integer",
            PrimitiveKind::Float => "number",
            PrimitiveKind::String | PrimitiveKind::Id => "string",
            PrimitiveKind::Boolean => "boolean",
        };

        let mut fragment = Map::new();
        fragment.insert("type".into(), Self::type_value(type_name, nullable));
        fragment
    }

    fn enumeration(&self, values: &[String], nullable: bool) -> Fragment {
        let mut allowed: Vec<Value> = values.iter().map(|value| json!(value)).collect();
        if nullable {
            allowed.push(Value::Null);
        }

        let mut fragment = Map::new();
        fragment.insert("type".into(), Self::type_value("string", nullable));
        fragment.insert("enum".into(), Value::Array(allowed));
        fragment
    }

    /// Type units accept `null` themselves, so a nullable position is a bare `$ref`. A non-null
    /// position wraps the reference in `allOf` next to its `type` (draft 7 ignores siblings of
    /// `$ref`).
    fn reference(&self, reference_id: &str, nullable: bool) -> Fragment {
        let reference = json!({ "$ref": reference_id });

        let fragment = if nullable {
            reference
        } else {
            json!({ "type": "object", "allOf": [reference] })
        };

        into_fragment(fragment)
    }

    fn array(&self, items: Fragment, nullable: bool) -> Fragment {
        let mut fragment = Map::new();
        fragment.insert("type".into(), Self::type_value("array", nullable));
        fragment.insert("items".into(), Value::Object(items));
        fragment
    }

    fn object(&self, properties: IndexMap<String, Fragment>, required: Vec<String>) -> Fragment {
        let mut fragment = Map::new();
        fragment.insert("type".into(), json!("object"));
        fragment.insert(
            "properties".into(),
            Value::Object(
                properties
                    .into_iter()
                    .map(|(name, property)| (name, Value::Object(property)))
                    .collect(),
            ),
        );
        // Draft 4 does not allow an empty `required`
        if !required.is_empty() {
            fragment.insert("required".into(), json!(required));
        }
        fragment
    }

    fn type_unit(&self, properties: IndexMap<String, Fragment>, required: Vec<String>) -> Fragment {
        let mut fragment = self.object(properties, required);
        fragment.insert("type".into(), Self::type_value("object", true));
        fragment
    }

    fn has_shape(&self, fragment: &Fragment) -> bool {
        ["type", "$ref", "anyOf", "oneOf", "allOf", "enum", "const"]
            .iter()
            .any(|key| fragment.contains_key(*key))
    }
}

fn into_fragment(value: Value) -> Fragment {
    match value {
        Value::Object(fragment) => fragment,
        _ => Map::new(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum DraftVersion {
    #[serde(rename = "draft4")]
    Draft4,
    #[serde(rename = "draft6")]
    Draft6,
    #[default]
    #[serde(rename = "draft7")]
    Draft7,
    #[serde(rename = "draft2019-09")]
    Draft201909,
    #[serde(rename = "draft2020-12")]
    Draft202012,
}

impl From<DraftVersion> for Draft {
    fn from(version: DraftVersion) -> Self {
        match version {
            DraftVersion::Draft4 => Draft::Draft4,
            DraftVersion::Draft6 => Draft::Draft6,
            DraftVersion::Draft7 => Draft::Draft7,
            DraftVersion::Draft201909 => Draft::Draft201909,
            DraftVersion::Draft202012 => Draft::Draft202012,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct JsonSchemaOptions {
    /// Convert scalars to the declared type before validating (`"42"` to `42` and such)
    pub coerce_types: bool,
    pub draft: DraftVersion,
    /// Whether `format` is asserted. Left to the draft's default when absent.
    pub validate_formats: Option<bool>,
}

impl Default for JsonSchemaOptions {
    fn default() -> Self {
        Self {
            coerce_types: true,
            draft: DraftVersion::default(),
            validate_formats: None,
        }
    }
}

pub struct JsonSchemaBackend {
    options: JsonSchemaOptions,
    definitions: Map<String, Value>,
    /// Built on the first compilation after a registration
    shared: Option<SharedUnits>,
}

/// Registered units as seen by compiled validators
struct SharedUnits {
    definitions: Arc<Map<String, Value>>,
    registry: Registry,
}

impl JsonSchemaBackend {
    pub fn new(options: JsonSchemaOptions) -> Self {
        Self {
            options,
            definitions: Map::new(),
            shared: None,
        }
    }

    /// Check a single unit against the draft's meta-schema
    fn check_unit(&self, fragment: &Value) -> Result<(), String> {
        let result = match self.options.draft {
            DraftVersion::Draft4 => jsonschema::draft4::meta::validate(fragment),
            DraftVersion::Draft6 => jsonschema::draft6::meta::validate(fragment),
            DraftVersion::Draft7 => jsonschema::draft7::meta::validate(fragment),
            DraftVersion::Draft201909 => jsonschema::draft201909::meta::validate(fragment),
            DraftVersion::Draft202012 => jsonschema::draft202012::meta::validate(fragment),
        };

        result.map_err(|e| e.to_string())
    }

    fn shared(&mut self) -> Result<&SharedUnits, String> {
        if self.shared.is_none() {
            let draft = Draft::from(self.options.draft);
            let document = json!({ "definitions": Value::Object(self.definitions.clone()) });
            let registry = Registry::options()
                .draft(draft)
                .build([(UNITS_URI, draft.create_resource(document))])
                .map_err(|e| e.to_string())?;

            debug!(units = self.definitions.len(), "Loaded JSON Schema units");
            self.shared = Some(SharedUnits {
                definitions: Arc::new(self.definitions.clone()),
                registry,
            });
        }

        self.shared
            .as_ref()
            .ok_or_else(|| "units are not loaded".to_string())
    }

    fn build(&self, root: &Value, registry: Registry) -> Result<Validator, String> {
        let options = jsonschema::options()
            .with_draft(Draft::from(self.options.draft))
            .with_registry(registry);

        let validator = match self.options.validate_formats {
            Some(validate_formats) => options.should_validate_formats(validate_formats).build(root),
            None => options.build(root),
        };

        validator.map_err(|e| e.to_string())
    }
}

impl SchemaBackend for JsonSchemaBackend {
    fn dialect(&self) -> &'static dyn SchemaDialect {
        &JsonSchemaDialect
    }

    fn register_fragment(
        &mut self,
        reference_id: &str,
        fragment: Fragment,
    ) -> Result<(), CompileError> {
        let name = reference_id.strip_prefix(DEFINITIONS_PREFIX).ok_or_else(|| {
            CompileError::InvalidFragment {
                reference_id: reference_id.to_string(),
                message: format!("reference id must start with '{DEFINITIONS_PREFIX}'"),
            }
        })?;

        if self.definitions.contains_key(name) {
            return Err(CompileError::DuplicateReference(reference_id.to_string()));
        }

        let fragment = Value::Object(fragment);
        self.check_unit(&fragment)
            .map_err(|message| CompileError::InvalidFragment {
                reference_id: reference_id.to_string(),
                message,
            })?;

        debug!(reference_id, "Registering JSON Schema unit");
        self.definitions.insert(name.to_string(), fragment);
        self.shared = None;

        Ok(())
    }

    fn compile(&mut self, reference_id: &str) -> Result<Arc<dyn CompiledValidator>, CompileError> {
        let schema = reference_id
            .strip_prefix(DEFINITIONS_PREFIX)
            .and_then(|name| self.definitions.get(name))
            .cloned()
            .ok_or_else(|| CompileError::UnknownUnit(reference_id.to_string()))?;

        let backend_error = |message| CompileError::Backend {
            reference_id: reference_id.to_string(),
            message,
        };

        let shared = self.shared().map_err(backend_error)?;
        let definitions = shared.definitions.clone();
        let registry = shared.registry.clone();

        let root = json!({ "$ref": format!("{UNITS_URI}{reference_id}") });
        let validator = self.build(&root, registry).map_err(backend_error)?;

        Ok(Arc::new(JsonSchemaValidator {
            reference_id: reference_id.to_string(),
            schema,
            definitions,
            coerce_types: self.options.coerce_types,
            validator,
        }))
    }
}

struct JsonSchemaValidator {
    reference_id: String,
    schema: Value,
    definitions: Arc<Map<String, Value>>,
    coerce_types: bool,
    validator: Validator,
}

impl Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("reference_id", &self.reference_id)
            .field("coerce_types", &self.coerce_types)
            .finish()
    }
}

impl CompiledValidator for JsonSchemaValidator {
    fn validate(&self, value: &Value) -> Result<Value, Vec<ValueFailure>> {
        let value = if self.coerce_types {
            coercion::coerce(&self.schema, &self.definitions, value.clone())
        } else {
            value.clone()
        };

        let failures: Vec<_> = self
            .validator
            .iter_errors(&value)
            .map(|e| ValueFailure {
                path: e.instance_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if failures.is_empty() {
            Ok(value)
        } else {
            Err(failures)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(value: Value) -> Fragment {
        into_fragment(value)
    }

    fn backend() -> JsonSchemaBackend {
        let mut backend = JsonSchemaBackend::new(JsonSchemaOptions::default());
        backend
            .register_fragment(
                "#/definitions/Filters",
                fragment(json!({
                    "type": "object",
                    "properties": {
                        "id": { "type": ["string", "null"] },
                        "text": { "type": ["string", "null"], "minLength": 3 }
                    }
                })),
            )
            .unwrap();
        backend
            .register_fragment(
                "#/definitions/Query.search",
                fragment(json!({
                    "type": "object",
                    "properties": {
                        "filters": { "$ref": "#/definitions/Filters" },
                        "limit": { "type": ["integer", "null"] }
                    },
                    "required": ["filters"]
                })),
            )
            .unwrap();
        backend
    }

    #[test]
    fn references_resolve_within_the_bundle() {
        let mut backend = backend();
        let validator = backend.compile("#/definitions/Query.search").unwrap();

        let failures = validator
            .validate(&json!({ "filters": { "text": "ab" } }))
            .unwrap_err();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path, "/filters/text");

        assert!(
            validator
                .validate(&json!({ "filters": { "text": "abc" } }))
                .is_ok()
        );
    }

    #[test]
    fn missing_required_property() {
        let mut backend = backend();
        let validator = backend.compile("#/definitions/Query.search").unwrap();

        let failures = validator.validate(&json!({})).unwrap_err();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path, "");
    }

    #[test]
    fn coerced_value_is_returned() {
        let mut backend = backend();
        let validator = backend.compile("#/definitions/Query.search").unwrap();

        let value = validator
            .validate(&json!({ "filters": { "id": 42 }, "limit": "10" }))
            .unwrap();
        assert_eq!(value, json!({ "filters": { "id": "42" }, "limit": 10 }));
    }

    #[test]
    fn without_coercion() {
        let mut backend = JsonSchemaBackend::new(JsonSchemaOptions {
            coerce_types: false,
            ..Default::default()
        });
        backend
            .register_fragment(
                "#/definitions/Query.message",
                fragment(json!({
                    "type": "object",
                    "properties": { "id": { "type": ["string", "null"] } }
                })),
            )
            .unwrap();
        let validator = backend.compile("#/definitions/Query.message").unwrap();

        assert!(validator.validate(&json!({ "id": 42 })).is_err());
    }

    #[test]
    fn malformed_fragment() {
        let mut backend = backend();

        let error = backend
            .register_fragment(
                "#/definitions/Order",
                fragment(json!({
                    "type": "object",
                    "properties": { "field": { "minLength": "three" } }
                })),
            )
            .unwrap_err();
        assert!(matches!(
            error,
            CompileError::InvalidFragment { ref reference_id, .. }
                if reference_id == "#/definitions/Order"
        ));

        // The rejected unit is not kept, so the others still compile
        assert!(backend.compile("#/definitions/Query.search").is_ok());
        assert!(matches!(
            backend.compile("#/definitions/Order"),
            Err(CompileError::UnknownUnit(_))
        ));
    }

    #[test]
    fn validators_share_the_loaded_units() {
        let mut backend = backend();
        let search = backend.compile("#/definitions/Query.search").unwrap();
        let filters = backend.compile("#/definitions/Filters").unwrap();

        assert!(filters.validate(&json!({ "text": "ab" })).is_err());
        assert!(filters.validate(&json!({ "text": "abc" })).is_ok());
        assert!(search.validate(&json!({ "filters": { "text": "abc" } })).is_ok());
    }

    #[test]
    fn registration_errors() {
        let mut backend = backend();

        assert!(matches!(
            backend.register_fragment("#/definitions/Filters", Map::new()),
            Err(CompileError::DuplicateReference(_))
        ));
        assert!(matches!(
            backend.register_fragment("Filters", Map::new()),
            Err(CompileError::InvalidFragment { .. })
        ));
        assert!(matches!(
            backend.compile("#/definitions/Missing"),
            Err(CompileError::UnknownUnit(_))
        ));
    }

    #[test]
    fn references() {
        assert_eq!(
            Value::Object(JsonSchemaDialect.reference("#/definitions/Filters", true)),
            json!({ "$ref": "#/definitions/Filters" })
        );
        assert_eq!(
            Value::Object(JsonSchemaDialect.reference("#/definitions/Filters", false)),
            json!({ "type": "object", "allOf": [{ "$ref": "#/definitions/Filters" }] })
        );
    }
}
