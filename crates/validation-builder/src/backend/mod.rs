// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Schema dialects and the backends that compile them.
//!
//! A [`SchemaDialect`] knows how to spell shapes (primitive, array, object, reference) in one
//! schema language and how to name units. A [`SchemaBackend`] takes the fragments written in that
//! dialect, keyed by reference id, and compiles each into a [`CompiledValidator`]. The backend is
//! chosen once, through [`BackendKind`].

pub mod json_schema;
pub mod native;

use std::{fmt::Debug, sync::Arc};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validation_model::{ConfigurationError, Fragment, PrimitiveKind};

use crate::error::CompileError;

pub trait SchemaDialect: Send + Sync {
    /// Stable name of the unit for a type, one of its fields, or one of a field's arguments
    fn reference_id(
        &self,
        type_name: &str,
        field_name: Option<&str>,
        argument_name: Option<&str>,
    ) -> String;

    /// Key under which a fragment carries its own reference id
    fn tag_key(&self) -> &'static str;

    /// Keys an override may not replace once the synthesized fragment has them
    fn identity_keys(&self) -> &'static [&'static str];

    /// Key that holds a reference to another unit
    fn reference_key(&self) -> &'static str;

    fn primitive(&self, kind: PrimitiveKind, nullable: bool) -> Fragment;

    fn enumeration(&self, values: &[String], nullable: bool) -> Fragment;

    fn reference(&self, reference_id: &str, nullable: bool) -> Fragment;

    fn array(&self, items: Fragment, nullable: bool) -> Fragment;

    /// A non-null object with the given properties
    fn object(&self, properties: IndexMap<String, Fragment>, required: Vec<String>) -> Fragment;

    /// The unit of an input object type, the target of references to the type
    fn type_unit(&self, properties: IndexMap<String, Fragment>, required: Vec<String>) -> Fragment {
        self.object(properties, required)
    }

    /// Whether the fragment describes a concrete kind of value (as opposed to constraints only)
    fn has_shape(&self, fragment: &Fragment) -> bool;

    fn tag(&self, fragment: &mut Fragment, reference_id: &str) {
        fragment.insert(
            self.tag_key().to_string(),
            Value::String(reference_id.to_string()),
        );
    }

    /// Every reference in the fragment, nested ones included
    fn references(&self, fragment: &Fragment) -> Vec<String> {
        let mut references = vec![];
        collect_references(self.reference_key(), fragment, &mut references);
        references
    }
}

/// `Type`, `Type.field` or `Type.field.argument`
pub(crate) fn unit_name(
    type_name: &str,
    field_name: Option<&str>,
    argument_name: Option<&str>,
) -> String {
    [Some(type_name), field_name, argument_name]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(".")
}

fn collect_references(key: &str, fragment: &Fragment, references: &mut Vec<String>) {
    for (name, value) in fragment {
        match value {
            Value::String(target) if name == key => references.push(target.clone()),
            value => collect_nested_references(key, value, references),
        }
    }
}

fn collect_nested_references(key: &str, value: &Value, references: &mut Vec<String>) {
    match value {
        Value::Object(fragment) => collect_references(key, fragment, references),
        Value::Array(values) => values
            .iter()
            .for_each(|value| collect_nested_references(key, value, references)),
        _ => {}
    }
}

pub trait SchemaBackend: Send {
    fn dialect(&self) -> &'static dyn SchemaDialect;

    fn register_fragment(&mut self, reference_id: &str, fragment: Fragment)
    -> Result<(), CompileError>;

    /// Compile a registered unit. Every unit it refers to must already be registered.
    fn compile(&mut self, reference_id: &str) -> Result<Arc<dyn CompiledValidator>, CompileError>;
}

pub trait CompiledValidator: Send + Sync + Debug {
    /// Check the value, returning it (coerced, if the backend coerces) or every failure found
    fn validate(&self, value: &Value) -> Result<Value, Vec<ValueFailure>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueFailure {
    /// JSON pointer into the validated value (empty for the value itself)
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// JSON Schema, with references between units
    #[default]
    JsonSchema,
    /// The in-house constraint vocabulary
    Native,
}

impl BackendKind {
    pub fn dialect(&self) -> &'static dyn SchemaDialect {
        match self {
            BackendKind::JsonSchema => &json_schema::JsonSchemaDialect,
            BackendKind::Native => &native::NativeDialect,
        }
    }

    /// A fresh backend, with `options` in the backend's own format (`null` for defaults)
    pub fn backend(&self, options: &Value) -> Result<Box<dyn SchemaBackend>, ConfigurationError> {
        let backend: Box<dyn SchemaBackend> = match self {
            BackendKind::JsonSchema => Box::new(json_schema::JsonSchemaBackend::new(
                parse_options(options)?,
            )),
            BackendKind::Native => Box::new(native::NativeBackend::new(parse_options(options)?)),
        };

        Ok(backend)
    }
}

fn parse_options<T: Default + for<'de> Deserialize<'de>>(
    options: &Value,
) -> Result<T, ConfigurationError> {
    match options {
        Value::Null => Ok(T::default()),
        options => {
            serde_json::from_value(options.clone()).map_err(ConfigurationError::BackendOptions)
        }
    }
}
