// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! User-declared validation overrides.
//!
//! An [`OverrideStore`] is what the user hands over: per type, per field, either a schema fragment
//! (input object fields) or per-argument entries (fields of object and interface types), plus an
//! optional type-level fragment for whole input objects. Since the JSON form of the store cannot
//! tell the two field shapes apart on its own, [`OverrideStore::validate`] resolves it against the
//! type graph into a [`ResolvedOverrides`], which is what the registry reads.

use std::{fmt::Debug, sync::Arc};

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::{
    context::{RequestContext, ResolveInfo},
    error::ConfigurationError,
    type_graph::{GraphField, GraphType, TypeGraph},
    typed_position::TypedPosition,
};

/// A backend-specific partial schema document
pub type Fragment = Map<String, Value>;

/// Key of the type-level fragment in the JSON form of the overrides
pub const TYPE_FRAGMENT_KEY: &str = "$type";

/// The argument a validation function is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionMetadata {
    pub type_name: String,
    pub field_name: String,
    pub argument_name: String,
    pub position: TypedPosition,
}

/// Everything a validation function gets to see
pub struct FunctionInput<'a> {
    pub metadata: &'a PositionMetadata,
    pub value: &'a Value,
    /// All arguments of the call, the validated one included
    pub arguments: &'a Map<String, Value>,
    pub request_context: &'a RequestContext,
    pub info: &'a ResolveInfo,
}

/// Rejection signalled by a validation function. Reported to the caller as is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationFunctionError {
    pub message: String,
    /// JSON pointer relative to the argument value, if the function wants to point inside it
    pub path: Option<String>,
}

impl ValidationFunctionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }

    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

type ValidationFn =
    dyn Fn(&FunctionInput<'_>) -> Result<(), ValidationFunctionError> + Send + Sync;

/// Imperative validation of a single argument
#[derive(Clone)]
pub struct ValidationFunction(Arc<ValidationFn>);

impl ValidationFunction {
    pub fn new(
        function: impl Fn(&FunctionInput<'_>) -> Result<(), ValidationFunctionError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self(Arc::new(function))
    }

    pub fn call(&self, input: &FunctionInput<'_>) -> Result<(), ValidationFunctionError> {
        (self.0)(input)
    }
}

impl Debug for ValidationFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ValidationFunction")
    }
}

#[derive(Debug, Clone)]
pub enum OverrideEntry {
    Fragment(Fragment),
    Function(ValidationFunction),
}

impl OverrideEntry {
    pub fn as_fragment(&self) -> Option<&Fragment> {
        match self {
            OverrideEntry::Fragment(fragment) => Some(fragment),
            OverrideEntry::Function(_) => None,
        }
    }

    pub fn as_function(&self) -> Option<&ValidationFunction> {
        match self {
            OverrideEntry::Function(function) => Some(function),
            OverrideEntry::Fragment(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
enum DeclaredEntry {
    Value(Value),
    Function(ValidationFunction),
}

#[derive(Debug, Clone)]
enum DeclaredField {
    /// Either a fragment (input object field) or an argument-name-to-fragment object
    Value(Value),
    Arguments(IndexMap<String, DeclaredEntry>),
}

#[derive(Debug, Clone, Default)]
struct DeclaredType {
    type_fragment: Option<Value>,
    fields: IndexMap<String, DeclaredField>,
}

/// The validation map as declared by the user
#[derive(Debug, Clone, Default)]
pub struct OverrideStore {
    types: IndexMap<String, DeclaredType>,
}

impl OverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the JSON form: `{ "<Type>": { "$type": {..}, "<field>": {..} } }`.
    ///
    /// For an input object, a field's value is the field's fragment. For an object or interface
    /// type, a field's value maps argument names to fragments (or `null`).
    pub fn from_json(value: Value) -> Result<Self, ConfigurationError> {
        let mut store = Self::new();

        for (type_name, fields) in expect_object(value, "overrides")? {
            let declared = store.types.entry(type_name.clone()).or_default();

            for (field_name, field_value) in expect_object(fields, &type_name)? {
                if field_name == TYPE_FRAGMENT_KEY {
                    declared.type_fragment = Some(field_value);
                } else {
                    declared
                        .fields
                        .insert(field_name, DeclaredField::Value(field_value));
                }
            }
        }

        Ok(store)
    }

    pub fn input_type(mut self, type_name: &str, fragment: Value) -> Self {
        self.declared_type(type_name).type_fragment = Some(fragment);
        self
    }

    pub fn input_field(mut self, type_name: &str, field_name: &str, fragment: Value) -> Self {
        self.declared_type(type_name)
            .fields
            .insert(field_name.to_string(), DeclaredField::Value(fragment));
        self
    }

    pub fn argument(
        self,
        type_name: &str,
        field_name: &str,
        argument_name: &str,
        fragment: Value,
    ) -> Self {
        self.declare_argument(
            type_name,
            field_name,
            argument_name,
            DeclaredEntry::Value(fragment),
        )
    }

    pub fn argument_function(
        self,
        type_name: &str,
        field_name: &str,
        argument_name: &str,
        function: ValidationFunction,
    ) -> Self {
        self.declare_argument(
            type_name,
            field_name,
            argument_name,
            DeclaredEntry::Function(function),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn declared_type(&mut self, type_name: &str) -> &mut DeclaredType {
        self.types.entry(type_name.to_string()).or_default()
    }

    fn declare_argument(
        mut self,
        type_name: &str,
        field_name: &str,
        argument_name: &str,
        entry: DeclaredEntry,
    ) -> Self {
        let field = self
            .declared_type(type_name)
            .fields
            .entry(field_name.to_string())
            .or_insert_with(|| DeclaredField::Arguments(IndexMap::new()));

        // A JSON-declared argument map is folded into the programmatic form
        if let DeclaredField::Value(Value::Object(arguments)) = field {
            let arguments = std::mem::take(arguments)
                .into_iter()
                .map(|(name, value)| (name, DeclaredEntry::Value(value)))
                .collect();
            *field = DeclaredField::Arguments(arguments);
        }

        match field {
            DeclaredField::Arguments(arguments) => {
                arguments.insert(argument_name.to_string(), entry);
            }
            DeclaredField::Value(_) => {
                let mut arguments = IndexMap::new();
                arguments.insert(argument_name.to_string(), entry);
                *field = DeclaredField::Arguments(arguments);
            }
        }

        self
    }

    /// Check every entry against the graph and normalize the store.
    ///
    /// This runs before any validator is synthesized; any inconsistency aborts the load.
    pub fn validate(&self, graph: &TypeGraph) -> Result<ResolvedOverrides, ConfigurationError> {
        let mut resolved = ResolvedOverrides::default();

        for (type_name, declared) in &self.types {
            let graph_type = graph
                .get(type_name)
                .ok_or_else(|| ConfigurationError::UnknownType(type_name.clone()))?;

            let type_overrides = if graph_type.is_input_object() {
                resolve_input_type(graph_type, declared)?
            } else if graph_type.is_output_object() {
                resolve_output_type(graph_type, declared)?
            } else {
                return Err(ConfigurationError::NotValidatable(type_name.clone()));
            };

            resolved.types.insert(type_name.clone(), type_overrides);
        }

        debug!(types = resolved.types.len(), "Validated overrides");
        Ok(resolved)
    }
}

fn resolve_input_type(
    graph_type: &GraphType,
    declared: &DeclaredType,
) -> Result<TypeOverrides, ConfigurationError> {
    let type_name = &graph_type.name;
    let mut overrides = TypeOverrides {
        type_fragment: declared
            .type_fragment
            .clone()
            .map(|value| expect_fragment(value, &format!("{type_name}.{TYPE_FRAGMENT_KEY}")))
            .transpose()?
            .flatten(),
        ..Default::default()
    };

    for (field_name, declared_field) in &declared.fields {
        graph_field(graph_type, field_name)?;

        match declared_field {
            DeclaredField::Value(value) => {
                let location = format!("{type_name}.{field_name}");
                if let Some(fragment) = expect_fragment(value.clone(), &location)? {
                    overrides
                        .input_fields
                        .insert(field_name.clone(), fragment);
                }
            }
            DeclaredField::Arguments(arguments) => {
                let has_function = arguments
                    .values()
                    .any(|entry| matches!(entry, DeclaredEntry::Function(_)));

                return Err(if has_function {
                    ConfigurationError::FunctionOnInputField {
                        type_name: type_name.clone(),
                        field_name: field_name.clone(),
                    }
                } else {
                    ConfigurationError::ArgumentsOnInputField {
                        type_name: type_name.clone(),
                        field_name: field_name.clone(),
                    }
                });
            }
        }
    }

    Ok(overrides)
}

fn resolve_output_type(
    graph_type: &GraphType,
    declared: &DeclaredType,
) -> Result<TypeOverrides, ConfigurationError> {
    let type_name = &graph_type.name;

    if declared.type_fragment.is_some() {
        return Err(ConfigurationError::TypeFragmentOnNonInputType(
            type_name.clone(),
        ));
    }

    let mut overrides = TypeOverrides::default();

    for (field_name, declared_field) in &declared.fields {
        let field = graph_field(graph_type, field_name)?;
        let location = format!("{type_name}.{field_name}");

        let entries: Vec<(String, DeclaredEntry)> = match declared_field {
            DeclaredField::Value(Value::Null) => continue,
            DeclaredField::Value(value) => expect_object(value.clone(), &location)?
                .into_iter()
                .map(|(name, value)| (name, DeclaredEntry::Value(value)))
                .collect(),
            DeclaredField::Arguments(arguments) => arguments
                .iter()
                .map(|(name, entry)| (name.clone(), entry.clone()))
                .collect(),
        };

        let mut field_overrides = IndexMap::new();

        for (argument_name, entry) in entries {
            if field.argument(&argument_name).is_none() {
                return Err(ConfigurationError::UnknownArgument {
                    type_name: type_name.clone(),
                    field_name: field_name.clone(),
                    argument_name,
                });
            }

            let entry = match entry {
                DeclaredEntry::Function(function) => Some(OverrideEntry::Function(function)),
                DeclaredEntry::Value(value) => {
                    expect_fragment(value, &format!("{location}.{argument_name}"))?
                        .map(OverrideEntry::Fragment)
                }
            };

            if let Some(entry) = entry {
                field_overrides.insert(argument_name, entry);
            }
        }

        overrides
            .arguments
            .insert(field_name.clone(), field_overrides);
    }

    Ok(overrides)
}

fn graph_field<'a>(
    graph_type: &'a GraphType,
    field_name: &str,
) -> Result<&'a GraphField, ConfigurationError> {
    graph_type
        .field(field_name)
        .ok_or_else(|| ConfigurationError::UnknownField {
            type_name: graph_type.name.clone(),
            field_name: field_name.to_string(),
        })
}

fn expect_object(value: Value, location: &str) -> Result<Map<String, Value>, ConfigurationError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ConfigurationError::NotAnObject {
            location: location.to_string(),
            found: json_kind(&other).to_string(),
        }),
    }
}

/// `null` means "no override"
fn expect_fragment(value: Value, location: &str) -> Result<Option<Fragment>, ConfigurationError> {
    match value {
        Value::Null => Ok(None),
        value => expect_object(value, location).map(Some),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeOverrides {
    pub type_fragment: Option<Fragment>,
    pub input_fields: IndexMap<String, Fragment>,
    pub arguments: IndexMap<String, IndexMap<String, OverrideEntry>>,
}

/// Overrides checked against a type graph, addressed by position
#[derive(Debug, Clone, Default)]
pub struct ResolvedOverrides {
    types: IndexMap<String, TypeOverrides>,
}

impl ResolvedOverrides {
    pub fn type_fragment(&self, type_name: &str) -> Option<&Fragment> {
        self.types.get(type_name)?.type_fragment.as_ref()
    }

    pub fn input_field(&self, type_name: &str, field_name: &str) -> Option<&Fragment> {
        self.types.get(type_name)?.input_fields.get(field_name)
    }

    pub fn argument(
        &self,
        type_name: &str,
        field_name: &str,
        argument_name: &str,
    ) -> Option<&OverrideEntry> {
        self.types
            .get(type_name)?
            .arguments
            .get(field_name)?
            .get(argument_name)
    }

    pub fn set_type_fragment(&mut self, type_name: &str, fragment: Fragment) {
        self.types
            .entry(type_name.to_string())
            .or_default()
            .type_fragment = Some(fragment);
    }

    pub fn set_input_field(&mut self, type_name: &str, field_name: &str, fragment: Fragment) {
        self.types
            .entry(type_name.to_string())
            .or_default()
            .input_fields
            .insert(field_name.to_string(), fragment);
    }

    pub fn set_argument(
        &mut self,
        type_name: &str,
        field_name: &str,
        argument_name: &str,
        entry: OverrideEntry,
    ) {
        self.types
            .entry(type_name.to_string())
            .or_default()
            .arguments
            .entry(field_name.to_string())
            .or_default()
            .insert(argument_name.to_string(), entry);
    }

    /// Lay `self` over `derived`: for every position present in both, the entry from `self` wins
    /// as a whole (entries are never merged key by key).
    pub fn merged_over(self, mut derived: ResolvedOverrides) -> ResolvedOverrides {
        for (type_name, overrides) in self.types {
            if let Some(fragment) = overrides.type_fragment {
                derived.set_type_fragment(&type_name, fragment);
            }
            for (field_name, fragment) in overrides.input_fields {
                derived.set_input_field(&type_name, &field_name, fragment);
            }
            for (field_name, arguments) in overrides.arguments {
                for (argument_name, entry) in arguments {
                    derived.set_argument(&type_name, &field_name, &argument_name, entry);
                }
            }
        }

        derived
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fragment(value: Value) -> Fragment {
        value.as_object().unwrap().clone()
    }

    fn graph() -> TypeGraph {
        TypeGraph::parse(
            r#"
            type Query {
                message(id: ID, limit: Int): String
            }

            input Filters {
                id: ID
                text: String
            }

            enum Order { ASC DESC }
            "#,
        )
        .unwrap()
    }

    #[test]
    fn json_form_is_resolved_against_the_graph() {
        let store = OverrideStore::from_json(json!({
            "Filters": { "$type": { "additionalProperties": false }, "text": { "minLength": 3 } },
            "Query": { "message": { "id": { "maxLength": 10 }, "limit": null } }
        }))
        .unwrap();

        let resolved = store.validate(&graph()).unwrap();

        assert_eq!(
            resolved.input_field("Filters", "text"),
            json!({ "minLength": 3 }).as_object()
        );
        assert_eq!(
            resolved.type_fragment("Filters"),
            json!({ "additionalProperties": false }).as_object()
        );
        assert_eq!(
            resolved
                .argument("Query", "message", "id")
                .and_then(OverrideEntry::as_fragment),
            json!({ "maxLength": 10 }).as_object()
        );
        assert!(resolved.argument("Query", "message", "limit").is_none());
    }

    #[test]
    fn builder_and_json_forms_combine() {
        let store = OverrideStore::from_json(json!({
            "Query": { "message": { "id": { "maxLength": 10 } } }
        }))
        .unwrap()
        .argument_function(
            "Query",
            "message",
            "limit",
            ValidationFunction::new(|_| Ok(())),
        );

        let resolved = store.validate(&graph()).unwrap();

        assert!(
            resolved
                .argument("Query", "message", "id")
                .and_then(OverrideEntry::as_fragment)
                .is_some()
        );
        assert!(
            resolved
                .argument("Query", "message", "limit")
                .and_then(OverrideEntry::as_function)
                .is_some()
        );
    }

    #[test]
    fn type_fragment_on_object_type() {
        let store = OverrideStore::new().input_type("Query", json!({ "minProperties": 1 }));

        let error = store.validate(&graph()).unwrap_err();
        insta::assert_snapshot!(
            error,
            @"Type-level validation fragment supplied for 'Query', which is not an input object type"
        );
    }

    #[test]
    fn unknown_positions() {
        let graph = graph();

        assert!(matches!(
            OverrideStore::new()
                .input_field("Missing", "text", json!({}))
                .validate(&graph),
            Err(ConfigurationError::UnknownType(_))
        ));
        assert!(matches!(
            OverrideStore::new()
                .input_field("Filters", "missing", json!({}))
                .validate(&graph),
            Err(ConfigurationError::UnknownField { .. })
        ));
        assert!(matches!(
            OverrideStore::new()
                .argument("Query", "message", "missing", json!({}))
                .validate(&graph),
            Err(ConfigurationError::UnknownArgument { .. })
        ));
        assert!(matches!(
            OverrideStore::new()
                .input_field("Order", "ASC", json!({}))
                .validate(&graph),
            Err(ConfigurationError::NotValidatable(_))
        ));
    }

    #[test]
    fn functions_are_argument_only() {
        let store = OverrideStore::new().argument_function(
            "Filters",
            "text",
            "value",
            ValidationFunction::new(|_| Ok(())),
        );

        assert!(matches!(
            store.validate(&graph()),
            Err(ConfigurationError::FunctionOnInputField { .. })
        ));
    }

    #[test]
    fn fragments_must_be_objects() {
        let store = OverrideStore::new().input_field("Filters", "text", json!(3));

        let error = store.validate(&graph()).unwrap_err();
        insta::assert_snapshot!(
            error,
            @"Validation override at 'Filters.text' must be an object, found a number"
        );
    }

    #[test]
    fn explicit_entries_win_over_derived() {
        let mut derived = ResolvedOverrides::default();
        derived.set_input_field("Filters", "text", fragment(json!({ "minLength": 1 })));
        derived.set_input_field("Filters", "id", fragment(json!({ "maxLength": 5 })));

        let mut explicit = ResolvedOverrides::default();
        explicit.set_input_field("Filters", "text", fragment(json!({ "maxLength": 2 })));

        let merged = explicit.merged_over(derived);

        assert_eq!(
            merged.input_field("Filters", "text"),
            json!({ "maxLength": 2 }).as_object()
        );
        assert_eq!(
            merged.input_field("Filters", "id"),
            json!({ "maxLength": 5 }).as_object()
        );
    }
}
