// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A compact constraint vocabulary with its own checker.
//!
//! Fragments look like `{ "kind": "string", "nullable": true, "minLength": 3 }`. The vocabulary
//! has no way to embed one unit in another, so composite positions use
//! `{ "kind": "ref", "ref": "<unit>" }` and the checker resolves the name through the backend's
//! unit table at validation time.

mod check;
mod shape;

use std::{collections::HashMap, fmt::Debug, sync::Arc};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;
use validation_model::{Fragment, PrimitiveKind};

use self::{check::Checker, shape::Shape};
use super::{CompiledValidator, SchemaBackend, SchemaDialect, ValueFailure, unit_name};
use crate::error::CompileError;

pub struct NativeDialect;

impl SchemaDialect for NativeDialect {
    fn reference_id(
        &self,
        type_name: &str,
        field_name: Option<&str>,
        argument_name: Option<&str>,
    ) -> String {
        unit_name(type_name, field_name, argument_name)
    }

    fn tag_key(&self) -> &'static str {
        "$id"
    }

    fn identity_keys(&self) -> &'static [&'static str] {
        &["$id", "kind", "ref", "nullable"]
    }

    fn reference_key(&self) -> &'static str {
        "ref"
    }

    fn primitive(&self, kind: PrimitiveKind, nullable: bool) -> Fragment {
        let kind = match kind {
            PrimitiveKind::Int => "integer",
            PrimitiveKind::Float => "float",
            PrimitiveKind::String => "string",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Id => "id",
        };

        into_fragment(json!({ "kind": kind, "nullable": nullable }))
    }

    fn enumeration(&self, values: &[String], nullable: bool) -> Fragment {
        into_fragment(json!({ "kind": "string", "nullable": nullable, "enum": values }))
    }

    fn reference(&self, reference_id: &str, nullable: bool) -> Fragment {
        into_fragment(json!({ "kind": "ref", "ref": reference_id, "nullable": nullable }))
    }

    fn array(&self, items: Fragment, nullable: bool) -> Fragment {
        into_fragment(json!({ "kind": "array", "nullable": nullable, "items": items }))
    }

    fn object(&self, properties: IndexMap<String, Fragment>, required: Vec<String>) -> Fragment {
        let properties: Map<String, Value> = properties
            .into_iter()
            .map(|(name, property)| (name, Value::Object(property)))
            .collect();

        into_fragment(json!({
            "kind": "object",
            "nullable": false,
            "properties": properties,
            "required": required,
        }))
    }

    fn has_shape(&self, fragment: &Fragment) -> bool {
        ["kind", "ref", "enum"]
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

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct NativeOptions {
    pub coerce_types: bool,
}

impl Default for NativeOptions {
    fn default() -> Self {
        Self { coerce_types: true }
    }
}

pub struct NativeBackend {
    options: NativeOptions,
    fragments: IndexMap<String, Fragment>,
    /// Parsed units, built on the first compilation after a registration
    table: Option<Arc<HashMap<String, Shape>>>,
}

impl NativeBackend {
    pub fn new(options: NativeOptions) -> Self {
        Self {
            options,
            fragments: IndexMap::new(),
            table: None,
        }
    }

    fn table(&mut self) -> Result<Arc<HashMap<String, Shape>>, CompileError> {
        if let Some(table) = &self.table {
            return Ok(table.clone());
        }

        let table = self
            .fragments
            .iter()
            .map(|(reference_id, fragment)| {
                Shape::parse(fragment)
                    .map(|shape| (reference_id.clone(), shape))
                    .map_err(|message| CompileError::InvalidFragment {
                        reference_id: reference_id.clone(),
                        message,
                    })
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        let table = Arc::new(table);
        self.table = Some(table.clone());
        Ok(table)
    }
}

impl SchemaBackend for NativeBackend {
    fn dialect(&self) -> &'static dyn SchemaDialect {
        &NativeDialect
    }

    fn register_fragment(
        &mut self,
        reference_id: &str,
        fragment: Fragment,
    ) -> Result<(), CompileError> {
        if self.fragments.contains_key(reference_id) {
            return Err(CompileError::DuplicateReference(reference_id.to_string()));
        }

        debug!(reference_id, "Registering native unit");
        self.fragments.insert(reference_id.to_string(), fragment);
        self.table = None;

        Ok(())
    }

    fn compile(&mut self, reference_id: &str) -> Result<Arc<dyn CompiledValidator>, CompileError> {
        if !self.fragments.contains_key(reference_id) {
            return Err(CompileError::UnknownUnit(reference_id.to_string()));
        }

        Ok(Arc::new(NativeValidator {
            reference_id: reference_id.to_string(),
            table: self.table()?,
            coerce_types: self.options.coerce_types,
        }))
    }
}

struct NativeValidator {
    reference_id: String,
    table: Arc<HashMap<String, Shape>>,
    coerce_types: bool,
}

impl Debug for NativeValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeValidator")
            .field("reference_id", &self.reference_id)
            .field("coerce_types", &self.coerce_types)
            .finish()
    }
}

impl CompiledValidator for NativeValidator {
    fn validate(&self, value: &Value) -> Result<Value, Vec<ValueFailure>> {
        let Some(shape) = self.table.get(&self.reference_id) else {
            return Err(vec![ValueFailure {
                path: String::new(),
                message: format!("unknown unit '{}'", self.reference_id),
            }]);
        };

        Checker {
            table: &self.table,
            coerce_types: self.coerce_types,
        }
        .check(shape, value.clone())
    }
}
