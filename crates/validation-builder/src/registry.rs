// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The compiled validators of one schema version.
//!
//! Compilation walks the whole graph once and registers every unit with the backend before
//! compiling any of them, since a unit may refer to an input type declared later in the schema.
//! A registry is never modified after [`Registry::compile`] returns.

use std::{collections::HashSet, sync::Arc};

use indexmap::IndexMap;
use tracing::{debug, instrument};
use validation_model::{
    FieldCoordinate, Fragment, GraphType, OverrideEntry, PositionMetadata, ResolvedOverrides,
    TypeGraph, ValidationFunction,
};

use crate::{
    backend::{CompiledValidator, SchemaBackend, SchemaDialect},
    error::CompileError,
    inference::{InferenceFn, TypeInference},
    synthesizer::SchemaSynthesizer,
};

#[derive(Debug, Clone)]
pub struct CompiledUnit {
    pub reference_id: String,
    pub fragment: Fragment,
    pub validator: Arc<dyn CompiledValidator>,
}

/// A validation function and the argument it checks
#[derive(Debug, Clone)]
pub struct ArgumentFunction {
    pub metadata: PositionMetadata,
    pub function: ValidationFunction,
}

/// Validator of the arguments of one field
#[derive(Debug, Clone)]
pub struct FieldValidator {
    pub coordinate: FieldCoordinate,
    pub reference_id: String,
    /// Checks the argument object; arguments validated by a function have no property in it
    pub validator: Arc<dyn CompiledValidator>,
    pub functions: Vec<ArgumentFunction>,
}

#[derive(Debug, Default)]
pub struct Registry {
    generation: u64,
    units: IndexMap<String, CompiledUnit>,
    fields: IndexMap<FieldCoordinate, FieldValidator>,
}

struct PendingField {
    coordinate: FieldCoordinate,
    reference_id: String,
    functions: Vec<ArgumentFunction>,
}

/// Units collected by the graph walk, not yet handed to the backend
struct CompilationPass<'a> {
    dialect: &'static dyn SchemaDialect,
    synthesizer: SchemaSynthesizer<'a>,
    overrides: &'a ResolvedOverrides,
    units: IndexMap<String, Fragment>,
    fields: Vec<PendingField>,
}

impl Registry {
    #[instrument(name = "Registry::compile", skip_all)]
    pub fn compile(
        graph: &TypeGraph,
        overrides: &ResolvedOverrides,
        custom_inference: Option<&InferenceFn>,
        mut backend: Box<dyn SchemaBackend>,
    ) -> Result<Self, CompileError> {
        let dialect = backend.dialect();
        let inference = TypeInference::new(dialect, custom_inference, graph.enumerations());

        let mut pass = CompilationPass {
            dialect,
            synthesizer: SchemaSynthesizer::new(dialect, &inference),
            overrides,
            units: IndexMap::new(),
            fields: vec![],
        };

        for graph_type in graph.types().filter(|t| !t.is_meta()) {
            if graph_type.is_input_object() {
                pass.add_input_type(graph_type)?;
            } else if graph_type.is_output_object() {
                pass.add_field_units(graph_type)?;
            }
        }

        pass.check_references()?;

        for (reference_id, fragment) in &pass.units {
            backend.register_fragment(reference_id, fragment.clone())?;
        }

        let mut units = IndexMap::new();
        for (reference_id, fragment) in pass.units {
            let validator = backend.compile(&reference_id)?;
            units.insert(
                reference_id.clone(),
                CompiledUnit {
                    reference_id,
                    fragment,
                    validator,
                },
            );
        }

        let fields = pass
            .fields
            .into_iter()
            .map(|field| {
                let validator = units
                    .get(&field.reference_id)
                    .map(|unit| unit.validator.clone())
                    .ok_or_else(|| CompileError::UnknownUnit(field.reference_id.clone()))?;

                Ok((
                    field.coordinate.clone(),
                    FieldValidator {
                        coordinate: field.coordinate,
                        reference_id: field.reference_id,
                        validator,
                        functions: field.functions,
                    },
                ))
            })
            .collect::<Result<IndexMap<_, _>, CompileError>>()?;

        debug!(
            units = units.len(),
            fields = fields.len(),
            "Compiled validation registry"
        );

        Ok(Self {
            generation: 0,
            units,
            fields,
        })
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Version of the schema this registry was compiled for, as assigned by its installer
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn unit(&self, reference_id: &str) -> Option<&CompiledUnit> {
        self.units.get(reference_id)
    }

    pub fn units(&self) -> impl Iterator<Item = &CompiledUnit> {
        self.units.values()
    }

    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldValidator> {
        self.fields
            .get(&FieldCoordinate::new(type_name, field_name))
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldValidator> {
        self.fields.values()
    }

    pub fn is_intercepted(&self, type_name: &str, field_name: &str) -> bool {
        self.field(type_name, field_name).is_some()
    }
}

impl CompilationPass<'_> {
    fn register(&mut self, reference_id: String, fragment: Fragment) -> Result<(), CompileError> {
        if self.units.contains_key(&reference_id) {
            return Err(CompileError::DuplicateReference(reference_id));
        }
        self.units.insert(reference_id, fragment);
        Ok(())
    }

    /// One argument-object unit per field that takes arguments
    fn add_field_units(&mut self, graph_type: &GraphType) -> Result<(), CompileError> {
        let type_name = &graph_type.name;

        for field in graph_type.fields.iter().filter(|f| !f.arguments.is_empty()) {
            let field_id = self
                .dialect
                .reference_id(type_name, Some(&field.name), None);

            let mut properties = IndexMap::new();
            let mut required = vec![];
            let mut functions = vec![];

            for argument in &field.arguments {
                let argument_id = self.dialect.reference_id(
                    type_name,
                    Some(&field.name),
                    Some(&argument.name),
                );

                let fragment = match self
                    .overrides
                    .argument(type_name, &field.name, &argument.name)
                {
                    Some(OverrideEntry::Function(function)) => {
                        functions.push(ArgumentFunction {
                            metadata: PositionMetadata {
                                type_name: type_name.clone(),
                                field_name: field.name.clone(),
                                argument_name: argument.name.clone(),
                                position: argument.position.clone(),
                            },
                            function: function.clone(),
                        });
                        // The function only sees arguments that are present
                        if argument.position.is_non_null {
                            required.push(argument.name.clone());
                        }
                        continue;
                    }
                    Some(OverrideEntry::Fragment(override_fragment)) => self
                        .synthesizer
                        .synthesize(&argument.position, Some(override_fragment), &argument_id),
                    None => {
                        let fragment =
                            self.synthesizer
                                .synthesize(&argument.position, None, &argument_id);

                        if !self.dialect.has_shape(&fragment) {
                            debug!(
                                argument = %argument_id,
                                position = %argument.position,
                                "Omitting argument without a known shape"
                            );
                            continue;
                        }
                        fragment
                    }
                };

                if argument.position.is_non_null {
                    required.push(argument.name.clone());
                }
                properties.insert(argument.name.clone(), fragment);
            }

            let mut unit = self.dialect.object(properties, required);
            self.dialect.tag(&mut unit, &field_id);
            self.register(field_id.clone(), unit)?;

            self.fields.push(PendingField {
                coordinate: FieldCoordinate::new(type_name, &field.name),
                reference_id: field_id,
                functions,
            });
        }

        Ok(())
    }

    /// A unit per field with a known shape, then the type-level unit holding them all
    fn add_input_type(&mut self, graph_type: &GraphType) -> Result<(), CompileError> {
        let type_name = &graph_type.name;

        let mut properties = IndexMap::new();
        let mut required = vec![];

        for field in &graph_type.fields {
            let field_id = self
                .dialect
                .reference_id(type_name, Some(&field.name), None);
            let override_fragment = self.overrides.input_field(type_name, &field.name);

            let fragment =
                self.synthesizer
                    .synthesize(&field.position, override_fragment, &field_id);

            if !self.dialect.has_shape(&fragment) {
                if override_fragment.is_some() {
                    return Err(CompileError::UntypedField {
                        type_name: type_name.clone(),
                        field_name: field.name.clone(),
                    });
                }
                debug!(
                    field = %field_id,
                    position = %field.position,
                    "Omitting input field without a known shape"
                );
                continue;
            }

            self.register(field_id, fragment.clone())?;

            if field.position.is_non_null {
                required.push(field.name.clone());
            }
            properties.insert(field.name.clone(), fragment);
        }

        let type_id = self.dialect.reference_id(type_name, None, None);
        let mut unit = self.dialect.type_unit(properties, required);
        if let Some(type_fragment) = self.overrides.type_fragment(type_name) {
            self.synthesizer.merge(&mut unit, type_fragment, &[]);
        }
        self.dialect.tag(&mut unit, &type_id);

        self.register(type_id, unit)
    }

    fn check_references(&self) -> Result<(), CompileError> {
        let known: HashSet<&str> = self.units.keys().map(String::as_str).collect();

        for (reference_id, fragment) in &self.units {
            if let Some(reference) = self
                .dialect
                .references(fragment)
                .into_iter()
                .find(|reference| !known.contains(reference.as_str()))
            {
                return Err(CompileError::UnresolvedReference {
                    from: reference_id.clone(),
                    reference,
                });
            }
        }

        Ok(())
    }
}
