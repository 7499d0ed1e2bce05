// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Uniform, read-only view over a GraphQL schema.
//!
//! The schema is parsed from SDL with `async-graphql-parser`. Type extensions are folded into the
//! type they extend, so every named type appears once, with its fields in declaration order.

use std::collections::HashMap;

use async_graphql_parser::{
    parse_schema,
    types::{
        BaseType, ConstDirective, FieldDefinition, InputValueDefinition, ServiceDocument, Type,
        TypeDefinition, TypeKind, TypeSystemDefinition,
    },
};
use indexmap::IndexMap;

use crate::{
    error::GraphLoadingError,
    typed_position::{LeafKind, PrimitiveKind, TypedPosition},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphTypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl GraphTypeKind {
    fn of(kind: &TypeKind) -> Self {
        match kind {
            TypeKind::Scalar => GraphTypeKind::Scalar,
            TypeKind::Object(_) => GraphTypeKind::Object,
            TypeKind::Interface(_) => GraphTypeKind::Interface,
            TypeKind::Union(_) => GraphTypeKind::Union,
            TypeKind::Enum(_) => GraphTypeKind::Enum,
            TypeKind::InputObject(_) => GraphTypeKind::InputObject,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphType {
    pub name: String,
    pub kind: GraphTypeKind,
    pub fields: Vec<GraphField>,
    pub directives: Vec<ConstDirective>,
    pub enum_values: Vec<String>,
}

impl GraphType {
    fn new(name: &str, kind: GraphTypeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            fields: vec![],
            directives: vec![],
            enum_values: vec![],
        }
    }

    /// Introspection types (`__Schema`, `__Type`, ...)
    pub fn is_meta(&self) -> bool {
        self.name.starts_with("__")
    }

    pub fn is_input_object(&self) -> bool {
        self.kind == GraphTypeKind::InputObject
    }

    /// Object and interface types: the types whose fields take arguments
    pub fn is_output_object(&self) -> bool {
        matches!(self.kind, GraphTypeKind::Object | GraphTypeKind::Interface)
    }

    pub fn field(&self, name: &str) -> Option<&GraphField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// A field of an object, interface or input object type
#[derive(Debug, Clone)]
pub struct GraphField {
    pub name: String,
    pub position: TypedPosition,
    /// Always empty for input object fields
    pub arguments: Vec<GraphArgument>,
    pub directives: Vec<ConstDirective>,
}

impl GraphField {
    pub fn argument(&self, name: &str) -> Option<&GraphArgument> {
        self.arguments.iter().find(|argument| argument.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct GraphArgument {
    pub name: String,
    pub position: TypedPosition,
    pub directives: Vec<ConstDirective>,
}

#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    types: IndexMap<String, GraphType>,
}

impl TypeGraph {
    pub fn parse(sdl: &str) -> Result<Self, GraphLoadingError> {
        let document = parse_schema(sdl).map_err(|e| GraphLoadingError::Parse(e.to_string()))?;

        Ok(Self::from_document(&document))
    }

    pub fn from_document(document: &ServiceDocument) -> Self {
        let definitions: Vec<&TypeDefinition> = document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                TypeSystemDefinition::Type(type_definition) => Some(&type_definition.node),
                _ => None,
            })
            .collect();

        // Positions are classified by the kind of their leaf, so collect kinds before building
        // any position (a field may refer to a type declared later in the document).
        let mut kinds: HashMap<&str, GraphTypeKind> = HashMap::new();
        for definition in &definitions {
            kinds
                .entry(definition.name.node.as_str())
                .or_insert_with(|| GraphTypeKind::of(&definition.kind));
        }

        let mut types: IndexMap<String, GraphType> = IndexMap::new();

        for definition in definitions {
            let name = definition.name.node.as_str();
            let graph_type = types
                .entry(name.to_string())
                .or_insert_with(|| GraphType::new(name, GraphTypeKind::of(&definition.kind)));

            graph_type
                .directives
                .extend(definition.directives.iter().map(|d| d.node.clone()));

            match &definition.kind {
                TypeKind::Object(object) => graph_type.fields.extend(
                    object
                        .fields
                        .iter()
                        .map(|field| output_field(&field.node, &kinds)),
                ),
                TypeKind::Interface(interface) => graph_type.fields.extend(
                    interface
                        .fields
                        .iter()
                        .map(|field| output_field(&field.node, &kinds)),
                ),
                TypeKind::InputObject(input_object) => graph_type.fields.extend(
                    input_object
                        .fields
                        .iter()
                        .map(|field| input_field(&field.node, &kinds)),
                ),
                TypeKind::Enum(enum_type) => graph_type.enum_values.extend(
                    enum_type
                        .values
                        .iter()
                        .map(|value| value.node.value.node.to_string()),
                ),
                TypeKind::Scalar | TypeKind::Union(_) => {}
            }
        }

        Self { types }
    }

    /// All named types, in declaration order (introspection types included, if declared)
    pub fn types(&self) -> impl Iterator<Item = &GraphType> {
        self.types.values()
    }

    pub fn get(&self, name: &str) -> Option<&GraphType> {
        self.types.get(name)
    }

    pub fn is_input_object(&self, name: &str) -> bool {
        self.get(name).is_some_and(GraphType::is_input_object)
    }

    /// Values of every enum type, keyed by the enum's name
    pub fn enumerations(&self) -> HashMap<String, Vec<String>> {
        self.types
            .values()
            .filter(|graph_type| graph_type.kind == GraphTypeKind::Enum)
            .map(|graph_type| (graph_type.name.clone(), graph_type.enum_values.clone()))
            .collect()
    }
}

fn output_field(field: &FieldDefinition, kinds: &HashMap<&str, GraphTypeKind>) -> GraphField {
    GraphField {
        name: field.name.node.to_string(),
        position: typed_position(&field.ty.node, kinds),
        arguments: field
            .arguments
            .iter()
            .map(|argument| GraphArgument {
                name: argument.node.name.node.to_string(),
                position: typed_position(&argument.node.ty.node, kinds),
                directives: argument.node.directives.iter().map(|d| d.node.clone()).collect(),
            })
            .collect(),
        directives: field.directives.iter().map(|d| d.node.clone()).collect(),
    }
}

fn input_field(field: &InputValueDefinition, kinds: &HashMap<&str, GraphTypeKind>) -> GraphField {
    GraphField {
        name: field.name.node.to_string(),
        position: typed_position(&field.ty.node, kinds),
        arguments: vec![],
        directives: field.directives.iter().map(|d| d.node.clone()).collect(),
    }
}

fn typed_position(typ: &Type, kinds: &HashMap<&str, GraphTypeKind>) -> TypedPosition {
    match &typ.base {
        BaseType::Named(name) => {
            TypedPosition::named(name.as_str(), leaf_kind(name, kinds), !typ.nullable)
        }
        BaseType::List(item) => TypedPosition::list_of(typed_position(item, kinds), !typ.nullable),
    }
}

fn leaf_kind(name: &str, kinds: &HashMap<&str, GraphTypeKind>) -> LeafKind {
    match kinds.get(name) {
        Some(GraphTypeKind::InputObject) => LeafKind::InputObject,
        Some(GraphTypeKind::Enum) => LeafKind::Enum,
        Some(GraphTypeKind::Object | GraphTypeKind::Interface | GraphTypeKind::Union) => {
            LeafKind::Output
        }
        // A document may (redundantly) declare a built-in scalar
        Some(GraphTypeKind::Scalar) => PrimitiveKind::from_type_name(name)
            .map(LeafKind::Primitive)
            .unwrap_or(LeafKind::CustomScalar),
        None => PrimitiveKind::from_type_name(name)
            .map(LeafKind::Primitive)
            .unwrap_or(LeafKind::Unknown),
    }
}
