// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::{Display, Formatter};

/// Built-in scalar types of GraphQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Int,
    Float,
    String,
    Boolean,
    Id,
}

impl PrimitiveKind {
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "Int" => Some(PrimitiveKind::Int),
            "Float" => Some(PrimitiveKind::Float),
            "String" => Some(PrimitiveKind::String),
            "Boolean" => Some(PrimitiveKind::Boolean),
            "ID" => Some(PrimitiveKind::Id),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PrimitiveKind::Int => "Int",
            PrimitiveKind::Float => "Float",
            PrimitiveKind::String => "String",
            PrimitiveKind::Boolean => "Boolean",
            PrimitiveKind::Id => "ID",
        }
    }
}

/// What the named leaf of a position refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafKind {
    Primitive(PrimitiveKind),
    Enum,
    CustomScalar,
    /// The only composite kind: validated through its own type-level unit
    InputObject,
    /// An object, interface or union (not valid in an input position; never validated)
    Output,
    /// A name the graph does not declare
    Unknown,
}

/// The type usage of a field or an argument, such as `[String!]` or `Filters!`.
///
/// `item` is the element position when the type is a list (so `[[Int]!]` nests two levels deep).
/// The leaf name and kind are repeated on every level for convenience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedPosition {
    pub leaf_type_name: String,
    pub leaf_kind: LeafKind,
    pub is_non_null: bool,
    pub item: Option<Box<TypedPosition>>,
}

impl TypedPosition {
    pub fn named(
        leaf_type_name: impl Into<String>,
        leaf_kind: LeafKind,
        is_non_null: bool,
    ) -> Self {
        Self {
            leaf_type_name: leaf_type_name.into(),
            leaf_kind,
            is_non_null,
            item: None,
        }
    }

    pub fn list_of(item: TypedPosition, is_non_null: bool) -> Self {
        Self {
            leaf_type_name: item.leaf_type_name.clone(),
            leaf_kind: item.leaf_kind.clone(),
            is_non_null,
            item: Some(Box::new(item)),
        }
    }

    pub fn is_list(&self) -> bool {
        self.item.is_some()
    }

    pub fn is_composite(&self) -> bool {
        self.leaf_kind == LeafKind::InputObject
    }

    /// Whether list elements are non-null. `false` for a non-list position.
    pub fn item_is_non_null(&self) -> bool {
        self.item.as_ref().is_some_and(|item| item.is_non_null)
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.leaf_kind {
            LeafKind::Primitive(kind) => Some(kind),
            _ => None,
        }
    }
}

impl Display for TypedPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.item {
            Some(item) => write!(f, "[{item}]")?,
            None => f.write_str(&self.leaf_type_name)?,
        }
        if self.is_non_null {
            f.write_str("!")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_of_non_null_strings() {
        let position = TypedPosition::list_of(
            TypedPosition::named("String", LeafKind::Primitive(PrimitiveKind::String), true),
            false,
        );

        assert!(position.is_list());
        assert!(position.item_is_non_null());
        assert!(!position.is_non_null);
        assert!(!position.is_composite());
        assert_eq!(position.to_string(), "[String!]");
    }

    #[test]
    fn composite_leaf() {
        let position = TypedPosition::named("Filters", LeafKind::InputObject, true);

        assert!(position.is_composite());
        assert!(!position.item_is_non_null());
        assert_eq!(position.primitive_kind(), None);
        assert_eq!(position.to_string(), "Filters!");
    }
}
