// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::{Display, Formatter};

/// A field of a named type, written `Type.field`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldCoordinate {
    pub type_name: String,
    pub field_name: String,
}

impl FieldCoordinate {
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: field_name.into(),
        }
    }

    /// Parse the `Type.field` notation
    pub fn parse(coordinate: &str) -> Option<Self> {
        let (type_name, field_name) = coordinate.split_once('.')?;

        if type_name.is_empty() || field_name.is_empty() || field_name.contains('.') {
            None
        } else {
            Some(Self::new(type_name, field_name))
        }
    }
}

impl Display for FieldCoordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.type_name, self.field_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_coordinate() {
        assert_eq!(
            FieldCoordinate::parse("Query.message"),
            Some(FieldCoordinate::new("Query", "message"))
        );
        assert_eq!(FieldCoordinate::parse("Query"), None);
        assert_eq!(FieldCoordinate::parse(".message"), None);
        assert_eq!(FieldCoordinate::parse("Query.message.id"), None);
    }
}
