// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{collections::HashMap, sync::Arc};

use validation_model::{Fragment, PrimitiveKind};

use crate::backend::SchemaDialect;

/// User hook tried before the default inference: `(leaf type name, is non-null)`. Returning `None`
/// or an empty fragment falls back to the default.
pub type InferenceFn = Arc<dyn Fn(&str, bool) -> Option<Fragment> + Send + Sync>;

/// Default shapes of leaf types
pub struct TypeInference<'a> {
    dialect: &'a dyn SchemaDialect,
    custom: Option<&'a InferenceFn>,
    enumerations: HashMap<String, Vec<String>>,
}

impl<'a> TypeInference<'a> {
    pub fn new(
        dialect: &'a dyn SchemaDialect,
        custom: Option<&'a InferenceFn>,
        enumerations: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            dialect,
            custom,
            enumerations,
        }
    }

    /// The shape of a leaf type. Composite and unknown leaves yield an empty fragment.
    pub fn infer(&self, leaf_type_name: &str, is_non_null: bool) -> Fragment {
        if let Some(fragment) = self
            .custom
            .and_then(|custom| custom(leaf_type_name, is_non_null))
            .filter(|fragment| !fragment.is_empty())
        {
            return fragment;
        }

        let nullable = !is_non_null;

        if let Some(kind) = PrimitiveKind::from_type_name(leaf_type_name) {
            self.dialect.primitive(kind, nullable)
        } else if let Some(values) = self.enumerations.get(leaf_type_name) {
            self.dialect.enumeration(values, nullable)
        } else {
            Fragment::new()
        }
    }
}
