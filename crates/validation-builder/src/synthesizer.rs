// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Final fragment of a typed position.
//!
//! The fragment is built from the leaf's inferred shape and the position's list wrapping, then the
//! override is laid over it. A position whose leaf is an input object gets a reference to the
//! type's own unit instead of a shape (overrides do not apply there), so each input object is
//! validated by exactly one unit however many positions use it. This is also what keeps cyclic
//! input types finite.

use serde_json::Value;
use validation_model::{Fragment, TypedPosition};

use crate::{backend::SchemaDialect, inference::TypeInference};

const ITEMS_KEY: &str = "items";

pub struct SchemaSynthesizer<'a> {
    dialect: &'a dyn SchemaDialect,
    inference: &'a TypeInference<'a>,
}

impl<'a> SchemaSynthesizer<'a> {
    pub fn new(dialect: &'a dyn SchemaDialect, inference: &'a TypeInference<'a>) -> Self {
        Self { dialect, inference }
    }

    pub fn synthesize(
        &self,
        position: &TypedPosition,
        override_fragment: Option<&Fragment>,
        reference_id: &str,
    ) -> Fragment {
        let mut fragment = if position.is_composite() {
            self.composite_shape(position)
        } else {
            self.shape(position, override_fragment)
        };

        self.dialect.tag(&mut fragment, reference_id);
        fragment
    }

    fn composite_shape(&self, position: &TypedPosition) -> Fragment {
        let nullable = !position.is_non_null;

        match &position.item {
            Some(item) => self.dialect.array(self.composite_shape(item), nullable),
            None => {
                let target = self
                    .dialect
                    .reference_id(&position.leaf_type_name, None, None);
                self.dialect.reference(&target, nullable)
            }
        }
    }

    fn shape(&self, position: &TypedPosition, override_fragment: Option<&Fragment>) -> Fragment {
        match &position.item {
            Some(item) => {
                let item_override = override_fragment
                    .and_then(|fragment| fragment.get(ITEMS_KEY))
                    .and_then(Value::as_object);

                let items = self.shape(item, item_override);
                let mut fragment = self.dialect.array(items, !position.is_non_null);

                if let Some(override_fragment) = override_fragment {
                    self.merge(&mut fragment, override_fragment, &[ITEMS_KEY]);
                }
                fragment
            }
            None => {
                let mut fragment = self
                    .inference
                    .infer(&position.leaf_type_name, position.is_non_null);

                if let Some(override_fragment) = override_fragment {
                    self.merge(&mut fragment, override_fragment, &[]);
                }
                fragment
            }
        }
    }

    /// Lay `overlay` over `fragment`, keeping the identity keys `fragment` already has
    pub fn merge(&self, fragment: &mut Fragment, overlay: &Fragment, skip: &[&str]) {
        let identity_keys = self.dialect.identity_keys();

        for (key, value) in overlay {
            let is_identity = identity_keys.contains(&key.as_str()) && fragment.contains_key(key);

            if !is_identity && !skip.contains(&key.as_str()) {
                fragment.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;
    use validation_model::{LeafKind, PrimitiveKind};

    use super::*;
    use crate::backend::BackendKind;

    fn fragment(value: Value) -> Fragment {
        value.as_object().unwrap().clone()
    }

    fn string(is_non_null: bool) -> TypedPosition {
        TypedPosition::named(
            "String",
            LeafKind::Primitive(PrimitiveKind::String),
            is_non_null,
        )
    }

    fn filters(is_non_null: bool) -> TypedPosition {
        TypedPosition::named("Filters", LeafKind::InputObject, is_non_null)
    }

    fn synthesize(
        backend: BackendKind,
        position: &TypedPosition,
        override_fragment: Option<Value>,
    ) -> Value {
        let dialect = backend.dialect();
        let inference = TypeInference::new(dialect, None, HashMap::new());
        let synthesizer = SchemaSynthesizer::new(dialect, &inference);
        let override_fragment = override_fragment.map(fragment);

        Value::Object(synthesizer.synthesize(position, override_fragment.as_ref(), "Query.f.a"))
    }

    #[test]
    fn override_wins_except_identity_keys() {
        let value = synthesize(
            BackendKind::JsonSchema,
            &string(false),
            Some(json!({ "type": "integer", "minLength": 3, "$comment": "mine" })),
        );

        assert_eq!(
            value,
            json!({ "type": ["string", "null"], "minLength": 3, "$comment": "Query.f.a" })
        );
    }

    #[test]
    fn override_may_supply_missing_shape() {
        let date = TypedPosition::named("DateTime", LeafKind::CustomScalar, true);

        let value = synthesize(
            BackendKind::JsonSchema,
            &date,
            Some(json!({ "type": "string", "format": "date-time" })),
        );

        assert_eq!(
            value,
            json!({ "type": "string", "format": "date-time", "$comment": "Query.f.a" })
        );
    }

    #[test]
    fn list_of_non_null_items() {
        let tags = TypedPosition::list_of(string(true), false);

        let value = synthesize(
            BackendKind::JsonSchema,
            &tags,
            Some(json!({ "maxItems": 5, "items": { "minLength": 1 } })),
        );

        assert_eq!(
            value,
            json!({
                "type": ["array", "null"],
                "items": { "type": "string", "minLength": 1 },
                "maxItems": 5,
                "$comment": "Query.f.a"
            })
        );
    }

    #[test]
    fn composite_leaf_is_a_reference() {
        let value = synthesize(
            BackendKind::JsonSchema,
            &filters(true),
            Some(json!({ "minProperties": 1 })),
        );
        assert_eq!(
            value,
            json!({
                "type": "object",
                "allOf": [{ "$ref": "#/definitions/Filters" }],
                "$comment": "Query.f.a"
            })
        );

        let value = synthesize(BackendKind::JsonSchema, &filters(false), None);
        assert_eq!(
            value,
            json!({ "$ref": "#/definitions/Filters", "$comment": "Query.f.a" })
        );
    }

    #[test]
    fn list_of_composites() {
        let position = TypedPosition::list_of(filters(true), true);

        let value = synthesize(BackendKind::Native, &position, None);

        assert_eq!(
            value,
            json!({
                "kind": "array",
                "nullable": false,
                "items": { "kind": "ref", "ref": "Filters", "nullable": false },
                "$id": "Query.f.a"
            })
        );
    }
}
