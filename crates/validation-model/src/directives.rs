// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Overrides declared inline in the schema with `@constraint`.
//!
//! ```graphql
//! input Filters @constraint(minProperties: 1) {
//!     text: String @constraint(minLength: 3)
//! }
//!
//! type Query {
//!     message(id: ID @constraint(maxLength: 10)): String
//! }
//! ```

use async_graphql_parser::types::ConstDirective;
use serde_json::Map;
use tracing::debug;

use crate::{
    error::ConfigurationError,
    overrides::{Fragment, OverrideEntry, ResolvedOverrides},
    type_graph::TypeGraph,
};

pub const CONSTRAINT_DIRECTIVE: &str = "constraint";

pub fn collect_directive_overrides(
    graph: &TypeGraph,
) -> Result<ResolvedOverrides, ConfigurationError> {
    let mut overrides = ResolvedOverrides::default();

    for graph_type in graph.types().filter(|t| !t.is_meta()) {
        let type_name = &graph_type.name;

        if graph_type.is_input_object() {
            if let Some(fragment) = constraint_fragment(&graph_type.directives, type_name)? {
                overrides.set_type_fragment(type_name, fragment);
            }

            for field in &graph_type.fields {
                let location = format!("{type_name}.{}", field.name);
                if let Some(fragment) = constraint_fragment(&field.directives, &location)? {
                    debug!(%location, "Collected @constraint");
                    overrides.set_input_field(type_name, &field.name, fragment);
                }
            }
        } else if graph_type.is_output_object() {
            for field in &graph_type.fields {
                for argument in &field.arguments {
                    let location = format!("{type_name}.{}.{}", field.name, argument.name);
                    if let Some(fragment) = constraint_fragment(&argument.directives, &location)? {
                        debug!(%location, "Collected @constraint");
                        overrides.set_argument(
                            type_name,
                            &field.name,
                            &argument.name,
                            OverrideEntry::Fragment(fragment),
                        );
                    }
                }
            }
        }
    }

    Ok(overrides)
}

/// Fold every `@constraint` on a position into one fragment; later keys win.
fn constraint_fragment(
    directives: &[ConstDirective],
    location: &str,
) -> Result<Option<Fragment>, ConfigurationError> {
    let mut fragment: Option<Fragment> = None;

    for directive in directives
        .iter()
        .filter(|directive| directive.name.node == CONSTRAINT_DIRECTIVE)
    {
        let fragment = fragment.get_or_insert_with(Map::new);

        for (name, value) in &directive.arguments {
            let value =
                value
                    .node
                    .clone()
                    .into_json()
                    .map_err(|source| ConfigurationError::DirectiveValue {
                        directive: CONSTRAINT_DIRECTIVE.to_string(),
                        location: location.to_string(),
                        source,
                    })?;

            fragment.insert(name.node.to_string(), value);
        }
    }

    Ok(fragment)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn constraints_on_every_position() {
        let graph = TypeGraph::parse(
            r#"
            type Query {
                message(id: ID @constraint(maxLength: 10, pattern: "^[0-9]+$")): String
                count(limit: Int): Int
            }

            input Filters @constraint(minProperties: 1) {
                text: String @constraint(minLength: 3) @constraint(maxLength: 20)
                tags: [String!] @constraint(items: { minLength: 1 })
            }
            "#,
        )
        .unwrap();

        let overrides = collect_directive_overrides(&graph).unwrap();

        assert_eq!(
            overrides
                .argument("Query", "message", "id")
                .and_then(OverrideEntry::as_fragment),
            json!({ "maxLength": 10, "pattern": "^[0-9]+$" }).as_object()
        );
        assert!(overrides.argument("Query", "count", "limit").is_none());
        assert_eq!(
            overrides.type_fragment("Filters"),
            json!({ "minProperties": 1 }).as_object()
        );
        assert_eq!(
            overrides.input_field("Filters", "text"),
            json!({ "minLength": 3, "maxLength": 20 }).as_object()
        );
        assert_eq!(
            overrides.input_field("Filters", "tags"),
            json!({ "items": { "minLength": 1 } }).as_object()
        );
    }

    #[test]
    fn other_directives_are_ignored() {
        let graph = TypeGraph::parse(
            r#"
            type Query {
                message(id: ID @deprecated(reason: "use key")): String
            }
            "#,
        )
        .unwrap();

        let overrides = collect_directive_overrides(&graph).unwrap();

        assert!(overrides.argument("Query", "message", "id").is_none());
    }
}
