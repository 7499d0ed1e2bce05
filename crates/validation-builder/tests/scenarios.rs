// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde_json::{Value, json};
use test_log::test;
use validation_builder::{
    BackendKind, CompileError, Registry, ValidationConfig, ValidationLoadingError,
    compile_registry,
};
use validation_model::{ConfigurationError, OverrideStore, TypeGraph};

const SDL: &str = r#"
    type Query {
        message(id: ID): String
        search(filters: Filters, tags: [String!], order: Order): [String]
        count(limit: Int @constraint(maximum: 100)): Int
    }

    input Filters {
        id: ID
        text: String
        parent: Filters
    }

    enum Order {
        ASC
        DESC
    }
"#;

const BACKENDS: [BackendKind; 2] = [BackendKind::JsonSchema, BackendKind::Native];

fn compile(config: ValidationConfig) -> Result<Registry, ValidationLoadingError> {
    let graph = TypeGraph::parse(SDL).unwrap();
    compile_registry(&config, &graph)
}

fn filters_overrides() -> OverrideStore {
    OverrideStore::from_json(json!({ "Filters": { "text": { "minLength": 3 } } })).unwrap()
}

fn validate_arguments(
    registry: &Registry,
    field: &str,
    arguments: Value,
) -> Result<Value, Vec<String>> {
    registry
        .field("Query", field)
        .unwrap()
        .validator
        .validate(&arguments)
        .map_err(|failures| failures.into_iter().map(|f| f.path).collect())
}

#[test]
fn input_field_override() {
    for mode in BACKENDS {
        let registry =
            compile(ValidationConfig::new(mode).with_overrides(filters_overrides())).unwrap();

        let filters_id = mode.dialect().reference_id("Filters", None, None);
        let filters = &registry.unit(&filters_id).unwrap().validator;

        let failures = filters
            .validate(&json!({ "id": "1", "text": "ab" }))
            .unwrap_err();
        assert_eq!(failures.len(), 1, "{mode:?}");
        assert_eq!(failures[0].path, "/text", "{mode:?}");

        assert!(filters.validate(&json!({ "id": "1", "text": "abcd" })).is_ok());
    }
}

#[test]
fn composite_argument_is_validated_by_the_type_unit() {
    for mode in BACKENDS {
        let registry =
            compile(ValidationConfig::new(mode).with_overrides(filters_overrides())).unwrap();

        assert_eq!(
            validate_arguments(
                &registry,
                "search",
                json!({ "filters": { "parent": { "text": "ab" } } })
            ),
            Err(vec!["/filters/parent/text".to_string()]),
            "{mode:?}"
        );
        assert!(validate_arguments(&registry, "search", json!({ "filters": null })).is_ok());
    }
}

#[test]
fn nullable_id_argument() {
    for mode in BACKENDS {
        let registry = compile(ValidationConfig::new(mode)).unwrap();

        assert_eq!(
            validate_arguments(&registry, "message", json!({ "id": null })),
            Ok(json!({ "id": null }))
        );
        assert_eq!(
            validate_arguments(&registry, "message", json!({ "id": 42 })),
            Ok(json!({ "id": "42" })),
            "{mode:?}"
        );
        assert_eq!(
            validate_arguments(&registry, "message", json!({ "id": "abc" })),
            Ok(json!({ "id": "abc" }))
        );
        assert_eq!(
            validate_arguments(&registry, "message", json!({})),
            Ok(json!({}))
        );
    }
}

#[test]
fn list_of_non_null_strings() {
    for mode in BACKENDS {
        let registry = compile(ValidationConfig::new(mode)).unwrap();

        assert!(validate_arguments(&registry, "search", json!({ "tags": ["a", "b"] })).is_ok());
        assert_eq!(
            validate_arguments(&registry, "search", json!({ "tags": ["a", null] })),
            Err(vec!["/tags/1".to_string()]),
            "{mode:?}"
        );
    }
}

#[test]
fn enum_argument() {
    for mode in BACKENDS {
        let registry = compile(ValidationConfig::new(mode)).unwrap();

        assert!(validate_arguments(&registry, "search", json!({ "order": "ASC" })).is_ok());
        assert!(validate_arguments(&registry, "search", json!({ "order": null })).is_ok());
        assert_eq!(
            validate_arguments(&registry, "search", json!({ "order": "UP" })),
            Err(vec!["/order".to_string()]),
            "{mode:?}"
        );
    }
}

#[test]
fn directive_overrides() {
    for mode in BACKENDS {
        let registry = compile(ValidationConfig::new(mode)).unwrap();
        assert!(validate_arguments(&registry, "count", json!({ "limit": 101 })).is_err());

        let registry =
            compile(ValidationConfig::new(mode).with_directive_validation(false)).unwrap();
        assert!(validate_arguments(&registry, "count", json!({ "limit": 101 })).is_ok());
    }
}

#[test]
fn explicit_override_wins_over_directive() {
    let overrides =
        OverrideStore::new().argument("Query", "count", "limit", json!({ "maximum": 1000 }));

    for mode in BACKENDS {
        let config = ValidationConfig::new(mode).with_overrides(overrides.clone());
        let registry = compile(config).unwrap();

        assert!(validate_arguments(&registry, "count", json!({ "limit": 101 })).is_ok());
        assert!(validate_arguments(&registry, "count", json!({ "limit": 1001 })).is_err());
    }
}

#[test]
fn custom_type_inference() {
    let config = ValidationConfig::new(BackendKind::JsonSchema).with_custom_type_inference(
        |name, is_non_null| {
            (name == "ID" && !is_non_null)
                .then(|| json!({ "type": ["string", "null"], "pattern": "^[0-9]+$" }))
                .and_then(|value| value.as_object().cloned())
        },
    );
    let registry = compile(config).unwrap();

    assert!(validate_arguments(&registry, "message", json!({ "id": "12" })).is_ok());
    assert!(validate_arguments(&registry, "message", json!({ "id": "ab" })).is_err());
}

#[test]
fn recompilation_is_stable() {
    for mode in BACKENDS {
        let ids = |registry: Registry| -> Vec<String> {
            registry.units().map(|u| u.reference_id.clone()).collect()
        };

        let config = || ValidationConfig::new(mode).with_overrides(filters_overrides());
        let first = compile(config()).unwrap();
        let second = compile(config()).unwrap();

        assert_eq!(ids(first), ids(second));
    }
}

#[test]
fn configuration_errors_surface_before_compilation() {
    let overrides = OverrideStore::new().input_type("Query", json!({ "minProperties": 1 }));

    let error = compile(ValidationConfig::default().with_overrides(overrides)).unwrap_err();

    assert!(matches!(
        error,
        ValidationLoadingError::Configuration(ConfigurationError::TypeFragmentOnNonInputType(_))
    ));
}

#[test]
fn malformed_fragment_fails_the_pass() {
    let overrides =
        OverrideStore::new().input_field("Filters", "text", json!({ "minLength": -1 }));

    for mode in BACKENDS {
        let config = ValidationConfig::new(mode).with_overrides(overrides.clone());
        let error = compile(config).unwrap_err();

        let expected = mode.dialect().reference_id("Filters", Some("text"), None);
        match error {
            ValidationLoadingError::Compile(CompileError::InvalidFragment {
                reference_id, ..
            }) => assert_eq!(reference_id, expected, "{mode:?}"),
            error => panic!("{mode:?}: unexpected error {error}"),
        }
    }
}

#[test]
fn bad_backend_options() {
    let config = ValidationConfig::new(BackendKind::JsonSchema)
        .with_backend_options(json!({ "draft": "draft3" }));

    assert!(matches!(
        compile(config),
        Err(ValidationLoadingError::Configuration(ConfigurationError::BackendOptions(_)))
    ));
}
