// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphLoadingError {
    #[error("Failed to parse schema: {0}")]
    Parse(String),
}

/// Malformed or self-contradictory validation overrides.
///
/// Raised while checking the overrides against the type graph, before any validator is synthesized.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Validation overrides refer to unknown type '{0}'")]
    UnknownType(String),

    #[error("Validation overrides refer to unknown field '{field_name}' of type '{type_name}'")]
    UnknownField {
        type_name: String,
        field_name: String,
    },

    #[error(
        "Validation overrides refer to unknown argument '{argument_name}' of '{type_name}.{field_name}'"
    )]
    UnknownArgument {
        type_name: String,
        field_name: String,
        argument_name: String,
    },

    #[error(
        "Type-level validation fragment supplied for '{0}', which is not an input object type"
    )]
    TypeFragmentOnNonInputType(String),

    #[error(
        "Per-argument overrides supplied for input field '{type_name}.{field_name}', which takes a single fragment"
    )]
    ArgumentsOnInputField {
        type_name: String,
        field_name: String,
    },

    #[error(
        "Validation function supplied for input field '{type_name}.{field_name}'; functions are only allowed for arguments"
    )]
    FunctionOnInputField {
        type_name: String,
        field_name: String,
    },

    #[error("Validation overrides supplied for '{0}', which has no validatable fields")]
    NotValidatable(String),

    #[error("Validation override at '{location}' must be an object, found {found}")]
    NotAnObject { location: String, found: String },

    #[error("Directive '@{directive}' at '{location}' has a value that cannot be expressed as JSON")]
    DirectiveValue {
        directive: String,
        location: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid backend options: {0}")]
    BackendOptions(#[source] serde_json::Error),
}
