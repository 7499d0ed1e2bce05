// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;
use validation_model::ConfigurationError;

/// A compilation pass that cannot complete. No registry is produced.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Backend failed to compile '{reference_id}': {message}")]
    Backend {
        reference_id: String,
        message: String,
    },

    #[error("Invalid fragment in '{reference_id}': {message}")]
    InvalidFragment {
        reference_id: String,
        message: String,
    },

    #[error(
        "Could not determine a shape for '{type_name}.{field_name}', but an override was supplied for it"
    )]
    UntypedField {
        type_name: String,
        field_name: String,
    },

    #[error("'{from}' refers to '{reference}', which was never registered")]
    UnresolvedReference { from: String, reference: String },

    #[error("'{0}' was registered more than once")]
    DuplicateReference(String),

    #[error("Nothing registered under '{0}'")]
    UnknownUnit(String),
}

#[derive(Error, Debug)]
pub enum ValidationLoadingError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}
