// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::Serialize;
use thiserror::Error;
use validation_builder::ValueFailure;
use validation_model::{FieldCoordinate, ValidationFunctionError};

/// One rejected argument (or part of one)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentFailure {
    /// `None` when the failure concerns the argument object as a whole (a missing argument, say)
    pub argument: Option<String>,
    /// JSON pointer into the arguments, such as `/tags/1`
    pub path: String,
    pub message: String,
}

impl ArgumentFailure {
    pub(crate) fn from_schema(failure: ValueFailure) -> Self {
        let argument = failure
            .path
            .strip_prefix('/')
            .and_then(|path| path.split('/').next())
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        Self {
            argument,
            path: failure.path,
            message: failure.message,
        }
    }

    /// Message and path are kept as the function reported them
    pub(crate) fn from_function(argument_name: &str, error: ValidationFunctionError) -> Self {
        Self {
            argument: Some(argument_name.to_string()),
            path: format!("/{argument_name}{}", error.path.unwrap_or_default()),
            message: error.message,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("Invalid arguments for '{coordinate}': {}", summary(.failures))]
pub struct ValidationFailure {
    #[serde(serialize_with = "serialize_coordinate")]
    pub coordinate: FieldCoordinate,
    pub failures: Vec<ArgumentFailure>,
}

fn summary(failures: &[ArgumentFailure]) -> String {
    failures
        .iter()
        .map(|failure| match &failure.argument {
            Some(_) => format!("{} ({})", failure.message, failure.path),
            None => failure.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn serialize_coordinate<S: serde::Serializer>(
    coordinate: &FieldCoordinate,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(coordinate)
}

#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("No resolver registered for '{0}'")]
    NoResolver(FieldCoordinate),

    #[error("{0}")]
    Delegate(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("{0}")]
    Generic(String),
}

impl ResolutionError {
    // Message that should be emitted when the error is returned to the user.
    pub fn user_error_message(&self) -> String {
        self.explicit_message()
            .unwrap_or_else(|| "Internal server error".to_string())
    }

    pub fn explicit_message(&self) -> Option<String> {
        match self {
            ResolutionError::Validation(failure) => Some(failure.to_string()),
            _ => None,
        }
    }
}
