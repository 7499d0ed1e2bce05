// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, instrument};
use validation_builder::FieldValidator;
use validation_model::{FieldCoordinate, FunctionInput, RequestContext, ResolveInfo};

use crate::{
    field_resolver::FieldResolver,
    layer::RegistryHandle,
    validation_failure::{ArgumentFailure, ResolutionError, ValidationFailure},
};

/// Checks a field's arguments against the installed registry before handing them to the field's
/// own resolver.
#[derive(Debug)]
pub struct ValidatingResolver {
    coordinate: FieldCoordinate,
    inner: Arc<dyn FieldResolver>,
    registry: RegistryHandle,
}

impl ValidatingResolver {
    pub fn new(
        coordinate: FieldCoordinate,
        inner: Arc<dyn FieldResolver>,
        registry: RegistryHandle,
    ) -> Self {
        Self {
            coordinate,
            inner,
            registry,
        }
    }
}

#[async_trait]
impl FieldResolver for ValidatingResolver {
    async fn resolve(
        &self,
        arguments: Map<String, Value>,
        request_context: &RequestContext,
        info: &ResolveInfo,
    ) -> Result<Value, ResolutionError> {
        let arguments = {
            // One snapshot for the whole check, whatever reloads happen meanwhile
            let registry = self.registry.load();

            match registry.field(&self.coordinate.type_name, &self.coordinate.field_name) {
                Some(field) => validate_arguments(field, arguments, request_context, info)?,
                None => {
                    debug!(field = %self.coordinate, "Field no longer validated, passing through");
                    arguments
                }
            }
        };

        self.inner.resolve(arguments, request_context, info).await
    }
}

/// Run the field's argument validator, then the validation function of every argument present.
///
/// Returns the arguments as coerced by the backend, or every failure found.
#[instrument(
    name = "validate_arguments",
    skip_all,
    fields(field = %field.coordinate)
)]
pub fn validate_arguments(
    field: &FieldValidator,
    arguments: Map<String, Value>,
    request_context: &RequestContext,
    info: &ResolveInfo,
) -> Result<Map<String, Value>, ValidationFailure> {
    let mut failures = vec![];

    let arguments = match field.validator.validate(&Value::Object(arguments.clone())) {
        Ok(Value::Object(coerced)) => coerced,
        Ok(_) => arguments,
        Err(schema_failures) => {
            failures.extend(schema_failures.into_iter().map(ArgumentFailure::from_schema));
            arguments
        }
    };

    for argument_function in &field.functions {
        let argument_name = &argument_function.metadata.argument_name;

        let Some(value) = arguments.get(argument_name) else {
            continue;
        };

        let input = FunctionInput {
            metadata: &argument_function.metadata,
            value,
            arguments: &arguments,
            request_context,
            info,
        };

        if let Err(error) = argument_function.function.call(&input) {
            failures.push(ArgumentFailure::from_function(argument_name, error));
        }
    }

    if failures.is_empty() {
        Ok(arguments)
    } else {
        debug!(failures = failures.len(), "Arguments rejected");
        Err(ValidationFailure {
            coordinate: field.coordinate.clone(),
            failures,
        })
    }
}
