// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{fmt::Debug, sync::Arc};

use serde_json::Value;
use tracing::{debug, instrument};
use validation_model::{Fragment, OverrideStore, TypeGraph, directives::collect_directive_overrides};

use crate::{
    backend::BackendKind, error::ValidationLoadingError, inference::InferenceFn,
    registry::Registry,
};

/// Everything needed to compile a registry, apart from the schema itself
#[derive(Clone)]
pub struct ValidationConfig {
    pub mode: BackendKind,
    pub overrides: OverrideStore,
    /// Also take overrides from `@constraint` annotations in the schema
    pub directive_validation: bool,
    pub custom_type_inference: Option<InferenceFn>,
    /// Passed to the backend as is
    pub backend_options: Value,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            mode: BackendKind::default(),
            overrides: OverrideStore::default(),
            directive_validation: true,
            custom_type_inference: None,
            backend_options: Value::Null,
        }
    }
}

impl Debug for ValidationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationConfig")
            .field("mode", &self.mode)
            .field("overrides", &self.overrides)
            .field("directive_validation", &self.directive_validation)
            .field(
                "custom_type_inference",
                &self.custom_type_inference.as_ref().map(|_| "<fn>"),
            )
            .field("backend_options", &self.backend_options)
            .finish()
    }
}

impl ValidationConfig {
    pub fn new(mode: BackendKind) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn with_overrides(mut self, overrides: OverrideStore) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_directive_validation(mut self, directive_validation: bool) -> Self {
        self.directive_validation = directive_validation;
        self
    }

    pub fn with_custom_type_inference(
        mut self,
        inference: impl Fn(&str, bool) -> Option<Fragment> + Send + Sync + 'static,
    ) -> Self {
        self.custom_type_inference = Some(Arc::new(inference));
        self
    }

    pub fn with_backend_options(mut self, backend_options: Value) -> Self {
        self.backend_options = backend_options;
        self
    }
}

/// Check the overrides against the graph and compile a fresh registry
#[instrument(name = "compile_registry", skip_all, fields(mode = ?config.mode))]
pub fn compile_registry(
    config: &ValidationConfig,
    graph: &TypeGraph,
) -> Result<Registry, ValidationLoadingError> {
    let explicit = config.overrides.validate(graph)?;

    let overrides = if config.directive_validation {
        let derived = collect_directive_overrides(graph)?;
        explicit.merged_over(derived)
    } else {
        debug!("Skipping @constraint annotations");
        explicit
    };

    let backend = config.mode.backend(&config.backend_options)?;

    Ok(Registry::compile(
        graph,
        &overrides,
        config.custom_type_inference.as_ref(),
        backend,
    )?)
}
