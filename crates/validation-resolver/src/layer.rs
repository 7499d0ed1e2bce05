// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};
use validation_builder::{Registry, ValidationConfig, ValidationLoadingError, compile_registry};
use validation_model::{FieldCoordinate, TypeGraph};

use crate::{
    field_resolver::{FieldResolver, ResolverMap},
    interception::ValidatingResolver,
};

/// Shared access to the registry currently in force.
///
/// A loaded snapshot stays valid (and unchanged) for as long as it is held, even if a newer
/// registry is stored in the meantime.
#[derive(Clone)]
pub struct RegistryHandle(Arc<ArcSwap<Registry>>);

impl RegistryHandle {
    fn new(registry: Registry) -> Self {
        Self(Arc::new(ArcSwap::from_pointee(registry)))
    }

    pub fn load(&self) -> Arc<Registry> {
        self.0.load_full()
    }

    fn store(&self, registry: Registry) {
        self.0.store(Arc::new(registry))
    }
}

impl std::fmt::Debug for RegistryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryHandle")
            .field("generation", &self.0.load().generation())
            .finish()
    }
}

/// Argument validation for a schema that may be replaced while requests are in flight
#[derive(Debug)]
pub struct ValidationLayer {
    config: ValidationConfig,
    registry: RegistryHandle,
    /// Held for the whole of a reload; guards the last generation handed out
    reload_lock: Mutex<u64>,
}

impl ValidationLayer {
    pub fn new(
        config: ValidationConfig,
        graph: &TypeGraph,
    ) -> Result<Self, ValidationLoadingError> {
        let registry = compile_registry(&config, graph)?.with_generation(1);

        info!(
            fields = registry.fields().count(),
            units = registry.units().count(),
            "Validation registry ready"
        );

        Ok(Self {
            config,
            registry: RegistryHandle::new(registry),
            reload_lock: Mutex::new(1),
        })
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// The registry currently in force
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.load()
    }

    pub fn handle(&self) -> RegistryHandle {
        self.registry.clone()
    }

    /// Compile a registry for `graph` and make it the one in force.
    ///
    /// Reloads run one at a time. On failure the registry in force stays as it was.
    #[instrument(name = "ValidationLayer::reload", skip_all)]
    pub async fn reload(&self, graph: &TypeGraph) -> Result<u64, ValidationLoadingError> {
        let mut generation = self.reload_lock.lock().await;

        match compile_registry(&self.config, graph) {
            Ok(registry) => {
                *generation += 1;
                self.registry.store(registry.with_generation(*generation));
                info!(generation = *generation, "Validation registry replaced");
                Ok(*generation)
            }
            Err(e) => {
                error!(
                    "Keeping validation registry {}, reload failed: {e}",
                    *generation
                );
                Err(e)
            }
        }
    }

    /// Hook for the host to call whenever its schema is rebuilt
    pub async fn on_schema_replaced(
        &self,
        graph: &TypeGraph,
    ) -> Result<u64, ValidationLoadingError> {
        self.reload(graph).await
    }

    pub fn is_intercepted(&self, type_name: &str, field_name: &str) -> bool {
        self.registry.load().is_intercepted(type_name, field_name)
    }

    /// Put every resolver of the map behind a guard reading the registry in force.
    ///
    /// The guard is also applied to resolvers inserted later, and a field starts (or stops) being
    /// validated as reloads add (or drop) it. A map guarded by an earlier call is left alone.
    /// Returns the number of resolvers newly guarded.
    pub fn install(&self, resolvers: &mut ResolverMap) -> usize {
        let registry = self.handle();
        let wrapped = resolvers.wrap_all(Arc::new(
            move |coordinate: &FieldCoordinate, inner: Arc<dyn FieldResolver>| {
                Arc::new(ValidatingResolver::new(
                    coordinate.clone(),
                    inner,
                    registry.clone(),
                )) as Arc<dyn FieldResolver>
            },
        ));

        debug!(
            wrapped,
            intercepted = self.registry.load().fields().count(),
            "Installed validating resolvers"
        );
        wrapped
    }
}
