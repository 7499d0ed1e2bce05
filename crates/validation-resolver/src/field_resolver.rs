// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{
    collections::{HashMap, HashSet},
    fmt::Debug,
    sync::Arc,
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use validation_model::{FieldCoordinate, RequestContext, ResolveInfo};

use crate::validation_failure::ResolutionError;

/// Resolution of one field, as done by the host
#[async_trait]
pub trait FieldResolver
where
    Self: Send + Sync + Debug,
{
    async fn resolve(
        &self,
        arguments: Map<String, Value>,
        request_context: &RequestContext,
        info: &ResolveInfo,
    ) -> Result<Value, ResolutionError>;
}

/// A resolver backed by a plain function
pub struct FnResolver<F>(F);

impl<F> FnResolver<F>
where
    F: Fn(Map<String, Value>, &RequestContext, &ResolveInfo) -> Result<Value, ResolutionError>
        + Send
        + Sync
        + 'static,
{
    pub fn new(function: F) -> Self {
        Self(function)
    }
}

impl<F> Debug for FnResolver<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnResolver")
    }
}

#[async_trait]
impl<F> FieldResolver for FnResolver<F>
where
    F: Fn(Map<String, Value>, &RequestContext, &ResolveInfo) -> Result<Value, ResolutionError>
        + Send
        + Sync
        + 'static,
{
    async fn resolve(
        &self,
        arguments: Map<String, Value>,
        request_context: &RequestContext,
        info: &ResolveInfo,
    ) -> Result<Value, ResolutionError> {
        (self.0)(arguments, request_context, info)
    }
}

/// Builds the resolver that stands in for a field's own
pub type ResolverWrapper =
    Arc<dyn Fn(&FieldCoordinate, Arc<dyn FieldResolver>) -> Arc<dyn FieldResolver> + Send + Sync>;

/// The host's resolvers, by field.
///
/// Once a wrapper is set, every resolver in the map goes through it, including the ones inserted
/// later.
#[derive(Default)]
pub struct ResolverMap {
    resolvers: HashMap<FieldCoordinate, Arc<dyn FieldResolver>>,
    wrapped: HashSet<FieldCoordinate>,
    wrapper: Option<ResolverWrapper>,
}

impl ResolverMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, type_name: &str, field_name: &str, resolver: Arc<dyn FieldResolver>) {
        let coordinate = FieldCoordinate::new(type_name, field_name);

        let resolver = match &self.wrapper {
            Some(wrapper) => {
                self.wrapped.insert(coordinate.clone());
                wrapper(&coordinate, resolver)
            }
            None => {
                self.wrapped.remove(&coordinate);
                resolver
            }
        };
        self.resolvers.insert(coordinate, resolver);
    }

    pub fn get(&self, type_name: &str, field_name: &str) -> Option<Arc<dyn FieldResolver>> {
        self.resolvers
            .get(&FieldCoordinate::new(type_name, field_name))
            .cloned()
    }

    /// Put every resolver, present and future, behind `wrapper`.
    ///
    /// A map takes a single wrapper: once one is set, later calls leave the map alone. Returns
    /// the number of resolvers wrapped.
    pub fn wrap_all(&mut self, wrapper: ResolverWrapper) -> usize {
        if self.wrapper.is_some() {
            return 0;
        }

        let mut count = 0;
        for (coordinate, resolver) in self.resolvers.iter_mut() {
            if self.wrapped.insert(coordinate.clone()) {
                *resolver = wrapper(coordinate, resolver.clone());
                count += 1;
            }
        }

        self.wrapper = Some(wrapper);
        count
    }

    pub fn is_wrapped(&self, type_name: &str, field_name: &str) -> bool {
        self.wrapped
            .contains(&FieldCoordinate::new(type_name, field_name))
    }

    pub async fn resolve(
        &self,
        type_name: &str,
        field_name: &str,
        arguments: Map<String, Value>,
        request_context: &RequestContext,
        info: &ResolveInfo,
    ) -> Result<Value, ResolutionError> {
        let resolver = self.get(type_name, field_name).ok_or_else(|| {
            ResolutionError::NoResolver(FieldCoordinate::new(type_name, field_name))
        })?;

        resolver.resolve(arguments, request_context, info).await
    }
}

impl Debug for ResolverMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverMap")
            .field("resolvers", &self.resolvers)
            .field("wrapped", &self.wrapped)
            .field("has_wrapper", &self.wrapper.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn echo() -> Arc<dyn FieldResolver> {
        Arc::new(FnResolver::new(|arguments, _, _| Ok(Value::Object(arguments))))
    }

    #[tokio::test]
    async fn resolve_through_the_map() {
        let mut resolvers = ResolverMap::new();
        resolvers.insert("Query", "echo", echo());

        let value = resolvers
            .resolve(
                "Query",
                "echo",
                json!({ "a": 1 }).as_object().unwrap().clone(),
                &RequestContext::default(),
                &ResolveInfo::new("Query", "echo"),
            )
            .await
            .unwrap();
        assert_eq!(value, json!({ "a": 1 }));

        let missing = resolvers
            .resolve(
                "Query",
                "missing",
                Map::new(),
                &RequestContext::default(),
                &ResolveInfo::new("Query", "missing"),
            )
            .await;
        assert!(matches!(missing, Err(ResolutionError::NoResolver(_))));
    }

    /// Tags the echoed arguments so a wrapped call is visible
    fn tagging_wrapper() -> ResolverWrapper {
        Arc::new(|_: &FieldCoordinate, inner: Arc<dyn FieldResolver>| {
            Arc::new(Tagged(inner)) as Arc<dyn FieldResolver>
        })
    }

    #[derive(Debug)]
    struct Tagged(Arc<dyn FieldResolver>);

    #[async_trait]
    impl FieldResolver for Tagged {
        async fn resolve(
            &self,
            mut arguments: Map<String, Value>,
            request_context: &RequestContext,
            info: &ResolveInfo,
        ) -> Result<Value, ResolutionError> {
            arguments.insert("tagged".into(), Value::Bool(true));
            self.0.resolve(arguments, request_context, info).await
        }
    }

    async fn echo_call(resolvers: &ResolverMap, field_name: &str) -> Value {
        resolvers
            .resolve(
                "Query",
                field_name,
                Map::new(),
                &RequestContext::default(),
                &ResolveInfo::new("Query", field_name),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn wrapper_applies_to_later_inserts() {
        let mut resolvers = ResolverMap::new();
        resolvers.insert("Query", "echo", echo());

        assert_eq!(resolvers.wrap_all(tagging_wrapper()), 1);
        assert!(resolvers.is_wrapped("Query", "echo"));
        assert_eq!(resolvers.wrap_all(tagging_wrapper()), 0);

        resolvers.insert("Query", "late", echo());
        assert!(resolvers.is_wrapped("Query", "late"));

        // Wrapped once, not once per call
        assert_eq!(echo_call(&resolvers, "echo").await, json!({ "tagged": true }));
        assert_eq!(echo_call(&resolvers, "late").await, json!({ "tagged": true }));
    }
}
