// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde_json::{Map, Value};

/// Ambient values of the request being served (headers, claims and such), as supplied by the host.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    values: Map<String, Value>,
}

impl RequestContext {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

/// Where in the response the field being resolved sits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveInfo {
    pub parent_type: String,
    pub field_name: String,
    /// Response path, such as `["concerts", "0", "venue"]`
    pub path: Vec<String>,
}

impl ResolveInfo {
    pub fn new(parent_type: impl Into<String>, field_name: impl Into<String>) -> Self {
        let field_name = field_name.into();
        Self {
            parent_type: parent_type.into(),
            path: vec![field_name.clone()],
            field_name,
        }
    }
}
