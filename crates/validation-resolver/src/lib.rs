// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Runs argument validation in front of a host's field resolvers.
//!
//! [`ValidationLayer`] owns the compiled registry and swaps it atomically on reload;
//! [`ValidationLayer::install`] wraps the host's resolvers so each call is checked against the
//! registry in force when the call starts.

mod field_resolver;
mod interception;
mod layer;
mod validation_failure;

pub use field_resolver::{FieldResolver, FnResolver, ResolverMap, ResolverWrapper};
pub use interception::{ValidatingResolver, validate_arguments};
pub use layer::{RegistryHandle, ValidationLayer};
pub use validation_failure::{ArgumentFailure, ResolutionError, ValidationFailure};
