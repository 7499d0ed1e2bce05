// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Read-only model of the schema being validated.
//!
//! Holds the type graph (parsed from SDL), the typed positions of fields and arguments, the
//! user-declared validation overrides and the request-time context handed to validation functions.

pub mod context;
pub mod coordinate;
pub mod directives;
pub mod error;
pub mod overrides;
pub mod type_graph;
pub mod typed_position;

pub use context::{RequestContext, ResolveInfo};
pub use coordinate::FieldCoordinate;
pub use error::{ConfigurationError, GraphLoadingError};
pub use overrides::{
    Fragment, FunctionInput, OverrideEntry, OverrideStore, PositionMetadata, ResolvedOverrides,
    ValidationFunction, ValidationFunctionError,
};
pub use type_graph::{GraphArgument, GraphField, GraphType, GraphTypeKind, TypeGraph};
pub use typed_position::{LeafKind, PrimitiveKind, TypedPosition};
