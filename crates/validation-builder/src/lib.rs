// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Compiles validation overrides and a type graph into a [`Registry`] of validators.

pub mod backend;
pub mod config;
pub mod error;
pub mod inference;
pub mod registry;
pub mod synthesizer;

pub use backend::{BackendKind, CompiledValidator, SchemaBackend, SchemaDialect, ValueFailure};
pub use config::{ValidationConfig, compile_registry};
pub use error::{CompileError, ValidationLoadingError};
pub use inference::{InferenceFn, TypeInference};
pub use registry::{ArgumentFunction, CompiledUnit, FieldValidator, Registry};
pub use synthesizer::SchemaSynthesizer;
