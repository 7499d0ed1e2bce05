// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::ArgMatches;
use validation_builder::ValidationConfig;
use validation_model::TypeGraph;

use super::command::{get, get_required};
use crate::config::load_config;

pub(super) fn load_graph(path: &Path) -> Result<TypeGraph> {
    let sdl = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read file '{}': {}", path.display(), e))?;

    TypeGraph::parse(&sdl).map_err(|e| anyhow!("Failed to load schema '{}': {}", path.display(), e))
}

/// The schema and configuration named by the common `schema` and `--config` arguments
pub(super) fn load_inputs(matches: &ArgMatches) -> Result<(TypeGraph, ValidationConfig)> {
    let schema_path: PathBuf = get_required(matches, "schema")?;
    let config_path: Option<PathBuf> = get(matches, "config");

    let graph = load_graph(&schema_path)?;
    let config = load_config(config_path.as_deref())?;

    Ok((graph, config))
}

pub(super) fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, content)
            .map_err(|e| anyhow!("Failed to write file '{}': {}", path.display(), e)),
        None => {
            println!("{content}");
            Ok(())
        }
    }
}
