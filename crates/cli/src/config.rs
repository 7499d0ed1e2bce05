// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::debug;
use validation_builder::{BackendKind, ValidationConfig};
use validation_model::OverrideStore;

const DEFAULT_CONFIG_FILE: &str = "gql-validate.toml";

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigSer {
    pub mode: Option<BackendKind>,
    #[serde(rename = "directive-validation")]
    pub directive_validation: Option<bool>,
    /// Path to a JSON file of overrides, relative to the configuration file
    pub overrides: Option<PathBuf>,
    #[serde(rename = "backend-options")]
    pub backend_options: Option<toml::Table>,
}

impl ConfigSer {
    fn into_config(self, base_dir: &Path) -> Result<ValidationConfig> {
        let mut config = ValidationConfig::new(self.mode.unwrap_or_default());

        if let Some(directive_validation) = self.directive_validation {
            config = config.with_directive_validation(directive_validation);
        }

        if let Some(overrides) = self.overrides {
            config = config.with_overrides(load_overrides(&base_dir.join(overrides))?);
        }

        if let Some(backend_options) = self.backend_options {
            let backend_options = serde_json::to_value(backend_options)
                .context("Failed to convert `backend-options`")?;
            config = config.with_backend_options(backend_options);
        }

        Ok(config)
    }
}

fn load_overrides(path: &Path) -> Result<OverrideStore> {
    let json_str = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read file '{}': {}", path.display(), e))?;
    let value: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| anyhow!("Failed to parse JSON file '{}': {}", path.display(), e))?;

    Ok(OverrideStore::from_json(value)?)
}

fn load_config_from_file(path: &Path) -> Result<ValidationConfig> {
    let toml_str = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read file '{}': {}", path.display(), e))?;
    let config: ConfigSer = toml::from_str(&toml_str)
        .map_err(|e| anyhow!("Failed to parse TOML file '{}': {}", path.display(), e))?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    config.into_config(base_dir)
}

/// Read the configuration from `path`, or from `gql-validate.toml` if it exists
pub fn load_config(path: Option<&Path>) -> Result<ValidationConfig> {
    match path {
        Some(path) => load_config_from_file(path),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);

            if default_path.exists() {
                load_config_from_file(default_path)
            } else {
                debug!("No configuration file, using defaults");
                Ok(ValidationConfig::default())
            }
        }
    }
}
