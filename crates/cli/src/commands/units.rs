// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use clap::{ArgMatches, Command};
use serde_json::{Map, Value};
use validation_builder::{Registry, compile_registry};

use super::{
    command::{CommandDefinition, config_arg, get, output_arg, schema_file_arg},
    util::{load_inputs, write_output},
};

pub(crate) struct UnitsCommandDefinition {}

#[async_trait]
impl CommandDefinition for UnitsCommandDefinition {
    fn command(&self) -> Command {
        Command::new("units")
            .about("Print the synthesized schema fragment of every validation unit")
            .arg(schema_file_arg())
            .arg(config_arg())
            .arg(output_arg())
    }

    async fn execute(&self, matches: &ArgMatches) -> Result<()> {
        let (graph, config) = load_inputs(matches)?;
        let output: Option<PathBuf> = get(matches, "output");

        let registry = compile_registry(&config, &graph)?;
        let units = serde_json::to_string_pretty(&units_json(&registry))?;

        write_output(output.as_deref(), &units)
    }
}

fn units_json(registry: &Registry) -> Value {
    let units: Map<String, Value> = registry
        .units()
        .map(|unit| (unit.reference_id.clone(), Value::Object(unit.fragment.clone())))
        .collect();

    Value::Object(units)
}
