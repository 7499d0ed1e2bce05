// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use anyhow::Result;
use async_trait::async_trait;
use clap::{ArgMatches, Command};
use colored::Colorize;
use validation_builder::compile_registry;

use super::{
    command::{CommandDefinition, config_arg, schema_file_arg},
    util::load_inputs,
};

pub(crate) struct CheckCommandDefinition {}

#[async_trait]
impl CommandDefinition for CheckCommandDefinition {
    fn command(&self) -> Command {
        Command::new("check")
            .about("Compile the validation registry for a schema")
            .arg(schema_file_arg())
            .arg(config_arg())
    }

    async fn execute(&self, matches: &ArgMatches) -> Result<()> {
        let (graph, config) = load_inputs(matches)?;

        let registry = compile_registry(&config, &graph)?;

        println!(
            "{} {} validation units, {} validated fields",
            "Compiled".green(),
            registry.units().count(),
            registry.fields().count()
        );

        for field in registry.fields() {
            let functions = field.functions.len();
            if functions == 0 {
                println!("  {}", field.coordinate);
            } else {
                println!(
                    "  {} {}",
                    field.coordinate,
                    format!("({functions} validation functions)").dimmed()
                );
            }
        }

        Ok(())
    }
}
