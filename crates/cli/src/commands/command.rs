// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};

#[async_trait]
pub trait CommandDefinition: Send + Sync {
    fn command(&self) -> Command;

    async fn execute(&self, matches: &ArgMatches) -> Result<()>;
}

pub struct SubcommandDefinition {
    pub name: &'static str,
    pub about: &'static str,
    pub command_definitions: Vec<Box<dyn CommandDefinition>>,
}

impl SubcommandDefinition {
    pub fn new(
        name: &'static str,
        about: &'static str,
        command_definitions: Vec<Box<dyn CommandDefinition>>,
    ) -> Self {
        Self {
            name,
            about,
            command_definitions,
        }
    }
}

#[async_trait]
impl CommandDefinition for SubcommandDefinition {
    fn command(&self) -> Command {
        Command::new(self.name)
            .about(self.about)
            .subcommand_required(true)
            .arg_required_else_help(true)
            .disable_help_subcommand(true)
            .subcommands(
                self.command_definitions
                    .iter()
                    .map(|command_definition| command_definition.command()),
            )
    }

    async fn execute(&self, matches: &ArgMatches) -> Result<()> {
        let (name, sub_matches) = matches
            .subcommand()
            .ok_or_else(|| anyhow!("No subcommand given"))?;

        for command_definition in &self.command_definitions {
            if command_definition.command().get_name() == name {
                return command_definition.execute(sub_matches).await;
            }
        }

        Err(anyhow!("Unknown subcommand: {}", name))
    }
}

pub fn get_required<T: Clone + Send + Sync + 'static>(
    matches: &ArgMatches,
    arg_id: &str,
) -> Result<T> {
    get(matches, arg_id).ok_or_else(|| anyhow!("Required argument `{}` is not present", arg_id))
}

pub fn get<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, arg_id: &str) -> Option<T> {
    matches.get_one::<T>(arg_id).cloned()
}

pub fn schema_file_arg() -> Arg {
    Arg::new("schema")
        .help("The path to the GraphQL schema (SDL) file.")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .index(1)
}

pub fn config_arg() -> Arg {
    Arg::new("config")
        .help("Configuration file")
        .long_help(
            "The TOML configuration file. If not specified, `gql-validate.toml` is used when present.",
        )
        .short('c')
        .long("config")
        .required(false)
        .value_parser(clap::value_parser!(PathBuf))
        .num_args(1)
}

pub fn output_arg() -> Arg {
    Arg::new("output")
        .help("Output file path")
        .long_help("If specified, the output will be written to this file path instead of stdout.")
        .short('o')
        .long("output")
        .required(false)
        .value_parser(clap::value_parser!(PathBuf))
        .num_args(1)
}
