// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};
use colored::Colorize;
use serde_json::{Map, Value};
use validation_model::{FieldCoordinate, RequestContext, ResolveInfo};
use validation_resolver::{FnResolver, ResolutionError, ResolverMap, ValidationLayer};

use super::{
    command::{CommandDefinition, config_arg, get_required, schema_file_arg},
    util::load_inputs,
};

pub(crate) struct ValidateCommandDefinition {}

#[async_trait]
impl CommandDefinition for ValidateCommandDefinition {
    fn command(&self) -> Command {
        Command::new("validate")
            .about("Validate an argument payload for a field")
            .arg(schema_file_arg())
            .arg(config_arg())
            .arg(
                Arg::new("field")
                    .help("The field, as `Type.field`")
                    .long("field")
                    .short('f')
                    .required(true)
                    .num_args(1),
            )
            .arg(
                Arg::new("arguments")
                    .help("The field's arguments, as a JSON object")
                    .long("arguments")
                    .short('a')
                    .required(false)
                    .default_value("{}")
                    .num_args(1),
            )
    }

    async fn execute(&self, matches: &ArgMatches) -> Result<()> {
        let (graph, config) = load_inputs(matches)?;

        let field: String = get_required(matches, "field")?;
        let coordinate = FieldCoordinate::parse(&field)
            .ok_or_else(|| anyhow!("Invalid field '{}', expected `Type.field`", field))?;

        let arguments: String = get_required(matches, "arguments")?;
        let arguments = parse_arguments(&arguments)?;

        let layer = ValidationLayer::new(config, &graph)?;

        if !layer.is_intercepted(&coordinate.type_name, &coordinate.field_name) {
            eprintln!(
                "{}",
                format!("Arguments of '{coordinate}' are not validated").yellow()
            );
        }

        // The field resolves to its (coerced) arguments
        let mut resolvers = ResolverMap::new();
        resolvers.insert(
            &coordinate.type_name,
            &coordinate.field_name,
            Arc::new(FnResolver::new(|arguments, _, _| Ok(Value::Object(arguments)))),
        );
        layer.install(&mut resolvers);

        let result = resolvers
            .resolve(
                &coordinate.type_name,
                &coordinate.field_name,
                arguments,
                &RequestContext::default(),
                &ResolveInfo::new(&coordinate.type_name, &coordinate.field_name),
            )
            .await;

        match result {
            Ok(coerced) => {
                println!("{}", serde_json::to_string_pretty(&coerced)?);
                Ok(())
            }
            Err(ResolutionError::Validation(failure)) => {
                for argument_failure in &failure.failures {
                    let path = match argument_failure.path.as_str() {
                        "" => "/",
                        path => path,
                    };
                    println!("{} {}", path.red(), argument_failure.message);
                }
                Err(anyhow!(
                    "{} invalid arguments for '{}'",
                    failure.failures.len(),
                    failure.coordinate
                ))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn parse_arguments(arguments: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(arguments) {
        Ok(Value::Object(arguments)) => Ok(arguments),
        Ok(_) => Err(anyhow!("Arguments must be a JSON object")),
        Err(e) => Err(anyhow!("Failed to parse arguments: {}", e)),
    }
}
