//! CLI tool for inspecting flow step configuration
//!
//! Run with: cargo run --bin flow-step -- [OPTIONS] <COMMAND>

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pdfgen_flow_steps::callback::CallbackRegistry;
use pdfgen_flow_steps::step::{GeneratePdfInput, NormalizedStep, Route, StepInput};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Inspect flow step inputs", long_about = None)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the JSON schema of a step's inputs
    Schema {
        #[arg(value_enum, default_value_t = StepKind::ApiCall)]
        step: StepKind,
    },

    /// Normalize an API call step input without sending anything
    Normalize {
        /// File holding the step input as JSON
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StepKind {
    ApiCall,
    GeneratePdf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

fn print(format: Format, value: &serde_json::Value) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(value)?),
        Format::Yaml => println!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Schema { step } => {
            let schema = match step {
                StepKind::ApiCall => schemars::schema_for!(StepInput),
                StepKind::GeneratePdf => schemars::schema_for!(GeneratePdfInput),
            };
            print(cli.format, &serde_json::to_value(schema)?)?;
        }
        Commands::Normalize { input } => {
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let step_input: StepInput = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", input.display()))?;
            let step = NormalizedStep::from_input(&step_input, &CallbackRegistry::with_builtins())?;
            let route = match Route::select(&step_input) {
                Some(Route::Verb(verb)) => json!({ "verb": verb.as_str() }),
                Some(Route::Action(action)) => json!({ "action": action.name() }),
                None => serde_json::Value::Null,
            };
            print(
                cli.format,
                &json!({
                    "route": route,
                    "options": step.options,
                    "callbackData": step.callback_data,
                    "callback": step.callbacks.map(|c| json!({
                        "event": c.event,
                        "handler": c.handler.name(),
                    })),
                }),
            )?;
        }
    }

    Ok(())
}
