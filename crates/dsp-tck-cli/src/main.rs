// crates/dsp-tck-cli/src/main.rs
// ============================================================================
// Module: DSP TCK CLI Entry Point
// Description: Command dispatcher for TCK runs and configuration inspection.
// Purpose: Load run properties, execute the scenario suites and report.
// Dependencies: clap, dsp-tck-core, dsp-tck-suite, thiserror
// ============================================================================

//! ## Overview
//! `dsp-tck run` loads an optional TOML properties file, applies `-p
//! key=value` overrides, runs every scenario group and prints progress and a
//! summary. The exit code is non-zero when any scenario fails.
//! `dsp-tck config show` prints the effective properties.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use dsp_tck_core::TckProperties;
use dsp_tck_suite::TckRuntime;
use dsp_tck_suite::all_groups;
use dsp_tck_suite::runtime::ConsoleReporter;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "dsp-tck", version, about = "Dataspace Protocol compatibility kit")]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the verification scenarios.
    Run(RunCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Property sources shared by commands.
#[derive(Args, Debug)]
struct PropertyArgs {
    /// TOML properties file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Property override, applied after the file.
    #[arg(short = 'p', long = "property", value_name = "KEY=VALUE")]
    properties: Vec<String>,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Property sources.
    #[command(flatten)]
    sources: PropertyArgs,
    /// Only run scenarios whose display name contains this text.
    #[arg(long, value_name = "TEXT")]
    filter: Option<String>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective properties.
    Show(PropertyArgs),
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self { message }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the selected command.
fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Run(command) => command_run(command),
        Commands::Config { command } => match command {
            ConfigCommand::Show(sources) => command_config_show(&sources),
        },
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Runs every scenario group and reports the outcome.
fn command_run(command: RunCommand) -> CliResult<ExitCode> {
    let properties =
        load_properties(command.sources.config.as_deref(), &command.sources.properties)?;
    let mut runtime = TckRuntime::new()
        .properties(&properties)
        .add_suite(all_groups())
        .listener(Arc::new(ConsoleReporter::stdout()));
    if let Some(filter) = command.filter {
        runtime = runtime.display_name_matching(move |name| name.contains(&filter));
    }
    let summary = runtime.execute().map_err(|err| CliError::new(format!("TCK run failed: {err}")))?;
    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Prints the effective properties as `key = value` lines.
fn command_config_show(sources: &PropertyArgs) -> CliResult<ExitCode> {
    let properties = load_properties(sources.config.as_deref(), &sources.properties)?;
    for line in property_lines(&properties) {
        write_stdout_line(&line)
            .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads the properties file, then applies overrides in order.
fn load_properties(config: Option<&Path>, overrides: &[String]) -> CliResult<TckProperties> {
    let mut properties = match config {
        Some(path) => {
            TckProperties::from_toml_file(path).map_err(|err| CliError::new(err.to_string()))?
        }
        None => TckProperties::new(),
    };
    for entry in overrides {
        properties.apply_override(entry).map_err(|err| CliError::new(err.to_string()))?;
    }
    Ok(properties)
}

/// Formats properties in key order.
fn property_lines(properties: &TckProperties) -> Vec<String> {
    properties.iter().map(|(key, value)| format!("{key} = {value}")).collect()
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
