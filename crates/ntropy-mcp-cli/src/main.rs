// crates/ntropy-mcp-cli/src/main.rs
// ============================================================================
// Module: Ntropy MCP CLI Entry Point
// Description: Command dispatcher for the Ntropy MCP server and tools.
// Purpose: Serve MCP, inspect the tool catalogue, and run one-shot tool calls.
// Dependencies: clap, ntropy-mcp, ntropy-mcp-config, serde, thiserror, tokio.
// ============================================================================

//! ## Overview
//! The `ntropy-mcp` binary starts the MCP server on the configured transport,
//! lists the tool catalogue, runs a single tool call against the remote API,
//! and validates configuration files. Inputs are untrusted: tool input is
//! read with a size limit and validated by the same dispatcher the server
//! uses. The API credential is never echoed.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use ntropy_mcp::McpServer;
use ntropy_mcp_config::ServerTransport;
use ntropy_mcp_config::ServiceConfig;
use ntropy_mcp_config::env_api_key;
use ntropy_mcp_contract::ToolDefinition;
use ntropy_mcp_contract::ToolRegistry;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "ntropy-mcp", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Ntropy MCP server.
    Serve(ServeCommand),
    /// Tool catalogue and one-shot tool calls.
    Tools {
        /// Selected tools subcommand.
        #[command(subcommand)]
        command: ToolsCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Configuration and credential sources shared by remote-facing commands.
#[derive(Args, Debug, Clone)]
struct RemoteArgs {
    /// Optional config file path (defaults to ntropy-mcp.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// API key (overrides `NTROPY_API_KEY` and `remote.api_key`).
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Config and credential sources.
    #[command(flatten)]
    remote: RemoteArgs,
}

/// Tools subcommands.
#[derive(Subcommand, Debug)]
enum ToolsCommand {
    /// List the tool catalogue.
    List(ToolsListCommand),
    /// Invoke one tool and print its result.
    Call(ToolsCallCommand),
}

/// Arguments for `tools list`.
#[derive(Args, Debug)]
struct ToolsListCommand {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Arguments for `tools call`.
#[derive(Args, Debug)]
struct ToolsCallCommand {
    /// Tool name to invoke.
    #[arg(value_name = "TOOL")]
    tool: String,
    /// Tool input source.
    #[command(flatten)]
    input: ToolInputArgs,
    /// Config and credential sources.
    #[command(flatten)]
    remote: RemoteArgs,
}

/// Tool input arguments for one-shot calls.
#[derive(Args, Debug, Clone)]
struct ToolInputArgs {
    /// JSON input string for the tool arguments.
    #[arg(long, value_name = "JSON", conflicts_with = "input_file")]
    input: Option<String>,
    /// Path to a JSON file containing the tool arguments.
    #[arg(long, value_name = "PATH", conflicts_with = "input")]
    input_file: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate an Ntropy MCP configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to ntropy-mcp.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Output format for listings.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Pretty-printed JSON.
    Json,
    /// One line per tool.
    Text,
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

/// Executes the CLI command dispatcher.
fn run(cli: Cli) -> CliResult<ExitCode> {
    if cli.show_version {
        write_stdout_line(&format!("ntropy-mcp {}", env!("CARGO_PKG_VERSION")))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Serve(command) => command_serve(&command),
        Commands::Tools { command } => command_tools(command),
        Commands::Config { command } => command_config(command),
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
///
/// The remote client is blocking, so the server is built outside any async
/// runtime; stdio is served on the calling thread.
fn command_serve(command: &ServeCommand) -> CliResult<ExitCode> {
    let server = build_server(&command.remote)?;
    match server.config().transport {
        ServerTransport::Stdio => server
            .serve_stdio()
            .map_err(|err| CliError::new(format!("server failed: {err}")))?,
        ServerTransport::Http | ServerTransport::Sse => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| CliError::new(format!("runtime init failed: {err}")))?;
            runtime
                .block_on(server.serve())
                .map_err(|err| CliError::new(format!("server failed: {err}")))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Loads configuration, resolves the credential, and builds the server.
fn build_server(args: &RemoteArgs) -> CliResult<McpServer> {
    let config = ServiceConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let api_key = config
        .resolve_api_key(args.api_key.as_deref(), env_api_key())
        .map_err(|err| CliError::new(err.to_string()))?;
    McpServer::from_config(config, api_key)
        .map_err(|err| CliError::new(format!("failed to initialize server: {err}")))
}

// ============================================================================
// SECTION: Tools Commands
// ============================================================================

/// Dispatches tools subcommands.
fn command_tools(command: ToolsCommand) -> CliResult<ExitCode> {
    match command {
        ToolsCommand::List(command) => command_tools_list(&command),
        ToolsCommand::Call(command) => command_tools_call(&command),
    }
}

/// Executes `tools list`.
fn command_tools_list(command: &ToolsListCommand) -> CliResult<ExitCode> {
    let definitions = ToolRegistry::new().definitions();
    let output = match command.format {
        OutputFormat::Json => render_json(&definitions)?,
        OutputFormat::Text => render_tools_text(&definitions),
    };
    write_stdout_line(output.trim_end())
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `tools call`, printing the result or the structured error.
fn command_tools_call(command: &ToolsCallCommand) -> CliResult<ExitCode> {
    let server = build_server(&command.remote)?;
    let arguments = read_tool_input(&command.input, server.config().max_body_bytes)?;
    let (body, code) = match server.router().dispatch(&command.tool, &arguments) {
        Ok(output) if output.is_error => (output.value, ExitCode::FAILURE),
        Ok(output) => (output.value, ExitCode::SUCCESS),
        Err(error) => (json!({ "error": error.payload() }), ExitCode::FAILURE),
    };
    write_stdout_line(&render_json(&body)?)
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(code)
}

/// Renders tool definitions as `name: description` lines.
fn render_tools_text(definitions: &[ToolDefinition]) -> String {
    let width = definitions.iter().map(|def| def.name.as_str().len()).max().unwrap_or(0);
    definitions
        .iter()
        .map(|def| format!("{:<width$}  {}\n", def.name.as_str(), def.description))
        .collect()
}

/// Renders a value as pretty JSON.
fn render_json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to render json: {err}")))
}

/// Reads tool arguments from a flag or file; no input means `{}`.
fn read_tool_input(args: &ToolInputArgs, max_bytes: usize) -> CliResult<Value> {
    if let Some(input) = &args.input {
        if input.len() > max_bytes {
            return Err(CliError::new(format!(
                "tool input exceeds size limit ({} > {max_bytes} bytes)",
                input.len()
            )));
        }
        return serde_json::from_str(input)
            .map_err(|err| CliError::new(format!("invalid tool input json: {err}")));
    }
    if let Some(path) = &args.input_file {
        let bytes = read_bytes_with_limit(path, max_bytes).map_err(|err| match err {
            ReadLimitError::Io(err) => {
                CliError::new(format!("failed to read {}: {err}", path.display()))
            }
            ReadLimitError::TooLarge { size, limit } => CliError::new(format!(
                "tool input {} exceeds size limit ({size} > {limit} bytes)",
                path.display()
            )),
        })?;
        return serde_json::from_slice(&bytes)
            .map_err(|err| CliError::new(format!("invalid tool input json: {err}")));
    }
    Ok(json!({}))
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = ServiceConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line(&format!(
        "config ok: transport={} remote={}",
        config.server.transport.as_str(),
        config.remote.base_url
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge { size, limit: max_bytes });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge { size, limit: max_bytes });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

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

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
