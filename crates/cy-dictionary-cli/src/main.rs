// crates/cy-dictionary-cli/src/main.rs
// ============================================================================
// Module: Dictionary CLI Entry Point
// Description: Command dispatcher for the dictionary server and store tools.
// Purpose: Run the HTTP server and inspect or reset the durable store offline.
// Dependencies: clap, cy-dictionary-config, cy-dictionary-http, tokio
// ============================================================================

//! ## Overview
//! The `cy-dictionary` binary starts the HTTP server, validates configuration,
//! and offers operator commands against the `SQLite` store: a paged JSON
//! listing of entries with their upload records, and removal of test phrases.
//! Security posture: config and arguments are untrusted and validated before
//! any store is opened.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use cy_dictionary_config::DictionaryConfig;
use cy_dictionary_config::config_toml_example;
use cy_dictionary_core::ConflictAwareRepository;
use cy_dictionary_core::DictionaryService;
use cy_dictionary_core::PageRequest;
use cy_dictionary_http::DictionaryServer;
use cy_dictionary_store_sqlite::SqliteDictionaryStore;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default page size for `store list`.
const DEFAULT_LIST_LIMIT: u32 = 100;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "cy-dictionary", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the dictionary HTTP server.
    Serve(ConfigArgs),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Offline store utilities (sqlite store only).
    Store {
        /// Selected store subcommand.
        #[command(subcommand)]
        command: StoreCommand,
    },
}

/// Shared config path argument.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Optional config file path (defaults to cy-dictionary.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a dictionary configuration file.
    Validate(ConfigArgs),
    /// Print a complete example configuration.
    Example,
}

/// Store subcommands.
#[derive(Subcommand, Debug)]
enum StoreCommand {
    /// List stored entries with their upload records as JSON.
    List(StoreListCommand),
    /// Delete every entry carrying the configured test prefix (test support only).
    DeleteTestPhrases(ConfigArgs),
}

/// Arguments for `store list`.
#[derive(Args, Debug)]
struct StoreListCommand {
    /// Config file selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Number of entries to skip, in phrase order.
    #[arg(long, default_value_t = 0)]
    offset: u64,
    /// Maximum entries to return (1 to 1000).
    #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
    limit: u32,
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
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => command_serve(args).await,
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Store {
            command,
        } => command_store(command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(args: ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(&args)?;
    let server = tokio::task::spawn_blocking(move || DictionaryServer::from_config(&config))
        .await
        .map_err(|err| CliError::new(format!("server init failed: init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    write_stderr_line(&format!("cy-dictionary: listening on http://{}", server.bind_addr()))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(args) => {
            load_config(&args)?;
            write_stdout_line("config ok")
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
        ConfigCommand::Example => {
            write_stdout_line(config_toml_example().trim_end())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Loads and validates configuration.
fn load_config(args: &ConfigArgs) -> CliResult<DictionaryConfig> {
    DictionaryConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

// ============================================================================
// SECTION: Store Commands
// ============================================================================

/// Dictionary service over the durable store.
type StoreService = DictionaryService<ConflictAwareRepository<SqliteDictionaryStore>>;

/// Dispatches store subcommands.
fn command_store(command: StoreCommand) -> CliResult<ExitCode> {
    match command {
        StoreCommand::List(command) => command_store_list(&command),
        StoreCommand::DeleteTestPhrases(args) => command_store_delete(&args),
    }
}

/// Executes `store list`.
fn command_store_list(command: &StoreListCommand) -> CliResult<ExitCode> {
    let service = open_store(&load_config(&command.config)?)?;
    let page = service
        .list_entries(PageRequest::new(command.offset, command.limit))
        .map_err(|err| CliError::new(format!("store list failed: {err}")))?;
    write_json(&page)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `store delete-test-phrases`.
fn command_store_delete(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    let prefix = test_phrase_prefix(&config)?;
    let service = open_store(&config)?;
    let deleted = service
        .delete_test_phrases(prefix)
        .map_err(|err| CliError::new(format!("delete test phrases failed: {err}")))?;
    write_json(&serde_json::json!({
        "prefix": prefix,
        "deleted": deleted,
    }))?;
    Ok(ExitCode::SUCCESS)
}

/// Returns the reserved test prefix, refusing when test support is disabled.
fn test_phrase_prefix(config: &DictionaryConfig) -> CliResult<&str> {
    if !config.testing_support.enabled {
        return Err(CliError::new(
            "delete-test-phrases requires testing_support.enabled = true".to_string(),
        ));
    }
    Ok(&config.testing_support.test_phrase_prefix)
}

/// Opens the configured `SQLite` store behind the dictionary service.
fn open_store(config: &DictionaryConfig) -> CliResult<StoreService> {
    let sqlite_config = config.store.sqlite_config().ok_or_else(|| {
        CliError::new("store commands require store.type = \"sqlite\"".to_string())
    })?;
    let store = SqliteDictionaryStore::new(sqlite_config)
        .map_err(|err| CliError::new(format!("failed to open store: {err}")))?;
    Ok(DictionaryService::new(ConflictAwareRepository::new(store)))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Writes a value as one line of JSON to stdout.
fn write_json(value: &impl serde::Serialize) -> CliResult<()> {
    let payload = serde_json::to_string(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    write_stdout_line(&payload).map_err(|err| CliError::new(output_error("stdout", &err)))
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
