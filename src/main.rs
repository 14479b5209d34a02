//! Purpose: `dialdex` CLI entry point and command definitions.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All book mutations go through `api::LocalClient` or the server.

use std::path::PathBuf;

use clap::{Parser, Subcommand, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;

use dialdex::api::{Error, ErrorKind, to_exit_code};

mod command_dispatch;

use command_dispatch::dispatch_command;

#[derive(Debug, Parser)]
#[command(name = "dialdex", version, about = "Phonebook service and CLI")]
struct Cli {
    /// Data directory holding book files (default: $DIALDEX_DIR, else ~/.dialdex/books)
    #[arg(long, global = true, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Book to operate on (default: home)
    #[arg(long, global = true, value_name = "NAME")]
    book: Option<String>,

    /// Run phonebook commands against a server instead of local book files
    #[arg(long, global = true, value_name = "URL")]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// host:port to bind (default: 127.0.0.1:$PORT, else 127.0.0.1:4151)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Maximum accepted request body size in bytes
        #[arg(long, default_value_t = 64 * 1024, value_name = "BYTES")]
        max_body_bytes: u64,
    },
    /// List every person in the book
    List,
    /// Add a person
    Add { name: String, number: String },
    /// Fetch one person by id
    Get { id: String },
    /// Replace a person's name and number
    Update {
        id: String,
        name: String,
        number: String,
    },
    /// Remove a person by id
    Remove { id: String },
    /// Print the phonebook summary (count + timestamp)
    Info,
    /// Generate shell completions
    Completion { shell: Shell },
}

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage).with_message(clap_error_summary(&err)));
            }
        },
    };

    dispatch_command(cli)
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid arguments");
    first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string()
}

fn emit_error(err: &Error) {
    let mut body = serde_json::Map::new();
    body.insert(
        "kind".to_string(),
        serde_json::Value::String(format!("{:?}", err.kind())),
    );
    body.insert(
        "message".to_string(),
        serde_json::Value::String(err.message().unwrap_or("error").to_string()),
    );
    if let Some(hint) = err.hint() {
        body.insert(
            "hint".to_string(),
            serde_json::Value::String(hint.to_string()),
        );
    }
    if let Some(path) = err.path() {
        body.insert(
            "path".to_string(),
            serde_json::Value::String(path.to_string_lossy().to_string()),
        );
    }
    let envelope = serde_json::json!({ "error": body });
    eprintln!("{envelope}");
}
