//! `meetsched` command-line front end.
//!
//! # Responsibility
//! - Decode requests (strict JSON candidates, RFC 3339 instants, meeting ids).
//! - Call the core with typed values and print JSON responses.
//! - Map core error kinds to exit codes and JSON error envelopes.
//!
//! ## Usage
//!
//! ```sh
//! # Create a meeting from a JSON file
//! meetsched propose --input meeting.json
//!
//! # ...or from stdin
//! cat meeting.json | meetsched propose
//!
//! # Look a meeting up by id
//! meetsched get 0b9f6c1e-3f0c-4c39-9a51-2d9e2f3f7b10
//!
//! # Meetings of one participant
//! meetsched list --participant max@x.com
//!
//! # Meetings strictly inside a time window
//! meetsched list --start 2020-09-19T12:00:00Z --end 2020-09-19T18:00:00Z
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use meetsched_core::{
    core_version, init_logging, parse_meeting_id, parse_timestamp, CoreConfig, ErrorKind,
    Meeting, MeetingDraft, MeetingRuntime, MeetingValidationError, ServiceError,
};
use serde::Serialize;
use serde_json::json;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
const EXIT_INTERNAL: i32 = 1;

#[derive(Parser)]
#[command(name = "meetsched", version, about = "Meeting scheduling without double-booking")]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for `MEETSCHED_*` environment settings.
#[derive(Args)]
struct SettingsArgs {
    /// SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Number of pooled connections
    #[arg(long, global = true)]
    pool_size: Option<usize>,
    /// Upper bound for every storage wait, in milliseconds
    #[arg(long, global = true)]
    store_timeout_ms: Option<u64>,
    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Absolute directory for rolling log files (logging is off when unset)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

impl SettingsArgs {
    fn resolve(self) -> Result<CoreConfig> {
        let mut config = CoreConfig::from_env().context("invalid MEETSCHED_* environment")?;
        if let Some(db) = self.db {
            config.db_path = db;
        }
        if let Some(pool_size) = self.pool_size {
            config.pool_size = pool_size;
        }
        if let Some(millis) = self.store_timeout_ms {
            config.store_timeout = Duration::from_millis(millis);
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(dir) = self.log_dir {
            config.log_dir = Some(dir);
        }
        config.validate().context("invalid command-line settings")?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the core version
    Version,
    #[command(flatten)]
    Store(StoreCommand),
}

/// Commands that open the meeting database.
#[derive(Subcommand)]
enum StoreCommand {
    /// Create a meeting from a JSON body
    Propose {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Show one meeting by id
    Get {
        /// Meeting id
        id: String,
    },
    /// List meetings by participant or by time window
    List {
        /// Participant email (exactly one)
        #[arg(
            long,
            conflicts_with_all = ["start", "end"],
            required_unless_present_all = ["start", "end"]
        )]
        participant: Option<String>,
        /// Window start, RFC 3339 with offset
        #[arg(long, requires = "end")]
        start: Option<String>,
        /// Window end, RFC 3339 with offset
        #[arg(long, requires = "start")]
        end: Option<String>,
    },
}

/// Caller-visible failure with its exit code.
#[derive(Debug, Serialize)]
struct Failure {
    kind: &'static str,
    message: String,
    #[serde(skip)]
    exit_code: i32,
}

impl Failure {
    fn from_kind(kind: ErrorKind, message: String) -> Self {
        let exit_code = match kind {
            ErrorKind::Validation => 2,
            ErrorKind::Conflict => 3,
            ErrorKind::NotFound => 4,
            ErrorKind::Storage => 5,
        };
        Self {
            kind: kind.as_str(),
            message,
            exit_code,
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Validation, message.into())
    }
}

impl From<ServiceError> for Failure {
    fn from(value: ServiceError) -> Self {
        Self::from_kind(value.kind(), value.to_string())
    }
}

impl From<MeetingValidationError> for Failure {
    fn from(value: MeetingValidationError) -> Self {
        Self::invalid(value.to_string())
    }
}

type Outcome = std::result::Result<serde_json::Value, Failure>;

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            EXIT_INTERNAL
        }
    };
    process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let command = match cli.command {
        Commands::Version => return emit(Ok(json!({ "version": core_version() }))),
        Commands::Store(command) => command,
    };

    let config = cli.settings.resolve()?;
    if let Some(dir) = &config.log_dir {
        init_logging(&config.log_level, dir).context("failed to initialize logging")?;
    }

    let runtime = MeetingRuntime::start(&config)
        .with_context(|| format!("failed to open database {}", config.db_path.display()))?;
    let outcome = execute(&runtime, command);
    if let Err(err) = runtime.shutdown(SHUTDOWN_GRACE) {
        log::warn!("event=cli_shutdown module=cli status=error error={err}");
    }

    emit(outcome)
}

fn execute(runtime: &MeetingRuntime, command: StoreCommand) -> Outcome {
    match command {
        StoreCommand::Propose { input } => {
            let body = read_input(input.as_ref())
                .map_err(|err| Failure::invalid(format!("failed to read request body: {err}")))?;
            let draft: MeetingDraft = serde_json::from_str(&body)
                .map_err(|err| Failure::invalid(format!("invalid meeting body: {err}")))?;
            let meeting = runtime.scheduler().propose_meeting(&draft)?;
            Ok(json!({ "id": meeting.id.to_string() }))
        }
        StoreCommand::Get { id } => {
            let id = parse_meeting_id(&id)?;
            let meeting = runtime.queries().get_by_id(id)?;
            to_value(&meeting)
        }
        StoreCommand::List {
            participant: Some(email),
            ..
        } => meetings_envelope(runtime.queries().get_by_participant(&email)?),
        StoreCommand::List {
            start: Some(start),
            end: Some(end),
            ..
        } => {
            let start = parse_timestamp(&start)?;
            let end = parse_timestamp(&end)?;
            meetings_envelope(runtime.queries().get_by_window(start, end)?)
        }
        StoreCommand::List { .. } => Err(Failure::invalid(
            "expected either --participant or both --start and --end",
        )),
    }
}

#[derive(Serialize)]
struct MeetingsEnvelope {
    meetings: Vec<Meeting>,
}

fn meetings_envelope(meetings: Vec<Meeting>) -> Outcome {
    to_value(&MeetingsEnvelope { meetings })
}

fn to_value(value: &impl Serialize) -> Outcome {
    serde_json::to_value(value).map_err(|err| {
        Failure::from_kind(ErrorKind::Storage, format!("failed to encode response: {err}"))
    })
}

fn emit(outcome: Outcome) -> Result<i32> {
    match outcome {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(0)
        }
        Err(failure) => {
            println!("{}", serde_json::to_string_pretty(&failure)?);
            Ok(failure.exit_code)
        }
    }
}

fn read_input(path: Option<&PathBuf>) -> io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}
