//! APDL CLI - Drive a download agreement from the command line
//!
//! State is kept in a local sled database by default, so a sequence of
//! invocations walks one agreement through its lifecycle.
//!
//! # Usage
//!
//! ```bash
//! apdl init
//! apdl request ownerK userK 1000 01/01/2999 1.2.3.4 9000
//! apdl status
//! apdl --now 01/02/2999 refund
//! apdl balance userK
//!
//! # Raw dispatcher call, chaincode-style names accepted
//! apdl invoke download_request ownerK userK 1000 01/01/2999 1.2.3.4 9000
//!
//! # Environment overrides
//! APDL__PROTOCOL__SIGNATURE_POLICY=all_pairs apdl penalize msg r1,s1 r2,s2
//! ```

mod config;
mod display;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use apdl_core::{
    AgreementRecord, AgreementStateMachine, Clock, Dispatcher, Invocation, ManualClock,
    SystemClock,
};
use apdl_ledger::{LedgerStore, MemoryStore, SledStore};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{AppConfig, LoggingConfig, StorageBackend};

type CliDispatcher = Dispatcher<Arc<dyn LedgerStore>, Arc<dyn Clock>>;

/// APDL - escrowed download agreements between a software owner and a user
#[derive(Parser, Debug)]
#[command(name = "apdl")]
#[command(author = "APDL Contributors")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, global = true, env = "APDL_CONFIG")]
    config: Option<String>,

    /// Directory of the sled ledger database
    #[arg(long, global = true, env = "APDL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Ledger backend (memory, sled)
    #[arg(long, global = true, env = "APDL_BACKEND")]
    backend: Option<StorageBackend>,

    /// Evaluate the operation at this instant (RFC 3339, or a date in the expiry format)
    #[arg(long, global = true)]
    now: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "APDL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, global = true, env = "APDL_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reset the agreement to a fresh, uninitialized record
    Init,

    /// Open the agreement and place the deposit
    #[command(alias = "download-request")]
    Request {
        owner_key: String,
        user_key: String,
        deposit: String,
        /// Expiry date, MM/DD/YYYY unless configured otherwise
        expiry: String,
        user_ip: String,
        user_port: String,
    },

    /// Apply the penalty, given both parties' signatures over MESSAGE
    #[command(alias = "penalty")]
    Penalize {
        message: String,
        /// Owner signature as "r,s"
        owner_sig: String,
        /// User signature as "r,s"
        user_sig: String,
    },

    /// Return the deposit to the user after expiry
    Refund,

    /// Show the stored agreement record
    Status,

    /// Show a participant's balance
    Balance { key: String },

    /// Call the dispatcher directly with an operation name and raw arguments
    Invoke {
        function: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut app_config = AppConfig::load(cli.config.as_deref())?;

    // Override with CLI arguments
    if let Some(data_dir) = cli.data_dir.clone() {
        app_config.storage.path = data_dir;
    }
    if let Some(backend) = cli.backend {
        app_config.storage.backend = backend;
    }
    if let Some(level) = cli.log_level.clone() {
        app_config.logging.level = level;
    }
    if let Some(format) = cli.log_format.clone() {
        app_config.logging.format = format;
    }

    init_logging(&app_config.logging);

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?app_config.storage.backend,
        policy = ?app_config.protocol.signature_policy,
        "starting apdl"
    );

    let clock = init_clock(cli.now.as_deref(), &app_config.protocol.expiry_format)?;
    let store = open_store(&app_config)?;
    let dispatcher = Dispatcher::new(AgreementStateMachine::with_clock(
        store,
        clock,
        app_config.protocol.clone(),
    ));

    let ok = run(&dispatcher, cli.command)?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn run(dispatcher: &CliDispatcher, command: Commands) -> anyhow::Result<bool> {
    let invocation = match command {
        Commands::Init => Invocation::new("initialize", Vec::<String>::new()),
        Commands::Request {
            owner_key,
            user_key,
            deposit,
            expiry,
            user_ip,
            user_port,
        } => Invocation::new(
            "request",
            [owner_key, user_key, deposit, expiry, user_ip, user_port],
        ),
        Commands::Penalize {
            message,
            owner_sig,
            user_sig,
        } => Invocation::new("penalize", [message, owner_sig, user_sig]),
        Commands::Refund => Invocation::new("refund", Vec::<String>::new()),
        Commands::Status => {
            let response =
                dispatcher.invoke(&Invocation::new("get_status", Vec::<String>::new()));
            if !response.is_ok() {
                return Ok(display::response(&response));
            }
            match serde_json::from_slice::<AgreementRecord>(&response.payload) {
                Ok(record) => display::record(&record, &response.payload),
                Err(_) => println!("{}", response.payload_str()),
            }
            return Ok(true);
        }
        Commands::Balance { key } => {
            let balance = dispatcher
                .machine()
                .balance_of(&key.as_str().into())
                .with_context(|| format!("reading balance of {key}"))?;
            display::labeled(&key, &balance.to_string());
            return Ok(true);
        }
        Commands::Invoke { function, args } => Invocation::new(function, args),
    };

    Ok(display::response(&dispatcher.invoke(&invocation)))
}

/// Initialize tracing/logging on stderr
fn init_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            subscriber
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
}

fn init_clock(now: Option<&str>, date_format: &str) -> anyhow::Result<Arc<dyn Clock>> {
    let clock: Arc<dyn Clock> = match now {
        Some(raw) => Arc::new(ManualClock::new(parse_instant(raw, date_format)?)),
        None => Arc::new(SystemClock),
    };
    Ok(clock)
}

/// RFC 3339 timestamp, or a calendar date taken as midnight UTC
fn parse_instant(raw: &str, date_format: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, date_format)
        .with_context(|| format!("--now '{raw}' is neither RFC 3339 nor {date_format}"))?;
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .with_context(|| format!("--now '{raw}' has no midnight"))
}

fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn LedgerStore>> {
    let store: Arc<dyn LedgerStore> = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("memory backend selected; state is discarded on exit");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::Sled => {
            let path = &config.storage.path;
            let store = SledStore::open(path)
                .with_context(|| format!("opening ledger at {}", path.display()))?;
            Arc::new(store)
        }
    };
    Ok(store)
}
