//! Codexium - verify, sign, search and read document cartridges
//!
//! Command output goes to stdout; all logging goes to stderr.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use codexium_core::config::paths;

mod config_cli;
mod docs_cli;
mod search_cli;
mod trust_cli;

/// Trace modules for detailed logging
#[derive(Debug, Clone, ValueEnum)]
enum TraceModule {
    Trust,
    Config,
    Search,
    All,
}

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "codexium",
    about = "Verify, sign and search Codexium Magnus cartridges",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Enable module tracing (comma-separated: trust,config,search,all)
    #[clap(long, value_delimiter = ',', global = true)]
    trace: Vec<TraceModule>,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Override the trust store location
    #[clap(long, global = true)]
    trust_store: Option<PathBuf>,

    /// Override the user configuration file
    #[clap(long, global = true)]
    user_config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Classify a cartridge's authenticity
    Verify {
        /// Cartridge file
        cartridge: PathBuf,

        /// Print the outcome as JSON
        #[clap(long)]
        json: bool,

        /// Also write a report (.md or .json)
        #[clap(long)]
        report: Option<PathBuf>,
    },

    /// Manage trusted publisher keys
    Trust {
        #[clap(subcommand)]
        command: trust_cli::TrustCommand,
    },

    /// Generate a publisher signing key
    #[cfg(feature = "ed25519")]
    Keygen {
        /// Where to write the secret key
        #[clap(long)]
        out: PathBuf,

        /// Overwrite an existing key file
        #[clap(long)]
        force: bool,
    },

    /// Sign a cartridge, writing its sidecar manifest
    #[cfg(feature = "ed25519")]
    Sign {
        /// Cartridge file
        cartridge: PathBuf,

        /// Secret key file written by `keygen`
        #[clap(long)]
        key: PathBuf,
    },

    /// Full-text search inside a cartridge
    Search(search_cli::SearchArgs),

    /// List the documents in a cartridge
    Docs {
        /// Cartridge file
        cartridge: PathBuf,

        /// Show the navigation outline instead of a flat list
        #[clap(long)]
        tree: bool,

        /// Print as JSON
        #[clap(long)]
        json: bool,
    },

    /// Print one document's content
    Show {
        /// Cartridge file
        cartridge: PathBuf,

        /// Document id, as listed by `docs`
        id: String,
    },

    /// Show or change reader configuration
    Config {
        #[clap(subcommand)]
        command: config_cli::ConfigCommand,
    },
}

fn initialize_tracing(log_level: &LogLevel, trace_modules: &[TraceModule]) {
    let mut filter = EnvFilter::new(log_level.to_filter_directive());

    for module in trace_modules {
        let directive = match module {
            TraceModule::Trust => "codexium_core::trust=trace",
            TraceModule::Config => "codexium_core::config=trace",
            TraceModule::Search => "codexium_core::search=trace",
            TraceModule::All => "codexium_core=trace",
        };

        if let Ok(parsed) = directive.parse() {
            filter = filter.add_directive(parsed);
        }
    }

    if !trace_modules.is_empty() {
        // JSON output for structured tracing - MUST go to stderr
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .init();

        tracing::info!(trace_modules = ?trace_modules, "Codexium tracing enabled");
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Resolved locations of per-user state
pub struct StatePaths {
    pub trust_store: PathBuf,
    pub user_config: PathBuf,
}

impl StatePaths {
    fn resolve(trust_store: Option<PathBuf>, user_config: Option<PathBuf>) -> Result<Self> {
        Ok(StatePaths {
            trust_store: paths::resolve(trust_store, paths::trust_store_path)
                .context("Failed to locate the trust store")?,
            user_config: paths::resolve(user_config, paths::user_config_path)
                .context("Failed to locate the user config")?,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level, &cli.trace);

    let state = StatePaths::resolve(cli.trust_store, cli.user_config)?;

    match cli.command {
        Command::Verify {
            cartridge,
            json,
            report,
        } => trust_cli::verify_command(&state, &cartridge, json, report.as_deref()).await,
        Command::Trust { command } => command.execute(&state),
        #[cfg(feature = "ed25519")]
        Command::Keygen { out, force } => trust_cli::keygen_command(&out, force),
        #[cfg(feature = "ed25519")]
        Command::Sign { cartridge, key } => trust_cli::sign_command(&cartridge, &key),
        Command::Search(args) => search_cli::search_command(&args),
        Command::Docs {
            cartridge,
            tree,
            json,
        } => docs_cli::docs_command(&cartridge, tree, json),
        Command::Show { cartridge, id } => docs_cli::show_command(&cartridge, &id),
        Command::Config { command } => command.execute(&state),
    }
}
