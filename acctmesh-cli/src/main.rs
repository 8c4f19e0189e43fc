use acctmesh_core::config::Config;
use acctmesh_core::core_account::field::{FieldKind, SerializeFormat};
use acctmesh_core::core_account::notify::PeerMessage;
use acctmesh_core::core_account::sync::{apply_remote, RemoteContext, RemoteOutcome};
use acctmesh_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use acctmesh_core::metrics::init_metrics;
use acctmesh_core::AccountStore;
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "acctmesh")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Override the log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// Node configuration file (TOML); environment variables otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Apply a JSON-lines stream of peer messages to an empty store
    Replay {
        /// Input file, or "-" for stdin
        input: PathBuf,

        /// Print the resulting account database as JSON
        #[arg(long)]
        dump: bool,
    },

    /// Merge raw field updates in order and print the surviving value
    Merge {
        /// Field type
        #[arg(long, value_enum, default_value = "string")]
        kind: KindArg,

        /// Default for int fields
        #[arg(long, default_value_t = 0)]
        default: i32,

        /// Wire format of the updates
        #[arg(long, value_enum, default_value = "internal")]
        format: FormatArg,

        /// Raw updates, e.g. "1700000000 hello"
        #[arg(required = true)]
        updates: Vec<String>,
    },

    /// Validate the configuration and print it
    CheckConfig,

    /// Write the default configuration to a file
    InitConfig {
        path: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Timestamp,
    Bool,
    Int,
    String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Internal,
    Network,
}

impl From<FormatArg> for SerializeFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Internal => SerializeFormat::Internal,
            FormatArg::Network => SerializeFormat::Network,
        }
    }
}

fn field_kind(kind: KindArg, default: i32) -> FieldKind {
    match kind {
        KindArg::Timestamp => FieldKind::Timestamp,
        KindArg::Bool => FieldKind::Bool,
        KindArg::Int => FieldKind::Int { default },
        KindArg::String => FieldKind::String,
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::from_env().context("loading configuration from environment")?,
    };
    Ok(config)
}

/// Outcome tally of a replay
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
struct ReplaySummary {
    messages: usize,
    invalid: usize,
    outcomes: BTreeMap<&'static str, usize>,
}

fn outcome_label(outcome: &RemoteOutcome) -> &'static str {
    match outcome {
        RemoteOutcome::Created => "created",
        RemoteOutcome::Replaced => "replaced",
        RemoteOutcome::Merged { .. } => "merged",
        RemoteOutcome::Discarded => "discarded",
        RemoteOutcome::Updated(o) if o.is_applied() => "updated",
        RemoteOutcome::Updated(_) => "stale",
        RemoteOutcome::Removed => "removed",
        RemoteOutcome::Ignored => "ignored",
    }
}

/// Apply every line of `input` as a peer message. Blank lines are skipped;
/// lines that do not parse are counted and skipped.
fn replay(store: &AccountStore, input: impl BufRead) -> Result<ReplaySummary> {
    let ctx = RemoteContext::no_propagation();
    let mut summary = ReplaySummary::default();

    for (lineno, line) in input.lines().enumerate() {
        let line = line.context("reading replay input")?;
        if line.trim().is_empty() {
            continue;
        }

        let message: PeerMessage = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!(line = lineno + 1, error = %e, "skipping unparsable peer message");
                summary.invalid += 1;
                continue;
            }
        };

        let outcome = apply_remote(store, message, &ctx)?;
        debug!(line = lineno + 1, ?outcome, "applied peer message");
        summary.messages += 1;
        *summary.outcomes.entry(outcome_label(&outcome)).or_default() += 1;
    }

    Ok(summary)
}

/// Merge `updates` in order into an empty slot and serialize the result
fn merge_updates(kind: FieldKind, format: SerializeFormat, updates: &[String]) -> String {
    let mut slot = None;
    for raw in updates {
        let outcome = kind.merge(&mut slot, raw, format);
        debug!(raw = %raw, ?outcome, "merged update");
    }
    kind.serialize(slot.as_ref(), format)
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(std::io::stdin())));
    }
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    // Command-line flags take precedence over the configuration
    let mut log_config = LogConfig::try_from(&config.logging)?;
    if let Some(level) = &args.log_level {
        log_config.level = level.parse::<LogLevel>()?;
    }
    if args.json_logs {
        log_config = log_config.json_format(true);
    }
    init_logging_with_config(log_config)?;

    if config.metrics.enabled {
        init_metrics();
    }

    info!(server = %config.node.server_name, "acctmesh started");

    match args.command {
        Command::Replay { input, dump } => {
            let store = AccountStore::from_config(&config);
            let summary = replay(&store, open_input(&input)?)?;
            info!(messages = summary.messages, invalid = summary.invalid, "replay finished");

            println!("{}", serde_json::to_string_pretty(&summary)?);
            if dump {
                let db = store.get_db()?;
                let records: Vec<_> = db.values().collect();
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
        }
        Command::Merge { kind, default, format, updates } => {
            println!("{}", merge_updates(field_kind(kind, default), format.into(), &updates));
        }
        Command::CheckConfig => {
            config.validate()?;
            let registry = config.build_registry();
            info!(fields = registry.keys().count(), "configuration is valid");
            println!("{:#?}", config);
        }
        Command::InitConfig { path } => {
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            Config::default().save_to_file(&path)?;
            info!(path = %path.display(), "default configuration written");
        }
    }

    Ok(())
}
