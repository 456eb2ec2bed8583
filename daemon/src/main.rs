//! tally — operator CLI over the local event store and the remote ledger.
//!
//! Every subcommand prints a JSON document on stdout. Domain failures print
//! an error body with a stable `error` kind and exit with status 1.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tally_coordinator::api::{CreateEventRequest, ErrorBody, ScoresRequest, VoteRequest};
use tally_coordinator::{ChainConfig, CoordinatorMetrics, ServiceConfig, VoteCoordinator};
use tally_ledger::Ledger;
use tally_store_lmdb::LmdbEnvironment;
use tally_types::{EventCode, GeoPoint, UserId};
use tally_utils::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "tally", about = "Geofenced and secure-connection voting engine", version)]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "TALLY_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the event store.
    #[arg(long, env = "TALLY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// JSON-RPC endpoint of the contract gateway.
    #[arg(long, env = "TALLY_RPC_URL", conflicts_with = "off_chain")]
    rpc_url: Option<String>,

    /// Ignore any configured remote ledger and record votes locally only.
    #[arg(long, env = "TALLY_OFF_CHAIN")]
    off_chain: bool,

    /// Bound on each remote call, confirmation included, in seconds.
    #[arg(long, env = "TALLY_REMOTE_TIMEOUT_SECS")]
    remote_timeout_secs: Option<u64>,

    /// Log format: "human" or "json".
    #[arg(long, env = "TALLY_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "TALLY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Print Prometheus metrics to stderr after the command.
    #[arg(long, env = "TALLY_METRICS")]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Create a voting event.
    CreateEvent {
        /// Authenticated organizer.
        #[arg(long = "as")]
        organizer: String,
        /// Event code; generated when omitted.
        #[arg(long)]
        code: Option<String>,
        /// Option name (repeat for each option).
        #[arg(long = "option", required = true)]
        options: Vec<String>,
        /// Option image URL (repeat, one per option).
        #[arg(long = "image")]
        images: Vec<String>,
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lng: Option<f64>,
        /// Fence radius in meters (standard events).
        #[arg(long)]
        radius: Option<f64>,
        /// "standard" (default) or "secure".
        #[arg(long)]
        voting_type: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Cast a vote.
    Vote {
        /// Authenticated voter.
        #[arg(long = "as")]
        voter: String,
        #[arg(long)]
        event: String,
        /// Option index.
        #[arg(long, conflicts_with = "option")]
        index: Option<usize>,
        /// Option name.
        #[arg(long)]
        option: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lng: Option<f64>,
        /// The voter is on a secure (wired) connection.
        #[arg(long)]
        secure: bool,
    },
    /// Current scores for an event.
    Scores {
        #[arg(long)]
        event: String,
    },
    /// Public event details (no tallies, no voters).
    Details {
        #[arg(long)]
        event: String,
    },
    /// Local tallies and voters. Organizer only.
    Stats {
        #[arg(long = "as")]
        requester: String,
        #[arg(long)]
        event: String,
    },
    /// Compare local tallies with the remote ledger. Organizer only.
    Audit {
        #[arg(long = "as")]
        requester: String,
        #[arg(long)]
        event: String,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn load_config(cli: &Cli) -> anyhow::Result<ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path_str = path.to_str().context("config path is not valid UTF-8")?;
            ServiceConfig::from_toml_file(path_str)
                .with_context(|| format!("loading {}", path.display()))?
        }
        None => ServiceConfig::default(),
    };

    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(url) = &cli.rpc_url {
        config.chain = Some(match config.chain.take() {
            Some(chain) => ChainConfig {
                rpc_url: url.clone(),
                ..chain
            },
            None => ChainConfig::new(url.clone()),
        });
    }
    if cli.off_chain {
        config.chain = None;
    }
    if let Some(secs) = cli.remote_timeout_secs {
        anyhow::ensure!(secs > 0, "--remote-timeout-secs must be at least 1");
        config.remote_timeout_secs = secs;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.enable_metrics |= cli.metrics;
    Ok(config)
}

fn user(raw: &str) -> anyhow::Result<UserId> {
    UserId::new(raw).with_context(|| format!("invalid user id {raw:?}"))
}

fn event_code(raw: &str) -> anyhow::Result<EventCode> {
    EventCode::new(raw).with_context(|| format!("invalid event code {raw:?}"))
}

fn point(lat: Option<f64>, lng: Option<f64>) -> anyhow::Result<Option<GeoPoint>> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Ok(Some(GeoPoint::new(lat, lng))),
        (None, None) => Ok(None),
        _ => anyhow::bail!("--lat and --lng must be given together"),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success document, or the error body of a domain failure.
fn report<T, E>(result: Result<T, E>) -> anyhow::Result<ExitCode>
where
    T: Serialize,
    for<'a> ErrorBody: From<&'a E>,
{
    match result {
        Ok(value) => {
            print_json(&value)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            print_json(&ErrorBody::from(&e))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn build_coordinator(
    config: &ServiceConfig,
    metrics: Option<Arc<CoordinatorMetrics>>,
) -> anyhow::Result<VoteCoordinator> {
    let env = LmdbEnvironment::open(&config.data_dir, config.map_size_bytes())
        .with_context(|| format!("opening event store at {}", config.data_dir.display()))?;
    let ledger = Ledger::new(Arc::new(env.event_store()));

    let mut coordinator =
        VoteCoordinator::new(ledger).with_remote_timeout(config.remote_timeout());
    match &config.chain {
        Some(chain) => {
            tracing::info!(rpc_url = %chain.rpc_url, "using remote ledger");
            coordinator = coordinator.with_chain(Arc::new(chain.build_bridge()));
        }
        None => tracing::info!("no remote ledger configured, running off-chain"),
    }
    if let Some(metrics) = metrics {
        coordinator = coordinator.with_metrics(metrics);
    }
    Ok(coordinator)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);

    if let Command::Config = cli.command {
        print!("{}", config.to_toml_string()?);
        return Ok(ExitCode::SUCCESS);
    }

    let metrics = if config.enable_metrics {
        Some(Arc::new(CoordinatorMetrics::new()?))
    } else {
        None
    };
    let coordinator = build_coordinator(&config, metrics.clone())?;

    let code = match cli.command {
        Command::CreateEvent {
            organizer,
            code,
            options,
            images,
            lat,
            lng,
            radius,
            voting_type,
            title,
            description,
        } => {
            let request = CreateEventRequest {
                event_code: code,
                option_names: options,
                option_images: images,
                location: point(lat, lng)?,
                radius,
                voting_type,
                title,
                description,
            };
            report(coordinator.create_event(&user(&organizer)?, request).await)?
        }
        Command::Vote {
            voter,
            event,
            index,
            option,
            lat,
            lng,
            secure,
        } => {
            let request = VoteRequest {
                event_code: event,
                option_index: index,
                option_name: option,
                voter_location: point(lat, lng)?,
                secure_connected: Some(secure),
            };
            report(coordinator.cast_vote(&user(&voter)?, request).await)?
        }
        Command::Scores { event } => {
            report(coordinator.scores(ScoresRequest { event_code: event }).await)?
        }
        Command::Details { event } => report(coordinator.event_details(&event_code(&event)?))?,
        Command::Stats { requester, event } => {
            report(coordinator.event_stats(&event_code(&event)?, &user(&requester)?))?
        }
        Command::Audit { requester, event } => {
            report(coordinator.audit(&event_code(&event)?, &user(&requester)?).await)?
        }
        Command::Config => ExitCode::SUCCESS,
    };

    if let Some(metrics) = metrics {
        eprint!("{}", metrics.encode()?);
    }
    Ok(code)
}
