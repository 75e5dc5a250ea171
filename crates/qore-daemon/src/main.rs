//! qored — the Qore governance daemon CLI entrypoint (spec.md §6 "CLI surface").

use std::sync::Arc;

use clap::Parser;
use qore_cache::Fingerprinter;
use qore_ledger::Ledger;
use qore_policy::{PolicyEngine, QoreConfig, Router as EvalRouter, WriteLedgerByTier};
use qore_runtime::Runtime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use qore_daemon::replay_store::{ActorReplayStore, InMemoryReplayStore, SqliteReplayStore};
use qore_daemon::state::AppState;
use qore_daemon::actor_proof::Keyring;
use qore_daemon::rate_limit::RateLimiter;
use qore_daemon::Server;

/// Qore governance daemon.
#[derive(Parser)]
#[command(name = "qored")]
#[command(about = "Qore policy governance runtime daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path.
    #[arg(short, long, env = "QORE_CONFIG")]
    config: Option<String>,

    /// Listen address override (host:port).
    #[arg(short, long)]
    listen: Option<String>,

    /// Log level override.
    #[arg(long, env = "QORE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging.
    #[arg(long, env = "QORE_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = QoreConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if cli.json {
        config.log_json = true;
    }
    if let Some(listen) = cli.listen {
        let (host, port) = listen
            .rsplit_once(':')
            .ok_or_else(|| anyhow::anyhow!("--listen must be host:port"))?;
        config.api_host = host.to_string();
        config.api_port = port.parse()?;
    }

    init_tracing(&config);

    let ledger_path = ".failsafe/ledger/meta.ledger";
    if let Some(parent) = std::path::Path::new(ledger_path).parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }
    let ledger = Arc::new(Ledger::open_file(ledger_path).await?);

    let policy = Arc::new(PolicyEngine::load(config.policy_dir.as_deref()).await?);
    let router = Arc::new(EvalRouter::with_config(
        Fingerprinter::new(None),
        10_000,
        WriteLedgerByTier::default(),
    ));

    let runtime = Arc::new(Runtime::new(ledger, policy, router, false));
    runtime.initialize();

    let actor_keyring = Arc::new(Keyring::from_pairs(config.actor_key_pairs()));
    let rate_limiter = Arc::new(RateLimiter::default_window());

    let replay_store: Arc<dyn ActorReplayStore> = if config.replay_db_path.trim().is_empty() {
        Arc::new(InMemoryReplayStore::new(100_000))
    } else {
        Arc::new(SqliteReplayStore::connect(&config.replay_db_path).await?)
    };

    let http_client = reqwest::Client::new();
    let config = Arc::new(config);

    let state = AppState::new(runtime, config.clone(), rate_limiter, actor_keyring, replay_store, http_client);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.bind_addr(),
        "starting qore daemon"
    );

    let server = Server::new((*config).clone(), state);
    server.run().await
}

fn init_tracing(config: &QoreConfig) {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into());

    if config.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
