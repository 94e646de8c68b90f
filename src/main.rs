use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use replicated_kv::config::{ConfigOverrides, NodeConfig};
use replicated_kv::coordinator::{HttpPeerClient, ReplicaCoordinator};
use replicated_kv::storage::{FjallEngine, MemoryEngine, StorageEngine};
use replicated_kv::topology::Topology;

#[derive(clap::Parser, Debug)]
#[command(name = "replicated-kv", about = "Replicated quorum key-value node")]
struct Cli {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Address to bind, e.g. 0.0.0.0:8080.
    #[arg(long)]
    listen: Option<std::net::SocketAddr>,
    /// This node's URL as seen by its peers.
    #[arg(long)]
    node: Option<String>,
    /// Cluster member URL, repeatable.
    #[arg(long = "peer")]
    peers: Vec<String>,
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    workers: Option<usize>,
    /// Largest accepted value in bytes. Unbounded when unset.
    #[arg(long)]
    max_value_bytes: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    use clap::Parser;
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        listen: cli.listen,
        node: cli.node,
        peers: cli.peers,
        data_dir: cli.data_dir,
        max_value_bytes: cli.max_value_bytes,
        workers: cli.workers,
    };
    let config = NodeConfig::load(cli.config.as_deref(), &overrides)?;

    init_tracing(&config)?;

    // Runtime workers bound sub-operation parallelism.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    runtime.block_on(run(config))
}

fn init_tracing(config: &NodeConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("invalid log level: {}", config.log_level))?;

    match config.log_format.as_str() {
        "json" => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        _ => tracing_subscriber::fmt().pretty().with_env_filter(filter).init(),
    }
    Ok(())
}

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    let topology = Topology::new(config.cluster_nodes(), config.node_id())
        .context("invalid cluster membership")?;

    let engine: Arc<dyn StorageEngine> = match &config.data_dir {
        Some(dir) => Arc::new(
            FjallEngine::open(dir)
                .with_context(|| format!("failed to open storage at {}", dir.display()))?,
        ),
        None => {
            tracing::warn!("no data_dir configured, records are kept in memory only");
            Arc::new(MemoryEngine::new())
        }
    };

    let peers = HttpPeerClient::new(config.peer_timeout()).context("failed to build peer client")?;

    tracing::info!(
        node = %topology.local_node(),
        cluster = ?topology.all_nodes(),
        workers = config.workers,
        peer_timeout_ms = config.peer_timeout_ms,
        "node starting"
    );

    let coordinator = Arc::new(ReplicaCoordinator::new(topology, engine, peers));

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;

    replicated_kv::service::serve(
        listener,
        coordinator,
        config.max_value_bytes,
        shutdown_signal(),
    )
    .await?;

    tracing::info!("node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
