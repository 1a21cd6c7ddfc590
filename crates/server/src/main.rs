//! The libra binary: an autoscaling control plane for a Nomad cluster.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use libra_backend::initialize_backends;
use libra_core::RootConfig;
use libra_nomad::{NomadClient, NomadConfig, ScalingExecutor};
use libra_server::app_config::ServerConfig;
use libra_server::state::AppState;
use libra_server::{rule_runner, startup};

#[derive(Parser, Debug)]
#[command(name = "libra", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the Libra server.
    Server {
        /// Directory holding backend and job configuration.
        #[arg(long, env = libra_core::config::CONFIG_DIR_ENV, default_value = "/etc/libra")]
        config_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    libra_core::config::load_dotenv();

    let cli = Cli::parse();
    match cli.command {
        Command::Server { config_dir } => serve(&config_dir).await,
    }
}

async fn serve(config_dir: &Path) -> anyhow::Result<()> {
    let server_config = ServerConfig::from_env();

    info!(config_dir = %config_dir.display(), "loading configuration");
    let config = RootConfig::load(config_dir)?;
    info!("loaded and parsed configuration");

    let backends = initialize_backends(&config.backends, server_config.http_timeout).await?;

    let nomad = NomadClient::new(NomadConfig::from_env(), server_config.http_timeout)?;
    nomad.verify_connection().await?;
    let executor = Arc::new(ScalingExecutor::new(Arc::new(nomad)));

    let schedule = startup::build_schedule(&config, &backends, executor.clone())?;

    let state = Arc::new(AppState {
        config,
        backends,
        executor,
    });
    let app = libra_server::router(state);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let runner = tokio::spawn(rule_runner::run_rule_loop(
        schedule,
        server_config.eval_jitter,
        server_config.shutdown_grace,
        shutdown_rx,
    ));

    let listener = tokio::net::TcpListener::bind(server_config.bind_addr()).await?;
    info!("server listening on http://{}", server_config.bind_addr());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // HTTP is down; stop the clock and let in-flight evaluations drain.
    let _ = shutdown_tx.send(true);
    let _ = runner.await;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
