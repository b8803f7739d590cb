use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use activator_agent::config::AgentConfig;
use activator_agent::driver::Driver;
use activator_agent::epoch::EpochStore;
use activator_agent::faucet::HttpFaucet;
use activator_agent::keys::{FileKeyProvider, ValidatorIdentity};
use activator_agent::metrics;
use activator_agent::node::HttpNodeClient;
use activator_agent::rpc::{HttpTransport, RpcClient};
use clap::Parser;
use eyre::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use poem::{EndpointExt, Response, Route, Server, get, handler, listener::TcpListener};
use tokio::signal;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about = "Registers a validator on chain and keeps it active", long_about = None)]
struct ActivatordArgs {
    /// Node JSON-RPC endpoint
    #[arg(long, env = "ACTIVATOR_RPC_URL", default_value = "http://127.0.0.1:8648")]
    rpc_url: Url,

    /// Faucet tap endpoint for funding on test networks
    #[arg(
        long,
        env = "ACTIVATOR_FAUCET_URL",
        default_value = "https://faucet.pos.nimiq-testnet.com/tapit"
    )]
    faucet_url: Url,

    /// Seconds between polling cycles
    #[arg(long, default_value_t = 600)]
    poll_interval: u64,

    /// Prometheus metrics port
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// Network name for metrics labeling
    #[arg(long, env = "ACTIVATOR_NETWORK", default_value = "testnet")]
    network: String,

    /// Account key dump with `Address:` and `Private Key:` lines
    #[arg(long, env = "ACTIVATOR_ADDRESS_KEY_FILE", default_value = "/keys/address.txt")]
    address_key_file: PathBuf,

    /// Signing key dump with a `Private Key:` line
    #[arg(long, env = "ACTIVATOR_SIGNING_KEY_FILE", default_value = "/keys/signing.txt")]
    signing_key_file: PathBuf,

    /// BLS voting key dump with a `Public Key:` line
    #[arg(long, env = "ACTIVATOR_VOTING_KEY_FILE", default_value = "/keys/bls.txt")]
    voting_key_file: PathBuf,

    /// File recording the last epoch an activation was attempted in
    #[arg(long, env = "ACTIVATOR_EPOCH_FILE", default_value = "/keys/last_epoch")]
    epoch_file: PathBuf,

    /// Minimum balance to wait for before submitting; 0 disables the wait
    #[arg(long, default_value_t = 0)]
    min_stake: u64,
}

impl ActivatordArgs {
    fn config(&self) -> AgentConfig {
        let mut config = AgentConfig::new(self.rpc_url.clone(), self.faucet_url.clone());
        config.poll_interval = Duration::from_secs(self.poll_interval);
        config.min_stake = self.min_stake;
        config.epoch_file = self.epoch_file.clone();
        config.address_key_file = self.address_key_file.clone();
        config.signing_key_file = self.signing_key_file.clone();
        config.voting_key_file = self.voting_key_file.clone();
        config
    }
}

#[handler]
async fn prometheus_metrics(handle: poem::web::Data<&PrometheusHandle>) -> Response {
    let metrics = handle.render();
    Response::builder()
        .header("content-type", "text/plain")
        .body(metrics)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = ActivatordArgs::parse();
    let config = args.config();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        rpc = %config.rpc_url,
        "starting validator activation agent"
    );

    let builder = PrometheusBuilder::new().add_global_label("network", args.network.clone());
    let metrics_handle = builder
        .install_recorder()
        .context("failed to install recorder")?;
    metrics::describe();

    // Missing identity material is the one fatal error: nothing can be
    // activated without it.
    let provider = FileKeyProvider::new(
        &config.address_key_file,
        &config.signing_key_file,
        &config.voting_key_file,
    );
    let identity =
        ValidatorIdentity::load(&provider).context("cannot load validator identity")?;
    info!(address = %identity.address, "loaded validator identity");

    let node = Arc::new(HttpNodeClient::new(RpcClient::new(
        HttpTransport::new(config.rpc_url.clone()),
        config.rpc.clone(),
    )));
    let faucet = Arc::new(HttpFaucet::new(config.faucet_url.clone()));
    let epochs = EpochStore::new(config.epoch_file.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let driver = Driver::new(node, faucet, identity, epochs, &config, shutdown_rx);
    let driver_handle = tokio::spawn(driver.run());

    let app = Route::new().at(
        "/metrics",
        get(prometheus_metrics).data(metrics_handle.clone()),
    );
    let addr = format!("0.0.0.0:{}", args.port);
    let server_handle = tokio::spawn(Server::new(TcpListener::bind(addr)).run(app));

    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .context("failed to install SIGTERM handler")?;
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .context("failed to install SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down gracefully"),
        _ = sigint.recv() => info!("received SIGINT, shutting down gracefully"),
    }

    // Let the driver finish its cycle; an in-flight submission must not
    // be abandoned since the transaction may already be broadcast.
    shutdown_tx.send(true).ok();
    driver_handle.await.ok();
    server_handle.abort();

    info!("shutdown complete");
    Ok(())
}
