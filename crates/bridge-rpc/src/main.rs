//! SPDK bridge RPC server - storage-control API over JSON-RPC.
//!
//! Serves the typed storage API on HTTP and forwards every operation to the
//! local SPDK daemon's JSON-RPC socket.

use anyhow::Result;
use clap::Parser;
use spdk_bridge::config::{BackendConfig, ServerConfig};
use spdk_bridge::Bridge;
use spdk_bridge_rpc::server;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "spdk-bridge-rpc")]
#[command(about = "Storage-control API server in front of SPDK")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value_t = ServerConfig::DEFAULT_PORT)]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = ServerConfig::DEFAULT_HOST)]
    host: String,

    /// SPDK JSON-RPC socket path or host:port
    #[arg(long, default_value = BackendConfig::DEFAULT_SOCKET_PATH)]
    spdk_addr: String,

    /// Default NVMe/TCP listen address for new controllers
    #[arg(long, default_value = ServerConfig::DEFAULT_TCP_LISTEN)]
    tcp_trid: String,

    /// Directory for vfio-user controller sockets
    #[arg(long, default_value = ServerConfig::DEFAULT_VFIO_CTRLR_DIR)]
    ctrlr_dir: PathBuf,

    /// Seconds to wait for one SPDK call
    #[arg(long, default_value_t = BackendConfig::DEFAULT_CALL_TIMEOUT.as_secs())]
    call_timeout_secs: u64,

    /// Largest SPDK reply accepted, in bytes
    #[arg(long, default_value_t = BackendConfig::MAX_RESPONSE_SIZE)]
    max_response_size: usize,

    /// Destroy the crypto key again when crypto device creation fails
    #[arg(long)]
    rollback_partial_create: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_logging(args: &Args) {
    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if args.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    info!("Starting SPDK bridge RPC server");

    let bridge = Bridge::builder()
        .backend_address(args.spdk_addr.clone())
        .call_timeout(Duration::from_secs(args.call_timeout_secs))
        .tcp_listen(args.tcp_trid.clone())
        .vfio_ctrlr_dir(args.ctrlr_dir.clone())
        .rollback_partial_create(args.rollback_partial_create)
        .max_response_size(args.max_response_size)
        .build()?;

    let handle = server::start_server(bridge.clone(), &args.host, args.port).await?;
    info!(
        "RPC server running on {}, forwarding to {}",
        handle.addr(),
        args.spdk_addr
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, draining requests");

    bridge.shutdown();
    handle.shutdown().await;

    Ok(())
}
