//! Chart server binary.

use std::{env, future::IntoFuture, net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wms_api::{build_admin_router, build_router, AppState, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "wms-api")]
#[command(about = "Nautical chart WMS and XYZ tile server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    listen: String,

    /// Listen address of the administration routes; keep it off public networks
    #[arg(long, env = "ADMIN_LISTEN", default_value = "127.0.0.1:8081")]
    admin_listen: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long)]
    worker_threads: Option<usize>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    let threads = args.worker_threads.or_else(|| {
        env::var("TOKIO_WORKER_THREADS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
    });
    if let Some(threads) = threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    // RUST_LOG wins over --log-level when set
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log level")?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .json()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;
    info!("Prometheus metrics exporter initialized");

    let config = ServerConfig::from_env()?;
    info!(
        catalog = %config.catalog_path.display(),
        tiles = %config.tiles_root.display(),
        cache = %config.cache_root.display(),
        "Starting chart server"
    );

    let state = Arc::new(AppState::new(config, Some(prometheus_handle))?);
    let app = build_router(state.clone());
    let admin = build_admin_router(state);

    let addr: SocketAddr = args.listen.parse().context("invalid --listen address")?;
    let admin_addr: SocketAddr = args
        .admin_listen
        .parse()
        .context("invalid --admin-listen address")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let admin_listener = tokio::net::TcpListener::bind(admin_addr).await?;
    info!(address = %addr, admin = %admin_addr, "Listening");

    tokio::try_join!(
        axum::serve(listener, app).into_future(),
        axum::serve(admin_listener, admin).into_future(),
    )?;

    Ok(())
}
