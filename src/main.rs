use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use edge_router::admin::setup_admin_router;
use edge_router::config::load_config_or_default;
use edge_router::lifecycle::{spawn_signal_handler, AppContext, Shutdown};
use edge_router::observability::{logging, metrics};
use edge_router::HttpServer;

#[derive(Parser)]
#[command(name = "edge-router")]
#[command(about = "Edge request router", long_about = None)]
struct Args {
    /// Settings file (TOML). Missing file means built-in defaults.
    #[arg(short, long, env = "EDGE_ROUTER_CONFIG", default_value = "edge-router.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config_or_default(&args.config)?;
    logging::init_logging(&config.observability.log_level);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "edge-router starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        store = ?config.store.kind,
        environment = %config.store.environment,
        preview = config.preview.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let context = AppContext::build(config)?;
    context.warm().await;

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    if let Some(preview) = &context.preview {
        tokio::spawn(preview.clone().run_eviction(shutdown.subscribe()));
    }

    if context.config.admin.enabled {
        let admin_addr = context.config.admin.bind_address.clone();
        let admin_app = setup_admin_router(context.admin_state());
        let mut admin_shutdown = shutdown.subscribe();

        tokio::spawn(async move {
            let listener = match TcpListener::bind(&admin_addr).await {
                Ok(listener) => listener,
                Err(e) => {
                    tracing::error!(address = %admin_addr, error = %e, "Failed to bind admin listener");
                    return;
                }
            };
            tracing::info!(address = %admin_addr, "Admin API listening");

            let served = axum::serve(listener, admin_app)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
    }

    let listener = TcpListener::bind(&context.config.listener.bind_address).await?;
    let server = HttpServer::new(context.app_state(), context.request_timeout());
    server.run(listener, shutdown.subscribe()).await?;

    context.shutdown();
    tracing::info!("Shutdown complete");
    Ok(())
}
