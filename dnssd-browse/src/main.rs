use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::watch;
use anyhow::{Context, Result};
use dnssd_browse::api;
use dnssd_browse::config::Config;
use dnssd_browse::registry::{hash, RegistryHandle};
use dnssd_browse::{BrowseContext, BrowseEntry, BrowseHandler};

/// Prints each event and mirrors it into the registry.
struct Reporter {
    registry: RegistryHandle,
}

impl BrowseHandler for Reporter {
    fn on_add(&mut self, entry: BrowseEntry) {
        println!("Add\t{}\t{}\t{}", entry.iface_name, entry.service_instance_name(), format_ips(&entry.ips));
        self.registry.on_add(entry);
    }

    fn on_remove(&mut self, entry: BrowseEntry) {
        println!("Rmv\t{}\t{}", entry.iface_name, entry.service_instance_name());
        self.registry.on_remove(entry);
    }
}

fn format_ips(ips: &[IpAddr]) -> String {
    ips.iter().map(IpAddr::to_string).collect::<Vec<_>>().join(",")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("dnssd_browse=info"))
        )
        .init();

    tracing::info!("Starting dnssd-browse");

    // Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/dnssd-browse/browse.toml".to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    tracing::info!("Loaded config from {}", config_path);

    let ctx = match config.browse.timeout() {
        Some(timeout) => BrowseContext::with_timeout(timeout),
        None => BrowseContext::new(),
    };

    // Entry registry mirrors the session for the API
    let (hash_tx, hash_rx) = watch::channel(hash::compute_hash(&[]));
    let registry = RegistryHandle::spawn(hash_tx);

    let signal_ctx = ctx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                signal_ctx.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for ctrl-c: {}", e),
        }
    });

    let server_handle = if config.api.enabled {
        let app_state = api::routes::AppState {
            registry: registry.clone(),
            hash_rx,
            config: Arc::new(config.browse.clone()),
        };
        let app = api::routes::router(app_state);

        let listener = tokio::net::TcpListener::bind(&config.api.listen)
            .await
            .with_context(|| format!("Failed to bind to {}", config.api.listen))?;

        tracing::info!("API listening on {}", config.api.listen);

        let server_ctx = ctx.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_ctx.cancelled().await })
                .await
            {
                tracing::error!("Server error: {}", e);
            }
        }))
    } else {
        None
    };

    let mut reporter = Reporter { registry: registry.clone() };
    let result = dnssd_browse::browse(&ctx, &config.browse.options(), &mut reporter).await;

    // A failed session must also stop the API server
    ctx.cancel();
    if let Some(handle) = server_handle {
        let _ = handle.await;
    }

    if let Err(e) = registry.shutdown() {
        tracing::error!("Failed to shutdown registry: {}", e);
    }

    let reason = result.context("Browse session failed")?;
    tracing::info!("Shutdown complete ({})", reason);
    Ok(())
}
