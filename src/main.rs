//! feed-sentinel: binary entrypoint.
//! Loads configuration, starts one scheduler per feed and runs until Ctrl-C.

use feed_sentinel::{MonitorConfig, Orchestrator};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` wins; otherwise info for this crate and warn for dependencies.
/// `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("feed_sentinel=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = match MonitorConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "configuration error, not starting");
            return Err(e.into());
        }
    };
    tracing::info!(?config, "configuration loaded");
    if config.youtube.is_none() {
        tracing::info!("no YouTube channels configured, video monitoring disabled");
    }

    let orchestrator = Orchestrator::from_config(&config);
    tracing::info!(sources = ?orchestrator.source_names(), "monitor starting");
    let mut running = orchestrator.start();

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::warn!(error = %e, "could not listen for Ctrl-C");
            }
            tracing::info!("shutdown requested");
        }
        _ = running.wait() => {
            tracing::warn!("all schedulers exited");
        }
    }

    running.shutdown();
    Ok(())
}
