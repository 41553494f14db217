use clap::Parser;
use tracing_subscriber::EnvFilter;

use da_domain::config::{Config, ConfigSeverity};
use da_gateway::api;
use da_gateway::bootstrap;

#[derive(Parser)]
#[command(name = "debate-arena", about = "Multi-model debate orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the gateway server (default).
    Serve,
    /// Print the version and exit.
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            init_tracing();
            serve().await
        }
        Some(Command::Version) => {
            println!("debate-arena {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Structured JSON tracing for the server process.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,da_gateway=debug")),
        )
        .json()
        .init();
}

async fn serve() -> anyhow::Result<()> {
    tracing::info!("debate-arena starting");

    // ── Config ───────────────────────────────────────────────────────
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues
        .iter()
        .any(|i| i.severity == ConfigSeverity::Error)
    {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    let bind_addr = config.bind_addr.clone();

    // ── State + background tasks ─────────────────────────────────────
    let state = bootstrap::build_state(config).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let _housekeeping = bootstrap::spawn_housekeeping(state.clone());

    tracing::info!(
        providers = ?state.providers.configured(),
        "provider registry ready"
    );

    // ── Serve ────────────────────────────────────────────────────────
    let router = api::build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
