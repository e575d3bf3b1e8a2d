//! Newsroom authentication daemon.
//!
//! Wires the account directory, session store, token codec and password vault
//! into the auth services, then supervises session store health until a
//! shutdown signal arrives.

mod config;
mod logging;

use newsroom_api_auth::{AuthService, IdentityResolver};
use newsroom_auth::{PasswordVault, TokenCodec};
use newsroom_core::InMemoryUserDirectory;
use newsroom_session::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use crate::config::Config;

/// Services shared by every request handler.
struct AppState {
    store: SessionStore,
    auth: AuthService,
    resolver: IdentityResolver,
}

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init_logging(&config.rust_log, config.log_format) {
        eprintln!("FATAL: Failed to initialize logging: {e}");
        std::process::exit(1);
    }
    for warning in &config.warnings {
        warn!(app_env = %config.app_env, "{warning}");
    }
    info!(app_env = %config.app_env, "Starting newsroom-authd");

    let state = match build_state(&config).await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to initialize auth services");
            std::process::exit(1);
        }
    };

    let health = state.store.health();
    let settings = state.auth.settings();
    info!(
        backend = %health.backend,
        status = ?health.status,
        fallback_active = health.fallback_active,
        access_ttl_secs = settings.access_ttl.num_seconds(),
        refresh_ttl_secs = settings.refresh_ttl.num_seconds(),
        principal_cache_ttl_secs = state.resolver.cache_ttl().as_secs(),
        "newsroom-authd ready"
    );

    let probe = spawn_health_probe(state.store.clone(), config.health_probe_interval);

    shutdown_signal().await;

    probe.abort();
    state.store.close().await;
    info!("newsroom-authd stopped");
}

async fn build_state(config: &Config) -> Result<AppState, newsroom_auth::AuthError> {
    let store = SessionStore::connect(&config.store_config()).await;

    let codec =
        TokenCodec::new(config.jwt_secret.as_bytes())?.with_leeway(config.token_leeway_secs);
    let vault = PasswordVault::with_params(
        config.argon2.memory_kib,
        config.argon2.iterations,
        config.argon2.parallelism,
    )?;

    let directory = Arc::new(InMemoryUserDirectory::new());
    let auth = AuthService::new(
        directory.clone(),
        store.clone(),
        codec.clone(),
        vault,
        config.auth_settings(),
    );
    let resolver = IdentityResolver::new(directory, store.clone(), codec)
        .with_cache_ttl(config.principal_cache_ttl);

    Ok(AppState {
        store,
        auth,
        resolver,
    })
}

/// Periodically probe the session store and log its health.
fn spawn_health_probe(store: SessionStore, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let health = store.probe().await;
            if health.is_healthy() {
                info!(
                    target: "session_store",
                    backend = %health.backend,
                    "Session store healthy"
                );
            } else {
                warn!(
                    target: "session_store",
                    condition = "infrastructure_degraded",
                    backend = %health.backend,
                    fallback_active = health.fallback_active,
                    backend_reachable = health.backend_reachable,
                    failure_count = health.failure_count,
                    last_degradation = health.last_degradation.as_deref().unwrap_or(""),
                    "Session store degraded"
                );
            }
        }
    })
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
