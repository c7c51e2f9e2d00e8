use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use configs::{AppConfig, AuthSettings, OwnershipPolicySetting};
use migration::{Migrator, MigratorTrait};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use service::auth::repo::seaorm::SeaOrmAccountRepository;
use service::auth::repository::AccountRepository;
use service::auth::{AccountService, AuthConfig, OwnershipPolicy};

use crate::routes::{self, ServerState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

pub fn auth_config(settings: &AuthSettings) -> AuthConfig {
    AuthConfig {
        jwt_secret: settings.jwt_secret.clone(),
        token_ttl: chrono::Duration::minutes(settings.token_ttl_minutes),
        hash_work_factor: settings.hash_work_factor,
        hash_memory_kib: settings.hash_memory_kib,
        ownership: match settings.ownership_policy {
            OwnershipPolicySetting::Unrestricted => OwnershipPolicy::Unrestricted,
            OwnershipPolicySetting::SelfOnly => OwnershipPolicy::SelfOnly,
        },
    }
}

/// Build the router around an already constructed service.
pub fn app(state: ServerState, request_timeout: Duration) -> Router {
    routes::build_router(state, build_cors(), request_timeout)
}

/// Periodically log the number of stored accounts. Returns `None` when disabled.
fn spawn_count_reporter(state: ServerState, every_secs: u64) -> Option<JoinHandle<()>> {
    if every_secs == 0 {
        return None;
    }
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(every_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match state.accounts.count().await {
                Ok(total) => info!(accounts = total, "account count"),
                Err(e) => warn!(error = %e, "account count unavailable"),
            }
        }
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

/// Public entry: connect storage, build the app and run the HTTP server
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let db = models::db::connect_with_config(&cfg.database).await?;
    Migrator::up(&db, None).await?;
    info!("migrations applied");

    let repo: Arc<dyn AccountRepository> = Arc::new(SeaOrmAccountRepository::new(db));
    let auth = auth_config(&cfg.auth);
    let accounts = AccountService::from_config(repo, &auth)?;
    info!(
        ttl_minutes = cfg.auth.token_ttl_minutes,
        work_factor = auth.hash_work_factor,
        ownership = ?auth.ownership,
        "account service ready"
    );
    let state = ServerState { accounts: Arc::new(accounts) };

    let reporter = spawn_count_reporter(state.clone(), cfg.auth.count_report_secs);
    let app = app(state, Duration::from_secs(cfg.server.request_timeout_secs));

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, "starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(handle) = reporter {
        handle.abort();
    }
    served?;
    info!("server stopped");
    Ok(())
}
