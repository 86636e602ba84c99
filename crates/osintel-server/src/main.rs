mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use osintel_collect::{CollectorRegistry, HttpSettings};
use osintel_engine::{AnalysisEngine, EngineConfig};
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, default_rate_limit_state, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(osintel_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = osintel_db::PoolConfig::from_app_config(&config);
    let pool = osintel_db::connect_pool(&config.database_url, pool_config).await?;
    osintel_db::run_migrations(&pool).await?;

    let engine = AnalysisEngine::new(&EngineConfig::from_app_config(&config))?;
    let registry = Arc::new(CollectorRegistry::with_builtins_using(HttpSettings {
        timeout_secs: config.collector_request_timeout_secs,
        user_agent: config.collector_user_agent.clone(),
    }));

    let _scheduler =
        scheduler::build_scheduler(pool.clone(), Arc::clone(&registry), Arc::clone(&config))
            .await?;

    let app = build_app(
        AppState {
            pool,
            engine,
            registry,
        },
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
