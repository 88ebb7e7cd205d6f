use revenue_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    auth::{AuthState, SupabaseAuthClient},
    media::MediaService,
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, database pool, auth client, CDN adapter and
/// the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing mandatory values).
    dotenv::dotenv().ok();

    // 2. Logging. RUST_LOG wins over the defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "revenue_portal=debug,tower_http=info".into());

    // APP_ENV is read before the full config so that config warnings are already logged.
    let production = std::env::var("APP_ENV").is_ok_and(|v| v == "production");
    if production {
        // JSON lines for the log aggregator.
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    let config = AppConfig::load();
    tracing::info!("Application starting in {:?} mode", config.env);
    if config.env == Env::Local {
        tracing::warn!("Local mode: the x-user-id header bypass is enabled on /admin.");
    }

    // 3. Database (hosted Postgres).
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    if config.env == Env::Local {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("FATAL: Failed to run local migrations.");
    }

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 4. Auth platform and media CDN.
    let auth = Arc::new(SupabaseAuthClient::new(&config)) as AuthState;
    let media = MediaService::from_config(config.cdn.as_ref()).with_limits(config.media_limits);

    // 5. Shared state, router and server.
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(repo, auth, media, config));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: Cannot bind {bind_addr}: {e}"));

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
