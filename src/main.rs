use portal_guard::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    identity::SupabaseAuthClient,
    role_store::{PostgresRoleStore, RoleStoreState, SupabaseRoleStore},
    route_table::RouteTable,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point of the guard service: configuration, logging, route table
/// validation, role store selection, and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "portal_guard=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Guard service starting in {:?} mode", config.env);

    // 3. Route Table
    // An invalid table is a configuration bug: refuse to start.
    let table = match &config.route_table_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .unwrap_or_else(|e| panic!("FATAL: cannot read route table {path}: {e}"));
            RouteTable::from_json(&json)
                .unwrap_or_else(|e| panic!("FATAL: invalid route table {path}: {e}"))
        }
        None => RouteTable::portal(),
    };
    tracing::info!(
        destinations = table.destinations().count(),
        "route table validated"
    );

    // 4. Role Store
    let http = reqwest::Client::new();
    let roles = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");
            tracing::info!("role store: postgres");
            Arc::new(PostgresRoleStore::new(pool)) as RoleStoreState
        }
        None => {
            tracing::info!("role store: supabase rest");
            Arc::new(SupabaseRoleStore::new(
                http.clone(),
                &config.supabase_url,
                &config.supabase_service_key,
            )) as RoleStoreState
        }
    };

    // 5. Unified State Assembly
    let auth_client = SupabaseAuthClient::new(http, &config.supabase_url, &config.supabase_anon_key);
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        table: Arc::new(table),
        roles,
        auth_client,
        config,
    };

    // 6. Router and Server Startup
    let app = create_router(app_state);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app).await.expect("server error");
}
