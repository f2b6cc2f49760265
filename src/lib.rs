use axum::{Router, extract::FromRef, http::HeaderName};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Navigation guard core.
pub mod error;
pub mod guard;
pub mod models;
pub mod route_table;
pub mod sequencer;

// Capabilities injected into the guard.
pub mod identity;
pub mod role_store;

// HTTP binding for the SPA host router.
pub mod auth;
pub mod config;
pub mod handlers;
pub mod routes;
use routes::{navigation, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ProviderError, RouteError, StoreError};
pub use guard::NavigationGuard;
pub use identity::{IdentityProvider, IdentityState, MockIdentityProvider, SupabaseAuthClient};
pub use models::{AccessRequirement, Destination, NavigationDecision, Role, Session};
pub use role_store::{MockRoleStore, RoleStore, RoleStoreState};
pub use route_table::RouteTable;
pub use sequencer::NavigationSequencer;

/// ApiDoc
///
/// OpenAPI document for the guard service, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::get_routes, handlers::evaluate_navigation),
    components(
        schemas(
            models::Role, models::AccessRequirement, models::Destination,
            models::HomeDestinations, models::RouteTableConfig, models::NavigationDecision,
            models::EvaluateRequest, models::EvaluateResponse, models::ErrorResponse,
        )
    ),
    tags(
        (name = "portal-guard", description = "FYP Portal Navigation Guard API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable state of the guard service. The identity provider is not part
/// of it: it depends on each request's credentials (see `auth::CallerIdentity`).
#[derive(Clone)]
pub struct AppState {
    /// The validated, read-only route table.
    pub table: Arc<RouteTable>,
    /// Role lookups (Postgres or Supabase PostgREST).
    pub roles: RoleStoreState,
    /// Supabase Auth settings used to resolve bearer tokens.
    pub auth_client: SupabaseAuthClient,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for SupabaseAuthClient {
    fn from_ref(app_state: &AppState) -> SupabaseAuthClient {
        app_state.auth_client.clone()
    }
}

/// create_router
///
/// Assembles the guard service routes, documentation, and the observability layers.
pub fn create_router(state: AppState) -> Router {
    // The SPA is served from another origin.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .nest("/navigation", navigation::navigation_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for every HTTP request, correlated by the `x-request-id` header so the
/// guard's `navigation` spans nest under the request that triggered them.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
