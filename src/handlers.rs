use crate::{
    AppState,
    auth::CallerIdentity,
    error::RouteError,
    guard::NavigationGuard,
    models::{ErrorResponse, EvaluateRequest, EvaluateResponse, RouteTableConfig},
};
use axum::{Json, extract::State, http::StatusCode};

// --- Handlers ---

/// get_routes
///
/// [Public Route] Returns the route table the guard enforces, in table order, plus
/// the home destinations. The SPA builds its router from this so both sides agree
/// on names and paths.
#[utoipa::path(
    get,
    path = "/navigation/routes",
    responses((status = 200, description = "Route table", body = RouteTableConfig))
)]
pub async fn get_routes(State(state): State<AppState>) -> Json<RouteTableConfig> {
    Json(state.table.to_config())
}

/// evaluate_navigation
///
/// [Public Route] Decides whether the SPA may move from `from` to `to`.
///
/// The caller's identity comes from the request credentials (see `CallerIdentity`);
/// the guard resolves the role itself when the destination needs it. Identity and
/// role store outages never fail this endpoint: they produce a redirect to login.
/// Only an unknown `to` path is an error (404), for the SPA's not-found page.
#[utoipa::path(
    post,
    path = "/navigation/evaluate",
    request_body = EvaluateRequest,
    responses(
        (status = 200, description = "Decision", body = EvaluateResponse),
        (status = 404, description = "No route matches `to`", body = ErrorResponse)
    )
)]
pub async fn evaluate_navigation(
    CallerIdentity(identity): CallerIdentity,
    State(state): State<AppState>,
    Json(payload): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, (StatusCode, Json<ErrorResponse>)> {
    let guard = NavigationGuard::new(state.table.clone(), identity, state.roles.clone())
        .with_timeout(state.config.provider_timeout);

    let decision = guard
        .evaluate_path(&payload.to, payload.from.as_deref())
        .await
        .map_err(route_error_response)?;

    // Redirect targets come from the validated table, so the lookup cannot miss.
    let redirect_path = decision
        .target()
        .and_then(|name| state.table.path_for(name).ok())
        .map(str::to_string);

    Ok(Json(EvaluateResponse {
        decision,
        redirect_path,
    }))
}

fn route_error_response(error: RouteError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match error {
        RouteError::NoRouteMatch(_) | RouteError::UnknownDestination(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}
