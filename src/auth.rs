use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use std::{convert::Infallible, sync::Arc};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    identity::{IdentityState, StaticIdentityProvider, SupabaseAuthClient},
    models::Session,
};

/// CallerIdentity
///
/// The identity provider bound to the credentials of one HTTP request. The guard
/// queries it exactly like it would query the SPA's own auth client.
///
/// Unlike an authentication extractor this never rejects: a request without usable
/// credentials is an anonymous caller, and the guard decides what that means for
/// the requested destination.
#[derive(Clone)]
pub struct CallerIdentity(pub IdentityState);

/// CallerIdentity Extractor Implementation
///
/// 1. Local Bypass: in `Env::Local` a UUID in `x-user-id` yields a static
///    authenticated session, so the SPA can be driven without a Supabase login.
/// 2. Bearer Token: otherwise the `Authorization: Bearer` token is forwarded to
///    Supabase Auth when the guard asks for the session.
/// 3. Neither: an anonymous caller (no network call is made).
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
    SupabaseAuthClient: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|id_str| Uuid::parse_str(id_str).ok());
            if let Some(user_id) = bypass {
                tracing::debug!(%user_id, "using local x-user-id bypass");
                return Ok(CallerIdentity(Arc::new(StaticIdentityProvider::new(
                    Session::authenticated(user_id),
                ))));
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        let client = SupabaseAuthClient::from_ref(state);
        Ok(CallerIdentity(Arc::new(client.for_token(token))))
    }
}
