use async_trait::async_trait;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

use crate::{error::ProviderError, models::Session};

// 1. IdentityProvider Contract
/// IdentityProvider
///
/// The capability the guard uses to learn who the caller is. It is injected into the
/// guard rather than reached through a global client, so tests can swap in fakes.
///
/// An expired or rejected credential is *not* an error: implementations report it as
/// an anonymous session. Errors are reserved for "could not find out".
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_session(&self) -> Result<Session, ProviderError>;
}

/// IdentityState
///
/// The shared handle the guard holds.
pub type IdentityState = Arc<dyn IdentityProvider>;

// 2. The Real Implementation (Supabase Auth)
/// SupabaseAuthClient
///
/// Connection settings for the Supabase Auth API, shared across requests.
/// Produces one `SupabaseIdentityProvider` per caller credential.
#[derive(Clone)]
pub struct SupabaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseAuthClient {
    pub fn new(http: reqwest::Client, base_url: &str, anon_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    /// for_token
    ///
    /// Binds the client to a caller's access token. `None` means the caller sent no
    /// credentials at all.
    pub fn for_token(&self, access_token: Option<String>) -> SupabaseIdentityProvider {
        SupabaseIdentityProvider {
            client: self.clone(),
            access_token,
        }
    }
}

/// SupabaseUser
///
/// The slice of the `/auth/v1/user` response the guard needs.
#[derive(Deserialize)]
struct SupabaseUser {
    id: Uuid,
}

/// SupabaseIdentityProvider
///
/// Resolves the session by asking Supabase who owns the bearer token.
/// The token is forwarded as-is; verifying it is Supabase's job.
pub struct SupabaseIdentityProvider {
    client: SupabaseAuthClient,
    access_token: Option<String>,
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    async fn current_session(&self) -> Result<Session, ProviderError> {
        let Some(token) = self.access_token.as_deref() else {
            return Ok(Session::anonymous());
        };

        let url = format!("{}/auth/v1/user", self.client.base_url);
        let response = self
            .client
            .http
            .get(url)
            .header("apikey", &self.client.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            // Expired or revoked session: the caller is simply not logged in.
            tracing::debug!(%status, "supabase rejected access token");
            return Ok(Session::anonymous());
        }
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "supabase auth returned {status}"
            )));
        }

        let user = response
            .json::<SupabaseUser>()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        Ok(Session::authenticated(user.id))
    }
}

/// StaticIdentityProvider
///
/// Always reports the same session. Backs the `x-user-id` development bypass.
#[derive(Clone, Debug)]
pub struct StaticIdentityProvider {
    session: Session,
}

impl StaticIdentityProvider {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn current_session(&self) -> Result<Session, ProviderError> {
        Ok(self.session.clone())
    }
}

// 3. The Mock Implementation (For Unit Tests)
/// MockIdentityProvider
///
/// Test double for the identity provider: a fixed session, a simulated outage, and
/// an optional artificial delay for exercising the guard's timeout.
#[derive(Clone, Debug)]
pub struct MockIdentityProvider {
    pub session: Session,
    /// When true, every call fails with `ProviderError::Unavailable`.
    pub should_fail: bool,
    pub delay: Option<Duration>,
}

impl MockIdentityProvider {
    pub fn anonymous() -> Self {
        Self::with_session(Session::anonymous())
    }

    pub fn authenticated(user_id: Uuid) -> Self {
        Self::with_session(Session::authenticated(user_id))
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session,
            should_fail: false,
            delay: None,
        }
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::anonymous()
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn current_session(&self) -> Result<Session, ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(ProviderError::Unavailable(
                "Mock Identity Error: Simulation requested".to_string(),
            ));
        }
        Ok(self.session.clone())
    }
}
