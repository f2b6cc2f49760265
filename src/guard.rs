use std::{sync::Arc, time::Duration};

use tracing::Instrument;

use crate::{
    error::{ProviderError, RouteError, StoreError},
    identity::IdentityState,
    models::{AccessRequirement, Destination, NavigationDecision, Role, Session},
    role_store::RoleStoreState,
    route_table::RouteTable,
};

/// Default bound for each of the two suspension points.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(3);

/// NavigationGuard
///
/// Decides, for one navigation attempt, whether the host router may proceed or must
/// redirect. Holds only shared, read-only handles: the route table and the two
/// injected capabilities. All per-attempt state lives on the stack of `evaluate`,
/// so one guard can serve any number of concurrent evaluations.
///
/// Every infrastructure fault degrades to the most restrictive decision. The guard
/// never returns an error for a navigation it was able to look up.
#[derive(Clone)]
pub struct NavigationGuard {
    table: Arc<RouteTable>,
    identity: IdentityState,
    roles: RoleStoreState,
    timeout: Duration,
}

impl NavigationGuard {
    pub fn new(table: Arc<RouteTable>, identity: IdentityState, roles: RoleStoreState) -> Self {
        Self {
            table,
            identity,
            roles,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// Bounds each provider call. An elapsed call counts as a provider fault.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// evaluate
    ///
    /// Runs the decision algorithm for `to`. `from` is only recorded on the span; it
    /// is `None` on the first navigation of a page load.
    pub async fn evaluate(&self, to: &Destination, from: Option<&Destination>) -> NavigationDecision {
        let span = tracing::info_span!(
            "navigation",
            to = %to.name,
            from = from.map(|d| d.name.as_str()).unwrap_or("<start>"),
        );

        async move {
            let decision = self.decide(to).await;
            match &decision {
                NavigationDecision::Allow => tracing::debug!("navigation allowed"),
                NavigationDecision::RedirectTo { destination } => {
                    tracing::info!(redirect_to = %destination, "navigation redirected")
                }
            }
            decision
        }
        .instrument(span)
        .await
    }

    /// evaluate_path
    ///
    /// Path-based entry point. Surfaces `NoRouteMatch` so the host can render its
    /// not-found page; an unmatched `from` is simply dropped.
    pub async fn evaluate_path(
        &self,
        to_path: &str,
        from_path: Option<&str>,
    ) -> Result<NavigationDecision, RouteError> {
        let to = self.table.match_path(to_path)?;
        let from = from_path.and_then(|p| self.table.match_path(p).ok());
        Ok(self.evaluate(to, from).await)
    }

    /// evaluate_by_name
    ///
    /// Name-based entry point for hosts that navigate by destination name. Like
    /// `evaluate_path`, an unknown `from` is dropped.
    pub async fn evaluate_by_name(
        &self,
        to_name: &str,
        from_name: Option<&str>,
    ) -> Result<NavigationDecision, RouteError> {
        let to = self.table.lookup(to_name)?;
        let from = from_name.and_then(|name| self.table.lookup(name).ok());
        Ok(self.evaluate(to, from).await)
    }

    async fn decide(&self, to: &Destination) -> NavigationDecision {
        // Public pages never depend on who is asking; skip both round trips.
        if to.requirement == AccessRequirement::Public {
            return NavigationDecision::Allow;
        }

        let session = self.resolve_session().await;

        match (to.requirement, session.authenticated) {
            (AccessRequirement::Public, _) => NavigationDecision::Allow,
            (AccessRequirement::GuestOnly, false) => NavigationDecision::Allow,
            (
                AccessRequirement::AuthenticatedOnly | AccessRequirement::AuthenticatedWithRole { .. },
                false,
            ) => self.redirect_or_stay(to, self.table.login()),
            (AccessRequirement::AuthenticatedOnly, true) => NavigationDecision::Allow,
            // Guest-only pages bounce logged-in callers to their home; role pages
            // need the role itself.
            (AccessRequirement::GuestOnly, true)
            | (AccessRequirement::AuthenticatedWithRole { .. }, true) => {
                let role = self.resolve_role(&session).await;
                self.decide_for_role(to, role)
            }
        }
    }

    /// decide_for_role
    ///
    /// `role` is `None` when the role could not be established.
    fn decide_for_role(&self, to: &Destination, role: Option<Role>) -> NavigationDecision {
        if let AccessRequirement::AuthenticatedWithRole { role: required } = to.requirement {
            if role == Some(required) {
                return NavigationDecision::Allow;
            }
        }
        self.redirect_or_stay(to, self.table.fallback_for(role))
    }

    /// Redirecting to the page being entered would loop; the caller is already on
    /// the page that admits them.
    fn redirect_or_stay(&self, to: &Destination, target: &Destination) -> NavigationDecision {
        if target.name == to.name {
            NavigationDecision::Allow
        } else {
            NavigationDecision::redirect_to(&target.name)
        }
    }

    /// resolve_session
    ///
    /// Fail-closed: any fault or timeout yields an anonymous session.
    async fn resolve_session(&self) -> Session {
        let outcome = match tokio::time::timeout(self.timeout, self.identity.current_session()).await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        };

        match outcome {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "session lookup failed, treating caller as anonymous");
                Session::anonymous()
            }
        }
    }

    /// resolve_role
    ///
    /// Returns a known role or `None`. Misses, faults, timeouts, a missing user id and
    /// `Role::Unknown` all collapse to `None`.
    async fn resolve_role(&self, session: &Session) -> Option<Role> {
        let Some(user_id) = session.user_id else {
            tracing::warn!("authenticated session carries no user id");
            return None;
        };

        let outcome = match tokio::time::timeout(self.timeout, self.roles.role_for(user_id)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout),
        };

        match outcome {
            Ok(Some(record)) => match record.role {
                Some(Role::Unknown) | None => {
                    tracing::warn!(%user_id, "profile has no usable role");
                    None
                }
                Some(role) => Some(role),
            },
            Ok(None) => {
                tracing::warn!(%user_id, "no profile found for user");
                None
            }
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "role lookup failed");
                None
            }
        }
    }
}
