use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{Role, RoleRecord},
};

/// RoleStore Trait
///
/// Looks up the portal role of an authenticated user. `Ok(None)` means the store
/// answered and has no profile for that user; `Err` means it could not answer.
/// The guard treats both the same way (fail-closed), but logs them differently.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn role_for(&self, user_id: Uuid) -> Result<Option<RoleRecord>, StoreError>;
}

/// RoleStoreState
///
/// The concrete type used to share the role store across evaluations.
pub type RoleStoreState = Arc<dyn RoleStore>;

/// PostgresRoleStore
///
/// Reads `public.profiles.role` directly. Used when the guard service runs next to
/// the portal database.
pub struct PostgresRoleStore {
    pool: PgPool,
}

impl PostgresRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for PostgresRoleStore {
    async fn role_for(&self, user_id: Uuid) -> Result<Option<RoleRecord>, StoreError> {
        // Outer Option: row exists. Inner Option: role column is non-null.
        let row: Option<Option<String>> =
            sqlx::query_scalar("SELECT role FROM profiles WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!("role_for error: {:?}", e);
                    StoreError::Unavailable(e.to_string())
                })?;

        Ok(row.map(|role| RoleRecord {
            role: role.as_deref().map(Role::parse),
        }))
    }
}

/// SupabaseRoleStore
///
/// Reads the profile role through Supabase's PostgREST endpoint using the service
/// key, so row level security does not hide other users' profiles.
#[derive(Clone)]
pub struct SupabaseRoleStore {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseRoleStore {
    pub fn new(http: reqwest::Client, base_url: &str, service_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }
}

#[async_trait]
impl RoleStore for SupabaseRoleStore {
    async fn role_for(&self, user_id: Uuid) -> Result<Option<RoleRecord>, StoreError> {
        let url = format!("{}/rest/v1/profiles", self.base_url);
        let id_filter = format!("eq.{user_id}");

        let response = self
            .http
            .get(url)
            .query(&[("id", id_filter.as_str()), ("select", "role")])
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Unavailable(format!(
                "supabase rest returned {}",
                response.status()
            )));
        }

        // PostgREST always answers with an array; an empty one is a miss.
        let rows = response
            .json::<Vec<ProfileRoleRow>>()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(rows.into_iter().next().map(|row| RoleRecord { role: row.role }))
    }
}

#[derive(Deserialize)]
struct ProfileRoleRow {
    role: Option<Role>,
}

/// MockRoleStore
///
/// In-memory role store for tests. Counts calls so tests can assert that the guard
/// skips the lookup when no role decision is needed.
#[derive(Default)]
pub struct MockRoleStore {
    roles: HashMap<Uuid, Option<Role>>,
    pub should_fail: bool,
    pub delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Registers a profile with the given role.
    pub fn with_role(mut self, user_id: Uuid, role: Role) -> Self {
        self.roles.insert(user_id, Some(role));
        self
    }

    /// Registers a profile whose role column is empty.
    pub fn with_empty_profile(mut self, user_id: Uuid) -> Self {
        self.roles.insert(user_id, None);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoleStore for MockRoleStore {
    async fn role_for(&self, user_id: Uuid) -> Result<Option<RoleRecord>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(StoreError::Unavailable(
                "Mock Store Error: Simulation requested".to_string(),
            ));
        }
        Ok(self.roles.get(&user_id).map(|role| RoleRecord { role: *role }))
    }
}
