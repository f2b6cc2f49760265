use std::{env, time::Duration};

use crate::guard::DEFAULT_PROVIDER_TIMEOUT;

/// AppConfig
///
/// Holds the guard service's configuration. Immutable once loaded and pulled into
/// handlers via `FromRef`. The route table itself is not part of it: only the path
/// of an optional JSON override is.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the `x-user-id` development bypass.
    pub env: Env,
    // Base URL of the Supabase project (auth and PostgREST live under it).
    pub supabase_url: String,
    // Public key sent as `apikey` with the caller's token.
    pub supabase_anon_key: String,
    // Service key for profile role lookups through PostgREST.
    pub supabase_service_key: String,
    // When set, roles are read straight from Postgres instead of PostgREST.
    pub db_url: Option<String>,
    // Bound for each identity/role call made by the guard.
    pub provider_timeout: Duration,
    pub bind_addr: String,
    // Optional JSON route table replacing the built-in portal table.
    pub route_table_path: Option<String>,
}

/// Env
///
/// Defines the runtime context: local development (bypass header, pretty logs) or
/// production (bearer tokens only, JSON logs).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_SUPABASE_URL: &str = "http://localhost:54321";
const LOCAL_ANON_KEY: &str = "local-anon-key";
const LOCAL_SERVICE_KEY: &str = "local-service-role-key";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

impl Default for AppConfig {
    /// default
    ///
    /// A non-panicking local configuration for test state setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            supabase_url: LOCAL_SUPABASE_URL.to_string(),
            supabase_anon_key: LOCAL_ANON_KEY.to_string(),
            supabase_service_key: LOCAL_SERVICE_KEY.to_string(),
            db_url: None,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            route_table_path: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables, fail-fast.
    ///
    /// # Panics
    /// Panics in production when a Supabase setting is missing, so the service never
    /// starts half-configured.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let provider_timeout = env::var("GUARD_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            // A zero bound would fail every protected navigation closed.
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_PROVIDER_TIMEOUT);
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let db_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let route_table_path = env::var("ROUTE_TABLE_PATH").ok().filter(|v| !v.is_empty());

        match env {
            Env::Local => Self {
                env: Env::Local,
                // The Supabase CLI stack listens on 54321 by default.
                supabase_url: env::var("SUPABASE_URL")
                    .unwrap_or_else(|_| LOCAL_SUPABASE_URL.to_string()),
                supabase_anon_key: env::var("SUPABASE_ANON_KEY")
                    .unwrap_or_else(|_| LOCAL_ANON_KEY.to_string()),
                supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                    .unwrap_or_else(|_| LOCAL_SERVICE_KEY.to_string()),
                db_url,
                provider_timeout,
                bind_addr,
                route_table_path,
            },
            Env::Production => Self {
                env: Env::Production,
                supabase_url: env::var("SUPABASE_URL")
                    .expect("FATAL: SUPABASE_URL required in prod"),
                supabase_anon_key: env::var("SUPABASE_ANON_KEY")
                    .expect("FATAL: SUPABASE_ANON_KEY required in prod"),
                supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                    .expect("FATAL: SUPABASE_SERVICE_ROLE_KEY required in prod"),
                db_url,
                provider_timeout,
                bind_addr,
                route_table_path,
            },
        }
    }
}
