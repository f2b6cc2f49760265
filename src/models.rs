use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Identity Schemas ---

/// Role
///
/// The portal roles stored in the `public.profiles.role` column.
/// Parsing is lenient: any value the portal does not know about becomes `Unknown`
/// instead of an error, so a bad row degrades to the fail-closed branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Scholar,
    Staff,
    Unknown,
}

impl Role {
    /// parse
    ///
    /// Case-insensitive, whitespace-tolerant mapping from the stored role string.
    pub fn parse(raw: &str) -> Role {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "scholar" => Role::Scholar,
            "staff" => Role::Staff,
            _ => Role::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Scholar => "scholar",
            Role::Staff => "staff",
            Role::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Role::parse(&raw))
    }
}

/// Session
///
/// The caller's authentication state, re-derived from the identity provider on
/// every navigation attempt. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Session {
    pub authenticated: bool,
    // Supabase `auth.users.id`. Absent for anonymous callers.
    pub user_id: Option<Uuid>,
}

impl Session {
    /// The fail-closed session: what the guard assumes when the provider cannot answer.
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            user_id: None,
        }
    }

    pub fn authenticated(user_id: Uuid) -> Self {
        Self {
            authenticated: true,
            user_id: Some(user_id),
        }
    }
}

/// RoleRecord
///
/// A row from the role store. `role` is `None` when the profile exists but the
/// column is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RoleRecord {
    pub role: Option<Role>,
}

// --- Route Schemas ---

/// AccessRequirement
///
/// The declarative access rule attached to every destination.
/// Serialized as `{"kind": "authenticated_with_role", "role": "scholar"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum AccessRequirement {
    /// No constraint.
    Public,
    /// The caller must NOT be authenticated (login, registration).
    GuestOnly,
    /// Any authenticated caller, role irrelevant.
    AuthenticatedOnly,
    /// Authenticated and holding exactly `role`.
    AuthenticatedWithRole { role: Role },
}

/// Destination
///
/// A named, addressable page of the portal SPA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Destination {
    pub name: String,
    /// Static segments and `:param` segments, e.g. `/projects/:id`.
    #[schema(example = "/projects/:id")]
    pub path: String,
    pub requirement: AccessRequirement,
}

impl Destination {
    pub fn new(name: &str, path: &str, requirement: AccessRequirement) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            requirement,
        }
    }
}

/// HomeDestinations
///
/// Names of the landing pages used as redirect targets: one for callers without a
/// usable role (the login page) and one per known role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct HomeDestinations {
    pub login: String,
    pub admin: String,
    pub scholar: String,
    pub staff: String,
}

/// RouteTableConfig
///
/// The serialized form of a route table: the ordered destinations plus the homes.
/// Read from `ROUTE_TABLE_PATH` at startup and served back by `GET /navigation/routes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RouteTableConfig {
    pub routes: Vec<Destination>,
    pub homes: HomeDestinations,
}

// --- Decision Schemas ---

/// NavigationDecision
///
/// The sole output of the guard. Exactly one per navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
#[ts(export)]
pub enum NavigationDecision {
    Allow,
    RedirectTo { destination: String },
}

impl NavigationDecision {
    pub fn redirect_to(destination: &str) -> Self {
        NavigationDecision::RedirectTo {
            destination: destination.to_string(),
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, NavigationDecision::Allow)
    }

    /// The redirect target, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            NavigationDecision::Allow => None,
            NavigationDecision::RedirectTo { destination } => Some(destination),
        }
    }
}

// --- Request Payloads ---

/// EvaluateRequest
///
/// Input payload for `POST /navigation/evaluate`. Both fields are SPA paths.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct EvaluateRequest {
    #[schema(example = "/upload")]
    pub to: String,
    /// Missing on the very first navigation of a page load.
    #[serde(default)]
    pub from: Option<String>,
}

/// EvaluateResponse
///
/// The decision plus, for redirects, the path the host router should push.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct EvaluateResponse {
    pub decision: NavigationDecision,
    pub redirect_path: Option<String>,
}

/// ErrorResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}
