use thiserror::Error;

/// RouteError
///
/// Failures raised by the route table. Everything except `NoRouteMatch` is a
/// configuration bug and is reported once, when the table is built at startup.
/// `NoRouteMatch` is recoverable: the host renders its not-found page.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("unknown destination '{0}'")]
    UnknownDestination(String),

    #[error("no route matches path '{0}'")]
    NoRouteMatch(String),

    #[error("duplicate destination '{0}'")]
    DuplicateDestination(String),

    #[error("invalid path pattern '{pattern}' for destination '{name}'")]
    InvalidPattern { name: String, pattern: String },

    #[error("destination '{0}' requires the unknown role and can never be entered")]
    UnsatisfiableRequirement(String),

    /// A fallback target would redirect again for the very session that selected it.
    #[error("fallback destination '{destination}' for {subject} does not admit that caller")]
    InconsistentFallback { subject: String, destination: String },

    #[error("invalid route table configuration: {0}")]
    InvalidConfig(String),
}

/// ProviderError
///
/// Identity provider faults. The guard never surfaces these; they collapse into
/// an anonymous session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("identity provider timed out")]
    Timeout,
}

/// StoreError
///
/// Role store faults. Like `ProviderError`, they resolve to the fail-closed branch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("role store unavailable: {0}")]
    Unavailable(String),

    #[error("role store timed out")]
    Timeout,
}
