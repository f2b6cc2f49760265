/// Router Module Index
///
/// The guard service has no protected endpoints of its own: every caller, anonymous
/// or not, may ask for a decision. Identity is resolved per request by the
/// `CallerIdentity` extractor and interpreted by the guard.

/// Liveness endpoint.
pub mod public;

/// Route table listing and navigation decisions.
pub mod navigation;
