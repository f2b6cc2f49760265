use std::collections::HashSet;

use crate::{
    error::RouteError,
    models::{AccessRequirement, Destination, HomeDestinations, Role, RouteTableConfig},
};

/// One compiled pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param,
}

/// Indices of the resolved home destinations.
#[derive(Debug, Clone, Copy)]
struct Fallbacks {
    login: usize,
    admin: usize,
    scholar: usize,
    staff: usize,
}

/// A destination together with its compiled pattern.
#[derive(Debug, Clone)]
struct Entry {
    destination: Destination,
    segments: Vec<Segment>,
}

impl Entry {
    /// Number of static segments. Higher means more specific.
    fn specificity(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Static(_)))
            .count()
    }

    fn matches(&self, path_segments: &[&str]) -> bool {
        self.segments.len() == path_segments.len()
            && self
                .segments
                .iter()
                .zip(path_segments)
                .all(|(segment, actual)| match segment {
                    Segment::Static(expected) => expected.eq_ignore_ascii_case(actual),
                    Segment::Param => true,
                })
    }
}

/// RouteTable
///
/// The static, ordered mapping from path pattern to destination, plus the
/// role-to-home fallback mapping used for redirects.
///
/// A `RouteTable` can only be obtained through validation, so every value of this
/// type satisfies the loop-freedom invariant: each fallback target admits exactly
/// the session that selects it. The table is read-only after construction and is
/// shared across evaluations behind an `Arc`.
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<Entry>,
    homes: HomeDestinations,
    fallbacks: Fallbacks,
}

impl RouteTable {
    /// new
    ///
    /// Builds and validates a table. Any error here is a configuration bug and the
    /// host is expected to refuse to start.
    pub fn new(
        destinations: Vec<Destination>,
        homes: HomeDestinations,
    ) -> Result<Self, RouteError> {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(destinations.len());

        for destination in destinations {
            if !seen.insert(destination.name.clone()) {
                return Err(RouteError::DuplicateDestination(destination.name));
            }
            if matches!(
                destination.requirement,
                AccessRequirement::AuthenticatedWithRole {
                    role: Role::Unknown
                }
            ) {
                return Err(RouteError::UnsatisfiableRequirement(destination.name));
            }
            let segments = compile_pattern(&destination)?;
            entries.push(Entry {
                destination,
                segments,
            });
        }

        let fallbacks = validate_fallbacks(&entries, &homes)?;
        Ok(Self {
            entries,
            homes,
            fallbacks,
        })
    }

    /// from_config
    pub fn from_config(config: RouteTableConfig) -> Result<Self, RouteError> {
        Self::new(config.routes, config.homes)
    }

    /// from_json
    ///
    /// Parses a `RouteTableConfig` document and validates it.
    pub fn from_json(json: &str) -> Result<Self, RouteError> {
        let config: RouteTableConfig =
            serde_json::from_str(json).map_err(|e| RouteError::InvalidConfig(e.to_string()))?;
        Self::from_config(config)
    }

    /// portal
    ///
    /// The built-in route table of the FYP portal SPA.
    pub fn portal() -> Self {
        use AccessRequirement::*;

        let destinations = vec![
            Destination::new("login", "/", GuestOnly),
            Destination::new(
                "dashboard",
                "/dashboard",
                AuthenticatedWithRole {
                    role: Role::Scholar,
                },
            ),
            Destination::new(
                "upload",
                "/upload",
                AuthenticatedWithRole {
                    role: Role::Scholar,
                },
            ),
            Destination::new("admin", "/admin", AuthenticatedWithRole { role: Role::Admin }),
            Destination::new("staff", "/staff", AuthenticatedWithRole { role: Role::Staff }),
            Destination::new("profile", "/profile", AuthenticatedOnly),
            Destination::new("showcase", "/projects", Public),
            Destination::new("project", "/projects/:id", Public),
        ];
        let homes = HomeDestinations {
            login: "login".to_string(),
            admin: "admin".to_string(),
            scholar: "dashboard".to_string(),
            staff: "staff".to_string(),
        };

        Self::new(destinations, homes).expect("FATAL: built-in portal route table is invalid")
    }

    /// lookup
    ///
    /// Resolves a destination by its unique name.
    pub fn lookup(&self, name: &str) -> Result<&Destination, RouteError> {
        self.entries
            .iter()
            .map(|e| &e.destination)
            .find(|d| d.name == name)
            .ok_or_else(|| RouteError::UnknownDestination(name.to_string()))
    }

    /// match_path
    ///
    /// Finds the most specific destination for a concrete SPA path.
    /// Query strings, fragments and empty segments (trailing or doubled slashes) are
    /// ignored, and static segments compare ASCII case-insensitively like the SPA
    /// router does. Static segments beat `:param` segments; ties go to the earlier entry.
    pub fn match_path(&self, path: &str) -> Result<&Destination, RouteError> {
        let segments = split_path(path);

        let mut best: Option<&Entry> = None;
        for entry in self.entries.iter().filter(|e| e.matches(&segments)) {
            // Strictly greater keeps the earlier entry on ties.
            if best.is_none_or(|b| entry.specificity() > b.specificity()) {
                best = Some(entry);
            }
        }

        best.map(|e| &e.destination)
            .ok_or_else(|| RouteError::NoRouteMatch(path.to_string()))
    }

    /// path_for
    ///
    /// The path pattern of a destination, for hosts that navigate by path.
    pub fn path_for(&self, name: &str) -> Result<&str, RouteError> {
        self.lookup(name).map(|d| d.path.as_str())
    }

    /// fallback_for
    ///
    /// The total role -> home mapping. `None` stands for "no usable role": an
    /// unauthenticated caller, a failed lookup, or `Role::Unknown`.
    pub fn fallback_for(&self, role: Option<Role>) -> &Destination {
        let index = match role {
            Some(Role::Admin) => self.fallbacks.admin,
            Some(Role::Scholar) => self.fallbacks.scholar,
            Some(Role::Staff) => self.fallbacks.staff,
            Some(Role::Unknown) | None => self.fallbacks.login,
        };
        &self.entries[index].destination
    }

    pub fn login(&self) -> &Destination {
        self.fallback_for(None)
    }

    pub fn homes(&self) -> &HomeDestinations {
        &self.homes
    }

    /// Destinations in table order.
    pub fn destinations(&self) -> impl Iterator<Item = &Destination> {
        self.entries.iter().map(|e| &e.destination)
    }

    /// to_config
    ///
    /// The serializable view of the table, used by `GET /navigation/routes`.
    pub fn to_config(&self) -> RouteTableConfig {
        RouteTableConfig {
            routes: self.destinations().cloned().collect(),
            homes: self.homes.clone(),
        }
    }
}

fn position_of(entries: &[Entry], name: &str) -> Result<usize, RouteError> {
    entries
        .iter()
        .position(|e| e.destination.name == name)
        .ok_or_else(|| RouteError::UnknownDestination(name.to_string()))
}

/// validate_fallbacks
///
/// Every home must exist, and must admit the caller it is the home of:
/// - login: reachable by an anonymous caller (`Public` or `GuestOnly`);
/// - role R home: `Public`, `AuthenticatedOnly`, or `AuthenticatedWithRole(R)`.
fn validate_fallbacks(entries: &[Entry], homes: &HomeDestinations) -> Result<Fallbacks, RouteError> {
    let login = position_of(entries, &homes.login)?;
    if !matches!(
        entries[login].destination.requirement,
        AccessRequirement::Public | AccessRequirement::GuestOnly
    ) {
        return Err(RouteError::InconsistentFallback {
            subject: "unauthenticated callers".to_string(),
            destination: homes.login.clone(),
        });
    }

    let mut resolved = [0usize; 3];
    for (slot, (role, name)) in [
        (Role::Admin, &homes.admin),
        (Role::Scholar, &homes.scholar),
        (Role::Staff, &homes.staff),
    ]
    .into_iter()
    .enumerate()
    {
        let index = position_of(entries, name)?;
        let admits = match entries[index].destination.requirement {
            AccessRequirement::Public | AccessRequirement::AuthenticatedOnly => true,
            AccessRequirement::AuthenticatedWithRole { role: required } => required == role,
            AccessRequirement::GuestOnly => false,
        };
        if !admits {
            return Err(RouteError::InconsistentFallback {
                subject: format!("role '{role}'"),
                destination: name.clone(),
            });
        }
        resolved[slot] = index;
    }

    Ok(Fallbacks {
        login,
        admin: resolved[0],
        scholar: resolved[1],
        staff: resolved[2],
    })
}

/// Splits a concrete path into its non-empty segments, dropping query and fragment.
fn split_path(path: &str) -> Vec<&str> {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    path[..end].split('/').filter(|s| !s.is_empty()).collect()
}

fn compile_pattern(destination: &Destination) -> Result<Vec<Segment>, RouteError> {
    let invalid = || RouteError::InvalidPattern {
        name: destination.name.clone(),
        pattern: destination.path.clone(),
    };

    let pattern = destination.path.as_str();
    if !pattern.starts_with('/') || pattern.contains(['?', '#', '*']) {
        return Err(invalid());
    }

    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|raw| match raw.strip_prefix(':') {
            Some("") => Err(invalid()),
            Some(_) => Ok(Segment::Param),
            None if raw.contains(':') => Err(invalid()),
            None => Ok(Segment::Static(raw.to_string())),
        })
        .collect()
}
