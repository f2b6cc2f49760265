use portal_guard::{
    AccessRequirement, MockIdentityProvider, MockRoleStore, NavigationDecision, NavigationGuard,
    Role, RouteTable, Session,
    role_store::RoleStoreState,
};
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

const USER_ID: Uuid = Uuid::from_u128(7);

// --- Helper Functions ---

/// The session states the properties quantify over.
#[derive(Clone, Copy, Debug)]
enum Caller {
    Anonymous,
    /// Authenticated; `None` means the profile has no role.
    As(Option<Role>),
    /// Authenticated, but the role store is down.
    StoreDown,
    /// The identity provider itself is down.
    ProviderDown,
}

const CALLERS: [Caller; 8] = [
    Caller::Anonymous,
    Caller::As(Some(Role::Admin)),
    Caller::As(Some(Role::Scholar)),
    Caller::As(Some(Role::Staff)),
    Caller::As(Some(Role::Unknown)),
    Caller::As(None),
    Caller::StoreDown,
    Caller::ProviderDown,
];

fn guard_with(identity: MockIdentityProvider, roles: MockRoleStore) -> NavigationGuard {
    NavigationGuard::new(Arc::new(RouteTable::portal()), Arc::new(identity), Arc::new(roles))
}

fn guard_for(caller: Caller) -> NavigationGuard {
    match caller {
        Caller::Anonymous => guard_with(MockIdentityProvider::anonymous(), MockRoleStore::new()),
        Caller::As(Some(role)) => guard_with(
            MockIdentityProvider::authenticated(USER_ID),
            MockRoleStore::new().with_role(USER_ID, role),
        ),
        Caller::As(None) => guard_with(
            MockIdentityProvider::authenticated(USER_ID),
            MockRoleStore::new().with_empty_profile(USER_ID),
        ),
        Caller::StoreDown => guard_with(
            MockIdentityProvider::authenticated(USER_ID),
            MockRoleStore::new_failing(),
        ),
        Caller::ProviderDown => guard_with(
            MockIdentityProvider::new_failing(),
            MockRoleStore::new().with_role(USER_ID, Role::Admin),
        ),
    }
}

async fn evaluate(guard: &NavigationGuard, to: &str) -> NavigationDecision {
    let table = RouteTable::portal();
    let destination = table.lookup(to).unwrap();
    guard.evaluate(destination, None).await
}

fn home_for(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::Scholar => "dashboard",
        Role::Staff => "staff",
        Role::Unknown => "login",
    }
}

fn redirect(to: &str) -> NavigationDecision {
    NavigationDecision::redirect_to(to)
}

// --- Properties ---

#[tokio::test]
async fn public_destinations_always_allow() {
    for caller in CALLERS {
        let guard = guard_for(caller);
        for to in ["showcase", "project"] {
            assert!(evaluate(&guard, to).await.is_allow(), "{caller:?} -> {to}");
        }
    }
}

#[tokio::test]
async fn authenticated_only_requires_a_session_not_a_role() {
    for caller in CALLERS {
        let expected = match caller {
            Caller::Anonymous | Caller::ProviderDown => redirect("login"),
            // Role data is irrelevant here, even when it is missing or broken.
            Caller::As(_) | Caller::StoreDown => NavigationDecision::Allow,
        };
        assert_eq!(evaluate(&guard_for(caller), "profile").await, expected, "{caller:?}");
    }
}

#[tokio::test]
async fn guest_only_bounces_authenticated_callers_home() {
    for caller in CALLERS {
        let expected = match caller {
            Caller::Anonymous | Caller::ProviderDown => NavigationDecision::Allow,
            Caller::As(Some(role)) if role != Role::Unknown => redirect(home_for(role)),
            // No usable role: the login page is already the fail-closed landing.
            Caller::As(_) | Caller::StoreDown => NavigationDecision::Allow,
        };
        assert_eq!(evaluate(&guard_for(caller), "login").await, expected, "{caller:?}");
    }
}

#[tokio::test]
async fn role_destinations_admit_only_their_role() {
    for (to, required) in [
        ("dashboard", Role::Scholar),
        ("upload", Role::Scholar),
        ("admin", Role::Admin),
        ("staff", Role::Staff),
    ] {
        for caller in CALLERS {
            let expected = match caller {
                Caller::As(Some(role)) if role == required => NavigationDecision::Allow,
                Caller::As(Some(role)) => redirect(home_for(role)),
                Caller::As(None)
                | Caller::StoreDown
                | Caller::Anonymous
                | Caller::ProviderDown => redirect("login"),
            };
            assert_eq!(evaluate(&guard_for(caller), to).await, expected, "{caller:?} -> {to}");
        }
    }
}

#[tokio::test]
async fn fallback_destinations_never_redirect_again() {
    let table = RouteTable::portal();
    for caller in CALLERS {
        let role = match caller {
            Caller::As(Some(role)) if role != Role::Unknown => Some(role),
            _ => None,
        };
        let home = table.fallback_for(role);
        let decision = guard_for(caller).evaluate(home, None).await;
        assert_eq!(decision, NavigationDecision::Allow, "{caller:?} on {}", home.name);
    }
}

#[tokio::test]
async fn following_a_redirect_terminates_in_allow() {
    let table = RouteTable::portal();
    for caller in CALLERS {
        let guard = guard_for(caller);
        for start in table.destinations() {
            let mut current = start.clone();
            let mut hops = 0;
            loop {
                let decision = guard.evaluate(&current, None).await;
                let NavigationDecision::RedirectTo { destination } = decision else {
                    break;
                };
                hops += 1;
                assert!(hops <= 1, "{caller:?} from {} redirected twice", start.name);
                current = table.lookup(&destination).unwrap().clone();
            }
        }
    }
}

#[tokio::test]
async fn evaluation_is_idempotent() {
    let table = RouteTable::portal();
    for caller in CALLERS {
        let guard = guard_for(caller);
        for destination in table.destinations() {
            let first = guard.evaluate(destination, None).await;
            let second = guard.evaluate(destination, None).await;
            assert_eq!(first, second, "{caller:?} -> {}", destination.name);
        }
    }
}

// --- Scenarios ---

#[tokio::test]
async fn anonymous_caller_on_dashboard_goes_to_login() {
    let guard = guard_for(Caller::Anonymous);
    assert_eq!(evaluate(&guard, "dashboard").await, redirect("login"));
}

#[tokio::test]
async fn admin_on_login_goes_to_admin() {
    let guard = guard_for(Caller::As(Some(Role::Admin)));
    assert_eq!(evaluate(&guard, "login").await, redirect("admin"));
}

#[tokio::test]
async fn admin_on_upload_goes_to_admin() {
    let guard = guard_for(Caller::As(Some(Role::Admin)));
    assert_eq!(evaluate(&guard, "upload").await, redirect("admin"));
}

#[tokio::test]
async fn unknown_role_on_protected_routes_goes_to_login() {
    let guard = guard_for(Caller::As(Some(Role::Unknown)));
    for to in ["dashboard", "upload", "admin", "staff"] {
        assert_eq!(evaluate(&guard, to).await, redirect("login"), "{to}");
    }
}

#[tokio::test]
async fn staff_is_a_first_class_role() {
    let guard = guard_for(Caller::As(Some(Role::Staff)));
    assert_eq!(evaluate(&guard, "staff").await, NavigationDecision::Allow);
    assert_eq!(evaluate(&guard, "login").await, redirect("staff"));
    assert_eq!(evaluate(&guard, "dashboard").await, redirect("staff"));
}

// --- Failure Handling ---

#[tokio::test]
async fn profile_missing_from_store_fails_closed() {
    let guard = guard_with(MockIdentityProvider::authenticated(USER_ID), MockRoleStore::new());
    assert_eq!(evaluate(&guard, "dashboard").await, redirect("login"));
}

#[tokio::test]
async fn authenticated_session_without_user_id_fails_closed() {
    let session = Session {
        authenticated: true,
        user_id: None,
    };
    let guard = guard_with(
        MockIdentityProvider::with_session(session),
        MockRoleStore::new().with_role(USER_ID, Role::Scholar),
    );
    assert_eq!(evaluate(&guard, "dashboard").await, redirect("login"));
    assert_eq!(evaluate(&guard, "profile").await, NavigationDecision::Allow);
}

#[tokio::test]
async fn slow_identity_provider_times_out_to_login() {
    let guard = guard_with(
        MockIdentityProvider::authenticated(USER_ID).delayed(Duration::from_secs(5)),
        MockRoleStore::new().with_role(USER_ID, Role::Scholar),
    )
    .with_timeout(Duration::from_millis(20));

    assert_eq!(evaluate(&guard, "dashboard").await, redirect("login"));
}

#[tokio::test]
async fn slow_role_store_times_out_to_login() {
    let guard = guard_with(
        MockIdentityProvider::authenticated(USER_ID),
        MockRoleStore::new()
            .with_role(USER_ID, Role::Scholar)
            .delayed(Duration::from_secs(5)),
    )
    .with_timeout(Duration::from_millis(20));

    assert_eq!(evaluate(&guard, "upload").await, redirect("login"));
}

#[tokio::test]
async fn role_store_is_only_consulted_when_a_role_decision_is_needed() {
    let roles = Arc::new(MockRoleStore::new().with_role(USER_ID, Role::Scholar));
    let guard = NavigationGuard::new(
        Arc::new(RouteTable::portal()),
        Arc::new(MockIdentityProvider::authenticated(USER_ID)),
        roles.clone() as RoleStoreState,
    );

    evaluate(&guard, "showcase").await;
    evaluate(&guard, "project").await;
    evaluate(&guard, "profile").await;
    assert_eq!(roles.calls(), 0);

    evaluate(&guard, "dashboard").await;
    evaluate(&guard, "login").await;
    assert_eq!(roles.calls(), 2);
}

#[tokio::test]
async fn anonymous_caller_never_reaches_the_role_store() {
    let roles = Arc::new(MockRoleStore::new());
    let guard = NavigationGuard::new(
        Arc::new(RouteTable::portal()),
        Arc::new(MockIdentityProvider::anonymous()),
        roles.clone() as RoleStoreState,
    );

    for to in ["login", "dashboard", "admin", "profile"] {
        evaluate(&guard, to).await;
    }
    assert_eq!(roles.calls(), 0);
}

// --- Entry Points ---

#[tokio::test]
async fn evaluate_path_matches_before_deciding() {
    let guard = guard_for(Caller::As(Some(Role::Scholar)));

    let decision = guard.evaluate_path("/upload?draft=1", Some("/dashboard")).await;
    assert_eq!(decision, Ok(NavigationDecision::Allow));

    let decision = guard.evaluate_path("/admin/", None).await;
    assert_eq!(decision, Ok(redirect("dashboard")));

    // An unmatched `from` is ignored rather than failing the navigation.
    let decision = guard.evaluate_path("/projects/42", Some("/nowhere")).await;
    assert_eq!(decision, Ok(NavigationDecision::Allow));
}

#[tokio::test]
async fn evaluate_path_surfaces_no_route_match() {
    let guard = guard_for(Caller::Anonymous);
    let result = guard.evaluate_path("/does-not-exist", None).await;
    assert_eq!(
        result,
        Err(portal_guard::RouteError::NoRouteMatch("/does-not-exist".to_string()))
    );
}

#[tokio::test]
async fn evaluate_by_name_rejects_unknown_destinations() {
    let guard = guard_for(Caller::Anonymous);
    assert_eq!(
        guard.evaluate_by_name("upload", Some("login")).await,
        Ok(redirect("login"))
    );
    assert_eq!(
        guard.evaluate_by_name("settings", None).await,
        Err(portal_guard::RouteError::UnknownDestination("settings".to_string()))
    );
}

#[tokio::test]
async fn unknown_origin_is_dropped_by_both_entry_points() {
    let guard = guard_for(Caller::Anonymous);
    assert_eq!(
        guard.evaluate_by_name("upload", Some("settings")).await,
        Ok(redirect("login"))
    );
    assert_eq!(
        guard.evaluate_path("/upload", Some("/settings")).await,
        Ok(redirect("login"))
    );
}

#[tokio::test]
async fn every_portal_requirement_kind_is_covered() {
    let table = RouteTable::portal();
    let kinds: Vec<_> = table.destinations().map(|d| d.requirement).collect();
    assert!(kinds.contains(&AccessRequirement::Public));
    assert!(kinds.contains(&AccessRequirement::GuestOnly));
    assert!(kinds.contains(&AccessRequirement::AuthenticatedOnly));
    assert!(kinds.contains(&AccessRequirement::AuthenticatedWithRole { role: Role::Scholar }));
}
