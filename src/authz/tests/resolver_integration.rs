//! End-to-end resolver scenarios: configuration tables, provider
//! registration, live reload, and concurrent resolution.

use std::sync::Arc;

use async_trait::async_trait;
use clearance::config::{PermissionMapping, RoleMapping};
use clearance::{
    claim_kinds, AuthorizationOptions, AuthorizationResolver, ClaimsIdentity, ClaimsPrincipal,
    NameSet, OptionsMonitor, Principal, ProviderContext, ProviderRegistry, RoleProvider,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Role provider returning a fixed role list, for wiring tests.
struct StaticRoleProvider {
    roles: Vec<String>,
}

impl StaticRoleProvider {
    fn new(roles: &[&str]) -> Self {
        Self {
            roles: roles.iter().map(|role| role.to_string()).collect(),
        }
    }
}

#[async_trait]
impl RoleProvider for StaticRoleProvider {
    async fn roles(&self, _principal: &Principal) -> clearance::Result<Vec<String>> {
        Ok(self.roles.clone())
    }
}

fn subject_principal(subject: &str) -> Principal {
    Principal::Claims(ClaimsPrincipal::single(
        ClaimsIdentity::new(Some("cookie".to_string()))
            .with_claim(claim_kinds::NAME_IDENTIFIER, subject),
    ))
}

fn mapped_options() -> AuthorizationOptions {
    let mut options = AuthorizationOptions::default();
    options.policy.roles.push(RoleMapping {
        name: "R1".to_string(),
        users: ["42"].into_iter().collect(),
    });
    options.policy.permissions.push(PermissionMapping {
        name: "P1".to_string(),
        roles: ["R1"].into_iter().collect(),
    });
    options
}

#[tokio::test]
async fn user_identifier_maps_to_configured_role() -> anyhow::Result<()> {
    init_tracing();

    let monitor = OptionsMonitor::new(mapped_options());
    let resolver = AuthorizationResolver::new(&ProviderContext::new(monitor));

    let policy = resolver.get_policy(&subject_principal("42")).await?;
    assert_eq!(policy.roles.iter().collect::<Vec<_>>(), vec!["R1"]);

    let policy = resolver.get_policy(&subject_principal("7")).await?;
    assert!(policy.roles.is_empty());

    Ok(())
}

#[tokio::test]
async fn roles_grant_configured_permissions() -> anyhow::Result<()> {
    init_tracing();

    let monitor = OptionsMonitor::new(mapped_options());
    let resolver = AuthorizationResolver::new(&ProviderContext::new(monitor));
    let principal = subject_principal("42");

    let policy = resolver.get_policy(&principal).await?;
    assert_eq!(policy.permissions.iter().collect::<Vec<_>>(), vec!["P1"]);

    assert!(resolver.has_permission("P1", &principal).await?);
    assert!(!resolver.has_permission("P2", &principal).await?);
    assert!(resolver.is_in_role(&principal, "r1").await?);

    Ok(())
}

#[tokio::test]
async fn roles_deduplicate_case_insensitively_across_providers() {
    init_tracing();

    // The claims carry "Admin"; an extra provider contributes "admin".
    let mut options = AuthorizationOptions::default();
    options.roles.providers.insert("static");

    let monitor = OptionsMonitor::new(options);
    let mut registry = ProviderRegistry::with_built_ins(&ProviderContext::new(monitor.clone()));
    registry.register_role_provider("static", || Arc::new(StaticRoleProvider::new(&["admin"])));

    let resolver = AuthorizationResolver::with_registry(monitor, registry);

    let principal = Principal::Claims(ClaimsPrincipal::single(
        ClaimsIdentity::new(Some("cookie".to_string())).with_claim("role", "Admin"),
    ));

    let policy = resolver.get_policy(&principal).await.unwrap();
    assert_eq!(policy.roles.len(), 1);
    // First-seen casing wins: role providers run in registration order and
    // the configuration provider (claims scan) runs first.
    assert_eq!(policy.roles.iter().collect::<Vec<_>>(), vec!["Admin"]);
}

#[tokio::test]
async fn permissions_are_monotonic_in_roles() {
    init_tracing();

    let mut options = mapped_options();
    let monitor = OptionsMonitor::new(options.clone());
    let resolver = AuthorizationResolver::new(&ProviderContext::new(monitor.clone()));

    // User 42 holds R1, which grants P1.
    let policy = resolver.get_policy(&subject_principal("42")).await.unwrap();
    assert!(policy.has_permission("P1"));

    // Remove every role granting P1: the permission must disappear.
    options.policy.roles.clear();
    monitor.update(options);

    let policy = resolver.get_policy(&subject_principal("42")).await.unwrap();
    assert!(!policy.has_permission("P1"));
}

#[tokio::test]
async fn provider_collection_rebuild_observes_latest_configuration() {
    init_tracing();

    let mut options = AuthorizationOptions::default();
    options.roles.providers.extend(["one", "two"]);

    let monitor = OptionsMonitor::new(options.clone());
    let mut registry = ProviderRegistry::with_built_ins(&ProviderContext::new(monitor.clone()));
    registry.register_role_provider("one", || Arc::new(StaticRoleProvider::new(&["A"])));
    registry.register_role_provider("two", || Arc::new(StaticRoleProvider::new(&["B"])));

    let resolver = AuthorizationResolver::with_registry(monitor.clone(), registry);

    // Default provider plus the two configured ones.
    assert_eq!(resolver.role_provider_count().await.unwrap(), 3);

    options.roles.providers = NameSet::new();
    options.roles.providers.insert("one");
    monitor.update(options);

    assert_eq!(resolver.role_provider_count().await.unwrap(), 2);

    let policy = resolver
        .get_policy(&Principal::Plain { name: None })
        .await
        .unwrap();
    assert!(policy.roles.contains("A"));
    assert!(!policy.roles.contains("B"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_resolution_never_sees_a_half_swapped_provider_set() {
    init_tracing();

    let mut before = AuthorizationOptions::default();
    before.roles.providers.extend(["one", "two"]);

    let mut after = AuthorizationOptions::default();
    after.roles.providers.insert("one");

    let monitor = OptionsMonitor::new(before);
    let mut registry = ProviderRegistry::with_built_ins(&ProviderContext::new(monitor.clone()));
    registry.register_role_provider("one", || Arc::new(StaticRoleProvider::new(&["A"])));
    registry.register_role_provider("two", || Arc::new(StaticRoleProvider::new(&["B"])));

    let resolver = Arc::new(AuthorizationResolver::with_registry(monitor.clone(), registry));

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let resolver = resolver.clone();
        tasks.push(tokio::spawn(async move {
            resolver
                .get_policy(&Principal::Plain { name: None })
                .await
                .unwrap()
        }));
    }

    monitor.update(after);

    for task in tasks {
        let policy = task.await.unwrap();
        let roles: Vec<_> = policy.roles.iter().collect();
        // Either the full old provider list or the full new one; "B"
        // without "A" would mean a partially built collection.
        assert!(
            roles == vec!["A", "B"] || roles == vec!["A"],
            "unexpected role set: {roles:?}"
        );
    }
}

#[tokio::test]
async fn late_provider_registration_is_additive_not_exclusive() {
    init_tracing();

    // Configuring an extra provider never removes the defaults: the
    // configuration table still applies alongside the static provider.
    let mut options = mapped_options();
    options.roles.providers.insert("static");

    let monitor = OptionsMonitor::new(options);
    let mut registry = ProviderRegistry::with_built_ins(&ProviderContext::new(monitor.clone()));
    registry.register_role_provider("static", || Arc::new(StaticRoleProvider::new(&["Extra"])));

    let resolver = AuthorizationResolver::with_registry(monitor, registry);

    let policy = resolver.get_policy(&subject_principal("42")).await.unwrap();
    assert_eq!(
        policy.roles.iter().collect::<Vec<_>>(),
        vec!["Extra", "R1"]
    );
    assert!(policy.has_permission("P1"));
}
