//! Authorization engine integration tests against the built-in modules

use modgate_core::authz::{DenyReason, MatchedGuard, OwnershipClaim, Requirement};
use modgate_core::context::CredentialContext;
use modgate_core::modules::sales::{self, INVOICE_OWNER_POLICY};
use modgate_core::modules::{business, identity};
use modgate_core::AppError;
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;

fn context(user: &str, tenant: Option<&str>, permissions: &[&str], roles: &[&str]) -> CredentialContext {
    CredentialContext::new(
        Some(common::user_id(user)),
        tenant.map(common::tenant_id),
    )
    .with_permissions(permissions.iter().copied())
    .with_roles(roles.iter().copied())
}

#[rstest]
#[case(sales::INVOICES_READ, true)]
#[case(sales::INVOICES_WRITE, true)]
#[case(sales::INVOICES_DELETE, false)]
#[case(sales::INVOICES_MANAGE, false)]
fn test_permission_checks_use_granted_set(#[case] permission: &str, #[case] allowed: bool) {
    let host = common::start_host();
    let snapshot = host.current();
    let engine = &snapshot.engine;
    let ctx = context(
        "alice",
        Some("T1"),
        &[sales::INVOICES_READ, sales::INVOICES_WRITE],
        &[],
    );

    let decision = engine.check_permission(&ctx, permission);

    assert_eq!(decision.allowed, allowed);
    if allowed {
        assert_eq!(decision.matched_guard, MatchedGuard::RbacPermission);
    } else {
        assert_eq!(decision.reason, Some(DenyReason::InsufficientPermission));
    }
}

#[rstest]
#[case(Some("T1"), "T1", true, None)]
#[case(Some("T1"), "T2", false, Some(DenyReason::TenantMismatch))]
#[case(Some("T1"), "t1", false, Some(DenyReason::TenantMismatch))]
#[case(None, "T1", false, Some(DenyReason::MissingTenantContext))]
fn test_tenant_boundary(
    #[case] caller_tenant: Option<&str>,
    #[case] route_tenant: &str,
    #[case] allowed: bool,
    #[case] reason: Option<DenyReason>,
) {
    let host = common::start_host();
    let snapshot = host.current();
    let engine = &snapshot.engine;
    let ctx = context("alice", caller_tenant, &[business::BUSINESSES_READ], &[]);

    let decision = engine.check_tenant_boundary(&ctx, route_tenant);

    assert_eq!(decision.allowed, allowed);
    assert_eq!(decision.reason, reason);
}

#[test]
fn test_full_access_bypasses_permission_and_tenant() {
    let host = common::start_host();
    let snapshot = host.current();
    let engine = &snapshot.engine;
    let ctx = context("support", None, &["*"], &[]);

    let permission = engine.check_permission(&ctx, sales::INVOICES_DELETE);
    assert!(permission.allowed);
    assert_eq!(permission.matched_guard, MatchedGuard::SuperAdmin);

    let tenant = engine.check_tenant_boundary(&ctx, "T2");
    assert!(tenant.allowed);
    assert_eq!(tenant.matched_guard, MatchedGuard::SuperAdmin);
}

#[test]
fn test_full_access_is_an_exact_key() {
    let host = common::start_host();
    let snapshot = host.current();
    let engine = &snapshot.engine;
    let ctx = context("mallory", Some("T1"), &["sales:*"], &[]);

    assert!(!engine.check_permission(&ctx, sales::INVOICES_DELETE).allowed);
    assert!(!engine.has_full_access(&ctx));
}

#[rstest]
#[case::owner_without_permissions("alice", &[], &[], Some(MatchedGuard::Ownership))]
#[case::elevated("bob", &[sales::INVOICES_MANAGE], &[], Some(MatchedGuard::ElevatedPermission))]
#[case::accountant_role("bob", &[], &["accountant"], Some(MatchedGuard::RbacPermission))]
#[case::full_access("bob", &["*"], &[], Some(MatchedGuard::SuperAdmin))]
#[case::stranger("bob", &[sales::INVOICES_READ], &["member"], None)]
fn test_invoice_ownership_chain(
    #[case] caller: &str,
    #[case] permissions: &[&str],
    #[case] roles: &[&str],
    #[case] expected: Option<MatchedGuard>,
) {
    let host = common::start_host();
    let snapshot = host.current();
    let engine = &snapshot.engine;
    let invoice = common::invoice("inv-9", "T1", "alice");
    let ctx = context(caller, Some("T1"), permissions, roles);

    let decision = engine.check_ownership(&ctx, INVOICE_OWNER_POLICY, &invoice);

    match expected {
        Some(guard) => {
            assert!(decision.allowed);
            assert_eq!(decision.matched_guard, guard);
        }
        None => {
            assert!(!decision.allowed);
            assert_eq!(decision.matched_guard, MatchedGuard::None);
            assert_eq!(decision.reason, Some(DenyReason::InsufficientPermission));
        }
    }
}

#[test]
fn test_resource_without_owner_only_passes_elevated_guards() {
    let host = common::start_host();
    let snapshot = host.current();
    let engine = &snapshot.engine;
    let orphan = OwnershipClaim::new("imported-row", None);

    let plain = context("alice", Some("T1"), &[], &[]);
    assert!(!engine.check_ownership(&plain, INVOICE_OWNER_POLICY, &orphan).allowed);

    let manager = context("alice", Some("T1"), &[sales::INVOICES_MANAGE], &[]);
    assert!(engine.check_ownership(&manager, INVOICE_OWNER_POLICY, &orphan).allowed);
}

#[test]
fn test_unknown_policy_denies() {
    let host = common::start_host();
    let snapshot = host.current();
    let engine = &snapshot.engine;
    let invoice = common::invoice("inv-9", "T1", "alice");
    let ctx = context("alice", Some("T1"), &[], &[]);

    let decision = engine.check_ownership(&ctx, "sales.no-such-policy", &invoice);
    assert!(!decision.allowed);
}

#[test]
fn test_profile_policy_from_identity_module() {
    let host = common::start_host();
    let snapshot = host.current();
    let engine = &snapshot.engine;
    let profile = OwnershipClaim::new((), Some(common::user_id("alice")));

    let own = context("alice", Some("T1"), &[], &[]);
    let other = context("bob", Some("T1"), &[], &[]);
    let admin = context("bob", Some("T1"), &[identity::USERS_READ], &[]);

    assert!(engine.check_ownership(&own, identity::PROFILE_POLICY, &profile).allowed);
    assert!(!engine.check_ownership(&other, identity::PROFILE_POLICY, &profile).allowed);
    assert!(engine.check_ownership(&admin, identity::PROFILE_POLICY, &profile).allowed);
}

#[test]
fn test_authorize_requires_permission_and_tenant() {
    let host = common::start_host();
    let snapshot = host.current();
    let engine = &snapshot.engine;
    let ctx = context("alice", Some("T1"), &[sales::INVOICES_READ], &[]);

    let same_tenant = engine.authorize(&ctx, Requirement::Permission(sales::INVOICES_READ), Some("T1"));
    assert!(same_tenant.allowed);
    assert_eq!(same_tenant.matched_guard, MatchedGuard::RbacPermission);

    let other_tenant =
        engine.authorize(&ctx, Requirement::Permission(sales::INVOICES_READ), Some("T2"));
    assert_eq!(other_tenant.reason, Some(DenyReason::TenantMismatch));

    let missing = engine.authorize(&ctx, Requirement::Permission(sales::INVOICES_DELETE), Some("T1"));
    assert_eq!(missing.reason, Some(DenyReason::InsufficientPermission));
}

#[test]
fn test_deny_maps_to_forbidden_with_coarse_reason() {
    let host = common::start_host();
    let snapshot = host.current();
    let engine = &snapshot.engine;
    let ctx = context("alice", Some("T1"), &[], &[]);

    let err = engine
        .check_tenant_boundary(&ctx, "T2")
        .into_result()
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(ref msg) if msg == "tenant mismatch"));
}
