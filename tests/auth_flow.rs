//! End-to-end tests for the session/token lifecycle
//!
//! Drives the auth service against the in-memory store with a fixture
//! RSA keypair: register/login, rotation chains, reuse detection with
//! cascading revocation, logout idempotence, and tenant isolation.

use std::sync::Arc;

use uuid::Uuid;

use campus_auth_server::auth::{
    AuthError, AuthService, PasswordHasher, TokenSigner, TokenType, TokenVerifier,
};
use campus_auth_server::models::Role;
use campus_auth_server::store::{CredentialStore, InMemoryCredentialStore};

const PRIVATE_PEM: &str = include_str!("fixtures/jwt_private.pem");
const PUBLIC_PEM: &str = include_str!("fixtures/jwt_public.pem");

struct Harness {
    store: Arc<InMemoryCredentialStore>,
    service: AuthService,
    verifier: TokenVerifier,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryCredentialStore::new());
    // Cost 4 keeps bcrypt fast in tests; the hashing semantics are the
    // same as at the production default of 12.
    let hasher = PasswordHasher::new(4);
    let signer = TokenSigner::from_pem(PRIVATE_PEM.as_bytes(), 900, 7).unwrap();
    let verifier = TokenVerifier::from_pem(PUBLIC_PEM.as_bytes()).unwrap();

    let service = AuthService::new(store.clone(), hasher, signer, verifier.clone()).unwrap();
    Harness {
        store,
        service,
        verifier,
    }
}

async fn register_and_login(
    h: &Harness,
    tenant: &str,
    email: &str,
    password: &str,
) -> (Uuid, String, String) {
    let user = h
        .service
        .register(tenant, email, password, None)
        .await
        .unwrap();
    let pair = h.service.login(tenant, email, password).await.unwrap();
    (user.id, pair.access_token, pair.refresh_token)
}

#[tokio::test]
async fn test_register_then_login_issues_student_tokens() {
    let h = harness();
    let (user_id, access, refresh) =
        register_and_login(&h, "acme", "ada@example.com", "password123").await;

    let claims = h.verifier.verify_typed(&access, TokenType::Access).unwrap();
    assert_eq!(claims.subject().unwrap(), user_id);
    assert_eq!(claims.tenant_id, "acme");
    assert_eq!(claims.roles, Some(vec![Role::Student]));

    let refresh_claims = h
        .verifier
        .verify_typed(&refresh, TokenType::Refresh)
        .unwrap();
    assert_eq!(refresh_claims.sid, claims.sid);
    assert_eq!(refresh_claims.roles, None);

    // Login appended exactly one active session.
    let user = h.store.find_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(user.refresh_sessions.len(), 1);
    assert_eq!(user.active_session_count(), 1);
}

#[tokio::test]
async fn test_register_normalizes_email() {
    let h = harness();
    h.service
        .register("acme", "  Ada@Example.COM ", "password123", None)
        .await
        .unwrap();

    // Login with a differently-cased spelling of the same identity.
    assert!(h
        .service
        .login("acme", "ada@example.com", "password123")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let h = harness();
    h.service
        .register("acme", "ada@example.com", "password123", None)
        .await
        .unwrap();

    let res = h
        .service
        .register("acme", "ada@example.com", "different-pass", None)
        .await;
    assert!(matches!(res, Err(AuthError::DuplicateIdentity)));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let h = harness();
    h.service
        .register("acme", "ada@example.com", "password123", None)
        .await
        .unwrap();

    let wrong_password = h.service.login("acme", "ada@example.com", "wrong").await;
    let unknown_email = h
        .service
        .login("acme", "nobody@example.com", "password123")
        .await;
    let wrong_tenant = h
        .service
        .login("globex", "ada@example.com", "password123")
        .await;

    assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
    assert!(matches!(unknown_email, Err(AuthError::InvalidCredentials)));
    assert!(matches!(wrong_tenant, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn test_rotation_chain_grows_session_set_by_one_each_time() {
    let h = harness();
    let (user_id, _, mut refresh) =
        register_and_login(&h, "acme", "ada@example.com", "password123").await;

    for round in 1..=3 {
        let pair = h.service.rotate_refresh(&refresh).await.unwrap();
        refresh = pair.refresh_token;

        let user = h.store.find_by_id(user_id).await.unwrap().unwrap();
        // Nothing is deleted: login's session plus one per rotation.
        assert_eq!(user.refresh_sessions.len(), 1 + round);
        // Each rotation retires exactly the one it spent.
        assert_eq!(user.active_session_count(), 1);
    }
}

#[tokio::test]
async fn test_rotation_issues_a_fresh_sid() {
    let h = harness();
    let (_, _, refresh) = register_and_login(&h, "acme", "ada@example.com", "password123").await;

    let old_sid = h.verifier.verify(&refresh).unwrap().sid;
    let pair = h.service.rotate_refresh(&refresh).await.unwrap();
    let new_sid = h.verifier.verify(&pair.refresh_token).unwrap().sid;

    assert_ne!(old_sid, new_sid);
}

#[tokio::test]
async fn test_reuse_detection_revokes_everything() {
    let h = harness();
    let (user_id, _, t0) = register_and_login(&h, "acme", "ada@example.com", "password123").await;

    // Normal rotation: t0 is spent, t1 is live.
    let t1 = h.service.rotate_refresh(&t0).await.unwrap().refresh_token;

    // Replaying t0 is unambiguous evidence of leakage.
    let replay = h.service.rotate_refresh(&t0).await;
    assert!(matches!(replay, Err(AuthError::ReusedRefresh)));

    let user = h.store.find_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(user.active_session_count(), 0);

    // The cascade also kills the token that would otherwise still work.
    let after_cascade = h.service.rotate_refresh(&t1).await;
    assert!(matches!(after_cascade, Err(AuthError::InvalidRefresh)));
}

#[tokio::test]
async fn test_reused_refresh_retry_is_harmless() {
    let h = harness();
    let (user_id, _, t0) = register_and_login(&h, "acme", "ada@example.com", "password123").await;
    h.service.rotate_refresh(&t0).await.unwrap();

    assert!(matches!(
        h.service.rotate_refresh(&t0).await,
        Err(AuthError::ReusedRefresh)
    ));
    // A blind retry after the cascade finds no active session left.
    assert!(matches!(
        h.service.rotate_refresh(&t0).await,
        Err(AuthError::InvalidRefresh)
    ));

    let user = h.store.find_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(user.active_session_count(), 0);
}

#[tokio::test]
async fn test_access_token_cannot_rotate() {
    let h = harness();
    let (_, access, _) = register_and_login(&h, "acme", "ada@example.com", "password123").await;

    let res = h.service.rotate_refresh(&access).await;
    assert!(matches!(res, Err(AuthError::InvalidRefresh)));
}

#[tokio::test]
async fn test_garbage_token_cannot_rotate() {
    let h = harness();
    let res = h.service.rotate_refresh("not.a.token").await;
    assert!(matches!(res, Err(AuthError::InvalidRefresh)));
}

#[tokio::test]
async fn test_rotation_rederives_roles_from_the_record() {
    let h = harness();
    let (user_id, _, refresh) =
        register_and_login(&h, "acme", "ada@example.com", "password123").await;

    // Administrative grant lands between login and rotation.
    let mut user = h.store.find_by_id(user_id).await.unwrap().unwrap();
    user.roles.push(Role::Admin);
    h.store.save(user).await.unwrap();

    let pair = h.service.rotate_refresh(&refresh).await.unwrap();
    let claims = h
        .verifier
        .verify_typed(&pair.access_token, TokenType::Access)
        .unwrap();
    assert_eq!(claims.roles, Some(vec![Role::Student, Role::Admin]));
}

#[tokio::test]
async fn test_old_access_token_keeps_stale_roles_until_expiry() {
    // Accepted latency: an access token minted before a role change
    // carries the old roles until its short TTL runs out.
    let h = harness();
    let (user_id, access, _) =
        register_and_login(&h, "acme", "ada@example.com", "password123").await;

    let mut user = h.store.find_by_id(user_id).await.unwrap().unwrap();
    user.roles = vec![Role::Admin];
    h.store.save(user).await.unwrap();

    let claims = h.verifier.verify_typed(&access, TokenType::Access).unwrap();
    assert_eq!(claims.roles, Some(vec![Role::Student]));
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let h = harness();
    let (user_id, _, refresh) =
        register_and_login(&h, "acme", "ada@example.com", "password123").await;
    let sid = h.verifier.verify(&refresh).unwrap().sid;

    h.service.logout(user_id, sid).await.unwrap();
    let first = h.store.find_by_id(user_id).await.unwrap().unwrap().refresh_sessions[0].revoked_at;
    assert!(first.is_some());

    // Second logout succeeds and leaves the first timestamp in place.
    h.service.logout(user_id, sid).await.unwrap();
    let second = h.store.find_by_id(user_id).await.unwrap().unwrap().refresh_sessions[0].revoked_at;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_logout_unknown_user_or_sid_is_a_noop() {
    let h = harness();
    let (user_id, _, _) = register_and_login(&h, "acme", "ada@example.com", "password123").await;

    assert!(h.service.logout(Uuid::new_v4(), Uuid::new_v4()).await.is_ok());
    assert!(h.service.logout(user_id, Uuid::new_v4()).await.is_ok());

    let user = h.store.find_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(user.active_session_count(), 1);
}

#[tokio::test]
async fn test_logout_blocks_future_rotation() {
    let h = harness();
    let (user_id, _, refresh) =
        register_and_login(&h, "acme", "ada@example.com", "password123").await;
    let sid = h.verifier.verify(&refresh).unwrap().sid;

    h.service.logout(user_id, sid).await.unwrap();

    let res = h.service.rotate_refresh(&refresh).await;
    assert!(matches!(res, Err(AuthError::InvalidRefresh)));
}

#[tokio::test]
async fn test_cross_tenant_isolation() {
    let h = harness();
    let (acme_id, ..) = register_and_login(&h, "acme", "ada@example.com", "pw-for-acme").await;
    let (globex_id, ..) = register_and_login(&h, "globex", "ada@example.com", "pw-for-globex").await;

    assert_ne!(acme_id, globex_id);

    // Lookups stay inside their tenant.
    let found = h
        .store
        .find_by_tenant_and_email("acme", "ada@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, acme_id);

    // Each password only works within its own tenant.
    assert!(h.service.login("acme", "ada@example.com", "pw-for-acme").await.is_ok());
    assert!(matches!(
        h.service.login("acme", "ada@example.com", "pw-for-globex").await,
        Err(AuthError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_independent_sessions_survive_each_other() {
    // Two logins (two devices) produce independent lineages; rotating
    // or revoking one leaves the other usable.
    let h = harness();
    let (user_id, _, first_refresh) =
        register_and_login(&h, "acme", "ada@example.com", "password123").await;
    let second_refresh = h
        .service
        .login("acme", "ada@example.com", "password123")
        .await
        .unwrap()
        .refresh_token;

    let first_sid = h.verifier.verify(&first_refresh).unwrap().sid;
    h.service.logout(user_id, first_sid).await.unwrap();

    assert!(h.service.rotate_refresh(&second_refresh).await.is_ok());
}
