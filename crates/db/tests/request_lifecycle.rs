//! Integration tests for the request lifecycle transitions.
//!
//! Every transition is a conditional write; these tests exercise the
//! refusal paths as hard as the happy paths, including the accept race.

use sqlx::PgPool;

use nearhand_core::roles::{ROLE_PROVIDER, ROLE_SEEKER};
use nearhand_core::status::{ProviderStatus, RequestStatus};
use nearhand_core::types::DbId;
use nearhand_db::models::service_request::CreateServiceRequest;
use nearhand_db::models::user::CreateUser;
use nearhand_db::repositories::{RequestHistoryRepo, ServiceRequestRepo, UserRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn create_seeker(pool: &PgPool, username: &str) -> DbId {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "$argon2id$fake".to_string(),
            role: ROLE_SEEKER.to_string(),
            skills: Vec::new(),
        },
    )
    .await
    .unwrap();
    user.id
}

async fn create_provider(pool: &PgPool, username: &str, skills: &[&str]) -> DbId {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "$argon2id$fake".to_string(),
            role: ROLE_PROVIDER.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
        },
    )
    .await
    .unwrap();
    // Providers register offline; matching requires online.
    UserRepo::set_provider_status_manual(pool, user.id, ProviderStatus::Online)
        .await
        .unwrap();
    user.id
}

async fn create_request(pool: &PgPool, seeker_id: DbId, duration_minutes: i32) -> DbId {
    let request = ServiceRequestRepo::create(
        pool,
        seeker_id,
        &CreateServiceRequest {
            category: "plumbing".to_string(),
            description: "Leaking kitchen tap".to_string(),
            contact_number: "9876543210".to_string(),
            longitude: 77.59,
            latitude: 12.97,
            duration_minutes,
            details: None,
        },
    )
    .await
    .unwrap();
    request.id
}

async fn provider_status(pool: &PgPool, provider_id: DbId) -> ProviderStatus {
    UserRepo::find_by_id(pool, provider_id)
        .await
        .unwrap()
        .unwrap()
        .provider_status()
}

/// Force a request's validity window into the past without touching
/// anything else.
async fn force_expire_window(pool: &PgPool, request_id: DbId) {
    sqlx::query("UPDATE service_requests SET expires_at = NOW() - INTERVAL '1 minute' WHERE id = $1")
        .bind(request_id)
        .execute(pool)
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn create_starts_pending_with_computed_expiry(pool: PgPool) {
    let seeker_id = create_seeker(&pool, "asha").await;
    let request_id = create_request(&pool, seeker_id, 30).await;

    let request = ServiceRequestRepo::find_by_id(&pool, request_id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(request.status(), RequestStatus::Pending);
    assert!(request.provider_id.is_none());
    assert!(request.pin_code.is_none());

    // expires_at must be about created_at + 30 minutes.
    let window = request.expires_at - request.created_at;
    assert_eq!(window.num_minutes(), 30);
}

// ---------------------------------------------------------------------------
// Accept
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn accept_claims_request_and_flips_provider(pool: PgPool) {
    let seeker_id = create_seeker(&pool, "asha").await;
    let provider_id = create_provider(&pool, "ravi", &["plumbing"]).await;
    let request_id = create_request(&pool, seeker_id, 30).await;

    let claimed = ServiceRequestRepo::claim(&pool, request_id, provider_id, "042137")
        .await
        .unwrap()
        .expect("claim should succeed on a pending request");

    assert_eq!(claimed.status(), RequestStatus::InProgress);
    assert_eq!(claimed.provider_id, Some(provider_id));
    assert_eq!(claimed.pin_code.as_deref(), Some("042137"));
    assert!(claimed.pin_generated_at.is_some());

    // Provider is now mid-job.
    assert_eq!(
        provider_status(&pool, provider_id).await,
        ProviderStatus::InProgress
    );

    // History gained an `accepted` entry by the provider.
    let history = RequestHistoryRepo::list_for_request(&pool, request_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].transition, "accepted");
    assert_eq!(history[0].actor_user_id, provider_id);
}

#[sqlx::test]
async fn concurrent_accepts_have_exactly_one_winner(pool: PgPool) {
    let seeker_id = create_seeker(&pool, "asha").await;
    let provider_a = create_provider(&pool, "ravi", &["plumbing"]).await;
    let provider_b = create_provider(&pool, "sunil", &["plumbing"]).await;
    let request_id = create_request(&pool, seeker_id, 30).await;

    let (a, b) = tokio::join!(
        ServiceRequestRepo::claim(&pool, request_id, provider_a, "111111"),
        ServiceRequestRepo::claim(&pool, request_id, provider_b, "222222"),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert!(
        a.is_some() ^ b.is_some(),
        "exactly one concurrent accept must win"
    );

    // The request ends with exactly one assigned provider.
    let request = ServiceRequestRepo::find_by_id(&pool, request_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.status(), RequestStatus::InProgress);
    let winner = if a.is_some() { provider_a } else { provider_b };
    let loser = if a.is_some() { provider_b } else { provider_a };
    assert_eq!(request.provider_id, Some(winner));

    // Only the winner flipped to in_progress.
    assert_eq!(
        provider_status(&pool, winner).await,
        ProviderStatus::InProgress
    );
    assert_eq!(provider_status(&pool, loser).await, ProviderStatus::Online);

    // Exactly one history entry.
    let history = RequestHistoryRepo::list_for_request(&pool, request_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
}

#[sqlx::test]
async fn busy_provider_cannot_claim_a_second_request(pool: PgPool) {
    let seeker_id = create_seeker(&pool, "asha").await;
    let provider_id = create_provider(&pool, "ravi", &["plumbing"]).await;
    let first = create_request(&pool, seeker_id, 30).await;
    let second = create_request(&pool, seeker_id, 30).await;

    ServiceRequestRepo::claim(&pool, first, provider_id, "111111")
        .await
        .unwrap()
        .expect("first claim should succeed");

    // The in-statement guard refuses the second claim.
    let refused = ServiceRequestRepo::claim(&pool, second, provider_id, "222222")
        .await
        .unwrap();
    assert!(refused.is_none(), "a busy provider must not claim again");

    let second_row = ServiceRequestRepo::find_by_id(&pool, second)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second_row.status(), RequestStatus::Pending);
    assert!(second_row.provider_id.is_none());
}

#[sqlx::test]
async fn accept_refuses_non_pending_and_expired_requests(pool: PgPool) {
    let seeker_id = create_seeker(&pool, "asha").await;
    let provider_a = create_provider(&pool, "ravi", &["plumbing"]).await;
    let provider_b = create_provider(&pool, "sunil", &["plumbing"]).await;

    // Already claimed.
    let claimed_id = create_request(&pool, seeker_id, 30).await;
    ServiceRequestRepo::claim(&pool, claimed_id, provider_a, "111111")
        .await
        .unwrap()
        .unwrap();
    let refused = ServiceRequestRepo::claim(&pool, claimed_id, provider_b, "222222")
        .await
        .unwrap();
    assert!(refused.is_none());

    // Past the validity window but not yet swept: the claim condition
    // itself refuses, so a late accept can never resurrect the request.
    let stale_id = create_request(&pool, seeker_id, 30).await;
    force_expire_window(&pool, stale_id).await;
    let refused = ServiceRequestRepo::claim(&pool, stale_id, provider_b, "333333")
        .await
        .unwrap();
    assert!(refused.is_none());
}

// ---------------------------------------------------------------------------
// Complete
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn complete_requires_exact_pin_and_reverts_provider(pool: PgPool) {
    let seeker_id = create_seeker(&pool, "asha").await;
    let provider_id = create_provider(&pool, "ravi", &["plumbing"]).await;
    let request_id = create_request(&pool, seeker_id, 30).await;

    ServiceRequestRepo::claim(&pool, request_id, provider_id, "042137")
        .await
        .unwrap()
        .unwrap();

    // Wrong code: status unchanged, attempt recorded.
    let refused = ServiceRequestRepo::complete(&pool, request_id, provider_id, "000000")
        .await
        .unwrap();
    assert!(refused.is_none(), "a wrong code must not complete");
    let attempts = ServiceRequestRepo::record_failed_pin_attempt(&pool, request_id)
        .await
        .unwrap();
    assert_eq!(attempts, Some(1));

    let request = ServiceRequestRepo::find_by_id(&pool, request_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.status(), RequestStatus::InProgress);

    // Correct code: completed, provider back online, history appended.
    let completed = ServiceRequestRepo::complete(&pool, request_id, provider_id, "042137")
        .await
        .unwrap()
        .expect("the correct code must complete");
    assert_eq!(completed.status(), RequestStatus::Completed);
    assert_eq!(
        provider_status(&pool, provider_id).await,
        ProviderStatus::Online
    );

    let history = RequestHistoryRepo::list_for_request(&pool, request_id)
        .await
        .unwrap();
    let transitions: Vec<&str> = history.iter().map(|h| h.transition.as_str()).collect();
    assert_eq!(transitions, ["accepted", "completed"]);
}

#[sqlx::test]
async fn complete_refuses_wrong_provider_and_wrong_state(pool: PgPool) {
    let seeker_id = create_seeker(&pool, "asha").await;
    let provider_a = create_provider(&pool, "ravi", &["plumbing"]).await;
    let provider_b = create_provider(&pool, "sunil", &["plumbing"]).await;
    let request_id = create_request(&pool, seeker_id, 30).await;

    // Not in progress yet.
    let refused = ServiceRequestRepo::complete(&pool, request_id, provider_a, "042137")
        .await
        .unwrap();
    assert!(refused.is_none());

    ServiceRequestRepo::claim(&pool, request_id, provider_a, "042137")
        .await
        .unwrap()
        .unwrap();

    // Wrong provider, right code.
    let refused = ServiceRequestRepo::complete(&pool, request_id, provider_b, "042137")
        .await
        .unwrap();
    assert!(refused.is_none());

    // Completing twice cannot work: the second write finds no
    // in-progress row.
    ServiceRequestRepo::complete(&pool, request_id, provider_a, "042137")
        .await
        .unwrap()
        .unwrap();
    let refused = ServiceRequestRepo::complete(&pool, request_id, provider_a, "042137")
        .await
        .unwrap();
    assert!(refused.is_none());
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn cancel_is_owner_only_and_pending_only(pool: PgPool) {
    let seeker_a = create_seeker(&pool, "asha").await;
    let seeker_b = create_seeker(&pool, "bina").await;
    let provider_id = create_provider(&pool, "ravi", &["plumbing"]).await;

    // Another seeker cannot cancel.
    let request_id = create_request(&pool, seeker_a, 30).await;
    let refused = ServiceRequestRepo::cancel(&pool, request_id, seeker_b)
        .await
        .unwrap();
    assert!(refused.is_none());

    // The owner can, while pending.
    let cancelled = ServiceRequestRepo::cancel(&pool, request_id, seeker_a)
        .await
        .unwrap()
        .expect("owner cancel of a pending request must succeed");
    assert_eq!(cancelled.status(), RequestStatus::Cancelled);

    // Cancelling twice finds nothing.
    let refused = ServiceRequestRepo::cancel(&pool, request_id, seeker_a)
        .await
        .unwrap();
    assert!(refused.is_none());

    // An in-progress request cannot be cancelled.
    let second = create_request(&pool, seeker_a, 30).await;
    ServiceRequestRepo::claim(&pool, second, provider_id, "042137")
        .await
        .unwrap()
        .unwrap();
    let refused = ServiceRequestRepo::cancel(&pool, second, seeker_a)
        .await
        .unwrap();
    assert!(refused.is_none());
}

// ---------------------------------------------------------------------------
// Expiry sweep
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn sweep_expires_open_requests_and_is_idempotent(pool: PgPool) {
    let seeker_id = create_seeker(&pool, "asha").await;
    let live_id = create_request(&pool, seeker_id, 30).await;
    let stale_id = create_request(&pool, seeker_id, 1).await;
    force_expire_window(&pool, stale_id).await;

    let swept = ServiceRequestRepo::sweep_expired(&pool).await.unwrap();
    assert_eq!(swept.len(), 1);
    assert_eq!(swept[0].id, stale_id);
    assert_eq!(swept[0].status(), RequestStatus::Expired);

    // The live request is untouched.
    let live = ServiceRequestRepo::find_by_id(&pool, live_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(live.status(), RequestStatus::Pending);

    // Idempotent: a second sweep changes nothing.
    let swept_again = ServiceRequestRepo::sweep_expired(&pool).await.unwrap();
    assert!(swept_again.is_empty());

    // Expiry does not write history.
    let history = RequestHistoryRepo::list_for_request(&pool, stale_id)
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[sqlx::test]
async fn sweeping_an_in_progress_request_frees_the_provider(pool: PgPool) {
    let seeker_id = create_seeker(&pool, "asha").await;
    let provider_id = create_provider(&pool, "ravi", &["plumbing"]).await;
    let request_id = create_request(&pool, seeker_id, 30).await;

    ServiceRequestRepo::claim(&pool, request_id, provider_id, "042137")
        .await
        .unwrap()
        .unwrap();
    force_expire_window(&pool, request_id).await;

    let swept = ServiceRequestRepo::sweep_expired(&pool).await.unwrap();
    assert_eq!(swept.len(), 1);
    assert_eq!(swept[0].status(), RequestStatus::Expired);

    assert_eq!(
        provider_status(&pool, provider_id).await,
        ProviderStatus::Online
    );
}

#[sqlx::test]
async fn sweep_never_overwrites_terminal_states(pool: PgPool) {
    let seeker_id = create_seeker(&pool, "asha").await;
    let provider_id = create_provider(&pool, "ravi", &["plumbing"]).await;

    // Completed request whose window has since lapsed.
    let completed_id = create_request(&pool, seeker_id, 30).await;
    ServiceRequestRepo::claim(&pool, completed_id, provider_id, "042137")
        .await
        .unwrap()
        .unwrap();
    ServiceRequestRepo::complete(&pool, completed_id, provider_id, "042137")
        .await
        .unwrap()
        .unwrap();
    force_expire_window(&pool, completed_id).await;

    // Cancelled request likewise.
    let cancelled_id = create_request(&pool, seeker_id, 30).await;
    ServiceRequestRepo::cancel(&pool, cancelled_id, seeker_id)
        .await
        .unwrap()
        .unwrap();
    force_expire_window(&pool, cancelled_id).await;

    let swept = ServiceRequestRepo::sweep_expired(&pool).await.unwrap();
    assert!(swept.is_empty(), "terminal rows must never be swept");

    let completed = ServiceRequestRepo::find_by_id(&pool, completed_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(completed.status(), RequestStatus::Completed);

    let cancelled = ServiceRequestRepo::find_by_id(&pool, cancelled_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cancelled.status(), RequestStatus::Cancelled);
}

// ---------------------------------------------------------------------------
// Manual status override guard
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn provider_cannot_override_status_mid_job(pool: PgPool) {
    let seeker_id = create_seeker(&pool, "asha").await;
    let provider_id = create_provider(&pool, "ravi", &["plumbing"]).await;
    let request_id = create_request(&pool, seeker_id, 30).await;

    ServiceRequestRepo::claim(&pool, request_id, provider_id, "042137")
        .await
        .unwrap()
        .unwrap();

    let updated =
        UserRepo::set_provider_status_manual(&pool, provider_id, ProviderStatus::Online)
            .await
            .unwrap();
    assert!(!updated, "a provider mid-job must not free itself");
    assert_eq!(
        provider_status(&pool, provider_id).await,
        ProviderStatus::InProgress
    );
}
