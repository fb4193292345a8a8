use sqlx::PgPool;

use nearhand_core::status::{ProviderStatus, RequestStatus};

/// Full bootstrap test: connect, migrate, verify seed data.
#[sqlx::test]
async fn test_full_bootstrap(pool: PgPool) {
    nearhand_db::health_check(&pool).await.unwrap();

    let request_statuses: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM request_statuses")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(request_statuses.0, 5, "request_statuses should be seeded");

    let provider_statuses: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM provider_statuses")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(provider_statuses.0, 4, "provider_statuses should be seeded");
}

/// The Rust status enums and the seeded lookup rows must agree on ids.
#[sqlx::test]
async fn test_status_enums_match_seed_data(pool: PgPool) {
    for status in [
        RequestStatus::Pending,
        RequestStatus::InProgress,
        RequestStatus::Completed,
        RequestStatus::Cancelled,
        RequestStatus::Expired,
    ] {
        let name: (String,) = sqlx::query_as("SELECT name FROM request_statuses WHERE id = $1")
            .bind(status.id())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(name.0, status.as_str(), "request status id {}", status.id());
    }

    for status in [
        ProviderStatus::Offline,
        ProviderStatus::Online,
        ProviderStatus::Active,
        ProviderStatus::InProgress,
    ] {
        let name: (String,) = sqlx::query_as("SELECT name FROM provider_statuses WHERE id = $1")
            .bind(status.id())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(name.0, status.as_str(), "provider status id {}", status.id());
    }
}
