//! Runs against a real Redis. Point `REDIS_URL` at a scratch instance and run
//! with `--ignored`.

use chrono::{Duration, Utc};
use keystone::{
    error::AppError,
    models::session::Session,
    repositories::{redis_session::RedisSessionStore, session::SessionStore},
};
use redis::aio::ConnectionManager;
use uuid::Uuid;

async fn connection() -> ConnectionManager {
    let url = std::env::var("REDIS_URL").expect("REDIS_URL must be set for Redis tests");
    let client = redis::Client::open(url.as_str()).unwrap();
    ConnectionManager::new(client).await.unwrap()
}

fn session(created_at: chrono::DateTime<Utc>, ttl: Duration) -> Session {
    Session {
        session_id: format!("redis-test-{}", Uuid::new_v4()),
        user_id: Uuid::new_v4(),
        created_at,
        expires_at: created_at + ttl,
    }
}

#[tokio::test]
#[ignore]
async fn session_lifecycle_against_redis() {
    let store = RedisSessionStore::new(connection().await);
    let now = Utc::now();
    let live = session(now, Duration::hours(1));

    store.ping().await.unwrap();

    store.insert_session(&live).await.unwrap();
    let found = store.find_active_session(&live.session_id, now).await.unwrap().unwrap();
    assert_eq!(found, live);

    assert!(store.delete_session(&live.session_id).await.unwrap());
    assert!(!store.delete_session(&live.session_id).await.unwrap());
    assert!(store.find_active_session(&live.session_id, now).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn colliding_token_is_rejected_and_original_kept() {
    let store = RedisSessionStore::new(connection().await);
    let now = Utc::now();
    let original = session(now, Duration::hours(1));
    store.insert_session(&original).await.unwrap();

    let collision = Session {
        user_id: Uuid::new_v4(),
        ..original.clone()
    };
    let err = store.insert_session(&collision).await.unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));

    let kept = store.find_active_session(&original.session_id, now).await.unwrap().unwrap();
    assert_eq!(kept.user_id, original.user_id);

    store.delete_session(&original.session_id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn reads_check_expiry_before_redis_evicts() {
    let store = RedisSessionStore::new(connection().await);
    let now = Utc::now();
    let short = session(now, Duration::minutes(10));
    store.insert_session(&short).await.unwrap();

    // The key is still present in Redis; the read clock is past expires_at.
    let later = now + Duration::minutes(11);
    assert!(store.find_active_session(&short.session_id, later).await.unwrap().is_none());
    assert!(store.find_active_session(&short.session_id, now).await.unwrap().is_some());

    assert_eq!(store.delete_expired(later).await.unwrap(), 0);
    assert!(store.delete_session(&short.session_id).await.unwrap());
}
