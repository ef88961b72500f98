//! Store tests against a real Postgres.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`; each test
//! gets a fresh database with the crate migrations applied.

use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use events_server::db::{events, subscriptions, users};
use events_server::models::event::{EventFilters, EventPatch, EventQuery, NewEvent, SortKey};
use events_server::models::user::NewUser;
use events_server::utils::error::AppError;

const CAPACITY: i32 = 100;

async fn owner(pool: &PgPool, email: &str) -> Uuid {
    let user = NewUser {
        forename: "Ada".into(),
        surname: "Lovelace".into(),
        email: email.into(),
        password: "unused".into(),
        gmail: None,
        avatar_url: None,
    };
    users::insert_user(pool, &user, "$2b$04$notarealhash")
        .await
        .unwrap()
        .user_id
}

fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn new_event(owner: Uuid, title: &str, text: &str, location: &str, date: DateTime<Utc>) -> NewEvent {
    NewEvent {
        title: title.into(),
        date,
        end_date: date + Duration::hours(2),
        location: location.into(),
        description: text.into(),
        owner,
        pictures: None,
        fb_link: None,
        twitter_link: None,
        instagram: None,
        calendar_event_id: None,
    }
}

async fn seed(pool: &PgPool) -> Uuid {
    let owner = owner(pool, "owner@example.com").await;
    let rows = [
        ("Board games", "Bring a launch snack", "Library", day(2025, 3, 1)),
        ("Launch", "Kickoff", "HQ", day(2025, 1, 1)),
        ("Yoga", "Morning stretch", "Launchpad Studio", day(2025, 2, 1)),
        ("Book club", "Chapter one", "Cafe", day(2025, 4, 1)),
        ("Hack night", "Build things", "HQ", day(2025, 5, 1)),
    ];
    for (title, text, location, date) in rows {
        events::insert_event(pool, &new_event(owner, title, text, location, date), CAPACITY)
            .await
            .unwrap();
    }
    owner
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn create_event_assigns_id_and_default_capacity(pool: PgPool) {
    let owner = owner(&pool, "launch@example.com").await;
    let event = events::insert_event(
        &pool,
        &new_event(owner, "Launch", "Kickoff", "HQ", day(2025, 1, 1)),
        CAPACITY,
    )
    .await
    .unwrap();

    assert_eq!(event.title, "Launch");
    assert_eq!(event.capacity, Some(CAPACITY));
    assert_eq!(event.pictures, None);
    assert_eq!(event.event_owner, owner);

    let fetched = events::select_event_by_id(&pool, event.event_id).await.unwrap();
    assert_eq!(fetched.map(|e| e.event_id), Some(event.event_id));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn search_ranks_title_then_description_then_location(pool: PgPool) {
    seed(&pool).await;

    let query = EventQuery {
        filters: EventFilters {
            search: Some("LAUNCH".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    let listed = events::select_events(&pool, &query).await.unwrap();

    let titles: Vec<_> = listed.iter().map(|e| e.event.title.as_str()).collect();
    assert_eq!(titles, vec!["Launch", "Board games", "Yoga"]);
    let ranks: Vec<_> = listed.iter().map(|e| e.search_priority).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn filters_are_inclusive_and_count_matches(pool: PgPool) {
    seed(&pool).await;

    let filters = EventFilters {
        start_date: Some(day(2025, 2, 1)),
        latest_date: Some(day(2025, 4, 1)),
        search: None,
    };
    let query = EventQuery {
        filters: filters.clone(),
        sort_key: SortKey::Date,
        ..Default::default()
    };

    let listed = events::select_events(&pool, &query).await.unwrap();
    let titles: Vec<_> = listed.iter().map(|e| e.event.title.as_str()).collect();
    assert_eq!(titles, vec!["Yoga", "Board games", "Book club"]);
    for row in &listed {
        assert!(row.event.date >= day(2025, 2, 1) && row.event.date <= day(2025, 4, 1));
    }

    assert_eq!(events::count_events(&pool, &filters).await.unwrap(), 3);
    assert_eq!(
        events::count_events(&pool, &EventFilters::default()).await.unwrap(),
        5
    );
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn pages_are_disjoint_and_ordered(pool: PgPool) {
    seed(&pool).await;

    let page = |page: i64, limit: i64| EventQuery {
        sort_key: SortKey::Title,
        page,
        limit,
        ..Default::default()
    };

    let everything = events::select_events(&pool, &page(1, 100)).await.unwrap();
    let first = events::select_events(&pool, &page(1, 2)).await.unwrap();
    let second = events::select_events(&pool, &page(2, 2)).await.unwrap();

    let ids = |rows: &[events_server::models::ListedEvent]| -> Vec<Uuid> {
        rows.iter().map(|r| r.event.event_id).collect()
    };
    let mut joined = ids(&first);
    joined.extend(ids(&second));
    assert_eq!(joined, ids(&everything)[..4].to_vec());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn sparse_update_leaves_other_fields(pool: PgPool) {
    let owner = owner(&pool, "patch@example.com").await;
    let original = events::insert_event(
        &pool,
        &new_event(owner, "Launch", "Kickoff", "HQ", day(2025, 1, 1)),
        CAPACITY,
    )
    .await
    .unwrap();

    let patch: EventPatch = serde_json::from_str(r#"{"title": "New"}"#).unwrap();
    let updated = events::update_event(&pool, original.event_id, patch).await.unwrap();
    assert_eq!(updated.title, "New");
    assert_eq!(updated.text, original.text);
    assert_eq!(updated.location, original.location);
    assert_eq!(updated.date, original.date);

    let patch: EventPatch = serde_json::from_str(r#"{"title": null}"#).unwrap();
    let unchanged = events::update_event(&pool, original.event_id, patch).await.unwrap();
    assert_eq!(unchanged.title, "New");

    let patch: EventPatch = serde_json::from_str(r#"{"finishDate": "2024-12-01"}"#).unwrap();
    let err = events::update_event(&pool, original.event_id, patch).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn update_and_delete_missing_event_are_not_found(pool: PgPool) {
    let patch: EventPatch = serde_json::from_str(r#"{"title": "New"}"#).unwrap();
    let err = events::update_event(&pool, Uuid::new_v4(), patch).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = events::delete_event(&pool, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn delete_cascades_to_subscriptions(pool: PgPool) {
    let owner = owner(&pool, "cascade@example.com").await;
    let event = events::insert_event(
        &pool,
        &new_event(owner, "Launch", "Kickoff", "HQ", Utc::now() + Duration::days(7)),
        CAPACITY,
    )
    .await
    .unwrap();

    subscriptions::insert_subscription(&pool, event.event_id, owner)
        .await
        .unwrap();
    events::delete_event(&pool, event.event_id).await.unwrap();

    assert!(!subscriptions::subscription_exists(&pool, event.event_id, owner)
        .await
        .unwrap());
    assert!(events::select_event_by_id(&pool, event.event_id)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn subscriptions_are_unique_and_removable(pool: PgPool) {
    let owner = owner(&pool, "subs@example.com").await;
    let event = events::insert_event(
        &pool,
        &new_event(owner, "Launch", "Kickoff", "HQ", Utc::now() + Duration::days(7)),
        CAPACITY,
    )
    .await
    .unwrap();

    let sub = subscriptions::insert_subscription(&pool, event.event_id, owner)
        .await
        .unwrap();
    assert_eq!((sub.user_id, sub.event_id), (owner, event.event_id));

    let err = subscriptions::insert_subscription(&pool, event.event_id, owner)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let removed = subscriptions::delete_subscription(&pool, event.event_id, owner)
        .await
        .unwrap();
    assert_eq!(removed, sub);

    let err = subscriptions::delete_subscription(&pool, event.event_id, owner)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn user_events_are_upcoming_and_sorted(pool: PgPool) {
    let owner = owner(&pool, "upcoming@example.com").await;
    let now = Utc::now();
    for (title, date) in [
        ("Later", now + Duration::days(30)),
        ("Past", now - Duration::days(30)),
        ("Sooner", now + Duration::days(2)),
    ] {
        let event = events::insert_event(&pool, &new_event(owner, title, "x", "y", date), CAPACITY)
            .await
            .unwrap();
        subscriptions::insert_subscription(&pool, event.event_id, owner)
            .await
            .unwrap();
    }

    let upcoming = events::select_user_events(&pool, owner).await.unwrap();
    let titles: Vec<_> = upcoming.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Sooner", "Later"]);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_email_is_conflict(pool: PgPool) {
    owner(&pool, "dup@example.com").await;
    assert!(users::email_exists(&pool, "dup@example.com").await.unwrap());

    let again = NewUser {
        forename: "Grace".into(),
        surname: "Hopper".into(),
        email: "dup@example.com".into(),
        password: "unused".into(),
        gmail: None,
        avatar_url: None,
    };
    let err = users::insert_user(&pool, &again, "$2b$04$notarealhash")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}
