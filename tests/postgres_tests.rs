//! Runs against a real PostgreSQL server named by `TEST_DATABASE_URL`.
//! Ignored by default: `cargo test -- --ignored`.

use std::env;
use std::sync::Arc;

use serde_json::{Value, json};
use serial_test::serial;
use shiftlog::database::{DocumentCollection, Filter, PgCollection, Update, init_database};

mod common;

async fn collection() -> PgCollection {
    common::setup_test_env();
    let url = env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost:5432/shiftlog_test".to_string());
    let pool = init_database(&url, 2).await.unwrap();

    let name = format!("test_{}", uuid::Uuid::new_v4().simple());
    PgCollection::new(pool, name)
}

fn document(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[tokio::test]
#[ignore]
#[serial]
async fn positional_updates_are_guarded() {
    let collection = collection().await;
    collection
        .insert_one(document(json!({ "id": "s1", "date": "2024-12-20", "incidents": [] })))
        .await
        .unwrap();

    let by_id = Filter::by_id("s1");
    for n in 0..3 {
        let pushed = collection
            .update_one(
                &by_id,
                &Update::Push {
                    field: "incidents".to_string(),
                    value: json!({ "n": n }),
                },
            )
            .await
            .unwrap();
        assert_eq!(pushed, 1);
    }

    let pull = |index| Update::PullAt {
        field: "incidents".to_string(),
        index,
    };
    assert_eq!(collection.update_one(&by_id, &pull(1)).await.unwrap(), 1);
    assert_eq!(collection.update_one(&by_id, &pull(2)).await.unwrap(), 0);

    let replaced = collection
        .update_one(
            &by_id,
            &Update::ReplaceAt {
                field: "incidents".to_string(),
                index: 1,
                value: json!({ "n": 9 }),
            },
        )
        .await
        .unwrap();
    assert_eq!(replaced, 1);

    let stored = collection.find_one(&by_id).await.unwrap().unwrap();
    assert_eq!(stored["incidents"], json!([{ "n": 0 }, { "n": 9 }]));

    assert_eq!(collection.delete_one(&by_id).await.unwrap(), 1);
    collection.close().await;
}

#[tokio::test]
#[ignore]
#[serial]
async fn month_range_is_half_open() {
    let collection: Arc<dyn DocumentCollection> = Arc::new(collection().await);
    for (id, date) in [("a", "2024-11-30"), ("b", "2024-12-01"), ("c", "2025-01-01")] {
        collection
            .insert_one(document(json!({ "id": id, "date": date })))
            .await
            .unwrap();
    }

    let found = collection
        .find(&Filter::Range {
            field: "date".to_string(),
            gte: "2024-12-01".to_string(),
            lt: "2025-01-01".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], "b");
    collection.close().await;
}

#[tokio::test]
#[ignore]
#[serial]
async fn push_onto_null_sequence_starts_a_new_one() {
    let collection = collection().await;
    collection
        .insert_one(document(json!({ "id": "n1", "date": "2024-12-20", "incidents": null })))
        .await
        .unwrap();

    let by_id = Filter::by_id("n1");
    let pushed = collection
        .update_one(
            &by_id,
            &Update::Push {
                field: "incidents".to_string(),
                value: json!({ "n": 0 }),
            },
        )
        .await
        .unwrap();
    assert_eq!(pushed, 1);

    let stored = collection.find_one(&by_id).await.unwrap().unwrap();
    assert_eq!(stored["incidents"], json!([{ "n": 0 }]));
    collection.close().await;
}
