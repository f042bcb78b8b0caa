#![allow(dead_code, unused_macros)]

use std::env;
use std::sync::Arc;

use actix_web::web;
use fake::Fake;
use fake::faker::company::en::CompanyName;
use fake::faker::name::en::Name;
use serde_json::{Value, json};

use shiftlog::ShiftRepository;
use shiftlog::database::{Document, MemoryCollection};

pub fn setup_test_env() {
    unsafe {
        env::set_var("RUST_LOG", "debug");
    }
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Repository over a fresh in-memory collection, shared with the app under test.
pub fn test_repository() -> web::Data<ShiftRepository> {
    test_repository_with(Arc::new(MemoryCollection::new()))
}

/// Repository over a collection the test seeds directly.
pub fn test_repository_with(collection: Arc<MemoryCollection>) -> web::Data<ShiftRepository> {
    setup_test_env();
    web::Data::new(ShiftRepository::new(collection))
}

/// A stored shift document as an older deployment may have left it.
pub fn stored_shift(id: &str, date: &str, incidents: Value) -> Document {
    let Value::Object(document) = json!({
        "id": id,
        "date": date,
        "location_name": "Selver Kristiine",
        "guard_name": "Peeter",
        "start_time": "08:00:00",
        "end_time": "20:00:00",
        "incidents": incidents,
        "created_at": format!("{}T08:00:00+00:00", date),
        "updated_at": format!("{}T08:00:00+00:00", date),
    }) else {
        unreachable!()
    };
    document
}

/// Builds the full application (routes, middleware) around a repository.
macro_rules! init_app {
    ($repo:expr) => {{
        let config = shiftlog::Config::test_config();
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($repo.clone())
                .wrap(shiftlog::middleware::cors(&config))
                .wrap(shiftlog::middleware::RequestIdMiddleware)
                .configure(shiftlog::routes::configure),
        )
        .await
    }};
}

// Mock data generators
pub struct MockData;

impl MockData {
    pub fn shift(date: &str) -> Value {
        json!({
            "date": date,
            "location_name": CompanyName().fake::<String>(),
            "guard_name": Name().fake::<String>(),
            "start_time": "08:00",
            "end_time": "20:00:00",
        })
    }

    pub fn general_incident(description: &str) -> Value {
        json!({
            "type": "general",
            "description": description,
            "patrol_called": false,
            "ambulance_called": true,
        })
    }

    pub fn theft_incident(amount: f64) -> Value {
        json!({
            "type": "theft",
            "description": "Bottle of cognac under the jacket",
            "patrol_called": true,
            "ambulance_called": false,
            "theft_prevented": true,
            "gender": "male",
            "amount": amount,
            "special_tools_used": false,
            "outcome": "paid_and_released",
            "incident_time": "14:35",
        })
    }
}

/// Creates a shift through the API and yields its id.
macro_rules! create_shift {
    ($app:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/api/shifts")
            .set_json($crate::common::MockData::shift("2024-12-20"))
            .to_request();
        let created: serde_json::Value = actix_web::test::call_and_read_body_json(&$app, req).await;
        created["id"].as_str().unwrap().to_string()
    }};
}
