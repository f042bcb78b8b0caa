use actix_web::{HttpResponse, Responder};

pub async fn api_info() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Guard shift and incident log API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now()
    }))
}
