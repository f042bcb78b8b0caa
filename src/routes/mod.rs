use actix_web::web;

use crate::handlers::{shared, system};

pub mod shifts;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(system::health)).service(
        web::scope("/api")
            .app_data(shared::json_config())
            .app_data(shared::path_config())
            .route("", web::get().to(system::api_info))
            .route("/", web::get().to(system::api_info))
            .configure(shifts::configure),
    );
}
