use actix_web::web;

use crate::handlers::{incidents, shifts};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/shifts")
            .route("", web::post().to(shifts::create_shift))
            .route("", web::get().to(shifts::get_shifts))
            .route(
                "/by-month/{year}/{month}",
                web::get().to(shifts::get_shifts_by_month),
            )
            .route("/{id}", web::get().to(shifts::get_shift))
            .route("/{id}", web::put().to(shifts::update_shift))
            .route("/{id}", web::delete().to(shifts::delete_shift))
            .route("/{id}/incidents", web::post().to(incidents::add_incident))
            .route(
                "/{id}/incidents/{index}",
                web::put().to(incidents::update_incident),
            )
            .route(
                "/{id}/incidents/{index}",
                web::delete().to(incidents::remove_incident),
            ),
    );
}
