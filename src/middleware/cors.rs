use actix_cors::Cors;

use crate::config::Config;
use crate::middleware::request_id::CORRELATION_HEADER;

/// CORS policy from `CORS_ORIGINS`; `*` allows any origin without credentials.
pub fn cors(config: &Config) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            "Authorization",
            "Content-Type",
            "Accept",
            "X-Requested-With",
            CORRELATION_HEADER,
        ])
        .expose_headers(vec![CORRELATION_HEADER])
        .max_age(3600);

    if config.allows_any_origin() {
        return cors.allow_any_origin();
    }

    config
        .cors_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
        .supports_credentials()
}
