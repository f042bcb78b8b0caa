use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Result;

use shiftlog::database::connect_collection;
use shiftlog::middleware::{RequestIdMiddleware, cors};
use shiftlog::{Config, ShiftRepository, routes};

const ACCESS_LOG_FORMAT: &str = concat!(
    r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T "#,
    "correlation_id=%{x-correlation-id}o"
);

#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init();

    log::info!("Starting shift log API server...");

    // Load configuration
    let config = Config::from_env()?;
    log::info!(
        "Configuration loaded (environment: {}, collection: {})",
        config.environment,
        config.shift_collection
    );

    if config.is_production() && config.uses_memory_store() {
        log::warn!("In-memory document store selected in production; shifts will not persist");
    }

    // Open the document store
    let collection = connect_collection(&config).await?;
    log::info!("Document store ready");

    let shift_repo_data = web::Data::new(ShiftRepository::new(collection.clone()));

    let server_address = config.server_address();
    log::info!("Server starting on http://{}", server_address);

    let app_config = config.clone();
    let served = HttpServer::new(move || {
        App::new()
            .app_data(shift_repo_data.clone())
            .wrap(cors(&app_config))
            .wrap(RequestIdMiddleware)
            .wrap(Logger::new(ACCESS_LOG_FORMAT))
            .configure(routes::configure)
    })
    .bind(&server_address)?
    .run()
    .await;

    collection.close().await;
    log::info!("Document store closed");

    served.map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
