pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use config::Config;
pub use database::repositories::ShiftRepository;
pub use error::AppError;
