//! REST API for the review catalog: titles, genres, categories, reviews,
//! comments and user accounts.

pub mod config;
mod extract;
pub mod http;
mod routes;
mod validate;

pub use config::AppConfig;
pub use http::{AppState, ServeConfig, build_router, serve};
