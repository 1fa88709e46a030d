//! HTTP API for the catalog service

pub mod admin;
pub mod extract;
pub mod health;
pub mod resources;
pub mod submissions;
pub mod taxonomy;

pub use admin::admin_routes;
pub use extract::extract_routes;
pub use health::health_routes;
pub use resources::resource_routes;
pub use submissions::submission_routes;
pub use taxonomy::taxonomy_routes;
