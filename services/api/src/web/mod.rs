pub mod demo;
pub mod jobs;
pub mod meetings;
pub mod middleware;
pub mod params;
pub mod people;
pub mod rest;
pub mod reviews;
pub mod state;
pub mod typing;
pub mod voice;

// Re-export the router builder so the binary and the integration tests share one
// definition of the route table.
pub use rest::build_router;
pub use middleware::require_admin;
