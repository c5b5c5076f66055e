// Library exports for the forum server
// This allows integration tests to build the router and drive it directly

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
