//! API Module
//!
//! Thin HTTP surface over the gateway.
//!
//! # Endpoints
//! - `POST /generate` - Generate a reply, served from cache when possible
//! - `GET /stats` - Cache, breaker and concurrency statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
