//! Shared Module
//!
//! Cross-cutting concerns and shared utilities.

pub mod error;
pub mod db;
pub mod middleware;
pub mod api_common;

// APIs
pub mod health_api;

pub use error::{PlatformError, Result};
pub use middleware::{AppState, AuthLayer, Authenticated, Superuser};
pub use api_common::{Page, PaginationParams};
pub use health_api::{health_router, HealthState};
