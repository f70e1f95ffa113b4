//! ReUse Exchange Platform
//!
//! Core platform providing:
//! - Account registration, password login and signed bearer tokens
//! - Item catalog with claim state
//! - Requests against items with status/priority workflow, search and bulk operations
//! - Superuser administration of accounts
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain entities and wire types
//! - `repository` - SQLite data access
//! - `service` - Business rules (where applicable)
//! - `api` - REST endpoints

// Aggregates
pub mod user;
pub mod item;
pub mod request;

// Authentication & authorization
pub mod auth;

// Shared infrastructure
pub mod shared;

// Cross-cutting concerns
pub mod seed;
pub mod app;

pub use shared::error::{PlatformError, Result};

pub use user::entity::{User, UserRead};
pub use item::entity::{Item, ItemRead};
pub use request::entity::{Request, RequestRead, RequestStatus};

pub use auth::access_gate::{AccessGate, Actor};
pub use request::notifier::{LogNotifier, RequestNotifier};
pub use app::{Platform, PlatformSettings};
