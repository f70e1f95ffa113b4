//! Request Aggregate
//!
//! Tickets asking for items, with status/priority workflow, search and bulk
//! operations.

pub mod entity;
pub mod query;
pub mod repository;
pub mod notifier;
pub mod service;
pub mod api;

pub use entity::{CreateRequest, NewRequest, Request, RequestPatch, RequestRead, RequestStatus};
pub use query::{RequestFilter, RequestSort, SortField};
pub use repository::RequestRepository;
pub use notifier::{LogNotifier, RequestCreatedNotice, RequestNotifier};
pub use service::{BulkCreateOutcome, BulkCreateResponse, BulkFailure, RequestPage, RequestService};
pub use api::{requests_router, RequestsState};
