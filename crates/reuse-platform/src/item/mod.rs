//! Item Aggregate
//!
//! Posted reusable objects and their claim state.

pub mod entity;
pub mod repository;
pub mod service;
pub mod api;

pub use entity::{CreateItemRequest, Item, ItemFilter, ItemPatch, ItemRead, NewItem};
pub use repository::ItemRepository;
pub use service::ItemService;
pub use api::{items_router, ItemsState};
