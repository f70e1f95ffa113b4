//! User Aggregate
//!
//! Identity records: unique email, password hash and role flags.

pub mod entity;
pub mod repository;
pub mod api;

pub use entity::{NewUser, User, UserPatch, UserRead};
pub use repository::UserRepository;
pub use api::{users_router, UsersState};
