//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Methods that must run
//! inside a caller-owned transaction take `&mut PgConnection` instead.

pub mod database_repo;
pub mod request_repo;

pub use database_repo::DatabaseRepo;
pub use request_repo::RequestRepo;
