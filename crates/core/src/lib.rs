//! Provisioning domain types, constants, and pure validation logic.
//!
//! This crate has no database or HTTP dependencies; the `db`, `api` and
//! `client` crates all build on the types defined here.

pub mod error;
pub mod provisioning;
pub mod types;
