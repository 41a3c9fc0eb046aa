//! Request handlers for the provisioning API.
//!
//! Handlers validate input against the `dbprov_core` vocabulary, delegate
//! persistence to the repositories in `dbprov_db`, and map errors via
//! [`AppError`](crate::error::AppError).

pub mod approval;
pub mod databases;
pub mod requests;
pub mod service;
