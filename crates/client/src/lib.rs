//! `dbprov-client` library crate.
//!
//! HTTP client for the provisioning API plus the scripted demonstration
//! that the demo harness runs against a live server. The binary entrypoint
//! lives in `main.rs`.

pub mod api;
pub mod config;
pub mod demo;
pub mod models;
