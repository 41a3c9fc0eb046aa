//! `dbprov-harness` library crate.
//!
//! Sequential demo harness: bring up the container stack, build the
//! binaries, launch the provisioning API in the background, run the demo
//! client against it, then stop the server. The binary entrypoint
//! (`dbprov-demo`) lives in `main.rs`.

pub mod config;
pub mod error;
pub mod harness;
pub mod lock;
pub mod readiness;
pub mod runner;
