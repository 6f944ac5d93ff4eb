//! Library exports for the donation tracker, shared between the binaries and tests.
//!
//! The server half lives in `routes`, `store` and friends; `client` holds the
//! session lifecycle used by front ends.

pub mod cleanup;
pub mod client;
pub mod config;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod startup;
pub mod state;
pub mod store;
pub mod utils;
