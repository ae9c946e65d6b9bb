//! Core domain + application logic for the inbox notification client.
//!
//! This crate is transport-agnostic. The REST backend and the user-facing
//! notice surface live behind ports (traits) implemented in adapter crates.

pub mod api_error;
pub mod badge;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod polling;
pub mod ports;
pub mod retry;
pub mod store;
pub mod toast;

pub use api_error::ApiError;
pub use errors::{Error, Result};
