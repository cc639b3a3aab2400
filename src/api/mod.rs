//! HTTP variant of the harness
//!
//! Drives the application API directly: health check, login, then
//! authenticated reads with the returned token.

pub mod actions;
mod client;
mod token;

pub use client::{ApiClient, ApiSession, StatusEquals, DEFAULT_REQUEST_TIMEOUT};
pub use token::extract_token;
