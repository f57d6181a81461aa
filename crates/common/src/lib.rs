//! Farm Plot Common Library
//!
//! Domain values shared by the E2E harness: the submission typed into the
//! creation form, the plot record and envelopes the mocked API returns, and
//! the field rules behind the API's validation messages.

pub mod error;
pub mod types;
pub mod validation;

pub use error::{Error, Result};
pub use types::*;

/// Harness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
