//! # qs-core
//!
//! Shared error taxonomy for the qcdstack histogram pipeline.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

pub use error::{Error, Result};
