//! # Fairmeter Common Library
//!
//! Shared code for the fairmeter services:
//! - Error types and result alias
//! - Service configuration loading

pub mod config;
pub mod error;

pub use error::{Error, Result};
