//! CVGen Common - Shared plumbing for the CV generator backend.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Error types and handling utilities
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, ObservabilityConfig, ServerConfig, SessionConfig};
pub use error::{Error, Result};
pub use logging::init_logging;
