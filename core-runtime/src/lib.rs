//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the Audtream client core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! Every other core crate depends on this one for its configuration type,
//! its event vocabulary and its logging conventions.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
