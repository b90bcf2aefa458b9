//! Workspace umbrella crate.
//!
//! Host applications can depend on `audtream-workspace` and enable the
//! documented features instead of wiring each workspace crate individually.
//! With the default `desktop-shims` feature the [`core_service`] façade is
//! re-exported together with its desktop bridge defaults.

#[cfg(feature = "desktop-shims")]
pub use core_service;
