//! Workspace placeholder crate.
//!
//! This crate exposes the feature flags that map onto the individual workspace
//! crates. Host applications can depend on `media-core-workspace` and enable
//! the documented features without wiring each crate individually.
//!
//! With the default `desktop-shims` feature the service façade is re-exported
//! together with the desktop bridge defaults (SQLite settings store, clock-driven
//! media backend, reachability probe).

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
