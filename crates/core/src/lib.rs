//! Trellis Core - Shared types library.
//!
//! This crate provides common types used across all Trellis components:
//! - `graph` - Type catalog, store abstraction, and resolution layer
//! - `server` - HTTP boundary exposing the resolution layer
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
