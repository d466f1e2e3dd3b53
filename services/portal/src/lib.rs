//! Tessera portal service library crate.
//!
//! # Purpose
//! Exposes the portal API surface, session auth, configuration, database
//! introspection and storage implementations for use by the binary and tests.
pub mod api;
pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod introspect;
pub mod model;
pub mod observability;
pub mod store;
