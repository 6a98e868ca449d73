//! Rockland Core - shared domain types.
//!
//! This crate holds the types used by every Rockland component:
//! - `api` - The order-placement HTTP service
//! - `cli` - Migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP.
//! `sqlx` encode/decode support is available behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, money amounts, emails and order status

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
