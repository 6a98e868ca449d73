//! HTTP middleware for the order API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans with a `request_id` field)
//! 3. Request ID (reuse or generate, echo in response)
//!
//! Authentication is an extractor rather than a layer so that only
//! `POST /create-order` pays for token verification.

pub mod auth;
pub mod request_id;

pub use auth::{CurrentAccount, RequireAuth};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
