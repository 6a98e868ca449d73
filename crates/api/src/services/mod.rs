//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login and email confirmation
//! - `catalog` - Shipping option and product listings
//! - `email` - Outbound mail (SMTP)
//! - `orders` - Order validation and transactional persistence
//! - `timezones` - Host time zone catalog
//! - `token` - Signed account tokens

pub mod auth;
pub mod catalog;
pub mod email;
pub mod orders;
pub mod timezones;
pub mod token;
