//! Domain models.
//!
//! These types represent validated domain objects separate from database row
//! types and from the JSON shapes accepted at the HTTP boundary.

pub mod account;
pub mod catalog;
pub mod order;

pub use account::{Account, LoginRequest, NewAccount, Registration};
pub use catalog::{Product, ProductListing, ShippingOption};
pub use order::{
    NewOrderDetail, NewUserOrder, OrderDetail, OrderLineSubmission, OrderSubmission,
    ShippingAddress, UserOrder,
};
