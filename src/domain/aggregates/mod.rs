//! Aggregates module
pub mod cart;
pub mod order;

pub use cart::Cart;
pub use order::{DeliveryAddress, OrderDraft, OrderError, OrderStatus, PaymentKind};
