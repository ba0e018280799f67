//! Isoko storefront backend.
//!
//! Grocery e-commerce service: product catalog, per-user carts, a
//! three-stage checkout flow, authoritative server-side pricing,
//! idempotent order submission, and admin order-status management.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod state;
