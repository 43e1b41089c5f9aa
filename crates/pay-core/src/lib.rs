//! # pay-core
//!
//! Core types and traits for the hosted-checkout backend.
//!
//! This crate provides:
//! - `PaymentStrategy` trait, the seam to a payment provider
//! - `Order`, `LineItem`, and `CheckoutSession` for checkout flow
//! - `WebhookEvent` for verified provider notifications
//! - `FulfillmentLedger` to fulfil each completed session once
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use pay_core::{CheckoutUrls, Order, PaymentStrategy};
//!
//! let order = Order::default_product();
//! let urls = CheckoutUrls::new("http://localhost:5173");
//!
//! let session = strategy
//!     .create_checkout(&order, &urls.success_url(), &urls.cancel_url())
//!     .await?;
//!
//! // Redirect user to session.checkout_url
//! ```

pub mod error;
pub mod ledger;
pub mod order;
pub mod product;
pub mod strategy;

// Re-exports for convenience
pub use error::{PaymentError, PaymentResult};
pub use ledger::FulfillmentLedger;
pub use order::{
    CheckoutSession, LineItem, Order, WebhookEvent, WebhookEventType, MAX_UNIT_AMOUNT,
};
pub use product::{Currency, Price};
pub use strategy::{BoxedPaymentStrategy, CheckoutUrls, PaymentStrategy};
