//! # pay-stripe
//!
//! Stripe payment strategy for the hosted-checkout backend.
//!
//! - **StripeCheckoutStrategy** creates Checkout Sessions (hosted payment
//!   page) and verifies `Stripe-Signature` webhook headers.
//! - **webhook** dispatches verified events, fulfilling each completed
//!   session once.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pay_stripe::StripeCheckoutStrategy;
//! use pay_core::{Order, PaymentStrategy};
//!
//! let strategy = StripeCheckoutStrategy::from_env()?;
//!
//! let session = strategy.create_checkout(
//!     &Order::default_product(),
//!     "http://localhost:5173?success=true",
//!     "http://localhost:5173?canceled=true",
//! ).await?;
//!
//! // Redirect user to session.checkout_url
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use pay_stripe::{dispatch_webhook_event, LoggingWebhookHandler};
//!
//! let event = strategy.verify_webhook(payload, signature).await?;
//! dispatch_webhook_event(&LoggingWebhookHandler, &ledger, &event).await?;
//! ```

pub mod checkout;
pub mod config;
pub mod signature;
pub mod webhook;

// Re-exports
pub use checkout::StripeCheckoutStrategy;
pub use config::StripeConfig;
pub use webhook::{
    dispatch_webhook_event, CheckoutCompletedData, DispatchOutcome, LoggingWebhookHandler,
    WebhookHandler, REQUIRED_WEBHOOK_EVENTS,
};
