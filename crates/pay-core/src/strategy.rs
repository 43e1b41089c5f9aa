//! # Payment Strategy Trait
//!
//! The seam between the HTTP layer and a payment provider.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PaymentStrategy (trait)                  │
//! │  ├── create_checkout()   order  -> hosted session URL       │
//! │  ├── verify_webhook()    body + signature -> event          │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!          ┌─────────────────┴─────────────────┐
//!  ┌───────┴───────┐                   ┌───────┴───────┐
//!  │StripeCheckout │                   │ test doubles  │
//!  │   Strategy    │                   │               │
//!  └───────────────┘                   └───────────────┘
//! ```

use crate::error::PaymentResult;
use crate::order::{CheckoutSession, Order, WebhookEvent};
use async_trait::async_trait;
use std::sync::Arc;

/// Core trait for payment provider implementations.
#[async_trait]
pub trait PaymentStrategy: Send + Sync {
    /// Create a checkout session and return the redirect URL.
    ///
    /// # Arguments
    /// * `order` - The order to check out
    /// * `success_url` - URL to redirect after successful payment
    /// * `cancel_url` - URL to redirect if customer cancels
    async fn create_checkout(
        &self,
        order: &Order,
        success_url: &str,
        cancel_url: &str,
    ) -> PaymentResult<CheckoutSession>;

    /// Verify a webhook signature and parse the event.
    ///
    /// Fails with `WebhookSignatureInvalid` when the signature header does not
    /// authenticate `payload`, and with `WebhookPayloadInvalid` when the body
    /// is not an event envelope.
    async fn verify_webhook(&self, payload: &[u8], signature: &str)
        -> PaymentResult<WebhookEvent>;

    /// Get the provider name (for logging).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a boxed payment strategy (dynamic dispatch)
pub type BoxedPaymentStrategy = Arc<dyn PaymentStrategy>;

/// Redirect targets handed to the provider, derived from the frontend URL
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    /// Base URL of the frontend (e.g., "http://localhost:5173")
    pub frontend_url: String,
}

impl CheckoutUrls {
    pub fn new(frontend_url: impl Into<String>) -> Self {
        Self {
            frontend_url: frontend_url.into(),
        }
    }

    pub fn success_url(&self) -> String {
        format!("{}?success=true", self.frontend_url)
    }

    pub fn cancel_url(&self) -> String {
        format!("{}?canceled=true", self.frontend_url)
    }
}

impl Default for CheckoutUrls {
    fn default() -> Self {
        Self::new("http://localhost:5173")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_urls() {
        let urls = CheckoutUrls::new("https://shop.example.com");

        assert_eq!(urls.success_url(), "https://shop.example.com?success=true");
        assert_eq!(urls.cancel_url(), "https://shop.example.com?canceled=true");
    }

    #[test]
    fn test_default_frontend() {
        let urls = CheckoutUrls::default();
        assert_eq!(urls.success_url(), "http://localhost:5173?success=true");
    }
}
