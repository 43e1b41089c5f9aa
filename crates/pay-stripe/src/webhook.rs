//! # Stripe Webhook Handling
//!
//! Dispatch of verified webhook events to a `WebhookHandler`, with
//! completed checkouts fulfilled at most once per session.

use pay_core::{FulfillmentLedger, PaymentError, PaymentResult, WebhookEvent, WebhookEventType};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Parsed `checkout.session.completed` object
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutCompletedData {
    #[serde(rename = "id")]
    pub session_id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

impl CheckoutCompletedData {
    /// Parse from a verified webhook event
    pub fn from_event(event: &WebhookEvent) -> PaymentResult<Self> {
        serde_json::from_value(event.object.clone()).map_err(|e| {
            PaymentError::WebhookPayloadInvalid(format!("Invalid checkout session: {}", e))
        })
    }

    /// Check if payment was successful
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    pub fn customer_email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|details| details.email.as_deref())
    }

    /// Get the internal order ID from metadata
    pub fn order_id(&self) -> Option<&str> {
        self.metadata.get("order_id").map(|s| s.as_str())
    }
}

/// Webhook event handler trait
///
/// Implement this trait to fulfil purchases.
pub trait WebhookHandler: Send + Sync {
    /// Called once per completed checkout session
    fn on_checkout_completed(&self, data: &CheckoutCompletedData) -> PaymentResult<()>;

    /// Called for events this service does not act on
    fn on_unknown_event(&self, event: &WebhookEvent) -> PaymentResult<()> {
        debug!("Unhandled webhook event: {}", event.event_type.as_str());
        Ok(())
    }
}

/// Default handler: fulfillment is a log line
pub struct LoggingWebhookHandler;

impl WebhookHandler for LoggingWebhookHandler {
    fn on_checkout_completed(&self, data: &CheckoutCompletedData) -> PaymentResult<()> {
        if !data.is_paid() {
            warn!(
                status = ?data.payment_status,
                "Checkout {} completed before payment cleared",
                data.session_id
            );
        }
        info!(
            amount = ?data.amount_total,
            currency = ?data.currency,
            email = ?data.customer_email(),
            order_id = ?data.order_id(),
            "Payment successful for session {}",
            data.session_id
        );
        Ok(())
    }
}

/// What dispatch did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Fulfillment ran for this session
    Fulfilled { session_id: String },
    /// Session was fulfilled by an earlier delivery
    Duplicate { session_id: String },
    /// Event type not acted on
    Ignored { event_type: String },
}

/// Dispatch a verified webhook event to the appropriate handler method.
///
/// Completed checkouts are claimed in `ledger` first, so a redelivered event
/// for the same session does not reach the handler again. If the handler
/// fails the claim is released and `FulfillmentFailed` is returned, letting a
/// later redelivery retry.
pub async fn dispatch_webhook_event(
    handler: &dyn WebhookHandler,
    ledger: &FulfillmentLedger,
    event: &WebhookEvent,
) -> PaymentResult<DispatchOutcome> {
    match &event.event_type {
        WebhookEventType::CheckoutCompleted => {
            let data = CheckoutCompletedData::from_event(event)?;

            if !ledger.claim(&data.session_id).await {
                warn!(
                    "Duplicate delivery for session {} (event {}), skipping fulfillment",
                    data.session_id, event.event_id
                );
                return Ok(DispatchOutcome::Duplicate {
                    session_id: data.session_id,
                });
            }

            if let Err(e) = handler.on_checkout_completed(&data) {
                error!("Fulfillment failed for session {}: {}", data.session_id, e);
                ledger.release(&data.session_id).await;
                return Err(PaymentError::FulfillmentFailed {
                    session_id: data.session_id,
                    message: e.to_string(),
                });
            }

            Ok(DispatchOutcome::Fulfilled {
                session_id: data.session_id,
            })
        }
        WebhookEventType::Unknown(event_type) => {
            handler.on_unknown_event(event)?;
            Ok(DispatchOutcome::Ignored {
                event_type: event_type.clone(),
            })
        }
    }
}

/// Events that should be enabled for the endpoint in the Stripe Dashboard
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = &["checkout.session.completed"];
