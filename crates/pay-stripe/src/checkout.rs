//! # Stripe Checkout Sessions
//!
//! Implementation of the Stripe Checkout Sessions API and webhook
//! verification behind `PaymentStrategy`.

use crate::config::StripeConfig;
use crate::signature::verify_signature;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pay_core::{
    CheckoutSession, Order, PaymentError, PaymentResult, PaymentStrategy, WebhookEvent,
    WebhookEventType,
};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

const PROVIDER: &str = "stripe";

/// Stripe only ever gets one-off payments from this service
const CHECKOUT_MODE: &str = "payment";

/// First backoff between transport retries; doubles per attempt
const RETRY_BACKOFF_MS: u64 = 250;

/// Stripe Checkout Session strategy
///
/// Uses Stripe's hosted checkout page for secure payments.
pub struct StripeCheckoutStrategy {
    config: StripeConfig,
    client: Client,
}

impl StripeCheckoutStrategy {
    /// Create a new Stripe checkout strategy
    pub fn new(config: StripeConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// Flatten the order into Stripe's bracketed form encoding
    fn build_form_params(
        order: &Order,
        success_url: &str,
        cancel_url: &str,
    ) -> Vec<(String, String)> {
        let mut form_params: Vec<(String, String)> = vec![
            ("mode".to_string(), CHECKOUT_MODE.to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
        ];

        for (i, item) in order.line_items.iter().enumerate() {
            form_params.push((
                format!("line_items[{}][price_data][currency]", i),
                item.unit_price.currency.as_str().to_string(),
            ));
            form_params.push((
                format!("line_items[{}][price_data][product_data][name]", i),
                item.name.clone(),
            ));
            form_params.push((
                format!("line_items[{}][price_data][unit_amount]", i),
                item.unit_price.amount.to_string(),
            ));
            form_params.push((
                format!("line_items[{}][quantity]", i),
                item.quantity.to_string(),
            ));
        }

        form_params.push(("metadata[order_id]".to_string(), order.id.clone()));
        form_params
    }

    /// POST the session, retrying transport failures with the same key.
    ///
    /// Only connect and timeout errors are retried: the idempotency key makes
    /// Stripe return the original session if the first attempt did land.
    async fn send_create_session(
        &self,
        url: &str,
        idempotency_key: &str,
        form_params: &[(String, String)],
    ) -> PaymentResult<Response> {
        let mut attempt: u32 = 0;
        loop {
            let result = self
                .client
                .post(url)
                .header("Authorization", self.config.auth_header())
                .header("Stripe-Version", &self.config.api_version)
                .header("Idempotency-Key", idempotency_key)
                .form(form_params)
                .send()
                .await;

            match result {
                Ok(response) => return Ok(response),
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.config.max_retries => {
                    attempt += 1;
                    let backoff = Duration::from_millis(RETRY_BACKOFF_MS << (attempt - 1));
                    warn!(
                        "Stripe request failed ({}), retry {}/{} in {:?}",
                        e, attempt, self.config.max_retries, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(PaymentError::NetworkError(e.to_string())),
            }
        }
    }
}

#[async_trait]
impl PaymentStrategy for StripeCheckoutStrategy {
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn create_checkout(
        &self,
        order: &Order,
        success_url: &str,
        cancel_url: &str,
    ) -> PaymentResult<CheckoutSession> {
        if order.is_empty() {
            return Err(PaymentError::InvalidRequest(
                "Order has no items".to_string(),
            ));
        }

        let total = order.total()?;
        let form_params = Self::build_form_params(order, success_url, cancel_url);

        debug!(
            "Creating Stripe checkout session: {} items, total={}",
            order.line_items.len(),
            total.display()
        );

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let response = self
            .send_create_session(&url, &order.idempotency_key, &form_params)
            .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(PaymentError::ProviderError {
                    provider: PROVIDER.to_string(),
                    message: error_response.error.message,
                });
            }

            return Err(PaymentError::ProviderError {
                provider: PROVIDER.to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let session_response: StripeCheckoutSessionResponse =
            serde_json::from_str(&body).map_err(|e| {
                PaymentError::Serialization(format!("Failed to parse Stripe response: {}", e))
            })?;

        let checkout_url = session_response.url.ok_or_else(|| PaymentError::ProviderError {
            provider: PROVIDER.to_string(),
            message: format!("Session {} has no redirect URL", session_response.id),
        })?;

        info!(
            "Created Stripe checkout session: id={}, url={}",
            session_response.id, checkout_url
        );

        let mut session =
            CheckoutSession::new(session_response.id, order.id.clone(), PROVIDER, checkout_url);
        session.expires_at = session_response
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0));

        Ok(session)
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> PaymentResult<WebhookEvent> {
        let payload = std::str::from_utf8(payload).map_err(|e| {
            PaymentError::WebhookPayloadInvalid(format!("Body is not UTF-8: {}", e))
        })?;

        verify_signature(
            payload,
            signature,
            &self.config.webhook_secret,
            self.config.signature_tolerance_secs,
            Utc::now().timestamp(),
        )?;

        let event: StripeWebhookEvent = serde_json::from_str(payload).map_err(|e| {
            PaymentError::WebhookPayloadInvalid(format!("Failed to parse webhook: {}", e))
        })?;

        debug!("Verified Stripe webhook: type={}", event.event_type);

        let event_type = WebhookEventType::from_provider(&event.event_type);

        // Only completed checkouts are read; other types may omit the object
        let object = match event.data.and_then(|data| data.object) {
            Some(object) => object,
            None if event_type == WebhookEventType::CheckoutCompleted => {
                return Err(PaymentError::WebhookPayloadInvalid(
                    "Event has no data.object".to_string(),
                ));
            }
            None => serde_json::Map::new(),
        };

        let object_id = object
            .get("id")
            .and_then(|v| v.as_str())
            .map(String::from);

        Ok(WebhookEvent {
            event_id: event.id,
            event_type,
            provider: PROVIDER.to_string(),
            object_id,
            object: serde_json::Value::Object(object),
            timestamp: DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now),
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeCheckoutSessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: i64,
    #[serde(default)]
    data: Option<StripeEventData>,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    #[serde(default)]
    object: Option<serde_json::Map<String, serde_json::Value>>,
}
