//! # Request Handlers
//!
//! Axum request handlers for the checkout API.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use pay_core::{Currency, LineItem, Order, PaymentError, PaymentResult, Price};
use pay_stripe::{dispatch_webhook_event, DispatchOutcome};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

const SIGNATURE_HEADER: &str = "stripe-signature";

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create checkout request. Every field is optional; an empty body buys the
/// default product.
#[derive(Debug, Default, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Items to purchase
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
    /// Idempotency key (optional)
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Item in checkout request
#[derive(Debug, Deserialize)]
pub struct CheckoutItem {
    /// Product name
    pub product: String,
    /// Quantity
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    /// Unit price in the smallest currency unit
    pub price: i64,
    /// ISO currency code, defaults to usd
    #[serde(default)]
    pub currency: Option<String>,
}

fn default_quantity() -> i64 {
    1
}

/// Create checkout response
#[derive(Debug, Serialize)]
pub struct CreateCheckoutResponse {
    /// Checkout URL (redirect user here)
    pub url: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Validation failures are the client's fault; anything the provider call
/// raises is answered with 403, which the frontend already handles.
fn checkout_error_to_response(err: PaymentError) -> ApiError {
    let status = match err {
        PaymentError::InvalidRequest(_) | PaymentError::InvalidPrice { .. } => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::FORBIDDEN,
    };
    (status, Json(ErrorResponse::new(err.to_string())))
}

fn webhook_error_to_response(err: PaymentError) -> Response {
    match err {
        PaymentError::WebhookPayloadInvalid(_) => {
            (StatusCode::BAD_REQUEST, "Invalid payload").into_response()
        }
        PaymentError::WebhookSignatureInvalid(_) => {
            (StatusCode::BAD_REQUEST, "Invalid signature").into_response()
        }
        other => (
            StatusCode::from_u16(other.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(ErrorResponse::new(other.to_string())),
        )
            .into_response(),
    }
}

/// Turn the request body into an order; an empty cart means the default product
fn build_order(request: CreateCheckoutRequest) -> PaymentResult<Order> {
    let mut order = if request.items.is_empty() {
        Order::default_product()
    } else {
        let currency = match &request.items[0].currency {
            Some(code) => code.parse()?,
            None => Currency::USD,
        };
        let mut order = Order::new(currency);

        for item in &request.items {
            let item_currency = match &item.currency {
                Some(code) => code.parse()?,
                None => Currency::USD,
            };
            let quantity = u32::try_from(item.quantity)
                .ok()
                .filter(|q| *q > 0)
                .ok_or_else(|| {
                    PaymentError::InvalidRequest(format!(
                        "Quantity for '{}' must be greater than zero",
                        item.product
                    ))
                })?;
            order.add_item(LineItem::new(
                item.product.clone(),
                Price::from_cents(item.price, item_currency),
                quantity,
            )?)?;
        }
        order
    };

    if let Some(key) = request.idempotency_key.filter(|k| !k.trim().is_empty()) {
        order = order.with_idempotency_key(key);
    }

    Ok(order)
}

// =============================================================================
// Handlers
// =============================================================================

/// Root greeting
pub async fn hello_world() -> &'static str {
    "Hello, World!"
}

/// API greeting
pub async fn hello() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Hello from Flask!" }))
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "checkout-server",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Create a hosted checkout session and return its redirect URL
#[instrument(skip(state, body), fields(body_len = body.len()))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CreateCheckoutResponse>, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        CreateCheckoutRequest::default()
    } else {
        serde_json::from_slice::<CreateCheckoutRequest>(&body).map_err(|e| {
            checkout_error_to_response(PaymentError::InvalidRequest(format!(
                "Invalid request body: {}",
                e
            )))
        })?
    };

    let (order, total) = build_order(request)
        .and_then(|order| {
            let total = order.total()?;
            Ok((order, total))
        })
        .map_err(|e| {
            warn!("Rejected checkout request: {}", e);
            checkout_error_to_response(e)
        })?;

    info!(
        "Creating checkout: {} items, total={}",
        order.item_count(),
        total.display()
    );

    let session = state
        .strategy
        .create_checkout(&order, &state.urls.success_url(), &state.urls.cancel_url())
        .await
        .map_err(|e| {
            error!("Failed to create checkout: {}", e);
            checkout_error_to_response(e)
        })?;

    info!("Created checkout session: {}", session.session_id);

    Ok(Json(CreateCheckoutResponse {
        url: session.checkout_url,
    }))
}

/// Handle a payment provider webhook
#[instrument(skip(state, headers, body), fields(body_len = body.len()))]
pub async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    // A missing header fails verification like a wrong one
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let event = match state.strategy.verify_webhook(&body, signature).await {
        Ok(event) => event,
        Err(e) => {
            warn!("Webhook verification failed: {}", e);
            return webhook_error_to_response(e);
        }
    };

    info!(
        "Received webhook: type={}, id={}",
        event.event_type.as_str(),
        event.event_id
    );

    match dispatch_webhook_event(state.handler.as_ref(), &state.ledger, &event).await {
        Ok(outcome) => {
            if let DispatchOutcome::Duplicate { session_id } = &outcome {
                info!("Acknowledging redelivery for session {}", session_id);
            }
            debug!("Webhook dispatched: {:?}", outcome);
            Json(serde_json::json!({ "success": true })).into_response()
        }
        Err(e) => {
            error!("Webhook handler error: {}", e);
            webhook_error_to_response(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product: &str, quantity: i64, price: i64) -> CheckoutItem {
        CheckoutItem {
            product: product.to_string(),
            quantity,
            price,
            currency: None,
        }
    }

    #[test]
    fn test_empty_request_buys_default_product() {
        let order = build_order(CreateCheckoutRequest::default()).unwrap();
        assert_eq!(order.line_items[0].name, "T-shirt");
        assert_eq!(order.total().unwrap().amount, 2000);
    }

    #[test]
    fn test_items_become_line_items() {
        let request = CreateCheckoutRequest {
            items: vec![item("Mug", 2, 1200), item("Cap", 1, 1800)],
            idempotency_key: Some("cart-42".to_string()),
        };
        let order = build_order(request).unwrap();

        assert_eq!(order.line_items.len(), 2);
        assert_eq!(order.total().unwrap().amount, 4200);
        assert_eq!(order.idempotency_key, "cart-42");
    }

    #[test]
    fn test_invalid_items_rejected() {
        for bad in [
            item("Mug", 0, 1200),
            item("Mug", -1, 1200),
            item("Mug", 1, 0),
            item("Mug", 2, i64::MAX),
        ] {
            let request = CreateCheckoutRequest {
                items: vec![bad],
                idempotency_key: None,
            };
            let err = build_order(request).unwrap_err();
            let (status, _) = checkout_error_to_response(err);
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_provider_failure_is_forbidden() {
        let err = PaymentError::ProviderError {
            provider: "stripe".into(),
            message: "Invalid API Key provided".into(),
        };
        let (status, Json(body)) = checkout_error_to_response(err);
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.error, "Invalid API Key provided");
    }
}
