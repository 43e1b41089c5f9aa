//! # Order Types
//!
//! Order, checkout session and webhook event types.

use crate::error::{PaymentError, PaymentResult};
use crate::product::{Currency, Price};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the product sold when the client does not send a cart
pub const DEFAULT_PRODUCT_NAME: &str = "T-shirt";

/// Unit price of the default product, in cents
pub const DEFAULT_PRODUCT_AMOUNT: i64 = 2000;

/// Largest unit price Stripe accepts for a line item, in the smallest unit
pub const MAX_UNIT_AMOUNT: i64 = 99_999_999;

/// A line item in an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product name shown on the hosted checkout page
    pub name: String,

    /// Unit price
    pub unit_price: Price,

    /// Quantity
    pub quantity: u32,
}

impl LineItem {
    /// Create a validated line item.
    ///
    /// Rejects empty names, zero quantities and prices outside
    /// `1..=MAX_UNIT_AMOUNT`.
    pub fn new(
        name: impl Into<String>,
        unit_price: Price,
        quantity: u32,
    ) -> PaymentResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PaymentError::InvalidRequest(
                "Product name must not be empty".to_string(),
            ));
        }
        if quantity == 0 {
            return Err(PaymentError::InvalidRequest(format!(
                "Quantity for '{}' must be greater than zero",
                name
            )));
        }
        if unit_price.amount <= 0 {
            return Err(PaymentError::InvalidPrice {
                message: format!("Price for '{}' must be greater than zero", name),
            });
        }
        if unit_price.amount > MAX_UNIT_AMOUNT {
            return Err(PaymentError::InvalidPrice {
                message: format!(
                    "Price for '{}' exceeds the maximum of {}",
                    name, MAX_UNIT_AMOUNT
                ),
            });
        }
        Ok(Self {
            name,
            unit_price,
            quantity,
        })
    }

    /// Calculate the total price for this line item
    pub fn total(&self) -> PaymentResult<Price> {
        let amount = self
            .unit_price
            .amount
            .checked_mul(i64::from(self.quantity))
            .ok_or_else(|| PaymentError::InvalidPrice {
                message: format!("Total for '{}' is too large", self.name),
            })?;
        Ok(Price {
            amount,
            currency: self.unit_price.currency,
        })
    }
}

/// An order to be checked out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID (generated)
    pub id: String,

    /// Line items
    pub line_items: Vec<LineItem>,

    /// Currency (must be same for all items)
    pub currency: Currency,

    /// Idempotency key sent with session creation
    pub idempotency_key: String,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a new empty order with generated ID and idempotency key
    pub fn new(currency: Currency) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            line_items: Vec::new(),
            currency,
            idempotency_key: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        }
    }

    /// The fixed single-item order used when the client sends no cart
    pub fn default_product() -> Self {
        let mut order = Self::new(Currency::USD);
        order.line_items.push(LineItem {
            name: DEFAULT_PRODUCT_NAME.to_string(),
            unit_price: Price::from_cents(DEFAULT_PRODUCT_AMOUNT, Currency::USD),
            quantity: 1,
        });
        order
    }

    /// Add a line item; all items must share the order currency
    pub fn add_item(&mut self, item: LineItem) -> PaymentResult<()> {
        if item.unit_price.currency != self.currency {
            return Err(PaymentError::InvalidRequest(format!(
                "Item '{}' is priced in {} but the order is in {}",
                item.name, item.unit_price.currency, self.currency
            )));
        }
        self.line_items.push(item);
        Ok(())
    }

    /// Set idempotency key
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = key.into();
        self
    }

    /// Calculate order total; fails if it does not fit in an `i64`
    pub fn total(&self) -> PaymentResult<Price> {
        let mut amount: i64 = 0;
        for item in &self.line_items {
            amount = amount
                .checked_add(item.total()?.amount)
                .ok_or_else(|| PaymentError::InvalidPrice {
                    message: "Order total is too large".to_string(),
                })?;
        }
        Ok(Price {
            amount,
            currency: self.currency,
        })
    }

    /// Check if order is empty
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }

    /// Get item count
    pub fn item_count(&self) -> u32 {
        self.line_items.iter().map(|i| i.quantity).sum()
    }
}

/// A checkout session created by a payment provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID
    pub session_id: String,

    /// Our internal order ID
    pub order_id: String,

    /// Provider name (e.g., "stripe")
    pub provider: String,

    /// URL to redirect customer to for payment
    pub checkout_url: String,

    /// When the session expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl CheckoutSession {
    /// Create a new checkout session
    pub fn new(
        session_id: impl Into<String>,
        order_id: impl Into<String>,
        provider: impl Into<String>,
        checkout_url: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            order_id: order_id.into(),
            provider: provider.into(),
            checkout_url: checkout_url.into(),
            expires_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Webhook event types we care about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// `checkout.session.completed`
    CheckoutCompleted,
    /// Anything else (acknowledged, not acted on)
    Unknown(String),
}

impl WebhookEventType {
    /// Map a provider event type string
    pub fn from_provider(event_type: &str) -> Self {
        match event_type {
            "checkout.session.completed" => WebhookEventType::CheckoutCompleted,
            other => WebhookEventType::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WebhookEventType::CheckoutCompleted => "checkout.session.completed",
            WebhookEventType::Unknown(other) => other,
        }
    }
}

/// A verified webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event ID from provider
    pub event_id: String,

    /// Event type
    pub event_type: WebhookEventType,

    /// Provider name
    pub provider: String,

    /// `data.object.id`, when the object carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,

    /// The `data.object` record as sent by the provider
    pub object: serde_json::Value,

    /// Event creation time
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_product_order() {
        let order = Order::default_product();

        assert_eq!(order.line_items.len(), 1);
        assert_eq!(order.line_items[0].name, "T-shirt");
        assert_eq!(order.total().unwrap().amount, 2000);
        assert_eq!(order.currency, Currency::USD);
        assert!(!order.idempotency_key.is_empty());
    }

    #[test]
    fn test_order_total() {
        let mut order = Order::new(Currency::USD);
        order
            .add_item(LineItem::new("Mug", Price::from_cents(1000, Currency::USD), 2).unwrap())
            .unwrap();
        order
            .add_item(LineItem::new("Cap", Price::from_cents(2500, Currency::USD), 1).unwrap())
            .unwrap();

        assert_eq!(order.total().unwrap().amount, 4500);
        assert_eq!(order.item_count(), 3);
    }

    #[test]
    fn test_line_item_validation() {
        let usd = |amount| Price::from_cents(amount, Currency::USD);

        assert!(matches!(
            LineItem::new("Mug", usd(1000), 0),
            Err(PaymentError::InvalidRequest(_))
        ));
        assert!(matches!(
            LineItem::new("Mug", usd(0), 1),
            Err(PaymentError::InvalidPrice { .. })
        ));
        assert!(matches!(
            LineItem::new("Mug", usd(-5), 1),
            Err(PaymentError::InvalidPrice { .. })
        ));
        assert!(LineItem::new("  ", usd(1000), 1).is_err());
        assert!(LineItem::new("Mug", usd(MAX_UNIT_AMOUNT), 1).is_ok());
        assert!(matches!(
            LineItem::new("Mug", usd(MAX_UNIT_AMOUNT + 1), 1),
            Err(PaymentError::InvalidPrice { .. })
        ));
        assert!(matches!(
            LineItem::new("Mug", usd(i64::MAX), 2),
            Err(PaymentError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn test_total_overflow_is_an_error() {
        let big = LineItem {
            name: "Yacht".to_string(),
            unit_price: Price::from_cents(i64::MAX / 2, Currency::USD),
            quantity: 3,
        };
        assert!(matches!(big.total(), Err(PaymentError::InvalidPrice { .. })));

        let mut order = Order::new(Currency::USD);
        let price = Price::from_cents(MAX_UNIT_AMOUNT, Currency::USD);
        let max_item = LineItem::new("Crate", price, u32::MAX).unwrap();
        for _ in 0..25 {
            order.add_item(max_item.clone()).unwrap();
        }
        assert!(matches!(order.total(), Err(PaymentError::InvalidPrice { .. })));
    }

    #[test]
    fn test_mixed_currency_rejected() {
        let mut order = Order::new(Currency::USD);
        let item = LineItem::new("Scarf", Price::from_cents(900, Currency::EUR), 1).unwrap();

        assert!(order.add_item(item).is_err());
        assert!(order.is_empty());
    }

    #[test]
    fn test_event_type_mapping() {
        assert_eq!(
            WebhookEventType::from_provider("checkout.session.completed"),
            WebhookEventType::CheckoutCompleted
        );
        let other = WebhookEventType::from_provider("invoice.paid");
        assert_eq!(other, WebhookEventType::Unknown("invoice.paid".to_string()));
        assert_eq!(other.as_str(), "invoice.paid");
    }
}
