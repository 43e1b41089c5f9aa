//! # Application State
//!
//! Immutable configuration and shared services, built once at startup and
//! handed to every handler through axum `State`.

use axum::http::HeaderValue;
use pay_core::{BoxedPaymentStrategy, CheckoutUrls, FulfillmentLedger};
use pay_stripe::{LoggingWebhookHandler, StripeCheckoutStrategy, WebhookHandler};
use std::net::SocketAddr;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Frontend base URL (redirect target and CORS origin)
    pub frontend_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            frontend_url: lookup("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Origin browsers will send from the frontend (scheme, host and port only)
    pub fn cors_origin(&self) -> Option<HeaderValue> {
        let url = self.frontend_url.trim_end_matches('/');
        let (scheme, rest) = url.split_once("://")?;
        let authority = rest.split(['/', '?', '#']).next()?;
        if authority.is_empty() {
            return None;
        }
        HeaderValue::from_str(&format!("{}://{}", scheme, authority)).ok()
    }

    pub fn checkout_urls(&self) -> CheckoutUrls {
        CheckoutUrls::new(&self.frontend_url)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment provider
    pub strategy: BoxedPaymentStrategy,
    /// Fulfillment for completed checkouts
    pub handler: Arc<dyn WebhookHandler>,
    /// Sessions already fulfilled
    pub ledger: FulfillmentLedger,
    /// Checkout redirect URLs
    pub urls: CheckoutUrls,
    /// Application config
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Create a new AppState with the Stripe strategy, configured from env
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let stripe_strategy = StripeCheckoutStrategy::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;

        if stripe_strategy.config().is_test_mode() {
            tracing::info!("Stripe is in test mode");
        }

        Ok(Self::with_strategy(
            config,
            Arc::new(stripe_strategy),
            Arc::new(LoggingWebhookHandler),
        ))
    }

    /// Assemble state from explicit parts
    pub fn with_strategy(
        config: AppConfig,
        strategy: BoxedPaymentStrategy,
        handler: Arc<dyn WebhookHandler>,
    ) -> Self {
        Self {
            strategy,
            handler,
            ledger: FulfillmentLedger::default(),
            urls: config.checkout_urls(),
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8000);
        assert_eq!(config.frontend_url, "http://localhost:5173");
        assert!(!config.is_production());
    }

    #[test]
    fn test_app_config_lookup() {
        let config = AppConfig::from_lookup(|key| match key {
            "PORT" => Some("9090".to_string()),
            "FRONTEND_URL" => Some("https://shop.example.com".to_string()),
            "ENVIRONMENT" => Some("production".to_string()),
            _ => None,
        });
        assert_eq!(config.port, 9090);
        assert!(config.is_production());
        assert_eq!(
            config.checkout_urls().success_url(),
            "https://shop.example.com?success=true"
        );
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            ..AppConfig::default()
        };

        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_cors_origin() {
        let origin = |url: &str| {
            AppConfig {
                frontend_url: url.to_string(),
                ..AppConfig::default()
            }
            .cors_origin()
        };

        assert_eq!(origin("http://localhost:5173").unwrap(), "http://localhost:5173");
        assert_eq!(origin("https://shop.example.com/app/").unwrap(), "https://shop.example.com");
        assert!(origin("localhost:5173").is_none());
    }
}
