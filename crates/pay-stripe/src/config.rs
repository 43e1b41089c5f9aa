//! # Stripe Configuration
//!
//! Configuration management for Stripe integration.
//! All secrets are loaded from environment variables.

use pay_core::PaymentError;
use std::env;
use std::time::Duration;

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";
const DEFAULT_API_VERSION: &str = "2024-12-18.acacia";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default tolerance between the signed timestamp and now, in seconds
pub const DEFAULT_SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Stripe API configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_test_..., sk_live_... or restricted rk_...)
    pub secret_key: String,

    /// Webhook signing secret (whsec_...)
    pub webhook_secret: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version
    pub api_version: String,

    /// Per-request timeout for API calls
    pub timeout: Duration,

    /// Extra attempts after a transport failure (same idempotency key)
    pub max_retries: u32,

    /// Maximum age of a webhook signature timestamp
    pub signature_tolerance_secs: i64,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `STRIPE_SECRET_KEY`
    /// - `STRIPE_WEBHOOK_SECRET`
    ///
    /// Optional: `STRIPE_API_BASE_URL`, `STRIPE_TIMEOUT_SECS`, `STRIPE_MAX_RETRIES`
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PaymentError> {
        let secret_key = lookup("STRIPE_SECRET_KEY").ok_or_else(|| {
            PaymentError::Configuration("STRIPE_SECRET_KEY not set".to_string())
        })?;

        let webhook_secret = lookup("STRIPE_WEBHOOK_SECRET").ok_or_else(|| {
            PaymentError::Configuration("STRIPE_WEBHOOK_SECRET not set".to_string())
        })?;

        // Validate key formats
        if !["sk_test_", "sk_live_", "rk_test_", "rk_live_"]
            .iter()
            .any(|prefix| secret_key.starts_with(prefix))
        {
            return Err(PaymentError::Configuration(
                "STRIPE_SECRET_KEY must start with sk_test_, sk_live_, rk_test_ or rk_live_"
                    .to_string(),
            ));
        }

        if !webhook_secret.starts_with("whsec_") {
            return Err(PaymentError::Configuration(
                "STRIPE_WEBHOOK_SECRET must start with whsec_".to_string(),
            ));
        }

        let timeout_secs = match lookup("STRIPE_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                PaymentError::Configuration(format!("Invalid STRIPE_TIMEOUT_SECS: {}", raw))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let max_retries = match lookup("STRIPE_MAX_RETRIES") {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                PaymentError::Configuration(format!("Invalid STRIPE_MAX_RETRIES: {}", raw))
            })?,
            None => DEFAULT_MAX_RETRIES,
        };

        let mut config = Self::new(secret_key, webhook_secret)
            .with_timeout(Duration::from_secs(timeout_secs))
            .with_max_retries(max_retries);

        if let Some(url) = lookup("STRIPE_API_BASE_URL") {
            config = config.with_api_base_url(url);
        }

        Ok(config)
    }

    /// Create config with explicit values (for testing)
    pub fn new(secret_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            webhook_secret: webhook_secret.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            signature_tolerance_secs: DEFAULT_SIGNATURE_TOLERANCE_SECS,
        }
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_") || self.secret_key.starts_with("rk_test_")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Builder: set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder: set transport retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Builder: set webhook timestamp tolerance
    pub fn with_signature_tolerance(mut self, secs: i64) -> Self {
        self.signature_tolerance_secs = secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_modes() {
        let config = StripeConfig::new("sk_test_abc123", "whsec_secret");
        assert!(config.is_test_mode());

        let config = StripeConfig::new("sk_live_abc123", "whsec_secret");
        assert!(!config.is_test_mode());
    }

    #[test]
    fn test_auth_header() {
        let config = StripeConfig::new("sk_test_abc123", "whsec_secret");
        assert_eq!(config.auth_header(), "Bearer sk_test_abc123");
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = StripeConfig::from_lookup(lookup_from(&[
            ("STRIPE_SECRET_KEY", "sk_test_abc"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_abc"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "https://api.stripe.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = StripeConfig::from_lookup(lookup_from(&[
            ("STRIPE_SECRET_KEY", "rk_live_abc"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_abc"),
            ("STRIPE_API_BASE_URL", "http://localhost:12111/"),
            ("STRIPE_TIMEOUT_SECS", "5"),
            ("STRIPE_MAX_RETRIES", "0"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "http://localhost:12111");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_missing_and_malformed_keys() {
        let missing = StripeConfig::from_lookup(lookup_from(&[(
            "STRIPE_WEBHOOK_SECRET",
            "whsec_abc",
        )]));
        assert!(matches!(missing, Err(PaymentError::Configuration(_))));

        let bad_secret = StripeConfig::from_lookup(lookup_from(&[
            ("STRIPE_SECRET_KEY", "pk_test_abc"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_abc"),
        ]));
        assert!(bad_secret.is_err());

        let bad_webhook = StripeConfig::from_lookup(lookup_from(&[
            ("STRIPE_SECRET_KEY", "sk_test_abc"),
            ("STRIPE_WEBHOOK_SECRET", "secret"),
        ]));
        assert!(bad_webhook.is_err());

        let bad_timeout = StripeConfig::from_lookup(lookup_from(&[
            ("STRIPE_SECRET_KEY", "sk_test_abc"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_abc"),
            ("STRIPE_TIMEOUT_SECS", "soon"),
        ]));
        assert!(bad_timeout.is_err());
    }
}
