//! # Payment Error Types
//!
//! Typed error handling for the checkout backend.
//! All payment operations return `Result<T, PaymentError>`.

use thiserror::Error;

/// Core error type for all payment operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Price mismatch or invalid amount
    #[error("Invalid price: {message}")]
    InvalidPrice { message: String },

    /// Payment provider API error
    #[error("{message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Webhook body is not a valid event envelope
    #[error("Invalid payload: {0}")]
    WebhookPayloadInvalid(String),

    /// Webhook signature header missing, stale, or not matching
    #[error("Invalid signature: {0}")]
    WebhookSignatureInvalid(String),

    /// Fulfillment of a completed checkout failed
    #[error("Fulfillment failed for session {session_id}: {message}")]
    FulfillmentFailed { session_id: String, message: String },

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PaymentError {
    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidRequest(_) => 400,
            PaymentError::InvalidPrice { .. } => 400,
            PaymentError::ProviderError { .. } => 502,
            PaymentError::NetworkError(_) => 503,
            PaymentError::WebhookPayloadInvalid(_) => 400,
            PaymentError::WebhookSignatureInvalid(_) => 400,
            PaymentError::FulfillmentFailed { .. } => 500,
            PaymentError::Internal(_) => 500,
            PaymentError::Serialization(_) => 500,
        }
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_displays_bare_message() {
        let err = PaymentError::ProviderError {
            provider: "stripe".into(),
            message: "No such price: 'price_123'".into(),
        };
        assert_eq!(err.to_string(), "No such price: 'price_123'");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            PaymentError::InvalidRequest("test".into()).status_code(),
            400
        );
        assert_eq!(
            PaymentError::WebhookSignatureInvalid("mismatch".into()).status_code(),
            400
        );
        assert_eq!(
            PaymentError::FulfillmentFailed {
                session_id: "cs_1".into(),
                message: "boom".into()
            }
            .status_code(),
            500
        );
    }
}
