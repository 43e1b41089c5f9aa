//! # Webhook Signature Verification
//!
//! Stripe signs every webhook with the endpoint secret and sends the result
//! in the `Stripe-Signature` header:
//!
//! ```text
//! Stripe-Signature: t=1492774577,v1=5257a869e7ecebeda32affa62cdca3fa51cad7e77a0e56ff536d0ce8e108d8bd
//! ```
//!
//! `v1` is `hex(HMAC-SHA256(secret, "{t}.{raw body}"))`. Several `v1` entries
//! may be present while a secret is being rolled; any one matching is enough.

use hmac::{Hmac, Mac};
use pay_core::{PaymentError, PaymentResult};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SCHEME: &str = "v1";

/// Parsed `Stripe-Signature` header
#[derive(Debug)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> PaymentResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            SCHEME => signatures.push(value.to_string()),
            _ => {}
        }
    }

    match timestamp {
        Some(timestamp) if !signatures.is_empty() => Ok(SignatureHeader {
            timestamp,
            signatures,
        }),
        _ => Err(PaymentError::WebhookSignatureInvalid(
            "Unable to extract timestamp and signatures from header".to_string(),
        )),
    }
}

fn keyed_mac(secret: &str, timestamp: i64, payload: &str) -> PaymentResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Internal(format!("HMAC key rejected: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    Ok(mac)
}

/// Verify `header` against `payload`.
///
/// A signature must match before the timestamp is looked at; a matching
/// signature older than `tolerance_secs` (relative to `now`) is still rejected.
/// A non-positive tolerance disables the age check.
pub fn verify_signature(
    payload: &str,
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> PaymentResult<()> {
    let parsed = parse_signature_header(header)?;
    let mac = keyed_mac(secret, parsed.timestamp, payload)?;

    // verify_slice compares in constant time
    let matched = parsed.signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if !matched {
        return Err(PaymentError::WebhookSignatureInvalid(
            "No signatures found matching the expected signature for payload".to_string(),
        ));
    }

    if tolerance_secs > 0 && parsed.timestamp < now - tolerance_secs {
        return Err(PaymentError::WebhookSignatureInvalid(
            "Timestamp outside the tolerance zone".to_string(),
        ));
    }

    Ok(())
}

/// Build a `Stripe-Signature` header value for `payload`, as Stripe would.
///
/// Used by tests and local tooling that replays events.
pub fn generate_header(secret: &str, timestamp: i64, payload: &str) -> PaymentResult<String> {
    let signature = hex::encode(keyed_mac(secret, timestamp, payload)?.finalize().into_bytes());
    Ok(format!("t={},{}={}", timestamp, SCHEME, signature))
}
