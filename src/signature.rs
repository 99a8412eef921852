//! Webhook signature verification.
//!
//! LINE signs every webhook delivery: base64(HMAC-SHA256(channel secret,
//! raw request body)), carried in the `x-line-signature` header. The check
//! must run over the exact bytes received; re-serializing parsed JSON does
//! not byte-match what was signed.

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compute the signature LINE would attach to `body`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Check a received signature header against the raw body.
///
/// Rejects when the header is missing or the secret is unconfigured. The
/// comparison itself is constant time.
pub fn verify(secret: &str, provided: Option<&str>, body: &[u8]) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Some(provided) = provided else {
        return false;
    };
    let expected = sign(secret, body);
    bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
}
