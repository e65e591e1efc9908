//! # Push notification signatures
//!
//! Rails that support signed webhooks send an HMAC-SHA256 of the raw request body, keyed with a secret shared
//! between the rail and this service. The signature travels in a request header as base64, optionally prefixed with
//! `sha256=`.
//!
//! The comparison is constant-time ([`Mac::verify_slice`]), and the signature is always computed over the exact bytes
//! received, before any JSON parsing.
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use log::trace;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Calculates the base64-encoded HMAC-SHA256 of `data` using `secret` as the key.
pub fn compute_signature(secret: &str, data: &[u8]) -> String {
    let mut mac = new_mac(secret);
    mac.update(data);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Returns true if `signature` is a valid HMAC-SHA256 of `data` under `secret`.
pub fn verify_signature(secret: &str, data: &[u8], signature: &str) -> bool {
    let signature = signature.trim();
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);
    let Ok(expected) = STANDARD.decode(signature) else {
        trace!("🔐️ Signature is not valid base64");
        return false;
    };
    let mut mac = new_mac(secret);
    mac.update(data);
    mac.verify_slice(&expected).is_ok()
}

fn new_mac(secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length, so this can never fail
    <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()).unwrap_or_else(|_| unreachable!("HMAC takes any key size"))
}

#[cfg(test)]
mod test {
    use super::*;

    const BODY: &[u8] = br#"{"payment_hash":"hash123","settled":true}"#;

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2
        let sig = compute_signature("Jefe", b"what do ya want for nothing?");
        assert_eq!(sig, "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM=");
    }

    #[test]
    fn valid_signature_is_accepted() {
        let sig = compute_signature("s3cr3t", BODY);
        assert!(verify_signature("s3cr3t", BODY, &sig));
        assert!(verify_signature("s3cr3t", BODY, &format!("sha256={sig}")));
    }

    #[test]
    fn tampered_body_or_wrong_secret_is_rejected() {
        let sig = compute_signature("s3cr3t", BODY);
        assert!(!verify_signature("other", BODY, &sig));
        assert!(!verify_signature("s3cr3t", br#"{"payment_hash":"hash124","settled":true}"#, &sig));
        assert!(!verify_signature("s3cr3t", BODY, "not base64!"));
        assert!(!verify_signature("s3cr3t", BODY, ""));
    }
}
