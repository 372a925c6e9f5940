//! Vendor request-signing ("checksum") engine.
//!
//! PhonePe signs requests with `sha256(base64(body) + route + secret)` in hex,
//! suffixed by `###` and the configured key index. A status check carries no
//! body, so the signed string degenerates to `route + secret`. The amount and
//! field order inside `body` must match the serialized request bytes exactly
//! or the vendor rejects the signature.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};

/// Separator between the hex digest and the key index.
const KEY_SEPARATOR: &str = "###";

/// Computes the signature token for an outbound request body.
pub fn sign(body: &[u8], route_path: &str, secret: &str, key_index: u8) -> String {
    let mut hasher = Sha256::new();
    hasher.update(BASE64.encode(body).as_bytes());
    hasher.update(route_path.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{}{}{}", hex::encode(hasher.finalize()), KEY_SEPARATOR, key_index)
}

/// Signature for a body-less status-check request.
pub fn status_sign(route_path: &str, secret: &str, key_index: u8) -> String {
    sign(b"", route_path, secret, key_index)
}

/// Verifies an inbound webhook signature: `hex(sha256(body + secret))` compared
/// against the header-supplied value in constant time.
pub fn verify_webhook(body: &[u8], secret: &str, provided: &str) -> bool {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hasher.update(secret.as_bytes());
    let expected = hex::encode(hasher.finalize());
    constant_time_eq(&expected, provided)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn sign_matches_known_vector() {
        let body = br#"{"merchantId":"M1","amount":10000}"#;
        let token = sign(body, "/pg/v1/pay", SECRET, 1);
        assert_eq!(
            token,
            "b3fee05149ceb677b7e6340a51bfc069cbfab5762ca562c2cea39d614c58d798###1"
        );
    }

    #[test]
    fn empty_body_degenerates_to_route_plus_secret() {
        let token = status_sign("/pg/v1/status/M1/abc", SECRET, 1);
        assert_eq!(
            token,
            "fc6d9279de6d8447e93d9492d12f1da14cae2bfc4522ab0acf6b00730344ecb3###1"
        );
        assert_eq!(token, sign(b"", "/pg/v1/status/M1/abc", SECRET, 1));
    }

    #[test]
    fn sign_is_deterministic() {
        let body = b"payload bytes";
        assert_eq!(sign(body, "/r", SECRET, 1), sign(body, "/r", SECRET, 1));
    }

    #[test]
    fn key_index_changes_the_token_suffix() {
        let a = sign(b"x", "/r", SECRET, 1);
        let b = sign(b"x", "/r", SECRET, 2);
        assert!(a.ends_with("###1"));
        assert!(b.ends_with("###2"));
        assert_eq!(a.split("###").next(), b.split("###").next());
    }

    #[test]
    fn webhook_verification_accepts_the_real_signature() {
        let body = br#"{"order_id":"x","order_status":"PAID"}"#;
        assert!(verify_webhook(
            body,
            "whsec",
            "bdb1c27f06f354ca41ab0fda6669787fc6946708fceabefc83c36fb954db79ff"
        ));
    }

    #[test]
    fn webhook_verification_rejects_forgeries() {
        let body = br#"{"order_id":"x","order_status":"PAID"}"#;
        assert!(!verify_webhook(body, "whsec", "deadbeef"));
        assert!(!verify_webhook(body, "other-secret",
            "bdb1c27f06f354ca41ab0fda6669787fc6946708fceabefc83c36fb954db79ff"));
    }

    #[test]
    fn constant_time_eq_requires_equal_lengths() {
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
    }
}
