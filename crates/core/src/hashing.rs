//! SHA-256 and HMAC helpers used for webhook signature checks.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex SHA-256 digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex_encode(Sha256::digest(data))
}

/// Lowercase hex HMAC-SHA256 of `payload` under `secret`.
pub fn hmac_sha256_hex(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(payload);
    hex_encode(mac.finalize().into_bytes())
}

/// Check a hex HMAC-SHA256 `signature` of `payload` in constant time.
pub fn verify_hmac_sha256_hex(secret: &[u8], payload: &[u8], signature: &str) -> bool {
    let Some(expected) = hex_decode(signature.trim()) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| s.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hmac_signature_verifies() {
        let sig = hmac_sha256_hex(b"secret", b"{\"a\":1}");
        assert_eq!(sig.len(), 64);
        assert!(verify_hmac_sha256_hex(b"secret", b"{\"a\":1}", &sig));
        assert!(verify_hmac_sha256_hex(b"secret", b"{\"a\":1}", &sig.to_uppercase()));
    }

    #[test]
    fn tampered_payload_or_wrong_secret_fails() {
        let sig = hmac_sha256_hex(b"secret", b"payload");
        assert!(!verify_hmac_sha256_hex(b"secret", b"payload!", &sig));
        assert!(!verify_hmac_sha256_hex(b"other", b"payload", &sig));
        assert!(!verify_hmac_sha256_hex(b"secret", b"payload", "zz"));
        assert!(!verify_hmac_sha256_hex(b"secret", b"payload", "abc"));
    }
}
