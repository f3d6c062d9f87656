use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 over `"{order_id}|{payment_id}"`, the exact
/// payload Razorpay signs on checkout completion.
pub fn compute_signature(gateway_order_id: &str, gateway_payment_id: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(gateway_payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a client-submitted signature. A submission that is
/// not valid hex of the right length is a mismatch, not an error.
pub fn verify_signature(
    gateway_order_id: &str,
    gateway_payment_id: &str,
    submitted: &str,
    secret: &str,
) -> bool {
    let Ok(submitted) = hex::decode(submitted) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(gateway_payment_id.as_bytes());
    // verify_slice compares in constant time.
    mac.verify_slice(&submitted).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_key_secret";

    #[test]
    fn valid_signature_verifies() {
        let sig = compute_signature("order_abc", "pay_xyz", SECRET);
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(verify_signature("order_abc", "pay_xyz", &sig, SECRET));
    }

    #[test]
    fn flipped_bit_is_rejected() {
        let sig = compute_signature("order_abc", "pay_xyz", SECRET);
        let mut bytes = hex::decode(&sig).unwrap();
        bytes[0] ^= 0x01;
        let tampered = hex::encode(bytes);
        assert!(!verify_signature("order_abc", "pay_xyz", &tampered, SECRET));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let sig = compute_signature("order_abc", "pay_xyz", SECRET);
        assert!(!verify_signature("order_abc", "pay_xyz", &sig, "other_secret"));
    }

    #[test]
    fn swapped_ids_are_rejected() {
        let sig = compute_signature("order_abc", "pay_xyz", SECRET);
        assert!(!verify_signature("pay_xyz", "order_abc", &sig, SECRET));
    }

    #[test]
    fn malformed_hex_is_a_mismatch() {
        assert!(!verify_signature("order_abc", "pay_xyz", "zz-not-hex", SECRET));
        assert!(!verify_signature("order_abc", "pay_xyz", "", SECRET));
        assert!(!verify_signature("order_abc", "pay_xyz", "deadbeef", SECRET));
    }
}
