//! Webhook signature checks. Digests are compared with `verify_slice`, which
//! runs in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a Stripe signature timestamp, in seconds.
pub const STRIPE_TOLERANCE_SECS: i64 = 300;

fn mac(secret: &str) -> Option<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes()).ok()
}

fn matches(mac: HmacSha256, signature_hex: &str) -> bool {
    match hex::decode(signature_hex.trim()) {
        Ok(sig) => mac.verify_slice(&sig).is_ok(),
        Err(_) => false,
    }
}

/// `x-razorpay-signature`: hex HMAC-SHA256 of the raw body.
pub fn verify_razorpay(secret: &str, body: &[u8], signature: &str) -> bool {
    let Some(mut m) = mac(secret) else {
        return false;
    };
    m.update(body);
    matches(m, signature)
}

/// `stripe-signature`: `t=<unix>,v1=<hex>[,v1=...]`, signed over `"<t>.<body>"`.
pub fn verify_stripe(secret: &str, body: &[u8], header: &str) -> bool {
    verify_stripe_at(secret, body, header, chrono::Utc::now().timestamp())
}

pub fn verify_stripe_at(secret: &str, body: &[u8], header: &str, now: i64) -> bool {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
            Some(("v1", v)) => signatures.push(v),
            _ => {}
        }
    }

    let Some(t) = timestamp else {
        return false;
    };
    if (now - t).abs() > STRIPE_TOLERANCE_SECS {
        return false;
    }

    signatures.into_iter().any(|sig| {
        let Some(mut m) = mac(secret) else {
            return false;
        };
        m.update(t.to_string().as_bytes());
        m.update(b".");
        m.update(body);
        matches(m, sig)
    })
}

#[cfg(test)]
pub(crate) fn sign_hex(secret: &str, payload: &[u8]) -> String {
    let mut m = mac(secret).unwrap();
    m.update(payload);
    hex::encode(m.finalize().into_bytes())
}
