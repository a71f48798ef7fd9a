use {
    axum::http::HeaderMap,
    hmac::{Hmac, Mac},
    sha2::Sha256,
    std::collections::HashMap,
};

type HmacSha256 = Hmac<Sha256>;

/// Header locations a gateway signature may arrive under, in priority
/// order. The bank's own header wins; `Authorization` is checked with its
/// scheme prefix stripped; a query parameter is the last resort for manual
/// tooling that can't set headers.
const SIGNATURE_HEADERS: &[&str] = &["x-sepay-signature", "signature", "authorization", "x-api-key"];

const SIGNATURE_QUERY_KEYS: &[&str] = &["signature", "sig"];

fn strip_scheme(value: &str) -> &str {
    let v = value.trim();
    for scheme in ["Apikey ", "apikey ", "Bearer ", "bearer "] {
        if let Some(rest) = v.strip_prefix(scheme) {
            return rest.trim();
        }
    }
    v
}

pub fn resolve_signature(headers: &HeaderMap, query: &HashMap<String, String>) -> Option<String> {
    for name in SIGNATURE_HEADERS {
        if let Some(value) = headers.get(*name).and_then(|v| v.to_str().ok()) {
            let value = strip_scheme(value);
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    for key in SIGNATURE_QUERY_KEYS {
        if let Some(value) = query.get(*key) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Recompute the HMAC-SHA256 of the exact raw request bytes and compare
/// against the hex-encoded signature. `Mac::verify_slice` compares in
/// constant time.
pub fn verify_signature(raw_body: &[u8], signature: &str, secret: &str) -> bool {
    let Ok(sig_bytes) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(raw_body);
    mac.verify_slice(&sig_bytes).is_ok()
}

/// Constant-time string comparison for the pre-shared key.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn is_valid_api_key(headers: &HeaderMap, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    let presented = headers
        .get("x-api-key")
        .or_else(|| headers.get("authorization"))
        .and_then(|v| v.to_str().ok())
        .map(strip_scheme);
    match presented {
        Some(key) => constant_time_eq(key, expected),
        None => false,
    }
}

/// Dual-auth policy: automated delivery signs the body, manual tooling uses
/// the pre-shared key. Either one admits the request.
pub fn is_authentic(
    raw_body: &[u8],
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    secret: &str,
    api_key: &str,
) -> bool {
    if let Some(signature) = resolve_signature(headers, query) {
        if verify_signature(raw_body, &signature, secret) {
            return true;
        }
    }
    is_valid_api_key(headers, api_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(body: &[u8], secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.insert(
                axum::http::HeaderName::try_from(*k).unwrap(),
                v.parse().unwrap(),
            );
        }
        h
    }

    #[test]
    fn valid_signature_passes() {
        let body = br#"{"transferAmount":1000}"#;
        let sig = sign(body, "s3cret");
        assert!(verify_signature(body, &sig, "s3cret"));
    }

    #[test]
    fn tampered_body_fails() {
        let sig = sign(b"original", "s3cret");
        assert!(!verify_signature(b"tampered", &sig, "s3cret"));
    }

    #[test]
    fn wrong_secret_and_garbage_hex_fail() {
        let body = b"payload";
        let sig = sign(body, "s3cret");
        assert!(!verify_signature(body, &sig, "other"));
        assert!(!verify_signature(body, "not-hex!!", "s3cret"));
        assert!(!verify_signature(body, "", "s3cret"));
    }

    #[test]
    fn resolve_priority_prefers_gateway_header() {
        let h = headers(&[
            ("x-sepay-signature", "aaa"),
            ("signature", "bbb"),
            ("authorization", "Apikey ccc"),
        ]);
        assert_eq!(
            resolve_signature(&h, &HashMap::new()).as_deref(),
            Some("aaa")
        );
    }

    #[test]
    fn resolve_strips_authorization_scheme() {
        let h = headers(&[("authorization", "Bearer deadbeef")]);
        assert_eq!(
            resolve_signature(&h, &HashMap::new()).as_deref(),
            Some("deadbeef")
        );
    }

    #[test]
    fn resolve_falls_back_to_query() {
        let h = HeaderMap::new();
        let mut q = HashMap::new();
        q.insert("signature".to_string(), "cafe".to_string());
        assert_eq!(resolve_signature(&h, &q).as_deref(), Some("cafe"));
        assert!(resolve_signature(&h, &HashMap::new()).is_none());
    }

    #[test]
    fn api_key_accepts_exact_match_only() {
        let h = headers(&[("x-api-key", "op-key-1")]);
        assert!(is_valid_api_key(&h, "op-key-1"));
        assert!(!is_valid_api_key(&h, "op-key-2"));
        assert!(!is_valid_api_key(&h, ""));
        assert!(!is_valid_api_key(&HeaderMap::new(), "op-key-1"));
    }

    #[test]
    fn either_signature_or_api_key_admits() {
        let body = b"body";
        let secret = "s3cret";
        let sig = sign(body, secret);
        let q = HashMap::new();

        let signed = headers(&[("x-sepay-signature", sig.as_str())]);
        assert!(is_authentic(body, &signed, &q, secret, "op-key"));

        let keyed = headers(&[("x-api-key", "op-key")]);
        assert!(is_authentic(body, &keyed, &q, secret, "op-key"));

        let neither = headers(&[("x-api-key", "wrong")]);
        assert!(!is_authentic(body, &neither, &q, secret, "op-key"));
    }
}
