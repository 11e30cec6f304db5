//! Tokens are standard HS256 JWS: a stock JWT library accepts our signature
//! and sees the same claims.

use std::collections::BTreeMap;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use gatekeeper_auth::TokenCodec;
use gatekeeper_core::SecurityConfig;

const SECRET: &str = "interop-secret-interop-secret-0001";

#[test]
fn jsonwebtoken_accepts_our_signature() {
    let codec = TokenCodec::from_config(&SecurityConfig::new(SECRET)).unwrap();
    let claims = BTreeMap::from([
        ("sub".to_string(), "alice".to_string()),
        ("account".to_string(), "acme".to_string()),
    ]);
    let token = codec.issue(&claims, Duration::from_secs(600)).unwrap();

    // Our timestamps are epoch milliseconds, so the library's seconds-based
    // expiry check does not apply.
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let decoded = jsonwebtoken::decode::<serde_json::Value>(
        &token,
        &DecodingKey::from_secret(SECRET.as_bytes()),
        &validation,
    )
    .unwrap();

    assert_eq!(decoded.header.alg, Algorithm::HS256);
    assert_eq!(decoded.claims["sub"], "alice");
    assert_eq!(decoded.claims["account"], "acme");
    assert!(decoded.claims["exp"].as_i64().unwrap() > decoded.claims["iat"].as_i64().unwrap());
}

#[test]
fn jsonwebtoken_rejects_with_other_secret() {
    let codec = TokenCodec::from_config(&SecurityConfig::new(SECRET)).unwrap();
    let token = codec.issue_for_subject("alice").unwrap();

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let result = jsonwebtoken::decode::<serde_json::Value>(
        &token,
        &DecodingKey::from_secret(b"some-other-secret-some-other-secret"),
        &validation,
    );
    assert!(result.is_err());
}
