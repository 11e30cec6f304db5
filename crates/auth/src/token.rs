//! Signed, expiring identity tokens.
//!
//! Layout is the compact JWS form `header.payload.signature`, each segment
//! base64url without padding. The header names the signer's algorithm; the
//! payload is a [`Claims`] object with millisecond timestamps.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use gatekeeper_core::{ConfigError, MIN_SECRET_BYTES, SecurityConfig, SecurityError};

use crate::claims::{Claims, RESERVED_CLAIMS, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("invalid token signature")]
    InvalidSignature,

    /// Issuance-side problem (missing subject, unrepresentable expiry).
    #[error("invalid claims: {0}")]
    InvalidClaims(String),
}

impl From<TokenError> for SecurityError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Expired => SecurityError::ExpiredToken,
            TokenError::Malformed(msg) => SecurityError::MalformedToken(msg),
            TokenError::InvalidSignature => SecurityError::InvalidSignature,
            TokenError::InvalidClaims(msg) => SecurityError::Internal(msg),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Signing primitive
// ─────────────────────────────────────────────────────────────────────────────

/// Pluggable signing/verification primitive.
///
/// Implementations must be cheap to share across tasks; the codec holds one
/// behind an `Arc` and calls it concurrently.
pub trait TokenSigner: Send + Sync {
    /// JWS `alg` value written into and expected from token headers.
    fn algorithm(&self) -> &'static str;

    fn sign(&self, message: &[u8]) -> Vec<u8>;

    /// Constant-time signature check.
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool;
}

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 signer (`HS256`).
#[derive(Clone)]
pub struct Hs256Signer {
    mac: HmacSha256,
}

impl Hs256Signer {
    /// Key the signer. Secrets shorter than [`MIN_SECRET_BYTES`] are refused.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, ConfigError> {
        let secret = secret.as_ref();
        if secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::WeakSecret {
                min: MIN_SECRET_BYTES,
                actual: secret.len(),
            });
        }
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| ConfigError::invalid_value("jwt_secret", e.to_string()))?;
        Ok(Self { mac })
    }
}

impl core::fmt::Debug for Hs256Signer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Signer").finish_non_exhaustive()
    }
}

impl TokenSigner for Hs256Signer {
    fn algorithm(&self) -> &'static str {
        "HS256"
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let mut mac = self.mac.clone();
        mac.update(message);
        mac.verify_slice(signature).is_ok()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Codec
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct JoseHeader {
    alg: String,
}

/// Issues, verifies and refreshes tokens.
///
/// A codec can only be built from a validated configuration or an already
/// keyed signer, so issuance never runs against an unchecked secret.
#[derive(Clone)]
pub struct TokenCodec {
    signer: Arc<dyn TokenSigner>,
    ttl: Duration,
    encoded_header: String,
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.signer.algorithm())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenCodec {
    /// Validate the configuration and key an HS256 codec from it.
    pub fn from_config(config: &SecurityConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let signer = Hs256Signer::new(config.jwt_secret.as_bytes())?;
        Ok(Self::with_signer(Arc::new(signer), config.expiration()))
    }

    /// Build around a custom signer with a default lifetime for issued tokens.
    pub fn with_signer(signer: Arc<dyn TokenSigner>, ttl: std::time::Duration) -> Self {
        let header = serde_json::json!({ "alg": signer.algorithm(), "typ": "JWT" });
        let encoded_header = URL_SAFE_NO_PAD.encode(header.to_string());
        Self {
            signer,
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
            encoded_header,
        }
    }

    /// Default lifetime of issued and refreshed tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn algorithm(&self) -> &'static str {
        self.signer.algorithm()
    }

    /// Issue a token for a claim map. The map must carry a `sub` entry.
    pub fn issue(
        &self,
        claims: &BTreeMap<String, String>,
        ttl: std::time::Duration,
    ) -> Result<String, TokenError> {
        self.issue_at(claims, ttl, Utc::now())
    }

    pub fn issue_at(
        &self,
        claims: &BTreeMap<String, String>,
        ttl: std::time::Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let sub = claims
            .get("sub")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TokenError::InvalidClaims("claims must carry a subject".to_string()))?;
        let ttl = Duration::from_std(ttl)
            .map_err(|_| TokenError::InvalidClaims("ttl out of range".to_string()))?;

        let extra = claims
            .iter()
            .filter(|(k, _)| !RESERVED_CLAIMS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();

        let claims = Claims {
            sub: sub.clone(),
            iat: now,
            exp: expiry_after(now, ttl)?,
            extra,
        };
        self.encode(&claims)
    }

    /// Issue a token carrying only a subject, with the configured lifetime.
    pub fn issue_for_subject(&self, subject: &str) -> Result<String, TokenError> {
        let claims = BTreeMap::from([("sub".to_string(), subject.to_string())]);
        let ttl = self
            .ttl
            .to_std()
            .map_err(|_| TokenError::InvalidClaims("ttl out of range".to_string()))?;
        self.issue(&claims, ttl)
    }

    /// Verify signature and expiry, returning the claim set.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let claims = self.decode_verified(token)?;
        validate_claims(&claims, now)?;
        Ok(claims)
    }

    /// True when the token verifies and is not expired.
    pub fn validate(&self, token: &str) -> bool {
        self.verify(token).is_ok()
    }

    /// Re-sign the claims of a live token with a fresh expiry.
    ///
    /// The new expiry is strictly later than the old one even when refresh
    /// happens within the same millisecond as issuance.
    pub fn refresh(&self, token: &str) -> Result<String, TokenError> {
        self.refresh_at(token, Utc::now())
    }

    pub fn refresh_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let mut claims = self.verify_at(token, now)?;
        let renewed = expiry_after(now, self.ttl)?;
        let bumped = expiry_after(claims.exp, Duration::milliseconds(1))?;
        claims.exp = renewed.max(bumped);
        self.encode(&claims)
    }

    fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        let payload =
            serde_json::to_vec(claims).map_err(|e| TokenError::InvalidClaims(e.to_string()))?;
        let signing_input = format!("{}.{}", self.encoded_header, URL_SAFE_NO_PAD.encode(payload));
        let signature = self.signer.sign(signing_input.as_bytes());
        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Parse and check the signature; expiry is left to the caller.
    fn decode_verified(&self, token: &str) -> Result<Claims, TokenError> {
        if token.trim().is_empty() {
            return Err(TokenError::Malformed("token is empty".to_string()));
        }

        // Anything after the second dot belongs to the signature segment.
        let mut segments = token.splitn(3, '.');
        let (Some(header), Some(payload), Some(signature)) =
            (segments.next(), segments.next(), segments.next())
        else {
            return Err(TokenError::Malformed(
                "expected three dot-separated segments".to_string(),
            ));
        };

        let header_bytes = decode_segment(header, "header")?;
        let jose: JoseHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| TokenError::Malformed(format!("header: {e}")))?;
        if jose.alg != self.signer.algorithm() {
            return Err(TokenError::Malformed(format!(
                "unexpected algorithm '{}'",
                jose.alg
            )));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::InvalidSignature)?;
        let signing_input = &token[..header.len() + 1 + payload.len()];
        if !self.signer.verify(signing_input.as_bytes(), &signature) {
            return Err(TokenError::InvalidSignature);
        }

        let payload_bytes = decode_segment(payload, "payload")?;
        serde_json::from_slice(&payload_bytes)
            .map_err(|e| TokenError::Malformed(format!("payload: {e}")))
    }
}

fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::Malformed(format!("{name}: {e}")))
}

fn expiry_after(start: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, TokenError> {
    start
        .checked_add_signed(ttl)
        .ok_or_else(|| TokenError::InvalidClaims("expiry out of range".to_string()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use proptest::prelude::*;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn codec() -> TokenCodec {
        TokenCodec::from_config(&SecurityConfig::new(SECRET)).unwrap()
    }

    fn claims_for(sub: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("sub".to_string(), sub.to_string())])
    }

    fn t0() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    #[test]
    fn weak_secret_is_a_config_error() {
        let err = TokenCodec::from_config(&SecurityConfig::new("short")).unwrap_err();
        assert!(matches!(err, ConfigError::WeakSecret { .. }));
        assert!(Hs256Signer::new(b"also-short").is_err());
    }

    #[test]
    fn issue_then_verify_round_trips_subject_and_custom_claims() {
        let codec = codec();
        let mut claims = claims_for("alice");
        claims.insert("userid".into(), "42".into());
        claims.insert("account".into(), "alice01".into());

        let token = codec.issue_at(&claims, StdDuration::from_secs(60), t0()).unwrap();
        let verified = codec.verify_at(&token, t0()).unwrap();

        assert_eq!(verified.subject(), "alice");
        assert_eq!(verified.claim("userid").as_deref(), Some("42"));
        assert_eq!(verified.claim("account").as_deref(), Some("alice01"));
        assert_eq!(verified.exp - verified.iat, Duration::seconds(60));
    }

    #[test]
    fn custom_claims_cannot_override_reserved_ones() {
        let codec = codec();
        let mut claims = claims_for("alice");
        claims.insert("exp".into(), "99999999999999".into());

        let token = codec.issue_at(&claims, StdDuration::from_secs(1), t0()).unwrap();
        let verified = codec.verify_at(&token, t0()).unwrap();
        assert_eq!(verified.exp, t0() + Duration::seconds(1));
        assert!(!verified.extra.contains_key("exp"));
    }

    #[test]
    fn missing_subject_cannot_be_issued() {
        let err = codec()
            .issue(&BTreeMap::new(), StdDuration::from_secs(60))
            .unwrap_err();
        assert!(matches!(err, TokenError::InvalidClaims(_)));
    }

    #[test]
    fn expiry_equal_to_now_is_expired() {
        let codec = codec();
        let token = codec
            .issue_at(&claims_for("alice"), StdDuration::from_millis(500), t0())
            .unwrap();
        let exp = t0() + Duration::milliseconds(500);

        assert!(codec.verify_at(&token, exp - Duration::milliseconds(1)).is_ok());
        assert_eq!(codec.verify_at(&token, exp), Err(TokenError::Expired));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec();
        for token in ["", "   ", "abc", "a.b", "!!!.???.sig", "e30.e30.AAAA"] {
            assert!(
                matches!(codec.verify(token), Err(TokenError::Malformed(_))),
                "{token:?} should be malformed"
            );
        }
    }

    #[test]
    fn token_from_another_secret_has_invalid_signature() {
        let other = TokenCodec::from_config(&SecurityConfig::new(
            "ffffffffffffffffffffffffffffffff",
        ))
        .unwrap();
        let token = other.issue_for_subject("mallory").unwrap();
        assert_eq!(codec().verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn tampered_payload_has_invalid_signature() {
        let codec = codec();
        let token = codec.issue_for_subject("alice").unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({ "sub": "root", "iat": 0, "exp": i64::MAX / 1_000_000 })
                .to_string(),
        );
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert_eq!(codec.verify(&forged), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn unrepresentable_lifetime_is_rejected_at_startup() {
        let config = SecurityConfig::new("0123456789abcdef0123456789abcdef")
            .with_expiration(StdDuration::from_millis(10u64.pow(16)));
        assert!(matches!(
            TokenCodec::from_config(&config),
            Err(ConfigError::InvalidValue { .. })
        ));

        let longest = SecurityConfig::new("0123456789abcdef0123456789abcdef")
            .with_expiration(StdDuration::from_millis(gatekeeper_core::MAX_EXPIRATION_MS));
        let codec = TokenCodec::from_config(&longest).unwrap();
        assert!(codec.issue_for_subject("alice").is_ok());
    }

    #[test]
    fn foreign_algorithm_is_malformed() {
        let codec = codec();
        let token = codec.issue_for_subject("alice").unwrap();
        let (_, rest) = token.split_once('.').unwrap();
        let none_header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let forged = format!("{none_header}.{rest}");
        assert!(matches!(codec.verify(&forged), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn refresh_keeps_claims_and_extends_expiry() {
        let codec = codec();
        let mut claims = claims_for("alice");
        claims.insert("name".into(), "Alice".into());
        let token = codec.issue_at(&claims, StdDuration::from_secs(60), t0()).unwrap();

        let later = t0() + Duration::seconds(30);
        let refreshed = codec.refresh_at(&token, later).unwrap();
        let before = codec.verify_at(&token, later).unwrap();
        let after = codec.verify_at(&refreshed, later).unwrap();

        assert_eq!(after.sub, before.sub);
        assert_eq!(after.extra, before.extra);
        assert_eq!(after.iat, before.iat);
        assert!(after.exp > before.exp);
    }

    #[test]
    fn refresh_in_same_instant_is_still_strictly_later() {
        let codec = codec();
        let token = codec
            .issue_at(&claims_for("alice"), codec.ttl().to_std().unwrap(), t0())
            .unwrap();
        let refreshed = codec.refresh_at(&token, t0()).unwrap();
        let old = codec.verify_at(&token, t0()).unwrap();
        let new = codec.verify_at(&refreshed, t0()).unwrap();
        assert!(new.exp > old.exp);
    }

    #[test]
    fn refresh_is_not_resurrection() {
        let codec = codec();
        let token = codec
            .issue_at(&claims_for("alice"), StdDuration::from_secs(1), t0())
            .unwrap();
        let err = codec
            .refresh_at(&token, t0() + Duration::seconds(1))
            .unwrap_err();
        assert_eq!(err, TokenError::Expired);
    }

    #[test]
    fn token_errors_map_onto_taxonomy() {
        assert_eq!(SecurityError::from(TokenError::Expired), SecurityError::ExpiredToken);
        assert_eq!(
            SecurityError::from(TokenError::InvalidSignature),
            SecurityError::InvalidSignature
        );
        assert_eq!(SecurityError::from(TokenError::Malformed("x".into())).status(), 401);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: a freshly issued token verifies with its subject until the
        /// ttl has elapsed, and is expired from then on.
        #[test]
        fn issued_tokens_live_exactly_ttl(
            sub in "[a-zA-Z0-9_@.-]{1,32}",
            ttl_ms in 1u64..10_000_000u64,
            offset_ms in 0u64..20_000_000u64,
        ) {
            let codec = codec();
            let token = codec
                .issue_at(&claims_for(&sub), StdDuration::from_millis(ttl_ms), t0())
                .unwrap();
            let at = t0() + Duration::milliseconds(offset_ms as i64);

            if offset_ms < ttl_ms {
                let claims = codec.verify_at(&token, at).unwrap();
                prop_assert_eq!(claims.subject(), sub.as_str());
            } else {
                prop_assert_eq!(codec.verify_at(&token, at), Err(TokenError::Expired));
            }
        }

        /// Property: replacing any single byte of the signature segment never
        /// verifies and is always reported as a signature failure.
        #[test]
        fn signature_tampering_is_detected(
            index in any::<prop::sample::Index>(),
            replacement in prop::char::range(' ', '~'),
        ) {
            let codec = codec();
            let token = codec
                .issue_at(&claims_for("alice"), StdDuration::from_secs(3600), t0())
                .unwrap();
            let sig_start = token.rfind('.').unwrap() + 1;
            let sig_len = token.len() - sig_start;
            let pos = sig_start + index.index(sig_len);
            let original = token.as_bytes()[pos] as char;
            prop_assume!(original != replacement);

            let mut tampered = token.clone();
            tampered.replace_range(pos..pos + 1, &replacement.to_string());

            prop_assert_eq!(codec.verify_at(&tampered, t0()), Err(TokenError::InvalidSignature));
        }
    }
}
