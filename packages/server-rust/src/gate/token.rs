//! Bearer token extraction and claim decoding.
//!
//! The extractor runs in one of two modes:
//!
//! - [`TokenVerification::Unverified`] base64url-decodes the JWT payload without
//!   looking at the signature, the `alg` header or expiry, so `alg: none` and
//!   algorithms unknown to `jsonwebtoken` are accepted. Any caller able to mint a
//!   well-formed token can claim any realm. Constructing an extractor in this
//!   mode logs a warning.
//! - [`TokenVerification::Verified`] checks the signature against a configured
//!   key (and optionally the issuer) and enforces `exp`.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use gatekeeper_core::TokenClaims;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::error::GateError;

/// Literal scheme prefix; case-sensitive, single space.
const BEARER_PREFIX: &str = "Bearer ";

/// base64url as used in JWT segments; trailing `=` tolerated.
const SEGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Signature verification policy for inbound tokens.
#[derive(Clone)]
pub enum TokenVerification {
    /// Decode claims without checking authenticity.
    Unverified,
    /// Verify signature (and `exp`) before trusting any claim.
    Verified {
        key: DecodingKey,
        algorithm: Algorithm,
        issuer: Option<String>,
    },
}

impl TokenVerification {
    /// HS256 verification with a shared secret.
    #[must_use]
    pub fn hs256(secret: &[u8], issuer: Option<String>) -> Self {
        Self::Verified {
            key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            issuer,
        }
    }

    /// RS256 verification with a PEM-encoded public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM cannot be parsed as an RSA public key.
    pub fn rs256_pem(
        public_key_pem: &[u8],
        issuer: Option<String>,
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self::Verified {
            key: DecodingKey::from_rsa_pem(public_key_pem)?,
            algorithm: Algorithm::RS256,
            issuer,
        })
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }
}

#[derive(Clone)]
enum Decoder {
    Unverified,
    Verified {
        key: DecodingKey,
        validation: Validation,
    },
}

/// Pulls the bearer credential from a request and decodes its claims.
#[derive(Clone)]
pub struct TokenExtractor {
    decoder: Decoder,
}

impl TokenExtractor {
    #[must_use]
    pub fn new(verification: TokenVerification) -> Self {
        match verification {
            TokenVerification::Unverified => {
                warn!("token signatures are NOT verified; realm claims are trusted as presented");
                Self {
                    decoder: Decoder::Unverified,
                }
            }
            TokenVerification::Verified {
                key,
                algorithm,
                issuer,
            } => {
                let mut validation = Validation::new(algorithm);
                validation.validate_aud = false;
                if let Some(issuer) = issuer {
                    validation.set_issuer(&[issuer]);
                }
                Self {
                    decoder: Decoder::Verified { key, validation },
                }
            }
        }
    }

    /// Extracts claims from the request's `Authorization` header.
    ///
    /// # Errors
    ///
    /// - [`GateError::MissingToken`] when the header is absent or not `Bearer `.
    /// - [`GateError::MalformedToken`] when the credential fails to decode.
    /// - [`GateError::MissingRealm`] when `realm` is absent or empty.
    pub fn extract(&self, headers: &HeaderMap) -> Result<TokenClaims, GateError> {
        let result = bearer_credential(headers).and_then(|token| self.decode(token));

        match &result {
            Ok(claims) => debug!(realm = %claims.realm, "token realm extracted"),
            Err(e) => warn!(error = %e, "token rejected"),
        }

        result
    }

    /// Decodes a raw credential into claims.
    ///
    /// # Errors
    ///
    /// See [`TokenExtractor::extract`].
    pub fn decode(&self, token: &str) -> Result<TokenClaims, GateError> {
        let payload = match &self.decoder {
            Decoder::Unverified => decode_unverified(token).map_err(GateError::MalformedToken)?,
            Decoder::Verified { key, validation } => {
                decode::<Map<String, Value>>(token, key, validation)
                    .map_err(|e| GateError::MalformedToken(e.to_string()))?
                    .claims
            }
        };

        TokenClaims::from_payload(payload).ok_or(GateError::MissingRealm)
    }
}

/// Splits `header.payload.signature` and returns the payload object.
///
/// The header must still be a JSON object; the signature segment may be empty.
fn decode_unverified(token: &str) -> Result<Map<String, Value>, String> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err("expected three dot-separated segments".to_string());
    };

    decode_segment(header).map_err(|e| format!("header: {e}"))?;
    decode_segment(payload).map_err(|e| format!("payload: {e}"))
}

fn decode_segment(segment: &str) -> Result<Map<String, Value>, String> {
    let bytes = SEGMENT_ENGINE.decode(segment).map_err(|e| e.to_string())?;
    serde_json::from_slice(&bytes).map_err(|e| e.to_string())
}

fn bearer_credential(headers: &HeaderMap) -> Result<&str, GateError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .ok_or(GateError::MissingToken)
}
