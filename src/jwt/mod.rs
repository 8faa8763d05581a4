//! Bearer token verification.
//!
//! Stands in for the upstream credential-validation layer: checks
//! signature, expiry, issuer, and audience, then hands the claims over as a
//! flat [`RawClaims`] map. Nothing here interprets the claims.

use crate::config::JwtConfig;
use crate::context::RawClaims;
use crate::error::Result;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

/// HS256 token verifier
#[derive(Clone)]
pub struct JwtVerifier {
    config: JwtConfig,
    decoding_key: DecodingKey,
}

impl JwtVerifier {
    pub fn new(config: JwtConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            decoding_key,
        }
    }

    fn validation(&self) -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        v.leeway = self.config.leeway_secs;
        v.set_issuer(&[&self.config.issuer]);
        match &self.config.audience {
            Some(aud) => v.set_audience(&[aud]),
            None => v.validate_aud = false,
        }
        v
    }

    /// Verify a token and flatten its claims
    pub fn verify(&self, token: &str) -> Result<RawClaims> {
        let token_data = decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation())?;
        Ok(RawClaims::from_json(&token_data.claims))
    }
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .finish()
    }
}
