//! External identity extraction from a signed cookie
//!
//! The identity token is a JWT carried in a named cookie, signed with a
//! process-wide HS256 secret. Every failure mode degrades to anonymous
//! (`None`), logged, so a bad or hostile cookie can never break a request.

use cookie::Cookie;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct IdentityClaims {
    pid: String,
}

pub struct IdentityExtractor {
    cookie_name: String,
    decoding_key: Option<DecodingKey>,
    validation: Validation,
}

impl IdentityExtractor {
    /// The signing secret is an explicit constructor dependency; a missing or
    /// empty secret produces an extractor that treats every caller as
    /// anonymous instead of failing at request time.
    pub fn new(cookie_name: &str, signing_secret: Option<&str>) -> Self {
        let decoding_key = match signing_secret {
            Some(secret) if !secret.is_empty() => Some(DecodingKey::from_secret(secret.as_bytes())),
            _ => {
                warn!("No identity signing secret configured; all callers are anonymous");
                None
            }
        };
        // HS256 is the only accepted algorithm; tokens carry no expiry
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = Default::default();
        validation.validate_exp = false;
        Self {
            cookie_name: cookie_name.to_string(),
            decoding_key,
            validation,
        }
    }

    /// Extract the external identity from a raw Cookie header, or None when
    /// the header, the named cookie, or the signature does not check out.
    pub fn extract(&self, cookie_header: Option<&str>) -> Option<String> {
        let header = cookie_header?;
        let token = Cookie::split_parse(header.to_string())
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == self.cookie_name)
            .map(|cookie| cookie.value().to_string())?;
        let decoding_key = self.decoding_key.as_ref()?;
        match decode::<IdentityClaims>(&token, decoding_key, &self.validation) {
            Ok(data) if !data.claims.pid.is_empty() => Some(data.claims.pid),
            Ok(_) => None,
            Err(e) => {
                warn!("Identity token verification failed: {}", e);
                None
            }
        }
    }
}
