//! Provider authentication tokens (ES256 JWTs).
//!
//! APNs only accepts ES256 for token auth. The key ID travels in the JWS
//! header, the team ID is the issuer, and the token is valid for a fixed
//! window starting at `iat`.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use p256::pkcs8::DecodePrivateKey;
use serde::{Deserialize, Serialize};

use crate::auth::{load_private_key, EcdsaPrivateKey};
use crate::{ApnsError, Result};

/// Default token lifetime: 60 minutes.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Claims carried by a provider token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// Issuer (team ID).
    pub iss: String,
    /// Issued at (Unix timestamp, seconds).
    pub iat: i64,
    /// Expiration (Unix timestamp, seconds).
    pub exp: i64,
}

impl TokenClaims {
    /// Decode the claims segment of a compact token without verifying it.
    pub fn from_token(token: &str) -> Result<Self> {
        let mut parts = token.split('.');
        let claims = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(claims), Some(_), None) => claims,
            _ => {
                return Err(ApnsError::Decode(
                    "token is not a three-part compact JWS".to_string(),
                ))
            }
        };

        let json = URL_SAFE_NO_PAD
            .decode(claims)
            .map_err(|e| ApnsError::Decode(format!("invalid token claims encoding: {}", e)))?;

        serde_json::from_slice(&json)
            .map_err(|e| ApnsError::Decode(format!("invalid token claims: {}", e)))
    }
}

/// A signed, time-bounded bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    token: String,
    key_id: String,
    claims: TokenClaims,
}

impl AuthToken {
    /// The compact token string (`header.claims.signature`).
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// Key ID from the token header.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Team ID the token was issued for.
    pub fn team_id(&self) -> &str {
        &self.claims.iss
    }

    /// Issued-at timestamp (seconds).
    pub fn issued_at(&self) -> i64 {
        self.claims.iat
    }

    /// Expiry timestamp (seconds).
    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }

    /// The signed claims.
    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// Whether the token is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.claims.exp
    }

    /// Value for the `Authorization` header.
    pub fn bearer_value(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Consume the token and return the compact string.
    pub fn into_string(self) -> String {
        self.token
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("key_id", &self.key_id)
            .field("claims", &self.claims)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

/// Sign a provider token with `key`.
///
/// `expires_after` must be at least one second so that `exp > iat`.
pub fn generate_token(
    key: &EcdsaPrivateKey,
    key_id: &str,
    team_id: &str,
    issued_at: DateTime<Utc>,
    expires_after: Duration,
) -> Result<AuthToken> {
    let lifetime = i64::try_from(expires_after.as_secs())
        .map_err(|_| ApnsError::Signing("token lifetime is too large".to_string()))?;
    if lifetime < 1 {
        return Err(ApnsError::Signing(
            "token lifetime must be at least one second".to_string(),
        ));
    }

    if !key.is_p256() {
        return Err(ApnsError::Signing(
            "ES256 requires a key on the P-256 curve".to_string(),
        ));
    }
    p256::SecretKey::from_pkcs8_der(key.pkcs8_der())
        .map_err(|e| ApnsError::Signing(format!("invalid P-256 private key: {}", e)))?;

    let iat = issued_at.timestamp();
    let exp = iat
        .checked_add(lifetime)
        .ok_or_else(|| ApnsError::Signing("token expiry overflows".to_string()))?;

    let claims = TokenClaims {
        iss: team_id.to_string(),
        iat,
        exp,
    };

    let mut header = Header::new(Algorithm::ES256);
    header.kid = Some(key_id.to_string());

    let encoding_key = EncodingKey::from_ec_der(key.pkcs8_der());
    let token = encode(&header, &claims, &encoding_key)
        .map_err(|e| ApnsError::Signing(format!("JWT encoding failed: {}", e)))?;

    tracing::debug!(key_id = %key_id, team_id = %team_id, iat, exp, "Signed provider token");

    Ok(AuthToken {
        token,
        key_id: key_id.to_string(),
        claims,
    })
}

/// Load a PEM private key and sign a provider token with it.
pub fn generate_token_from_pem(
    pem: &[u8],
    key_id: &str,
    team_id: &str,
    issued_at: DateTime<Utc>,
    expires_after: Duration,
) -> Result<AuthToken> {
    let key = load_private_key(pem)?;
    generate_token(&key, key_id, team_id, issued_at, expires_after)
}
