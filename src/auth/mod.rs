pub mod cookies;
pub mod password;
pub mod role;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub use role::Role;

/// Claims carried by a session access token. `sid` names the server-side
/// session row, so revoking that row invalidates the token before `exp`.
/// `jti` keeps two tokens minted in the same second distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sid: Uuid,
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token secret is not configured")]
    MissingSecret,
}

/// Signs and verifies HS256 session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").field("lifetime", &self.lifetime).finish_non_exhaustive()
    }
}

/// A freshly minted token together with the claims inside it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.claims.exp, 0).unwrap_or_else(Utc::now)
    }
}

impl TokenIssuer {
    pub fn new(secret: &str, lifetime_hours: u64) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::hours(lifetime_hours as i64),
        })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue(&self, session_id: Uuid, user_id: Uuid, email: &str) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sid: session_id,
            sub: user_id,
            email: email.to_string(),
            exp: (now + self.lifetime).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok(IssuedToken { token, claims })
    }

    /// Checks signature and expiry. Whether the session is still live is the
    /// backend's business.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }
}

/// Hex SHA-256 of a token; sessions are stored by digest, never in the clear.
pub fn token_digest(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
