use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AuthnError;

/// Issues and validates access tokens.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user_id: i32) -> Result<String, AuthnError>;

    /// Resolves a token back to the user id it was issued for.
    fn validate(&self, token: &str) -> Result<i32, AuthnError>;
}

/// Confirmation codes mailed at signup and exchanged for an access token.
pub trait ConfirmationCodes: Send + Sync {
    fn make_code(&self, user_id: i32, email: &str) -> Result<String, AuthnError>;

    fn check_code(&self, user_id: i32, email: &str, code: &str) -> bool;
}

#[derive(Clone, Debug)]
pub struct TokenSettings {
    pub secret: String,
    pub access_ttl_minutes: i64,
    pub confirmation_ttl_minutes: i64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Purpose {
    Access,
    Confirmation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: i32,
    purpose: Purpose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    jti: Uuid,
    exp: usize,
    iat: usize,
}

/// HS256 signer for both access tokens and confirmation codes. The
/// `purpose` claim keeps one kind from being accepted as the other.
#[derive(Clone)]
pub struct JwtIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    confirmation_ttl: Duration,
}

impl JwtIssuer {
    pub fn new(settings: &TokenSettings) -> Self {
        Self {
            encoding: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding: DecodingKey::from_secret(settings.secret.as_bytes()),
            access_ttl: Duration::minutes(settings.access_ttl_minutes),
            confirmation_ttl: Duration::minutes(settings.confirmation_ttl_minutes),
        }
    }

    fn sign(
        &self,
        user_id: i32,
        purpose: Purpose,
        email: Option<&str>,
        ttl: Duration,
    ) -> Result<String, AuthnError> {
        let now = Utc::now();
        let exp = now.checked_add_signed(ttl).unwrap_or(now).timestamp().max(0) as usize;
        let claims = Claims {
            sub: user_id,
            purpose,
            email: email.map(str::to_owned),
            jti: Uuid::new_v4(),
            exp,
            iat: now.timestamp() as usize,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|err| AuthnError::Signing(err.to_string()))
    }

    fn decode(&self, token: &str, purpose: Purpose) -> Result<Claims, AuthnError> {
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthnError::TokenExpired,
                _ => AuthnError::InvalidToken,
            })?;
        if claims.purpose != purpose {
            return Err(AuthnError::InvalidToken);
        }
        Ok(claims)
    }
}

impl TokenIssuer for JwtIssuer {
    fn issue(&self, user_id: i32) -> Result<String, AuthnError> {
        self.sign(user_id, Purpose::Access, None, self.access_ttl)
    }

    fn validate(&self, token: &str) -> Result<i32, AuthnError> {
        self.decode(token, Purpose::Access).map(|claims| claims.sub)
    }
}

impl ConfirmationCodes for JwtIssuer {
    fn make_code(&self, user_id: i32, email: &str) -> Result<String, AuthnError> {
        self.sign(
            user_id,
            Purpose::Confirmation,
            Some(email),
            self.confirmation_ttl,
        )
    }

    fn check_code(&self, user_id: i32, email: &str, code: &str) -> bool {
        match self.decode(code, Purpose::Confirmation) {
            Ok(claims) => claims.sub == user_id && claims.email.as_deref() == Some(email),
            Err(_) => false,
        }
    }
}
