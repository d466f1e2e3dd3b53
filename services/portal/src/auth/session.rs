//! Portal session tokens.
//!
//! # Purpose
//! Mint and verify the bearer tokens handed out by `POST /v1/auth/login`.
//!
//! # Key invariants
//! - Tokens are always EdDSA (Ed25519); no other algorithm is accepted.
//! - `iss` is `tessera-portal` and `aud` is `tessera-session`; both are checked.
//! - `sub` carries the user id only. Roles are not embedded: the identity
//!   provider reloads them from the store on every request, so role changes
//!   apply immediately.
//!
//! # Concurrency model
//! [`SessionIssuer`] precomputes its encoding and decoding keys once and is
//! shared read-only behind an `Arc`.
//!
//! # Security model and threat assumptions
//! - Attackers may present arbitrary JWTs; signature, issuer, audience and
//!   expiry are validated before the subject is trusted.
//! - The signing seed stays in process memory and is never logged.
use crate::auth::keys::SessionKeys;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use ed25519_dalek::pkcs8::EncodePrivateKey;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tessera_authz::UserId;
use thiserror::Error;

pub const SESSION_ISSUER: &str = "tessera-portal";
pub const SESSION_AUDIENCE: &str = "tessera-session";

/// Clock skew tolerated when checking `exp`.
const VERIFY_LEEWAY_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn user_id(&self) -> Result<UserId, TokenError> {
        self.sub
            .parse()
            .map_err(|_| TokenError::Subject(self.sub.clone()))
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("key error: {0}")]
    Key(String),
    #[error("token subject is not a user id: {0}")]
    Subject(String),
}

/// A freshly minted session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionIssuer {
    kid: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("kid", &self.kid)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionIssuer {
    /// Build an issuer from raw key material.
    ///
    /// # Errors
    /// - `TokenError::Key` if the seed cannot be encoded as PKCS8 DER or the
    ///   public key is rejected by `jsonwebtoken`.
    pub fn new(keys: &SessionKeys, ttl: Duration) -> Result<Self, TokenError> {
        // jsonwebtoken wants PKCS8 DER for EdDSA signing and the base64url `x`
        // component for verification.
        let der = Ed25519SigningKey::from_bytes(&keys.private_key)
            .to_pkcs8_der()
            .map_err(|err| TokenError::Key(format!("encode Ed25519 key: {err}")))?;
        let encoding = EncodingKey::from_ed_der(der.as_bytes());
        let decoding = DecodingKey::from_ed_components(&URL_SAFE_NO_PAD.encode(keys.public_key))
            .map_err(|err| TokenError::Key(format!("decode Ed25519 public key: {err}")))?;

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_audience(&[SESSION_AUDIENCE]);
        validation.set_issuer(&[SESSION_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = VERIFY_LEEWAY_SECS;

        Ok(Self {
            kid: keys.kid.clone(),
            encoding,
            decoding,
            validation,
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn mint(&self, user_id: &UserId) -> Result<IssuedSession, TokenError> {
        let now = now_epoch_seconds();
        let exp = now.saturating_add(i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX));
        let claims = SessionClaims {
            iss: SESSION_ISSUER.to_string(),
            aud: SESSION_AUDIENCE.to_string(),
            sub: user_id.to_string(),
            iat: now,
            exp,
        };
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(self.kid.clone());
        let token = jsonwebtoken::encode(&header, &claims, &self.encoding)?;
        let expires_at = Utc
            .timestamp_opt(exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Ok(IssuedSession { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let decoded = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation)?;
        Ok(decoded.claims)
    }
}

fn now_epoch_seconds() -> i64 {
    // A clock before the epoch clamps to zero rather than failing.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;

    fn issuer(seed: u8) -> SessionIssuer {
        SessionIssuer::new(&SessionKeys::from_seed([seed; 32]), Duration::from_secs(600))
            .expect("issuer")
    }

    #[test]
    fn minted_token_verifies_and_names_the_user() {
        let issuer = issuer(5);
        let user = UserId::new();
        let session = issuer.mint(&user).expect("mint");
        let claims = issuer.verify(&session.token).expect("verify");
        assert_eq!(claims.iss, SESSION_ISSUER);
        assert_eq!(claims.aud, SESSION_AUDIENCE);
        assert_eq!(claims.user_id().expect("sub"), user);
        assert!(session.expires_at > Utc::now());
    }

    #[test]
    fn header_carries_eddsa_and_kid() {
        let keys = SessionKeys::from_seed([5u8; 32]);
        let issuer = SessionIssuer::new(&keys, Duration::from_secs(60)).expect("issuer");
        let token = issuer.mint(&UserId::new()).expect("mint").token;
        let header = jsonwebtoken::decode_header(&token).expect("header");
        assert_eq!(header.alg, Algorithm::EdDSA);
        assert_eq!(header.kid.as_deref(), Some(keys.kid.as_str()));
    }

    #[test]
    fn token_from_another_key_is_rejected() {
        let token = issuer(1).mint(&UserId::new()).expect("mint").token;
        let err = issuer(2).verify(&token).expect_err("foreign key");
        assert!(matches!(
            err,
            TokenError::Jwt(ref jwt) if matches!(jwt.kind(), ErrorKind::InvalidSignature)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = SessionKeys::from_seed([4u8; 32]);
        let issuer = SessionIssuer::new(&keys, Duration::from_secs(60)).expect("issuer");
        let now = now_epoch_seconds();
        let claims = SessionClaims {
            iss: SESSION_ISSUER.to_string(),
            aud: SESSION_AUDIENCE.to_string(),
            sub: UserId::new().to_string(),
            iat: now - 7_200,
            exp: now - 3_600,
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), &claims, &issuer.encoding)
            .expect("encode");
        let err = issuer.verify(&token).expect_err("expired");
        assert!(matches!(
            err,
            TokenError::Jwt(ref jwt) if matches!(jwt.kind(), ErrorKind::ExpiredSignature)
        ));
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let issuer = issuer(6);
        let now = now_epoch_seconds();
        let claims = SessionClaims {
            iss: SESSION_ISSUER.to_string(),
            aud: "someone-else".to_string(),
            sub: UserId::new().to_string(),
            iat: now,
            exp: now + 600,
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), &claims, &issuer.encoding)
            .expect("encode");
        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(issuer(3).verify("not.a.jwt").is_err());
    }

    #[test]
    fn non_uuid_subject_is_reported() {
        let claims = SessionClaims {
            iss: SESSION_ISSUER.to_string(),
            aud: SESSION_AUDIENCE.to_string(),
            sub: "alice".to_string(),
            iat: 0,
            exp: 0,
        };
        assert!(matches!(claims.user_id(), Err(TokenError::Subject(_))));
    }
}
