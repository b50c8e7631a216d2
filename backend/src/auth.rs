//! Roles, scopes and signed bearer tokens.
//!
//! A token is `{user_id}.{role}.{expires_at}.{signature}` where the
//! signature is the hex HMAC-SHA256 of the first three parts under the
//! server secret. Tokens are issued by the internal `/internal/token`
//! endpoint and checked on every request that carries an `Authorization`
//! header.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::models::{unix_now, UserId};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    User,
    Pertandingan,
    Administrator,
    Dashboard,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::Pertandingan => "pertandingan",
            Scope::Administrator => "administrator",
            Scope::Dashboard => "dashboard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Administrator,
}

impl Role {
    /// Scopes granted to the role.
    pub fn scopes(&self) -> &'static [Scope] {
        match self {
            Role::User => &[Scope::User, Scope::Pertandingan],
            Role::Administrator => &[
                Scope::Administrator,
                Scope::Dashboard,
                Scope::User,
                Scope::Pertandingan,
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Administrator => "administrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "administrator" => Ok(Role::Administrator),
            other => Err(TokenError::UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("bad token signature")]
    BadSignature,
    #[error("token expired at {0}")]
    Expired(i64),
    #[error("unknown role '{0}'")]
    UnknownRole(String),
    #[error("signing key rejected: {0}")]
    InvalidKey(String),
}

/// The authenticated caller carried by a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub user_id: UserId,
    pub role: Role,
    pub expires_at: i64,
}

impl Claims {
    pub fn has_scope(&self, scope: Scope) -> bool {
        self.role.scopes().contains(&scope)
    }
}

/// Issues and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha256,
    ttl_secs: i64,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>, ttl_secs: i64) -> Result<Self, TokenError> {
        let mac = HmacSha256::new_from_slice(secret.as_ref())
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?;
        Ok(Self { mac, ttl_secs })
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn issue(&self, user_id: UserId, role: Role) -> (String, Claims) {
        self.issue_at(user_id, role, unix_now())
    }

    pub fn issue_at(&self, user_id: UserId, role: Role, now: i64) -> (String, Claims) {
        let claims = Claims {
            user_id,
            role,
            expires_at: now.saturating_add(self.ttl_secs),
        };
        let payload = format!("{}.{}.{}", claims.user_id, claims.role, claims.expires_at);
        let signature = hex::encode(self.keyed(payload.as_bytes()).finalize().into_bytes());
        (format!("{}.{}", payload, signature), claims)
    }

    /// The keyed MAC with `payload` already fed in.
    fn keyed(&self, payload: &[u8]) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, unix_now())
    }

    /// Check signature first, then expiry, then decode the claims.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let (payload, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| TokenError::BadSignature)?;
        self.keyed(payload.as_bytes())
            .verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let mut parts = payload.split('.');
        let (Some(user_id), Some(role), Some(expires_at), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let user_id: UserId = user_id.parse().map_err(|_| TokenError::Malformed)?;
        let role: Role = role.parse()?;
        let expires_at: i64 = expires_at.parse().map_err(|_| TokenError::Malformed)?;
        if expires_at <= now {
            return Err(TokenError::Expired(expires_at));
        }

        Ok(Claims {
            user_id,
            role,
            expires_at,
        })
    }
}

/// Equality that does not short-circuit on the first differing byte.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_hmac_sha256_of_payload() {
        let signer = TokenSigner::new("secret", 60).unwrap();
        let (token, _) = signer.issue_at(UserId(5), Role::User, 1_000);
        let (payload, signature) = token.rsplit_once('.').unwrap();
        assert_eq!(payload, "5.user.1060");

        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(payload.as_bytes());
        assert_eq!(signature, hex::encode(mac.finalize().into_bytes()));
    }

    #[test]
    fn test_long_and_empty_secrets_are_accepted() {
        let long = "k".repeat(200);
        let signer = TokenSigner::new(&long, 60).unwrap();
        let (token, _) = signer.issue_at(UserId(1), Role::Administrator, 0);
        assert!(signer.verify_at(&token, 1).is_ok());

        assert!(TokenSigner::new("", 60).is_ok());
    }

    #[test]
    fn test_truncated_signature_is_rejected() {
        let signer = TokenSigner::new("secret", 60).unwrap();
        let (token, _) = signer.issue_at(UserId(5), Role::User, 1_000);
        let truncated = &token[..token.len() - 2];
        assert_eq!(signer.verify_at(truncated, 1_001), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_issue_then_verify() {
        let signer = TokenSigner::new("secret", 60).unwrap();
        let (token, claims) = signer.issue_at(UserId(5), Role::User, 1_000);
        assert_eq!(claims.expires_at, 1_060);

        let verified = signer.verify_at(&token, 1_030).unwrap();
        assert_eq!(verified, claims);
        assert!(verified.has_scope(Scope::User));
        assert!(!verified.has_scope(Scope::Dashboard));
    }

    #[test]
    fn test_expired_token() {
        let signer = TokenSigner::new("secret", 60).unwrap();
        let (token, _) = signer.issue_at(UserId(5), Role::User, 1_000);
        assert_eq!(signer.verify_at(&token, 1_060), Err(TokenError::Expired(1_060)));
    }

    #[test]
    fn test_tampered_token_fails_signature() {
        let signer = TokenSigner::new("secret", 60).unwrap();
        let (token, _) = signer.issue_at(UserId(5), Role::User, 1_000);
        let forged = token.replacen("5.user", "5.administrator", 1);
        assert_eq!(signer.verify_at(&forged, 1_001), Err(TokenError::BadSignature));

        let other = TokenSigner::new("other-secret", 60).unwrap();
        assert_eq!(other.verify_at(&token, 1_001), Err(TokenError::BadSignature));
        assert_eq!(signer.verify_at("garbage", 1_001), Err(TokenError::Malformed));
    }

    #[test]
    fn test_administrator_scopes() {
        let scopes = Role::Administrator.scopes();
        assert!(scopes.contains(&Scope::Dashboard));
        assert!(scopes.contains(&Scope::User));
        assert_eq!(Role::User.scopes(), &[Scope::User, Scope::Pertandingan]);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
