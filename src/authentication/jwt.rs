use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::config::AuthConfig;
use crate::error::ServiceError;
use crate::schema::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Claims issued by the identity provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub sub: Uuid,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub realm_access: RealmAccess,
    #[serde(default)]
    pub iss: Option<String>,
    pub exp: i64,
}

/// Verified identity of the caller.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Uuid,
    pub username: Option<String>,
    pub roles: Vec<String>,
}

impl SessionData {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            username: None,
            roles: vec![],
        }
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(claims: JwtSessionData) -> Self {
        SessionData {
            user_id: claims.sub,
            username: claims.preferred_username,
            roles: claims.realm_access.roles,
        }
    }
}

fn invalid(reason: &str) -> ServiceError {
    ServiceError::Unauthorized(format!("Invalid session; {reason}"))
}

pub fn verify_jwt_session(token: &str, config: &AuthConfig) -> Result<SessionData, ServiceError> {
    let key: Hmac<Sha256> = Hmac::new_from_slice(config.secret.as_bytes())
        .map_err(|_| invalid("Signing key unusable"))?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| invalid("Invalid token"))?;

    let now = Utc::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(invalid("Token expired"));
    }

    if let Some(issuer) = &config.issuer {
        if session.iss.as_deref() != Some(issuer.as_str()) {
            return Err(invalid("Unexpected issuer"));
        }
    }

    Ok(session.into())
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Result<&str, ServiceError> {
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or_else(|| invalid("Malformed authorization header"))?;

    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(invalid("Malformed authorization header"));
    }
    Ok(token.trim())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use jwt::SignWithKey;

    use super::*;

    fn sign(claims: &JwtSessionData, secret: &str) -> String {
        let key: Hmac<Sha256> = Hmac::new_from_slice(secret.as_bytes()).unwrap();
        claims.sign_with_key(&key).unwrap()
    }

    fn claims(user_id: Uuid, lifetime: Duration) -> JwtSessionData {
        JwtSessionData {
            sub: user_id,
            preferred_username: Some("julian".to_owned()),
            realm_access: RealmAccess {
                roles: vec!["cook".to_owned()],
            },
            iss: Some("https://accounts.recivault.com/realms/recivault".to_owned()),
            exp: (Utc::now() + lifetime).timestamp(),
        }
    }

    fn config(issuer: Option<&str>) -> AuthConfig {
        AuthConfig {
            secret: "secret".to_owned(),
            issuer: issuer.map(str::to_owned),
        }
    }

    #[test]
    fn valid_token_yields_session() {
        let user_id = Uuid::new_v4();
        let token = sign(&claims(user_id, Duration::hours(1)), "secret");

        let session = verify_jwt_session(&token, &config(None)).unwrap();
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.username.as_deref(), Some("julian"));
        assert_eq!(session.roles, vec!["cook".to_owned()]);
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = sign(&claims(Uuid::new_v4(), Duration::hours(-1)), "secret");
        assert!(matches!(
            verify_jwt_session(&token, &config(None)),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let token = sign(&claims(Uuid::new_v4(), Duration::hours(1)), "other");
        assert!(verify_jwt_session(&token, &config(None)).is_err());
    }

    #[test]
    fn issuer_is_checked_when_configured() {
        let token = sign(&claims(Uuid::new_v4(), Duration::hours(1)), "secret");
        assert!(verify_jwt_session(
            &token,
            &config(Some("https://accounts.recivault.com/realms/recivault"))
        )
        .is_ok());
        assert!(verify_jwt_session(&token, &config(Some("https://elsewhere"))).is_err());
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token("Bearer abc.def").unwrap(), "abc.def");
        assert_eq!(bearer_token("bearer  abc ").unwrap(), "abc");
        assert!(bearer_token("Basic abc").is_err());
        assert!(bearer_token("Bearer").is_err());
    }
}
