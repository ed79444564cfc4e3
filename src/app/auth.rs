use anyhow::{anyhow, Result};
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use uuid::Uuid;

use crate::domain::user::Role;

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub role: Role,
}

/// Verifies access tokens minted by the identity service.
///
/// Tokens are PASETO v4.local with `sub` (user id), `role` and `typ=access`
/// claims, issued and audienced to the configured issuer.
#[derive(Clone)]
pub struct TokenService {
    access_key: [u8; 32],
    issuer: String,
}

impl TokenService {
    pub fn new(access_key: [u8; 32], issuer: impl Into<String>) -> Self {
        Self {
            access_key,
            issuer: issuer.into(),
        }
    }

    /// Returns `None` for any token that fails to decrypt or validate.
    pub fn authenticate_access_token(&self, token: &str) -> Result<Option<AuthSession>> {
        let claims = match self.decrypt_claims(token)? {
            Some(claims) => claims,
            None => return Ok(None),
        };
        if !has_token_type(&claims, "access") {
            return Ok(None);
        }
        let user_id = match claim_uuid(&claims, "sub") {
            Ok(user_id) => user_id,
            Err(_) => return Ok(None),
        };
        let role = match claims
            .get_claim("role")
            .and_then(|value| value.as_str())
            .and_then(Role::from_db)
        {
            Some(role) => role,
            None => return Ok(None),
        };
        Ok(Some(AuthSession { user_id, role }))
    }

    /// Mints an access token. Used by local tooling and tests; production
    /// tokens come from the identity service with the same key.
    pub fn issue_access_token(
        &self,
        user_id: Uuid,
        role: Role,
        ttl: std::time::Duration,
    ) -> Result<String> {
        let mut claims = Claims::new_expires_in(&ttl)?;
        claims.issuer(&self.issuer)?;
        claims.audience(&self.issuer)?;
        claims.subject(&user_id.to_string())?;
        claims.add_additional("typ", "access")?;
        claims.add_additional("role", role.as_db())?;

        let key = SymmetricKey::<V4>::from(&self.access_key)?;
        Ok(local::encrypt(&key, &claims, None, None)?)
    }

    fn decrypt_claims(&self, token: &str) -> Result<Option<Claims>> {
        let key = SymmetricKey::<V4>::from(&self.access_key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(&self.issuer);
        rules.validate_audience_with(&self.issuer);

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        Ok(trusted.payload_claims().cloned())
    }
}

fn claim_uuid(claims: &Claims, name: &str) -> Result<Uuid> {
    let value = claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow!("missing {} claim", name))?;
    Ok(Uuid::parse_str(value)?)
}

fn has_token_type(claims: &Claims, expected: &str) -> bool {
    claims
        .get_claim("typ")
        .and_then(|value| value.as_str())
        .map(|value| value == expected)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const KEY: [u8; 32] = *b"0123456789abcdef0123456789abcdef";

    #[test]
    fn issued_token_authenticates_with_role() {
        let tokens = TokenService::new(KEY, "penpal");
        let user_id = Uuid::new_v4();
        let token = tokens
            .issue_access_token(user_id, Role::Prisoner, Duration::from_secs(60))
            .expect("issue");

        let session = tokens
            .authenticate_access_token(&token)
            .expect("authenticate")
            .expect("session");
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.role, Role::Prisoner);
    }

    #[test]
    fn rejects_foreign_issuer_and_garbage() {
        let ours = TokenService::new(KEY, "penpal");
        let theirs = TokenService::new(KEY, "elsewhere");
        let token = theirs
            .issue_access_token(Uuid::new_v4(), Role::Partner, Duration::from_secs(60))
            .expect("issue");

        assert!(ours.authenticate_access_token(&token).expect("check").is_none());
        assert!(ours
            .authenticate_access_token("not-a-token")
            .expect("check")
            .is_none());
    }
}
