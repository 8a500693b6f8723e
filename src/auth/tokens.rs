use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use super::claims::{Claims, TokenKind};
use crate::config::TokenConfig;

/// HS256 keys for session cookies and password-reset links.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    pub session_ttl: Duration,
    pub reset_ttl: Duration,
}

impl TokenKeys {
    pub fn new(cfg: &TokenConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            session_ttl: Duration::from_secs((cfg.session_ttl_minutes.max(1) as u64) * 60),
            reset_ttl: Duration::from_secs(cfg.reset_ttl_seconds.max(1) as u64),
        }
    }

    fn sign(
        &self,
        user_id: i64,
        kind: TokenKind,
        ttl: Duration,
        ver: Option<String>,
        now: OffsetDateTime,
    ) -> anyhow::Result<String> {
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
            iss: self.issuer.clone(),
            kind,
            ver,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id, kind = ?kind, "token signed");
        Ok(token)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation
    }

    pub fn sign_session(&self, user_id: i64, fingerprint: String) -> anyhow::Result<String> {
        self.sign(
            user_id,
            TokenKind::Session,
            self.session_ttl,
            Some(fingerprint),
            OffsetDateTime::now_utc(),
        )
    }

    pub fn verify_session(&self, token: &str) -> anyhow::Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation())?;
        if data.claims.kind != TokenKind::Session {
            anyhow::bail!("not a session token");
        }
        Ok(data.claims)
    }

    /// Reset token for `user_id` with the configured lifetime.
    pub fn issue_reset(&self, user_id: i64) -> anyhow::Result<String> {
        self.issue_reset_at(user_id, self.reset_ttl, OffsetDateTime::now_utc())
    }

    pub fn issue_reset_at(
        &self,
        user_id: i64,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> anyhow::Result<String> {
        self.sign(user_id, TokenKind::PasswordReset, ttl, None, now)
    }

    pub fn verify_reset(&self, token: &str) -> Option<i64> {
        self.verify_reset_at(token, OffsetDateTime::now_utc())
    }

    /// User id bound to a reset token, checked against `now`.
    ///
    /// Bad signature, malformed payload and expiry all yield `None`; only the
    /// log line tells them apart.
    pub fn verify_reset_at(&self, token: &str, now: OffsetDateTime) -> Option<i64> {
        let mut validation = self.validation();
        validation.validate_exp = false;
        let claims = match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                warn!(error = %e, "reset token rejected");
                return None;
            }
        };
        if claims.kind != TokenKind::PasswordReset {
            warn!(user_id = claims.sub, "reset token has wrong kind");
            return None;
        }
        if claims.exp <= now.unix_timestamp() {
            warn!(user_id = claims.sub, "reset token expired");
            return None;
        }
        Some(claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str) -> TokenKeys {
        TokenKeys::new(&TokenConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            session_ttl_minutes: 5,
            reset_ttl_seconds: 1800,
        })
    }

    #[test]
    fn sign_and_verify_session() {
        let keys = make_keys("dev-secret", "test-issuer");
        let token = keys.sign_session(7, "salt".into()).expect("sign session");
        let claims = keys.verify_session(&token).expect("verify session");
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.kind, TokenKind::Session);
        assert_eq!(claims.ver.as_deref(), Some("salt"));
    }

    #[test]
    fn reset_token_verifies_before_expiry_only() {
        let keys = make_keys("dev-secret", "iss");
        let now = OffsetDateTime::now_utc();
        let token = keys.issue_reset_at(3, Duration::from_secs(1800), now).unwrap();

        assert_eq!(keys.verify_reset_at(&token, now), Some(3));
        assert_eq!(keys.verify_reset_at(&token, now + TimeDuration::seconds(1799)), Some(3));
        assert_eq!(keys.verify_reset_at(&token, now + TimeDuration::seconds(1801)), None);
    }

    #[test]
    fn tampered_reset_token_fails() {
        let keys = make_keys("dev-secret", "iss");
        let token = keys.issue_reset(11).unwrap();
        assert_eq!(keys.verify_reset(&token), Some(11));

        for (i, c) in token.char_indices() {
            let replacement = if c == 'A' { 'B' } else { 'A' };
            let mut tampered = token.clone();
            tampered.replace_range(i..i + c.len_utf8(), &replacement.to_string());
            assert_eq!(keys.verify_reset(&tampered), None, "tampered at byte {}", i);
        }
    }

    #[test]
    fn kinds_do_not_mix() {
        let keys = make_keys("dev-secret", "iss");
        let session = keys.sign_session(1, "salt".into()).unwrap();
        assert_eq!(keys.verify_reset(&session), None);

        let reset = keys.issue_reset(1).unwrap();
        let err = keys.verify_session(&reset).unwrap_err();
        assert!(err.to_string().contains("not a session token"));
    }

    #[test]
    fn verify_rejects_other_secret_or_issuer() {
        let good = make_keys("same-secret", "good-iss");
        let other_issuer = make_keys("same-secret", "bad-iss");
        let other_secret = make_keys("other-secret", "good-iss");
        let token = good.issue_reset(5).unwrap();
        assert_eq!(other_issuer.verify_reset(&token), None);
        assert_eq!(other_secret.verify_reset(&token), None);
    }
}
