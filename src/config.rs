use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub secret: String,
    pub issuer: String,
    pub session_ttl_minutes: i64,
    pub reset_ttl_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub sender: String,
    /// `None` means mail is logged instead of delivered.
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub tokens: TokenConfig,
    pub mail: MailConfig,
    pub static_dir: PathBuf,
    pub public_base_url: String,
    pub cookie_secure: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let tokens = TokenConfig {
            secret: std::env::var("SECRET_KEY").context("SECRET_KEY is not set")?,
            issuer: std::env::var("TOKEN_ISSUER").unwrap_or_else(|_| "inkwell".into()),
            session_ttl_minutes: env_parse("SESSION_TTL_MINUTES").unwrap_or(60 * 24 * 14),
            reset_ttl_seconds: env_parse("RESET_TTL_SECONDS").unwrap_or(1800),
        };
        let smtp = std::env::var("SMTP_HOST").ok().map(|host| SmtpConfig {
            host,
            port: env_parse("SMTP_PORT").unwrap_or(2525),
            username: std::env::var("SMTP_USERNAME").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
        });
        let mail = MailConfig {
            sender: std::env::var("MAIL_SENDER").unwrap_or_else(|_| "noreply@demo.com".into()),
            smtp,
        };
        Ok(Self {
            database_url,
            tokens,
            mail,
            static_dir: std::env::var("STATIC_DIR")
                .unwrap_or_else(|_| "static".into())
                .into(),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            cookie_secure: env_parse("COOKIE_SECURE").unwrap_or(false),
        })
    }

    /// Directory holding uploaded avatars.
    pub fn avatar_dir(&self) -> PathBuf {
        self.static_dir.join("images")
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
