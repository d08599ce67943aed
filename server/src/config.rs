use anyhow::{Context, Result, anyhow};
use platform_authn::{MailSettings, TokenSettings};
use platform_db::DatabaseSettings;

const MIN_SECRET_LEN: usize = 32;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub tokens: TokenSettings,
    pub mail: MailSettings,
    pub page_size: u64,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseSettings::default(),
            tokens: TokenSettings {
                secret: "insecure-development-secret-change-me".into(),
                access_ttl_minutes: 24 * 60,
                confirmation_ttl_minutes: 3 * 24 * 60,
            },
            mail: MailSettings {
                from: "noreply@yamdb.local".into(),
                smtp_port: 587,
                use_starttls: true,
                ..MailSettings::default()
            },
            page_size: 10,
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let secret = std::env::var("JWT_SECRET").context("JWT_SECRET missing")?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(anyhow!(
                "JWT_SECRET must be at least {MIN_SECRET_LEN} bytes"
            ));
        }
        let tokens = TokenSettings {
            secret,
            access_ttl_minutes: env_parse(
                "ACCESS_TOKEN_TTL_MINUTES",
                defaults.tokens.access_ttl_minutes,
            )?,
            confirmation_ttl_minutes: env_parse(
                "CONFIRMATION_TTL_MINUTES",
                defaults.tokens.confirmation_ttl_minutes,
            )?,
        };

        let mail = MailSettings {
            from: std::env::var("MAIL_FROM").unwrap_or(defaults.mail.from),
            smtp_host: std::env::var("SMTP_HOST").unwrap_or_default(),
            smtp_port: env_parse("SMTP_PORT", defaults.mail.smtp_port)?,
            smtp_username: std::env::var("SMTP_USERNAME").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            use_starttls: env_bool("SMTP_STARTTLS", defaults.mail.use_starttls),
        };

        let page_size = env_parse("PAGE_SIZE", defaults.page_size)?.clamp(1, 100);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            database: DatabaseSettings::from_env(),
            tokens,
            mail,
            page_size,
            cors_allowed_origins,
        })
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|err| anyhow!("invalid {key}: {err}")),
        Err(_) => Ok(default),
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}
