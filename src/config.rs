use std::{env, str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 15;
const DEFAULT_SESSION_POLL_SECS: u64 = 60;
const DEFAULT_FEATURED_COUNT: usize = 6;

#[derive(Clone, Debug)]
pub struct PortalConfig {
    pub port: u16,
    pub upstream_base_url: String,
    pub upstream_timeout: Duration,
    /// How often open pages re-check the session for expiry.
    pub session_poll_interval: Duration,
    /// Set `Secure` on credential cookies. Only disable for plain-HTTP local
    /// development.
    pub secure_cookies: bool,
    pub featured_count: usize,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let upstream_base_url = lookup("UPSTREAM_API_URL")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .context("UPSTREAM_API_URL env var is missing")?;

        if !(upstream_base_url.starts_with("http://") || upstream_base_url.starts_with("https://"))
        {
            return Err(anyhow!(
                "UPSTREAM_API_URL must be an http(s) URL, got {upstream_base_url}"
            ));
        }

        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let timeout_secs = parse_or(&lookup, "UPSTREAM_TIMEOUT_SECS", DEFAULT_UPSTREAM_TIMEOUT_SECS)?;
        let poll_secs = parse_or(&lookup, "SESSION_POLL_SECS", DEFAULT_SESSION_POLL_SECS)?;
        let featured_count = parse_or(&lookup, "FEATURED_COUNT", DEFAULT_FEATURED_COUNT)?;
        let secure_cookies = parse_flag(&lookup, "SECURE_COOKIES", true)?;

        if poll_secs == 0 {
            return Err(anyhow!("SESSION_POLL_SECS must be greater than zero"));
        }

        Ok(Self {
            port,
            upstream_base_url,
            upstream_timeout: Duration::from_secs(timeout_secs),
            session_poll_interval: Duration::from_secs(poll_secs),
            secure_cookies,
            featured_count,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw}")),
        _ => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(anyhow!("invalid boolean for {key}: {other}")),
    }
}
