use std::sync::Arc;

use anyhow::{Context, Result};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    config::PortalConfig,
    session::{CookieSessionStore, SessionManager, SharedClock, SystemClock},
    upstream::ApiClient,
};

/// Session manager bound to the request's cookie jar.
pub type WebSession = SessionManager<CookieSessionStore, SharedClock>;

#[derive(Clone)]
pub struct AppState {
    config: Arc<PortalConfig>,
    api: ApiClient,
    clock: SharedClock,
}

impl AppState {
    pub fn new(config: PortalConfig) -> Result<Self> {
        let api = ApiClient::new(&config.upstream_base_url, config.upstream_timeout)
            .context("failed to initialize upstream API client")?;

        Ok(Self {
            config: Arc::new(config),
            api,
            clock: Arc::new(SystemClock),
        })
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self, jar: CookieJar) -> WebSession {
        SessionManager::new(
            CookieSessionStore::new(jar, self.config.secure_cookies),
            self.clock.clone(),
        )
    }
}
