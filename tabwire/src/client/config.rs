//! Client configuration.
use std::{env::var, time::Duration};

use crate::{codec::DecodePolicy, pool::PoolConfig};

/// Wire paths and credential header names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    /// Command execution path.
    pub service: String,
    pub login: String,
    pub access_code: String,
    /// Header carrying the authentication token.
    pub token_header: String,
    /// Header carrying the access group of an access code request.
    pub access_group_header: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            service: "api/Service".into(),
            login: "api/Login".into(),
            access_code: "api/AccessCode".into(),
            token_header: "token".into(),
            access_group_header: "accessGroup".into(),
        }
    }
}

/// Client configuration builder.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub(crate) base_url: String,
    pub(crate) project_token: String,
    pub(crate) crypto_context: String,
    pub(crate) timeout: Duration,
    pub(crate) max_retries: u32,
    pub(crate) decode_policy: DecodePolicy,
    pub(crate) endpoints: Endpoints,
    pub(crate) pool: PoolConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/".into(),
            project_token: String::new(),
            crypto_context: "tabwire".into(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            decode_policy: DecodePolicy::Strict,
            endpoints: Endpoints::default(),
            pool: PoolConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Retrieve configuration from environment variable.
    ///
    /// It reads:
    /// - `SERVICE_BASE_URL`, defaults to `http://localhost:5000/`
    /// - `SERVICE_PROJECT_TOKEN`, token bound to this client
    /// - `SERVICE_CRYPTO_CONTEXT`, key derivation context of login credential
    /// - `SERVICE_TIMEOUT_SECS`, per attempt timeout, defaults to 30
    /// - `SERVICE_MAX_RETRIES`, defaults to 3
    ///
    /// Pool settings are read by [`PoolConfig::from_env`].
    pub fn from_env() -> ClientConfig {
        let def = Self::default();

        macro_rules! env {
            ($name:literal, $def:expr) => {
                match var($name) {
                    Ok(ok) => ok.parse().unwrap_or($def),
                    Err(_) => $def,
                }
            };
        }

        Self {
            base_url: var("SERVICE_BASE_URL").unwrap_or(def.base_url),
            project_token: var("SERVICE_PROJECT_TOKEN").unwrap_or(def.project_token),
            crypto_context: var("SERVICE_CRYPTO_CONTEXT").unwrap_or(def.crypto_context),
            timeout: Duration::from_secs(env!("SERVICE_TIMEOUT_SECS", def.timeout.as_secs())),
            max_retries: env!("SERVICE_MAX_RETRIES", def.max_retries),
            decode_policy: def.decode_policy,
            endpoints: def.endpoints,
            pool: PoolConfig::from_env(),
        }
    }

    /// Set remote service base url.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set project token used by login and join access code.
    pub fn project_token(mut self, token: impl Into<String>) -> Self {
        self.project_token = token.into();
        self
    }

    /// Set key derivation context of login credential.
    pub fn crypto_context(mut self, context: impl Into<String>) -> Self {
        self.crypto_context = context.into();
        self
    }

    /// Set per attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how many times a failed call is attempted again.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    pub fn get_max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn get_endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn get_pool(&self) -> &PoolConfig {
        &self.pool
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.get_max_retries(), 3);
        assert_eq!(config.get_timeout(), Duration::from_secs(30));
        assert_eq!(config.get_endpoints().service, "api/Service");
        assert_eq!(config.get_endpoints().access_group_header, "accessGroup");
        assert_eq!(config.get_pool().get_max_count(), crate::pool::DEFAULT_MAX_COUNT);
    }
}
