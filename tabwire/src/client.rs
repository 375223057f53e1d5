//! Service dispatcher.
//!
//! [`Client`] encodes a request, sends it through a pooled transport handle,
//! and decodes the answer. A call attempt that fails with a transport error
//! discards the handle and is attempted again with a fresh one, at most
//! [`ClientConfig::max_retries`] more times.
use std::{io, sync::Arc};

use crate::{
    DataSet, Result,
    codec::Codec,
    common::{log_error, reason_error, verbose},
    crypto::{Cipher, login_credential},
    envelope::{ServiceRequest, ServiceResponse, Status, UserInfo},
    error::{ErrorKind, RetryExhausted},
    pool::Pool,
    transport::{Connect, HttpRequest, HttpResponse, Method, Transport},
};

mod config;

pub use config::{ClientConfig, Endpoints};

/// Access group of the join access code.
pub const JOIN_ACCESS_GROUP: &str = "JOIN";

/// Remote data service client.
pub struct Client<T, K> {
    pool: Pool<T>,
    cipher: Arc<K>,
    config: Arc<ClientConfig>,
    codec: Codec,
}

/// What happen to the transport handle after a successful attempt.
enum After {
    Release,
    Discard,
}

#[cfg(feature = "http")]
impl<K: Cipher> Client<crate::transport::HttpTransport, K> {
    /// Create client configured from environment variable.
    ///
    /// See [`ClientConfig::from_env`] for more details on env.
    ///
    /// # Panics
    ///
    /// Panics if called outside of tokio runtime.
    pub fn from_env(cipher: K) -> Self {
        Self::new(cipher, ClientConfig::from_env())
    }

    /// Create client sending over http.
    ///
    /// # Panics
    ///
    /// Panics if called outside of tokio runtime.
    pub fn new(cipher: K, config: ClientConfig) -> Self {
        let connector = crate::transport::HttpConnector::new(config.base_url.clone(), config.timeout);
        Self::with_connector(connector, cipher, config)
    }
}

impl<T: Transport, K: Cipher> Client<T, K> {
    /// Create client with custom transport.
    ///
    /// # Panics
    ///
    /// Panics if called outside of tokio runtime.
    pub fn with_connector<C>(connector: C, cipher: K, config: ClientConfig) -> Self
    where
        C: Connect<Transport = T>,
    {
        Self {
            pool: Pool::with_config(connector, config.pool.clone()),
            cipher: Arc::new(cipher),
            codec: Codec::new(config.decode_policy),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn pool(&self) -> &Pool<T> {
        &self.pool
    }

    /// Execute every command in `request` within its transaction scope.
    ///
    /// Returns [`None`] when the service produce no data.
    ///
    /// The command graph is validated before anything is sent, a dangling
    /// chain target returns configuration error without any network call.
    pub async fn execute(&self, request: &ServiceRequest) -> Result<Option<DataSet>> {
        request.validate()?;

        let http = HttpRequest::new(Method::Post, &self.config.endpoints.service)
            .header(&self.config.endpoints.token_header, request.auth_token())
            .header("Accept", "application/json")
            .body(self.codec.encode(request));

        verbose!("execute {:?} with {} commands", request.service(), request.commands().len());

        self.dispatch(http, |response| {
            let response = self.codec.decode::<ServiceResponse>(&response.body)?;
            Ok((response.into_result()?, After::Release))
        })
        .await
    }

    /// Authenticate user.
    ///
    /// The transport handle used by a successful login is removed from the pool.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserInfo> {
        let project_token = &self.config.project_token;
        let credential = login_credential(
            self.cipher.as_ref(),
            email,
            password,
            project_token,
            &self.config.crypto_context,
        )?;

        let http = HttpRequest::new(Method::Post, &self.config.endpoints.login)
            .header(&self.config.endpoints.token_header, project_token.as_str())
            .header("Accept", "application/json")
            .body(self.codec.encode(&credential));

        self.dispatch(http, |response| {
            let info = self.codec.decode::<UserInfo>(&response.body)?;
            match info.status {
                Status::Ok => Ok((info, After::Discard)),
                Status::Empty => Ok((info, After::Release)),
                Status::Error => Err(AuthError::new(info.message.unwrap_or_default()).into()),
            }
        })
        .await
    }

    /// Request access code of the join group using the project token.
    pub async fn join_access_code(&self, email: &str) -> Result<String> {
        self.access_code(&self.config.project_token, email, JOIN_ACCESS_GROUP).await
    }

    /// Request access code of `access_group`.
    ///
    /// The email is encrypted, and the returned code decrypted, under the
    /// `token` and `access_group` pair.
    pub async fn access_code(&self, token: &str, email: &str, access_group: &str) -> Result<String> {
        let email = self.cipher.encrypt(email, token, access_group)?;
        let endpoints = &self.config.endpoints;

        let http = HttpRequest::new(Method::Get, &endpoints.access_code)
            .query("email", email)
            .header(&endpoints.token_header, token)
            .header(&endpoints.access_group_header, access_group)
            .header("Accept", "text/plain");

        self.dispatch(http, |response| {
            let code = std::str::from_utf8(&response.body)
                .map_err(|e| crate::codec::ProtocolError::new(format!("access code is not utf8: {e}")))?;
            let code = self.cipher.decrypt(code.trim(), token, access_group)?;
            Ok((code, After::Release))
        })
        .await
    }

    /// Attempt `request` until success, non retryable error, or the retry bound.
    async fn dispatch<R>(
        &self,
        request: HttpRequest,
        mut handle: impl FnMut(HttpResponse) -> Result<(R, After)>,
    ) -> Result<R> {
        let attempts = self.config.max_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match self.attempt(&request, &mut handle).await {
                Ok(ok) => return Ok(ok),
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(err);
            }

            log_error!("{} {} attempt {attempt}/{attempts} failed: {err}", request.method, request.path);

            if attempt >= attempts {
                return Err(RetryExhausted::new(attempt, err).into());
            }
        }
    }

    async fn attempt<R>(
        &self,
        request: &HttpRequest,
        handle: &mut impl FnMut(HttpResponse) -> Result<(R, After)>,
    ) -> Result<R> {
        let lease = self.pool.acquire().await?;

        let sent = tokio::time::timeout(self.config.timeout, lease.send(request.clone())).await;
        let response = match sent {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                lease.discard();
                return Err(err.into());
            }
            Err(_) => {
                lease.discard();
                let timeout = self.config.timeout;
                return Err(io::Error::new(io::ErrorKind::TimedOut, format!("no response within {timeout:?}")).into());
            }
        };

        if response.is_unauthorized() {
            return Err(AuthError::new(format!("credential rejected with status {}", response.status)).into());
        }

        if !response.is_success() {
            lease.discard();
            return Err(io::Error::other(format!("unexpected http status {}", response.status)).into());
        }

        match handle(response) {
            Ok((ok, After::Release)) => Ok(ok),
            Ok((ok, After::Discard)) => {
                lease.discard();
                Ok(ok)
            }
            Err(err) => {
                if let ErrorKind::Protocol(_) = err.kind() {
                    lease.discard();
                }
                Err(err)
            }
        }
    }
}

impl<T, K> Clone for Client<T, K> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            cipher: self.cipher.clone(),
            config: self.config.clone(),
            codec: self.codec,
        }
    }
}

impl<T, K> std::fmt::Debug for Client<T, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.config.base_url)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

reason_error! {
    /// An error when the remote service rejects the credential.
    pub struct AuthError("authentication failed");
}
