//! The [`Transport`] and [`Connect`] traits.
//!
//! A transport is one reusable handle able to send a request to the remote
//! data service and receive its answer. The pool creates handles through a
//! [`Connect`] implementation.
use bytes::Bytes;
use std::{fmt, io};

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{HttpConnector, HttpTransport};

/// Request method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outgoing request, `path` is relative to the transport base url.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> HttpRequest {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Add request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Lookup header value, name is case insensitive.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Lookup query parameter value.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }
}

/// Answer of the remote service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> HttpResponse {
        Self { status, body: body.into() }
    }

    /// Returns `true` for 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns `true` if the remote rejected the credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status, 401 | 403)
    }
}

/// A handle which can send request to the remote data service.
///
/// Sending must be cancel safe, dropping the returned future abandons the request.
pub trait Transport: Send + Sync + 'static {
    /// Send request and receive the response.
    ///
    /// Implementor should only return error for connection level failure,
    /// non success status is returned as [`HttpResponse`].
    fn send(&self, request: HttpRequest) -> impl Future<Output = io::Result<HttpResponse>> + Send;
}

/// Factory of [`Transport`] handles.
pub trait Connect: Send + Sync + 'static {
    type Transport: Transport;

    /// Create new transport handle.
    fn connect(&self) -> io::Result<Self::Transport>;
}

impl<T> Transport for std::sync::Arc<T> where T: Transport {
    fn send(&self, request: HttpRequest) -> impl Future<Output = io::Result<HttpResponse>> + Send {
        T::send(self, request)
    }
}

impl<F, T> Connect for F
where
    F: Fn() -> io::Result<T> + Send + Sync + 'static,
    T: Transport,
{
    type Transport = T;

    fn connect(&self) -> io::Result<T> {
        self()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn request_lookup() {
        let req = HttpRequest::new(Method::Get, "api/AccessCode")
            .header("Token", "abc")
            .query("email", "x");

        assert_eq!(req.header_value("token"), Some("abc"));
        assert_eq!(req.query_value("email"), Some("x"));
        assert_eq!(req.method.to_string(), "GET");
        assert!(req.body.is_empty());
    }

    #[test]
    fn status_class() {
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(500, "").is_success());
        assert!(HttpResponse::new(403, "").is_unauthorized());
    }
}
