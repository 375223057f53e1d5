use std::{io, time::Duration};

use super::{Connect, HttpRequest, HttpResponse, Method, Transport};

/// [`Transport`] backed by a [`reqwest::Client`].
#[derive(Clone, Debug)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create transport sending to `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> io::Result<HttpTransport> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(io::Error::other)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> io::Result<HttpResponse> {
        let HttpRequest { method, path, query, headers, body } = request;

        let method = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, self.url(&path));
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        if !body.is_empty() {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = builder.send().await.map_err(into_io)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(into_io)?;

        Ok(HttpResponse { status, body })
    }
}

fn into_io(err: reqwest::Error) -> io::Error {
    if err.is_timeout() {
        io::Error::new(io::ErrorKind::TimedOut, err)
    } else if err.is_connect() {
        io::Error::new(io::ErrorKind::ConnectionRefused, err)
    } else {
        io::Error::other(err)
    }
}

/// [`Connect`] implementation creating [`HttpTransport`] handles.
#[derive(Clone, Debug)]
pub struct HttpConnector {
    base_url: String,
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> HttpConnector {
        Self { base_url: base_url.into(), timeout }
    }
}

impl Connect for HttpConnector {
    type Transport = HttpTransport;

    fn connect(&self) -> io::Result<HttpTransport> {
        HttpTransport::new(&self.base_url, self.timeout)
    }
}
