//! HTTP request/response transport using `reqwest`.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use crate::{RequestTransport, TransportError};

/// Issues `POST` requests with a JSON body against a base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport for `base_url` (e.g. `http://127.0.0.1:8080`).
    ///
    /// `timeout` bounds every request end to end.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    /// The base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    fn map_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if e.is_connect() {
            TransportError::Connect(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                e,
            ))
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

impl RequestTransport for HttpTransport {
    async fn request(
        &self,
        path: &str,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, TransportError> {
        let url = self.url(path);
        tracing::debug!(%url, bytes = body.len(), "POST");

        let res = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = res.status();
        let body = res.bytes().await.map_err(|e| self.map_error(e))?.to_vec();

        if status.is_success() {
            Ok(body)
        } else {
            tracing::debug!(%url, status = status.as_u16(), "non-success status");
            Err(TransportError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}
