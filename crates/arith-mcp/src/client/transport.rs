use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

/// Failure to reach the server or to read its response body. Distinct from
/// anything the server says at the JSON-RPC level.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not connect: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("HTTP transport error: {0}")]
    Http(#[source] reqwest::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Http(err)
        }
    }
}

pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Status and headers of a response whose body has not been read yet.
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl TransportResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(
        &self,
        url: &Url,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Result<TransportResponse, TransportError>;

    async fn delete(&self, url: &Url, headers: HeaderMap) -> Result<StatusCode, TransportError>;
}

/// reqwest-backed transport. The body is handed back as a stream so event
/// stream frames can be decoded while the server is still writing.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        url: &Url,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Result<TransportResponse, TransportError> {
        let resp = self
            .http
            .post(url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from))
            .boxed();
        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }

    async fn delete(&self, url: &Url, headers: HeaderMap) -> Result<StatusCode, TransportError> {
        let resp = self.http.delete(url.clone()).headers(headers).send().await?;
        Ok(resp.status())
    }
}
