//! HTTP transport seam.
//!
//! The gateway talks to the network only through [`HttpTransport`], so tests
//! and the offline CLI mode can swap the wire out.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{Method, Url};
use thiserror::Error;

/// Failure before any HTTP response was received.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self(format!("request timed out: {err}"))
        } else if err.is_connect() {
            Self(format!("connection failed: {err}"))
        } else {
            Self(err.to_string())
        }
    }
}

/// One named file sent as multipart form content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content: Vec<u8>,
    pub mime: Option<String>,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            field: "file".to_string(),
            file_name: file_name.into(),
            content,
            mime: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(FilePart),
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json_body(&self) -> Option<&serde_json::Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// A fully buffered response. Header names are lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// A response whose body is consumed as raw chunks.
pub struct StreamingResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: ByteStream,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Sends a request and hands back the body unbuffered.
    ///
    /// The default buffers through [`send`](Self::send) and yields one chunk.
    async fn send_streaming(
        &self,
        request: HttpRequest,
    ) -> Result<StreamingResponse, TransportError> {
        let response = self.send(request).await?;
        let body = response.body;
        Ok(StreamingResponse {
            status: response.status,
            headers: response.headers,
            body: stream::once(async move { Ok(body) }).boxed(),
        })
    }
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("testops-copilot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn build(&self, request: HttpRequest) -> Result<reqwest::RequestBuilder, TransportError> {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(file) => {
                let mut part =
                    reqwest::multipart::Part::bytes(file.content).file_name(file.file_name);
                if let Some(mime) = &file.mime {
                    part = part.mime_str(mime)?;
                }
                builder.multipart(reqwest::multipart::Form::new().part(file.field, part))
            }
        };
        Ok(builder)
    }
}

fn collect_headers(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self.build(request)?.send().await?;
        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn send_streaming(
        &self,
        request: HttpRequest,
    ) -> Result<StreamingResponse, TransportError> {
        let response = self.build(request)?.send().await?;
        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(TransportError::from))
            .boxed();
        Ok(StreamingResponse {
            status,
            headers,
            body,
        })
    }
}

/// Transport that never reaches the network. Every read path then serves
/// its fixed data, and writes fail with `NETWORK_ERROR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineTransport;

#[async_trait]
impl HttpTransport for OfflineTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        Err(TransportError::new(format!(
            "offline: {} {} not sent",
            request.method,
            request.url.path()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    struct EchoTransport;

    #[async_trait]
    impl HttpTransport for EchoTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Ok(HttpResponse::new(200, request.url.path().as_bytes().to_vec())
                .with_header("Content-Type", "text/plain"))
        }
    }

    fn request(path: &str) -> HttpRequest {
        HttpRequest {
            method: Method::GET,
            url: Url::parse(&format!("http://localhost{path}")).unwrap(),
            headers: vec![("X-Test".into(), "1".into())],
            body: RequestBody::Empty,
        }
    }

    #[tokio::test]
    async fn test_default_streaming_yields_buffered_body() {
        let response = EchoTransport.send_streaming(request("/export")).await.unwrap();
        assert_eq!(response.status, 200);
        let chunks: Vec<Vec<u8>> = response.body.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"/export".to_vec());
    }

    #[tokio::test]
    async fn test_offline_transport_always_fails() {
        let err = OfflineTransport.send(request("/coverage/stats")).await.unwrap_err();
        assert!(err.to_string().contains("/coverage/stats"));
    }

    #[test]
    fn test_header_lookups_ignore_case() {
        let req = request("/");
        assert_eq!(req.header("x-test"), Some("1"));

        let response = HttpResponse::new(429, Vec::new()).with_header("Retry-After", "7");
        assert_eq!(response.header("retry-after"), Some("7"));
        assert!(!response.is_success());
    }
}
