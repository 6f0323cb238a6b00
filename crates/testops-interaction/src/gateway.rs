//! The single outgoing-call wrapper.
//!
//! Every request leaves through [`ApiGateway`], which attaches credentials,
//! applies the timeout, runs the central 401 handling and normalizes every
//! failure into [`ApiError`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use testops_core::error::{ApiError, ErrorCode};
use tracing::{debug, warn};

use crate::transport::{
    ByteStream, FilePart, HttpRequest, HttpResponse, HttpTransport, RequestBody,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PROVIDER_DOMAIN: &str = "cloud.ru";

const PROVIDER_CLIENT_HEADER: &str = "X-Cloudru-Client";
const PROVIDER_CLIENT_NAME: &str = "testops-copilot";
const PROVIDER_VERSION_HEADER: &str = "X-API-Version";
const PROVIDER_VERSION: &str = "v1";

/// Supplies the current session bearer credential.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Invoked for a 401 on any request that carried the session credential,
/// whichever caller issued it.
#[async_trait]
pub trait UnauthorizedHandler: Send + Sync {
    async fn on_unauthorized(&self);
}

/// Backend response wrapper. Only `data` reaches callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub timestamp: Option<String>,
}

fn default_success() -> bool {
    true
}

/// One outgoing call. `target` is a path under the backend base URL or an
/// absolute URL for external hosts.
#[derive(Debug, Clone)]
pub struct ApiCall {
    method: Method,
    target: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: RequestBody,
    session_auth: bool,
}

impl ApiCall {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            session_auth: true,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self::new(Method::PUT, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::DELETE, target)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sends `token` instead of the session credential.
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| {
            ApiError::validation(format!("Request body could not be encoded: {e}"))
        })?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, file: FilePart) -> Self {
        self.body = RequestBody::Multipart(file);
        self
    }

    /// Keeps the session credential off a third-party host.
    pub fn without_session(mut self) -> Self {
        self.session_auth = false;
        self
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(key, _)| key.eq_ignore_ascii_case(name))
    }
}

/// A built request and whether the session bearer went out with it.
struct Prepared {
    request: HttpRequest,
    carries_session: bool,
}

#[derive(Clone)]
pub struct ApiGateway {
    base_url: String,
    provider_domain: String,
    timeout: Duration,
    transport: Arc<dyn HttpTransport>,
    tokens: Option<Arc<dyn TokenSource>>,
    unauthorized: Option<Arc<dyn UnauthorizedHandler>>,
}

impl std::fmt::Debug for ApiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiGateway")
            .field("base_url", &self.base_url)
            .field("provider_domain", &self.provider_domain)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ApiGateway {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            provider_domain: DEFAULT_PROVIDER_DOMAIN.to_string(),
            timeout: DEFAULT_TIMEOUT,
            transport,
            tokens: None,
            unauthorized: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_provider_domain(mut self, domain: impl Into<String>) -> Self {
        self.provider_domain = domain.into();
        self
    }

    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_unauthorized_handler(mut self, handler: Arc<dyn UnauthorizedHandler>) -> Self {
        self.unauthorized = Some(handler);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Backend call. Unwraps the `{data, message?, success, timestamp}` envelope.
    pub async fn request<T: DeserializeOwned>(&self, call: ApiCall) -> Result<T, ApiError> {
        let response = self.execute(call).await?;
        let envelope: Envelope<T> = decode(&response)?;
        if !envelope.success {
            let message = envelope
                .message
                .unwrap_or_else(|| "Request was not successful".to_string());
            return Err(
                ApiError::new(ErrorCode::Other("REQUEST_FAILED".into()), message)
                    .with_status(response.status),
            );
        }
        Ok(envelope.data)
    }

    /// External-host call. The body is the payload itself.
    pub async fn request_raw<T: DeserializeOwned>(&self, call: ApiCall) -> Result<T, ApiError> {
        let response = self.execute(call).await?;
        decode(&response)
    }

    /// Call whose response body is ignored.
    pub async fn send(&self, call: ApiCall) -> Result<(), ApiError> {
        self.execute(call).await.map(|_| ())
    }

    /// Uploads one named file as multipart form content.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        target: impl Into<String>,
        file: FilePart,
    ) -> Result<T, ApiError> {
        self.request(ApiCall::post(target).multipart(file)).await
    }

    /// Returns the raw byte stream of a successful response, without framing.
    ///
    /// The timeout covers the wait for the response head only.
    pub async fn stream(&self, call: ApiCall) -> Result<ByteStream, ApiError> {
        let Prepared {
            request,
            carries_session,
        } = self.build_request(call)?;
        debug!("[Gateway] {} {} (stream)", request.method, request.url.path());

        let response =
            match tokio::time::timeout(self.timeout, self.transport.send_streaming(request)).await
            {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => {
                    warn!("[Gateway] Stream request failed: {}", err);
                    return Err(ApiError::network(err));
                }
                Err(_) => return Err(self.timed_out()),
            };

        if (200..300).contains(&response.status) {
            return Ok(response.body);
        }

        let chunks: Vec<Vec<u8>> = response
            .body
            .filter_map(|chunk| async move { chunk.ok() })
            .collect()
            .await;
        let buffered = HttpResponse {
            status: response.status,
            headers: response.headers,
            body: chunks.concat(),
        };
        Err(self.reject(&buffered, carries_session).await)
    }

    async fn execute(&self, call: ApiCall) -> Result<HttpResponse, ApiError> {
        let Prepared {
            request,
            carries_session,
        } = self.build_request(call)?;
        let method = request.method.clone();
        let path = request.url.path().to_string();
        debug!("[Gateway] {} {}", method, path);

        let response = match tokio::time::timeout(self.timeout, self.transport.send(request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                warn!("[Gateway] {} {} failed: {}", method, path, err);
                return Err(ApiError::network(err));
            }
            Err(_) => {
                warn!("[Gateway] {} {} timed out", method, path);
                return Err(self.timed_out());
            }
        };

        if response.is_success() {
            debug!("[Gateway] {} {} -> {}", method, path, response.status);
            Ok(response)
        } else {
            Err(self.reject(&response, carries_session).await)
        }
    }

    fn timed_out(&self) -> ApiError {
        ApiError::network(format!(
            "request timed out after {}s",
            self.timeout.as_secs_f64()
        ))
    }

    async fn reject(&self, response: &HttpResponse, carries_session: bool) -> ApiError {
        let error = normalize_error(
            response.status,
            response.header("retry-after"),
            &response.body,
        );
        match response.status {
            401 if carries_session => {
                warn!("[Gateway] 401 Unauthorized, ending session");
                if let Some(handler) = &self.unauthorized {
                    handler.on_unauthorized().await;
                }
            }
            401 => warn!("[Gateway] 401 Unauthorized for a call outside the session"),
            403 => warn!("[Gateway] Access denied: {}", error.message),
            429 => warn!(
                "[Gateway] Rate limit exceeded (retry after {:?})",
                error.retry_after
            ),
            status => debug!("[Gateway] HTTP {} -> {}", status, error.code),
        }
        error
    }

    fn build_request(&self, call: ApiCall) -> Result<Prepared, ApiError> {
        let target = if is_absolute(&call.target) {
            call.target.clone()
        } else {
            format!("{}/{}", self.base_url, call.target.trim_start_matches('/'))
        };
        let mut url = Url::parse(&target)
            .map_err(|e| ApiError::validation(format!("Invalid URL {target:?}: {e}")))?;
        if !call.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &call.query {
                pairs.append_pair(key, value);
            }
        }

        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        let mut carries_session = false;
        if call.session_auth && !call.has_header("authorization") {
            if let Some(token) = self.tokens.as_ref().and_then(|t| t.bearer_token()) {
                headers.push(("Authorization".to_string(), format!("Bearer {token}")));
                carries_session = true;
            }
        }
        if self.is_provider_host(&url) {
            headers.push((
                PROVIDER_CLIENT_HEADER.to_string(),
                PROVIDER_CLIENT_NAME.to_string(),
            ));
            headers.push((
                PROVIDER_VERSION_HEADER.to_string(),
                PROVIDER_VERSION.to_string(),
            ));
        }
        headers.extend(call.headers);

        Ok(Prepared {
            request: HttpRequest {
                method: call.method,
                url,
                headers,
                body: call.body,
            },
            carries_session,
        })
    }

    fn is_provider_host(&self, url: &Url) -> bool {
        let domain = self.provider_domain.as_str();
        url.host_str().is_some_and(|host| {
            host == domain
                || host
                    .strip_suffix(domain)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

fn is_absolute(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    serde_json::from_slice(&response.body).map_err(|e| {
        ApiError::new(
            ErrorCode::Other("INVALID_RESPONSE".into()),
            format!("Unexpected response payload: {e}"),
        )
        .with_status(response.status)
    })
}

/// Turns a non-2xx response into an [`ApiError`].
///
/// A body of the `{code, message, details?}` shape is passed through.
/// Otherwise the code follows the status and a bare `message`/`error` string
/// in the body becomes the message.
pub fn normalize_error(status: u16, retry_after: Option<&str>, body: &[u8]) -> ApiError {
    let mut error = serde_json::from_slice::<ApiError>(body).unwrap_or_else(|_| {
        let code = ErrorCode::from_status(status);
        let message = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                ["message", "error"]
                    .iter()
                    .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(str::to_string))
            });
        match message {
            Some(message) => ApiError::new(code, message),
            None => ApiError::from_code(code),
        }
    });

    error.status = Some(status);
    if status == 429 {
        error.retry_after = retry_after
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
    }
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedTransport};
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedToken(Mutex<Option<String>>);

    impl TokenSource for FixedToken {
        fn bearer_token(&self) -> Option<String> {
            self.0.lock().unwrap().clone()
        }
    }

    #[derive(Default)]
    struct CountingHandler(AtomicUsize);

    #[async_trait]
    impl UnauthorizedHandler for CountingHandler {
        async fn on_unauthorized(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn gateway(transport: Arc<ScriptedTransport>) -> ApiGateway {
        ApiGateway::new("http://localhost:8000/api/", transport).with_token_source(Arc::new(
            FixedToken(Mutex::new(Some("t1".to_string()))),
        ))
    }

    #[tokio::test]
    async fn test_envelope_is_unwrapped_and_bearer_attached() {
        let transport = Arc::new(
            ScriptedTransport::new().on(Method::GET, "/coverage/stats", Reply::envelope(json!(7))),
        );
        let value: u32 = gateway(transport.clone())
            .request(ApiCall::get("/coverage/stats").query("product", "calculator"))
            .await
            .unwrap();
        assert_eq!(value, 7);

        let sent = transport.last_request().unwrap();
        assert_eq!(sent.url.as_str(), "http://localhost:8000/api/coverage/stats?product=calculator");
        assert_eq!(sent.header("authorization"), Some("Bearer t1"));
        assert!(sent.header("x-cloudru-client").is_none());
    }

    #[tokio::test]
    async fn test_provider_headers_and_explicit_bearer() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::POST,
            "/completions",
            Reply::json(200, json!({"ok": true})),
        ));
        let _: serde_json::Value = gateway(transport.clone())
            .request_raw(
                ApiCall::post("https://api.cloud.ru/evolution/v1/completions")
                    .bearer("model-key")
                    .json(&json!({"prompt": "x"}))
                    .unwrap(),
            )
            .await
            .unwrap();

        let sent = transport.last_request().unwrap();
        assert_eq!(sent.header("authorization"), Some("Bearer model-key"));
        assert_eq!(sent.header("x-cloudru-client"), Some("testops-copilot"));
        assert_eq!(sent.header("x-api-version"), Some("v1"));
    }

    #[test]
    fn test_provider_domain_matching() {
        let gateway = ApiGateway::new("http://localhost", Arc::new(ScriptedTransport::new()));
        let url = |s: &str| Url::parse(s).unwrap();
        assert!(gateway.is_provider_host(&url("https://cloud.ru/x")));
        assert!(gateway.is_provider_host(&url("https://api.cloud.ru/x")));
        assert!(!gateway.is_provider_host(&url("https://notcloud.ru/x")));
        assert!(!gateway.is_provider_host(&url("https://gitlab.example/x")));
    }

    #[tokio::test]
    async fn test_401_invokes_handler_and_maps_to_auth() {
        let handler = Arc::new(CountingHandler::default());
        let transport = Arc::new(ScriptedTransport::new().fallback(Reply::status(401)));
        let gateway = gateway(transport).with_unauthorized_handler(handler.clone());

        let err = gateway.send(ApiCall::get("/tests")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Auth);
        assert!(err.is_unauthorized());
        assert_eq!(handler.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_401_outside_session_leaves_handler_alone() {
        let handler = Arc::new(CountingHandler::default());
        let transport = Arc::new(ScriptedTransport::new().fallback(Reply::status(401)));
        let gateway = gateway(transport.clone()).with_unauthorized_handler(handler.clone());

        let err = gateway
            .send(
                ApiCall::get("https://gitlab.example/api/v4/user")
                    .without_session()
                    .header("PRIVATE-TOKEN", "wrong"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Auth);

        let err = gateway
            .send(ApiCall::post("https://api.cloud.ru/evolution/v1/completions").bearer("bad-key"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Auth);
        assert_eq!(
            transport.last_request().unwrap().header("authorization"),
            Some("Bearer bad-key")
        );
        assert_eq!(handler.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_403_and_429_do_not_touch_session() {
        let handler = Arc::new(CountingHandler::default());
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(Method::GET, "/forbidden", Reply::status(403))
                .on(
                    Method::GET,
                    "/limited",
                    Reply::status(429).with_header("Retry-After", "12"),
                ),
        );
        let gateway = gateway(transport).with_unauthorized_handler(handler.clone());

        let err = gateway.send(ApiCall::get("/forbidden")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Permission);

        let err = gateway.send(ApiCall::get("/limited")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RateLimit);
        assert_eq!(err.retry_after, Some(Duration::from_secs(12)));
        assert_eq!(handler.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_server_error_body_passes_through() {
        let transport = Arc::new(ScriptedTransport::new().fallback(Reply::json(
            503,
            json!({"code": "MODEL_UNAVAILABLE", "message": "busy", "details": {"queue": 3}}),
        )));
        let err = gateway(transport)
            .send(ApiCall::post("/tests/generate"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ModelUnavailable);
        assert_eq!(err.message, "busy");
        assert_eq!(err.status, Some(503));
        assert!(err.details.unwrap().contains_key("queue"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let transport = Arc::new(ScriptedTransport::failing());
        let err = gateway(transport)
            .send(ApiCall::get("/coverage/stats"))
            .await
            .unwrap_err();
        assert!(err.is_network());
        assert!(err.status.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_network_error() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .fallback(Reply::envelope(json!(1)).delayed(Duration::from_secs(60))),
        );
        let err = gateway(transport)
            .with_timeout(Duration::from_secs(30))
            .request::<u32>(ApiCall::get("/slow"))
            .await
            .unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_upload_sends_multipart() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::POST,
            "/test-cases/import",
            Reply::envelope(json!({"imported": 2})),
        ));
        let value: serde_json::Value = gateway(transport.clone())
            .upload(
                "/test-cases/import",
                FilePart::new("cases.json", b"[]".to_vec()).with_mime("application/json"),
            )
            .await
            .unwrap();
        assert_eq!(value["imported"], 2);

        let sent = transport.last_request().unwrap();
        match sent.body {
            RequestBody::Multipart(file) => {
                assert_eq!(file.field, "file");
                assert_eq!(file.file_name, "cases.json");
            }
            other => panic!("expected multipart body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_returns_raw_bytes() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::GET,
            "/coverage/export",
            Reply::bytes(200, b"%PDF-1.7".to_vec()),
        ));
        let stream = gateway(transport)
            .stream(ApiCall::get("/coverage/export"))
            .await
            .unwrap();
        let chunks: Vec<Vec<u8>> = stream.filter_map(|c| async move { c.ok() }).collect().await;
        assert_eq!(chunks.concat(), b"%PDF-1.7".to_vec());
    }

    #[test]
    fn test_normalize_uses_bare_message() {
        let err = normalize_error(404, None, br#"{"message":"404 File Not Found"}"#);
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "404 File Not Found");
        assert!(err.is_not_found());

        let err = normalize_error(500, None, b"<html>oops</html>");
        assert_eq!(err.code, ErrorCode::Other("HTTP_500".into()));
        assert_eq!(err.message, ErrorCode::from_status(500).default_message());
    }

    #[tokio::test]
    async fn test_unsuccessful_envelope_is_error() {
        let transport = Arc::new(ScriptedTransport::new().fallback(Reply::json(
            200,
            json!({"data": null, "success": false, "message": "quota", "timestamp": "t"}),
        )));
        let err = gateway(transport)
            .request::<Option<u32>>(ApiCall::get("/x"))
            .await
            .unwrap_err();
        assert_eq!(err.message, "quota");
    }
}
