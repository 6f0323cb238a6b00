//! Scripted transports for tests.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
pub use reqwest::Method;

use crate::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// What the transport does for a matched request.
#[derive(Debug, Clone)]
pub enum Reply {
    Response(HttpResponse),
    Fail(String),
    Delayed(Duration, Box<Reply>),
}

impl Reply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::Response(
            HttpResponse::new(status, body.to_string()).with_header("content-type", "application/json"),
        )
    }

    /// 200 with the backend envelope around `data`.
    pub fn envelope(data: serde_json::Value) -> Self {
        Self::json(
            200,
            serde_json::json!({
                "data": data,
                "success": true,
                "timestamp": "2024-01-20T10:00:00Z"
            }),
        )
    }

    pub fn bytes(status: u16, body: Vec<u8>) -> Self {
        Self::Response(HttpResponse::new(status, body))
    }

    /// Empty-bodied response with the given status.
    pub fn status(status: u16) -> Self {
        Self::Response(HttpResponse::new(status, Vec::new()))
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }

    pub fn delayed(self, delay: Duration) -> Self {
        Self::Delayed(delay, Box::new(self))
    }

    pub fn with_header(self, name: &str, value: &str) -> Self {
        match self {
            Self::Response(response) => Self::Response(response.with_header(name, value)),
            Self::Delayed(delay, inner) => Self::Delayed(delay, Box::new(inner.with_header(name, value))),
            other => other,
        }
    }
}

struct Route {
    method: Method,
    path_suffix: String,
    replies: VecDeque<Reply>,
}

/// Transport answering from a routing table.
///
/// Routes match on method and URL path suffix; the first match wins. A route
/// with several queued replies hands them out in order and then keeps
/// repeating the last one. Unmatched requests get the fallback reply.
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    fallback: Reply,
    requests: Mutex<Vec<HttpRequest>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    /// Unmatched requests answer 404.
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
            fallback: Reply::json(404, serde_json::json!({"message": "404 Not Found"})),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request fails before a response is received.
    pub fn failing() -> Self {
        Self::new().fallback(Reply::fail("connection refused"))
    }

    pub fn fallback(mut self, reply: Reply) -> Self {
        self.fallback = reply;
        self
    }

    pub fn on(self, method: Method, path_suffix: &str, reply: Reply) -> Self {
        {
            let mut routes = lock(&self.routes);
            match routes
                .iter_mut()
                .find(|r| r.method == method && r.path_suffix == path_suffix)
            {
                Some(route) => route.replies.push_back(reply),
                None => routes.push(Route {
                    method,
                    path_suffix: path_suffix.to_string(),
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        lock(&self.requests).last().cloned()
    }

    /// Recorded requests whose method and path suffix match.
    pub fn requests_to(&self, method: Method, path_suffix: &str) -> Vec<HttpRequest> {
        lock(&self.requests)
            .iter()
            .filter(|r| r.method == method && r.url.path().ends_with(path_suffix))
            .cloned()
            .collect()
    }

    fn reply_for(&self, request: &HttpRequest) -> Reply {
        let mut routes = lock(&self.routes);
        let path = request.url.path();
        match routes
            .iter_mut()
            .find(|r| r.method == request.method && path.ends_with(&r.path_suffix))
        {
            Some(route) if route.replies.len() > 1 => route
                .replies
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone()),
            Some(route) => route
                .replies
                .front()
                .cloned()
                .unwrap_or_else(|| self.fallback.clone()),
            None => self.fallback.clone(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn play(reply: Reply) -> Result<HttpResponse, TransportError> {
    let mut reply = reply;
    loop {
        match reply {
            Reply::Response(response) => return Ok(response),
            Reply::Fail(message) => return Err(TransportError::new(message)),
            Reply::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                reply = *inner;
            }
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = self.reply_for(&request);
        lock(&self.requests).push(request);
        play(reply).await
    }
}
