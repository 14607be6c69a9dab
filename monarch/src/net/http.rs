//! The HTTP client boundary. [`InMemoryClient`] is a reference
//! implementation backed by registered handlers, not a real socket —
//! enough to drive an event-tapped request/response test without a live
//! network.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        HttpRequest {
            method: "GET".to_string(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("no handler registered for {method} {url}")]
    NoHandler { method: String, url: String },
}

/// Sends a request and waits for a response. Async, so implementors can
/// hand off to an executor instead of blocking a kernel thread.
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

type Handler = Arc<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

/// A client with no network: requests are dispatched to handlers
/// registered by `(method, url)`, which is all the in-process test suite
/// and demos need.
#[derive(Clone, Default)]
pub struct InMemoryClient {
    handlers: Arc<Mutex<BTreeMap<(String, String), Handler>>>,
}

impl InMemoryClient {
    pub fn new() -> Self {
        InMemoryClient::default()
    }

    pub fn register(
        &self,
        method: impl Into<String>,
        url: impl Into<String>,
        handler: impl Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
    ) {
        self.handlers
            .lock()
            .unwrap()
            .insert((method.into(), url.into()), Arc::new(handler));
    }
}

#[async_trait::async_trait]
impl HttpClient for InMemoryClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let key = (request.method.clone(), request.url.clone());
        let handler = self.handlers.lock().unwrap().get(&key).cloned();
        match handler {
            Some(handler) => Ok(handler(&request)),
            None => Err(HttpError::NoHandler {
                method: request.method,
                url: request.url,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registered_handler_answers_matching_request() {
        let client = InMemoryClient::new();
        client.register("GET", "/status", |_req| HttpResponse {
            status: 200,
            headers: BTreeMap::new(),
            body: b"ok".to_vec(),
        });

        let response = client.send(HttpRequest::get("/status")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"ok");
    }

    #[tokio::test]
    async fn unregistered_request_errors() {
        let client = InMemoryClient::new();
        let err = client.send(HttpRequest::get("/missing")).await.unwrap_err();
        assert!(matches!(err, HttpError::NoHandler { .. }));
    }
}
