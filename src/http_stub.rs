//! Canned HTTP responder for adapter tests.
//!
//! Binds `127.0.0.1:0`, answers every request with one fixed response, and
//! records what it received.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode, Uri};
use axum::Router;

#[derive(Debug, Clone)]
pub struct StubRequest {
    pub method: String,
    pub path_and_query: String,
    pub body: String,
}

pub struct StubServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<StubRequest>>>,
}

impl StubServer {
    /// Must be called from inside a tokio runtime.
    pub async fn start(status: StatusCode, content_type: &'static str, body: &'static str) -> Self {
        let requests: Arc<Mutex<Vec<StubRequest>>> = Arc::default();
        let seen = requests.clone();

        let app = Router::new().fallback(move |method: Method, uri: Uri, payload: Bytes| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(StubRequest {
                    method: method.to_string(),
                    path_and_query: uri
                        .path_and_query()
                        .map(|p| p.as_str().to_string())
                        .unwrap_or_default(),
                    body: String::from_utf8_lossy(&payload).into_owned(),
                });
                (status, [(CONTENT_TYPE, content_type)], body)
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().unwrap().clone()
    }
}
