//! In-process mock of the hosted backend for suite tests

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::config::ProbeConfig;
use crate::suites::ProbeContext;

pub const TEST_KEY: &str = "anon-test-key";

/// A request as the mock saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub apikey: Option<String>,
    pub body: Value,
}

impl RecordedRequest {
    /// Function slug for `/functions/v1/<slug>` requests
    pub fn function(&self) -> Option<&str> {
        self.path.strip_prefix("/functions/v1/")
    }

    pub fn action(&self) -> Option<&str> {
        self.str_field("action")
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }
}

pub enum Reply {
    Json(u16, Value),
    Text(u16, String),
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self::Json(200, body)
    }

    pub fn status(status: u16, body: Value) -> Self {
        Self::Json(status, body)
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self::Text(status, body.to_string())
    }
}

type Responder = dyn Fn(&RecordedRequest) -> Reply + Send + Sync;

#[derive(Clone)]
struct MockState {
    responder: Arc<Responder>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct MockBackend {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockBackend {
    /// Bind to an ephemeral port and answer every request through `responder`
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
    {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            responder: Arc::new(responder),
            requests: requests.clone(),
        };
        let app = Router::new().fallback(handle).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            requests,
        }
    }

    pub fn config(&self) -> ProbeConfig {
        ProbeConfig {
            project_url: Some(self.url.clone()),
            publishable_key: Some(TEST_KEY.to_string()),
            timeout_secs: Some(5),
            ..Default::default()
        }
    }

    pub fn context(&self) -> ProbeContext {
        ProbeContext::new(&self.config()).unwrap()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `action` of every function call, in order
    pub fn actions(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| r.action().map(str::to_string))
            .collect()
    }
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let request = RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: header("authorization"),
        apikey: header("apikey"),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };

    let reply = (state.responder)(&request);
    state.requests.lock().unwrap().push(request);

    match reply {
        Reply::Json(status, body) => (status_code(status), Json(body)).into_response(),
        Reply::Text(status, body) => (status_code(status), body).into_response(),
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap()
}
