//! Remote function client
//!
//! Thin wrapper over `reqwest` that knows the URL layout of the hosted
//! backend: edge functions under `/functions/v1`, PostgREST under `/rest/v1`.

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ProbeConfig;
use crate::envelope::Envelope;
use crate::error::Result;

/// Edge functions the probes talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteFunction {
    ManageFriends,
    ManageGameRooms,
    /// Variant of `manage-game-rooms` deployed without `join_requests` references
    ManageGameRoomsClean,
    FixSchema,
    TestSimple,
}

impl RemoteFunction {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::ManageFriends => "manage-friends",
            Self::ManageGameRooms => "manage-game-rooms",
            Self::ManageGameRoomsClean => "manage-game-rooms-clean",
            Self::FixSchema => "fix-schema",
            Self::TestSimple => "test-simple",
        }
    }
}

impl fmt::Display for RemoteFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Raw HTTP outcome of a probe request
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
}

impl ProbeResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Only a plain 200 counts as a usable answer
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn is_success_status(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// Parsed body when it is a JSON object
    pub fn envelope(&self) -> Option<Envelope> {
        self.json().and_then(Envelope::from_value)
    }

    pub fn body_contains(&self, needle: &str) -> bool {
        self.body.contains(needle)
    }
}

/// API client for the hosted backend
#[derive(Debug, Clone)]
pub struct FunctionsClient {
    client: Client,
    base_url: String,
    auth_token: String,
    publishable_key: Option<String>,
}

impl FunctionsClient {
    /// Create a client from configuration
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        let base_url = config.base_url()?;

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
            auth_token: config.auth_token.clone(),
            publishable_key: config.publishable_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn function_url(&self, function: RemoteFunction) -> String {
        format!("{}/functions/v1/{}", self.base_url, function.slug())
    }

    /// POST a JSON payload to an edge function
    pub async fn invoke<T: Serialize + ?Sized>(
        &self,
        function: RemoteFunction,
        payload: &T,
    ) -> Result<ProbeResponse> {
        let body = serde_json::to_value(payload)?;
        let action = body.get("action").and_then(Value::as_str).unwrap_or("-");
        info!(function = %function, action = %action, "Invoking remote function");

        let request = self
            .client
            .post(self.function_url(function))
            .header("Authorization", format!("Bearer {}", self.auth_token))
            .json(&body);

        self.send(request).await
    }

    /// GET a single sample row of a table
    pub async fn select_sample(&self, table: &str) -> Result<ProbeResponse> {
        let url = format!(
            "{}/rest/v1/{}?limit=1",
            self.base_url,
            urlencoding::encode(table)
        );
        info!(table = %table, "Sampling table over REST");

        let request = self.with_key(self.client.get(url));
        self.send(request).await
    }

    /// Call a database function exposed through PostgREST
    pub async fn rpc(&self, name: &str, args: &Value) -> Result<ProbeResponse> {
        info!(rpc = %name, "Calling RPC");
        self.rest_post(&format!("rpc/{}", urlencoding::encode(name)), args)
            .await
    }

    /// POST to an arbitrary path under `/rest/v1`
    pub async fn rest_post(&self, path: &str, body: &Value) -> Result<ProbeResponse> {
        let url = format!("{}/rest/v1/{}", self.base_url, path.trim_start_matches('/'));
        let request = self.with_key(self.client.post(url)).json(body);
        self.send(request).await
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.publishable_key {
            Some(key) => request
                .header("Authorization", format!("Bearer {}", key))
                .header("apikey", key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<ProbeResponse> {
        let resp = request.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        info!(status = %status, "Response received");
        debug!(body = %body, "Response body");

        Ok(ProbeResponse { status, body })
    }
}
