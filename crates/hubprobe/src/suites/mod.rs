//! Probe suites
//!
//! Each suite is a fixed sequence of remote calls. Steps that depend on an
//! identifier produced earlier (room code, invitation id, ...) are skipped
//! when that identifier never showed up.

use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::client::{FunctionsClient, ProbeResponse, RemoteFunction};
use crate::config::{Fixtures, ProbeConfig};
use crate::diagnosis::Diagnosis;
use crate::envelope::Envelope;
use crate::error::Result;
use crate::report::{CheckResult, SuiteReport};

mod connectivity;
mod fixes;
mod friends;
mod inventory;
mod maintenance;
mod manual_join;
mod rooms;
mod schema;
mod workflow;

/// Shared state handed to every suite
#[derive(Debug, Clone)]
pub struct ProbeContext {
    pub client: FunctionsClient,
    pub fixtures: Fixtures,
}

impl ProbeContext {
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        Ok(Self {
            client: FunctionsClient::new(config)?,
            fixtures: config.fixtures.clone(),
        })
    }
}

/// Available suites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Suite {
    Connectivity,
    Friends,
    Rooms,
    Core,
    Fixes,
    ManualJoin,
    Schema,
    Children,
    Tables,
    DebugSchema,
    ReloadSchema,
    FixSchema,
    Variants,
}

impl Suite {
    pub const ALL: [Suite; 13] = [
        Suite::Connectivity,
        Suite::Friends,
        Suite::Rooms,
        Suite::Core,
        Suite::Fixes,
        Suite::ManualJoin,
        Suite::Schema,
        Suite::Children,
        Suite::Tables,
        Suite::DebugSchema,
        Suite::ReloadSchema,
        Suite::FixSchema,
        Suite::Variants,
    ];

    /// The full backend pass
    pub const FULL_PASS: [Suite; 3] = [Suite::Connectivity, Suite::Friends, Suite::Rooms];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Connectivity => "connectivity",
            Self::Friends => "friends",
            Self::Rooms => "rooms",
            Self::Core => "core",
            Self::Fixes => "fixes",
            Self::ManualJoin => "manual-join",
            Self::Schema => "schema",
            Self::Children => "children",
            Self::Tables => "tables",
            Self::DebugSchema => "debug-schema",
            Self::ReloadSchema => "reload-schema",
            Self::FixSchema => "fix-schema",
            Self::Variants => "variants",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Connectivity => "Function connectivity",
            Self::Friends => "Friends management",
            Self::Rooms => "Game rooms management",
            Self::Core => "Core room workflow",
            Self::Fixes => "Game rooms fixes",
            Self::ManualJoin => "Manual join fixes",
            Self::Schema => "Schema relationship",
            Self::Children => "Available children",
            Self::Tables => "Table structure",
            Self::DebugSchema => "Schema debug info",
            Self::ReloadSchema => "Schema cache reload",
            Self::FixSchema => "Schema fix",
            Self::Variants => "Function variants",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|suite| suite.name() == name)
    }

    /// Whether running the suite writes to the remote database schema
    pub fn mutates_schema(&self) -> bool {
        matches!(self, Self::ReloadSchema | Self::FixSchema)
    }

    pub async fn run(&self, ctx: &ProbeContext) -> SuiteReport {
        let report = match self {
            Self::Connectivity => connectivity::run(ctx).await,
            Self::Friends => friends::run(ctx).await,
            Self::Rooms => rooms::run(ctx).await,
            Self::Core => workflow::run(ctx).await,
            Self::Fixes => fixes::run(ctx).await,
            Self::ManualJoin => manual_join::run(ctx).await,
            Self::Schema => schema::run(ctx).await,
            Self::Children => inventory::run(ctx).await,
            Self::Tables => maintenance::tables(ctx).await,
            Self::DebugSchema => maintenance::debug_schema(ctx).await,
            Self::ReloadSchema => maintenance::reload_schema(ctx).await,
            Self::FixSchema => maintenance::fix_schema(ctx).await,
            Self::Variants => maintenance::variants(ctx).await,
        };
        report.finish()
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================
// Shared call helpers
// ============================================

/// What came back from one remote call
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    /// 200 with `success: true`
    Success(Envelope),
    /// 200 with `success` absent or false
    Rejected(Envelope),
    /// Any status other than 200
    HttpError(ProbeResponse),
    /// 200 whose body is not a JSON object
    Malformed(ProbeResponse),
    /// The request never completed
    Transport(String),
}

impl Outcome {
    pub(crate) fn from_response(resp: ProbeResponse) -> Self {
        if !resp.is_ok() {
            return Self::HttpError(resp);
        }
        match resp.envelope() {
            Some(env) if env.succeeded() => Self::Success(env),
            Some(env) => Self::Rejected(env),
            None => Self::Malformed(resp),
        }
    }

    /// Envelope of a 200 response, whatever its `success` flag
    pub(crate) fn envelope(&self) -> Option<&Envelope> {
        match self {
            Self::Success(env) | Self::Rejected(env) => Some(env),
            _ => None,
        }
    }

    /// Text worth running through [`Diagnosis::classify`]
    pub(crate) fn error_text(&self) -> Option<String> {
        match self {
            Self::Success(_) => None,
            Self::Rejected(env) => Some(env.error_or_unknown()),
            Self::HttpError(resp) | Self::Malformed(resp) => Some(resp.body.clone()),
            Self::Transport(e) => Some(e.clone()),
        }
    }

    pub(crate) fn diagnosis(&self) -> Option<Diagnosis> {
        self.error_text().map(|text| Diagnosis::classify(&text))
    }

    /// Record the outcome on `check`, passing it on success
    pub(crate) fn record(self, check: &mut CheckResult, label: &str) -> Option<Envelope> {
        match self {
            Self::Success(env) => {
                check.pass();
                Some(env)
            }
            Self::Rejected(env) => {
                check.fail(format!("{} failed: {}", label, env.error_or_unknown()));
                None
            }
            Self::HttpError(resp) => {
                check.fail(format!("{} HTTP error: {}", label, resp.status));
                None
            }
            Self::Malformed(_) => {
                check.fail(format!("{} returned malformed response", label));
                None
            }
            Self::Transport(e) => {
                check.fail(format!("{} exception: {}", label, e));
                None
            }
        }
    }
}

/// Invoke a remote function; transport failures become an [`Outcome`]
pub(crate) async fn call<T: Serialize + ?Sized>(
    ctx: &ProbeContext,
    function: RemoteFunction,
    payload: &T,
) -> Outcome {
    match ctx.client.invoke(function, payload).await {
        Ok(resp) => Outcome::from_response(resp),
        Err(e) => {
            warn!(function = %function, error = %e, "Remote call failed");
            Outcome::Transport(e.to_string())
        }
    }
}

/// Invoke and record in one step
pub(crate) async fn expect_success<T: Serialize + ?Sized>(
    ctx: &ProbeContext,
    check: &mut CheckResult,
    label: &str,
    function: RemoteFunction,
    payload: &T,
) -> Option<Envelope> {
    call(ctx, function, payload).await.record(check, label)
}

pub(crate) fn random_child_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
