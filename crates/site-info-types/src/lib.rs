//! Shared DTOs and stable fact keys for site-info.
//!
//! This crate is deliberately boring: it should be safe to depend on from
//! any layer (domain, renderers, adapters).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TOOL_NAME: &str = "site-info";
pub const SCHEMA_ID: &str = "site-info.report.v1";

/// Status indicator attached to every report entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Warning,
    Flag,
}

impl Status {
    pub fn rank(&self) -> u8 {
        match self {
            Status::Flag => 3,
            Status::Warning => 2,
            Status::Ok => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Warning => "warning",
            Status::Flag => "flag",
        }
    }
}

/// A single piece of observed environment data.
///
/// Immutable once produced. A missing observation is `value: None`, never an
/// error: the report must always render, even with partial data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fact {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Stable key of the provider that produced this fact (see [`facts`]).
    pub source: String,
}

impl Fact {
    pub fn new(label: impl Into<String>, value: Option<String>, source: &str) -> Self {
        Self {
            label: label.into(),
            value,
            source: source.to_string(),
        }
    }

    pub fn missing(label: impl Into<String>, source: &str) -> Self {
        Self::new(label, None, source)
    }
}

/// Display text for a report entry.
///
/// `Text` is escaped by renderers that target markup; `Html` is pre-formatted
/// markup produced by the core itself (e.g. the "Update Recommended" link)
/// and passes through verbatim. Host-influenced strings must never be wrapped
/// in `Html`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Markup {
    Text(String),
    Html(String),
}

impl Markup {
    pub fn text(s: impl Into<String>) -> Self {
        Markup::Text(s.into())
    }

    /// The raw inner string, regardless of kind.
    pub fn as_str(&self) -> &str {
        match self {
            Markup::Text(s) | Markup::Html(s) => s,
        }
    }
}

/// Classification outcome for one fact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    pub status: Status,
    /// Explanatory hover text; empty only for unremarkable `Ok` entries.
    pub tooltip: String,
    pub message: Markup,
}

impl Verdict {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            tooltip: String::new(),
            message: Markup::Text(message.into()),
        }
    }

    pub fn warning(message: impl Into<String>, tooltip: impl Into<String>) -> Self {
        Self {
            status: Status::Warning,
            tooltip: tooltip.into(),
            message: Markup::Text(message.into()),
        }
    }

    pub fn flag(message: impl Into<String>, tooltip: impl Into<String>) -> Self {
        Self {
            status: Status::Flag,
            tooltip: tooltip.into(),
            message: Markup::Text(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportEntry {
    pub label: String,
    pub verdict: Verdict,
}

/// A titled group of entries. Insertion order mirrors display order and is
/// preserved through serialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportSection {
    pub title: String,
    pub entries: Vec<ReportEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub ok: u32,
    pub warning: u32,
    pub flag: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportMeta {
    pub generator: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
    /// Display name of the host platform ("WordPress", "ClassicPress", ...).
    pub platform: String,
}

/// The root artifact: generated fresh on every request, no persisted
/// identity, no lifecycle beyond a single render call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Report {
    pub schema: String,
    pub meta: ReportMeta,
    pub sections: Vec<ReportSection>,
    pub counts: StatusCounts,
}

impl Report {
    /// True when no entry was classified `Flag`.
    pub fn is_clean(&self) -> bool {
        self.counts.flag == 0
    }
}

// ---------------------------------------------------------------------------
// Host snapshot input
// ---------------------------------------------------------------------------

/// One installed extension (theme or plugin), fixed-shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtensionInfo {
    pub name: String,
    pub version: String,
    pub author: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DatabaseInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    /// Server banner as reported by the database driver, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PathInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploads: Option<String>,
}

/// Read-only snapshot of the host platform's state, handed to the core by
/// the embedding admin panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformSnapshot {
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub database: DatabaseInfo,
    /// Appearance extensions (themes).
    #[serde(default)]
    pub themes: Vec<ExtensionInfo>,
    /// Functional extensions (plugins).
    #[serde(default)]
    pub plugins: Vec<ExtensionInfo>,
    #[serde(default)]
    pub paths: PathInfo,
    #[serde(default)]
    pub urls: PathInfo,
    /// Where the admin should go to update the platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_url: Option<String>,
}

/// Language-runtime facts the host process can observe about itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RuntimeInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// `uname`-style description of the server operating system.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    /// TLS library compiled into the runtime (e.g. an OpenSSL version text).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_library: Option<String>,
    /// Version of the runtime's outbound HTTP client capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_client_version: Option<String>,
    #[serde(default)]
    pub transports: Vec<String>,
}

/// The process environment: request metadata and server variables, plus
/// runtime info. Keys follow the CGI convention (`SERVER_SOFTWARE`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ServerEnv {
    #[serde(default)]
    pub vars: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub runtime: RuntimeInfo,
}

impl ServerEnv {
    /// Non-empty value of a server variable, or `None`.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SiteInfoError {
    #[error("missing fact: {0}")]
    MissingFact(String),
    #[error("outbound request timed out: {0}")]
    OutboundTimeout(String),
    #[error("outbound request failed: {0}")]
    OutboundError(String),
    #[error("report already finalized")]
    AlreadyFinalized,
}

/// Stable fact keys. Keep these stable; they appear in serialized reports.
pub mod facts {
    pub const PLATFORM_VERSION: &str = "platform.version";
    pub const PLATFORM_LATEST: &str = "platform.latest";

    pub const DB_HOST: &str = "database.host";
    pub const DB_PREFIX: &str = "database.prefix";
    pub const DB_CHARSET: &str = "database.charset";
    pub const DB_COLLATION: &str = "database.collation";
    pub const DB_SERVER: &str = "database.server";

    pub const PATH_SITE: &str = "path.site";
    pub const PATH_THEME: &str = "path.theme";
    pub const PATH_UPLOADS: &str = "path.uploads";
    pub const URL_SITE: &str = "url.site";
    pub const URL_THEME: &str = "url.theme";
    pub const URL_UPLOADS: &str = "url.uploads";

    pub const SERVER_OS: &str = "server.os";
    pub const SERVER_SOFTWARE: &str = "server.software";
    pub const SERVER_PROTOCOL: &str = "server.protocol";
    pub const SERVER_PORT: &str = "server.port";

    pub const TLS_LIBRARY: &str = "tls.library";
    pub const TLS_PROTOCOL: &str = "tls.protocol";
    pub const HTTPS: &str = "https";

    pub const RUNTIME_VERSION: &str = "runtime.version";
    pub const HTTP_CLIENT: &str = "runtime.http_client";
    pub const TRANSPORT: &str = "runtime.transport";

    pub const THEME: &str = "extension.theme";
    pub const PLUGIN: &str = "extension.plugin";
}
