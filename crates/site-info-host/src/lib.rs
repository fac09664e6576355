//! Fact providers over the injected host snapshot and server environment.
//!
//! All environment reads go through this one seam so tests can substitute
//! their own snapshots. `fetch` never fails: missing data yields a fact with
//! `value = None`, and the caller's rule turns that into a warning row.

use site_info_types::{facts, Fact, PlatformSnapshot, ServerEnv};

/// Pulls a single piece of environment data from the host by stable key.
pub trait FactProvider {
    fn fetch(&self, key: &str) -> Fact;
}

/// Facts derived from the platform snapshot (version, database, paths, URLs).
pub struct SnapshotFacts<'a> {
    snapshot: &'a PlatformSnapshot,
}

impl<'a> SnapshotFacts<'a> {
    pub fn new(snapshot: &'a PlatformSnapshot) -> Self {
        Self { snapshot }
    }
}

impl FactProvider for SnapshotFacts<'_> {
    fn fetch(&self, key: &str) -> Fact {
        let snap = self.snapshot;
        let (label, value) = match key {
            facts::PLATFORM_VERSION => ("Installed Version", snap.version.clone()),
            facts::DB_HOST => ("Host", snap.database.host.clone()),
            facts::DB_PREFIX => ("Prefix", snap.database.prefix.clone()),
            facts::DB_CHARSET => ("Charset", snap.database.charset.clone()),
            facts::DB_COLLATION => ("Collation", snap.database.collation.clone()),
            facts::DB_SERVER => ("Type", snap.database.server.clone()),
            facts::PATH_SITE => ("Website Path", snap.paths.site.clone()),
            facts::PATH_THEME => ("Theme Path", snap.paths.theme.clone()),
            facts::PATH_UPLOADS => ("Uploads Path", snap.paths.uploads.clone()),
            facts::URL_SITE => ("Website URL", snap.urls.site.clone()),
            facts::URL_THEME => ("Theme URL", snap.urls.theme.clone()),
            facts::URL_UPLOADS => ("Uploads URL", snap.urls.uploads.clone()),
            other => (other, None),
        };
        Fact::new(label, value.filter(|v| !v.is_empty()), key)
    }
}

/// Facts derived from the server environment and runtime info.
///
/// The fallback orders below look ad hoc, and they are: they mirror the
/// deployment conventions the original detection logic relied on, in the
/// same fixed priority, and are covered by tests to keep them that way.
pub struct ServerFacts<'a> {
    env: &'a ServerEnv,
}

impl<'a> ServerFacts<'a> {
    pub fn new(env: &'a ServerEnv) -> Self {
        Self { env }
    }

    /// `SERVER_SOFTWARE`, else `SERVER_SIGNATURE` with its address tags
    /// stripped, else missing.
    pub fn server_software(&self) -> Option<String> {
        if let Some(software) = self.env.var("SERVER_SOFTWARE") {
            return Some(software.to_string());
        }
        self.env.var("SERVER_SIGNATURE").map(|sig| {
            sig.replace("<address>", "")
                .replace("</address>", "")
                .trim()
                .to_string()
        })
    }

    /// `HTTPS` non-empty, else `REQUEST_SCHEME == "https"`, else
    /// `HTTP_X_FORWARDED_PROTO == "https"`.
    pub fn https_enabled(&self) -> bool {
        self.env.var("HTTPS").is_some()
            || self.env.var("REQUEST_SCHEME") == Some("https")
            || self.env.var("HTTP_X_FORWARDED_PROTO") == Some("https")
    }

    /// `SSL_VERSION_LIBRARY`, else the TLS library the runtime was built
    /// against.
    pub fn tls_library(&self) -> Option<String> {
        self.env
            .var("SSL_VERSION_LIBRARY")
            .map(str::to_string)
            .or_else(|| self.env.runtime.tls_library.clone())
    }

    /// `SSL_PROTOCOL` as reported by the server itself. When absent the
    /// caller may fall back to an outbound probe.
    pub fn reported_tls_protocol(&self) -> Option<String> {
        self.env.var("SSL_PROTOCOL").map(str::to_string)
    }

    pub fn transports(&self) -> &[String] {
        &self.env.runtime.transports
    }
}

impl FactProvider for ServerFacts<'_> {
    fn fetch(&self, key: &str) -> Fact {
        let rt = &self.env.runtime;
        let (label, value) = match key {
            facts::SERVER_OS => ("Operating System", rt.os.clone()),
            facts::SERVER_SOFTWARE => ("Server Software", self.server_software()),
            facts::SERVER_PROTOCOL => {
                ("Protocol", self.env.var("SERVER_PROTOCOL").map(str::to_string))
            }
            facts::SERVER_PORT => ("Port", self.env.var("SERVER_PORT").map(str::to_string)),
            facts::TLS_LIBRARY => ("Supported", self.tls_library()),
            facts::TLS_PROTOCOL => ("Protocol", self.reported_tls_protocol()),
            facts::RUNTIME_VERSION => ("Version", rt.version.clone()),
            facts::HTTP_CLIENT => ("HTTP Client", rt.http_client_version.clone()),
            other => (other, None),
        };
        Fact::new(label, value.filter(|v| !v.is_empty()), key)
    }
}
