//! Outbound checks: latest platform version and TLS protocol.
//!
//! This crate is written as an adapter boundary: the network lives behind a
//! small trait so report generation can run without it. Every probe degrades
//! to `None` on timeout or error — a stale or missing fact is acceptable,
//! a report that fails to render is not.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use site_info_types::SiteInfoError;

/// Default bound on any single outbound request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

pub trait HttpFetcher: Send + Sync {
    fn get_json(&self, url: &str) -> Result<serde_json::Value, SiteInfoError>;
}

/// Real fetcher over a blocking reqwest client with an explicit timeout.
pub struct BlockingFetcher {
    client: reqwest::blocking::Client,
}

impl BlockingFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self { client })
    }
}

impl HttpFetcher for BlockingFetcher {
    fn get_json(&self, url: &str) -> Result<serde_json::Value, SiteInfoError> {
        let response = self.client.get(url).send().map_err(classify_reqwest)?;
        response.json().map_err(classify_reqwest)
    }
}

fn classify_reqwest(err: reqwest::Error) -> SiteInfoError {
    if err.is_timeout() {
        SiteInfoError::OutboundTimeout(err.to_string())
    } else {
        SiteInfoError::OutboundError(err.to_string())
    }
}

/// Latest available platform version from the platform's version-check API.
///
/// Expects the version-check shape: `{"offers": [{"version": "..."}]}`.
/// `None` on any failure; the caller substitutes a warning row.
pub fn latest_platform_version(fetcher: &dyn HttpFetcher, url: &str) -> Option<String> {
    let body = fetcher.get_json(url).ok()?;
    body.get("offers")?
        .as_array()?
        .first()?
        .get("version")?
        .as_str()
        .map(str::to_string)
}

/// Negotiated TLS protocol according to a third-party probe
/// (`{"tls_version": "TLS 1.3", ...}`), used only when the server itself
/// reports nothing.
pub fn probed_tls_protocol(fetcher: &dyn HttpFetcher, url: &str) -> Option<String> {
    let body = fetcher.get_json(url).ok()?;
    body.get("tls_version")?.as_str().map(str::to_string)
}

// =============================================================================
// LOGGING FETCHER (DECORATOR)
// =============================================================================

/// A writer trait that can be used to write debug logs.
pub trait DebugLogWriter: Send + Sync {
    fn write_line(&self, line: &str);
    fn flush(&self);
}

/// A file-based debug log writer.
pub struct FileLogWriter {
    file: Mutex<std::fs::File>,
}

impl FileLogWriter {
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl DebugLogWriter for FileLogWriter {
    fn write_line(&self, line: &str) {
        if let Ok(mut f) = self.file.lock() {
            let _ = writeln!(f, "{}", line);
        }
    }

    fn flush(&self) {
        if let Ok(mut f) = self.file.lock() {
            let _ = f.flush();
        }
    }
}

impl<W: DebugLogWriter> DebugLogWriter for &W {
    fn write_line(&self, line: &str) {
        (*self).write_line(line)
    }

    fn flush(&self) {
        (*self).flush()
    }
}

/// Logs every outbound request and its outcome. The debug log is a side
/// artifact and does NOT affect report content (determinism preserved).
pub struct LoggingFetcher<F: HttpFetcher, W: DebugLogWriter> {
    inner: F,
    writer: W,
}

impl<F: HttpFetcher, W: DebugLogWriter> LoggingFetcher<F, W> {
    pub fn new(inner: F, writer: W) -> Self {
        let timestamp = chrono::Utc::now().to_rfc3339();
        writer.write_line("# site-info probe debug log");
        writer.write_line(&format!("# started: {}", timestamp));
        writer.write_line("");
        Self { inner, writer }
    }
}

impl<F: HttpFetcher, W: DebugLogWriter> HttpFetcher for LoggingFetcher<F, W> {
    fn get_json(&self, url: &str) -> Result<serde_json::Value, SiteInfoError> {
        let timestamp = chrono::Utc::now().to_rfc3339();
        self.writer.write_line(&format!("[{}] GET {}", timestamp, url));

        let result = self.inner.get_json(url);

        match &result {
            Ok(body) => {
                let preview = truncate_for_log(&body.to_string(), 200);
                self.writer.write_line(&format!("  ok: {}", preview));
            }
            Err(e) => {
                self.writer.write_line(&format!("  error: {}", e));
            }
        }

        self.writer.write_line("");
        self.writer.flush();

        result
    }
}

fn truncate_for_log(s: &str, max_len: usize) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.chars().count() <= max_len {
        trimmed.to_string()
    } else {
        // Truncate by characters, not bytes, so multibyte bodies can't split.
        let head: String = trimmed.chars().take(max_len).collect();
        format!("{}...", head)
    }
}

/// Fake/test adapters for use in other crates' tests.
pub mod fakes {
    use super::*;
    use std::collections::HashMap;

    /// Returns canned JSON bodies per URL; unknown URLs fail with an
    /// outbound error.
    pub struct FakeFetcher {
        responses: HashMap<String, serde_json::Value>,
        fail_with_timeout: bool,
    }

    impl FakeFetcher {
        pub fn new() -> Self {
            Self {
                responses: HashMap::new(),
                fail_with_timeout: false,
            }
        }

        pub fn with_response(mut self, url: impl Into<String>, body: serde_json::Value) -> Self {
            self.responses.insert(url.into(), body);
            self
        }

        /// Every request times out, regardless of canned responses.
        pub fn timing_out() -> Self {
            Self {
                responses: HashMap::new(),
                fail_with_timeout: true,
            }
        }
    }

    impl Default for FakeFetcher {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HttpFetcher for FakeFetcher {
        fn get_json(&self, url: &str) -> Result<serde_json::Value, SiteInfoError> {
            if self.fail_with_timeout {
                return Err(SiteInfoError::OutboundTimeout(url.to_string()));
            }
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| SiteInfoError::OutboundError(format!("no route to {}", url)))
        }
    }

    /// Collects log lines in memory for assertions.
    #[derive(Default)]
    pub struct BufferLogWriter {
        pub lines: Mutex<Vec<String>>,
    }

    impl DebugLogWriter for BufferLogWriter {
        fn write_line(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_string());
        }

        fn flush(&self) {}
    }
}
