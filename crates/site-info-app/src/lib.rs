//! Composition root for site-info.
//!
//! This crate wires fact providers + rules + outbound probes into the
//! assembled report, in the fixed display order the admin page uses.

use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use site_info_domain::{classify, ReportBuilder, Rule, VersionThreshold};
use site_info_host::{FactProvider, ServerFacts, SnapshotFacts};
use site_info_probe::{latest_platform_version, probed_tls_protocol, HttpFetcher};
use site_info_render::escape_html;
use site_info_types::{
    facts, ExtensionInfo, Fact, Markup, PlatformSnapshot, Report, ReportMeta, ServerEnv,
    SiteInfoError, Status, Verdict, TOOL_NAME,
};

/// Section titles in display order.
pub mod sections {
    pub const INSTALLED_VERSION: &str = "Installed Version";
    pub const DATABASE: &str = "Database";
    pub const THEMES: &str = "Installed Themes";
    pub const PLUGINS: &str = "Installed Plugins";
    pub const PATHS_AND_URLS: &str = "Paths and URLs";
    pub const OPERATING_SYSTEM: &str = "Operating System";
    pub const SERVER_SOFTWARE: &str = "Server Software";
    pub const PROTOCOL: &str = "Protocol";
    pub const PORT: &str = "Port";
    pub const SSL: &str = "SSL";
    pub const HTTPS: &str = "HTTPS";
    pub const HTTP_CLIENT: &str = "HTTP Client";
    pub const TRANSPORTS: &str = "Supported Transports";
    pub const RUNTIME: &str = "Runtime";
}

const INACTIVE_THEME_TOOLTIP: &str = "This theme is inactive. As a security precaution, it is \
    strongly recommended to delete unused themes, rather than leave them deactivated on the site.";
const INACTIVE_PLUGIN_TOOLTIP: &str = "This plugin is deactivated. As a security precaution, it \
    is strongly recommended to delete unused plugins, rather than leave them deactivated on the \
    site.";
const UPDATE_TOOLTIP: &str = "For maximum security and stability, please update your site to \
    the latest version.";
const HTTPS_TOOLTIP: &str = "Data sent over this connection can be read by outside parties. \
    Using a secure HTTPS connection provides encryption while transmitting data. It is strongly \
    recommended to update your site to only use HTTPS secure connections.";

/// Version thresholds for the language runtime.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeThresholds {
    pub min_version: String,
    pub hard_min_version: String,
    pub eol_date: NaiveDate,
}

impl Default for RuntimeThresholds {
    fn default() -> Self {
        Self {
            min_version: "7.0".into(),
            hard_min_version: "5.6".into(),
            eol_date: NaiveDate::from_ymd_opt(2019, 1, 1).expect("valid default eol date"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub timeout_secs: u64,
    pub version_check_url: String,
    pub tls_check_url: String,
    pub offline: bool,
    pub runtime: RuntimeThresholds,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 3,
            version_check_url: "https://api.wordpress.org/core/version-check/1.7/".into(),
            tls_check_url: "https://www.howsmyssl.com/a/check".into(),
            offline: false,
            runtime: RuntimeThresholds::default(),
        }
    }
}

/// Load `site-info.toml`. A missing path means defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&text).with_context(|| "parse site-info.toml")?;
    Ok(cfg)
}

/// Generate the full report for one request.
///
/// `fetcher` is `None` when running offline; affected entries degrade to
/// warnings instead of blocking the report.
pub fn generate_report(
    snapshot: &PlatformSnapshot,
    env: &ServerEnv,
    fetcher: Option<&dyn HttpFetcher>,
    config: &AppConfig,
    now: DateTime<Utc>,
) -> Result<Report, SiteInfoError> {
    let snap_facts = SnapshotFacts::new(snapshot);
    let server_facts = ServerFacts::new(env);

    let mut builder = ReportBuilder::new(ReportMeta {
        generator: TOOL_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        generated_at: now,
        platform: snapshot.platform.clone(),
    });

    add_platform_version(&mut builder, snapshot, &snap_facts, fetcher, config)?;
    add_database(&mut builder, &snap_facts)?;
    add_extensions(&mut builder, sections::THEMES, &snapshot.themes, INACTIVE_THEME_TOOLTIP)?;
    add_extensions(&mut builder, sections::PLUGINS, &snapshot.plugins, INACTIVE_PLUGIN_TOOLTIP)?;
    add_paths(&mut builder, &snap_facts)?;
    add_server(&mut builder, &server_facts, fetcher, config)?;
    add_runtime(&mut builder, &server_facts, config, now)?;

    builder.finish()
}

fn add_platform_version(
    builder: &mut ReportBuilder,
    snapshot: &PlatformSnapshot,
    snap_facts: &SnapshotFacts<'_>,
    fetcher: Option<&dyn HttpFetcher>,
    config: &AppConfig,
) -> Result<(), SiteInfoError> {
    let fact = snap_facts.fetch(facts::PLATFORM_VERSION);

    let Some(version) = fact.value.clone() else {
        let rule = Rule::presence("Platform version not detected.");
        return builder.add_entry(sections::INSTALLED_VERSION, &fact, &rule);
    };

    let latest = fetcher.and_then(|f| latest_platform_version(f, &config.version_check_url));
    let Some(latest) = latest else {
        let verdict = Verdict::warning(
            version,
            "Unable to check the latest available version.",
        );
        return builder.add_verdict(sections::INSTALLED_VERSION, &fact.label, verdict);
    };

    let mut verdict = classify(&fact, &Rule::equals(latest, UPDATE_TOOLTIP));
    if verdict.status == Status::Warning {
        if let Some(update_url) = snapshot.update_url.as_deref() {
            verdict.message = Markup::Html(format!(
                "{} [<a href=\"{}\">Update Recommended</a>]",
                escape_html(&version),
                escape_html(update_url)
            ));
        }
    }
    builder.add_verdict(sections::INSTALLED_VERSION, &fact.label, verdict)
}

fn add_database(
    builder: &mut ReportBuilder,
    snap_facts: &SnapshotFacts<'_>,
) -> Result<(), SiteInfoError> {
    for (key, tooltip) in [
        (facts::DB_HOST, "Database host not detected."),
        (facts::DB_PREFIX, "Database prefix not detected."),
        (facts::DB_CHARSET, "Database charset not detected."),
        (facts::DB_COLLATION, "Database collation not detected."),
    ] {
        let fact = snap_facts.fetch(key);
        builder.add_entry(sections::DATABASE, &fact, &Rule::presence(tooltip))?;
    }

    // Server banner only shows when the driver reported one.
    let server = snap_facts.fetch(facts::DB_SERVER);
    if server.value.is_some() {
        builder.add_entry(
            sections::DATABASE,
            &server,
            &Rule::presence("Database server not detected."),
        )?;
    }
    Ok(())
}

fn add_extensions(
    builder: &mut ReportBuilder,
    section: &str,
    extensions: &[ExtensionInfo],
    inactive_tooltip: &str,
) -> Result<(), SiteInfoError> {
    let source = if section == sections::THEMES {
        facts::THEME
    } else {
        facts::PLUGIN
    };
    let rule = Rule::equals("active", inactive_tooltip);

    for ext in extensions {
        let state = if ext.active { "active" } else { "inactive" };
        let fact = Fact::new(ext.name.clone(), Some(state.to_string()), source);
        let mut verdict = classify(&fact, &rule);
        verdict.message = Markup::Text(format!(
            "{} [{}] by {}",
            ext.name, ext.version, ext.author
        ));
        builder.add_verdict(section, &ext.name, verdict)?;
    }
    Ok(())
}

fn add_paths(
    builder: &mut ReportBuilder,
    snap_facts: &SnapshotFacts<'_>,
) -> Result<(), SiteInfoError> {
    for (key, tooltip) in [
        (facts::PATH_SITE, "Website path not detected."),
        (facts::PATH_THEME, "Theme path not detected."),
        (facts::PATH_UPLOADS, "Uploads path not detected."),
        (facts::URL_SITE, "Website URL not detected."),
        (facts::URL_THEME, "Theme URL not detected."),
        (facts::URL_UPLOADS, "Uploads URL not detected."),
    ] {
        let fact = snap_facts.fetch(key);
        builder.add_entry(sections::PATHS_AND_URLS, &fact, &Rule::presence(tooltip))?;
    }
    Ok(())
}

fn add_server(
    builder: &mut ReportBuilder,
    server_facts: &ServerFacts<'_>,
    fetcher: Option<&dyn HttpFetcher>,
    config: &AppConfig,
) -> Result<(), SiteInfoError> {
    builder.add_entry(
        sections::OPERATING_SYSTEM,
        &server_facts.fetch(facts::SERVER_OS),
        &Rule::presence("Operating system could not be determined."),
    )?;
    builder.add_entry(
        sections::SERVER_SOFTWARE,
        &server_facts.fetch(facts::SERVER_SOFTWARE),
        &Rule::presence("Server software could not be determined."),
    )?;
    builder.add_entry(
        sections::PROTOCOL,
        &server_facts.fetch(facts::SERVER_PROTOCOL),
        &Rule::presence("Server protocol not detected."),
    )?;
    builder.add_entry(
        sections::PORT,
        &server_facts.fetch(facts::SERVER_PORT),
        &Rule::presence("Server port not detected."),
    )?;

    builder.add_entry(
        sections::SSL,
        &server_facts.fetch(facts::TLS_LIBRARY),
        &Rule::presence("Unable to determine SSL version."),
    )?;

    // The server-reported protocol wins; the outbound probe only fills the
    // gap when the server says nothing.
    let protocol = server_facts
        .reported_tls_protocol()
        .or_else(|| fetcher.and_then(|f| probed_tls_protocol(f, &config.tls_check_url)));
    let protocol_fact = Fact::new("Protocol", protocol, facts::TLS_PROTOCOL);
    builder.add_entry(
        sections::SSL,
        &protocol_fact,
        &Rule::presence("Unable to determine SSL protocol."),
    )?;

    let https = if server_facts.https_enabled() {
        Verdict::ok("Enabled")
    } else {
        Verdict::warning("Not Used", HTTPS_TOOLTIP)
    };
    builder.add_verdict(sections::HTTPS, "HTTPS", https)?;

    builder.add_entry(
        sections::HTTP_CLIENT,
        &server_facts.fetch(facts::HTTP_CLIENT),
        &Rule::presence("Outbound HTTP client is not enabled."),
    )?;

    let transports = server_facts.transports();
    if transports.is_empty() {
        builder.add_verdict(
            sections::TRANSPORTS,
            "Transports",
            Verdict::warning("None detected.", "No data transports detected."),
        )?;
    } else {
        for transport in transports {
            let fact = Fact::new(transport.clone(), Some(transport.clone()), facts::TRANSPORT);
            builder.add_entry(
                sections::TRANSPORTS,
                &fact,
                &Rule::presence("Transport not detected."),
            )?;
        }
    }
    Ok(())
}

fn add_runtime(
    builder: &mut ReportBuilder,
    server_facts: &ServerFacts<'_>,
    config: &AppConfig,
    now: DateTime<Utc>,
) -> Result<(), SiteInfoError> {
    let fact = server_facts.fetch(facts::RUNTIME_VERSION);
    builder.add_entry(
        sections::RUNTIME,
        &fact,
        &Rule::presence("Runtime version not detected."),
    )?;

    // A second row appears only when the version is below threshold,
    // mirroring the admin page's WARNING/NOTICE item.
    if fact.value.is_some() {
        let rule = Rule::VersionThreshold(VersionThreshold {
            min_version: config.runtime.min_version.clone(),
            hard_min_version: config.runtime.hard_min_version.clone(),
            eol_date: config.runtime.eol_date,
            now,
        });
        let verdict = classify(&fact, &rule);
        if verdict.status != Status::Ok {
            builder.add_verdict(sections::RUNTIME, "Notice", verdict)?;
        }
    }
    Ok(())
}

/// Build a fetcher honoring config timeout, or `None` when offline.
pub fn make_fetcher(config: &AppConfig) -> anyhow::Result<Option<site_info_probe::BlockingFetcher>> {
    if config.offline {
        return Ok(None);
    }
    let timeout = std::time::Duration::from_secs(config.timeout_secs);
    Ok(Some(site_info_probe::BlockingFetcher::new(timeout)?))
}

/// Write a file atomically: write temp + rename.
///
/// This avoids partial artifacts when the admin panel reads concurrently.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let parent = path.parent().context("no parent dir")?;
    fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
