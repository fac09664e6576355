use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use site_info_app::{generate_report, load_config, make_fetcher, write_atomic};
use site_info_probe::{FileLogWriter, HttpFetcher, LoggingFetcher};
use site_info_render::{HtmlRenderer, PlainRenderer, Renderer};
use site_info_types::{PlatformSnapshot, ServerEnv};

#[derive(Parser, Debug)]
#[command(
    name = "site-info",
    version,
    about = "Render a diagnostic status report for a site's environment"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the full report from an environment snapshot.
    ///
    /// Reads a JSON snapshot of the platform and server environment, runs the
    /// outbound checks (unless --offline), and renders the report.
    #[command(
        after_help = "EXAMPLES:\n    site-info report --snapshot snapshot.json\n    site-info report --snapshot snapshot.json --format text --offline\n    site-info report --snapshot snapshot.json --format json --out artifacts/report.json"
    )]
    Report {
        /// Path to the environment snapshot JSON
        #[arg(long)]
        snapshot: PathBuf,

        /// Optional site-info.toml path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format: html|text|json
        #[arg(long, default_value = "html")]
        format: FormatArg,

        /// Output path (defaults to stdout)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Skip all outbound requests; affected rows degrade to warnings
        #[arg(long)]
        offline: bool,

        /// Enable debug logging (writes to artifacts/site-info/raw.log by default).
        /// This is a side artifact that does NOT affect report content.
        #[arg(long)]
        debug: bool,

        /// Custom debug log file path (implies --debug).
        /// Can also be set via SITE_INFO_DEBUG_LOG environment variable.
        #[arg(long, env = "SITE_INFO_DEBUG_LOG")]
        log_file: Option<PathBuf>,
    },

    /// Explain a report status (ok, warning, flag).
    #[command(
        after_help = "EXAMPLES:\n    site-info explain warning\n\nAVAILABLE STATUSES:\n    ok      - The check passed\n    warning - Attention recommended\n    flag    - Action required"
    )]
    Explain {
        /// The status to explain
        #[arg(value_name = "STATUS")]
        status: String,
    },
}

#[derive(Clone, Debug)]
enum FormatArg {
    Html,
    Text,
    Json,
}

impl std::str::FromStr for FormatArg {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" => Ok(FormatArg::Html),
            "text" => Ok(FormatArg::Text),
            "json" => Ok(FormatArg::Json),
            other => Err(format!("invalid format: {}", other)),
        }
    }
}

/// On-disk snapshot: what the host platform knows plus the request's
/// server environment.
#[derive(Debug, Deserialize)]
struct SnapshotFile {
    platform: PlatformSnapshot,
    #[serde(default)]
    server: ServerEnv,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Report {
            snapshot,
            config,
            format,
            out,
            offline,
            debug,
            log_file,
        } => {
            let bytes =
                fs::read(&snapshot).with_context(|| format!("read {}", snapshot.display()))?;
            let doc: SnapshotFile =
                serde_json::from_slice(&bytes).with_context(|| "parse snapshot JSON")?;

            let mut cfg = load_config(config.as_deref())?;
            cfg.offline = cfg.offline || offline;

            // Determine debug log path:
            // 1. Explicit --log-file takes precedence
            // 2. --debug flag uses default path
            // 3. Otherwise, no debug logging
            let debug_log_path = if let Some(path) = log_file {
                Some(path)
            } else if debug {
                Some(PathBuf::from("artifacts/site-info/raw.log"))
            } else {
                None
            };

            let fetcher: Option<Box<dyn HttpFetcher>> =
                match (make_fetcher(&cfg)?, debug_log_path) {
                    (Some(inner), Some(path)) => {
                        let writer = FileLogWriter::new(&path)
                            .with_context(|| format!("open debug log {}", path.display()))?;
                        Some(Box::new(LoggingFetcher::new(inner, writer)))
                    }
                    (Some(inner), None) => Some(Box::new(inner)),
                    (None, _) => None,
                };

            let report =
                generate_report(&doc.platform, &doc.server, fetcher.as_deref(), &cfg, Utc::now())
                    .with_context(|| "generate report")?;

            let rendered = match format {
                FormatArg::Html => HtmlRenderer.render(&report),
                FormatArg::Text => PlainRenderer.render(&report),
                FormatArg::Json => serde_json::to_string_pretty(&report)?,
            };

            match out {
                Some(path) => write_atomic(&path, rendered.as_bytes())?,
                None => println!("{}", rendered),
            }

            // One-line summary for local runs.
            eprintln!(
                "site-info: ok {} warning {} flag {}",
                report.counts.ok, report.counts.warning, report.counts.flag
            );

            if !report.is_clean() {
                std::process::exit(2);
            }
        }
        Command::Explain { status } => {
            println!("{}", explain(&status));
        }
    }

    Ok(())
}

fn explain(status: &str) -> &'static str {
    match status {
        "ok" => "The check passed. No action is needed.",
        "warning" => "Attention recommended: the value is missing, outdated, or weaker than suggested. The site still works, but reviewing it improves security or stability.",
        "flag" => "Action required: the environment is below a hard minimum or past end of life. Upgrade as soon as possible.",
        _ => "Unknown status. Valid statuses are: ok, warning, flag.",
    }
}
