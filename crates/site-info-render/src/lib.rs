//! Renderers for assembled reports.
//!
//! Rendering is pure and deterministic: a single pass over the report,
//! section by section, entry by entry. Renderers never reorder or drop
//! entries; anything status-related is already decided in the verdicts.

use site_info_types::{Markup, Report, Status};

pub trait Renderer {
    fn render(&self, report: &Report) -> String;
}

/// HTML list rendering for the admin surface.
///
/// All host-influenced text (labels, tooltips, `Markup::Text` messages) is
/// escaped; `Markup::Html` fields are pre-formatted by the core and pass
/// through verbatim.
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render(&self, report: &Report) -> String {
        let mut out = String::new();
        out.push_str("<div class=\"wrap\">\n");
        out.push_str(&format!(
            "<h1 class=\"site-info-heading\">{} Information</h1>\n",
            escape_html(&report.meta.platform)
        ));

        for section in &report.sections {
            out.push_str(&format!(
                "<h2 class=\"site-info-subheading\">{}</h2>\n",
                escape_html(&section.title)
            ));
            out.push_str("<ul class=\"site-info-indent-two\">\n");
            for entry in &section.entries {
                let message = match &entry.verdict.message {
                    Markup::Text(text) => escape_html(text),
                    Markup::Html(html) => html.clone(),
                };
                out.push_str(&format!(
                    "<li><a href=\"#\" title=\"{}\" class=\"site-info\">\
                     <span class=\"dashicons-before dashicons-{}\"></span></a> \
                     <strong>{}</strong>: {}</li>\n",
                    escape_html(&entry.verdict.tooltip),
                    icon(entry.verdict.status),
                    escape_html(&entry.label),
                    message
                ));
            }
            out.push_str("</ul>\n");
        }

        out.push_str("</div><!-- .wrap -->\n");
        out
    }
}

fn icon(status: Status) -> &'static str {
    match status {
        Status::Ok => "yes",
        Status::Warning => "warning",
        Status::Flag => "flag",
    }
}

/// Plain-text rendering for terminals and logs.
pub struct PlainRenderer;

impl Renderer for PlainRenderer {
    fn render(&self, report: &Report) -> String {
        let mut out = String::new();
        out.push_str(&format!("{} Information\n", report.meta.platform));
        out.push_str(&format!(
            "ok: {}  warning: {}  flag: {}\n",
            report.counts.ok, report.counts.warning, report.counts.flag
        ));

        for section in &report.sections {
            out.push_str(&format!("\n## {}\n", section.title));
            for entry in &section.entries {
                out.push_str(&format!(
                    "[{}] {}: {}\n",
                    entry.verdict.status.as_str(),
                    entry.label,
                    entry.verdict.message.as_str()
                ));
                if !entry.verdict.tooltip.is_empty() {
                    out.push_str(&format!("    note: {}\n", entry.verdict.tooltip));
                }
            }
        }

        out
    }
}

/// Escape text for interpolation into HTML element or attribute context.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
