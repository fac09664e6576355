//! Pure classification logic: map facts through rules into verdicts, and
//! assemble verdicts into an ordered report.
//!
//! Nothing in this crate performs IO. Time enters only as an explicit `now`
//! carried by the version rule, which keeps classification deterministic and
//! trivially unit-testable.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use semver::Version;
use site_info_types::{
    Fact, Report, ReportEntry, ReportMeta, ReportSection, SiteInfoError, Status, StatusCounts,
    Verdict, SCHEMA_ID,
};

/// A pure decision function mapping a fact to a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// `Ok` when the value equals `expected`; `Warning` with the provided
    /// tooltip otherwise (upgrade/inactive messages).
    Equals { expected: String, tooltip: String },
    /// `Ok` when the value is present and non-empty; `Warning` otherwise.
    Presence { tooltip: String },
    /// Three-tier version decision; see [`VersionThreshold`].
    VersionThreshold(VersionThreshold),
}

impl Rule {
    pub fn equals(expected: impl Into<String>, tooltip: impl Into<String>) -> Self {
        Rule::Equals {
            expected: expected.into(),
            tooltip: tooltip.into(),
        }
    }

    pub fn presence(tooltip: impl Into<String>) -> Self {
        Rule::Presence {
            tooltip: tooltip.into(),
        }
    }
}

/// Version-aware rule with a soft minimum, a hard minimum, and an EOL date.
///
/// Tier order is significant: a hard-minimum violation always outranks the
/// soft-minimum/EOL tiers, regardless of date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionThreshold {
    pub min_version: String,
    pub hard_min_version: String,
    pub eol_date: NaiveDate,
    pub now: DateTime<Utc>,
}

/// Classify one fact under one rule. Pure; the fact is never mutated.
///
/// A missing value always resolves to `Warning` with a non-empty tooltip,
/// never to a silently empty entry.
pub fn classify(fact: &Fact, rule: &Rule) -> Verdict {
    let Some(value) = fact.value.as_deref().filter(|v| !v.is_empty()) else {
        return missing(fact, rule);
    };

    match rule {
        Rule::Equals { expected, tooltip } => {
            if value == expected {
                Verdict::ok(value)
            } else {
                Verdict::warning(value, tooltip.clone())
            }
        }
        Rule::Presence { .. } => Verdict::ok(value),
        Rule::VersionThreshold(t) => classify_version(value, t),
    }
}

fn missing(fact: &Fact, rule: &Rule) -> Verdict {
    let tooltip = match rule {
        Rule::Equals { tooltip, .. } | Rule::Presence { tooltip } => tooltip.clone(),
        Rule::VersionThreshold(_) => format!("{} not detected.", fact.label),
    };
    debug_assert!(!tooltip.is_empty());
    let message = format!("{} not detected.", fact.label);
    Verdict::warning(message, tooltip)
}

fn classify_version(value: &str, t: &VersionThreshold) -> Verdict {
    let (Some(hard_min), Some(min)) = (
        compare_versions(value, &t.hard_min_version),
        compare_versions(value, &t.min_version),
    ) else {
        return Verdict::warning(
            value,
            format!("Version string \"{}\" could not be interpreted.", value),
        );
    };

    if hard_min == Ordering::Less {
        return Verdict::flag(
            format!(
                "{} is dangerously out of date and may contain unpatched security holes. \
                 Updating to at least {} immediately is strongly recommended.",
                value, t.min_version
            ),
            "This version is dangerously out of date. Update at your earliest opportunity."
                .to_string(),
        );
    }

    if min == Ordering::Less {
        let eol = t.eol_date.format("%B %-d, %Y");
        if t.now.date_naive() >= t.eol_date {
            return Verdict::flag(
                format!(
                    "{} has reached end of life and is no longer receiving security updates. \
                     Updating to at least {} immediately is strongly recommended.",
                    value, t.min_version
                ),
                "This version has reached end of life. Update at your earliest opportunity."
                    .to_string(),
            );
        }
        return Verdict::warning(
            format!(
                "{} reaches end of life on {}. At that time, security updates will be \
                 discontinued. Updating to at least {} is strongly recommended.",
                value, eol, t.min_version
            ),
            format!(
                "This version reaches end of life on {}. Update at your earliest opportunity.",
                eol
            ),
        );
    }

    Verdict::ok(value)
}

/// Lenient version comparison: coerce both sides to `major.minor.patch`
/// (so "5.6" orders like "5.6.0") and compare. `None` when either side has
/// no leading numeric component.
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    Some(coerce_version(a)?.cmp(&coerce_version(b)?))
}

/// semver requires major.minor.patch; pad short versions and drop trailing
/// garbage after the numeric core ("7.2.3-extra" -> 7.2.3).
pub fn coerce_version(raw: &str) -> Option<Version> {
    let s = raw.trim();
    let numeric: String = s
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let numeric = numeric.trim_end_matches('.');
    if numeric.is_empty() {
        return None;
    }

    let parts = numeric.split('.').count();
    let coerced = match parts {
        1 => format!("{}.0.0", numeric),
        2 => format!("{}.0", numeric),
        _ => numeric
            .split('.')
            .take(3)
            .collect::<Vec<_>>()
            .join("."),
    };

    Version::parse(&coerced).ok()
}

// ---------------------------------------------------------------------------
// Report builder
// ---------------------------------------------------------------------------

/// Assembles (label, verdict) entries into sections, preserving insertion
/// order. `finish` finalizes; any mutation afterwards fails with
/// [`SiteInfoError::AlreadyFinalized`] rather than silently succeeding.
#[derive(Debug)]
pub struct ReportBuilder {
    meta: ReportMeta,
    sections: Vec<ReportSection>,
    finalized: bool,
}

impl ReportBuilder {
    pub fn new(meta: ReportMeta) -> Self {
        Self {
            meta,
            sections: vec![],
            finalized: false,
        }
    }

    /// Classify `fact` under `rule` and append the entry to `section`,
    /// creating the section on first use.
    pub fn add_entry(
        &mut self,
        section: &str,
        fact: &Fact,
        rule: &Rule,
    ) -> Result<(), SiteInfoError> {
        let verdict = classify(fact, rule);
        self.add_verdict(section, &fact.label, verdict)
    }

    /// Append a pre-classified entry. Used for composite messages the rules
    /// cannot express (e.g. a pre-formatted update link).
    pub fn add_verdict(
        &mut self,
        section: &str,
        label: &str,
        verdict: Verdict,
    ) -> Result<(), SiteInfoError> {
        if self.finalized {
            return Err(SiteInfoError::AlreadyFinalized);
        }

        let section = match self.sections.iter_mut().find(|s| s.title == section) {
            Some(s) => s,
            None => {
                self.sections.push(ReportSection {
                    title: section.to_string(),
                    entries: vec![],
                });
                self.sections.last_mut().unwrap()
            }
        };

        section.entries.push(ReportEntry {
            label: label.to_string(),
            verdict,
        });
        Ok(())
    }

    /// Finalize and return the immutable report. A second call fails with
    /// `AlreadyFinalized`.
    pub fn finish(&mut self) -> Result<Report, SiteInfoError> {
        if self.finalized {
            return Err(SiteInfoError::AlreadyFinalized);
        }
        self.finalized = true;

        let sections = std::mem::take(&mut self.sections);
        let counts = count(&sections);
        Ok(Report {
            schema: SCHEMA_ID.to_string(),
            meta: self.meta.clone(),
            sections,
            counts,
        })
    }
}

fn count(sections: &[ReportSection]) -> StatusCounts {
    let mut c = StatusCounts::default();
    for entry in sections.iter().flat_map(|s| &s.entries) {
        match entry.verdict.status {
            Status::Ok => c.ok += 1,
            Status::Warning => c.warning += 1,
            Status::Flag => c.flag += 1,
        }
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use site_info_types::{facts, Markup};

    fn fact(value: Option<&str>) -> Fact {
        Fact::new("Version", value.map(|s| s.to_string()), facts::RUNTIME_VERSION)
    }

    fn threshold(y: i32, m: u32, d: u32) -> Rule {
        Rule::VersionThreshold(VersionThreshold {
            min_version: "7.2.3".into(),
            hard_min_version: "5.6".into(),
            eol_date: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            now: Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap(),
        })
    }

    // ==================== Equals ====================

    #[test]
    fn equals_matching_value_is_ok() {
        let rule = Rule::equals("5.1", "Please update.");
        let verdict = classify(&fact(Some("5.1")), &rule);
        assert_eq!(verdict.status, Status::Ok);
        assert_eq!(verdict.message, Markup::Text("5.1".into()));
        assert!(verdict.tooltip.is_empty());
    }

    #[test]
    fn equals_mismatch_is_warning_with_provided_tooltip() {
        let rule = Rule::equals("5.1", "Please update to the latest version.");
        let verdict = classify(&fact(Some("5.0")), &rule);
        assert_eq!(verdict.status, Status::Warning);
        assert_eq!(verdict.tooltip, "Please update to the latest version.");
    }

    #[test]
    fn equals_missing_value_is_warning() {
        let rule = Rule::equals("5.1", "Please update.");
        let verdict = classify(&fact(None), &rule);
        assert_eq!(verdict.status, Status::Warning);
        assert!(!verdict.tooltip.is_empty());
    }

    // ==================== Presence ====================

    #[test]
    fn presence_with_value_is_ok() {
        let rule = Rule::presence("Server port not detected.");
        let verdict = classify(&fact(Some("443")), &rule);
        assert_eq!(verdict.status, Status::Ok);
        assert_eq!(verdict.message, Markup::Text("443".into()));
    }

    #[test]
    fn presence_missing_value_is_warning_with_nonempty_tooltip() {
        let rule = Rule::presence("Server port not detected.");
        let verdict = classify(&fact(None), &rule);
        assert_eq!(verdict.status, Status::Warning);
        assert_eq!(verdict.tooltip, "Server port not detected.");
    }

    #[test]
    fn presence_empty_string_counts_as_missing() {
        let rule = Rule::presence("Server port not detected.");
        let verdict = classify(&fact(Some("")), &rule);
        assert_eq!(verdict.status, Status::Warning);
        assert!(!verdict.tooltip.is_empty());
    }

    // ==================== VersionThreshold tiers ====================

    #[test]
    fn version_below_hard_minimum_is_flag() {
        let verdict = classify(&fact(Some("5.5")), &threshold(2018, 6, 1));
        assert_eq!(verdict.status, Status::Flag);
        assert!(verdict.message.as_str().contains("dangerously out of date"));
    }

    #[test]
    fn version_below_minimum_before_eol_is_warning() {
        let verdict = classify(&fact(Some("5.6")), &threshold(2018, 6, 1));
        assert_eq!(verdict.status, Status::Warning);
        assert!(verdict.message.as_str().contains("reaches end of life"));
        assert!(verdict.message.as_str().contains("January 1, 2019"));
    }

    #[test]
    fn version_below_minimum_after_eol_is_flag() {
        let verdict = classify(&fact(Some("5.6")), &threshold(2019, 6, 1));
        assert_eq!(verdict.status, Status::Flag);
        assert!(verdict.message.as_str().contains("end of life"));
    }

    #[test]
    fn version_at_minimum_is_ok() {
        let verdict = classify(&fact(Some("7.2.3")), &threshold(2019, 6, 1));
        assert_eq!(verdict.status, Status::Ok);
    }

    #[test]
    fn hard_minimum_outranks_eol_after_eol_date() {
        // Tier order: even after the EOL date, a sub-hard-minimum version
        // reports the "dangerously out of date" tier, not the EOL tier.
        let verdict = classify(&fact(Some("5.5")), &threshold(2020, 1, 1));
        assert_eq!(verdict.status, Status::Flag);
        assert!(verdict.message.as_str().contains("dangerously out of date"));
    }

    #[test]
    fn version_exactly_on_eol_date_is_flag() {
        let verdict = classify(&fact(Some("5.6")), &threshold(2019, 1, 1));
        assert_eq!(verdict.status, Status::Flag);
    }

    #[test]
    fn unparseable_version_is_warning() {
        let verdict = classify(&fact(Some("banana")), &threshold(2019, 6, 1));
        assert_eq!(verdict.status, Status::Warning);
        assert!(!verdict.tooltip.is_empty());
    }

    #[test]
    fn missing_version_is_warning() {
        let verdict = classify(&fact(None), &threshold(2019, 6, 1));
        assert_eq!(verdict.status, Status::Warning);
        assert!(!verdict.tooltip.is_empty());
    }

    // ==================== Version coercion ====================

    #[test]
    fn short_versions_are_padded() {
        assert_eq!(compare_versions("5.6", "5.6.0"), Some(Ordering::Equal));
        assert_eq!(compare_versions("7", "7.0.0"), Some(Ordering::Equal));
        assert_eq!(compare_versions("5.5", "5.6"), Some(Ordering::Less));
    }

    #[test]
    fn suffixed_versions_compare_on_numeric_core() {
        assert_eq!(
            compare_versions("7.2.3-1ubuntu1", "7.2.3"),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn four_segment_versions_truncate() {
        assert_eq!(compare_versions("5.6.40.1", "5.6.40"), Some(Ordering::Equal));
    }

    // ==================== Builder ====================

    fn meta() -> ReportMeta {
        ReportMeta {
            generator: "site-info".into(),
            version: "0.1.0".into(),
            generated_at: Utc.timestamp_opt(1_546_300_800, 0).unwrap(),
            platform: "WordPress".into(),
        }
    }

    #[test]
    fn builder_preserves_insertion_order() {
        let mut b = ReportBuilder::new(meta());
        let rule = Rule::presence("not detected");
        for label in ["A", "B", "C"] {
            let fact = Fact::new(label, Some("x".into()), facts::DB_HOST);
            b.add_entry("Database", &fact, &rule).unwrap();
        }
        let report = b.finish().unwrap();
        assert_eq!(report.sections.len(), 1);
        let labels: Vec<_> = report.sections[0]
            .entries
            .iter()
            .map(|e| e.label.as_str())
            .collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
    }

    #[test]
    fn builder_preserves_section_order() {
        let mut b = ReportBuilder::new(meta());
        let rule = Rule::presence("not detected");
        let fact = Fact::new("x", Some("y".into()), facts::DB_HOST);
        b.add_entry("Second", &fact, &rule).unwrap();
        b.add_entry("First", &fact, &rule).unwrap();
        b.add_entry("Second", &fact, &rule).unwrap();
        let report = b.finish().unwrap();
        let titles: Vec<_> = report.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Second", "First"]);
        assert_eq!(report.sections[0].entries.len(), 2);
    }

    #[test]
    fn add_entry_after_finish_is_already_finalized() {
        let mut b = ReportBuilder::new(meta());
        let rule = Rule::presence("not detected");
        let fact = Fact::new("x", Some("y".into()), facts::DB_HOST);
        b.add_entry("S", &fact, &rule).unwrap();
        let _report = b.finish().unwrap();

        let err = b.add_entry("S", &fact, &rule).unwrap_err();
        assert!(matches!(err, SiteInfoError::AlreadyFinalized));
    }

    #[test]
    fn second_finish_is_already_finalized() {
        let mut b = ReportBuilder::new(meta());
        let _ = b.finish().unwrap();
        assert!(matches!(b.finish(), Err(SiteInfoError::AlreadyFinalized)));
    }

    #[test]
    fn finish_counts_statuses() {
        let mut b = ReportBuilder::new(meta());
        b.add_verdict("S", "a", Verdict::ok("fine")).unwrap();
        b.add_verdict("S", "b", Verdict::warning("meh", "tip")).unwrap();
        b.add_verdict("S", "c", Verdict::flag("bad", "tip")).unwrap();
        b.add_verdict("S", "d", Verdict::ok("fine")).unwrap();
        let report = b.finish().unwrap();
        assert_eq!(report.counts, StatusCounts { ok: 2, warning: 1, flag: 1 });
        assert!(!report.is_clean());
    }
}
