//! Visit-level analysis: duration estimation and per-domain aggregation.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use reqwest::Url;

use crate::browsing::RawVisit;

/// Longest time credited to a single page view, in seconds.
pub const MAX_VISIT_SECS: u64 = 1800;
/// Time credited to the last visit of a sequence, in seconds.
pub const FINAL_VISIT_SECS: u64 = 60;
/// A gap longer than this starts a new browsing session.
pub const SESSION_GAP_SECS: i64 = 1800;

/// A raw visit with its estimated dwell time.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedVisit {
    pub url: String,
    pub title: String,
    pub visited_at: NaiveDateTime,
    pub duration_secs: u64,
}

/// Per-domain totals.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainSummary {
    pub domain: String,
    pub total_duration: u64,
    pub visit_count: u64,
    /// Distinct non-empty page titles, in first-seen order.
    pub titles: Vec<String>,
}

/// Host of `url` without a leading `www.`; `"unknown"` when there is none.
pub fn extract_domain(url: &str) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host.is_empty() { "unknown".to_owned() } else { host.to_owned() }
}

/// Estimate how long each visit lasted from the gap to the next one.
///
/// Gaps are capped at [`MAX_VISIT_SECS`] (a gap past [`SESSION_GAP_SECS`]
/// means the user walked away); the final visit gets [`FINAL_VISIT_SECS`].
pub fn estimate_durations(mut visits: Vec<RawVisit>) -> Vec<TimedVisit> {
    visits.sort_by_key(|v| v.visited_at);

    let next_times: Vec<Option<NaiveDateTime>> =
        visits.iter().skip(1).map(|v| Some(v.visited_at)).chain(std::iter::once(None)).collect();

    visits
        .into_iter()
        .zip(next_times)
        .map(|(visit, next)| {
            let duration_secs = match next {
                Some(next) => {
                    let gap = (next - visit.visited_at).num_seconds();
                    if gap > SESSION_GAP_SECS {
                        MAX_VISIT_SECS
                    } else {
                        (gap.max(0) as u64).min(MAX_VISIT_SECS)
                    }
                }
                None => FINAL_VISIT_SECS,
            };
            TimedVisit {
                url: visit.url,
                title: visit.title,
                visited_at: visit.visited_at,
                duration_secs,
            }
        })
        .collect()
}

/// Group timed visits by domain.
pub fn aggregate_by_domain(visits: &[TimedVisit]) -> BTreeMap<String, DomainSummary> {
    let mut domains: BTreeMap<String, DomainSummary> = BTreeMap::new();
    for visit in visits {
        let domain = extract_domain(&visit.url);
        let entry = domains.entry(domain.clone()).or_insert_with(|| DomainSummary {
            domain,
            total_duration: 0,
            visit_count: 0,
            titles: Vec::new(),
        });
        entry.total_duration += visit.duration_secs;
        entry.visit_count += 1;
        if !visit.title.is_empty() && !entry.titles.contains(&visit.title) {
            entry.titles.push(visit.title.clone());
        }
    }
    domains
}

/// Human-readable duration: `"30s"`, `"45m"`, `"2h"`, `"2h 15m"`.
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    match minutes % 60 {
        0 => format!("{hours}h"),
        rest => format!("{hours}h {rest}m"),
    }
}
