//! Browsing-history analysis.
//!
//! Raw visits come from a [`HistorySource`] (Chrome's `History` database in
//! production). They are timed, grouped by domain, categorised, and then
//! either summarised per day ([`stats`]) or rendered as a markdown report
//! ([`report`]).

pub mod category;
pub mod chrome;
pub mod report;
pub mod stats;
pub mod visits;

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

use crate::assistant::ChatModel;
use category::Category;
use visits::{DomainSummary, TimedVisit};

/// A page visit as recorded by the browser, in local time.
#[derive(Debug, Clone, PartialEq)]
pub struct RawVisit {
    pub url: String,
    pub title: String,
    pub visited_at: NaiveDateTime,
}

/// A visit ready for aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    pub visited_at: NaiveDateTime,
    pub site: String,
    pub duration_secs: u64,
    pub category: Category,
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("browser history is not supported on this operating system")]
    UnsupportedPlatform,

    #[error("could not determine the home directory")]
    NoHomeDir,

    #[error("Chrome history not found at: {0}")]
    NotFound(PathBuf),

    #[error("unable to access Chrome history at {path}: {source}")]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to query browser history: {0}")]
    Query(#[from] sqlx::Error),
}

/// Supplier of raw browsing history.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Visits at or after `since` (local time), oldest first.
    async fn read_visits(&self, since: NaiveDateTime) -> Result<Vec<RawVisit>, HistoryError>;
}

/// Everything derived from one read of the history.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub timed: Vec<TimedVisit>,
    pub domains: BTreeMap<String, DomainSummary>,
    pub categories: BTreeMap<String, Category>,
}

impl Analysis {
    /// Flatten into per-visit records tagged with site and category.
    pub fn visits(&self) -> Vec<Visit> {
        self.timed
            .iter()
            .map(|v| {
                let site = visits::extract_domain(&v.url);
                let category = self.categories.get(&site).copied().unwrap_or(Category::Other);
                Visit { visited_at: v.visited_at, site, duration_secs: v.duration_secs, category }
            })
            .collect()
    }
}

/// Read, time, group and categorise all visits since `since`.
pub async fn analyze(
    source: &dyn HistorySource,
    model: Option<&dyn ChatModel>,
    since: NaiveDateTime,
) -> Result<Analysis, HistoryError> {
    let raw = source.read_visits(since).await?;
    let timed = visits::estimate_durations(raw);
    let domains = visits::aggregate_by_domain(&timed);
    let categories = category::categorize_domains(&domains, model).await;
    tracing::debug!(visits = timed.len(), domains = domains.len(), "browsing history analysed");
    Ok(Analysis { timed, domains, categories })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Serves a fixed list of visits, or fails when constructed with `missing`.
    pub struct FixedHistory {
        pub visits: Vec<RawVisit>,
        pub missing: bool,
    }

    impl FixedHistory {
        pub fn new(visits: Vec<RawVisit>) -> Self {
            Self { visits, missing: false }
        }

        pub fn missing() -> Self {
            Self { visits: Vec::new(), missing: true }
        }
    }

    #[async_trait]
    impl HistorySource for FixedHistory {
        async fn read_visits(&self, since: NaiveDateTime) -> Result<Vec<RawVisit>, HistoryError> {
            if self.missing {
                return Err(HistoryError::NotFound(PathBuf::from("/nonexistent/History")));
            }
            Ok(self.visits.iter().filter(|v| v.visited_at >= since).cloned().collect())
        }
    }
}

#[cfg(test)]
mod test {
    use super::testing::FixedHistory;
    use super::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn analysis_tags_visits_with_site_and_category() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let source = FixedHistory::new(vec![
            RawVisit {
                url: "https://github.com/tokio-rs".into(),
                title: "tokio".into(),
                visited_at: day.and_hms_opt(9, 0, 0).unwrap(),
            },
            RawVisit {
                url: "https://www.youtube.com/watch?v=1".into(),
                title: "talk".into(),
                visited_at: day.and_hms_opt(9, 10, 0).unwrap(),
            },
        ]);
        let analysis = analyze(&source, None, day.and_hms_opt(0, 0, 0).unwrap()).await.unwrap();
        let visits = analysis.visits();
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].site, "github.com");
        assert_eq!(visits[0].category, Category::Development);
        assert_eq!(visits[0].duration_secs, 600);
        assert_eq!(visits[1].site, "youtube.com");
        assert_eq!(visits[1].category, Category::Video);
    }

    #[tokio::test]
    async fn missing_history_is_reported() {
        let source = FixedHistory::missing();
        let since = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let err = analyze(&source, None, since).await.unwrap_err();
        assert!(matches!(err, HistoryError::NotFound(_)));
    }
}
