//! Reader for Chrome's `History` SQLite database.
//!
//! Chrome keeps the file locked while it runs, so it is copied to a temp
//! file first and the copy is opened read-only.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use sqlx::Connection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::browsing::{HistoryError, HistorySource, RawVisit};

/// Microseconds between 1601-01-01 (WebKit epoch) and 1970-01-01.
const WEBKIT_EPOCH_OFFSET_MICROS: i64 = 11_644_473_600 * 1_000_000;

const SKIPPED_SCHEMES: [&str; 2] = ["chrome://", "chrome-extension://"];

/// History source backed by the default Chrome profile.
#[derive(Debug, Clone, Default)]
pub struct ChromeHistory {
    path_override: Option<PathBuf>,
}

impl ChromeHistory {
    pub fn new(path_override: Option<&str>) -> Self {
        Self { path_override: path_override.map(PathBuf::from) }
    }

    fn history_path(&self) -> Result<PathBuf, HistoryError> {
        if let Some(path) = &self.path_override {
            return Ok(path.clone());
        }
        let home = dirs_next::home_dir().ok_or(HistoryError::NoHomeDir)?;
        default_profile_path(&home)
    }
}

fn default_profile_path(home: &Path) -> Result<PathBuf, HistoryError> {
    if cfg!(target_os = "macos") {
        Ok(home.join("Library/Application Support/Google/Chrome/Default/History"))
    } else if cfg!(target_os = "windows") {
        Ok(home.join("AppData/Local/Google/Chrome/User Data/Default/History"))
    } else if cfg!(target_os = "linux") {
        Ok(home.join(".config/google-chrome/Default/History"))
    } else {
        Err(HistoryError::UnsupportedPlatform)
    }
}

#[async_trait]
impl HistorySource for ChromeHistory {
    async fn read_visits(&self, since: NaiveDateTime) -> Result<Vec<RawVisit>, HistoryError> {
        let path = self.history_path()?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(HistoryError::NotFound(path));
        }

        let copy = std::env::temp_dir().join(format!("aide_chrome_history_{}.db", Uuid::new_v4()));
        tokio::fs::copy(&path, &copy)
            .await
            .map_err(|source| HistoryError::Access { path: path.clone(), source })?;

        let result = query_visits(&copy, since).await;

        if let Err(e) = tokio::fs::remove_file(&copy).await {
            warn!(path = %copy.display(), error = %e, "failed to remove temporary history copy");
        }
        result
    }
}

async fn query_visits(db: &Path, since: NaiveDateTime) -> Result<Vec<RawVisit>, HistoryError> {
    let options = SqliteConnectOptions::new().filename(db).read_only(true);
    let mut conn = SqliteConnection::connect_with(&options).await?;

    let cutoff = local_to_webkit(since);
    let rows: Vec<(String, Option<String>, i64)> = sqlx::query_as(
        "SELECT urls.url, urls.title, visits.visit_time \
         FROM visits INNER JOIN urls ON visits.url = urls.id \
         WHERE visits.visit_time >= ?1 \
         ORDER BY visits.visit_time ASC",
    )
    .bind(cutoff)
    .fetch_all(&mut conn)
    .await?;
    conn.close().await?;

    let visits: Vec<RawVisit> = rows
        .into_iter()
        .filter(|(url, _, _)| !url.is_empty() && !SKIPPED_SCHEMES.iter().any(|s| url.starts_with(s)))
        .map(|(url, title, visit_time)| RawVisit {
            url,
            title: title.unwrap_or_default(),
            visited_at: webkit_to_local(visit_time),
        })
        .collect();
    debug!(count = visits.len(), "read Chrome history");
    Ok(visits)
}

pub fn webkit_to_utc(webkit_micros: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(webkit_micros - WEBKIT_EPOCH_OFFSET_MICROS)
}

pub fn utc_to_webkit(time: DateTime<Utc>) -> i64 {
    time.timestamp_micros() + WEBKIT_EPOCH_OFFSET_MICROS
}

/// Out-of-range timestamps fall back to "now".
fn webkit_to_local(webkit_micros: i64) -> NaiveDateTime {
    webkit_to_utc(webkit_micros)
        .map(|t| t.with_timezone(&Local).naive_local())
        .unwrap_or_else(|| Local::now().naive_local())
}

fn local_to_webkit(time: NaiveDateTime) -> i64 {
    let utc = Local
        .from_local_datetime(&time)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| time.and_utc());
    utc_to_webkit(utc)
}
