//! Persistence layer.
//!
//! Each table gets a record type under [`dao`] and a store trait in its own
//! module. [`SqliteStore`] implements every trait; handlers only see the
//! traits, so another backend can be dropped in by implementing them.
//!
//! All trait methods use `impl Future` in their signatures so no extra
//! `async-trait` crate is required at this seam.

pub mod conversation;
pub mod dao;
pub mod data_source;
pub mod message;
pub mod task;

pub use dao::{
    ContextRecord, ConversationRecord, DataSourceRecord, MessageRecord, NewContext, NewDataSource,
    NewMessage, NewTask, Role, TaskRecord,
};

pub use conversation::ConversationStore;
pub use data_source::DataSourceStore;
pub use message::MessageStore;
pub use task::TaskStore;

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// SQLite-backed store for every aide table.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g. `"sqlite://aide.db"`
    /// or `"sqlite::memory:"` for tests. An in-memory database lives only as
    /// long as its connection, so it gets a single connection that never
    /// idles out.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(8)
                .acquire_timeout(Duration::from_secs(10))
                .connect_with(options)
                .await?
        };

        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Parse an RFC 3339 column, logging and substituting "now" on corruption.
fn parse_ts(raw: &str, column: &'static str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        tracing::warn!(raw = %raw, column, error = %e, "failed to parse timestamp; using now");
        Utc::now()
    })
}

fn parse_opt_ts(raw: Option<String>, column: &'static str) -> Option<DateTime<Utc>> {
    raw.as_deref().map(|r| parse_ts(r, column))
}

/// Parse a JSON text column, falling back to an empty object.
fn parse_json(raw: &str, column: &'static str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(column, error = %e, "failed to parse JSON column; using {{}}");
        serde_json::Value::Object(Default::default())
    })
}

#[cfg(test)]
pub(crate) async fn memory_store() -> SqliteStore {
    SqliteStore::connect("sqlite::memory:")
        .await
        .unwrap_or_else(|e| panic!("failed to open in-memory store: {e}"))
}
