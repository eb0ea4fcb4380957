use chrono::{DateTime, Utc};

/// A row in the `data_sources` table.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceRecord {
    pub id: i64,
    pub name: String,
    /// Source kind, e.g. `"api"`, `"email"`, `"file"`.
    pub source_type: String,
    pub enabled: bool,
    /// Opaque source-specific configuration object.
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDataSource {
    pub name: String,
    pub source_type: String,
    pub enabled: bool,
    pub config: serde_json::Value,
}

/// A row in the `contexts` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextRecord {
    pub id: i64,
    pub data_source_id: i64,
    pub content: String,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewContext {
    pub data_source_id: i64,
    pub content: String,
    pub summary: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}
