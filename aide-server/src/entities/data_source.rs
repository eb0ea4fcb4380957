use std::future::Future;

use chrono::Utc;

use crate::entities::{
    ContextRecord, DataSourceRecord, NewContext, NewDataSource, SqliteStore, parse_json,
    parse_opt_ts, parse_ts,
};

type DataSourceRow = (i64, String, String, bool, String, String, String);
type ContextRow = (i64, i64, String, Option<String>, String, Option<String>);

const DATA_SOURCE_COLUMNS: &str = "id, name, type, enabled, config, created_at, updated_at";
const CONTEXT_COLUMNS: &str = "id, data_source_id, content, summary, created_at, expires_at";

pub trait DataSourceStore: Send + Sync + 'static {
    fn create_data_source(
        &self,
        source: NewDataSource,
    ) -> impl Future<Output = Result<DataSourceRecord, sqlx::Error>> + Send;
    fn get_data_source(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<DataSourceRecord>, sqlx::Error>> + Send;
    /// Ordered by name.
    fn list_data_sources(
        &self,
        enabled_only: bool,
    ) -> impl Future<Output = Result<Vec<DataSourceRecord>, sqlx::Error>> + Send;
    /// Overwrite the mutable columns of an existing data source.
    fn update_data_source(
        &self,
        source: &DataSourceRecord,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Deletes the source and, through the foreign key, its contexts.
    fn delete_data_source(&self, id: i64) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;

    fn add_context(
        &self,
        context: NewContext,
    ) -> impl Future<Output = Result<ContextRecord, sqlx::Error>> + Send;
    /// Newest first, optionally capped at `limit` rows.
    fn list_contexts(
        &self,
        data_source_id: i64,
        limit: Option<u32>,
    ) -> impl Future<Output = Result<Vec<ContextRecord>, sqlx::Error>> + Send;
}

fn source_from_row(
    (id, name, source_type, enabled, config, created_at, updated_at): DataSourceRow,
) -> DataSourceRecord {
    DataSourceRecord {
        id,
        name,
        source_type,
        enabled,
        config: parse_json(&config, "data_sources.config"),
        created_at: parse_ts(&created_at, "data_sources.created_at"),
        updated_at: parse_ts(&updated_at, "data_sources.updated_at"),
    }
}

fn context_from_row(
    (id, data_source_id, content, summary, created_at, expires_at): ContextRow,
) -> ContextRecord {
    ContextRecord {
        id,
        data_source_id,
        content,
        summary,
        created_at: parse_ts(&created_at, "contexts.created_at"),
        expires_at: parse_opt_ts(expires_at, "contexts.expires_at"),
    }
}

impl DataSourceStore for SqliteStore {
    async fn create_data_source(&self, source: NewDataSource) -> Result<DataSourceRecord, sqlx::Error> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO data_sources (name, type, enabled, config, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        )
        .bind(&source.name)
        .bind(&source.source_type)
        .bind(source.enabled)
        .bind(source.config.to_string())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(DataSourceRecord {
            id,
            name: source.name,
            source_type: source.source_type,
            enabled: source.enabled,
            config: source.config,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_data_source(&self, id: i64) -> Result<Option<DataSourceRecord>, sqlx::Error> {
        let row: Option<DataSourceRow> = sqlx::query_as(&format!(
            "SELECT {DATA_SOURCE_COLUMNS} FROM data_sources WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(source_from_row))
    }

    async fn list_data_sources(&self, enabled_only: bool) -> Result<Vec<DataSourceRecord>, sqlx::Error> {
        let rows: Vec<DataSourceRow> = if enabled_only {
            sqlx::query_as(&format!(
                "SELECT {DATA_SOURCE_COLUMNS} FROM data_sources WHERE enabled = 1 ORDER BY name, id"
            ))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(&format!(
                "SELECT {DATA_SOURCE_COLUMNS} FROM data_sources ORDER BY name, id"
            ))
            .fetch_all(&self.pool)
            .await?
        };
        Ok(rows.into_iter().map(source_from_row).collect())
    }

    async fn update_data_source(&self, source: &DataSourceRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE data_sources SET name = ?1, type = ?2, enabled = ?3, config = ?4, updated_at = ?5 \
             WHERE id = ?6",
        )
        .bind(&source.name)
        .bind(&source.source_type)
        .bind(source.enabled)
        .bind(source.config.to_string())
        .bind(source.updated_at.to_rfc3339())
        .bind(source.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_data_source(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM data_sources WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_context(&self, context: NewContext) -> Result<ContextRecord, sqlx::Error> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO contexts (data_source_id, content, summary, created_at, expires_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(context.data_source_id)
        .bind(&context.content)
        .bind(&context.summary)
        .bind(now.to_rfc3339())
        .bind(context.expires_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(ContextRecord {
            id,
            data_source_id: context.data_source_id,
            content: context.content,
            summary: context.summary,
            created_at: now,
            expires_at: context.expires_at,
        })
    }

    async fn list_contexts(
        &self,
        data_source_id: i64,
        limit: Option<u32>,
    ) -> Result<Vec<ContextRecord>, sqlx::Error> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map(i64::from).unwrap_or(-1);
        let rows: Vec<ContextRow> = sqlx::query_as(&format!(
            "SELECT {CONTEXT_COLUMNS} FROM contexts WHERE data_source_id = ?1 \
             ORDER BY created_at DESC, id DESC LIMIT ?2"
        ))
        .bind(data_source_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(context_from_row).collect())
    }
}
