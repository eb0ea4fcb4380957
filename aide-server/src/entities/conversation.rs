use std::future::Future;

use chrono::Utc;

use crate::entities::{ConversationRecord, SqliteStore, parse_ts};

type ConversationRow = (i64, String, i64, String, String);

const CONVERSATION_SELECT: &str = "SELECT c.id, c.title, \
     (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id), \
     c.created_at, c.updated_at \
     FROM conversations c";

pub trait ConversationStore: Send + Sync + 'static {
    fn create_conversation(
        &self,
        title: &str,
    ) -> impl Future<Output = Result<ConversationRecord, sqlx::Error>> + Send;
    fn get_conversation(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<ConversationRecord>, sqlx::Error>> + Send;
    /// Most recently active first.
    fn list_conversations(
        &self,
    ) -> impl Future<Output = Result<Vec<ConversationRecord>, sqlx::Error>> + Send;
    /// Returns the updated row, or `None` when the conversation does not exist.
    fn rename_conversation(
        &self,
        id: i64,
        title: &str,
    ) -> impl Future<Output = Result<Option<ConversationRecord>, sqlx::Error>> + Send;
    /// Deletes the conversation and, through the foreign key, its messages.
    fn delete_conversation(&self, id: i64) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

fn from_row((id, title, message_count, created_at, updated_at): ConversationRow) -> ConversationRecord {
    ConversationRecord {
        id,
        title,
        message_count,
        created_at: parse_ts(&created_at, "conversations.created_at"),
        updated_at: parse_ts(&updated_at, "conversations.updated_at"),
    }
}

impl ConversationStore for SqliteStore {
    async fn create_conversation(&self, title: &str) -> Result<ConversationRecord, sqlx::Error> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO conversations (title, created_at, updated_at) VALUES (?1, ?2, ?2)",
        )
        .bind(title)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(ConversationRecord {
            id,
            title: title.to_owned(),
            message_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_conversation(&self, id: i64) -> Result<Option<ConversationRecord>, sqlx::Error> {
        let row: Option<ConversationRow> =
            sqlx::query_as(&format!("{CONVERSATION_SELECT} WHERE c.id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(from_row))
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationRecord>, sqlx::Error> {
        let rows: Vec<ConversationRow> = sqlx::query_as(&format!(
            "{CONVERSATION_SELECT} ORDER BY c.updated_at DESC, c.id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn rename_conversation(
        &self,
        id: i64,
        title: &str,
    ) -> Result<Option<ConversationRecord>, sqlx::Error> {
        let result = sqlx::query("UPDATE conversations SET title = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(title)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_conversation(id).await
    }

    async fn delete_conversation(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
