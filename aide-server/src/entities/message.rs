use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};

use crate::entities::{MessageRecord, NewMessage, Role, SqliteStore, parse_json, parse_ts};

type MessageRow = (i64, i64, String, String, String, String);

const MESSAGE_COLUMNS: &str = "id, conversation_id, role, content, metadata, created_at";

pub trait MessageStore: Send + Sync + 'static {
    /// Store a user message and the assistant's reply together, bumping the
    /// conversation's `updated_at`. Either both rows land or neither does.
    fn append_exchange(
        &self,
        user: NewMessage,
        assistant: NewMessage,
    ) -> impl Future<Output = Result<(MessageRecord, MessageRecord), sqlx::Error>> + Send;
    /// Full history, oldest first.
    fn list_messages(
        &self,
        conversation_id: i64,
    ) -> impl Future<Output = Result<Vec<MessageRecord>, sqlx::Error>> + Send;
    /// The `limit` most recent messages, oldest first.
    fn recent_messages(
        &self,
        conversation_id: i64,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<MessageRecord>, sqlx::Error>> + Send;
}

fn from_row((id, conversation_id, role, content, metadata, created_at): MessageRow) -> MessageRecord {
    let role = Role::from_str(&role).unwrap_or_else(|_| {
        tracing::warn!(raw = %role, message_id = id, "unknown message role; treating as user");
        Role::User
    });
    MessageRecord {
        id,
        conversation_id,
        role,
        content,
        metadata: parse_json(&metadata, "messages.metadata"),
        created_at: parse_ts(&created_at, "messages.created_at"),
    }
}

async fn insert_message(
    tx: &mut Transaction<'_, Sqlite>,
    msg: NewMessage,
    now: DateTime<Utc>,
) -> Result<MessageRecord, sqlx::Error> {
    let id = sqlx::query(
        "INSERT INTO messages (conversation_id, role, content, metadata, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(msg.conversation_id)
    .bind(msg.role.as_ref())
    .bind(&msg.content)
    .bind(msg.metadata.to_string())
    .bind(now.to_rfc3339())
    .execute(&mut **tx)
    .await?
    .last_insert_rowid();

    Ok(MessageRecord {
        id,
        conversation_id: msg.conversation_id,
        role: msg.role,
        content: msg.content,
        metadata: msg.metadata,
        created_at: now,
    })
}

async fn touch_conversation(
    tx: &mut Transaction<'_, Sqlite>,
    conversation_id: i64,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE conversations SET updated_at = ?1 WHERE id = ?2")
        .bind(now.to_rfc3339())
        .bind(conversation_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Single-message append for seeding test histories.
#[cfg(test)]
impl SqliteStore {
    pub(crate) async fn append_message(&self, msg: NewMessage) -> Result<MessageRecord, sqlx::Error> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let record = insert_message(&mut tx, msg, now).await?;
        touch_conversation(&mut tx, record.conversation_id, now).await?;
        tx.commit().await?;
        Ok(record)
    }
}

impl MessageStore for SqliteStore {
    async fn append_exchange(
        &self,
        user: NewMessage,
        assistant: NewMessage,
    ) -> Result<(MessageRecord, MessageRecord), sqlx::Error> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let user = insert_message(&mut tx, user, now).await?;
        let assistant = insert_message(&mut tx, assistant, now).await?;
        touch_conversation(&mut tx, user.conversation_id, now).await?;
        tx.commit().await?;
        Ok((user, assistant))
    }

    async fn list_messages(&self, conversation_id: i64) -> Result<Vec<MessageRecord>, sqlx::Error> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1 \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn recent_messages(
        &self,
        conversation_id: i64,
        limit: u32,
    ) -> Result<Vec<MessageRecord>, sqlx::Error> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM ( \
                 SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1 \
                 ORDER BY created_at DESC, id DESC LIMIT ?2 \
             ) ORDER BY created_at ASC, id ASC"
        ))
        .bind(conversation_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(from_row).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::{ConversationStore, memory_store};

    fn msg(conversation_id: i64, role: Role, content: &str) -> NewMessage {
        NewMessage {
            conversation_id,
            role,
            content: content.into(),
            metadata: serde_json::json!({ "source": "test" }),
        }
    }

    #[tokio::test]
    async fn append_preserves_order_and_metadata() {
        let store = memory_store().await;
        let conv = store.create_conversation("Chat").await.unwrap();
        store.append_message(msg(conv.id, Role::User, "question")).await.unwrap();
        store.append_message(msg(conv.id, Role::Assistant, "answer")).await.unwrap();

        let history = store.list_messages(conv.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "question");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].metadata["source"], "test");
    }

    #[tokio::test]
    async fn append_to_missing_conversation_fails() {
        let store = memory_store().await;
        let result = store.append_message(msg(999, Role::User, "lost")).await;
        assert!(result.is_err(), "foreign key should reject orphan message");
    }

    #[tokio::test]
    async fn exchange_is_stored_together() {
        let store = memory_store().await;
        let conv = store.create_conversation("Pair").await.unwrap();
        let (user, assistant) = store
            .append_exchange(msg(conv.id, Role::User, "ping"), msg(conv.id, Role::Assistant, "pong"))
            .await
            .unwrap();
        assert!(user.id < assistant.id);

        let history = store.list_messages(conv.id).await.unwrap();
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["ping", "pong"]);
    }

    #[tokio::test]
    async fn failed_exchange_leaves_no_user_message() {
        let store = memory_store().await;
        let conv = store.create_conversation("Half").await.unwrap();
        let result = store
            .append_exchange(msg(conv.id, Role::User, "ping"), msg(999, Role::Assistant, "pong"))
            .await;
        assert!(result.is_err());
        assert!(store.list_messages(conv.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recent_messages_keeps_tail_in_order() {
        let store = memory_store().await;
        let conv = store.create_conversation("Window").await.unwrap();
        for i in 0..5 {
            store.append_message(msg(conv.id, Role::User, &format!("m{i}"))).await.unwrap();
        }
        let window = store.recent_messages(conv.id, 3).await.unwrap();
        let contents: Vec<&str> = window.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn role_round_trips_through_text() {
        assert_eq!(Role::Assistant.as_ref(), "assistant");
        assert_eq!(Role::from_str("user").unwrap(), Role::User);
        assert!(Role::from_str("system").is_err());
    }
}
