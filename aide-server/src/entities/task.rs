use std::future::Future;

use chrono::Utc;

use crate::entities::{NewTask, SqliteStore, TaskRecord, parse_ts};

type TaskRow = (i64, String, Option<String>, bool, String, String);

const TASK_COLUMNS: &str = "id, title, description, completed, created_at, updated_at";

pub trait TaskStore: Send + Sync + 'static {
    fn insert_task(&self, task: NewTask) -> impl Future<Output = Result<TaskRecord, sqlx::Error>> + Send;
    fn get_task(&self, id: i64) -> impl Future<Output = Result<Option<TaskRecord>, sqlx::Error>> + Send;
    fn list_tasks(&self) -> impl Future<Output = Result<Vec<TaskRecord>, sqlx::Error>> + Send;
    /// Overwrite the mutable columns of an existing task.
    fn update_task(&self, task: &TaskRecord) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Returns `false` when no row matched.
    fn delete_task(&self, id: i64) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

fn from_row((id, title, description, completed, created_at, updated_at): TaskRow) -> TaskRecord {
    TaskRecord {
        id,
        title,
        description,
        completed,
        created_at: parse_ts(&created_at, "tasks.created_at"),
        updated_at: parse_ts(&updated_at, "tasks.updated_at"),
    }
}

impl TaskStore for SqliteStore {
    async fn insert_task(&self, task: NewTask) -> Result<TaskRecord, sqlx::Error> {
        let now = Utc::now();
        let stamp = now.to_rfc3339();
        let id = sqlx::query(
            "INSERT INTO tasks (title, description, completed, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4)",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.completed)
        .bind(&stamp)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(TaskRecord {
            id,
            title: task.title,
            description: task.description,
            completed: task.completed,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_task(&self, id: i64) -> Result<Option<TaskRecord>, sqlx::Error> {
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(from_row))
    }

    async fn list_tasks(&self) -> Result<Vec<TaskRecord>, sqlx::Error> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn update_task(&self, task: &TaskRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE tasks SET title = ?1, description = ?2, completed = ?3, updated_at = ?4 \
             WHERE id = ?5",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.completed)
        .bind(task.updated_at.to_rfc3339())
        .bind(task.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_task(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::memory_store;

    fn new_task(title: &str) -> NewTask {
        NewTask { title: title.into(), description: Some("details".into()), completed: false }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = memory_store().await;
        let created = store.insert_task(new_task("Write report")).await.unwrap();
        let fetched = store.get_task(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Write report");
        assert_eq!(fetched.description.as_deref(), Some("details"));
        assert!(!fetched.completed);
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[tokio::test]
    async fn update_persists_completion() {
        let store = memory_store().await;
        let mut task = store.insert_task(new_task("Ship it")).await.unwrap();
        task.completed = true;
        task.updated_at = Utc::now();
        store.update_task(&task).await.unwrap();

        let fetched = store.get_task(task.id).await.unwrap().unwrap();
        assert!(fetched.completed);
    }

    #[tokio::test]
    async fn delete_reports_missing_rows() {
        let store = memory_store().await;
        let task = store.insert_task(new_task("Temp")).await.unwrap();
        assert!(store.delete_task(task.id).await.unwrap());
        assert!(!store.delete_task(task.id).await.unwrap());
        assert!(store.get_task(task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let store = memory_store().await;
        let first = store.insert_task(new_task("first")).await.unwrap();
        let second = store.insert_task(new_task("second")).await.unwrap();
        let ids: Vec<i64> = store.list_tasks().await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
