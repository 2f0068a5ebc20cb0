//! In-memory task store with an optional on-disk JSON snapshot.

use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared::Task;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no task with id {0}")]
    IdNotFound(Uuid),
    #[error("snapshot io: {0}")]
    Snapshot(#[from] io::Error),
    #[error("snapshot encoding: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Substring filter over task fields, OR-combined: a task matches when
/// any supplied field contains its substring (case-sensitive). A filter
/// with no fields set matches nothing.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl TaskFilter {
    /// Filter matching `term` against title or description, the shape
    /// used by the `search` query parameter.
    pub fn search(term: impl Into<String>) -> Self {
        let term = term.into();
        Self {
            title: Some(term.clone()),
            description: Some(term),
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        let title_hit = self
            .title
            .as_deref()
            .is_some_and(|needle| task.title.contains(needle));
        let description_hit = self
            .description
            .as_deref()
            .is_some_and(|needle| task.description.contains(needle));
        title_hit || description_hit
    }
}

/// Partial update applied field by field; absent fields keep their
/// current value. `updated_at` is refreshed on every application.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskPatch {
    fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(completed_at) = self.completed_at {
            task.completed_at = Some(completed_at);
        }
        task.updated_at = Utc::now();
    }
}

/// Task table in insertion order. All mutations rewrite the snapshot
/// file before returning when one is configured, so the file never lags
/// the in-memory state across requests.
#[derive(Debug)]
pub struct TaskStore {
    tasks: RwLock<Vec<Task>>,
    snapshot: Option<PathBuf>,
}

impl TaskStore {
    /// Memory-only store.
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(Vec::new()),
            snapshot: None,
        }
    }

    /// Store mirrored to `path`. An existing snapshot is loaded; a
    /// missing file starts the store empty.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tasks: Vec<Task> = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(StoreError::Snapshot(err)),
        };
        tracing::info!(path = %path.display(), count = tasks.len(), "loaded task snapshot");
        Ok(Self {
            tasks: RwLock::new(tasks),
            snapshot: Some(path),
        })
    }

    pub async fn insert(&self, task: Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        tasks.push(task);
        self.persist(&tasks).await
    }

    /// All tasks in insertion order, narrowed by `filter` when given.
    pub async fn select(&self, filter: Option<&TaskFilter>) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        match filter {
            Some(filter) => tasks
                .iter()
                .filter(|task| filter.matches(task))
                .cloned()
                .collect(),
            None => tasks.clone(),
        }
    }

    pub async fn get(&self, id: &Uuid) -> Result<Task, StoreError> {
        let tasks = self.tasks.read().await;
        tasks
            .iter()
            .find(|task| task.id == *id)
            .cloned()
            .ok_or(StoreError::IdNotFound(*id))
    }

    pub async fn id_exists(&self, id: &Uuid) -> bool {
        let tasks = self.tasks.read().await;
        tasks.iter().any(|task| task.id == *id)
    }

    /// Merges `patch` into the task with `id`. Unknown ids are rejected
    /// even if the caller already checked, since the existence check and
    /// the mutation run under separate lock acquisitions.
    pub async fn update(&self, id: &Uuid, patch: TaskPatch) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|task| task.id == *id)
            .ok_or(StoreError::IdNotFound(*id))?;
        patch.apply(task);
        self.persist(&tasks).await
    }

    pub async fn delete(&self, id: &Uuid) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        let position = tasks
            .iter()
            .position(|task| task.id == *id)
            .ok_or(StoreError::IdNotFound(*id))?;
        tasks.remove(position);
        self.persist(&tasks).await
    }

    async fn persist(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(tasks)?;
        // Write-then-rename keeps the previous snapshot intact if the
        // write is interrupted.
        let staging = path.with_extension("tmp");
        tokio::fs::write(&staging, &bytes).await?;
        tokio::fs::rename(&staging, path).await?;
        Ok(())
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn task(title: &str, description: &str) -> Task {
        Task::new(title.into(), description.into())
    }

    #[tokio::test]
    async fn select_preserves_insertion_order() {
        let store = TaskStore::new();
        for title in ["first", "second", "third"] {
            store.insert(task(title, "body")).await.unwrap();
        }
        let titles: Vec<String> = store
            .select(None)
            .await
            .into_iter()
            .map(|task| task.title)
            .collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn select_on_empty_store_returns_empty() {
        let store = TaskStore::new();
        assert!(store.select(None).await.is_empty());
        assert!(store
            .select(Some(&TaskFilter::search("anything")))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn filter_matches_any_field() {
        let store = TaskStore::new();
        store.insert(task("Buy milk", "dairy")).await.unwrap();
        store.insert(task("Walk dog", "milk run")).await.unwrap();
        store.insert(task("Read book", "fiction")).await.unwrap();

        let hits = store.select(Some(&TaskFilter::search("milk"))).await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Buy milk");
        assert_eq!(hits[1].title, "Walk dog");
    }

    #[tokio::test]
    async fn filter_is_case_sensitive() {
        let store = TaskStore::new();
        store.insert(task("Buy milk", "dairy")).await.unwrap();
        assert!(store.select(Some(&TaskFilter::search("Milk"))).await.is_empty());
        assert_eq!(store.select(Some(&TaskFilter::search("Buy"))).await.len(), 1);
    }

    #[tokio::test]
    async fn empty_filter_matches_nothing() {
        let store = TaskStore::new();
        store.insert(task("Buy milk", "dairy")).await.unwrap();
        assert!(store.select(Some(&TaskFilter::default())).await.is_empty());
    }

    #[tokio::test]
    async fn update_applies_only_supplied_fields() {
        let store = TaskStore::new();
        let original = task("Buy milk", "dairy");
        let id = original.id;
        store.insert(original).await.unwrap();

        std::thread::sleep(Duration::from_millis(5));
        store
            .update(
                &id,
                TaskPatch {
                    title: Some("Buy oat milk".into()),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();

        let updated = store.get(&id).await.unwrap();
        assert_eq!(updated.title, "Buy oat milk");
        assert_eq!(updated.description, "dairy");
        assert!(updated.updated_at > updated.created_at);
        assert!(updated.completed_at.is_none());
    }

    #[tokio::test]
    async fn completion_patch_sets_timestamp() {
        let store = TaskStore::new();
        let original = task("Buy milk", "dairy");
        let id = original.id;
        store.insert(original).await.unwrap();

        store
            .update(
                &id,
                TaskPatch {
                    completed_at: Some(Utc::now()),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();

        assert!(store.get(&id).await.unwrap().completed_at.is_some());
    }

    #[tokio::test]
    async fn update_unknown_id_is_an_error() {
        let store = TaskStore::new();
        let result = store.update(&Uuid::new_v4(), TaskPatch::default()).await;
        assert!(matches!(result, Err(StoreError::IdNotFound(_))));
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_task() {
        let store = TaskStore::new();
        let doomed = task("Buy milk", "dairy");
        let id = doomed.id;
        store.insert(doomed).await.unwrap();
        store.insert(task("Walk dog", "park")).await.unwrap();

        store.delete(&id).await.unwrap();
        assert!(!store.id_exists(&id).await);
        assert_eq!(store.select(None).await.len(), 1);

        // Deleting again reports the id as gone.
        assert!(matches!(
            store.delete(&id).await,
            Err(StoreError::IdNotFound(_))
        ));
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");

        let store = TaskStore::open(&path).await.unwrap();
        store.insert(task("Buy milk", "dairy")).await.unwrap();
        store.insert(task("Walk dog", "park")).await.unwrap();
        drop(store);

        let reopened = TaskStore::open(&path).await.unwrap();
        let tasks = reopened.select(None).await;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Buy milk");
        assert_eq!(tasks[1].title, "Walk dog");
    }

    #[tokio::test]
    async fn snapshot_reflects_updates_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");

        let store = TaskStore::open(&path).await.unwrap();
        let kept = task("Buy milk", "dairy");
        let kept_id = kept.id;
        let dropped = task("Walk dog", "park");
        let dropped_id = dropped.id;
        store.insert(kept).await.unwrap();
        store.insert(dropped).await.unwrap();
        store
            .update(
                &kept_id,
                TaskPatch {
                    description: Some("oat".into()),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();
        store.delete(&dropped_id).await.unwrap();
        drop(store);

        let reopened = TaskStore::open(&path).await.unwrap();
        let tasks = reopened.select(None).await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, kept_id);
        assert_eq!(tasks[0].description, "oat");
    }
}
