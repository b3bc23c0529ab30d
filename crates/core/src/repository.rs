//! Repository trait and in-memory storage
//!
//! Every record kind (agents, tools, threads, runs) is stored behind the
//! same interface so the in-memory map can be swapped for a durable store
//! without touching the registries or the run engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::agent::Agent;
use crate::run::Run;
use crate::thread::Thread;
use crate::tool::Tool;
use crate::Result;

/// A record addressable by id
pub trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;

    fn created_at(&self) -> DateTime<Utc>;
}

/// In-place change applied by [`Repository::modify`]
///
/// Returning an error discards the change.
pub type Mutation<T> = Box<dyn FnOnce(&mut T) -> Result<()> + Send>;

/// Repository interface for record storage
#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    /// Get a record by ID
    async fn get(&self, id: Uuid) -> Result<Option<T>>;

    /// Insert a record, replacing any record with the same ID
    async fn put(&self, record: T) -> Result<T>;

    /// Delete a record by ID
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Get all records, oldest first
    async fn list(&self) -> Result<Vec<T>>;

    /// Atomically apply `mutation` to the record with the given ID
    ///
    /// Returns `Ok(None)` when no such record exists.
    async fn modify(&self, id: Uuid, mutation: Mutation<T>) -> Result<Option<T>>;
}

/// Map-backed repository held entirely in memory
pub struct InMemoryRepository<T> {
    records: RwLock<HashMap<Uuid, T>>,
}

impl<T: Record> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl<T: Record> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Record> Repository<T> for InMemoryRepository<T> {
    async fn get(&self, id: Uuid) -> Result<Option<T>> {
        let records = self.records.read().await;
        Ok(records.get(&id).cloned())
    }

    async fn put(&self, record: T) -> Result<T> {
        let mut records = self.records.write().await;
        records.insert(record.id(), record.clone());
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut records = self.records.write().await;
        Ok(records.remove(&id).is_some())
    }

    async fn list(&self) -> Result<Vec<T>> {
        let records = self.records.read().await;
        let mut all: Vec<T> = records.values().cloned().collect();
        all.sort_by_key(|r| r.created_at());
        Ok(all)
    }

    async fn modify(&self, id: Uuid, mutation: Mutation<T>) -> Result<Option<T>> {
        let mut records = self.records.write().await;
        let Some(current) = records.get(&id) else {
            return Ok(None);
        };

        // Work on a copy so a failed mutation leaves the stored record intact
        let mut working = current.clone();
        mutation(&mut working)?;
        records.insert(id, working.clone());
        Ok(Some(working))
    }
}

/// The repositories backing one runtime instance
#[derive(Clone)]
pub struct Stores {
    pub agents: Arc<dyn Repository<Agent>>,
    pub tools: Arc<dyn Repository<Tool>>,
    pub threads: Arc<dyn Repository<Thread>>,
    pub runs: Arc<dyn Repository<Run>>,
}

impl Stores {
    /// Fresh, empty in-memory repositories
    pub fn in_memory() -> Self {
        Self {
            agents: Arc::new(InMemoryRepository::<Agent>::new()),
            tools: Arc::new(InMemoryRepository::<Tool>::new()),
            threads: Arc::new(InMemoryRepository::<Thread>::new()),
            runs: Arc::new(InMemoryRepository::<Run>::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: Uuid,
        text: String,
        created_at: DateTime<Utc>,
    }

    impl Note {
        fn new(text: &str) -> Self {
            Self {
                id: Uuid::new_v4(),
                text: text.to_string(),
                created_at: Utc::now(),
            }
        }
    }

    impl Record for Note {
        fn id(&self) -> Uuid {
            self.id
        }

        fn created_at(&self) -> DateTime<Utc> {
            self.created_at
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let repo: InMemoryRepository<Note> = InMemoryRepository::new();
        let note = Note::new("first");
        let id = note.id;
        repo.put(note).await.unwrap();

        let retrieved = repo.get(id).await.unwrap();
        assert_eq!(retrieved.unwrap().text, "first");

        // Test non-existent record
        assert!(repo.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let repo: InMemoryRepository<Note> = InMemoryRepository::new();
        let mut note = Note::new("draft");
        repo.put(note.clone()).await.unwrap();

        note.text = "final".to_string();
        repo.put(note.clone()).await.unwrap();

        assert_eq!(repo.len().await, 1);
        assert_eq!(repo.get(note.id).await.unwrap().unwrap().text, "final");
    }

    #[tokio::test]
    async fn test_delete() {
        let repo: InMemoryRepository<Note> = InMemoryRepository::new();
        let note = Note::new("to delete");
        let id = note.id;
        repo.put(note).await.unwrap();

        assert!(repo.delete(id).await.unwrap());
        assert!(repo.get(id).await.unwrap().is_none());

        // Delete again should return false
        assert!(!repo.delete(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_oldest_first() {
        let repo: InMemoryRepository<Note> = InMemoryRepository::new();
        let mut older = Note::new("older");
        older.created_at = Utc::now() - chrono::Duration::seconds(10);
        let newer = Note::new("newer");

        repo.put(newer).await.unwrap();
        repo.put(older).await.unwrap();

        let notes = repo.list().await.unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].text, "older");
        assert_eq!(notes[1].text, "newer");
    }

    #[tokio::test]
    async fn test_modify_missing_record() {
        let repo: InMemoryRepository<Note> = InMemoryRepository::new();
        let result = repo
            .modify(Uuid::new_v4(), Box::new(|n: &mut Note| -> Result<()> {
                n.text.push('!');
                Ok(())
            }))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_failed_modify_leaves_record_untouched() {
        let repo: InMemoryRepository<Note> = InMemoryRepository::new();
        let note = Note::new("stable");
        let id = note.id;
        repo.put(note).await.unwrap();

        let result = repo
            .modify(id, Box::new(|n: &mut Note| -> Result<()> {
                n.text = "changed".to_string();
                Err(Error::InvalidInput("rejected".to_string()))
            }))
            .await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(repo.get(id).await.unwrap().unwrap().text, "stable");
    }

    #[tokio::test]
    async fn test_concurrent_modifies_are_not_lost() {
        let repo = Arc::new(InMemoryRepository::<Note>::new());
        let note = Note::new("");
        let id = note.id;
        repo.put(note).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.modify(id, Box::new(|n: &mut Note| -> Result<()> {
                    n.text.push('x');
                    Ok(())
                }))
                .await
                .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(repo.get(id).await.unwrap().unwrap().text.len(), 50);
    }
}
