//! Profile persistence: where a finished questionnaire's answers live
//! between sessions.

mod libsql_store;
mod migrations;

pub use libsql_store::LibSqlProfileStore;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DatabaseError;
use crate::quiz::AnswerSet;

/// Settings key the answers are stored under.
pub const PROFILE_KEY: &str = "quiz_answers";

/// Loads and saves one user's answers.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// The saved answers, or `None` if nothing was saved yet.
    async fn load(&self) -> Result<Option<AnswerSet>, DatabaseError>;

    /// Replace the saved answers.
    async fn save(&self, answers: &AnswerSet) -> Result<(), DatabaseError>;
}

/// In-process store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryProfileStore {
    answers: RwLock<Option<AnswerSet>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers(answers: AnswerSet) -> Self {
        Self {
            answers: RwLock::new(Some(answers)),
        }
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn load(&self) -> Result<Option<AnswerSet>, DatabaseError> {
        Ok(self.answers.read().await.clone())
    }

    async fn save(&self, answers: &AnswerSet) -> Result<(), DatabaseError> {
        *self.answers.write().await = Some(answers.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::Answer;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryProfileStore::new();
        assert!(store.load().await.unwrap().is_none());

        let mut answers = AnswerSet::new();
        answers.insert("location", Answer::Text("Lisbon".into()));
        store.save(&answers).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(answers));
    }
}
