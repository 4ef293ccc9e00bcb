use chrono::Utc;
use tracing::instrument;

use persona_core::ids::ThreadId;
use persona_core::state::ConversationState;

use crate::database::Database;
use crate::error::StoreError;

/// Persists one conversation-state snapshot per thread. The snapshot is
/// overwritten after each graph step and read back at turn start.
pub struct CheckpointRepo {
    db: Database,
}

impl CheckpointRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Load the checkpoint for a thread, if one exists.
    #[instrument(skip(self), fields(thread_id = %thread_id))]
    pub fn load(&self, thread_id: &ThreadId) -> Result<Option<ConversationState>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT state FROM checkpoints WHERE thread_id = ?1")?;
            let mut rows = stmt.query([thread_id.as_str()])?;
            match rows.next()? {
                Some(row) => {
                    let raw: String = row.get(0)?;
                    let state = serde_json::from_str(&raw)?;
                    Ok(Some(state))
                }
                None => Ok(None),
            }
        })
    }

    /// Save (upsert) the checkpoint for a thread.
    #[instrument(skip(self, state), fields(thread_id = %thread_id, messages = state.messages.len()))]
    pub fn save(
        &self,
        thread_id: &ThreadId,
        state: &ConversationState,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(state)?;
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO checkpoints (thread_id, state, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(thread_id) DO UPDATE SET state = ?2, updated_at = ?3",
                rusqlite::params![thread_id.as_str(), payload, now],
            )?;
            Ok(())
        })
    }

    /// Drop a thread's checkpoint.
    #[instrument(skip(self), fields(thread_id = %thread_id))]
    pub fn delete(&self, thread_id: &ThreadId) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM checkpoints WHERE thread_id = ?1",
                [thread_id.as_str()],
            )?;
            Ok(n > 0)
        })
    }
}
