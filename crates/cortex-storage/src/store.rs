//! File-backed conversation store
//!
//! Every mutation is a load-modify-save of one document, serialized by a
//! store-wide lock so concurrent requests never interleave writes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, StorageError};
use crate::model::{
    generate_conversation_id, Conversation, ConversationMessage, ConversationSummary,
};

pub struct FileConversationStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileConversationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `None` when no document exists for `id`
    pub async fn load(&self, id: &str) -> Result<Option<Conversation>> {
        let path = self.path_for(id)?;
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let conversation: Conversation = serde_json::from_str(&data)?;
        debug!(
            conversation_id = %id,
            message_count = conversation.messages.len(),
            "Loaded conversation"
        );
        Ok(Some(conversation))
    }

    pub async fn save(&self, conversation: &Conversation) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(conversation).await
    }

    /// Summaries, pinned first, then most recently updated first.
    /// Unreadable documents are skipped.
    pub async fn list(&self, include_archived: bool) -> Result<Vec<ConversationSummary>> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut summaries = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(id) = name.strip_suffix(".json") else {
                continue;
            };

            match self.load(id).await {
                Ok(Some(conversation)) if include_archived || !conversation.archived => {
                    summaries.push(conversation.summary());
                }
                Ok(_) => {}
                Err(e) => warn!(file = %name, error = %e, "Failed to load conversation file"),
            }
        }

        summaries.sort_by(|a, b| {
            b.pinned
                .cmp(&a.pinned)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
        });
        Ok(summaries)
    }

    /// Removing a conversation that does not exist succeeds
    pub async fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id)?;
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(conversation_id = %id, "Deleted conversation");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn rename(&self, id: &str, title: &str) -> Result<Conversation> {
        self.update(id, |c| c.title = Some(title.to_string())).await
    }

    pub async fn archive(&self, id: &str) -> Result<Conversation> {
        self.update(id, |c| c.archived = true).await
    }

    pub async fn unarchive(&self, id: &str) -> Result<Conversation> {
        self.update(id, |c| c.archived = false).await
    }

    pub async fn pin(&self, id: &str) -> Result<Conversation> {
        self.update(id, |c| c.pinned = true).await
    }

    pub async fn unpin(&self, id: &str) -> Result<Conversation> {
        self.update(id, |c| c.pinned = false).await
    }

    /// Create the conversation if needed, apply `title` when given, and
    /// bump its update time. A missing id gets a freshly generated one.
    pub async fn create_or_update(
        &self,
        id: Option<&str>,
        title: Option<&str>,
    ) -> Result<Conversation> {
        let id = id
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(generate_conversation_id);

        let _guard = self.write_lock.lock().await;
        let mut conversation = self.load(&id).await?.unwrap_or_else(|| Conversation::new(&id));
        if let Some(title) = title {
            conversation.title = Some(title.to_string());
        }
        conversation.touch();
        self.write(&conversation).await?;
        Ok(conversation)
    }

    /// Append messages to a conversation, creating it when absent
    pub async fn append(
        &self,
        id: &str,
        messages: Vec<ConversationMessage>,
    ) -> Result<Conversation> {
        let _guard = self.write_lock.lock().await;
        let mut conversation = self.load(id).await?.unwrap_or_else(|| Conversation::new(id));
        for message in messages {
            conversation.push(message);
        }
        self.write(&conversation).await?;
        Ok(conversation)
    }

    async fn update<F>(&self, id: &str, apply: F) -> Result<Conversation>
    where
        F: FnOnce(&mut Conversation),
    {
        let _guard = self.write_lock.lock().await;
        let mut conversation = self
            .load(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        apply(&mut conversation);
        conversation.touch();
        self.write(&conversation).await?;
        Ok(conversation)
    }

    async fn write(&self, conversation: &Conversation) -> Result<()> {
        let path = self.path_for(&conversation.id)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let data = serde_json::to_string_pretty(conversation)?;
        tokio::fs::write(&path, data).await?;
        debug!(
            conversation_id = %conversation.id,
            message_count = conversation.messages.len(),
            "Saved conversation"
        );
        Ok(())
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !id.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }
}
