//! Persisted conversation documents

use chrono::{DateTime, Utc};
use cortex_core::{ConversationTurn, Role, Row, Step};
use rand::Rng;
use serde::{Deserialize, Serialize};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TITLE_MAX_CHARS: usize = 50;

/// One message as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Rows the message's query produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Row>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Step trace, assistant messages only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            results: None,
            query: None,
            steps: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            ..Self::user(content)
        }
    }

    /// History entry handed back to the pipeline on the next request
    pub fn to_turn(&self) -> ConversationTurn {
        ConversationTurn {
            role: self.role,
            content: self.content.clone(),
            results: self.results.clone(),
            query: self.query.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub pinned: bool,
}

impl Conversation {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: None,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            archived: false,
            pinned: false,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Append a message. The first user message names an untitled
    /// conversation.
    pub fn push(&mut self, message: ConversationMessage) {
        if self.title.is_none() && message.role == Role::User {
            self.title = title_from(&message.content);
        }
        self.messages.push(message);
        self.touch();
    }

    pub fn history(&self) -> Vec<ConversationTurn> {
        self.messages.iter().map(ConversationMessage::to_turn).collect()
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            updated_at: self.updated_at,
            archived: self.archived,
            pinned: self.pinned,
            message_count: self.messages.len(),
        }
    }
}

/// Listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub archived: bool,
    pub pinned: bool,
    pub message_count: usize,
}

/// `conv_<unix millis>_<9 base-36 chars>`
pub fn generate_conversation_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("conv_{}_{}", Utc::now().timestamp_millis(), suffix)
}

fn title_from(content: &str) -> Option<String> {
    let line = content.lines().map(str::trim).find(|l| !l.is_empty())?;
    if line.chars().count() <= TITLE_MAX_CHARS {
        Some(line.to_string())
    } else {
        let cut: String = line.chars().take(TITLE_MAX_CHARS).collect();
        Some(format!("{}...", cut.trim_end()))
    }
}
