//! Request types for the pipeline endpoints

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Speaker of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Body of the ingest, embed, reprocess and summary endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequest {
    pub document_id: Uuid,
    pub user_id: String,
}

impl DocumentRequest {
    /// Reject blank user ids before touching any collaborator
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(Error::Validation("userId is required".into()));
        }
        Ok(())
    }
}

/// Body of the query endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// The user's question
    pub query: String,
    /// Namespace to search
    pub user_id: String,
    /// Prior turns, oldest first
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

impl QueryRequest {
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(Error::Validation("query must not be empty".into()));
        }
        if self.user_id.trim().is_empty() {
            return Err(Error::Validation("userId is required".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_defaults_history() {
        let request: QueryRequest =
            serde_json::from_str(r#"{"query": "Who pays rent?", "userId": "u1"}"#).unwrap();
        assert!(request.conversation_history.is_empty());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_history_roles() {
        let request: QueryRequest = serde_json::from_str(
            r#"{"query": "and the deposit?", "userId": "u1",
                "conversationHistory": [
                    {"role": "user", "content": "Who pays rent?"},
                    {"role": "assistant", "content": "The tenant."}
                ]}"#,
        )
        .unwrap();
        assert_eq!(request.conversation_history.len(), 2);
        assert_eq!(request.conversation_history[1].role, ChatRole::Assistant);
    }

    #[test]
    fn test_blank_fields_rejected() {
        let request = QueryRequest {
            query: "   ".into(),
            user_id: "u1".into(),
            conversation_history: vec![],
        };
        assert!(matches!(request.validate(), Err(Error::Validation(_))));

        let request = DocumentRequest {
            document_id: Uuid::new_v4(),
            user_id: "".into(),
        };
        assert!(request.validate().is_err());
    }
}
