pub mod channel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ChatId, UserId};

/// Handle to a message previously delivered through the gateway, kept so the
/// message can be edited or deleted later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat: ChatId,
    pub id: u64,
}

/// A button attached to a message. `command` is what the UI layer posts back
/// when the button is pressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub label: String,
    pub command: String,
}

impl Action {
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("recipient {0} unreachable")]
    Unreachable(ChatId),

    #[error("insufficient permission in chat {0}")]
    Forbidden(ChatId),

    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// Everything the coordinator pushes out through the messaging surface.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    MessageSent {
        message: MessageRef,
        text: String,
        actions: Vec<Action>,
    },
    AttachmentSent {
        message: MessageRef,
        attachment: Uuid,
        caption: String,
        actions: Vec<Action>,
    },
    MessageEdited {
        message: MessageRef,
        text: String,
        actions: Vec<Action>,
    },
    ActionsCleared {
        message: MessageRef,
    },
    MessageDeleted {
        message: MessageRef,
    },
    InviteCreated {
        chat: ChatId,
        link: String,
    },
    MemberKicked {
        chat: ChatId,
        user: UserId,
    },
    MemberUnbanned {
        chat: ChatId,
        user: UserId,
    },
}

/// The messaging surface the coordinator talks to. Every call is a potential
/// suspension point; handlers do their authoritative state flips before the
/// first one.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        actions: &[Action],
    ) -> Result<MessageRef, GatewayError>;

    async fn send_attachment(
        &self,
        chat: ChatId,
        attachment: Uuid,
        caption: &str,
        actions: &[Action],
    ) -> Result<MessageRef, GatewayError>;

    async fn edit_message(
        &self,
        message: MessageRef,
        text: &str,
        actions: &[Action],
    ) -> Result<(), GatewayError>;

    async fn clear_actions(&self, message: MessageRef) -> Result<(), GatewayError>;

    async fn delete_message(&self, message: MessageRef) -> Result<(), GatewayError>;

    /// Mints a single-use invitation link to a restricted group.
    async fn create_invite(
        &self,
        chat: ChatId,
        name: &str,
        member_limit: u32,
    ) -> Result<String, GatewayError>;

    async fn kick_member(&self, chat: ChatId, user: UserId) -> Result<(), GatewayError>;

    async fn unban_member(&self, chat: ChatId, user: UserId) -> Result<(), GatewayError>;
}

/// Swallows a best-effort delivery failure, leaving a trace of it. Required
/// deliveries propagate their error instead of coming through here.
pub fn best_effort<T>(context: &'static str, result: Result<T, GatewayError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(error = %err, context, "best-effort delivery failed");
            None
        }
    }
}
