use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::gateway::{Action, Gateway, GatewayError, MessageRef, OutboundEvent};
use crate::models::{ChatId, UserId};

/// Production gateway: publishes every outbound effect as an event on a
/// broadcast channel (consumed by the `/ws` stream and by whatever transport
/// adapter actually talks to the chat platform) and mints message ids
/// locally.
pub struct ChannelGateway {
    events: broadcast::Sender<OutboundEvent>,
    next_id: AtomicU64,
}

impl ChannelGateway {
    pub fn new(buffer: usize) -> (Self, broadcast::Sender<OutboundEvent>) {
        let (events, _unused_rx) = broadcast::channel(buffer);
        (
            Self {
                events: events.clone(),
                next_id: AtomicU64::new(1),
            },
            events,
        )
    }

    fn mint(&self, chat: ChatId) -> MessageRef {
        MessageRef {
            chat,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        }
    }

    fn publish(&self, event: OutboundEvent) {
        // No subscribers is fine; the send only fails when nobody listens.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl Gateway for ChannelGateway {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        actions: &[Action],
    ) -> Result<MessageRef, GatewayError> {
        let message = self.mint(chat);
        self.publish(OutboundEvent::MessageSent {
            message,
            text: text.to_owned(),
            actions: actions.to_vec(),
        });
        Ok(message)
    }

    async fn send_attachment(
        &self,
        chat: ChatId,
        attachment: Uuid,
        caption: &str,
        actions: &[Action],
    ) -> Result<MessageRef, GatewayError> {
        let message = self.mint(chat);
        self.publish(OutboundEvent::AttachmentSent {
            message,
            attachment,
            caption: caption.to_owned(),
            actions: actions.to_vec(),
        });
        Ok(message)
    }

    async fn edit_message(
        &self,
        message: MessageRef,
        text: &str,
        actions: &[Action],
    ) -> Result<(), GatewayError> {
        self.publish(OutboundEvent::MessageEdited {
            message,
            text: text.to_owned(),
            actions: actions.to_vec(),
        });
        Ok(())
    }

    async fn clear_actions(&self, message: MessageRef) -> Result<(), GatewayError> {
        self.publish(OutboundEvent::ActionsCleared { message });
        Ok(())
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), GatewayError> {
        self.publish(OutboundEvent::MessageDeleted { message });
        Ok(())
    }

    async fn create_invite(
        &self,
        chat: ChatId,
        _name: &str,
        _member_limit: u32,
    ) -> Result<String, GatewayError> {
        let link = format!("https://invite.example/{}", Uuid::new_v4());
        self.publish(OutboundEvent::InviteCreated {
            chat,
            link: link.clone(),
        });
        Ok(link)
    }

    async fn kick_member(&self, chat: ChatId, user: UserId) -> Result<(), GatewayError> {
        self.publish(OutboundEvent::MemberKicked { chat, user });
        Ok(())
    }

    async fn unban_member(&self, chat: ChatId, user: UserId) -> Result<(), GatewayError> {
        self.publish(OutboundEvent::MemberUnbanned { chat, user });
        Ok(())
    }
}
