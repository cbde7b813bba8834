//! Chat thread
//!
//! Sending inserts a provisional message with a client-side id. The
//! server's message replaces it on success; on failure it is removed and
//! the caller gets a notice to show.

use chrono::{DateTime, Utc};
use serde_json::json;

use super::ServiceContext;
use crate::api::{EntityId, Endpoint, Message};
use crate::error::{AppError, Result};
use crate::resource::{
    FetchStatus, LocalPatch, MutationApplier, MutationKind, MutationOutcome, Projection,
    ResourceSlot, SortOrder, project,
};

fn created_at(message: &Message) -> DateTime<Utc> {
    message.created_at
}

/// Messages of one conversation
pub struct ConversationService {
    ctx: ServiceContext,
    conversation_id: EntityId,
    messages: ResourceSlot<Message>,
    mutations: MutationApplier<Message>,
}

impl ConversationService {
    pub fn new(ctx: ServiceContext, conversation_id: EntityId) -> Self {
        let messages = ctx.list_slot("messages", Endpoint::messages(&conversation_id));
        let mutations = MutationApplier::new(messages.clone());
        Self {
            ctx,
            conversation_id,
            messages,
            mutations,
        }
    }

    pub fn conversation_id(&self) -> &EntityId {
        &self.conversation_id
    }

    pub fn messages(&self) -> &ResourceSlot<Message> {
        &self.messages
    }

    pub async fn load(&self) -> FetchStatus {
        self.messages.load().await
    }

    pub async fn refresh(&self) -> FetchStatus {
        self.messages.refresh().await
    }

    /// Messages oldest first
    pub fn visible(&self) -> Vec<Message> {
        let projection = Projection {
            sort_key: Some(created_at as fn(&Message) -> DateTime<Utc>),
            sort_order: SortOrder::Ascending,
            ..Projection::default()
        };
        project(&self.messages.snapshot().items, &projection)
    }

    /// Whether `message` was sent by the signed-in user
    pub fn is_mine(&self, message: &Message) -> bool {
        match (self.ctx.auth.user(), &message.sender_id) {
            (Some(user), Some(sender)) => user.id == *sender,
            _ => false,
        }
    }

    /// Send a message
    ///
    /// Fails with `Validation` for a blank body and `Unauthorized` without
    /// a session; neither touches the thread or the network.
    pub async fn send(&self, body: &str) -> Result<MutationOutcome> {
        let body = body.trim().to_string();
        if body.is_empty() {
            return Err(AppError::Validation("Message cannot be empty.".to_string()));
        }
        let Some(user) = self.ctx.auth.user() else {
            return Err(AppError::Unauthorized);
        };

        let provisional = Message {
            id: EntityId::provisional(),
            conversation_id: Some(self.conversation_id.clone()),
            sender_id: Some(user.id),
            body: body.clone(),
            created_at: Utc::now(),
            pending: true,
        };
        let target = provisional.id.clone();
        tracing::debug!(conversation_id = %self.conversation_id, temp_id = %target, "Sending message");

        let api = self.ctx.api.clone();
        let token = self.ctx.auth.token();
        let payload = json!({
            "conversation_id": self.conversation_id,
            "body": body,
        });

        Ok(self
            .mutations
            .apply(
                target,
                MutationKind::Send,
                LocalPatch::Insert(provisional),
                async move {
                    api.submit::<Message>(&Endpoint::send_message(), payload, token)
                        .await
                        .map(Some)
                },
            )
            .await)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio_test::assert_pending;

    use super::*;
    use crate::http::HttpError;
    use crate::http::testing::ScriptedTransport;
    use crate::service::testing::{signed_in, signed_out};

    #[tokio::test]
    async fn sent_message_is_visible_while_pending_then_confirmed() {
        let transport = ScriptedTransport::new();
        transport.reply(Ok(json!({ "messages": [] })));
        let service = ConversationService::new(signed_in(&transport), "c1".into());
        service.load().await;

        let gate = transport.hold();
        transport.reply(Ok(json!({ "message": {
            "id": 77, "sender_id": "me", "body": "hello", "created_at": "2024-05-01T09:00:00Z"
        } })));

        let mut sending = tokio_test::task::spawn(service.send("hello"));
        assert_pending!(sending.poll());

        let shown = service.visible();
        assert_eq!(shown.len(), 1);
        assert!(shown[0].pending);
        assert!(shown[0].id.is_provisional());
        assert!(service.is_mine(&shown[0]));

        gate.send(true).unwrap();
        assert_eq!(sending.await.unwrap(), MutationOutcome::Confirmed);

        let shown = service.visible();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].id, EntityId::from(77u64));
        assert!(!shown[0].pending);
    }

    #[tokio::test]
    async fn refresh_during_send_does_not_lose_the_sent_message() {
        let transport = ScriptedTransport::new();
        transport.reply(Ok(json!({ "messages": [] })));
        let service = ConversationService::new(signed_in(&transport), "c1".into());
        service.load().await;

        let gate = transport.hold();
        transport.reply_for("/messages", Ok(json!({ "message": { "id": 77, "body": "hello" } })));
        let mut sending = tokio_test::task::spawn(service.send("hello"));
        assert_pending!(sending.poll());

        transport.release();
        transport.reply_for("/conversations/c1/messages", Ok(json!({ "messages": [] })));
        assert_eq!(service.refresh().await, FetchStatus::Ready);
        assert!(service.visible().is_empty());

        gate.send(true).unwrap();
        assert_eq!(sending.await.unwrap(), MutationOutcome::Confirmed);

        let shown = service.visible();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].id, EntityId::from(77u64));
    }

    #[tokio::test]
    async fn failed_send_removes_the_message_and_reports() {
        let transport = ScriptedTransport::new();
        transport.reply(Ok(json!({ "messages": [{ "id": 1, "body": "hey" }] })));
        transport.reply(Err(HttpError::network("connection reset")));
        let service = ConversationService::new(signed_in(&transport), "c1".into());
        service.load().await;

        let outcome = service.send("are you there?").await.unwrap();

        assert_eq!(
            outcome,
            MutationOutcome::RolledBack {
                notice: "No connection. Check your network and try again.".to_string()
            }
        );
        assert_eq!(service.visible().len(), 1);
        assert_eq!(
            transport.requests()[1].body,
            Some(json!({ "conversation_id": "c1", "body": "are you there?" }))
        );
    }

    #[tokio::test]
    async fn send_preconditions() {
        let transport = ScriptedTransport::new();

        let service = ConversationService::new(signed_in(&transport), "c1".into());
        assert!(matches!(service.send("   ").await, Err(AppError::Validation(_))));

        let anonymous = ConversationService::new(signed_out(&transport), "c1".into());
        assert!(matches!(anonymous.send("hi").await, Err(AppError::Unauthorized)));

        assert_eq!(transport.request_count(), 0);
        assert!(service.visible().is_empty());
    }
}
