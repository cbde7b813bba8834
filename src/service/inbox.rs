//! Messages screen (conversation list)

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::ServiceContext;
use crate::api::{Conversation, Endpoint};
use crate::resource::{FetchStatus, Projection, ResourceSlot, project};

fn last_message_at(conversation: &Conversation) -> DateTime<Utc> {
    conversation.last_message_at
}

fn searchable(conversation: &Conversation) -> Vec<&str> {
    let mut fields = Vec::with_capacity(3);
    if let Some(person) = &conversation.participant {
        fields.push(person.name.as_str());
        fields.push(person.username.as_str());
    }
    if let Some(text) = &conversation.last_message {
        fields.push(text.as_str());
    }
    fields
}

pub struct InboxService {
    conversations: ResourceSlot<Conversation>,
    filter: Mutex<String>,
}

impl InboxService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            conversations: ctx.list_slot("conversations", Endpoint::conversations()),
            filter: Mutex::new(String::new()),
        }
    }

    pub fn conversations(&self) -> &ResourceSlot<Conversation> {
        &self.conversations
    }

    pub async fn load(&self) -> FetchStatus {
        self.conversations.load().await
    }

    pub async fn refresh(&self) -> FetchStatus {
        self.conversations.refresh().await
    }

    /// Local filter; never triggers a request
    pub fn set_filter(&self, text: impl Into<String>) {
        *self.filter.lock() = text.into();
    }

    pub fn filter(&self) -> String {
        self.filter.lock().clone()
    }

    /// Filtered conversations, most recent activity first
    pub fn visible(&self) -> Vec<Conversation> {
        let projection =
            Projection::newest_first(last_message_at).with_text_filter(self.filter(), searchable);
        project(&self.conversations.snapshot().items, &projection)
    }

    pub fn unread_total(&self) -> i64 {
        self.conversations
            .snapshot()
            .items
            .iter()
            .map(|c| c.unread_count.max(0))
            .sum()
    }
}
