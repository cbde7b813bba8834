//! Notifications screen

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::ServiceContext;
use crate::api::{Endpoint, Notification, NotificationKind};
use crate::resource::{FetchStatus, Projection, ResourceSlot, project};

/// Tab selected above the notification list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationTab {
    #[default]
    All,
    Likes,
    Comments,
    Follows,
    Messages,
}

impl NotificationTab {
    pub fn matches(&self, kind: NotificationKind) -> bool {
        match self {
            NotificationTab::All => true,
            NotificationTab::Likes => kind == NotificationKind::Like,
            NotificationTab::Comments => kind == NotificationKind::Comment,
            NotificationTab::Follows => kind == NotificationKind::Follow,
            NotificationTab::Messages => {
                matches!(kind, NotificationKind::Message | NotificationKind::HireRequest)
            }
        }
    }
}

fn created_at(notification: &Notification) -> DateTime<Utc> {
    notification.created_at
}

pub struct NotificationService {
    notifications: ResourceSlot<Notification>,
    tab: Mutex<NotificationTab>,
}

impl NotificationService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            notifications: ctx.list_slot("notifications", Endpoint::notifications()),
            tab: Mutex::new(NotificationTab::default()),
        }
    }

    pub fn notifications(&self) -> &ResourceSlot<Notification> {
        &self.notifications
    }

    pub async fn load(&self) -> FetchStatus {
        self.notifications.load().await
    }

    pub async fn refresh(&self) -> FetchStatus {
        self.notifications.refresh().await
    }

    pub fn select_tab(&self, tab: NotificationTab) {
        *self.tab.lock() = tab;
    }

    pub fn tab(&self) -> NotificationTab {
        *self.tab.lock()
    }

    /// Notifications of the selected tab, newest first
    pub fn visible(&self) -> Vec<Notification> {
        let tab = self.tab();
        let projection = Projection::newest_first(created_at)
            .with_predicate(move |n: &Notification| tab.matches(n.kind));
        project(&self.notifications.snapshot().items, &projection)
    }

    pub fn unread_count(&self) -> usize {
        self.notifications
            .snapshot()
            .items
            .iter()
            .filter(|n| !n.read)
            .count()
    }
}
