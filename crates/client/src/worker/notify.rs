//! Push, notification-click and background-sync hooks.
//!
//! These are fixed-behaviour hooks: push always shows the same notification,
//! and background sync is an extension point with no work behind it yet.

use serde::{Deserialize, Serialize};
use url::Url;

pub const BACKGROUND_SYNC_TAG: &str = "background-sync";
pub const EXPLORE_ACTION: &str = "explore";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    /// Milliseconds since the Unix epoch.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

/// Notification shown in response to a push message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

/// Build the notification for an incoming push.
pub fn push() -> Notification {
    tracing::info!("push received");
    let action = |action: &str, title: &str| NotificationAction {
        action: action.into(),
        title: title.into(),
        icon: "/static/pwa/icon-96x96.png".into(),
    };
    Notification {
        title: "Wallai".into(),
        body: "You have new updates in Wallai".into(),
        icon: "/static/pwa/icon-192x192.png".into(),
        badge: "/static/pwa/icon-72x72.png".into(),
        vibrate: vec![100, 50, 100],
        data: NotificationData { date_of_arrival: chrono::Utc::now().timestamp_millis(), primary_key: 1 },
        actions: vec![action(EXPLORE_ACTION, "View details"), action("close", "Close")],
    }
}

/// Window to open when a notification action is clicked, if any.
pub fn notification_click(action: &str, dashboard: &Url) -> Option<Url> {
    tracing::info!(action, "notification click received");
    (action == EXPLORE_ACTION).then(|| dashboard.clone())
}

/// Handle a background sync event. Returns whether the tag was recognised.
pub async fn sync(tag: &str) -> bool {
    tracing::info!(tag, "background sync");
    if tag != BACKGROUND_SYNC_TAG {
        return false;
    }
    do_background_sync().await;
    true
}

async fn do_background_sync() {
    tracing::debug!("performing background sync");
}
