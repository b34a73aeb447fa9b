// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process change feed for session and scan state.
//!
//! Stores publish here after every state change; the `/events` stream
//! forwards each subscriber the events for its own user.

use crate::models::{Identity, Scan};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// Session state changed. `identity` is `None` after sign-out.
    Session {
        user_id: Uuid,
        identity: Option<Identity>,
    },
    /// A scan was created or changed status.
    Scan { user_id: Uuid, scan: Scan },
}

impl AppEvent {
    pub fn user_id(&self) -> Uuid {
        match self {
            AppEvent::Session { user_id, .. } | AppEvent::Scan { user_id, .. } => *user_id,
        }
    }

    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::Session { .. } => "session",
            AppEvent::Scan { .. } => "scan",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: AppEvent) {
        tracing::trace!(event = event.name(), user_id = %event.user_id(), "Publishing event");
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let user_id = Uuid::new_v4();
        bus.publish(AppEvent::Session {
            user_id,
            identity: None,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.user_id(), user_id);
        assert_eq!(event.name(), "session");
    }

    #[test]
    fn test_publish_without_subscribers() {
        EventBus::new(4).publish(AppEvent::Session {
            user_id: Uuid::new_v4(),
            identity: None,
        });
    }

    #[test]
    fn test_serialized_shape() {
        let user_id = Uuid::new_v4();
        let json = serde_json::to_value(AppEvent::Session {
            user_id,
            identity: None,
        })
        .unwrap();
        assert_eq!(json["type"], "session");
        assert_eq!(json["user_id"], user_id.to_string());
        assert!(json["identity"].is_null());
    }
}
