//! Auth-change notifications.
//!
//! The identity gateway publishes an [`AuthEvent`] whenever its remote
//! session appears or disappears, whether caused by an explicit call or by
//! something outside any user action (token expiry, startup restore).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use super::gateway::RemoteUser;

const DEFAULT_CAPACITY: usize = 16;

/// A remote session transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    /// A remote session now exists for this user.
    SignedIn { user: RemoteUser },
    /// There is no remote session any more.
    SignedOut,
}

/// Fan-out channel for [`AuthEvent`]s.
#[derive(Debug, Clone)]
pub struct AuthEventBus {
    sender: broadcast::Sender<AuthEvent>,
}

impl AuthEventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes `event` to every live subscription. Returns how many
    /// subscribers received it.
    pub fn publish(&self, event: AuthEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AuthEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered listener. Dropping it (or calling [`unsubscribe`]) removes
/// the registration.
///
/// [`unsubscribe`]: AuthSubscription::unsubscribe
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthEvent>,
}

impl AuthSubscription {
    /// Waits for the next event. Returns `None` once the bus is gone.
    ///
    /// A subscriber that fell behind skips the events it missed and
    /// continues from the oldest one still buffered.
    pub async fn next(&mut self) -> Option<AuthEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Auth subscriber lagged, skipped {} event(s)", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns an already-published event without waiting.
    pub fn try_next(&mut self) -> Option<AuthEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> RemoteUser {
        RemoteUser {
            user_id: "u1".into(),
            email: "u1@example.com".into(),
            display_name: None,
            email_verified: false,
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let bus = AuthEventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.publish(AuthEvent::SignedIn { user: user() }), 2);

        assert_eq!(first.next().await, Some(AuthEvent::SignedIn { user: user() }));
        assert_eq!(second.next().await, Some(AuthEvent::SignedIn { user: user() }));
    }

    #[test]
    fn test_unsubscribe_deregisters() {
        let bus = AuthEventBus::new();
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        sub.unsubscribe();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(AuthEvent::SignedOut), 0);
    }

    #[tokio::test]
    async fn test_closed_bus_ends_subscription() {
        let bus = AuthEventBus::new();
        let mut sub = bus.subscribe();
        drop(bus);
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_keeps_newest_events() {
        let bus = AuthEventBus::with_capacity(2);
        let mut sub = bus.subscribe();

        bus.publish(AuthEvent::SignedOut);
        bus.publish(AuthEvent::SignedIn { user: user() });
        bus.publish(AuthEvent::SignedOut);

        assert_eq!(sub.next().await, Some(AuthEvent::SignedIn { user: user() }));
        assert_eq!(sub.next().await, Some(AuthEvent::SignedOut));
    }
}
