use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};

/// Identifier wrapper for authenticated users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Roles recognized by the hosted backend's access-control policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Admin,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Signed-in session resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: Option<String>,
}

/// Capability interface over the hosted auth backend.
pub trait AuthService: Send + Sync {
    fn get_session(&self, token: &str) -> Result<Option<Session>, AuthError>;
    fn has_role(&self, user_id: &UserId, role: Role) -> Result<bool, AuthError>;
}

/// Auth backend failure.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("auth backend unavailable: {0}")]
    Unavailable(String),
}

/// Auth-state transitions broadcast to registered observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut(UserId),
    RolesChanged(UserId),
}

type Listener = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: AtomicU64,
    entries: Mutex<BTreeMap<u64, Listener>>,
}

/// Explicit observer registry for auth-state changes. Every `subscribe` hands back a
/// [`Subscription`] that must be released on teardown; dropping it unregisters.
#[derive(Clone, Default)]
pub struct AuthStateNotifier {
    listeners: Arc<Listeners>,
}

impl AuthStateNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let id = self.listeners.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .entries
            .lock()
            .expect("listener mutex poisoned")
            .insert(id, Arc::new(listener));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Deliver `event` to every live subscriber, in registration order.
    pub fn publish(&self, event: &AuthEvent) -> usize {
        // Snapshot so listeners may subscribe or unsubscribe while being notified.
        let snapshot: Vec<Listener> = self
            .listeners
            .entries
            .lock()
            .expect("listener mutex poisoned")
            .values()
            .cloned()
            .collect();

        for listener in &snapshot {
            listener(event);
        }
        snapshot.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners
            .entries
            .lock()
            .expect("listener mutex poisoned")
            .len()
    }
}

/// Registration handle returned by [`AuthStateNotifier::subscribe`].
#[must_use = "dropping a Subscription immediately unregisters the listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            if let Ok(mut entries) = listeners.entries.lock() {
                entries.remove(&self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn session(user: &str) -> Session {
        Session {
            user_id: UserId(user.to_string()),
            email: None,
        }
    }

    #[test]
    fn publish_reaches_live_subscribers_only() {
        let notifier = AuthStateNotifier::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let first = {
            let seen = seen.clone();
            notifier.subscribe(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
        };
        let second = {
            let seen = seen.clone();
            notifier.subscribe(move |_| {
                seen.fetch_add(10, Ordering::SeqCst);
            })
        };

        assert_eq!(notifier.publish(&AuthEvent::SignedIn(session("u-1"))), 2);
        assert_eq!(seen.load(Ordering::SeqCst), 11);

        second.unsubscribe();
        assert_eq!(notifier.subscriber_count(), 1);
        notifier.publish(&AuthEvent::SignedOut(UserId("u-1".to_string())));
        assert_eq!(seen.load(Ordering::SeqCst), 12);

        drop(first);
        assert_eq!(notifier.subscriber_count(), 0);
        assert_eq!(notifier.publish(&AuthEvent::RolesChanged(UserId("u-1".to_string()))), 0);
    }

    #[test]
    fn subscription_outliving_notifier_drops_cleanly() {
        let notifier = AuthStateNotifier::new();
        let subscription = notifier.subscribe(|_| {});
        drop(notifier);
        drop(subscription);
    }

    #[test]
    fn listeners_may_unsubscribe_during_publish() {
        let notifier = AuthStateNotifier::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let handle = {
            let slot = slot.clone();
            notifier.subscribe(move |_| {
                slot.lock().expect("slot mutex poisoned").take();
            })
        };
        *slot.lock().expect("slot mutex poisoned") = Some(handle);

        notifier.publish(&AuthEvent::SignedIn(session("u-2")));
        assert_eq!(notifier.subscriber_count(), 0);
    }
}
