#![forbid(unsafe_code)]

//! Key-change subscriptions.
//!
//! [`SubscriberSet`] is the notification half of the observable attribute
//! store: owners embed one and call [`notify`](SubscriberSet::notify) with
//! the name of each property that changed. Callbacks run synchronously, on
//! the caller's stack, in registration order.
//!
//! # Design
//!
//! The set holds `Weak` references to the callbacks; the strong reference
//! lives inside the [`Subscription`] guard returned to the subscriber.
//! Dropping the guard makes the callback inert, and dead entries are
//! swept lazily at the start of each notification cycle.
//!
//! # Failure Modes
//!
//! - **Callback panics**: the panic propagates to the caller of `notify`;
//!   remaining callbacks in that cycle do not run.
//! - **Re-entrant subscribe**: a callback may subscribe new callbacks; they
//!   take effect from the next notification cycle.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Callback = Rc<dyn Fn(&str)>;

/// RAII guard for a registered callback.
///
/// The callback stays live for exactly as long as this guard is held.
#[must_use = "dropping a Subscription unsubscribes its callback"]
pub struct Subscription {
    _callback: Callback,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// An ordered set of key-change callbacks.
#[derive(Default)]
pub struct SubscriberSet {
    subscribers: RefCell<Vec<Weak<dyn Fn(&str)>>>,
}

impl SubscriberSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback, returning the guard that keeps it alive.
    pub fn subscribe(&self, callback: impl Fn(&str) + 'static) -> Subscription {
        let callback: Callback = Rc::new(callback);
        self.subscribers
            .borrow_mut()
            .push(Rc::downgrade(&callback));
        Subscription {
            _callback: callback,
        }
    }

    /// Notify every live subscriber that `key` changed, in registration
    /// order.
    pub fn notify(&self, key: &str) {
        // Sweep dead entries and snapshot the live ones before invoking
        // anything: callbacks may re-enter and subscribe.
        let live: Vec<Callback> = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.retain(|weak| weak.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in live {
            callback(key);
        }
    }

    /// Number of currently live subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SubscriberSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberSet")
            .field("live", &self.len())
            .finish()
    }
}
