#![forbid(unsafe_code)]

//! The observable attribute store.
//!
//! [`ObservableObject`] holds keyed [`Value`] attributes and notifies
//! subscribers synchronously when one changes. It also carries the destroy
//! capability consumed by the proxy's lifecycle path.
//!
//! Cloning an `ObservableObject` creates a new handle to the **same**
//! attribute store; equality is handle identity, not structural.
//!
//! # Invariants
//!
//! 1. `set` with a value equal to the current one is a no-op (no
//!    notification).
//! 2. Subscribers observe changes in the order they registered.
//! 3. `destroy()` is idempotent: the destroyed flag latches and the
//!    destroy count increments at most once.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use tracing::trace;

use crate::notify::{SubscriberSet, Subscription};
use crate::value::Value;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

struct ObjectInner {
    id: u64,
    attrs: RefCell<AHashMap<String, Value>>,
    subscribers: SubscriberSet,
    destroyed: Cell<bool>,
    destroy_count: Cell<u32>,
}

/// A keyed, observable attribute store.
pub struct ObservableObject {
    inner: Rc<ObjectInner>,
}

impl Clone for ObservableObject {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl PartialEq for ObservableObject {
    /// Handle identity: two handles are equal iff they share a store.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for ObservableObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableObject")
            .field("id", &self.inner.id)
            .field("attrs", &self.inner.attrs.borrow())
            .field("destroyed", &self.inner.destroyed.get())
            .finish()
    }
}

impl Default for ObservableObject {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservableObject {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ObjectInner {
                id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
                attrs: RefCell::new(AHashMap::new()),
                subscribers: SubscriberSet::new(),
                destroyed: Cell::new(false),
                destroy_count: Cell::new(0),
            }),
        }
    }

    /// Builder-style attribute initialization.
    #[must_use]
    pub fn with(self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Stable per-store id, for diagnostics.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Read an attribute. `None` means the key is absent ("undefined").
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.attrs.borrow().get(key).cloned()
    }

    /// Write an attribute and notify subscribers of `key`.
    ///
    /// Writing the current value is a no-op.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        {
            let mut attrs = self.inner.attrs.borrow_mut();
            if attrs.get(key) == Some(&value) {
                return;
            }
            attrs.insert(key.to_string(), value);
        }
        // Attribute borrow released: callbacks may read this object.
        trace!(object = self.inner.id, key, "attribute changed");
        self.inner.subscribers.notify(key);
    }

    /// Register a key-change callback.
    pub fn subscribe(&self, callback: impl Fn(&str) + 'static) -> Subscription {
        self.inner.subscribers.subscribe(callback)
    }

    /// Invoke the destroy capability. Idempotent.
    pub fn destroy(&self) {
        if self.inner.destroyed.get() {
            return;
        }
        self.inner.destroyed.set(true);
        self.inner.destroy_count.set(self.inner.destroy_count.get() + 1);
        trace!(object = self.inner.id, "destroyed");
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// How many times `destroy()` has taken effect (0 or 1).
    #[must_use]
    pub fn destroy_count(&self) -> u32 {
        self.inner.destroy_count.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn get_set_roundtrip() {
        let obj = ObservableObject::new().with("name", "Ann").with("age", 30);
        assert_eq!(obj.get("name"), Some(Value::from("Ann")));
        assert_eq!(obj.get("age"), Some(Value::from(30)));
        assert_eq!(obj.get("missing"), None);
    }

    #[test]
    fn set_notifies_with_key() {
        let obj = ObservableObject::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let _sub = obj.subscribe(move |key| seen_clone.borrow_mut().push(key.to_string()));

        obj.set("name", "Ann");
        obj.set("age", 30);
        assert_eq!(*seen.borrow(), vec!["name", "age"]);
    }

    #[test]
    fn equal_value_set_is_silent() {
        let obj = ObservableObject::new().with("status", "ok");
        let count = Rc::new(RefCell::new(0u32));
        let count_clone = Rc::clone(&count);
        let _sub = obj.subscribe(move |_| *count_clone.borrow_mut() += 1);

        obj.set("status", "ok");
        assert_eq!(*count.borrow(), 0);

        obj.set("status", "fail");
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn clone_shares_store() {
        let a = ObservableObject::new();
        let b = a.clone();
        b.set("x", 1);
        assert_eq!(a.get("x"), Some(Value::from(1)));
        assert_eq!(a, b);
        assert_ne!(a, ObservableObject::new());
    }

    #[test]
    fn destroy_is_idempotent() {
        let obj = ObservableObject::new();
        assert!(!obj.is_destroyed());
        obj.destroy();
        obj.destroy();
        assert!(obj.is_destroyed());
        assert_eq!(obj.destroy_count(), 1);
    }

    #[test]
    fn callback_may_read_object() {
        let obj = ObservableObject::new();
        let seen = Rc::new(RefCell::new(None));
        let obj_clone = obj.clone();
        let seen_clone = Rc::clone(&seen);
        let _sub = obj.subscribe(move |key| {
            *seen_clone.borrow_mut() = obj_clone.get(key);
        });

        obj.set("name", "Ann");
        assert_eq!(*seen.borrow(), Some(Value::from("Ann")));
    }
}
