#![forbid(unsafe_code)]

//! The delegating proxy.
//!
//! [`ObjectProxy`] lets consumers bind to one stable controller while the
//! underlying content is swapped at will. Three responsibilities cooperate:
//!
//! - **Resolution**: the raw content collapses to a single logical target
//!   (see [`resolve`](crate::resolver::resolve)); the result is cached
//!   behind a dirty flag and recomputed on read.
//! - **Forwarding**: the first access to an unknown key installs a registry
//!   slot `{cached, dirty, version}` for it; reads and writes route through
//!   the resolved target, fanning out across collection elements in
//!   multi-target mode.
//! - **Propagation**: a content swap marks every installed slot dirty and
//!   re-announces every forwarded key, unconditionally, so dependents
//!   refresh synchronously even when the resolved value is unchanged.
//!
//! # Design
//!
//! `ObjectProxy` is a cheaply cloneable handle over `Rc`-shared state;
//! clones share the registry. The registry is allocated per instance at
//! construction and only ever grows: installed slots persist across content
//! swaps, only their cached values are invalidated.
//!
//! The proxy also subscribes to the attribute changes of every object
//! inside the resolved target, so a direct write to content dirties the
//! matching slot and re-announces its key. Those subscriptions are rebuilt
//! whenever resolution recomputes and die with the proxy (RAII).
//!
//! # Invariants
//!
//! 1. The resolved target is a pure function of (content, policy).
//! 2. Exactly one slot per forwarded key; installation happens at most once
//!    per key per proxy.
//! 3. With no target, every forwarded read is `None` and writes never touch
//!    content.
//! 4. Slot versions increment by exactly 1 per recomputation.
//! 5. Re-announcement walks forwarded keys in install order.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use tracing::{debug, trace};

use obx_core::{Content, SubscriberSet, Subscription, Value, distinct};

use crate::error::{ProxyError, Result};
use crate::resolver::resolve;

static NEXT_PROXY_ID: AtomicU64 = AtomicU64::new(1);

/// The proxy's own attribute names. Never forwarded.
const RESERVED_KEYS: [&str; 5] = [
    "content",
    "allows_multiple_content",
    "is_editable",
    "has_content",
    "observable_content",
];

/// One forwarded-key registry entry.
///
/// `cached` is `None` before the first computation; the inner option is the
/// forwarded value itself (`None` = undefined).
struct Slot {
    cached: Option<Option<Value>>,
    dirty: bool,
    version: u64,
}

impl Slot {
    fn new() -> Self {
        Self {
            cached: None,
            dirty: true,
            version: 0,
        }
    }

    fn fill(&mut self, value: Option<Value>) {
        self.cached = Some(value);
        self.dirty = false;
        self.version += 1;
    }
}

struct ProxyState {
    content: Option<Content>,
    allows_multiple: bool,
    editable: bool,
    /// Cached resolution result; meaningful only when `resolved_dirty` is
    /// false.
    resolved: Option<Content>,
    resolved_dirty: bool,
    slots: AHashMap<String, Slot>,
    /// Install order of forwarded keys; drives re-announcement order.
    install_order: Vec<String>,
    /// Guards for the attribute subscriptions on the current target's
    /// objects. Rebuilt on each resolution.
    target_subs: Vec<Subscription>,
}

struct ProxyInner {
    id: u64,
    label: RefCell<String>,
    state: RefCell<ProxyState>,
    subscribers: SubscriberSet,
}

/// A transparent delegating proxy over observable content.
pub struct ObjectProxy {
    inner: Rc<ProxyInner>,
}

impl Clone for ObjectProxy {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for ObjectProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("ObjectProxy")
            .field("label", &self.inner.label.borrow())
            .field("has_raw_content", &state.content.is_some())
            .field("allows_multiple_content", &state.allows_multiple)
            .field("is_editable", &state.editable)
            .field("forwarded_keys", &state.install_order)
            .finish()
    }
}

impl Default for ObjectProxy {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectProxy {
    /// Create a proxy with no content, single-target mode, editable.
    #[must_use]
    pub fn new() -> Self {
        let id = NEXT_PROXY_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            inner: Rc::new(ProxyInner {
                id,
                label: RefCell::new(format!("object-proxy#{id}")),
                state: RefCell::new(ProxyState {
                    content: None,
                    allows_multiple: false,
                    editable: true,
                    resolved: None,
                    resolved_dirty: true,
                    // Fresh registry per instance; never shared.
                    slots: AHashMap::new(),
                    install_order: Vec::new(),
                    target_subs: Vec::new(),
                }),
                subscribers: SubscriberSet::new(),
            }),
        }
    }

    /// Name the proxy for diagnostics and error messages.
    #[must_use]
    pub fn with_label(self, label: impl Into<String>) -> Self {
        *self.inner.label.borrow_mut() = label.into();
        self
    }

    #[must_use]
    pub fn label(&self) -> String {
        self.inner.label.borrow().clone()
    }

    // ── Own attributes ──────────────────────────────────────────────────

    /// The raw, externally owned content.
    #[must_use]
    pub fn content(&self) -> Option<Content> {
        self.inner.state.borrow().content.clone()
    }

    /// Swap the content. Every forwarded key is re-announced, whether or
    /// not its resolved value differs.
    pub fn set_content(&self, content: Option<Content>) {
        debug!(proxy = self.inner.id, present = content.is_some(), "content swap");
        {
            let mut state = self.inner.state.borrow_mut();
            state.content = content;
            invalidate(&mut state);
        }
        self.announce("content");
    }

    #[must_use]
    pub fn allows_multiple_content(&self) -> bool {
        self.inner.state.borrow().allows_multiple
    }

    /// Change the collection-collapse policy. A declared dependency of the
    /// resolved target, so forwarded keys re-announce like a content swap.
    pub fn set_allows_multiple_content(&self, allows: bool) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.allows_multiple == allows {
                return;
            }
            state.allows_multiple = allows;
            invalidate(&mut state);
        }
        self.announce("allows_multiple_content");
    }

    #[must_use]
    pub fn is_editable(&self) -> bool {
        self.inner.state.borrow().editable
    }

    /// Gate forwarded writes. Reads are never blocked.
    pub fn set_editable(&self, editable: bool) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.editable == editable {
                return;
            }
            state.editable = editable;
        }
        self.inner.subscribers.notify("is_editable");
    }

    /// Whether resolution currently yields a target.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.observable_content().is_some()
    }

    /// The resolved single logical target (cached, recomputed on demand).
    #[must_use]
    pub fn observable_content(&self) -> Option<Content> {
        self.refresh_resolved();
        self.inner.state.borrow().resolved.clone()
    }

    /// Forwarded keys in install order. Grows monotonically.
    #[must_use]
    pub fn forwarded_keys(&self) -> Vec<String> {
        self.inner.state.borrow().install_order.clone()
    }

    /// Recompute count for a forwarded key's slot, if installed.
    #[must_use]
    pub fn key_version(&self, key: &str) -> Option<u64> {
        self.inner
            .state
            .borrow()
            .slots
            .get(key)
            .map(|slot| slot.version)
    }

    /// Register a key-change callback. Fires for own attributes and for
    /// every re-announced forwarded key.
    pub fn subscribe(&self, callback: impl Fn(&str) + 'static) -> Subscription {
        self.inner.subscribers.subscribe(callback)
    }

    // ── Forwarding ──────────────────────────────────────────────────────

    /// Read a property through the proxy.
    ///
    /// Own attribute names answer from the proxy itself; any other key is
    /// forwarded to the resolved target. `None` means undefined: no target,
    /// or the target lacks the key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        if RESERVED_KEYS.contains(&key) {
            return self.reserved_get(key);
        }
        self.install_slot(key);

        {
            let state = self.inner.state.borrow();
            if let Some(slot) = state.slots.get(key)
                && !slot.dirty
                && let Some(cached) = &slot.cached
            {
                return cached.clone();
            }
        }

        self.refresh_resolved();
        let target = self.inner.state.borrow().resolved.clone();
        // Collaborator reads happen with no state borrow held.
        let value = read_through(target.as_ref(), key);
        {
            let mut state = self.inner.state.borrow_mut();
            if let Some(slot) = state.slots.get_mut(key) {
                slot.fill(value.clone());
            }
        }
        value
    }

    /// Write a property through the proxy, returning the written value.
    ///
    /// # Errors
    ///
    /// [`ProxyError::NotEditable`] when the proxy is not editable. A write
    /// with no resolved target is tolerated: content is untouched, but the
    /// value is cached for read-back until the next invalidation.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<Value> {
        let value = value.into();
        if RESERVED_KEYS.contains(&key) {
            return Ok(self.reserved_set(key, value));
        }
        if !self.is_editable() {
            return Err(ProxyError::not_editable(self.label(), key));
        }
        self.install_slot(key);
        self.refresh_resolved();

        let target = self.inner.state.borrow().resolved.clone();
        match &target {
            None => trace!(proxy = self.inner.id, key, "write with no target"),
            Some(Content::Object(obj)) => obj.set(key, value.clone()),
            Some(Content::List(list)) => list.set_each(key, &value),
        }
        {
            let mut state = self.inner.state.borrow_mut();
            if let Some(slot) = state.slots.get_mut(key) {
                slot.fill(Some(value.clone()));
            }
        }
        Ok(value)
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Destroy the current target (when it exposes the capability) and
    /// clear content. The proxy itself stays usable with new content.
    pub fn destroy(&self) -> &Self {
        if let Some(Content::Object(obj)) = self.observable_content() {
            debug!(proxy = self.inner.id, target = obj.id(), "destroying content");
            obj.destroy();
        }
        self.set_content(None);
        self
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn reserved_get(&self, key: &str) -> Option<Value> {
        match key {
            "allows_multiple_content" => Some(Value::Bool(self.allows_multiple_content())),
            "is_editable" => Some(Value::Bool(self.is_editable())),
            "has_content" => Some(Value::Bool(self.has_content())),
            // Not Value-representable; use the typed accessors.
            _ => None,
        }
    }

    fn reserved_set(&self, key: &str, value: Value) -> Value {
        match (key, &value) {
            ("allows_multiple_content", Value::Bool(allows)) => {
                self.set_allows_multiple_content(*allows);
            }
            ("is_editable", Value::Bool(editable)) => self.set_editable(*editable),
            // content / observable_content / has_content have typed
            // accessors; a dynamic write to them is ignored.
            _ => {}
        }
        value
    }

    /// Record `key` and create its registry slot on first access.
    fn install_slot(&self, key: &str) {
        let mut state = self.inner.state.borrow_mut();
        if state.slots.contains_key(key) {
            return;
        }
        state.slots.insert(key.to_string(), Slot::new());
        state.install_order.push(key.to_string());
        debug!(proxy = self.inner.id, key, "installed forwarding accessor");
    }

    /// Recompute the resolved target if invalidated, and rebuild the
    /// attribute subscriptions on its objects.
    fn refresh_resolved(&self) {
        if !self.inner.state.borrow().resolved_dirty {
            return;
        }
        let (content, allows) = {
            let state = self.inner.state.borrow();
            (state.content.clone(), state.allows_multiple)
        };
        let resolved = resolve(content.as_ref(), allows);
        let subs = self.subscribe_target(resolved.as_ref());
        trace!(
            proxy = self.inner.id,
            resolved = resolved.is_some(),
            multi = matches!(resolved, Some(Content::List(_))),
            "resolved observable content"
        );
        let mut state = self.inner.state.borrow_mut();
        state.resolved = resolved;
        state.resolved_dirty = false;
        state.target_subs = subs;
    }

    /// Subscribe to attribute changes on every object in the target, so a
    /// direct content mutation dirties and re-announces the matching key.
    fn subscribe_target(&self, target: Option<&Content>) -> Vec<Subscription> {
        let objects: Vec<_> = match target {
            None => Vec::new(),
            Some(Content::Object(obj)) => vec![obj.clone()],
            Some(Content::List(list)) => list
                .elements()
                .iter()
                .filter_map(|element| element.as_object().cloned())
                .collect(),
        };
        objects
            .into_iter()
            .map(|obj| {
                let weak = Rc::downgrade(&self.inner);
                obj.subscribe(move |key| {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    let installed = {
                        let mut state = inner.state.borrow_mut();
                        match state.slots.get_mut(key) {
                            Some(slot) => {
                                slot.dirty = true;
                                true
                            }
                            None => false,
                        }
                    };
                    if installed {
                        inner.subscribers.notify(key);
                    }
                })
            })
            .collect()
    }

    /// Announce `changed` plus the derived attributes, then re-announce
    /// every forwarded key in install order.
    fn announce(&self, changed: &str) {
        let forwarded = self.forwarded_keys();
        self.inner.subscribers.notify(changed);
        self.inner.subscribers.notify("observable_content");
        self.inner.subscribers.notify("has_content");
        for key in &forwarded {
            self.inner.subscribers.notify(key);
        }
    }
}

/// Mark the resolution cache and every installed slot stale. Callers
/// re-announce afterwards, outside the state borrow.
fn invalidate(state: &mut ProxyState) {
    state.resolved_dirty = true;
    // Old target subscriptions die here; fresh ones are wired on the next
    // resolution.
    state.target_subs.clear();
    for slot in state.slots.values_mut() {
        slot.dirty = true;
    }
}

/// Resolve `key` against the target: direct get on a scalar, ordered
/// gather + uniqueness collapse on a collection.
fn read_through(target: Option<&Content>, key: &str) -> Option<Value> {
    match target {
        None => None,
        Some(Content::Object(obj)) => obj.get(key),
        Some(Content::List(list)) => {
            let gathered = list.get_each(key);
            if gathered.is_empty() {
                return None;
            }
            let unique = distinct(&gathered);
            if unique.len() == 1 {
                // Every element agrees; collapse to the one value.
                unique.into_iter().next().flatten()
            } else {
                // Heterogeneous fan-out: the full per-element sequence.
                Some(Value::List(
                    gathered
                        .into_iter()
                        .map(|value| value.unwrap_or(Value::Null))
                        .collect(),
                ))
            }
        }
    }
}
