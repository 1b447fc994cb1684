#![forbid(unsafe_code)]

//! Observable object-graph primitives for obx.
//!
//! This crate provides the collaborator surface the delegating proxy in
//! `obx-proxy` is built against:
//!
//! - [`Value`]: a dynamic property value (bool, int, float, string, list).
//! - [`ObservableObject`]: a keyed attribute store with synchronous change
//!   notification and a destroy capability.
//! - [`ObjectList`] / [`Content`]: the collection capability (ordered
//!   iteration, per-element get/set, and a uniqueness reduction).
//! - [`Subscription`]: RAII guard that automatically unsubscribes on drop.
//!
//! # Architecture
//!
//! Everything here is single-threaded and synchronous. Handles use
//! `Rc<..>` shared ownership with interior mutability; cloning a handle
//! shares state. Subscribers are stored as `Weak` function pointers and
//! cleaned up lazily during notification.
//!
//! # Invariants
//!
//! 1. Setting an attribute equal to its current value is a no-op (no
//!    notification).
//! 2. Subscribers are notified in registration order.
//! 3. Dropping a [`Subscription`] makes its callback inert before the next
//!    notification cycle.
//! 4. `destroy()` is idempotent; the destroy hook runs at most once.

pub mod collection;
pub mod notify;
pub mod object;
pub mod value;

pub use collection::{Content, ObjectList, distinct};
pub use notify::{SubscriberSet, Subscription};
pub use object::ObservableObject;
pub use value::Value;
