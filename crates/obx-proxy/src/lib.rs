#![forbid(unsafe_code)]

//! Transparent delegating proxy for observable object graphs.
//!
//! Consumers bind to a stable [`ObjectProxy`] while the underlying content
//! is swapped at will, without re-wiring observers:
//!
//! ```
//! use obx_proxy::{Content, ObjectProxy, ObservableObject, Value};
//!
//! let proxy = ObjectProxy::new();
//! proxy.set_content(Some(Content::Object(
//!     ObservableObject::new().with("name", "Ann"),
//! )));
//! assert_eq!(proxy.get("name"), Some(Value::from("Ann")));
//!
//! // Swap the content; the same forwarded key observes the new target.
//! proxy.set_content(Some(Content::Object(
//!     ObservableObject::new().with("name", "Bea"),
//! )));
//! assert_eq!(proxy.get("name"), Some(Value::from("Bea")));
//! ```
//!
//! The moving parts:
//!
//! - [`resolver`]: collapses raw content (scalar, collection, or absent)
//!   into the single logical target per the multiple-content policy.
//! - [`proxy`]: the per-key forwarding registry, the content-change
//!   propagator, and the editability/destroy lifecycle.
//! - [`error`]: [`ProxyError`], the only error this component originates.
//!
//! Everything is single-threaded and synchronous; resolution, forwarding,
//! and propagation all run on the caller's stack.

pub mod error;
pub mod proxy;
pub mod resolver;

pub use error::{ProxyError, Result};
pub use proxy::ObjectProxy;
pub use resolver::resolve;

// The collaborator surface, re-exported for convenience.
pub use obx_core::{Content, ObjectList, ObservableObject, Subscription, Value};
