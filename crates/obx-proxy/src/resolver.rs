#![forbid(unsafe_code)]

//! Content resolution: collapse raw content into a single logical target.
//!
//! `resolve` is a pure function of the content and the multiple-content
//! policy. The proxy caches its result behind a dirty flag and calls back
//! in here only after an invalidation.

use obx_core::Content;

/// Derive the observable content from raw `content`.
///
/// - Absent content resolves to `None`.
/// - A single object passes through unchanged.
/// - A collection is unwrapped when it holds exactly one element, dropped
///   when empty, and kept whole in multi-target mode (`allows_multiple`)
///   when it holds more than one.
/// - A collection can never be the result in single-target mode, including
///   a nested collection exposed by unwrapping a singleton.
#[must_use]
pub fn resolve(content: Option<&Content>, allows_multiple: bool) -> Option<Content> {
    let resolved = match content? {
        Content::Object(obj) => Content::Object(obj.clone()),
        Content::List(list) => match list.len() {
            0 => return None,
            1 => list.first()?,
            _ if allows_multiple => Content::List(list.clone()),
            _ => return None,
        },
    };
    if resolved.is_list() && !allows_multiple {
        return None;
    }
    Some(resolved)
}
