#![forbid(unsafe_code)]

//! Property-based invariant tests for the delegating proxy.
//!
//! These verify properties that must hold for **any** content shape and
//! access sequence:
//!
//! 1. Resolution matches the collapse table (unwrap singleton, drop empty,
//!    gate multi-element collections on the policy flag).
//! 2. Forwarded-key installation is install-once: the key set equals the
//!    first-occurrence order of the accessed keys.
//! 3. A uniform collection collapses to its one distinct value; a mixed
//!    one fans out exactly one entry per element, in order.
//! 4. Reads after a content swap are never stale: they equal a fresh
//!    computation from the raw content.
//! 5. A non-editable proxy never mutates content through a forwarded write.

use obx_proxy::{
    Content, ObjectList, ObjectProxy, ObservableObject, ProxyError, Value, resolve,
};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────

/// Data-level description of a content shape; handles are built per case.
#[derive(Debug, Clone)]
enum Shape {
    Absent,
    Scalar(i64),
    List(Vec<i64>),
}

fn shape() -> impl Strategy<Value = Shape> {
    prop_oneof![
        Just(Shape::Absent),
        (0i64..100).prop_map(Shape::Scalar),
        proptest::collection::vec(0i64..100, 0..5).prop_map(Shape::List),
    ]
}

/// Keys guaranteed not to collide with the proxy's own attributes.
fn key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("alpha".to_string()),
        Just("beta".to_string()),
        Just("gamma".to_string()),
        Just("delta".to_string()),
    ]
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn build(shape: &Shape) -> (Option<Content>, Vec<ObservableObject>) {
    match shape {
        Shape::Absent => (None, Vec::new()),
        Shape::Scalar(n) => {
            let obj = ObservableObject::new().with("v", *n);
            (Some(Content::Object(obj.clone())), vec![obj])
        }
        Shape::List(values) => {
            let objects: Vec<_> = values
                .iter()
                .map(|n| ObservableObject::new().with("v", *n))
                .collect();
            let list: ObjectList = objects.iter().cloned().collect();
            (Some(Content::List(list)), objects)
        }
    }
}

/// Model of what reading `"v"` through the proxy must yield.
fn expected_read(shape: &Shape, allows_multiple: bool) -> Option<Value> {
    match shape {
        Shape::Absent => None,
        Shape::Scalar(n) => Some(Value::Int(*n)),
        Shape::List(values) => match values.len() {
            0 => None,
            1 => Some(Value::Int(values[0])),
            _ if !allows_multiple => None,
            _ => {
                if values.iter().all(|n| *n == values[0]) {
                    Some(Value::Int(values[0]))
                } else {
                    Some(Value::List(values.iter().map(|n| Value::Int(*n)).collect()))
                }
            }
        },
    }
}

fn first_occurrences(keys: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for key in keys {
        if !seen.contains(key) {
            seen.push(key.clone());
        }
    }
    seen
}

// ── Invariant 1: resolution collapse table ──────────────────────────────

proptest! {
    #[test]
    fn resolution_matches_collapse_table(shape in shape(), allows in any::<bool>()) {
        let (content, objects) = build(&shape);
        let resolved = resolve(content.as_ref(), allows);

        match &shape {
            Shape::Absent => prop_assert!(resolved.is_none()),
            Shape::Scalar(_) => {
                prop_assert_eq!(resolved, Some(Content::Object(objects[0].clone())));
            }
            Shape::List(values) => match values.len() {
                0 => prop_assert!(resolved.is_none()),
                1 => prop_assert_eq!(resolved, Some(Content::Object(objects[0].clone()))),
                _ if allows => prop_assert_eq!(resolved, content),
                _ => prop_assert!(resolved.is_none()),
            },
        }
    }
}

// ── Invariant 2: install-once key registry ──────────────────────────────

proptest! {
    #[test]
    fn forwarded_keys_install_once(
        accesses in proptest::collection::vec(key(), 0..20),
        shape in shape(),
    ) {
        let (content, _objects) = build(&shape);
        let proxy = ObjectProxy::new();
        proxy.set_content(content);

        for key in &accesses {
            let _ = proxy.get(key);
        }
        prop_assert_eq!(proxy.forwarded_keys(), first_occurrences(&accesses));

        // Re-accessing everything changes nothing.
        for key in &accesses {
            let _ = proxy.get(key);
        }
        prop_assert_eq!(proxy.forwarded_keys(), first_occurrences(&accesses));
    }
}

// ── Invariant 3: distinct collapse / fan-out ────────────────────────────

proptest! {
    #[test]
    fn uniform_collection_collapses(n in 0i64..100, len in 2usize..6) {
        let shape = Shape::List(vec![n; len]);
        let (content, _objects) = build(&shape);
        let proxy = ObjectProxy::new();
        proxy.set_allows_multiple_content(true);
        proxy.set_content(content);

        prop_assert_eq!(proxy.get("v"), Some(Value::Int(n)));
    }

    #[test]
    fn mixed_collection_fans_out_per_element(
        mut values in proptest::collection::vec(0i64..100, 2..6),
    ) {
        // Force at least two distinct values.
        values[0] = 200;
        let shape = Shape::List(values.clone());
        let (content, _objects) = build(&shape);
        let proxy = ObjectProxy::new();
        proxy.set_allows_multiple_content(true);
        proxy.set_content(content);

        let read = proxy.get("v");
        prop_assert_eq!(
            read,
            Some(Value::List(values.iter().map(|n| Value::Int(*n)).collect()))
        );
    }
}

// ── Invariant 4: swaps are never stale ──────────────────────────────────

proptest! {
    #[test]
    fn reads_track_content_swaps(
        shapes in proptest::collection::vec(shape(), 1..8),
        allows in any::<bool>(),
    ) {
        let proxy = ObjectProxy::new();
        proxy.set_allows_multiple_content(allows);

        for shape in &shapes {
            let (content, _objects) = build(shape);
            proxy.set_content(content);
            prop_assert_eq!(proxy.get("v"), expected_read(shape, allows));
        }
    }
}

// ── Invariant 5: editability gate ───────────────────────────────────────

proptest! {
    #[test]
    fn non_editable_writes_never_mutate(shape in shape(), value in 0i64..100) {
        let (content, objects) = build(&shape);
        let proxy = ObjectProxy::new();
        proxy.set_allows_multiple_content(true);
        proxy.set_content(content);
        proxy.set_editable(false);

        let before: Vec<_> = objects.iter().map(|obj| obj.get("v")).collect();
        let err = proxy.set("v", value).unwrap_err();
        prop_assert!(
            matches!(err, ProxyError::NotEditable { .. }),
            "expected NotEditable, got {:?}",
            err
        );
        let after: Vec<_> = objects.iter().map(|obj| obj.get("v")).collect();
        prop_assert_eq!(before, after);
    }
}
