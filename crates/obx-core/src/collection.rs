#![forbid(unsafe_code)]

//! Content values and the collection capability.
//!
//! [`Content`] is what a proxy delegates to: either a single
//! [`ObservableObject`] or an [`ObjectList`]. Dispatch is always on the
//! variant (the capability), never on a nominal type.
//!
//! List elements are themselves [`Content`], so nested collections are
//! representable; the proxy's resolver guards against them leaking into
//! single-target mode.

use std::cell::RefCell;
use std::rc::Rc;

use crate::object::ObservableObject;
use crate::value::Value;

/// A value a proxy can delegate to.
#[derive(Debug, Clone)]
pub enum Content {
    /// A single attribute store (scalar target).
    Object(ObservableObject),
    /// An ordered collection of content elements.
    List(ObjectList),
}

impl Content {
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Content::List(_))
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObservableObject> {
        match self {
            Content::Object(obj) => Some(obj),
            Content::List(_) => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&ObjectList> {
        match self {
            Content::List(list) => Some(list),
            Content::Object(_) => None,
        }
    }
}

impl PartialEq for Content {
    /// Handle identity on both variants.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Content::Object(a), Content::Object(b)) => a == b,
            (Content::List(a), Content::List(b)) => a == b,
            _ => false,
        }
    }
}

impl From<ObservableObject> for Content {
    fn from(obj: ObservableObject) -> Self {
        Content::Object(obj)
    }
}

impl From<ObjectList> for Content {
    fn from(list: ObjectList) -> Self {
        Content::List(list)
    }
}

/// An ordered, shared collection of [`Content`] elements.
///
/// Cloning shares the underlying storage.
#[derive(Debug, Clone, Default)]
pub struct ObjectList {
    elements: Rc<RefCell<Vec<Content>>>,
}

impl PartialEq for ObjectList {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.elements, &other.elements)
    }
}

impl ObjectList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.borrow().is_empty()
    }

    /// First element, if any.
    #[must_use]
    pub fn first(&self) -> Option<Content> {
        self.elements.borrow().first().cloned()
    }

    pub fn push(&self, element: impl Into<Content>) {
        self.elements.borrow_mut().push(element.into());
    }

    /// Snapshot of the elements in order.
    #[must_use]
    pub fn elements(&self) -> Vec<Content> {
        self.elements.borrow().clone()
    }

    /// Gather `key` from every element, in order, one entry per element.
    ///
    /// A nested list element has no named attributes and yields `None`.
    #[must_use]
    pub fn get_each(&self, key: &str) -> Vec<Option<Value>> {
        self.elements()
            .iter()
            .map(|element| match element {
                Content::Object(obj) => obj.get(key),
                Content::List(_) => None,
            })
            .collect()
    }

    /// Write `key` on every object element. Nested list elements are
    /// skipped.
    pub fn set_each(&self, key: &str, value: &Value) {
        for element in self.elements() {
            if let Content::Object(obj) = element {
                obj.set(key, value.clone());
            }
        }
    }
}

impl FromIterator<Content> for ObjectList {
    fn from_iter<I: IntoIterator<Item = Content>>(iter: I) -> Self {
        Self {
            elements: Rc::new(RefCell::new(iter.into_iter().collect())),
        }
    }
}

impl FromIterator<ObservableObject> for ObjectList {
    fn from_iter<I: IntoIterator<Item = ObservableObject>>(iter: I) -> Self {
        iter.into_iter().map(Content::Object).collect()
    }
}

/// Order-preserving uniqueness reduction over a gathered sequence.
#[must_use]
pub fn distinct(values: &[Option<Value>]) -> Vec<Option<Value>> {
    let mut unique: Vec<Option<Value>> = Vec::new();
    for value in values {
        if !unique.contains(value) {
            unique.push(value.clone());
        }
    }
    unique
}
