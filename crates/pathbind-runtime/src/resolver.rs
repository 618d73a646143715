#![forbid(unsafe_code)]

//! Stateless key-path resolution.
//!
//! Walks a [`KeyPath`] one segment at a time: segment 0 is the root
//! observable, and each later segment is looked up (via
//! [`KeyValue`](pathbind_core::KeyValue)) on the payload of the previous
//! observable.
//!
//! # Outcomes
//!
//! | Situation | Result |
//! |-----------|--------|
//! | Every segment resolved | `Ok`, [`Resolution::is_complete`] |
//! | A payload before the terminal is `Null` | `Ok`, broken at that index |
//! | Segment names an unknown field | `Err(`[`BindingError::NoSuchField`]`)` |
//! | Segment names a plain field | `Err(`[`BindingError::NotObservable`]`)` |
//!
//! A `Null` intermediate is an ordinary state of the graph. An unknown field
//! is a shape error that no future graph change can repair, so it is
//! returned as an error even when it is found deep in the path.

use std::rc::Rc;

use pathbind_core::{FieldError, KeyPath, ObservableRef, Value, WritableValue};

use crate::error::BindingError;

/// What a path observer reports for its terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    /// The chain is fully resolved; this is the terminal payload.
    Resolved(Value),
    /// Some intermediate payload is `Null`.
    Unset,
}

impl Terminal {
    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Unset => None,
        }
    }

    /// The payload, with `Unset` collapsed to [`Value::Null`].
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Resolved(value) => value,
            Self::Unset => Value::Null,
        }
    }
}

/// The observables encountered while walking a key path.
#[derive(Clone)]
pub struct Resolution {
    start: usize,
    links: Vec<ObservableRef>,
    complete: bool,
}

impl Resolution {
    fn partial(start: usize, links: Vec<ObservableRef>) -> Self {
        Self {
            start,
            links,
            complete: false,
        }
    }

    /// Path index of the first link.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Observables for path indices `start..start + links().len()`.
    #[must_use]
    pub fn links(&self) -> &[ObservableRef] {
        &self.links
    }

    #[must_use]
    pub fn into_links(self) -> Vec<ObservableRef> {
        self.links
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Index of the last resolved link, if the chain is broken.
    #[must_use]
    pub fn broken_at(&self) -> Option<usize> {
        (!self.complete).then(|| self.start + self.links.len() - 1)
    }

    /// The terminal observable of a complete chain.
    #[must_use]
    pub fn terminal(&self) -> Option<&ObservableRef> {
        if self.complete {
            self.links.last()
        } else {
            None
        }
    }

    /// Whether the chain is complete and its terminal accepts writes.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.terminal()
            .is_some_and(|terminal| terminal.as_writable().is_some())
    }

    /// The terminal state as a path observer would report it.
    #[must_use]
    pub fn terminal_state(&self) -> Terminal {
        self.terminal()
            .map_or(Terminal::Unset, |terminal| Terminal::Resolved(terminal.value()))
    }

    /// The writable view of the terminal.
    ///
    /// Returns `Ok(None)` when the chain is broken: there is nothing to write
    /// into, which is not an error.
    ///
    /// # Errors
    ///
    /// [`BindingError::NotWritable`] if the chain is complete but the terminal
    /// only supports observation.
    pub fn writable_terminal(
        &self,
        path: &KeyPath,
    ) -> Result<Option<&dyn WritableValue>, BindingError> {
        match self.terminal() {
            None => Ok(None),
            Some(terminal) => terminal
                .as_writable()
                .map(Some)
                .ok_or_else(|| BindingError::NotWritable {
                    path: path.to_string(),
                }),
        }
    }
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolution")
            .field("start", &self.start)
            .field("links", &self.links.len())
            .field("complete", &self.complete)
            .finish()
    }
}

/// Resolve `path` from its root observable.
///
/// # Errors
///
/// [`BindingError::NoSuchField`] or [`BindingError::NotObservable`] when a
/// segment does not match the payload it is looked up on.
pub fn resolve(root: &ObservableRef, path: &KeyPath) -> Result<Resolution, BindingError> {
    resolve_from(root, 0, path)
}

/// Resolve the segments after `start_index`, starting from the observable
/// that sits at `start_index`.
///
/// The returned links begin with `start` itself.
///
/// # Errors
///
/// Same as [`resolve`].
pub fn resolve_from(
    start: &ObservableRef,
    start_index: usize,
    path: &KeyPath,
) -> Result<Resolution, BindingError> {
    match resolve_prefix_from(start, start_index, path) {
        (_, Some(err)) => Err(err),
        (resolution, None) => Ok(resolution),
    }
}

/// Like [`resolve_from`], but a shape error does not discard the walk.
///
/// The resolution holds every link found before the mismatching segment
/// and is incomplete; the error comes back alongside it.
#[must_use]
pub fn resolve_prefix_from(
    start: &ObservableRef,
    start_index: usize,
    path: &KeyPath,
) -> (Resolution, Option<BindingError>) {
    debug_assert!(start_index < path.len(), "start index outside the path");

    let mut current = Rc::clone(start);
    let mut links = vec![Rc::clone(&current)];

    for (index, key) in path.segments().iter().enumerate().skip(start_index + 1) {
        let payload = current.value();
        if payload.is_null() {
            return (Resolution::partial(start_index, links), None);
        }

        match payload.field(key) {
            Ok(next) => current = next,
            Err(err) => {
                let err = lookup_error(err, path, index, &payload);
                return (Resolution::partial(start_index, links), Some(err));
            }
        }
        links.push(Rc::clone(&current));
    }

    (
        Resolution {
            start: start_index,
            links,
            complete: true,
        },
        None,
    )
}

fn lookup_error(err: FieldError, path: &KeyPath, index: usize, payload: &Value) -> BindingError {
    let path_text = path.to_string();
    let at = path.prefix(index);
    let type_name = payload.type_name().to_string();
    match err {
        FieldError::NoSuchField => BindingError::NoSuchField {
            path: path_text,
            at,
            type_name,
        },
        FieldError::NotObservable => BindingError::NotObservable {
            path: path_text,
            at,
            type_name,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
