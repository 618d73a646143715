#![forbid(unsafe_code)]

//! Host-side observable cells.
//!
//! [`Observable<T>`] is a shared cell that calls its listeners whenever a
//! `set` replaces the payload with one that compares unequal. With
//! `T = Value` the comparison is [`Value`]'s identity relation, and the cell
//! implements the [`ObservableValue`] and [`WritableValue`] capabilities.
//! [`ReadOnly`] wraps one and withholds the writable view.
//!
//! # Re-entrancy
//!
//! No borrow is held while listeners run, so a listener may call `set()` on
//! this or any other observable. A bidirectional binding depends on this:
//! writing one side notifies the other from inside a callback.
//!
//! # Failure Modes
//!
//! - **Listener leak**: a [`Subscription`] stored forever keeps its callback
//!   alive. Cancelled entries are pruned lazily on the next `set`.
//! - **Late delivery**: callbacks are snapshotted when a notification starts.
//!   A subscription dropped by an earlier callback of the same round is still
//!   invoked once. Listeners that tear down their peers must tolerate this.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::capability::{AsObservableRef, ObservableRef, ObservableValue, WritableValue};
use crate::value::Value;

type Listener<T> = dyn Fn(&T);

struct Slot<T> {
    value: T,
    /// Held weakly; the [`Subscription`] owns the callback.
    listeners: Vec<Weak<Listener<T>>>,
}

/// A shared value with change notification.
///
/// Clones are handles to the same value.
///
/// # Invariants
///
/// 1. `set(v)` with `v == current` notifies nobody.
/// 2. Listeners run in registration order.
/// 3. A listener whose [`Subscription`] is gone is never called by a
///    notification that starts afterwards.
pub struct Observable<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.borrow();
        f.debug_struct("Observable")
            .field("value", &slot.value)
            .field("listeners", &slot.listeners.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot {
                value,
                listeners: Vec::new(),
            })),
        }
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.slot.borrow().value.clone()
    }

    /// Replace the payload and notify listeners, unless `value` equals the
    /// current payload.
    pub fn set(&self, value: T) {
        let listeners = {
            let mut slot = self.slot.borrow_mut();
            if slot.value == value {
                return;
            }
            slot.value = value.clone();
            slot.listeners.retain(|weak| weak.strong_count() > 0);
            slot.listeners
                .iter()
                .filter_map(Weak::upgrade)
                .collect::<Vec<_>>()
        };

        #[cfg(feature = "tracing")]
        tracing::trace!(listeners = listeners.len(), "observable changed");

        for listener in &listeners {
            listener(&value);
        }
    }

    /// Register `callback` for every later change.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Rc<Listener<T>> = Rc::new(callback);
        self.slot
            .borrow_mut()
            .listeners
            .push(Rc::downgrade(&callback));
        Subscription {
            _guard: Box::new(callback),
        }
    }

    /// Number of listeners whose [`Subscription`] is still alive.
    #[must_use]
    pub fn live_subscriber_count(&self) -> usize {
        self.slot
            .borrow()
            .listeners
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Whether both handles share the same value.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl ObservableValue for Observable<Value> {
    fn value(&self) -> Value {
        self.get()
    }

    fn add_listener(&self, listener: Box<dyn Fn(&Value)>) -> Subscription {
        self.subscribe(listener)
    }

    fn as_writable(&self) -> Option<&dyn WritableValue> {
        Some(self)
    }
}

impl WritableValue for Observable<Value> {
    fn set_value(&self, value: Value) {
        self.set(value);
    }
}

impl AsObservableRef for Observable<Value> {
    fn observable_ref(&self) -> ObservableRef {
        Rc::new(self.clone())
    }
}

/// An observable whose payload cannot be written through the capability
/// interface.
///
/// The owner keeps a handle to the underlying [`Observable`] (via
/// [`observable`](Self::observable)) and can still change the value; a
/// binding can only observe it.
#[derive(Clone, Debug)]
pub struct ReadOnly {
    observable: Observable<Value>,
}

impl ReadOnly {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            observable: Observable::new(value),
        }
    }

    /// Wrap an existing observable, sharing its state.
    #[must_use]
    pub fn wrap(observable: &Observable<Value>) -> Self {
        Self {
            observable: observable.clone(),
        }
    }

    /// The owner's writable handle.
    #[must_use]
    pub fn observable(&self) -> &Observable<Value> {
        &self.observable
    }
}

impl ObservableValue for ReadOnly {
    fn value(&self) -> Value {
        self.observable.get()
    }

    fn add_listener(&self, listener: Box<dyn Fn(&Value)>) -> Subscription {
        self.observable.subscribe(listener)
    }
}

impl AsObservableRef for ReadOnly {
    fn observable_ref(&self) -> ObservableRef {
        Rc::new(self.clone())
    }
}

/// Keeps a listener registered. Dropping it unregisters the listener.
#[must_use = "dropping a subscription immediately removes the listener"]
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl Subscription {
    /// Remove the listener now. Equivalent to dropping the guard.
    pub fn cancel(self) {
        drop(self);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
