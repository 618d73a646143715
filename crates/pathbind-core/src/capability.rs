#![forbid(unsafe_code)]

//! Capability contracts between the binding engine and the host object graph.
//!
//! The engine never inspects concrete host types. It needs three things:
//!
//! - [`ObservableValue`]: read the current payload and register a change
//!   listener. The returned [`Subscription`] is the only handle to that
//!   listener; dropping it removes the listener.
//! - [`WritableValue`]: accept a new payload. Reached through
//!   [`ObservableValue::as_writable`], so "is this writable" is a runtime
//!   question answered by the observable itself.
//! - [`KeyValue`]: look up the observable stored under a field name on an
//!   object payload. This replaces runtime reflection; implement it with
//!   [`key_value!`](crate::key_value) for plain structs or use [`Record`]
//!   for graphs assembled at runtime.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Reported as |
//! |---------|-------|-------------|
//! | Unknown field name | Path does not match the type | [`FieldError::NoSuchField`] |
//! | Field holds a plain value | Field cannot be observed | [`FieldError::NotObservable`] |

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::observable::Subscription;
use crate::value::Value;

/// Shared handle to a type-erased observable value.
pub type ObservableRef = Rc<dyn ObservableValue>;

/// A value container that reports its payload and notifies on change.
pub trait ObservableValue {
    /// Current payload.
    fn value(&self) -> Value;

    /// Register `listener` to be called with the new payload after each change.
    ///
    /// The listener stays registered exactly as long as the returned
    /// [`Subscription`] is alive.
    fn add_listener(&self, listener: Box<dyn Fn(&Value)>) -> Subscription;

    /// The writable view of this observable, if it accepts new payloads.
    fn as_writable(&self) -> Option<&dyn WritableValue> {
        None
    }
}

/// The write half of an observable value.
pub trait WritableValue {
    fn set_value(&self, value: Value);
}

/// Why a field lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("no such field")]
    NoSuchField,
    #[error("field is not an observable value")]
    NotObservable,
}

/// Named field lookup on an object payload.
pub trait KeyValue {
    /// Type name used in diagnostics.
    fn type_name(&self) -> &str;

    /// The observable stored under `key`.
    ///
    /// # Errors
    ///
    /// - [`FieldError::NoSuchField`] if the type has no field named `key`.
    /// - [`FieldError::NotObservable`] if the field exists but is a plain value.
    fn field(&self, key: &str) -> Result<ObservableRef, FieldError>;
}

/// Conversion from a concrete observable field into an [`ObservableRef`].
pub trait AsObservableRef {
    fn observable_ref(&self) -> ObservableRef;
}

impl AsObservableRef for ObservableRef {
    fn observable_ref(&self) -> ObservableRef {
        Rc::clone(self)
    }
}

/// Implement [`KeyValue`] for a struct by listing its observable fields.
///
/// Observable fields must implement [`AsObservableRef`]. Fields listed in the
/// optional `plain { .. }` block are known to the type but report
/// [`FieldError::NotObservable`]; any other name is
/// [`FieldError::NoSuchField`].
///
/// # Examples
///
/// ```
/// use pathbind_core::{key_value, KeyValue, Observable, Value};
///
/// struct House {
///     name: Observable<Value>,
///     owner: Observable<Value>,
///     id: u32,
/// }
///
/// key_value!(House { name, owner } plain { id });
///
/// let house = House {
///     name: Observable::new(Value::from("Ranch")),
///     owner: Observable::new(Value::Null),
///     id: 7,
/// };
/// assert_eq!(house.field("name").unwrap().value().as_str(), Some("Ranch"));
/// assert!(house.field("id").is_err());
/// assert_eq!(house.type_name(), "House");
/// # let _ = house.id;
/// ```
#[macro_export]
macro_rules! key_value {
    ($ty:ident { $($field:ident),* $(,)? } $(plain { $($plain:ident),* $(,)? })?) => {
        impl $crate::capability::KeyValue for $ty {
            fn type_name(&self) -> &str {
                stringify!($ty)
            }

            fn field(
                &self,
                key: &str,
            ) -> ::std::result::Result<
                $crate::capability::ObservableRef,
                $crate::capability::FieldError,
            > {
                match key {
                    $(
                        stringify!($field) => ::std::result::Result::Ok(
                            $crate::capability::AsObservableRef::observable_ref(&self.$field),
                        ),
                    )*
                    $($(
                        stringify!($plain) => ::std::result::Result::Err(
                            $crate::capability::FieldError::NotObservable,
                        ),
                    )*)?
                    _ => ::std::result::Result::Err($crate::capability::FieldError::NoSuchField),
                }
            }
        }
    };
}

/// One named field of a [`Record`].
#[derive(Clone)]
pub enum Slot {
    Observable(ObservableRef),
    Plain(Value),
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Observable(observable) => {
                f.debug_tuple("Observable").field(&observable.value()).finish()
            }
            Self::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
        }
    }
}

/// An object whose fields are registered at runtime.
///
/// Useful for hosts that build their object graph from data rather than
/// from Rust structs.
///
/// ```
/// use pathbind_core::{KeyValue, Observable, Record, Value};
///
/// let name = Observable::new(Value::from("Evy"));
/// let person = Record::new("Person")
///     .with_observable("name", &name)
///     .with_plain("age", 41);
///
/// assert_eq!(person.field("name").unwrap().value().as_str(), Some("Evy"));
/// assert!(person.field("age").is_err());
/// ```
#[derive(Clone, Debug)]
pub struct Record {
    type_name: String,
    slots: HashMap<String, Slot>,
}

impl Record {
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            slots: HashMap::new(),
        }
    }

    /// Add an observable field (builder form).
    #[must_use]
    pub fn with_observable(mut self, name: impl Into<String>, field: &impl AsObservableRef) -> Self {
        self.insert_observable(name, field);
        self
    }

    /// Add a plain, non-observable field (builder form).
    #[must_use]
    pub fn with_plain(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_plain(name, value);
        self
    }

    /// Insert or replace an observable field.
    pub fn insert_observable(&mut self, name: impl Into<String>, field: &impl AsObservableRef) {
        self.slots
            .insert(name.into(), Slot::Observable(field.observable_ref()));
    }

    /// Insert or replace a plain field.
    pub fn insert_plain(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.slots.insert(name.into(), Slot::Plain(value.into()));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Slot> {
        self.slots.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl KeyValue for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn field(&self, key: &str) -> Result<ObservableRef, FieldError> {
        match self.slots.get(key) {
            Some(Slot::Observable(observable)) => Ok(Rc::clone(observable)),
            Some(Slot::Plain(_)) => Err(FieldError::NotObservable),
            None => Err(FieldError::NoSuchField),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
