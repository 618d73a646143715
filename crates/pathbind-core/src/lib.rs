#![forbid(unsafe_code)]

//! Core: the host-side capabilities that key-path bindings are built on.
//!
//! # Role in pathbind
//! `pathbind-core` owns everything the binding engine consumes but does not
//! drive: dynamically typed payloads, observable values, named field lookup,
//! and the parsed key path itself. The engine (`pathbind-runtime`) only ever
//! talks to these types through the [`ObservableValue`], [`WritableValue`]
//! and [`KeyValue`] traits, so a host with its own property system can plug
//! in by implementing them.
//!
//! # Primary responsibilities
//! - **Value**: payloads with identity semantics for objects.
//! - **Observable**: a shared value cell with weak subscribers.
//! - **Capabilities**: observe / write / field-lookup contracts, the
//!   [`key_value!`] macro and the dynamic [`Record`].
//! - **KeyPath**: `root`-anchored dotted paths.
//!
//! # Threading
//! Everything here is `Rc`/`RefCell` based and therefore `!Send`. All
//! mutation and notification happens on one thread.

pub mod capability;
pub mod key_path;
pub mod observable;
pub mod value;

pub use capability::{
    AsObservableRef, FieldError, KeyValue, ObservableRef, ObservableValue, Record, Slot,
    WritableValue,
};
pub use key_path::{KeyPath, KeyPathError, ROOT_SEGMENT, SEPARATOR};
pub use observable::{Observable, ReadOnly, Subscription};
pub use value::Value;
