#![forbid(unsafe_code)]

//! Runtime: key-path observation chains and bidirectional bindings.
//!
//! # Role in pathbind
//! `pathbind-runtime` drives the capabilities defined in `pathbind-core`. It
//! resolves `root`-anchored key paths against a live object graph, keeps one
//! listener on every observable along each path, rebuilds the tail of a
//! chain when an intermediate object is replaced, and cross-writes terminal
//! values between the two sides of a binding.
//!
//! # Primary responsibilities
//! - **resolver**: stateless path walking ([`resolve`], [`resolve_from`],
//!   [`resolve_prefix_from`]).
//! - **chain**: [`PathObserver`], the per-path listener chain.
//! - **binding**: [`Binding`], the two-sided coordinator.
//! - **group**: [`BindingGroup`], scoped ownership of many bindings.
//! - **policy**: [`BindingPolicy`], optionally loaded from TOML/JSON.
//!
//! # How it fits in the system
//! Hosts expose their model through `ObservableValue`, `WritableValue` and
//! `KeyValue` (or use `Observable<Value>` and `Record` directly), then bind
//! paths with [`Binding`] or a [`BindingGroup`]. Everything runs on the
//! thread that mutates the graph; notifications are delivered synchronously.

pub mod binding;
pub mod chain;
pub mod converter;
pub mod error;
pub mod group;
pub mod policy;
pub mod resolver;

pub use binding::{Binding, BindingBuilder, BindingState, Side};
pub use chain::{ChainListener, PathObserver};
pub use converter::{FnConverter, ValueConverter};
pub use error::BindingError;
pub use group::BindingGroup;
#[cfg(feature = "policy-config")]
pub use policy::PolicyError;
pub use policy::{BindingPolicy, InitialSync, ShapeErrorPolicy};
pub use resolver::{Resolution, Terminal, resolve, resolve_from, resolve_prefix_from};
