#![forbid(unsafe_code)]

//! Bidirectional bindings between two key paths.
//!
//! A [`Binding`] pairs a destination side and a source side, each a root
//! observable plus a [`KeyPath`]. Once bound, each side is watched by its own
//! [`PathObserver`]; whenever one side reports a new terminal state the
//! binding writes it into the other side.
//!
//! # Usage
//!
//! ```
//! use pathbind_core::{Observable, Record, Value};
//! use pathbind_runtime::Binding;
//!
//! let name = Observable::new(Value::from("Henri's Hut"));
//! let house = Observable::new(Value::object(Record::new("House").with_observable("name", &name)));
//! let model = Observable::new(Value::object(Record::new("Model").with_observable("house", &house)));
//! let label = Observable::new(Value::from(""));
//!
//! let binding = Binding::new(&label, "root", &model, "root.house.name").unwrap();
//! binding.bind().unwrap();
//!
//! name.set(Value::from("Evy's Ranch"));
//! assert_eq!(label.get().as_str(), Some("Evy's Ranch"));
//!
//! label.set(Value::from("Cabin"));
//! assert_eq!(name.get().as_str(), Some("Cabin"));
//! ```
//!
//! # Cross-write rules
//!
//! For a change on side X with terminal `t`, written into the opposite side Y:
//!
//! 1. `Unset` becomes [`Value::Null`]. A resolved value goes through the
//!    converter, if any (`convert` toward the destination, `convert_back`
//!    toward the source).
//! 2. Y is resolved afresh. A broken Y chain is skipped.
//! 3. If Y's terminal is already identical to the value, nothing is written.
//!    This is the cycle guard: the echo of a write always lands here.
//! 4. Otherwise a read-only Y terminal faults the binding.
//!
//! # Invariants
//!
//! 1. The side that changed is never written by its own notification.
//! 2. Lifecycle is `Inert → Bound → Unbound`; `Unbound` is terminal.
//! 3. After `unbind()` (or a fault) neither side holds any listener.
//!
//! # Failure Modes
//!
//! | Failure | When | Behavior |
//! |---------|------|----------|
//! | Malformed key path | `new` / `build` | `Err(InvalidKeyPath)` naming the side |
//! | Shape error, read-only terminal | `bind` | `Err`, nothing stays attached |
//! | Read-only terminal, fatal rebuild | during notification | logged, stored in [`Binding::fault`], binding unbound |

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use pathbind_core::{AsObservableRef, KeyPath, ObservableRef, Value};
use tracing::{debug, error, trace};

use crate::chain::{ChainListener, PathObserver};
use crate::converter::ValueConverter;
use crate::error::BindingError;
use crate::policy::{BindingPolicy, InitialSync, ShapeErrorPolicy};
use crate::resolver::{self, Terminal};

/// One end of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Destination,
    Source,
}

impl Side {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Destination => Self::Source,
            Self::Source => Self::Destination,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Destination => "destination",
            Self::Source => "source",
        })
    }
}

/// Lifecycle of a [`Binding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// Constructed, not yet observing.
    Inert,
    /// Both sides are observed.
    Bound,
    /// Released for good, by `unbind()` or by a fault.
    Unbound,
}

struct Endpoint {
    root: ObservableRef,
    path: KeyPath,
}

#[derive(Default)]
struct Observers {
    destination: Option<PathObserver>,
    source: Option<PathObserver>,
}

impl Observers {
    fn slot(&mut self, side: Side) -> &mut Option<PathObserver> {
        match side {
            Side::Destination => &mut self.destination,
            Side::Source => &mut self.source,
        }
    }

    fn get(&self, side: Side) -> Option<&PathObserver> {
        match side {
            Side::Destination => self.destination.as_ref(),
            Side::Source => self.source.as_ref(),
        }
    }
}

struct Shared {
    destination: Endpoint,
    source: Endpoint,
    converter: Option<Box<dyn ValueConverter>>,
    policy: BindingPolicy,
    state: Cell<BindingState>,
    observers: RefCell<Observers>,
    fault: RefCell<Option<BindingError>>,
}

impl Shared {
    fn endpoint(&self, side: Side) -> &Endpoint {
        match side {
            Side::Destination => &self.destination,
            Side::Source => &self.source,
        }
    }

    fn attach(self: &Rc<Self>, side: Side) -> Result<PathObserver, BindingError> {
        let endpoint = self.endpoint(side);
        let listener = CrossWrite {
            origin: side,
            shared: Rc::downgrade(self),
        };
        PathObserver::attach_with_policy(&endpoint.root, endpoint.path.clone(), listener, &self.policy)
    }

    /// The value that a terminal on `origin` writes into the other side.
    fn outgoing(&self, origin: Side, terminal: Terminal) -> Value {
        match terminal {
            Terminal::Unset => Value::Null,
            Terminal::Resolved(value) => match (&self.converter, origin) {
                (None, _) => value,
                (Some(converter), Side::Source) => converter.convert(&value),
                (Some(converter), Side::Destination) => converter.convert_back(&value),
            },
        }
    }

    fn cross_write(&self, origin: Side, terminal: Terminal) -> Result<(), BindingError> {
        let value = self.outgoing(origin, terminal);
        let target = origin.opposite();
        let endpoint = self.endpoint(target);

        let resolution = match resolver::resolve(&endpoint.root, &endpoint.path) {
            Ok(resolution) => resolution,
            Err(err) if self.policy.shape_errors == ShapeErrorPolicy::Broken => {
                trace!(side = %target, path = %endpoint.path, error = %err, "target does not match the graph; write skipped");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        let Some(terminal) = resolution.terminal() else {
            trace!(side = %target, path = %endpoint.path, "target chain is broken; write skipped");
            return Ok(());
        };

        if terminal.value().is_identical(&value) {
            trace!(side = %target, path = %endpoint.path, "target already holds the value");
            return Ok(());
        }

        let writer = terminal
            .as_writable()
            .ok_or_else(|| BindingError::NotWritable {
                path: endpoint.path.to_string(),
            })?;
        trace!(side = %target, path = %endpoint.path, value = %value, "cross-write");
        writer.set_value(value);
        Ok(())
    }

    /// Record a fault raised while a notification was being delivered.
    fn fail(&self, side: Side, err: BindingError) {
        {
            let mut fault = self.fault.borrow_mut();
            if fault.is_none() {
                *fault = Some(err.clone());
            }
        }

        if self.state.get() != BindingState::Bound {
            // `bind()` picks the fault up and reports it.
            return;
        }

        error!(side = %side, error = %err, "binding faulted; unbinding");
        self.release();
    }

    fn release(&self) {
        self.state.set(BindingState::Unbound);
        let observers = std::mem::take(&mut *self.observers.borrow_mut());
        drop(observers);
    }
}

/// The [`ChainListener`] installed on each side.
struct CrossWrite {
    origin: Side,
    shared: Weak<Shared>,
}

impl ChainListener for CrossWrite {
    fn terminal_changed(&self, terminal: Terminal) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        if shared.state.get() == BindingState::Unbound {
            return;
        }
        if let Err(err) = shared.cross_write(self.origin, terminal) {
            shared.fail(self.origin.opposite(), err);
        }
    }

    fn chain_failed(&self, err: &BindingError) {
        if let Some(shared) = self.shared.upgrade() {
            shared.fail(self.origin, err.clone());
        }
    }
}

/// A bidirectional binding between two key paths.
///
/// Cloning yields another handle to the same binding.
#[derive(Clone)]
pub struct Binding {
    shared: Rc<Shared>,
}

impl Binding {
    /// Create an inert binding with no converter and the default policy.
    ///
    /// # Errors
    ///
    /// [`BindingError::InvalidKeyPath`] if either path is malformed.
    pub fn new(
        destination: &impl AsObservableRef,
        destination_path: &str,
        source: &impl AsObservableRef,
        source_path: &str,
    ) -> Result<Self, BindingError> {
        Self::builder(destination, destination_path, source, source_path).build()
    }

    /// Start a binding with a converter or a non-default policy.
    #[must_use]
    pub fn builder(
        destination: &impl AsObservableRef,
        destination_path: &str,
        source: &impl AsObservableRef,
        source_path: &str,
    ) -> BindingBuilder {
        BindingBuilder {
            destination: destination.observable_ref(),
            destination_path: destination_path.to_owned(),
            source: source.observable_ref(),
            source_path: source_path.to_owned(),
            converter: None,
            policy: BindingPolicy::default(),
        }
    }

    /// Attach both sides and perform the initial synchronization.
    ///
    /// The side attached first (see [`InitialSync`]) pushes its terminal
    /// into the other side.
    ///
    /// # Errors
    ///
    /// - [`BindingError::AlreadyBound`] / [`BindingError::AlreadyUnbound`].
    /// - Shape errors from either side.
    /// - [`BindingError::NotWritable`] when a terminal is read-only and
    ///   [`BindingPolicy::verify_writable_on_bind`] is set, or when the
    ///   initial synchronization has to write into it.
    ///
    /// On error nothing stays attached and the binding remains inert.
    pub fn bind(&self) -> Result<(), BindingError> {
        let shared = &self.shared;
        match shared.state.get() {
            BindingState::Inert => {}
            BindingState::Bound => return Err(BindingError::AlreadyBound),
            BindingState::Unbound => return Err(BindingError::AlreadyUnbound),
        }

        if shared.policy.verify_writable_on_bind {
            for side in [Side::Destination, Side::Source] {
                let endpoint = shared.endpoint(side);
                let resolution = resolver::resolve(&endpoint.root, &endpoint.path)?;
                resolution.writable_terminal(&endpoint.path)?;
            }
        }

        let order = match shared.policy.initial_sync {
            InitialSync::DestinationFirst => [Side::Destination, Side::Source],
            InitialSync::SourceFirst => [Side::Source, Side::Destination],
        };

        for side in order {
            let attached = shared.attach(side);
            let fault = shared.fault.borrow_mut().take();
            let result = match (attached, fault) {
                (Ok(observer), None) => {
                    *shared.observers.borrow_mut().slot(side) = Some(observer);
                    Ok(())
                }
                (Ok(_), Some(err)) | (Err(err), _) => Err(err),
            };
            if let Err(err) = result {
                debug!(side = %side, error = %err, "bind failed");
                let observers = std::mem::take(&mut *shared.observers.borrow_mut());
                drop(observers);
                return Err(err);
            }
        }

        shared.state.set(BindingState::Bound);
        debug!(
            destination = %shared.destination.path,
            source = %shared.source.path,
            "binding bound"
        );
        Ok(())
    }

    /// Release both sides. Idempotent; an unbound binding can never be
    /// bound again.
    pub fn unbind(&self) {
        if self.shared.state.get() == BindingState::Unbound {
            return;
        }
        self.shared.release();
        debug!(
            destination = %self.shared.destination.path,
            source = %self.shared.source.path,
            "binding unbound"
        );
    }

    #[must_use]
    pub fn state(&self) -> BindingState {
        self.shared.state.get()
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.state() == BindingState::Bound
    }

    /// The error that unbound this binding during notification delivery.
    #[must_use]
    pub fn fault(&self) -> Option<BindingError> {
        self.shared.fault.borrow().clone()
    }

    /// Installed hops on `side`; zero unless bound.
    #[must_use]
    pub fn hop_count(&self, side: Side) -> usize {
        self.shared
            .observers
            .borrow()
            .get(side)
            .map_or(0, PathObserver::hop_count)
    }

    /// Current terminal state of `side`, resolved from the graph.
    ///
    /// # Errors
    ///
    /// Shape errors if the graph no longer matches the path.
    pub fn terminal(&self, side: Side) -> Result<Terminal, BindingError> {
        let endpoint = self.shared.endpoint(side);
        Ok(resolver::resolve(&endpoint.root, &endpoint.path)?.terminal_state())
    }

    #[must_use]
    pub fn destination_object(&self) -> ObservableRef {
        Rc::clone(&self.shared.destination.root)
    }

    #[must_use]
    pub fn destination_path(&self) -> &KeyPath {
        &self.shared.destination.path
    }

    /// The destination key path in dotted form.
    #[must_use]
    pub fn destination_key_path(&self) -> String {
        self.shared.destination.path.to_string()
    }

    #[must_use]
    pub fn source_object(&self) -> ObservableRef {
        Rc::clone(&self.shared.source.root)
    }

    #[must_use]
    pub fn source_path(&self) -> &KeyPath {
        &self.shared.source.path
    }

    /// The source key path in dotted form.
    #[must_use]
    pub fn source_key_path(&self) -> String {
        self.shared.source.path.to_string()
    }

    #[must_use]
    pub fn policy(&self) -> &BindingPolicy {
        &self.shared.policy
    }

    /// Whether both handles refer to the same binding.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("destination", &self.shared.destination.path)
            .field("source", &self.shared.source.path)
            .field("state", &self.shared.state.get())
            .field("converter", &self.shared.converter.is_some())
            .finish()
    }
}

/// Builder returned by [`Binding::builder`].
#[must_use]
pub struct BindingBuilder {
    destination: ObservableRef,
    destination_path: String,
    source: ObservableRef,
    source_path: String,
    converter: Option<Box<dyn ValueConverter>>,
    policy: BindingPolicy,
}

impl BindingBuilder {
    pub fn converter(mut self, converter: impl ValueConverter + 'static) -> Self {
        self.converter = Some(Box::new(converter));
        self
    }

    pub fn policy(mut self, policy: BindingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Parse both key paths and create the inert binding.
    ///
    /// # Errors
    ///
    /// [`BindingError::InvalidKeyPath`] naming the malformed side.
    pub fn build(self) -> Result<Binding, BindingError> {
        let parse = |side: Side, text: &str| {
            KeyPath::parse(text).map_err(|source| BindingError::InvalidKeyPath { side, source })
        };
        let destination_path = parse(Side::Destination, &self.destination_path)?;
        let source_path = parse(Side::Source, &self.source_path)?;

        Ok(Binding {
            shared: Rc::new(Shared {
                destination: Endpoint {
                    root: self.destination,
                    path: destination_path,
                },
                source: Endpoint {
                    root: self.source,
                    path: source_path,
                },
                converter: self.converter,
                policy: self.policy,
                state: Cell::new(BindingState::Inert),
                observers: RefCell::new(Observers::default()),
                fault: RefCell::new(None),
            }),
        })
    }
}

impl fmt::Debug for BindingBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingBuilder")
            .field("destination_path", &self.destination_path)
            .field("source_path", &self.source_path)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
