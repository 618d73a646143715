#![forbid(unsafe_code)]

//! Observation chains: one listener per resolved hop of a key path.
//!
//! A [`PathObserver`] keeps an ordered array of hops, one per observable in
//! the currently resolved prefix of its key path. Each hop listens to its
//! observable. When hop `i` reports a new payload, every hop after `i` is
//! released (the objects it watched may have been replaced), the rest of the
//! path is resolved again from hop `i`, fresh hops are installed for
//! whatever resolves, and the listener hears the new terminal state.
//!
//! # Invariants
//!
//! 1. At most one hop per path index.
//! 2. Hops always form a prefix `0..n` of the path, and every hop but the
//!    last had a non-null payload when it was installed.
//! 3. `hop_count() == path.len()` exactly when the terminal is reachable.
//! 4. Every installed subscription is owned by exactly one hop and is
//!    released when that hop is discarded.
//! 5. No internal borrow is held while the [`ChainListener`] runs, so the
//!    listener may mutate the graph, including this chain's own observables.
//!
//! # Stale notifications
//!
//! An observable snapshots its subscribers before notifying. If an earlier
//! callback of the same round rebuilt this chain, a callback of a hop that
//! was just discarded can still arrive. Each hop carries a generation number
//! and callbacks whose `(index, generation)` no longer matches the hop array
//! are dropped.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Shape error at attach | Path does not match the graph | `attach` returns `Err`, nothing installed |
//! | Shape error at rebuild | Graph changed to a different shape | Per [`ShapeErrorPolicy`] |
//! | Double detach | API misuse | [`BindingError::AlreadyDetached`] |

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use pathbind_core::{AsObservableRef, KeyPath, ObservableRef, Subscription, Value};
use tracing::{debug, error, trace, warn};

use crate::error::BindingError;
use crate::policy::{BindingPolicy, ShapeErrorPolicy};
use crate::resolver::{self, Terminal};

/// Receives the terminal state of a [`PathObserver`].
pub trait ChainListener {
    /// Called once at attach time and after every rebuild.
    fn terminal_changed(&self, terminal: Terminal);

    /// Called when a rebuild hit a fatal shape error. The observer has
    /// already released every hop.
    fn chain_failed(&self, error: &BindingError) {
        let _ = error;
    }
}

impl<F: Fn(Terminal)> ChainListener for F {
    fn terminal_changed(&self, terminal: Terminal) {
        self(terminal);
    }
}

/// One observed step of the resolved chain.
struct Hop {
    index: usize,
    generation: u64,
    observable: ObservableRef,
    _subscription: Subscription,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Status {
    Active,
    Faulted(BindingError),
    Detached,
}

struct ChainInner {
    root: ObservableRef,
    path: KeyPath,
    shape_errors: ShapeErrorPolicy,
    listener: Box<dyn ChainListener>,
    hops: RefCell<Vec<Hop>>,
    status: RefCell<Status>,
    next_generation: Cell<u64>,
}

impl ChainInner {
    /// Append hops for `links`, the first of which sits at `first_index`.
    fn install(
        self: &Rc<Self>,
        hops: &mut Vec<Hop>,
        first_index: usize,
        links: impl IntoIterator<Item = ObservableRef>,
    ) {
        for (offset, observable) in links.into_iter().enumerate() {
            let index = first_index + offset;
            debug_assert_eq!(hops.len(), index, "hops must stay a prefix of the path");

            let generation = self.next_generation.get();
            self.next_generation.set(generation + 1);

            let weak = Rc::downgrade(self);
            let subscription = observable.add_listener(Box::new(move |_: &Value| {
                if let Some(chain) = weak.upgrade() {
                    chain.hop_changed(index, generation);
                }
            }));

            trace!(path = %self.path, index, generation, "hop installed");
            hops.push(Hop {
                index,
                generation,
                observable,
                _subscription: subscription,
            });
        }
    }

    fn terminal(&self, hops: &[Hop]) -> Terminal {
        match hops.last() {
            Some(hop) if hops.len() == self.path.len() => {
                Terminal::Resolved(hop.observable.value())
            }
            _ => Terminal::Unset,
        }
    }

    fn is_active(&self) -> bool {
        matches!(*self.status.borrow(), Status::Active)
    }

    fn hop_changed(self: &Rc<Self>, index: usize, generation: u64) {
        if !self.is_active() {
            trace!(path = %self.path, index, "notification after release ignored");
            return;
        }

        let terminal = {
            let mut hops = self.hops.borrow_mut();
            let current = hops
                .get(index)
                .is_some_and(|hop| hop.generation == generation);
            if !current {
                trace!(path = %self.path, index, generation, "stale hop notification ignored");
                return;
            }

            let released = hops.len() - (index + 1);
            hops.truncate(index + 1);
            let anchor = Rc::clone(&hops[index].observable);

            let (resolution, shape_error) =
                resolver::resolve_prefix_from(&anchor, index, &self.path);
            match shape_error {
                Some(err) if self.shape_errors == ShapeErrorPolicy::Fatal => {
                    hops.clear();
                    drop(hops);
                    error!(path = %self.path, index, error = %err, "key path no longer matches the graph");
                    *self.status.borrow_mut() = Status::Faulted(err.clone());
                    self.listener.chain_failed(&err);
                    return;
                }
                Some(err) => {
                    warn!(path = %self.path, index, error = %err, "key path no longer matches the graph; treating as unset");
                }
                None => {}
            }
            self.install(&mut hops, index + 1, resolution.into_links().into_iter().skip(1));

            trace!(
                path = %self.path,
                index,
                released,
                hops = hops.len(),
                "chain rebuilt"
            );
            self.terminal(&hops)
        };

        self.listener.terminal_changed(terminal);
    }

    /// Drop every hop. Returns how many were installed.
    fn release(&self) -> usize {
        let mut hops = self.hops.borrow_mut();
        let released = hops.len();
        hops.clear();
        released
    }
}

/// Handle to an active observation chain over one key path.
///
/// Dropping the handle releases every hop, exactly like
/// [`detach`](Self::detach).
pub struct PathObserver {
    inner: Rc<ChainInner>,
}

impl PathObserver {
    /// Resolve `path` from `root`, install one hop per resolved observable,
    /// and report the initial terminal state to `listener`.
    ///
    /// # Errors
    ///
    /// Shape errors from the resolver. They are detected before any hop is
    /// installed and before the listener is called.
    pub fn attach(
        root: &impl AsObservableRef,
        path: KeyPath,
        listener: impl ChainListener + 'static,
    ) -> Result<Self, BindingError> {
        Self::attach_with_policy(root, path, listener, &BindingPolicy::default())
    }

    /// [`attach`](Self::attach) with an explicit policy.
    ///
    /// # Errors
    ///
    /// Same as [`attach`](Self::attach).
    pub fn attach_with_policy(
        root: &impl AsObservableRef,
        path: KeyPath,
        listener: impl ChainListener + 'static,
        policy: &BindingPolicy,
    ) -> Result<Self, BindingError> {
        let root = root.observable_ref();
        let resolution = resolver::resolve(&root, &path)?;

        let inner = Rc::new(ChainInner {
            root,
            path,
            shape_errors: policy.shape_errors,
            listener: Box::new(listener),
            hops: RefCell::new(Vec::with_capacity(resolution.links().len())),
            status: RefCell::new(Status::Active),
            next_generation: Cell::new(0),
        });

        let terminal = {
            let mut hops = inner.hops.borrow_mut();
            inner.install(&mut hops, 0, resolution.into_links());
            debug!(
                path = %inner.path,
                hops = hops.len(),
                complete = hops.len() == inner.path.len(),
                "path observer attached"
            );
            inner.terminal(&hops)
        };

        inner.listener.terminal_changed(terminal);
        Ok(Self { inner })
    }

    /// Release every hop and make the observer inert.
    ///
    /// # Errors
    ///
    /// [`BindingError::AlreadyDetached`] if called twice.
    pub fn detach(&mut self) -> Result<(), BindingError> {
        if matches!(*self.inner.status.borrow(), Status::Detached) {
            return Err(BindingError::AlreadyDetached {
                path: self.inner.path.to_string(),
            });
        }
        *self.inner.status.borrow_mut() = Status::Detached;
        let released = self.inner.release();
        debug!(path = %self.inner.path, released, "path observer detached");
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &KeyPath {
        &self.inner.path
    }

    #[must_use]
    pub fn root(&self) -> &ObservableRef {
        &self.inner.root
    }

    /// Number of installed hops.
    #[must_use]
    pub fn hop_count(&self) -> usize {
        self.inner.hops.borrow().len()
    }

    /// Path indices of the installed hops, in order.
    #[must_use]
    pub fn hop_indices(&self) -> Vec<usize> {
        self.inner.hops.borrow().iter().map(|hop| hop.index).collect()
    }

    /// Whether every segment is resolved and observed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.hop_count() == self.inner.path.len()
    }

    /// Whether the observer is still reacting to changes.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    /// Current terminal state, read from the installed hops.
    #[must_use]
    pub fn terminal(&self) -> Terminal {
        self.inner.terminal(&self.inner.hops.borrow())
    }

    /// The shape error that stopped this observer, if any.
    #[must_use]
    pub fn fault(&self) -> Option<BindingError> {
        match &*self.inner.status.borrow() {
            Status::Faulted(err) => Some(err.clone()),
            Status::Active | Status::Detached => None,
        }
    }
}

impl Drop for PathObserver {
    fn drop(&mut self) {
        *self.inner.status.borrow_mut() = Status::Detached;
        self.inner.release();
    }
}

impl fmt::Debug for PathObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathObserver")
            .field("path", &self.inner.path)
            .field("hops", &self.hop_count())
            .field("status", &*self.inner.status.borrow())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
