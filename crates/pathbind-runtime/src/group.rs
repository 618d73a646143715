#![forbid(unsafe_code)]

//! Owning collections of bindings.
//!
//! A [`BindingGroup`] holds the bindings created for one logical scope (a
//! view, a document, a form). When the group is dropped every binding it
//! still holds is unbound, so the scope's listeners disappear with it.
//!
//! ```
//! use pathbind_core::{Observable, Value};
//! use pathbind_runtime::BindingGroup;
//!
//! let a = Observable::new(Value::from(1));
//! let b = Observable::new(Value::from(2));
//! {
//!     let mut group = BindingGroup::new();
//!     group.bind(&a, "root", &b, "root").unwrap();
//!     assert_eq!(b.get().as_int(), Some(1));
//! }
//! // Group dropped: the sides are independent again.
//! a.set(Value::from(5));
//! assert_eq!(b.get().as_int(), Some(1));
//! ```

use pathbind_core::AsObservableRef;
use tracing::debug;

use crate::binding::{Binding, BindingBuilder};
use crate::error::BindingError;

/// Creates, binds and retains [`Binding`]s.
pub struct BindingGroup {
    bindings: Vec<Binding>,
}

impl BindingGroup {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Construct a binding with default options, bind it, and retain it.
    ///
    /// # Errors
    ///
    /// Any error from [`Binding::new`] or [`Binding::bind`]. A binding that
    /// fails to bind is not retained.
    pub fn bind(
        &mut self,
        destination: &impl AsObservableRef,
        destination_path: &str,
        source: &impl AsObservableRef,
        source_path: &str,
    ) -> Result<Binding, BindingError> {
        self.bind_with(Binding::builder(
            destination,
            destination_path,
            source,
            source_path,
        ))
    }

    /// Build, bind, and retain a binding with a converter or policy.
    ///
    /// # Errors
    ///
    /// Same as [`bind`](Self::bind).
    pub fn bind_with(&mut self, builder: BindingBuilder) -> Result<Binding, BindingError> {
        let binding = builder.build()?;
        binding.bind()?;
        self.bindings.push(binding.clone());
        Ok(binding)
    }

    /// Snapshot of the retained bindings.
    #[must_use]
    pub fn bindings(&self) -> Vec<Binding> {
        self.bindings.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Unbind every retained binding and forget them.
    ///
    /// The group is reusable afterwards.
    pub fn unbind_all(&mut self) {
        let count = self.bindings.len();
        for binding in self.bindings.drain(..) {
            binding.unbind();
        }
        if count > 0 {
            debug!(count, "binding group unbound");
        }
    }
}

impl Default for BindingGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BindingGroup {
    fn drop(&mut self) {
        self.unbind_all();
    }
}

impl std::fmt::Debug for BindingGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingGroup")
            .field("binding_count", &self.bindings.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
