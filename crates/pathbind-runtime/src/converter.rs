#![forbid(unsafe_code)]

//! Optional value conversion applied to values crossing a binding.
//!
//! A converter sits between the two sides of a [`Binding`](crate::Binding).
//! Values travelling from the source to the destination go through
//! [`ValueConverter::convert`]; values travelling back go through
//! [`ValueConverter::convert_back`]. The conversion runs before the
//! identity guard, so the guard compares converted values.
//!
//! Converters should be inverse of each other for values they produce.
//! Otherwise the two sides keep rewriting each other until the values
//! settle, which may never happen.

use pathbind_core::Value;

/// A bidirectional value transform.
pub trait ValueConverter {
    /// Source → destination.
    fn convert(&self, value: &Value) -> Value;

    /// Destination → source.
    fn convert_back(&self, value: &Value) -> Value;
}

/// A [`ValueConverter`] built from two closures.
///
/// ```
/// use pathbind_core::Value;
/// use pathbind_runtime::{FnConverter, ValueConverter};
///
/// let cents = FnConverter::new(
///     |v: &Value| Value::from(v.as_int().unwrap_or(0) * 100),
///     |v: &Value| Value::from(v.as_int().unwrap_or(0) / 100),
/// );
/// assert_eq!(cents.convert(&Value::from(3)).as_int(), Some(300));
/// assert_eq!(cents.convert_back(&Value::from(300)).as_int(), Some(3));
/// ```
pub struct FnConverter<F, G> {
    forward: F,
    backward: G,
}

impl<F, G> FnConverter<F, G>
where
    F: Fn(&Value) -> Value,
    G: Fn(&Value) -> Value,
{
    pub fn new(forward: F, backward: G) -> Self {
        Self { forward, backward }
    }
}

impl<F, G> ValueConverter for FnConverter<F, G>
where
    F: Fn(&Value) -> Value,
    G: Fn(&Value) -> Value,
{
    fn convert(&self, value: &Value) -> Value {
        (self.forward)(value)
    }

    fn convert_back(&self, value: &Value) -> Value {
        (self.backward)(value)
    }
}

impl<F, G> std::fmt::Debug for FnConverter<F, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnConverter").finish_non_exhaustive()
    }
}
