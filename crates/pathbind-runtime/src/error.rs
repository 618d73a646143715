#![forbid(unsafe_code)]

//! Configuration errors raised by path observers and bindings.
//!
//! Every variant here means the declared key path does not fit the object
//! graph, or the API was misused. None of them can be fixed by waiting for
//! the graph to change, so they are never retried. A chain that is merely
//! broken by a `Null` intermediate is not an error; it is reported as
//! [`Terminal::Unset`](crate::resolver::Terminal::Unset).

use pathbind_core::KeyPathError;

use crate::binding::Side;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    /// A binding side was given a malformed key path.
    #[error("invalid {side} key path: {source}")]
    InvalidKeyPath {
        side: Side,
        #[source]
        source: KeyPathError,
    },
    /// A segment names a field the payload's type does not have.
    #[error("could not bind `{path}`: field `{at}` was not found on {type_name}")]
    NoSuchField {
        path: String,
        at: String,
        type_name: String,
    },
    /// A segment names a field that is not an observable value.
    #[error("could not bind `{path}`: field `{at}` of {type_name} is not an observable value")]
    NotObservable {
        path: String,
        at: String,
        type_name: String,
    },
    /// The resolved terminal cannot accept a new value.
    #[error("could not bind `{path}`: the terminal value is not writable")]
    NotWritable { path: String },
    /// `detach` was called on an observer that is already detached.
    #[error("path observer for `{path}` is already detached")]
    AlreadyDetached { path: String },
    #[error("binding is already bound")]
    AlreadyBound,
    /// Unbound bindings are permanently inert; build a new one instead.
    #[error("binding was unbound and cannot be bound again")]
    AlreadyUnbound,
}

impl BindingError {
    /// Whether the error is a mismatch between a key path and the object
    /// graph (as opposed to API misuse).
    #[must_use]
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(
            self,
            Self::NoSuchField { .. } | Self::NotObservable { .. } | Self::NotWritable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let err = BindingError::NoSuchField {
            path: "root.house.name".into(),
            at: "root.house".into(),
            type_name: "Model".into(),
        };
        assert_eq!(
            err.to_string(),
            "could not bind `root.house.name`: field `root.house` was not found on Model"
        );

        let err = BindingError::InvalidKeyPath {
            side: Side::Destination,
            source: KeyPathError::MissingRoot {
                path: "house".into(),
            },
        };
        assert!(err.to_string().starts_with("invalid destination key path"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn shape_mismatch_classification() {
        assert!(BindingError::NotWritable { path: "root".into() }.is_shape_mismatch());
        assert!(!BindingError::AlreadyBound.is_shape_mismatch());
        assert!(
            !BindingError::AlreadyDetached {
                path: "root".into()
            }
            .is_shape_mismatch()
        );
    }
}
