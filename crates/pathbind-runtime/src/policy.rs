#![forbid(unsafe_code)]

//! Binding policy: the few behaviors a host may choose.
//!
//! The defaults reproduce the classic key-value binding behavior:
//!
//! | Knob | Default | Alternative |
//! |------|---------|-------------|
//! | [`ShapeErrorPolicy`] | `Fatal`: a rebuild that hits an unknown field kills the binding | `Broken`: report the terminal as unset and keep observing |
//! | [`InitialSync`] | `DestinationFirst`: the destination value wins at bind time | `SourceFirst` |
//! | `verify_writable_on_bind` | `true` | `false`: defer the check to the first write |
//!
//! # Feature Gate
//!
//! With the `policy-config` feature the policy can be loaded from TOML or
//! JSON:
//!
//! ```toml
//! shape_errors = "broken"
//! initial_sync = "source_first"
//! verify_writable_on_bind = false
//! ```
//!
//! Missing keys take their defaults.

/// What a path observer does when a rebuild meets a shape error
/// (unknown field, non-observable field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "policy-config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "policy-config", serde(rename_all = "snake_case"))]
pub enum ShapeErrorPolicy {
    /// Release every hop and report the error.
    #[default]
    Fatal,
    /// Keep the hops that still resolve and report the terminal as unset.
    Broken,
}

/// Which side is attached first when a binding is bound.
///
/// Attaching a side synchronizes its current terminal into the other side,
/// so the first side's value is the one both sides end up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "policy-config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "policy-config", serde(rename_all = "snake_case"))]
pub enum InitialSync {
    #[default]
    DestinationFirst,
    SourceFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "policy-config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct BindingPolicy {
    pub shape_errors: ShapeErrorPolicy,
    pub initial_sync: InitialSync,
    /// Fail `bind()` when either resolved terminal is read-only.
    pub verify_writable_on_bind: bool,
}

impl Default for BindingPolicy {
    fn default() -> Self {
        Self {
            shape_errors: ShapeErrorPolicy::default(),
            initial_sync: InitialSync::default(),
            verify_writable_on_bind: true,
        }
    }
}

impl BindingPolicy {
    #[must_use]
    pub fn with_shape_errors(mut self, shape_errors: ShapeErrorPolicy) -> Self {
        self.shape_errors = shape_errors;
        self
    }

    #[must_use]
    pub fn with_initial_sync(mut self, initial_sync: InitialSync) -> Self {
        self.initial_sync = initial_sync;
        self
    }

    #[must_use]
    pub fn with_verify_writable_on_bind(mut self, verify: bool) -> Self {
        self.verify_writable_on_bind = verify;
        self
    }
}

#[cfg(feature = "policy-config")]
pub use config::PolicyError;

#[cfg(feature = "policy-config")]
mod config {
    use std::path::{Path, PathBuf};

    use super::BindingPolicy;

    /// Errors from loading a policy file.
    #[derive(Debug, thiserror::Error)]
    pub enum PolicyError {
        #[error("failed to read policy file: {0}")]
        Io(#[from] std::io::Error),
        #[error("invalid TOML policy: {0}")]
        Toml(#[from] toml::de::Error),
        #[error("invalid JSON policy: {0}")]
        Json(#[from] serde_json::Error),
        /// The file extension is neither `.toml` nor `.json`.
        #[error("unsupported policy file format: {}", path.display())]
        UnsupportedFormat { path: PathBuf },
    }

    impl BindingPolicy {
        /// Parse a policy from TOML.
        ///
        /// # Errors
        ///
        /// [`PolicyError::Toml`] on malformed input or unknown variants.
        pub fn from_toml_str(text: &str) -> Result<Self, PolicyError> {
            Ok(toml::from_str(text)?)
        }

        /// Parse a policy from JSON.
        ///
        /// # Errors
        ///
        /// [`PolicyError::Json`] on malformed input or unknown variants.
        pub fn from_json_str(text: &str) -> Result<Self, PolicyError> {
            Ok(serde_json::from_str(text)?)
        }

        /// Load a policy file, choosing the format by extension.
        ///
        /// # Errors
        ///
        /// I/O failures, parse failures, or an unsupported extension.
        pub fn load(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path)?;
            match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => Self::from_toml_str(&text),
                Some("json") => Self::from_json_str(&text),
                _ => Err(PolicyError::UnsupportedFormat {
                    path: path.to_path_buf(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_behavior() {
        let policy = BindingPolicy::default();
        assert_eq!(policy.shape_errors, ShapeErrorPolicy::Fatal);
        assert_eq!(policy.initial_sync, InitialSync::DestinationFirst);
        assert!(policy.verify_writable_on_bind);
    }

    #[test]
    fn builder_methods() {
        let policy = BindingPolicy::default()
            .with_shape_errors(ShapeErrorPolicy::Broken)
            .with_initial_sync(InitialSync::SourceFirst)
            .with_verify_writable_on_bind(false);
        assert_eq!(policy.shape_errors, ShapeErrorPolicy::Broken);
        assert_eq!(policy.initial_sync, InitialSync::SourceFirst);
        assert!(!policy.verify_writable_on_bind);
    }
}
