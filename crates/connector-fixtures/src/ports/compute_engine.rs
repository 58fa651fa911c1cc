//! Port for the distributed compute engine hosting the connector.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::define_port_error;

define_port_error! {
    /// Errors raised by compute engine adapters.
    pub enum ComputeEngineError {
        /// The engine could not start a session.
        SessionStart {
            /// Engine-provided description of the failure.
            message: String,
        } => "compute session failed to start: {message}",
        /// The engine could not stop a session cleanly.
        SessionStop {
            /// Engine-provided description of the failure.
            message: String,
        } => "compute session failed to stop: {message}",
    }
}

/// Settings handed to the engine when a session is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    master: String,
    app_name: String,
    options: BTreeMap<String, String>,
}

impl SessionConfig {
    /// Start a configuration for `master` labelled `app_name`.
    #[must_use]
    pub fn new(master: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            master: master.into(),
            app_name: app_name.into(),
            options: BTreeMap::new(),
        }
    }

    /// Merge additional options, replacing existing keys.
    #[must_use]
    pub fn with_options(mut self, options: impl IntoIterator<Item = (String, String)>) -> Self {
        self.options.extend(options);
        self
    }

    /// Cluster master URL, e.g. `local`.
    #[must_use]
    pub fn master(&self) -> &str {
        &self.master
    }

    /// Application name shown by the engine.
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Engine options in key order.
    #[must_use]
    pub const fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// Look up a single option.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

/// Factory for compute sessions.
#[cfg_attr(test, mockall::automock)]
pub trait ComputeEngine: Send + Sync {
    /// Create a session. Sessions are expensive; callers cache the result.
    fn create_session(
        &self,
        config: &SessionConfig,
    ) -> Result<Arc<dyn ComputeSession>, ComputeEngineError>;
}

/// A live compute-engine execution context.
#[cfg_attr(test, mockall::automock)]
pub trait ComputeSession: Send + Sync {
    /// Stop the session and release its executors.
    fn stop(&self) -> Result<(), ComputeEngineError>;
}
