//! Error types for the connector-fixtures crate.
//!
//! Port failures are wrapped with the fixture step that hit them. Skips are
//! not errors and never appear here; see [`crate::SkipReason`].

use thiserror::Error;

use crate::naming::Namespace;
use crate::ports::{ComputeEngineError, DocumentStoreError, SampleDataError};
use crate::version::VersionError;

/// Errors raised while setting up or tearing down fixtures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixtureError {
    /// The connection to the document store could not be opened.
    #[error("failed to open document store connection: {source}")]
    Connection {
        /// Underlying store error.
        source: DocumentStoreError,
    },

    /// Dropping a database or collection failed.
    #[error("failed to drop '{target}': {source}")]
    Cleanup {
        /// Database or `database.collection` being dropped.
        target: String,
        /// Underlying store error.
        source: DocumentStoreError,
    },

    /// The compute session could not be created.
    #[error("failed to create compute session: {source}")]
    SessionCreation {
        /// Underlying engine error.
        source: ComputeEngineError,
    },

    /// The compute session could not be stopped.
    #[error("failed to stop compute session: {source}")]
    SessionStop {
        /// Underlying engine error.
        source: ComputeEngineError,
    },

    /// The server refused the `buildInfo` command.
    #[error("failed to query server version: {source}")]
    VersionLookup {
        /// Underlying store error.
        source: DocumentStoreError,
    },

    /// A version could not be parsed.
    #[error("invalid version: {0}")]
    Version(#[from] VersionError),

    /// The deployment topology could not be determined.
    #[error("failed to query cluster topology: {source}")]
    Topology {
        /// Underlying store error.
        source: DocumentStoreError,
    },

    /// A sample data operation failed.
    #[error("sample data operation on '{namespace}' failed: {source}")]
    SampleData {
        /// Collection the loader was working on.
        namespace: Namespace,
        /// Underlying loader error.
        source: SampleDataError,
    },
}

impl FixtureError {
    /// Wrap a failed drop of `target`.
    #[must_use]
    pub fn cleanup(target: impl Into<String>, source: DocumentStoreError) -> Self {
        Self::Cleanup {
            target: target.into(),
            source,
        }
    }
}
