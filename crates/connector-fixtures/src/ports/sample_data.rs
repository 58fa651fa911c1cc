//! Port for loading sample documents into test collections.

use std::path::Path;

use serde_json::Value;

use super::define_port_error;
use crate::naming::Namespace;

define_port_error! {
    /// Errors raised by sample data loaders.
    pub enum SampleDataError {
        /// Documents could not be generated or inserted.
        Load {
            /// Loader-provided description of the failure.
            message: String,
        } => "sample data load failed: {message}",
        /// The collection could not be sharded.
        Shard {
            /// Loader-provided description of the failure.
            message: String,
        } => "sharding collection failed: {message}",
    }
}

/// Populates collections with generated or file-backed documents.
#[cfg_attr(test, mockall::automock)]
pub trait SampleDataLoader: Send + Sync {
    /// Load roughly `size_mb` megabytes of generated documents.
    fn load(&self, namespace: &Namespace, size_mb: u32) -> Result<(), SampleDataError>;

    /// Load `document_count` documents totalling roughly `size_mb` megabytes.
    fn load_with_count(
        &self,
        namespace: &Namespace,
        size_mb: u32,
        document_count: u32,
    ) -> Result<(), SampleDataError>;

    /// Load documents from a bundled file.
    fn load_from_file(&self, namespace: &Namespace, filename: &Path)
    -> Result<(), SampleDataError>;

    /// Load generated documents whose `_id` is a composite document.
    fn load_with_composite_key(
        &self,
        namespace: &Namespace,
        size_mb: u32,
    ) -> Result<(), SampleDataError>;

    /// Shard the collection on `shard_key`, e.g. `{"_id": 1}`.
    fn shard_collection(&self, namespace: &Namespace, shard_key: &Value)
    -> Result<(), SampleDataError>;
}

const NO_LOADER: &str = "no sample data loader configured";

/// Loader used until a suite configures one; every call fails so a suite
/// never runs against a collection it believes was seeded.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredSampleDataLoader;

impl SampleDataLoader for UnconfiguredSampleDataLoader {
    fn load(&self, _namespace: &Namespace, _size_mb: u32) -> Result<(), SampleDataError> {
        Err(SampleDataError::load(NO_LOADER))
    }

    fn load_with_count(
        &self,
        _namespace: &Namespace,
        _size_mb: u32,
        _document_count: u32,
    ) -> Result<(), SampleDataError> {
        Err(SampleDataError::load(NO_LOADER))
    }

    fn load_from_file(
        &self,
        _namespace: &Namespace,
        _filename: &Path,
    ) -> Result<(), SampleDataError> {
        Err(SampleDataError::load(NO_LOADER))
    }

    fn load_with_composite_key(
        &self,
        _namespace: &Namespace,
        _size_mb: u32,
    ) -> Result<(), SampleDataError> {
        Err(SampleDataError::load(NO_LOADER))
    }

    fn shard_collection(
        &self,
        _namespace: &Namespace,
        _shard_key: &Value,
    ) -> Result<(), SampleDataError> {
        Err(SampleDataError::shard(NO_LOADER))
    }
}
