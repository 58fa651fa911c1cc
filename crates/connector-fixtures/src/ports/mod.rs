//! Ports for the external services fixtures drive.

mod macros;
pub(crate) use macros::define_port_error;

mod compute_engine;
mod document_store;
mod sample_data;

#[cfg(test)]
pub use compute_engine::{MockComputeEngine, MockComputeSession};
pub use compute_engine::{ComputeEngine, ComputeEngineError, ComputeSession, SessionConfig};
#[cfg(test)]
pub use document_store::{MockDocumentStore, MockStoreConnection};
pub use document_store::{
    ClusterTopology, CollectionHandle, DatabaseHandle, DocumentStore, DocumentStoreError,
    StoreConnection,
};
#[cfg(test)]
pub use sample_data::MockSampleDataLoader;
pub use sample_data::{SampleDataError, SampleDataLoader, UnconfiguredSampleDataLoader};
