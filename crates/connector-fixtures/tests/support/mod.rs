//! Shared fixtures for connector-fixtures integration tests.
//!
//! Wires a [`FixtureController`] to the in-memory doubles and keeps clones of
//! the doubles so tests can assert on what the controller did.

use connector_fixtures::test_support::{
    InMemoryDocumentStore, RecordingComputeEngine, RecordingSampleDataLoader,
};
use connector_fixtures::{FixtureController, FixtureSettings, logging};
use rstest::fixture;

/// Suite name used by every harness.
pub const SUITE_NAME: &str = "ReaderSuite";

/// A controller plus clones of the doubles it was built from.
pub struct Harness {
    /// Controller under test.
    pub fixtures: FixtureController,
    /// Shared view of the document store double.
    pub store: InMemoryDocumentStore,
    /// Shared view of the compute engine double.
    pub engine: RecordingComputeEngine,
    /// Shared view of the sample data double.
    pub loader: RecordingSampleDataLoader,
}

impl Harness {
    /// Build a harness around `store`.
    #[must_use]
    pub fn new(store: InMemoryDocumentStore) -> Self {
        logging::init_test_logging();
        let engine = RecordingComputeEngine::new();
        let loader = RecordingSampleDataLoader::new();
        let fixtures = FixtureController::builder(store.clone(), engine.clone())
            .sample_data_loader(loader.clone())
            .settings(FixtureSettings::local())
            .suite_name(SUITE_NAME)
            .build();
        Self {
            fixtures,
            store,
            engine,
            loader,
        }
    }

    /// Drops recorded against the suite database.
    #[must_use]
    pub fn suite_database_drops(&self) -> usize {
        self.store
            .database_drop_count(self.fixtures.active_database_name())
    }
}

/// Harness over a reachable in-memory store.
#[fixture]
pub fn online() -> Harness {
    Harness::new(InMemoryDocumentStore::reachable())
}

/// Harness over a store that refuses every connection.
#[fixture]
pub fn offline() -> Harness {
    Harness::new(InMemoryDocumentStore::unreachable())
}
