//! Suite and test lifecycle fixtures for connector integration tests.
//!
//! Integration suites for a document-database connector need the same
//! scaffolding: a shared connection, a shared compute session, a database
//! that is reset around every test, and a way to skip cleanly when no
//! database is running. [`FixtureController`] provides that scaffolding over
//! three ports (see [`ports`]), so the crate itself never links a database
//! driver or a compute engine.
//!
//! # Overview
//!
//! - One controller per suite. [`FixtureController::before_suite`] resets the
//!   suite database and [`FixtureController::after_suite`] resets it again,
//!   stops the compute session and returns a [`SuiteReport`].
//! - Each test runs through [`FixtureController::run_test`], which probes the
//!   store, drops the test's collection and records a [`TestOutcome`].
//! - Tests borrow live handles through
//!   [`FixtureController::with_database_session`] and
//!   [`FixtureController::with_compute_session`]. Both skip when the store is
//!   unreachable and drop the suite database however the body exits.
//! - [`FixtureController::server_at_least`] gates tests on the server version.
//!
//! # Example
//!
//! ```
//! # #[cfg(feature = "test-support")]
//! # {
//! use connector_fixtures::FixtureController;
//! use connector_fixtures::test_support::{InMemoryDocumentStore, RecordingComputeEngine};
//!
//! let store = InMemoryDocumentStore::unreachable();
//! let fixtures = FixtureController::builder(store, RecordingComputeEngine::new()).build();
//!
//! let outcome = fixtures.run_test("Reader should load 10MB data", |fixtures| {
//!     fixtures.with_database_session(|_database| Ok::<_, connector_fixtures::FixtureError>(()))?;
//!     Ok::<_, connector_fixtures::FixtureError>(())
//! });
//!
//! assert!(outcome.is_skipped());
//! # }
//! ```

mod config;
mod controller;
mod error;
mod naming;
mod outcome;
mod version;

pub mod logging;
pub mod ports;
#[cfg(feature = "test-support")]
pub mod test_support;

pub use config::{ConnectorConfig, FixtureSettings};
pub use controller::{FixtureController, FixtureControllerBuilder};
pub use error::FixtureError;
pub use naming::{Namespace, TEST_NAME_MARKER, active_test_name, collection_name};
pub use outcome::{SkipReason, SuiteReport, TestOutcome, TestRecord};
pub use version::{ServerVersion, VersionError};
