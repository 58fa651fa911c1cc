//! Suite and test lifecycle for connector integration tests.
//!
//! A [`FixtureController`] owns one suite's view of the outside world: a
//! lazily opened document store connection, a lazily created compute session
//! and the mutable run state (active test, last probe result, version checks,
//! report). Tests borrow the live handles through the loan helpers
//! [`FixtureController::with_database_session`] and
//! [`FixtureController::with_compute_session`], which skip when the store is
//! unreachable and drop the suite database on every exit path.
//!
//! The controller is single-threaded: handles live in [`OnceCell`]s and run
//! state in a [`RefCell`], so the first caller installs each handle and the
//! type cannot be shared across threads.

use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::config::{ConnectorConfig, FixtureSettings};
use crate::error::FixtureError;
use crate::naming::{Namespace, active_test_name, collection_name};
use crate::outcome::{SkipReason, SuiteReport, TestOutcome};
use crate::ports::{
    ClusterTopology, ComputeEngine, ComputeSession, DatabaseHandle, DocumentStore,
    SampleDataError, SampleDataLoader, SessionConfig, StoreConnection,
    UnconfiguredSampleDataLoader,
};
use crate::version::ServerVersion;

/// Database that answers `buildInfo`.
const ADMIN_DATABASE: &str = "admin";

const DEFAULT_SUITE_NAME: &str = "ConnectorSuite";

#[derive(Debug, Default)]
struct SuiteState {
    current_test: Option<String>,
    online: Option<bool>,
    skipped: Option<SkipReason>,
    version_checks: HashMap<String, bool>,
    report: SuiteReport,
}

/// Assembles a [`FixtureController`] from its ports.
pub struct FixtureControllerBuilder {
    store: Box<dyn DocumentStore>,
    engine: Box<dyn ComputeEngine>,
    loader: Box<dyn SampleDataLoader>,
    settings: FixtureSettings,
    suite_name: String,
}

impl FixtureControllerBuilder {
    /// Replace the sample data loader. Until this is called every sample data
    /// helper fails with "no sample data loader configured".
    #[must_use]
    pub fn sample_data_loader(mut self, loader: impl SampleDataLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Replace the settings. Defaults to [`FixtureSettings::local`].
    #[must_use]
    pub fn settings(mut self, settings: FixtureSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Name used in log markers and as the active test name between tests.
    #[must_use]
    pub fn suite_name(mut self, name: impl Into<String>) -> Self {
        self.suite_name = name.into();
        self
    }

    /// Finish the controller. Nothing is contacted until the first hook runs.
    #[must_use]
    pub fn build(self) -> FixtureController {
        FixtureController {
            store: self.store,
            engine: self.engine,
            loader: self.loader,
            settings: self.settings,
            suite_name: self.suite_name,
            connection: OnceCell::new(),
            session: OnceCell::new(),
            state: RefCell::new(SuiteState::default()),
        }
    }
}

/// Lifecycle controller for one test suite.
pub struct FixtureController {
    store: Box<dyn DocumentStore>,
    engine: Box<dyn ComputeEngine>,
    loader: Box<dyn SampleDataLoader>,
    settings: FixtureSettings,
    suite_name: String,
    connection: OnceCell<Box<dyn StoreConnection>>,
    session: OnceCell<Arc<dyn ComputeSession>>,
    state: RefCell<SuiteState>,
}

impl FixtureController {
    /// Start building a controller over a document store and compute engine.
    #[must_use]
    pub fn builder(
        store: impl DocumentStore + 'static,
        engine: impl ComputeEngine + 'static,
    ) -> FixtureControllerBuilder {
        FixtureControllerBuilder {
            store: Box::new(store),
            engine: Box::new(engine),
            loader: Box::new(UnconfiguredSampleDataLoader),
            settings: FixtureSettings::local(),
            suite_name: DEFAULT_SUITE_NAME.to_owned(),
        }
    }

    // ------------------------------------------------------------------
    // Suite hooks
    // ------------------------------------------------------------------

    /// Drop the suite database so the suite starts from nothing.
    ///
    /// Safe to call repeatedly. Does nothing when the store is unreachable;
    /// the tests themselves will be skipped.
    pub fn before_suite(&self) -> Result<(), FixtureError> {
        if !self.store.is_reachable() {
            warn!(suite = %self.suite_name, "document store unreachable; not resetting database");
            return Ok(());
        }
        drop_logical_database(self.database()?)?;
        info!(
            suite = %self.suite_name,
            database = self.active_database_name(),
            "reset suite database"
        );
        Ok(())
    }

    /// Drop the suite database again, stop the compute session if one was
    /// created, and hand back the report.
    ///
    /// Every step is attempted; the first failure is returned after the end
    /// marker is logged.
    pub fn after_suite(self) -> Result<SuiteReport, FixtureError> {
        let dropped = if self.store.is_reachable() {
            self.database().and_then(drop_logical_database)
        } else {
            Ok(())
        };
        let stopped = self.session.get().map_or(Ok(()), |session| {
            session
                .stop()
                .map_err(|source| FixtureError::SessionStop { source })
        });

        let report = self.state.into_inner().report;
        info!(
            suite = %self.suite_name,
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped(),
            "finished test suite"
        );
        dropped?;
        stopped?;
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Test hooks
    // ------------------------------------------------------------------

    /// Mark the start of `name`: record the active test name and probe the
    /// store. Called by [`Self::run_test`]; call it directly when driving
    /// tests from plain `#[test]` functions.
    pub fn start_test(&self, name: &str) {
        let active = active_test_name(name).to_owned();
        let online = self.store.is_reachable();
        debug!(test = %active, online, "probed document store");
        let mut state = self.state.borrow_mut();
        state.current_test = Some(active);
        state.online = Some(online);
        state.skipped = None;
    }

    /// Drop the active test's collection when the last probe succeeded.
    pub fn before_each_test(&self) -> Result<(), FixtureError> {
        if !self.is_online() {
            return Ok(());
        }
        let collection = self.active_collection_name();
        let database = self.database()?;
        database
            .collection(&collection)
            .drop_collection()
            .map_err(|source| {
                FixtureError::cleanup(format!("{}.{collection}", database.name()), source)
            })
    }

    /// Run one test: [`Self::start_test`], [`Self::before_each_test`], then
    /// `body`.
    ///
    /// A test that hit [`Self::check_availability`] while the store was down
    /// is reported as skipped whatever the body did afterwards. Otherwise an
    /// `Err` or a panic from the body is a failure. The outcome is also
    /// appended to the suite report, and the active test name falls back to
    /// the suite name once the test is over.
    #[must_use]
    pub fn run_test<E, F>(&self, name: &str, body: F) -> TestOutcome
    where
        E: Display,
        F: FnOnce(&Self) -> Result<(), E>,
    {
        self.start_test(name);
        let ran = match self.before_each_test() {
            Ok(()) => match panic::catch_unwind(AssertUnwindSafe(|| body(self))) {
                Ok(Ok(())) => TestOutcome::Passed,
                Ok(Err(err)) => TestOutcome::failed(err.to_string()),
                Err(payload) => TestOutcome::failed(panic_message(payload.as_ref())),
            },
            Err(err) => TestOutcome::failed(err.to_string()),
        };

        let skipped = self.state.borrow().skipped;
        let outcome = skipped.map_or(ran, |reason| TestOutcome::Skipped { reason });
        info!(test = %self.active_test_name(), %outcome, "test finished");
        let mut state = self.state.borrow_mut();
        state.report.record(name, outcome.clone());
        state.current_test = None;
        state.skipped = None;
        outcome
    }

    /// Skip the active test when the store is unreachable.
    ///
    /// Inside a test this uses the probe taken by [`Self::start_test`].
    /// Outside one it probes afresh on every call and keeps nothing, so a
    /// loan driven directly never acts on an earlier probe.
    pub fn check_availability(&self) -> Result<(), SkipReason> {
        let probed = {
            let state = self.state.borrow();
            state.current_test.as_ref().and(state.online)
        };
        let online = probed.unwrap_or_else(|| self.store.is_reachable());
        if online {
            return Ok(());
        }
        let reason = SkipReason::DatabaseUnavailable;
        self.state.borrow_mut().skipped = Some(reason);
        warn!(test = %self.active_test_name(), %reason, "skipping test");
        Err(reason)
    }

    // ------------------------------------------------------------------
    // Loans
    // ------------------------------------------------------------------

    /// Lend the suite database to `body`, then drop it.
    ///
    /// Returns `Ok(None)` without running `body` when the store is
    /// unreachable. Errors from `body` come back unchanged. The drop runs
    /// after `body` returns, fails, or panics; a failing drop surfaces as
    /// [`FixtureError::Cleanup`] only when `body` itself succeeded.
    pub fn with_database_session<T, E, F>(&self, body: F) -> Result<Option<T>, E>
    where
        E: From<FixtureError>,
        F: FnOnce(DatabaseHandle<'_>) -> Result<T, E>,
    {
        if self.check_availability().is_err() {
            return Ok(None);
        }
        info!(test = %self.active_test_name(), "running with database session");
        let database = self.database()?;
        self.loan(|| body(database)).map(Some)
    }

    /// Lend the suite's compute session to `body`, then drop the suite
    /// database.
    ///
    /// The session is created on first use and reused by every later loan.
    /// Skip, error and cleanup behaviour match
    /// [`Self::with_database_session`].
    pub fn with_compute_session<T, E, F>(&self, body: F) -> Result<Option<T>, E>
    where
        E: From<FixtureError>,
        F: FnOnce(&Arc<dyn ComputeSession>) -> Result<T, E>,
    {
        if self.check_availability().is_err() {
            return Ok(None);
        }
        info!(test = %self.active_test_name(), "running with compute session");
        let session = self.compute_session()?;
        self.loan(|| body(session)).map(Some)
    }

    fn loan<T, E, F>(&self, body: F) -> Result<T, E>
    where
        E: From<FixtureError>,
        F: FnOnce() -> Result<T, E>,
    {
        let guard = DropOnExit::arm(self.database()?);
        let result = body();
        match (result, guard.release()) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(cleanup)) => Err(E::from(cleanup)),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(cleanup)) => {
                error!(
                    test = %self.active_test_name(),
                    error = %cleanup,
                    "cleanup failed after test error"
                );
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------
    // Server queries
    // ------------------------------------------------------------------

    /// True when the server version is at least `parts`, padded with zeros.
    ///
    /// Each distinct requested version is answered once per suite.
    pub fn server_at_least(&self, parts: &[u32]) -> Result<bool, FixtureError> {
        let requested = ServerVersion::from_parts(parts)?;
        let key = requested.to_string();
        let cached = self.state.borrow().version_checks.get(&key).copied();
        if let Some(answer) = cached {
            debug!(version = %key, answer, "server version check cached");
            return Ok(answer);
        }

        let answer = self.server_version()? >= requested;
        self.state
            .borrow_mut()
            .version_checks
            .insert(key, answer);
        Ok(answer)
    }

    /// Ask the server for its version via `buildInfo`.
    pub fn server_version(&self) -> Result<ServerVersion, FixtureError> {
        let reply = DatabaseHandle::new(self.connection()?, ADMIN_DATABASE)
            .run_command(&json!({"buildInfo": 1}))
            .map_err(|source| FixtureError::VersionLookup { source })?;
        Ok(ServerVersion::from_build_info(&reply)?)
    }

    /// Deployment shape of the connected server.
    pub fn cluster_topology(&self) -> Result<ClusterTopology, FixtureError> {
        self.connection()?
            .topology()
            .map_err(|source| FixtureError::Topology { source })
    }

    /// True when connected through `mongos`.
    pub fn is_sharded(&self) -> Result<bool, FixtureError> {
        Ok(self.cluster_topology()? == ClusterTopology::Sharded)
    }

    /// True when connected to a replica set.
    pub fn is_replica_set(&self) -> Result<bool, FixtureError> {
        Ok(self.cluster_topology()? == ClusterTopology::ReplicaSet)
    }

    // ------------------------------------------------------------------
    // Sample data
    // ------------------------------------------------------------------

    /// Load roughly `size_mb` megabytes into the active collection.
    pub fn load_sample_data(&self, size_mb: u32) -> Result<(), FixtureError> {
        self.with_loader(|loader, namespace| loader.load(namespace, size_mb))
    }

    /// Load `document_count` documents totalling roughly `size_mb` megabytes.
    pub fn load_sample_data_with_count(
        &self,
        size_mb: u32,
        document_count: u32,
    ) -> Result<(), FixtureError> {
        self.with_loader(|loader, namespace| {
            loader.load_with_count(namespace, size_mb, document_count)
        })
    }

    /// Load documents from `filename` into the active collection.
    pub fn load_sample_data_from_file(&self, filename: &Path) -> Result<(), FixtureError> {
        self.with_loader(|loader, namespace| loader.load_from_file(namespace, filename))
    }

    /// Load documents keyed by a composite `_id`.
    pub fn load_sample_data_with_composite_key(&self, size_mb: u32) -> Result<(), FixtureError> {
        self.with_loader(|loader, namespace| loader.load_with_composite_key(namespace, size_mb))
    }

    /// Shard the active collection on `shard_key`.
    pub fn shard_collection(&self, shard_key: &Value) -> Result<(), FixtureError> {
        self.with_loader(|loader, namespace| loader.shard_collection(namespace, shard_key))
    }

    fn with_loader<F>(&self, operation: F) -> Result<(), FixtureError>
    where
        F: FnOnce(&dyn SampleDataLoader, &Namespace) -> Result<(), SampleDataError>,
    {
        let namespace = self.namespace();
        debug!(%namespace, "sample data operation");
        operation(self.loader.as_ref(), &namespace)
            .map_err(|source| FixtureError::SampleData { namespace, source })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Active test name, or the suite name between tests.
    #[must_use]
    pub fn active_test_name(&self) -> String {
        self.state
            .borrow()
            .current_test
            .clone()
            .unwrap_or_else(|| self.suite_name.clone())
    }

    /// Collection owned by the active test.
    #[must_use]
    pub fn active_collection_name(&self) -> String {
        collection_name(&self.active_test_name())
    }

    /// Database owned by the suite.
    #[must_use]
    pub fn active_database_name(&self) -> &str {
        self.settings.database_name()
    }

    /// `database.collection` for the active test.
    #[must_use]
    pub fn namespace(&self) -> Namespace {
        Namespace::new(self.active_database_name(), self.active_collection_name())
    }

    /// Connector configuration targeting the active collection.
    #[must_use]
    pub fn connector_config(&self) -> ConnectorConfig {
        ConnectorConfig::new(self.settings.connection_string(), self.namespace())
    }

    /// Configuration used when the compute session is created.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        let connector = self.connector_config();
        SessionConfig::new(self.settings.compute_master(), self.settings.app_name())
            .with_options(connector.prefixed_options("input."))
            .with_options(connector.prefixed_options("output."))
    }

    /// Settings the controller was built with.
    #[must_use]
    pub const fn settings(&self) -> &FixtureSettings {
        &self.settings
    }

    /// Result of the last probe; false before any probe.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.state.borrow().online.unwrap_or(false)
    }

    /// True once a compute session has been created in this suite.
    #[must_use]
    pub fn session_created(&self) -> bool {
        self.session.get().is_some()
    }

    /// Snapshot of the outcomes recorded so far.
    #[must_use]
    pub fn report(&self) -> SuiteReport {
        self.state.borrow().report.clone()
    }

    /// Suite database on the shared connection, opening it on first use.
    pub fn database(&self) -> Result<DatabaseHandle<'_>, FixtureError> {
        Ok(DatabaseHandle::new(
            self.connection()?,
            self.active_database_name(),
        ))
    }

    fn connection(&self) -> Result<&dyn StoreConnection, FixtureError> {
        if let Some(connection) = self.connection.get() {
            return Ok(connection.as_ref());
        }
        let opened = self
            .store
            .open_connection()
            .map_err(|source| FixtureError::Connection { source })?;
        debug!(suite = %self.suite_name, "opened document store connection");
        Ok(self.connection.get_or_init(|| opened).as_ref())
    }

    fn compute_session(&self) -> Result<&Arc<dyn ComputeSession>, FixtureError> {
        if let Some(session) = self.session.get() {
            return Ok(session);
        }
        let config = self.session_config();
        let created = self
            .engine
            .create_session(&config)
            .map_err(|source| FixtureError::SessionCreation { source })?;
        info!(
            suite = %self.suite_name,
            master = config.master(),
            app = config.app_name(),
            "created compute session"
        );
        Ok(self.session.get_or_init(|| created))
    }
}

/// Drops the suite database when released or when unwinding past it.
struct DropOnExit<'a> {
    database: Option<DatabaseHandle<'a>>,
}

impl<'a> DropOnExit<'a> {
    fn arm(database: DatabaseHandle<'a>) -> Self {
        Self {
            database: Some(database),
        }
    }

    fn release(mut self) -> Result<(), FixtureError> {
        self.database
            .take()
            .map_or(Ok(()), drop_logical_database)
    }
}

impl Drop for DropOnExit<'_> {
    fn drop(&mut self) {
        if let Some(database) = self.database.take() {
            if let Err(err) = drop_logical_database(database) {
                error!(error = %err, "cleanup failed while unwinding");
            }
        }
    }
}

fn drop_logical_database(database: DatabaseHandle<'_>) -> Result<(), FixtureError> {
    database
        .drop_database()
        .map_err(|source| FixtureError::cleanup(database.name(), source))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_owned();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "test panicked".to_owned()
}
