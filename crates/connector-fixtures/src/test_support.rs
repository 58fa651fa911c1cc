//! In-memory doubles for the fixture ports.
//!
//! These doubles record every call so suites can assert on what the
//! controller did without a database or compute cluster. Handles are cheap
//! clones sharing one recorded state, so a test keeps a clone for assertions
//! and hands another to [`crate::FixtureController::builder`].
//!
//! Only compiled with the `test-support` feature.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Value, json};

use crate::naming::Namespace;
use crate::ports::{
    ClusterTopology, ComputeEngine, ComputeEngineError, ComputeSession, DocumentStore,
    DocumentStoreError, SampleDataError, SampleDataLoader, SessionConfig, StoreConnection,
};

const DEFAULT_SERVER_VERSION: &str = "3.6.8";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}

#[derive(Debug)]
struct StoreState {
    reachable: bool,
    server_version: String,
    topology: ClusterTopology,
    fail_database_drops: bool,
    connections_opened: usize,
    database_drops: Vec<String>,
    collection_drops: Vec<Namespace>,
    commands: Vec<(String, Value)>,
}

/// Document store double that answers from memory and records every call.
#[derive(Debug, Clone)]
pub struct InMemoryDocumentStore {
    state: Arc<Mutex<StoreState>>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::reachable()
    }
}

impl InMemoryDocumentStore {
    /// A store that answers probes.
    #[must_use]
    pub fn reachable() -> Self {
        Self::with_reachability(true)
    }

    /// A store that fails probes and refuses connections.
    #[must_use]
    pub fn unreachable() -> Self {
        Self::with_reachability(false)
    }

    fn with_reachability(reachable: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                reachable,
                server_version: DEFAULT_SERVER_VERSION.to_owned(),
                topology: ClusterTopology::Standalone,
                fail_database_drops: false,
                connections_opened: 0,
                database_drops: Vec::new(),
                collection_drops: Vec::new(),
                commands: Vec::new(),
            })),
        }
    }

    /// Report `version` from `buildInfo`.
    #[must_use]
    pub fn with_server_version(self, version: impl Into<String>) -> Self {
        lock(&self.state).server_version = version.into();
        self
    }

    /// Report `topology` from topology queries.
    #[must_use]
    pub fn with_topology(self, topology: ClusterTopology) -> Self {
        lock(&self.state).topology = topology;
        self
    }

    /// Change reachability, e.g. to simulate an outage between tests.
    pub fn set_reachable(&self, reachable: bool) {
        lock(&self.state).reachable = reachable;
    }

    /// Make every database drop fail with a command error.
    pub fn fail_database_drops(&self, fail: bool) {
        lock(&self.state).fail_database_drops = fail;
    }

    /// Number of connections opened so far.
    #[must_use]
    pub fn connections_opened(&self) -> usize {
        lock(&self.state).connections_opened
    }

    /// Databases dropped so far, in call order. Failed drops are included.
    #[must_use]
    pub fn database_drops(&self) -> Vec<String> {
        lock(&self.state).database_drops.clone()
    }

    /// Number of drops recorded for `database`.
    #[must_use]
    pub fn database_drop_count(&self, database: &str) -> usize {
        lock(&self.state)
            .database_drops
            .iter()
            .filter(|dropped| dropped.as_str() == database)
            .count()
    }

    /// Collections dropped so far, in call order.
    #[must_use]
    pub fn collection_drops(&self) -> Vec<Namespace> {
        lock(&self.state).collection_drops.clone()
    }

    /// Commands run so far as `(database, command)` pairs.
    #[must_use]
    pub fn commands(&self) -> Vec<(String, Value)> {
        lock(&self.state).commands.clone()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn is_reachable(&self) -> bool {
        lock(&self.state).reachable
    }

    fn open_connection(&self) -> Result<Box<dyn StoreConnection>, DocumentStoreError> {
        let mut state = lock(&self.state);
        if !state.reachable {
            return Err(DocumentStoreError::connection("connection refused"));
        }
        state.connections_opened += 1;
        Ok(Box::new(InMemoryConnection {
            state: Arc::clone(&self.state),
        }))
    }
}

#[derive(Debug)]
struct InMemoryConnection {
    state: Arc<Mutex<StoreState>>,
}

impl StoreConnection for InMemoryConnection {
    fn drop_database(&self, database: &str) -> Result<(), DocumentStoreError> {
        let mut state = lock(&self.state);
        state.database_drops.push(database.to_owned());
        if state.fail_database_drops {
            return Err(DocumentStoreError::command(format!(
                "dropDatabase on '{database}' refused"
            )));
        }
        Ok(())
    }

    fn drop_collection(&self, database: &str, collection: &str) -> Result<(), DocumentStoreError> {
        lock(&self.state)
            .collection_drops
            .push(Namespace::new(database, collection));
        Ok(())
    }

    fn run_command(&self, database: &str, command: &Value) -> Result<Value, DocumentStoreError> {
        let mut state = lock(&self.state);
        state.commands.push((database.to_owned(), command.clone()));
        if command.get("buildInfo").is_some() {
            return Ok(json!({"version": state.server_version, "ok": 1}));
        }
        if command.get("ping").is_some() {
            return Ok(json!({"ok": 1}));
        }
        Err(DocumentStoreError::command(format!("no such command: {command}")))
    }

    fn topology(&self) -> Result<ClusterTopology, DocumentStoreError> {
        Ok(lock(&self.state).topology)
    }
}

#[derive(Debug, Default)]
struct EngineState {
    configs: Vec<SessionConfig>,
    stops: usize,
}

/// Compute engine double that hands out recording sessions.
#[derive(Debug, Clone, Default)]
pub struct RecordingComputeEngine {
    state: Arc<Mutex<EngineState>>,
}

impl RecordingComputeEngine {
    /// A fresh engine with no sessions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions created.
    #[must_use]
    pub fn sessions_created(&self) -> usize {
        lock(&self.state).configs.len()
    }

    /// Configuration of the most recent session.
    #[must_use]
    pub fn last_config(&self) -> Option<SessionConfig> {
        lock(&self.state).configs.last().cloned()
    }

    /// Number of `stop` calls across all sessions.
    #[must_use]
    pub fn stop_count(&self) -> usize {
        lock(&self.state).stops
    }
}

impl ComputeEngine for RecordingComputeEngine {
    fn create_session(
        &self,
        config: &SessionConfig,
    ) -> Result<Arc<dyn ComputeSession>, ComputeEngineError> {
        lock(&self.state).configs.push(config.clone());
        Ok(Arc::new(RecordingComputeSession {
            state: Arc::clone(&self.state),
        }))
    }
}

#[derive(Debug)]
struct RecordingComputeSession {
    state: Arc<Mutex<EngineState>>,
}

impl ComputeSession for RecordingComputeSession {
    fn stop(&self) -> Result<(), ComputeEngineError> {
        lock(&self.state).stops += 1;
        Ok(())
    }
}

/// A call received by [`RecordingSampleDataLoader`].
#[derive(Debug, Clone, PartialEq)]
pub enum SampleDataCall {
    /// [`SampleDataLoader::load`].
    Load {
        /// Target collection.
        namespace: Namespace,
        /// Requested size.
        size_mb: u32,
    },
    /// [`SampleDataLoader::load_with_count`].
    LoadWithCount {
        /// Target collection.
        namespace: Namespace,
        /// Requested size.
        size_mb: u32,
        /// Requested document count.
        document_count: u32,
    },
    /// [`SampleDataLoader::load_from_file`].
    LoadFromFile {
        /// Target collection.
        namespace: Namespace,
        /// Source file.
        filename: PathBuf,
    },
    /// [`SampleDataLoader::load_with_composite_key`].
    LoadWithCompositeKey {
        /// Target collection.
        namespace: Namespace,
        /// Requested size.
        size_mb: u32,
    },
    /// [`SampleDataLoader::shard_collection`].
    ShardCollection {
        /// Target collection.
        namespace: Namespace,
        /// Shard key document.
        shard_key: Value,
    },
}

/// Sample data loader double that records calls and loads nothing.
#[derive(Debug, Clone, Default)]
pub struct RecordingSampleDataLoader {
    calls: Arc<Mutex<Vec<SampleDataCall>>>,
}

impl RecordingSampleDataLoader {
    /// A loader with no recorded calls.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<SampleDataCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: SampleDataCall) -> Result<(), SampleDataError> {
        lock(&self.calls).push(call);
        Ok(())
    }
}

impl SampleDataLoader for RecordingSampleDataLoader {
    fn load(&self, namespace: &Namespace, size_mb: u32) -> Result<(), SampleDataError> {
        self.record(SampleDataCall::Load {
            namespace: namespace.clone(),
            size_mb,
        })
    }

    fn load_with_count(
        &self,
        namespace: &Namespace,
        size_mb: u32,
        document_count: u32,
    ) -> Result<(), SampleDataError> {
        self.record(SampleDataCall::LoadWithCount {
            namespace: namespace.clone(),
            size_mb,
            document_count,
        })
    }

    fn load_from_file(
        &self,
        namespace: &Namespace,
        filename: &Path,
    ) -> Result<(), SampleDataError> {
        self.record(SampleDataCall::LoadFromFile {
            namespace: namespace.clone(),
            filename: filename.to_path_buf(),
        })
    }

    fn load_with_composite_key(
        &self,
        namespace: &Namespace,
        size_mb: u32,
    ) -> Result<(), SampleDataError> {
        self.record(SampleDataCall::LoadWithCompositeKey {
            namespace: namespace.clone(),
            size_mb,
        })
    }

    fn shard_collection(
        &self,
        namespace: &Namespace,
        shard_key: &Value,
    ) -> Result<(), SampleDataError> {
        self.record(SampleDataCall::ShardCollection {
            namespace: namespace.clone(),
            shard_key: shard_key.clone(),
        })
    }
}
