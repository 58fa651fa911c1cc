//! Port for the document database the connector reads from and writes to.
//!
//! Fixtures never talk to a driver directly. They open one long-lived
//! [`StoreConnection`] through a [`DocumentStore`] and address databases and
//! collections through the borrowed [`DatabaseHandle`] and
//! [`CollectionHandle`] views.

use serde_json::Value;

use super::define_port_error;

define_port_error! {
    /// Errors raised by document store adapters.
    pub enum DocumentStoreError {
        /// The store refused or dropped the connection.
        Connection {
            /// Driver-provided description of the failure.
            message: String,
        } => "document store connection failed: {message}",
        /// A command, drop or metadata query failed.
        Command {
            /// Driver-provided description of the failure.
            message: String,
        } => "document store command failed: {message}",
    }
}

/// Deployment shape reported by the connected server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterTopology {
    /// A single `mongod` without replication.
    Standalone,
    /// A replica set.
    ReplicaSet,
    /// A sharded cluster fronted by `mongos`.
    Sharded,
}

/// Entry point to the external document database.
#[cfg_attr(test, mockall::automock)]
pub trait DocumentStore: Send + Sync {
    /// Answer a cheap health probe. Implementations must not panic or block
    /// beyond their own server selection timeout.
    fn is_reachable(&self) -> bool;

    /// Open a connection that stays alive until the fixture is torn down.
    fn open_connection(&self) -> Result<Box<dyn StoreConnection>, DocumentStoreError>;
}

/// Operations fixtures perform over an open connection.
#[cfg_attr(test, mockall::automock)]
pub trait StoreConnection: Send + Sync {
    /// Drop a whole database. Dropping a missing database succeeds.
    fn drop_database(&self, database: &str) -> Result<(), DocumentStoreError>;

    /// Drop one collection. Dropping a missing collection succeeds.
    fn drop_collection(&self, database: &str, collection: &str) -> Result<(), DocumentStoreError>;

    /// Run a database command such as `{"buildInfo": 1}` and return the reply.
    fn run_command(&self, database: &str, command: &Value) -> Result<Value, DocumentStoreError>;

    /// Report whether the deployment is standalone, replicated or sharded.
    fn topology(&self) -> Result<ClusterTopology, DocumentStoreError>;
}

/// Borrowed view of one named database on an open connection.
#[derive(Clone, Copy)]
pub struct DatabaseHandle<'a> {
    connection: &'a dyn StoreConnection,
    name: &'a str,
}

impl<'a> DatabaseHandle<'a> {
    /// Address `name` through `connection`.
    #[must_use]
    pub const fn new(connection: &'a dyn StoreConnection, name: &'a str) -> Self {
        Self { connection, name }
    }

    /// Database name.
    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }

    /// Underlying connection, for operations not covered by the handle.
    #[must_use]
    pub const fn connection(&self) -> &'a dyn StoreConnection {
        self.connection
    }

    /// Address a collection inside this database.
    #[must_use]
    pub const fn collection<'b>(&self, name: &'b str) -> CollectionHandle<'b>
    where
        'a: 'b,
    {
        CollectionHandle {
            connection: self.connection,
            database: self.name,
            name,
        }
    }

    /// Drop the database and everything in it.
    pub fn drop_database(&self) -> Result<(), DocumentStoreError> {
        self.connection.drop_database(self.name)
    }

    /// Run a command against this database.
    pub fn run_command(&self, command: &Value) -> Result<Value, DocumentStoreError> {
        self.connection.run_command(self.name, command)
    }
}

impl std::fmt::Debug for DatabaseHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Borrowed view of one collection inside a database.
#[derive(Clone, Copy)]
pub struct CollectionHandle<'a> {
    connection: &'a dyn StoreConnection,
    database: &'a str,
    name: &'a str,
}

impl<'a> CollectionHandle<'a> {
    /// Collection name.
    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }

    /// Name of the owning database.
    #[must_use]
    pub const fn database_name(&self) -> &'a str {
        self.database
    }

    /// Drop the collection.
    pub fn drop_collection(&self) -> Result<(), DocumentStoreError> {
        self.connection.drop_collection(self.database, self.name)
    }
}

impl std::fmt::Debug for CollectionHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionHandle")
            .field("database", &self.database)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
