//! Fixture settings loaded via OrthoConfig, and the connector configuration
//! derived from them.

use std::collections::BTreeMap;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::naming::Namespace;

const DEFAULT_CONNECTION_STRING: &str = "mongodb://localhost:27017/";
const DEFAULT_DATABASE_NAME: &str = "mongo-spark-connector-test";
const DEFAULT_COMPUTE_MASTER: &str = "local";
const DEFAULT_APP_NAME: &str = "MongoSparkConnector";

/// Environment defaults for a fixture suite.
///
/// Every field has a local-development default, so suites run against
/// `localhost` without any setup.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CONNECTOR_FIXTURES")]
pub struct FixtureSettings {
    /// Connection string for the document database.
    #[ortho_config(default = String::from(DEFAULT_CONNECTION_STRING))]
    pub connection_string: String,
    /// Logical database the suite owns and drops.
    #[ortho_config(default = String::from(DEFAULT_DATABASE_NAME))]
    pub database_name: String,
    /// Compute engine master URL.
    #[ortho_config(default = String::from(DEFAULT_COMPUTE_MASTER))]
    pub compute_master: String,
    /// Application name reported by compute sessions.
    #[ortho_config(default = String::from(DEFAULT_APP_NAME))]
    pub app_name: String,
}

impl FixtureSettings {
    /// Settings holding every default, for suites that skip configuration
    /// loading.
    #[must_use]
    pub fn local() -> Self {
        Self {
            connection_string: DEFAULT_CONNECTION_STRING.to_owned(),
            database_name: DEFAULT_DATABASE_NAME.to_owned(),
            compute_master: DEFAULT_COMPUTE_MASTER.to_owned(),
            app_name: DEFAULT_APP_NAME.to_owned(),
        }
    }

    /// Connection string for the document database.
    #[must_use]
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Logical database the suite owns.
    #[must_use]
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Compute engine master URL.
    #[must_use]
    pub fn compute_master(&self) -> &str {
        &self.compute_master
    }

    /// Application name for compute sessions.
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }
}

/// Read/write configuration the connector needs to reach one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfig {
    connection_string: String,
    namespace: Namespace,
}

impl ConnectorConfig {
    /// Point the connector at `namespace` through `connection_string`.
    #[must_use]
    pub fn new(connection_string: impl Into<String>, namespace: Namespace) -> Self {
        Self {
            connection_string: connection_string.into(),
            namespace,
        }
    }

    /// Connection string.
    #[must_use]
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Target namespace.
    #[must_use]
    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Render as connector options: `connection.uri`, `database`, `collection`.
    #[must_use]
    pub fn options(&self) -> BTreeMap<String, String> {
        self.prefixed_options("")
    }

    /// Render as connector options with every key prefixed, e.g. `input.`.
    #[must_use]
    pub fn prefixed_options(&self, prefix: &str) -> BTreeMap<String, String> {
        [
            ("connection.uri", self.connection_string.as_str()),
            ("database", self.namespace.database()),
            ("collection", self.namespace.collection()),
        ]
        .into_iter()
        .map(|(key, value)| (format!("{prefix}{key}"), value.to_owned()))
        .collect()
    }
}
