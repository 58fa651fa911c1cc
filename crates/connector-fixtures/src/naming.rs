//! Test and collection naming.
//!
//! Test names follow the `"<subject> should <behaviour>"` convention. The
//! active test name is the behaviour after the marker, and the per-test
//! collection is that name with everything but letters and digits removed.

use std::fmt;

/// Marker separating the subject from the behaviour in a test name.
pub const TEST_NAME_MARKER: &str = "should ";

/// Collection used when a test name contains no letters or digits.
const FALLBACK_COLLECTION: &str = "unnamed";

/// Return the behaviour part of `raw`, or `raw` itself when no marker is present.
///
/// # Examples
///
/// ```
/// use connector_fixtures::active_test_name;
///
/// assert_eq!(active_test_name("Reader should load 10MB data"), "load 10MB data");
/// assert_eq!(active_test_name("handles empty input"), "handles empty input");
/// ```
#[must_use]
pub fn active_test_name(raw: &str) -> &str {
    raw.split_once(TEST_NAME_MARKER)
        .map_or(raw, |(_, behaviour)| behaviour)
}

/// Derive a collection name by keeping only alphanumeric characters.
///
/// # Examples
///
/// ```
/// use connector_fixtures::collection_name;
///
/// assert_eq!(collection_name("load 10MB data"), "load10MBdata");
/// ```
#[must_use]
pub fn collection_name(test_name: &str) -> String {
    let name: String = test_name.chars().filter(|c| c.is_alphanumeric()).collect();
    if name.is_empty() {
        FALLBACK_COLLECTION.to_owned()
    } else {
        name
    }
}

/// Fully qualified collection address, rendered as `database.collection`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    database: String,
    collection: String,
}

impl Namespace {
    /// Build a namespace from its two parts.
    #[must_use]
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Database part.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Collection part.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::behaviour_only("should load 10MB data", "load 10MB data")]
    #[case::subject_and_behaviour("MongoRDD should count documents", "count documents")]
    #[case::first_marker_wins("it should say should twice", "say should twice")]
    #[case::no_marker("round trips schemas", "round trips schemas")]
    #[case::marker_without_space("shouldnt split", "shouldnt split")]
    fn extracts_behaviour_after_marker(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(active_test_name(raw), expected);
    }

    #[rstest]
    #[case::spaces_and_digits("load 10MB data", "load10MBdata")]
    #[case::punctuation("handle $in / $nin filters!", "handleinninfilters")]
    #[case::unicode_letters("lire les données", "lirelesdonnées")]
    #[case::already_clean("partitioner", "partitioner")]
    fn strips_non_alphanumerics(#[case] test_name: &str, #[case] expected: &str) {
        assert_eq!(collection_name(test_name), expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::symbols_only("-- ?? --")]
    fn falls_back_when_nothing_survives(#[case] test_name: &str) {
        assert_eq!(collection_name(test_name), FALLBACK_COLLECTION);
    }

    #[rstest]
    fn namespace_renders_dotted() {
        let namespace = Namespace::new("mongo-spark-connector-test", "load10MBdata");
        assert_eq!(
            namespace.to_string(),
            "mongo-spark-connector-test.load10MBdata"
        );
    }
}
