//! End-to-end lifecycle tests against the in-memory doubles.
//!
//! These drive a whole suite the way a connector test binary would: reset in
//! `before_suite`, several tests through `run_test`, then `after_suite`.

#![expect(
    clippy::expect_used,
    reason = "test code uses expect for clear failure messages"
)]

mod support;

use std::path::Path;
use std::sync::Arc;

use color_eyre::Report;
use color_eyre::eyre::{ensure, eyre};
use connector_fixtures::ports::ClusterTopology;
use connector_fixtures::test_support::{InMemoryDocumentStore, SampleDataCall};
use connector_fixtures::{FixtureError, Namespace, SkipReason, TestOutcome};
use rstest::rstest;
use serde_json::json;
use support::{Harness, SUITE_NAME, offline, online};

#[rstest]
fn unreachable_store_skips_every_loan_and_reports_no_failures(offline: Harness) {
    offline.fixtures.before_suite().expect("before_suite tolerates outages");

    let database = offline
        .fixtures
        .run_test("Reader should read documents", |fixtures| -> Result<(), Report> {
            let ran = fixtures.with_database_session(|_database| Ok::<_, Report>(()))?;
            ensure!(ran.is_none(), "body must not run while offline");
            Ok(())
        });
    let compute = offline.fixtures.run_test("Writer should write documents", |fixtures| {
        fixtures.with_compute_session(|_session| Err::<(), _>(eyre!("body must not run")))?;
        Ok::<_, Report>(())
    });

    let expected = TestOutcome::Skipped {
        reason: SkipReason::DatabaseUnavailable,
    };
    assert_eq!(database, expected);
    assert_eq!(compute, expected);
    assert_eq!(offline.engine.sessions_created(), 0);
    assert_eq!(offline.store.connections_opened(), 0);

    let report = offline.fixtures.after_suite().expect("after_suite tolerates outages");
    assert_eq!(report.skipped(), 2);
    assert_eq!(report.failed(), 0);
}

#[rstest]
fn each_loan_drops_the_suite_database_exactly_once(online: Harness) {
    online.fixtures.before_suite().expect("reset succeeds");
    assert_eq!(online.suite_database_drops(), 1);

    let outcome = online
        .fixtures
        .run_test("Reader should load 10MB data", |fixtures| -> Result<(), Report> {
            let name = fixtures
                .with_database_session(|database| Ok::<_, Report>(database.name().to_owned()))?
                .expect("store is reachable");
            ensure!(name == fixtures.active_database_name(), "unexpected database {name}");
            Ok(())
        });

    assert!(outcome.is_passed(), "unexpected outcome: {outcome}");
    assert_eq!(online.suite_database_drops(), 2);
}

#[rstest]
fn failing_body_still_drops_and_is_reported(online: Harness) {
    let outcome = online.fixtures.run_test("Reader should reject bad input", |fixtures| {
        fixtures.with_database_session(|_database| Err::<(), _>(eyre!("assertion failed")))?;
        Ok::<_, Report>(())
    });

    assert_eq!(outcome, TestOutcome::failed("assertion failed"));
    assert_eq!(online.suite_database_drops(), 1);
}

#[rstest]
fn panicking_body_still_drops(online: Harness) {
    let outcome = online.fixtures.run_test("Reader should not panic", |fixtures| {
        fixtures.with_database_session(|_database| -> Result<(), Report> {
            panic!("boom");
        })?;
        Ok::<_, Report>(())
    });

    assert_eq!(outcome, TestOutcome::failed("boom"));
    assert_eq!(online.suite_database_drops(), 1);
}

#[rstest]
fn failed_drop_after_successful_body_fails_the_test(online: Harness) {
    online.store.fail_database_drops(true);

    let result = online
        .fixtures
        .with_database_session(|_database| Ok::<_, FixtureError>(()));

    let err = result.expect_err("cleanup failure surfaces");
    assert!(
        matches!(
            err,
            FixtureError::Cleanup { ref target, .. } if target == "mongo-spark-connector-test"
        ),
        "unexpected error: {err}"
    );
}

#[rstest]
fn failed_drop_during_a_panic_is_logged_not_raised(online: Harness) {
    online.store.fail_database_drops(true);

    let outcome = online.fixtures.run_test("Reader should panic cleanly", |fixtures| {
        fixtures.with_database_session(|_database| -> Result<(), Report> {
            panic!("reader exploded");
        })?;
        Ok::<_, Report>(())
    });

    assert_eq!(outcome, TestOutcome::failed("reader exploded"));
    assert_eq!(online.suite_database_drops(), 1);
}

#[rstest]
fn direct_loans_check_the_store_each_time(online: Harness) {
    let first = online
        .fixtures
        .with_database_session(|_database| Ok::<_, Report>(()))
        .expect("first loan succeeds");
    online.store.set_reachable(false);
    let second = online
        .fixtures
        .with_database_session(|_database| Err::<(), _>(eyre!("body must not run")))
        .expect("second loan is skipped, not failed");

    assert_eq!(first, Some(()));
    assert_eq!(second, None);
    assert_eq!(online.suite_database_drops(), 1);
}

#[rstest]
fn before_suite_can_run_repeatedly(online: Harness) {
    online.fixtures.before_suite().expect("first reset succeeds");
    online.fixtures.before_suite().expect("second reset succeeds");

    assert_eq!(online.suite_database_drops(), 2);
    assert!(online.store.collection_drops().is_empty());
}

#[rstest]
fn compute_session_is_created_once_and_reused(online: Harness) {
    let mut seen = Vec::new();
    for name in ["Writer should write once", "Writer should write twice"] {
        let outcome = online.fixtures.run_test(name, |fixtures| {
            let session = fixtures
                .with_compute_session(|session| Ok::<_, Report>(Arc::clone(session)))?
                .expect("store is reachable");
            seen.push(session);
            Ok::<_, Report>(())
        });
        assert!(outcome.is_passed(), "unexpected outcome: {outcome}");
    }

    let [first, second] = seen.as_slice() else {
        panic!("expected two sessions, got {}", seen.len());
    };
    assert!(Arc::ptr_eq(first, second));
    assert_eq!(online.engine.sessions_created(), 1);
    assert_eq!(online.suite_database_drops(), 2);

    let config = online.engine.last_config().expect("session was configured");
    assert_eq!(config.master(), "local");
    assert_eq!(config.app_name(), "MongoSparkConnector");
    assert_eq!(
        config.option("input.connection.uri"),
        Some("mongodb://localhost:27017/")
    );

    online.fixtures.after_suite().expect("suite teardown succeeds");
    assert_eq!(online.engine.stop_count(), 1);
}

#[rstest]
fn after_suite_without_a_session_stops_nothing(online: Harness) {
    let database = online.fixtures.active_database_name().to_owned();

    let report = online.fixtures.after_suite().expect("suite teardown succeeds");

    assert!(report.records().is_empty());
    assert_eq!(online.engine.stop_count(), 0);
    assert_eq!(online.store.database_drop_count(&database), 1);
}

#[rstest]
fn version_is_queried_once_per_requested_version() {
    let harness = Harness::new(InMemoryDocumentStore::reachable().with_server_version("3.6.8"));

    assert!(harness.fixtures.server_at_least(&[3, 6]).expect("version query"));
    assert!(harness.fixtures.server_at_least(&[3, 6, 0]).expect("cached"));
    assert!(!harness.fixtures.server_at_least(&[4]).expect("version query"));

    let build_info_queries = harness
        .store
        .commands()
        .iter()
        .filter(|(database, command)| database == "admin" && command.get("buildInfo").is_some())
        .count();
    assert_eq!(build_info_queries, 2);
}

#[rstest]
fn before_each_test_drops_the_active_collection(online: Harness) {
    let outcome = online
        .fixtures
        .run_test("Reader should read large data", |_| Ok::<_, Report>(()));

    assert!(outcome.is_passed());
    assert_eq!(
        online.store.collection_drops(),
        vec![Namespace::new("mongo-spark-connector-test", "readlargedata")]
    );
}

#[rstest]
fn availability_is_checked_per_test(online: Harness) {
    let first = online
        .fixtures
        .run_test("Reader should see the server", |fixtures| {
            fixtures.with_database_session(|_database| Ok::<_, Report>(()))?;
            Ok::<_, Report>(())
        });
    online.store.set_reachable(false);
    let second = online
        .fixtures
        .run_test("Reader should notice the outage", |fixtures| {
            fixtures.with_database_session(|_database| Ok::<_, Report>(()))?;
            Ok::<_, Report>(())
        });

    assert!(first.is_passed());
    assert!(second.is_skipped());
}

#[rstest]
fn active_name_returns_to_the_suite_after_each_test(online: Harness) {
    let outcome = online
        .fixtures
        .run_test("Reader should remember its name", |fixtures| -> Result<(), Report> {
            ensure!(
                fixtures.active_test_name() == "remember its name",
                "unexpected name {}",
                fixtures.active_test_name()
            );
            Ok(())
        });

    assert!(outcome.is_passed(), "unexpected outcome: {outcome}");
    assert_eq!(online.fixtures.active_test_name(), SUITE_NAME);
    assert_eq!(online.fixtures.active_collection_name(), "ReaderSuite");
}

#[rstest]
fn names_fall_back_to_the_suite_between_tests(online: Harness) {
    assert_eq!(online.fixtures.active_test_name(), SUITE_NAME);
    assert_eq!(online.fixtures.active_collection_name(), "ReaderSuite");
}

#[rstest]
fn sample_data_targets_the_active_collection(online: Harness) {
    let outcome = online.fixtures.run_test("Reader should shard data", |fixtures| {
        fixtures.load_sample_data(5)?;
        fixtures.load_sample_data_from_file(Path::new("fixtures/zips.json"))?;
        fixtures.load_sample_data_with_composite_key(2)?;
        fixtures.shard_collection(&json!({"_id": 1}))?;
        Ok::<_, FixtureError>(())
    });
    assert!(outcome.is_passed(), "unexpected outcome: {outcome}");

    let namespace = Namespace::new("mongo-spark-connector-test", "sharddata");
    assert_eq!(
        online.loader.calls(),
        vec![
            SampleDataCall::Load {
                namespace: namespace.clone(),
                size_mb: 5,
            },
            SampleDataCall::LoadFromFile {
                namespace: namespace.clone(),
                filename: "fixtures/zips.json".into(),
            },
            SampleDataCall::LoadWithCompositeKey {
                namespace: namespace.clone(),
                size_mb: 2,
            },
            SampleDataCall::ShardCollection {
                namespace,
                shard_key: json!({"_id": 1}),
            },
        ]
    );
}

#[rstest]
#[case(ClusterTopology::Standalone, false, false)]
#[case(ClusterTopology::ReplicaSet, false, true)]
#[case(ClusterTopology::Sharded, true, false)]
fn topology_helpers_follow_the_server(
    #[case] topology: ClusterTopology,
    #[case] sharded: bool,
    #[case] replica_set: bool,
) {
    let harness = Harness::new(InMemoryDocumentStore::reachable().with_topology(topology));

    assert_eq!(harness.fixtures.is_sharded().expect("topology query"), sharded);
    assert_eq!(
        harness.fixtures.is_replica_set().expect("topology query"),
        replica_set
    );
}
