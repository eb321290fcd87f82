//! End-to-end runner scenarios: workload YAML in, recorded operations out.
//!
//! Every test loads a workload document, builds its runners against an
//! in-memory collection and invokes them directly.

use bson::Bson;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use loadsim::driver::ScheduledRunner;
use loadsim::workload::Workload;
use std::sync::Arc;
use std::time::Duration;
use workload_core::{ConfigError, UpdateBody};
use workload_runner::testing::{MemoryCollection, RecordingReporter, UpdateScope};
use workload_runner::{DocumentCollection, RunnerError};

struct Harness {
    runners: Vec<ScheduledRunner>,
    collection: Arc<MemoryCollection>,
    reporter: Arc<RecordingReporter>,
}

impl Harness {
    fn new(yaml: &str) -> Self {
        Self::with_collection(yaml, MemoryCollection::new("readings"))
    }

    fn with_collection(yaml: &str, collection: MemoryCollection) -> Self {
        let collection = Arc::new(collection);
        let reporter = Arc::new(RecordingReporter::new());

        let workload = Workload::from_yaml(yaml, None).unwrap();
        let shared = collection.clone();
        let runners = workload
            .build_runners(
                |_| shared.clone() as Arc<dyn DocumentCollection>,
                reporter.clone(),
            )
            .unwrap();

        Self {
            runners,
            collection,
            reporter,
        }
    }

    async fn run(&mut self, index: usize) -> Result<Duration, RunnerError> {
        self.runners[index].runner.run_once().await
    }

    fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.collection
            .inserted()
            .iter()
            .map(|doc| doc.get_datetime("ts").unwrap().to_chrono())
            .collect()
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn timeseries(time: &str, meta: &str, extra: &str) -> String {
    format!(
        r#"
dictionaries:
  - name: devices
    values: ["A", "B"]
  - name: fleet
    generator: {{ type: pattern, pattern: "truck_{{index}}" }}
    count: 40
templates:
  - name: reading
    fields:
      - name: temperature
        generator: {{ type: float_range, min: 10.0, max: 30.0 }}
      - name: status
        generator: {{ type: one_of, values: ["ok", "degraded"] }}
workloads:
  - name: ingest
    op: timeseries
    collection: readings
    template: reading
    params:
      time: {time}
      meta: {meta}
{extra}
"#
    )
}

const DEVICES: &str = "{ dictionary: devices, metaField: device }";

#[tokio::test]
async fn test_clock_steps_between_invocations() {
    let yaml = timeseries(
        r#"{ start: "2024-01-01T00:00:00Z", step: 5000, timeField: ts }"#,
        DEVICES,
        "",
    );
    let mut h = Harness::new(&yaml);

    h.run(0).await.unwrap();
    let first = h.collection.inserted();
    assert_eq!(first.len(), 2);
    for doc in &first {
        assert_eq!(
            doc.get_datetime("ts").unwrap().to_chrono(),
            t0() + ChronoDuration::milliseconds(5000)
        );
        assert!(doc.get_f64("temperature").is_ok());
        assert!(["ok", "degraded"].contains(&doc.get_str("status").unwrap()));
    }
    let mut devices: Vec<&str> = first.iter().map(|d| d.get_str("device").unwrap()).collect();
    devices.sort();
    assert_eq!(devices, vec!["A", "B"]);

    h.run(0).await.unwrap();
    let ts = h.timestamps();
    assert_eq!(ts.len(), 4);
    assert!(ts[2..]
        .iter()
        .all(|t| *t == t0() + ChronoDuration::milliseconds(10000)));
}

#[tokio::test]
async fn test_past_stop_emits_nothing() {
    let yaml = timeseries(
        r#"{ start: "2024-01-01T00:00:00Z", step: 1, stop: "2024-01-01T00:00:00Z", timeField: ts }"#,
        DEVICES,
        "",
    );
    let mut h = Harness::new(&yaml);

    for _ in 0..3 {
        assert_eq!(h.run(0).await.unwrap(), Duration::ZERO);
    }
    assert!(h.collection.inserted().is_empty());
    assert!(h.reporter.ops().is_empty());
}

#[tokio::test]
async fn test_jitter_within_bound_per_entity() {
    let yaml = timeseries(
        &format!(
            "{{ value: {}, jitter: 100, timeField: ts }}",
            t0().timestamp_millis()
        ),
        "{ dictionary: fleet, metaField: truck }",
        "      workers: 8",
    );
    let mut h = Harness::new(&yaml);

    h.run(0).await.unwrap();

    let ts = h.timestamps();
    assert_eq!(ts.len(), 40);
    let bound = ChronoDuration::milliseconds(100);
    assert!(ts.iter().all(|t| *t >= t0() - bound && *t <= t0() + bound));
}

#[tokio::test]
async fn test_unsupported_generation_mode_fails_fast() {
    let yaml = timeseries(
        r#"{ start: "2024-01-01T00:00:00Z", timeField: ts }"#,
        "{ dictionary: devices, metaField: device, generate: batch }",
        "",
    );
    let mut h = Harness::new(&yaml);

    let err = h.run(0).await.unwrap_err();

    assert!(matches!(err, RunnerError::Unsupported(_)));
    assert!(err.is_configuration());
    assert!(h.collection.inserted().is_empty());
    assert!(h.reporter.ops().is_empty());
}

#[tokio::test]
async fn test_pipeline_update_reaches_collection_in_order() {
    let yaml = r#"
workloads:
  - name: rollup
    op: update_many
    collection: readings
    params:
      filter: { device: "A" }
      update:
        - { "$set": { total: { "$add": ["$a", "$b"] } } }
        - { "$unset": "scratch" }
        - { "$set": { rolled: true } }
"#;
    let mut h = Harness::new(yaml);

    h.run(0).await.unwrap();

    let updates = h.collection.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].scope, UpdateScope::Many);
    assert_eq!(
        updates[0].update,
        UpdateBody::Pipeline(vec![
            bson::doc! { "$set": { "total": { "$add": ["$a", "$b"] } } },
            bson::doc! { "$unset": "scratch" },
            bson::doc! { "$set": { "rolled": true } },
        ])
    );
}

#[tokio::test]
async fn test_fan_out_reports_once_per_insert() {
    let yaml = timeseries(
        r#"{ start: "2024-01-01", step: 60000, timeField: ts }"#,
        "{ dictionary: fleet, metaField: truck }",
        "      workers: 4",
    );
    let mut h = Harness::with_collection(
        &yaml,
        MemoryCollection::new("readings").with_insert_delay(Duration::from_millis(2)),
    );

    h.run(0).await.unwrap();

    let inserted = h.collection.inserted();
    assert_eq!(inserted.len(), 40);
    let mut trucks: Vec<String> = inserted
        .iter()
        .map(|d| d.get_str("truck").unwrap().to_string())
        .collect();
    trucks.sort();
    trucks.dedup();
    assert_eq!(trucks.len(), 40);

    let ops = h.reporter.ops();
    assert_eq!(ops.len(), 40);
    assert!(ops.iter().all(|op| op.op_count == 1 && op.runner == "ingest"));
    assert!(h.collection.max_in_flight() <= 4);
}

#[tokio::test]
async fn test_update_one_with_generated_filter_and_upsert() {
    let yaml = r#"
dictionaries:
  - name: devices
    values: ["A", "B", "C"]
workloads:
  - name: heartbeat
    op: update_one
    collection: readings
    params:
      filter: { device: { "$gen": { type: dictionary, name: devices } } }
      update: { "$inc": { beats: 1 } }
      upsert: true
"#;
    let mut h = Harness::new(yaml);

    for _ in 0..5 {
        h.run(0).await.unwrap();
    }

    let updates = h.collection.updates();
    assert_eq!(updates.len(), 5);
    for update in &updates {
        assert_eq!(update.scope, UpdateScope::One);
        assert!(update.settings.upsert);
        let device = update.filter.get_str("device").unwrap();
        assert!(["A", "B", "C"].contains(&device));
    }
    assert_eq!(h.reporter.calls_for("heartbeat"), 5);
}

#[tokio::test]
async fn test_config_error_isolated_to_its_runner() {
    let yaml = timeseries(
        r#"{ start: "2024-01-01T00:00:00Z", timeField: ts }"#,
        "{ dictionary: missing, metaField: device }",
        r#"  - name: touch
    op: update_many
    collection: readings
    params:
      update: { "$set": { seen: true } }"#,
    );
    let mut h = Harness::new(&yaml);

    let err = h.run(0).await.unwrap_err();
    assert!(matches!(
        err,
        RunnerError::Config(ConfigError::DictionaryNotFound { .. })
    ));

    h.run(1).await.unwrap();
    assert_eq!(h.collection.updates().len(), 1);
    assert!(h.collection.inserted().is_empty());
    assert_eq!(h.reporter.calls_for("ingest"), 0);
    assert_eq!(h.reporter.calls_for("touch"), 1);
}

#[tokio::test]
async fn test_integer_value_does_not_move_clock() {
    let explicit = t0() + ChronoDuration::hours(6);
    let yaml = timeseries(
        &format!(
            r#"{{ start: "2024-01-01T00:00:00Z", step: 1000, value: {}, timeField: ts }}"#,
            explicit.timestamp_millis()
        ),
        DEVICES,
        "",
    );
    let mut h = Harness::new(&yaml);

    h.run(0).await.unwrap();
    h.run(0).await.unwrap();

    assert!(h.timestamps().iter().all(|t| *t == explicit));
}

#[tokio::test]
async fn test_insert_failure_surfaces_after_partial_progress() {
    let yaml = timeseries(
        r#"{ start: "2024-01-01T00:00:00Z", timeField: ts }"#,
        "{ dictionary: fleet, metaField: truck }",
        "      workers: 2",
    );
    let mut h = Harness::with_collection(
        &yaml,
        MemoryCollection::new("readings").failing_inserts_from(10),
    );

    let err = h.run(0).await.unwrap_err();

    assert!(matches!(err, RunnerError::Store(_)));
    assert_eq!(h.collection.inserted().len(), 10);
    assert_eq!(h.reporter.ops().len(), 10);
    assert!(h
        .collection
        .inserted()
        .iter()
        .all(|d| matches!(d.get("truck"), Some(Bson::String(_)))));
}
