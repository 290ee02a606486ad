//! Integration tests for the job orchestration engine
//!
//! Runs the poller, classifier and sequencer against a mock transform
//! service and asserts on the emitted event sequences.

use conductor::adapters::graph::LogGraphBuilder;
use conductor::adapters::storage::{FeedStore, LocalFeedStore};
use conductor::adapters::transform::TransformClient;
use conductor::config::{PipelineConfig, TransformServiceConfig};
use conductor::core::events::{EventSink, RecordingEventSink};
use conductor::core::pipeline::{
    JobPoller, PipelineOutcome, PipelineSequencer, PollOutcome, PollerConfig,
};
use conductor::domain::event::{EventAction, EventState};
use conductor::domain::ids::{CorrelationId, ProviderId, Referential};
use conductor::domain::job::{Job, JobKind};
use conductor::domain::provider::{DataFormat, Provider, ProviderRepository, TransformSettings};
use conductor::domain::{EventDomain, TransformError};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(auto_validation: bool) -> Provider {
    Provider {
        id: ProviderId::new(2),
        name: "tst".to_string(),
        transform: TransformSettings {
            referential: Referential::new("tst").unwrap(),
            organisation: "Test Transit".to_string(),
            user: "pipeline".to_string(),
            object_id_prefix: "tst".to_string(),
            data_format: DataFormat::Gtfs,
            enable_auto_validation: auto_validation,
            enable_auto_import: true,
            enable_clean_import: false,
            enable_blocks_export: false,
            allow_create_missing_stop_place: false,
            migrate_data_to_provider: None,
        },
    }
}

fn transform_client(server: &MockServer, max_retries: u32) -> TransformClient {
    TransformClient::new(&TransformServiceConfig {
        base_url: server.uri(),
        timeout_seconds: 5,
        max_retries,
        retry_delay_seconds: 1,
    })
    .unwrap()
}

fn poller_config(max_retries: u32) -> PollerConfig {
    PollerConfig {
        max_retries,
        retry_delay: Duration::from_millis(1),
    }
}

fn job_status_body(status: &str, links: &[(&str, &str)]) -> serde_json::Value {
    let links: Vec<_> = links
        .iter()
        .map(|(rel, href)| serde_json::json!({"rel": rel, "href": href}))
        .collect();
    serde_json::json!({
        "id": 1,
        "referential": "tst",
        "action": "importer",
        "status": status,
        "links": links,
    })
}

/// A small GTFS export archive as raw zip bytes
fn gtfs_export_bytes() -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::FileOptions::default();
        writer.start_file("agency.txt", options).unwrap();
        writer
            .write_all(b"agency_id,agency_name\nA1,Test Transit\n")
            .unwrap();
        writer.start_file("stops.txt", options).unwrap();
        writer
            .write_all(b"stop_id,stop_name\nS1,Central\nS2,Harbour\n")
            .unwrap();
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

fn states_for(sink: &RecordingEventSink, action: EventAction) -> Vec<EventState> {
    sink.events()
        .iter()
        .filter(|event| event.action == action)
        .map(|event| event.state)
        .collect()
}

struct TestHarness {
    sequencer: PipelineSequencer,
    sink: Arc<RecordingEventSink>,
    store_root: TempDir,
}

async fn harness(server: &MockServer, max_retries: u32) -> TestHarness {
    let store_root = TempDir::new().unwrap();
    let inbound = store_root.path().join("inbound").join("received");
    std::fs::create_dir_all(&inbound).unwrap();
    std::fs::write(inbound.join("feed.zip"), b"raw provider delivery").unwrap();

    let work_dir = store_root.path().join("work");

    let sink = Arc::new(RecordingEventSink::new());
    let sequencer = PipelineSequencer::new(
        Arc::new(transform_client(server, max_retries)),
        Arc::new(ProviderRepository::new(vec![provider(false)]).unwrap()),
        Arc::new(LocalFeedStore::new(store_root.path())),
        Arc::new(LogGraphBuilder),
        sink.clone() as Arc<dyn EventSink>,
        poller_config(max_retries),
        PipelineConfig {
            working_directory: work_dir.to_str().unwrap().to_string(),
            ..PipelineConfig::default()
        },
    );

    TestHarness {
        sequencer,
        sink,
        store_root,
    }
}

#[tokio::test]
async fn import_ok_advances_through_full_pipeline() {
    let server = MockServer::start().await;
    let uri = server.uri();

    // Import submission
    Mock::given(method("POST"))
        .and(path("/referentials/tst/importer/gtfs"))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", format!("{uri}/referentials/tst/scheduled_jobs/1").as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Import polls: STARTED once, then TERMINATED
    Mock::given(method("GET"))
        .and(path("/referentials/tst/scheduled_jobs/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_status_body("STARTED", &[])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/referentials/tst/scheduled_jobs/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_status_body(
            "TERMINATED",
            &[("action_report", &format!("{uri}/referentials/tst/reports/1"))],
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/referentials/tst/reports/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"action_report": {"result": "OK"}})),
        )
        .mount(&server)
        .await;

    // Sibling-job check: one job still scheduled on the first listing,
    // settled on the second
    Mock::given(method("GET"))
        .and(path("/referentials/tst/jobs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([{"status": "SCHEDULED"}])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/referentials/tst/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    // Export submission, poll, report and data download
    Mock::given(method("POST"))
        .and(path("/referentials/tst/exporter/gtfs"))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", format!("{uri}/referentials/tst/scheduled_jobs/2").as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/referentials/tst/scheduled_jobs/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_status_body(
            "TERMINATED",
            &[
                ("action_report", &format!("{uri}/referentials/tst/reports/2")),
                ("data", &format!("{uri}/referentials/tst/data/2")),
            ],
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/referentials/tst/reports/2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"action_report": {"result": "OK"}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/referentials/tst/data/2"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gtfs_export_bytes()))
        .mount(&server)
        .await;

    let harness = harness(&server, 10).await;
    let outcome = harness
        .sequencer
        .run(ProviderId::new(2), "feed.zip")
        .await
        .unwrap();

    assert_eq!(outcome, PipelineOutcome::Completed);

    // Import went PENDING -> STARTED -> OK
    assert_eq!(
        states_for(&harness.sink, EventAction::Import),
        vec![EventState::Pending, EventState::Started, EventState::Ok]
    );
    // Export terminated on the first poll, so no STARTED event
    assert_eq!(
        states_for(&harness.sink, EventAction::Export),
        vec![EventState::Pending, EventState::Ok]
    );
    assert_eq!(
        states_for(&harness.sink, EventAction::ExportGtfsMerged),
        vec![EventState::Pending, EventState::Ok]
    );
    assert_eq!(
        states_for(&harness.sink, EventAction::BuildGraph),
        vec![EventState::Pending, EventState::Ok]
    );

    // The sibling-job check re-listed until the referential settled
    let job_listings = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == "/referentials/tst/jobs")
        .count();
    assert_eq!(job_listings, 2);

    // The merged feed was published into the store
    let published = harness
        .store_root
        .path()
        .join("outbound")
        .join("aggregated-gtfs.zip");
    assert!(published.exists());
}

#[tokio::test]
async fn import_nok_halts_without_advancing() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("POST"))
        .and(path("/referentials/tst/importer/gtfs"))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", format!("{uri}/referentials/tst/scheduled_jobs/1").as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/referentials/tst/scheduled_jobs/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_status_body("STARTED", &[])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/referentials/tst/scheduled_jobs/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_status_body(
            "TERMINATED",
            &[("action_report", &format!("{uri}/referentials/tst/reports/1"))],
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/referentials/tst/reports/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"action_report": {"result": "NOK"}})),
        )
        .mount(&server)
        .await;

    // The export endpoint must never be hit
    Mock::given(method("POST"))
        .and(path("/referentials/tst/exporter/gtfs"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let harness = harness(&server, 10).await;
    let outcome = harness
        .sequencer
        .run(ProviderId::new(2), "feed.zip")
        .await
        .unwrap();

    assert_eq!(
        outcome,
        PipelineOutcome::Halted(conductor::core::pipeline::Stage::Import)
    );
    assert_eq!(
        states_for(&harness.sink, EventAction::Import),
        vec![EventState::Pending, EventState::Started, EventState::Failed]
    );
    assert!(states_for(&harness.sink, EventAction::Export).is_empty());
}

#[tokio::test]
async fn poll_budget_exhaustion_times_out_without_extra_poll() {
    let server = MockServer::start().await;
    let uri = server.uri();
    let max_retries = 3;

    Mock::given(method("POST"))
        .and(path("/referentials/tst/importer/gtfs"))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", format!("{uri}/referentials/tst/scheduled_jobs/1").as_str()),
        )
        .mount(&server)
        .await;
    // The job never leaves STARTED
    Mock::given(method("GET"))
        .and(path("/referentials/tst/scheduled_jobs/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_status_body("STARTED", &[])))
        .mount(&server)
        .await;

    let harness = harness(&server, max_retries).await;
    let outcome = harness
        .sequencer
        .run(ProviderId::new(2), "feed.zip")
        .await
        .unwrap();

    assert_eq!(
        outcome,
        PipelineOutcome::Halted(conductor::core::pipeline::Stage::Import)
    );
    assert_eq!(
        states_for(&harness.sink, EventAction::Import),
        vec![EventState::Pending, EventState::Started, EventState::Timeout]
    );

    // Exactly max_retries polls, never one more
    let polls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == "/referentials/tst/scheduled_jobs/1")
        .count();
    assert_eq!(polls, max_retries as usize);
}

#[tokio::test]
async fn concurrent_runs_are_independent_per_provider() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("POST"))
        .and(path("/referentials/tst/importer/gtfs"))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", format!("{uri}/referentials/tst/scheduled_jobs/1").as_str()),
        )
        .mount(&server)
        .await;
    // The job never leaves STARTED, so the known provider times out
    Mock::given(method("GET"))
        .and(path("/referentials/tst/scheduled_jobs/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_status_body("STARTED", &[])))
        .mount(&server)
        .await;

    let harness = harness(&server, 2).await;
    let deliveries = vec![
        (ProviderId::new(2), "feed.zip".to_string()),
        (ProviderId::new(99), "feed.zip".to_string()),
    ];
    let results = harness.sequencer.run_all(&deliveries).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, ProviderId::new(2));
    assert_eq!(
        *results[0].1.as_ref().unwrap(),
        PipelineOutcome::Halted(conductor::core::pipeline::Stage::Import)
    );
    // The unknown provider fails its lookup without affecting the other run
    assert!(results[1].1.is_err());
}

#[tokio::test]
async fn poller_counts_scheduled_polls_and_emits_single_timeout() {
    let server = MockServer::start().await;
    let max_retries = 5;

    Mock::given(method("GET"))
        .and(path("/jobs/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_status_body("SCHEDULED", &[])))
        .mount(&server)
        .await;

    let client = transform_client(&server, max_retries);
    let sink = RecordingEventSink::new();
    let poller = JobPoller::new(&client, poller_config(max_retries), &sink);
    let mut job = Job::new(
        JobKind::Import,
        ProviderId::new(2),
        CorrelationId::new(),
        format!("{}/jobs/1", server.uri()),
    );

    let outcome = poller
        .poll(&mut job, EventDomain::Timetable, EventAction::Import)
        .await
        .unwrap();

    assert!(matches!(outcome, PollOutcome::TimedOut));
    assert_eq!(job.retries, max_retries);
    // Never STARTED, so the only event is the terminal TIMEOUT
    assert_eq!(
        states_for(&sink, EventAction::Import),
        vec![EventState::Timeout]
    );

    let polls = server.received_requests().await.unwrap().len();
    assert_eq!(polls, max_retries as usize);
}

#[tokio::test]
async fn canceled_job_fails_pipeline() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_status_body("CANCELED", &[])))
        .mount(&server)
        .await;

    let client = transform_client(&server, 10);
    let sink = RecordingEventSink::new();
    let poller = JobPoller::new(&client, poller_config(10), &sink);
    let mut job = Job::new(
        JobKind::Import,
        ProviderId::new(2),
        CorrelationId::new(),
        format!("{}/jobs/1", server.uri()),
    );

    let outcome = poller
        .poll(&mut job, EventDomain::Timetable, EventAction::Import)
        .await
        .unwrap();

    assert!(matches!(outcome, PollOutcome::Failed(_)));
    assert_eq!(
        states_for(&sink, EventAction::Import),
        vec![EventState::Failed]
    );
}

#[tokio::test]
async fn poll_transport_error_emits_failed_and_surfaces_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs/1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = transform_client(&server, 10);
    let sink = RecordingEventSink::new();
    let poller = JobPoller::new(&client, poller_config(10), &sink);
    let mut job = Job::new(
        JobKind::Import,
        ProviderId::new(2),
        CorrelationId::new(),
        format!("{}/jobs/1", server.uri()),
    );

    let result = poller
        .poll(&mut job, EventDomain::Timetable, EventAction::Import)
        .await;

    assert!(result.is_err());
    assert_eq!(
        states_for(&sink, EventAction::Import),
        vec![EventState::Failed]
    );
}

#[tokio::test]
async fn unrecognized_report_result_fails_closed() {
    for body in [
        serde_json::json!({"action_report": {"result": "MAYBE"}}),
        serde_json::json!({"action_report": {}}),
        serde_json::json!({}),
    ] {
        let server = MockServer::start().await;
        let uri = server.uri();

        Mock::given(method("POST"))
            .and(path("/referentials/tst/importer/gtfs"))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("Location", format!("{uri}/referentials/tst/scheduled_jobs/1").as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/referentials/tst/scheduled_jobs/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_status_body(
                "TERMINATED",
                &[("action_report", &format!("{uri}/referentials/tst/reports/1"))],
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/referentials/tst/reports/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let harness = harness(&server, 10).await;
        let outcome = harness
            .sequencer
            .run(ProviderId::new(2), "feed.zip")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PipelineOutcome::Halted(conductor::core::pipeline::Stage::Import)
        );
        assert_eq!(
            states_for(&harness.sink, EventAction::Import),
            vec![EventState::Pending, EventState::Failed]
        );
    }
}

#[tokio::test]
async fn missing_action_report_link_fails_closed() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("POST"))
        .and(path("/referentials/tst/importer/gtfs"))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", format!("{uri}/referentials/tst/scheduled_jobs/1").as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/referentials/tst/scheduled_jobs/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(job_status_body("TERMINATED", &[])),
        )
        .mount(&server)
        .await;

    let harness = harness(&server, 10).await;
    let outcome = harness
        .sequencer
        .run(ProviderId::new(2), "feed.zip")
        .await
        .unwrap();

    assert_eq!(
        outcome,
        PipelineOutcome::Halted(conductor::core::pipeline::Stage::Import)
    );
    assert_eq!(
        states_for(&harness.sink, EventAction::Import),
        vec![EventState::Pending, EventState::Failed]
    );
}

#[tokio::test]
async fn submission_without_location_header_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/referentials/tst/importer/gtfs"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = transform_client(&server, 10);
    let referential = Referential::new("tst").unwrap();
    let err = client
        .submit_job(
            &referential,
            conductor::adapters::transform::SubmitTarget::Importer(DataFormat::Gtfs),
            "{}",
            Some(("feed.zip".to_string(), b"data".to_vec())),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        conductor::domain::ConductorError::Transform(TransformError::MissingLocation(_))
    ));
}

#[tokio::test]
async fn store_round_trip_supports_merge_inputs() {
    // Exports staged through the store are listed back in name order
    let dir = TempDir::new().unwrap();
    let store = LocalFeedStore::new(dir.path());
    store
        .store_export("tst-gtfs.zip", gtfs_export_bytes())
        .await
        .unwrap();

    let exports = store.exports().await.unwrap();
    assert_eq!(exports.len(), 1);
    assert!(conductor::core::merge::is_zip_file(
        &std::fs::read(&exports[0]).unwrap()
    ));
}
