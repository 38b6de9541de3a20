//! Integration coverage for the job orchestrator: submit, absent
//! outcomes, poll-until-complete, entry materialization, delete, and
//! export.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mailcheck_client::{CancellationToken, MailCheckClient, WaitOptions};
use mailcheck_domain::{
    FileValidationRequest, MailCheckError, QualityLevel, ValidationSettings, ValidationStatus,
};
use wiremock::matchers::{
    body_partial_json, body_string_contains, header, method, path, query_param,
};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client_for(server: &MockServer) -> MailCheckClient {
    MailCheckClient::builder()
        .basic_auth("browser-app", "secret")
        .expect("credentials")
        .base_urls([server.uri()])
        .build()
        .expect("client")
}

fn overview_body(id: &str, status: &str, entries: u64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "status": status,
        "noOfEntries": entries,
    })
}

fn entry_body(index: u32, input: &str) -> serde_json::Value {
    serde_json::json!({
        "index": index,
        "inputData": input,
        "classification": "Deliverable",
        "status": "Success",
        "emailAddress": input,
    })
}

#[tokio::test]
async fn missing_job_yields_absent_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/email-validations/no-such-job"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/email-validations/expired-job"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let validations = client.email_validations();

    let missing = validations.get("no-such-job", WaitOptions::no_wait(), None).await.unwrap();
    assert!(missing.is_none());

    let expired = validations.get("expired-job", WaitOptions::no_wait(), None).await.unwrap();
    assert!(expired.is_none());
}

#[tokio::test]
async fn submit_without_waiting_returns_the_completed_job() {
    let server = MockServer::start().await;
    let body = serde_json::json!({
        "overview": overview_body("j-1", "Completed", 1),
        "entries": {
            "meta": { "isTruncated": false },
            "data": [entry_body(0, "alice@example.com")]
        }
    });
    Mock::given(method("POST"))
        .and(path("/email-validations"))
        .and(query_param("waitTime", "0"))
        .and(body_partial_json(serde_json::json!({
            "entries": [{ "inputData": "alice@example.com" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let job = client
        .email_validations()
        .submit("alice@example.com", WaitOptions::no_wait(), None)
        .await
        .expect("submission")
        .expect("job present");

    assert_eq!(job.overview.status, ValidationStatus::Completed);
    assert_eq!(job.entries.len(), 1);
    assert_eq!(job.entries[0].input_data, "alice@example.com");
}

#[tokio::test]
async fn file_submissions_ship_as_multipart_with_their_settings() {
    let server = MockServer::start().await;
    let body = serde_json::json!({
        "overview": overview_body("j-file", "Completed", 1),
        "entries": {
            "meta": { "isTruncated": false },
            "data": [entry_body(0, "alice@example.com")]
        }
    });

    // Both form parts must reach the wire: the uploaded file under
    // `inputFile` and the JSON settings under `settings`.
    Mock::given(method("POST"))
        .and(path("/email-validations"))
        .and(query_param("waitTime", "0"))
        .and(body_string_contains("name=\"inputFile\""))
        .and(body_string_contains("filename=\"list.csv\""))
        .and(body_string_contains("alice@example.com"))
        .and(body_string_contains("name=\"settings\""))
        .and(body_string_contains("\"quality\":\"High\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let request = FileValidationRequest {
        contents: b"alice@example.com\n".to_vec(),
        file_name: "list.csv".into(),
        content_type: "text/csv".into(),
        settings: ValidationSettings {
            quality: Some(QualityLevel::high()),
            ..Default::default()
        },
    };

    let client = client_for(&server);
    let job = client
        .email_validations()
        .submit(request, WaitOptions::no_wait(), None)
        .await
        .expect("file submission")
        .expect("job present");

    assert_eq!(job.overview.status, ValidationStatus::Completed);
    assert_eq!(job.entries.len(), 1);
}

#[tokio::test]
async fn polling_stops_at_completion_and_reports_progress_per_observation() {
    let server = MockServer::start().await;

    // InProgress on the first two polls, Completed with 3 entries on the
    // third. A 1s server ETA keeps the test fast.
    let polls = Arc::new(AtomicUsize::new(0));
    let polls_clone = polls.clone();
    Mock::given(method("GET"))
        .and(path("/email-validations/j-2"))
        .respond_with(move |_request: &Request| -> ResponseTemplate {
            let poll = polls_clone.fetch_add(1, Ordering::SeqCst);
            if poll < 2 {
                let mut overview = overview_body("j-2", "InProgress", 3);
                overview["progress"] = serde_json::json!({
                    "percentage": 0.3 * (poll + 1) as f64,
                    "estimatedTimeRemaining": "00:00:01"
                });
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "overview": overview }))
            } else {
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "overview": overview_body("j-2", "Completed", 3),
                    "entries": {
                        "meta": { "isTruncated": false },
                        "data": [
                            entry_body(0, "a@example.com"),
                            entry_body(1, "b@example.com"),
                            entry_body(2, "c@example.com"),
                        ]
                    }
                }))
            }
        })
        .expect(3)
        .mount(&server)
        .await;

    let observations = Arc::new(AtomicUsize::new(0));
    let counter = observations.clone();
    let options = WaitOptions::default().on_progress(move |overview| {
        assert_eq!(overview.status, ValidationStatus::InProgress);
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let client = client_for(&server);
    let job = client
        .email_validations()
        .get("j-2", options, None)
        .await
        .expect("poll loop")
        .expect("job present");

    assert_eq!(job.entries.len(), 3);
    // Exactly one progress report per non-terminal observation.
    assert_eq!(observations.load(Ordering::SeqCst), 2);
    assert_eq!(polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn job_vanishing_between_polls_terminates_with_absent() {
    let server = MockServer::start().await;
    let polls = Arc::new(AtomicUsize::new(0));
    let polls_clone = polls.clone();
    Mock::given(method("GET"))
        .and(path("/email-validations/j-3"))
        .respond_with(move |_request: &Request| -> ResponseTemplate {
            if polls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                let mut overview = overview_body("j-3", "InProgress", 1);
                overview["progress"] =
                    serde_json::json!({ "estimatedTimeRemaining": "00:00:01" });
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "overview": overview }))
            } else {
                ResponseTemplate::new(410)
            }
        })
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let job = client.email_validations().get("j-3", WaitOptions::default(), None).await.unwrap();
    assert!(job.is_none());
}

#[tokio::test]
async fn canceling_during_a_poll_wait_aborts_with_canceled() {
    let server = MockServer::start().await;
    let overview = serde_json::json!({
        "overview": {
            "id": "j-4",
            "status": "InProgress",
            "noOfEntries": 1,
            "progress": { "estimatedTimeRemaining": "00:00:30" }
        }
    });
    Mock::given(method("GET"))
        .and(path("/email-validations/j-4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overview))
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let canceler = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceler.cancel();
    });

    let started = std::time::Instant::now();
    let client = client_for(&server);
    let result =
        client.email_validations().get("j-4", WaitOptions::default(), Some(&token)).await;

    assert!(matches!(result, Err(MailCheckError::Canceled)));
    // The 30s server ETA was abandoned, not slept through.
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn wait_deadline_caps_the_poll_loop() {
    let server = MockServer::start().await;
    // A job that never completes, with a server ETA well past the deadline.
    let overview = serde_json::json!({
        "overview": {
            "id": "j-5",
            "status": "InProgress",
            "noOfEntries": 1,
            "progress": { "estimatedTimeRemaining": "00:00:03" }
        }
    });
    Mock::given(method("GET"))
        .and(path("/email-validations/j-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overview))
        .mount(&server)
        .await;

    let options = WaitOptions::default().max_wait(Duration::from_millis(300));
    let started = std::time::Instant::now();
    let client = client_for(&server);
    let result = client.email_validations().get("j-5", options, None).await;

    assert!(matches!(result, Err(MailCheckError::WaitTimeout)));
    // The timeout surfaces at the deadline; the 3s ETA must not stretch it.
    assert!(started.elapsed() < Duration::from_secs(2), "elapsed {:?}", started.elapsed());
}

#[tokio::test]
async fn entries_are_materialized_across_every_segment() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/email-validations/j-6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "overview": overview_body("j-6", "Completed", 4),
            "entries": {
                "meta": { "cursor": "seg-2", "isTruncated": true },
                "data": [entry_body(0, "a@example.com"), entry_body(1, "b@example.com")]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/email-validations/j-6/entries"))
        .and(query_param("cursor", "seg-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "meta": { "isTruncated": false },
            "data": [entry_body(2, "c@example.com"), entry_body(3, "d@example.com")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let job = client
        .email_validations()
        .get("j-6", WaitOptions::no_wait(), None)
        .await
        .expect("fetch")
        .expect("job present");

    // Every entry exactly once, in segment order.
    let inputs: Vec<_> = job.entries.iter().map(|entry| entry.input_data.as_str()).collect();
    assert_eq!(inputs, vec!["a@example.com", "b@example.com", "c@example.com", "d@example.com"]);
}

#[tokio::test]
async fn deleting_an_already_gone_job_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/email-validations/j-7"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.email_validations().delete("j-7", None).await.expect("delete");
}

#[tokio::test]
async fn export_returns_the_raw_stream() {
    let server = MockServer::start().await;
    let csv = "inputData,classification\nalice@example.com,Deliverable\n";
    Mock::given(method("GET"))
        .and(path("/email-validations/j-8/entries"))
        .and(header("Accept", "text/csv"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(csv, "text/csv"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let exported = client
        .email_validations()
        .export_entries("j-8", mailcheck_client::ExportFormat::Csv, None)
        .await
        .expect("export");
    assert_eq!(exported, csv.as_bytes());
}

#[tokio::test]
async fn empty_submissions_fail_before_any_request() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let result = client.email_validations().submit("", WaitOptions::no_wait(), None).await;
    assert!(matches!(result, Err(MailCheckError::InvalidInput(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}
