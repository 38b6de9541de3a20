//! Integration coverage for the multiplexed REST invoker: endpoint
//! failover, round-robin rotation, response classification, and
//! cancellation precedence.

use mailcheck_client::{CancellationToken, MailCheckClient};
use mailcheck_domain::MailCheckError;
use wiremock::matchers::{header, headers, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(servers: &[&MockServer]) -> MailCheckClient {
    MailCheckClient::builder()
        .basic_auth("browser-app", "secret")
        .expect("credentials")
        .base_urls(servers.iter().map(|server| server.uri()))
        .build()
        .expect("client")
}

fn balance_body() -> serde_json::Value {
    serde_json::json!({ "creditPacks": 100.0, "freeCredits": 25.0 })
}

#[tokio::test]
async fn exhausting_all_endpoints_aggregates_one_failure_each() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    for server in [&first, &second] {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(server)
            .await;
    }

    let client = client_for(&[&first, &second]);
    let result = client.credits().balance(None).await;

    match result {
        Err(MailCheckError::ServiceUnreachable { failures }) => {
            assert_eq!(failures.len(), 2, "exactly one recorded failure per endpoint");
        }
        other => panic!("expected ServiceUnreachable, got {other:?}"),
    }

    // Exactly N attempts for N endpoints, never more.
    assert_eq!(first.received_requests().await.unwrap().len(), 1);
    assert_eq!(second.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn consecutive_invocations_rotate_across_endpoints() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    let third = MockServer::start().await;
    for server in [&first, &second, &third] {
        Mock::given(method("GET"))
            .and(path("/credits/balance"))
            .respond_with(ResponseTemplate::new(200).set_body_json(balance_body()))
            .expect(1)
            .mount(server)
            .await;
    }

    let client = client_for(&[&first, &second, &third]);
    for _ in 0..3 {
        client.credits().balance(None).await.expect("balance");
    }

    // Three calls wrap the whole rotation: each endpoint serves exactly one.
    for server in [&first, &second, &third] {
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn transport_failures_fall_through_to_healthy_endpoint() {
    let healthy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(balance_body()))
        .mount(&healthy)
        .await;

    // A dead endpoint plus a healthy one: the call must still succeed, in
    // either rotation order.
    let dead = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so requests fail with ECONNREFUSED
        format!("http://{addr}")
    };

    let client = MailCheckClient::builder()
        .basic_auth("browser-app", "secret")
        .expect("credentials")
        .base_urls([dead, healthy.uri()])
        .build()
        .expect("client");

    let balance = client.credits().balance(None).await.expect("balance despite dead endpoint");
    assert_eq!(balance.credit_packs, 100.0);
}

#[tokio::test]
async fn unauthorized_fails_immediately_without_failover() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    for server in [&first, &second] {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(server)
            .await;
    }

    let client = client_for(&[&first, &second]);
    let result = client.credits().balance(None).await;
    assert!(matches!(result, Err(MailCheckError::Authentication(_))));

    // 401 is not a retry path: only one endpoint may have been contacted.
    let total = first.received_requests().await.unwrap().len()
        + second.received_requests().await.unwrap().len();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn captcha_problem_body_yields_the_specific_error() {
    let server = MockServer::start().await;
    let problem = serde_json::json!({
        "type": "/problems/captcha-validation-failed",
        "detail": "The CAPTCHA token is invalid."
    });
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_raw(problem.to_string(), "application/problem+json"),
        )
        .mount(&server)
        .await;

    let client = client_for(&[&server]);
    let result = client.credits().balance(None).await;
    match result {
        Err(MailCheckError::CaptchaValidation(message)) => {
            assert!(message.contains("CAPTCHA token"));
        }
        other => panic!("expected CaptchaValidation, got {other:?}"),
    }
}

#[tokio::test]
async fn payment_required_maps_to_insufficient_credit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(402))
        .mount(&server)
        .await;

    let client = client_for(&[&server]);
    let result = client.credits().balance(None).await;
    assert!(matches!(result, Err(MailCheckError::InsufficientCredit(_))));
}

#[tokio::test]
async fn too_many_requests_maps_to_throttled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = client_for(&[&server]);
    let result = client.credits().balance(None).await;
    assert!(matches!(result, Err(MailCheckError::Throttled(_))));
}

#[tokio::test]
async fn forbidden_without_recovery_maps_to_authorization() {
    let server = MockServer::start().await;
    let problem = serde_json::json!({ "detail": "This plan cannot export entries." });
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_raw(problem.to_string(), "application/problem+json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&[&server]);
    let result = client.credits().balance(None).await;
    match result {
        Err(MailCheckError::Authorization(message)) => {
            assert!(message.contains("cannot export"));
        }
        other => panic!("expected Authorization, got {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_wins_even_when_the_call_would_succeed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(balance_body()))
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    token.cancel();

    let client = client_for(&[&server]);
    let result = client.credits().balance(Some(&token)).await;
    assert!(matches!(result, Err(MailCheckError::Canceled)));

    // The request was never sent.
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn requests_carry_the_default_accept_and_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(headers("Accept", vec!["application/json", "application/problem+json"]))
        .and(header("User-Agent", "test-agent/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(balance_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = MailCheckClient::builder()
        .basic_auth("browser-app", "secret")
        .expect("credentials")
        .base_urls([server.uri()])
        .user_agent("test-agent/1.0")
        .build()
        .expect("client");

    client.credits().balance(None).await.expect("balance");
}
