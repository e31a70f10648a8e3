//! Integration tests for the Dremio REST client using wiremock.
//!
//! These tests verify the client against a mock HTTP server: login and
//! token propagation, job submission and polling, failure classification,
//! and result decoding.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vdsguard_client::{ClientConfig, ClientError, DremioClient, SqlTransport};

// =============================================================================
// Test Helpers
// =============================================================================

fn create_config(server: &MockServer) -> ClientConfig {
    let uri = server.uri();
    let hostport = uri
        .strip_prefix("http://")
        .expect("mock server uri is http");
    let (host, port) = hostport.split_once(':').expect("host:port");

    ClientConfig::new(host, "admin", "secret")
        .with_port(port.parse().expect("port"))
        .with_poll_interval_ms(10)
        .with_poll_budget_secs(2)
}

async fn mount_login(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/apiv2/login"))
        .and(body_json(json!({"userName": "admin", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": token})))
        .mount(server)
        .await;
}

// =============================================================================
// Connection Tests
// =============================================================================

#[tokio::test]
async fn connect_success() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1").await;

    let client = DremioClient::connect(create_config(&server)).await;
    assert!(client.is_ok(), "connect should succeed: {:?}", client.err());
}

#[tokio::test]
async fn connect_invalid_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/apiv2/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let err = DremioClient::connect(create_config(&server))
        .await
        .expect_err("connect should fail on 401");
    assert!(matches!(err, ClientError::AuthenticationFailed));
}

#[tokio::test]
async fn connect_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/apiv2/login"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let err = DremioClient::connect(create_config(&server))
        .await
        .expect_err("connect should fail on 500");
    assert!(matches!(err, ClientError::ConnectionFailed { .. }));
}

// =============================================================================
// Statement Execution Tests
// =============================================================================

#[tokio::test]
async fn ddl_statement_success() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-ddl").await;

    // The session token must travel on every subsequent request.
    Mock::given(method("POST"))
        .and(path("/api/v3/sql"))
        .and(header("Authorization", "_dremiotok-ddl"))
        .and(body_json(json!({"sql": "GRANT SELECT ON VDS \"a\".\"b\" TO USER \"alice\""})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "job-1"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v3/job/job-1"))
        .and(header("Authorization", "_dremiotok-ddl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobState": "COMPLETED"})))
        .mount(&server)
        .await;

    let client = DremioClient::connect(create_config(&server)).await.unwrap();
    let result = client
        .run_statement("GRANT SELECT ON VDS \"a\".\"b\" TO USER \"alice\"", false)
        .await
        .expect("DDL should succeed");
    assert!(result.is_empty());
}

#[tokio::test]
async fn statement_polls_until_complete() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-poll").await;

    Mock::given(method("POST"))
        .and(path("/api/v3/sql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "job-2"})))
        .mount(&server)
        .await;

    // First two polls report RUNNING, then the job completes.
    Mock::given(method("GET"))
        .and(path("/api/v3/job/job-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobState": "RUNNING"})))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v3/job/job-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobState": "COMPLETED"})))
        .mount(&server)
        .await;

    let client = DremioClient::connect(create_config(&server)).await.unwrap();
    let result = client.run_statement("ALTER VIEW x", false).await;
    assert!(result.is_ok(), "should poll to completion: {:?}", result.err());
}

#[tokio::test]
async fn failed_job_surfaces_error_message() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-fail").await;

    Mock::given(method("POST"))
        .and(path("/api/v3/sql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "job-3"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v3/job/job-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"jobState": "FAILED", "errorMessage": "VALIDATION ERROR: object not found"}),
        ))
        .mount(&server)
        .await;

    let client = DremioClient::connect(create_config(&server)).await.unwrap();
    let err = client
        .run_statement("ALTER VIEW missing", false)
        .await
        .expect_err("failed job should error");

    match err {
        ClientError::JobFailed { job_id, message } => {
            assert_eq!(job_id, "job-3");
            assert!(message.contains("VALIDATION ERROR"));
        }
        other => panic!("expected JobFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_submission_is_statement_rejected() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-bad").await;

    Mock::given(method("POST"))
        .and(path("/api/v3/sql"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"errorMessage": "parse error at line 1"})),
        )
        .mount(&server)
        .await;

    let client = DremioClient::connect(create_config(&server)).await.unwrap();
    let err = client
        .run_statement("NOT SQL", false)
        .await
        .expect_err("bad statement should be rejected");

    match err {
        ClientError::StatementRejected { message } => {
            assert!(message.contains("parse error"));
        }
        other => panic!("expected StatementRejected, got {other:?}"),
    }
}

// =============================================================================
// Result Decoding Tests
// =============================================================================

#[tokio::test]
async fn read_statement_decodes_rows() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-read").await;

    Mock::given(method("POST"))
        .and(path("/api/v3/sql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "job-4"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v3/job/job-4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobState": "COMPLETED"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v3/job/job-4/results"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rowCount": 2,
            "rows": [
                {"path": "[space, orders]"},
                {"path": "[space, customers]"}
            ]
        })))
        .mount(&server)
        .await;

    let client = DremioClient::connect(create_config(&server)).await.unwrap();
    let result = client
        .run_statement("SELECT path FROM sys.views", true)
        .await
        .expect("read should succeed");

    assert_eq!(result.len(), 2);
    assert_eq!(
        result.column_values("path"),
        vec!["[space, orders]", "[space, customers]"]
    );
}

#[tokio::test]
async fn read_statement_pages_through_results() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-page").await;

    Mock::given(method("POST"))
        .and(path("/api/v3/sql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "job-5"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v3/job/job-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobState": "COMPLETED"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v3/job/job-5/results"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rowCount": 3,
            "rows": [{"n": 1}, {"n": 2}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v3/job/job-5/results"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rowCount": 3,
            "rows": [{"n": 3}]
        })))
        .mount(&server)
        .await;

    let client = DremioClient::connect(create_config(&server)).await.unwrap();
    let result = client
        .run_statement("SELECT n FROM big", true)
        .await
        .expect("paged read should succeed");

    assert_eq!(result.len(), 3);
    assert_eq!(result.column_values("n"), vec!["1", "2", "3"]);
}
