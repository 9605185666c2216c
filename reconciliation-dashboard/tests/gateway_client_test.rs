//! HTTP gateway client against a mock backend.

mod common;

use reconciliation_dashboard::config::GatewaySettings;
use reconciliation_dashboard::gateway::{
    ExportFormat, FetchInvoicesRequest, Gateway, GatewayError, HttpGateway, ReconcileRequest,
    UploadOptions,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

async fn gateway_for(server: &MockServer) -> HttpGateway {
    common::init_tracing();
    HttpGateway::new(GatewaySettings::with_base_url(format!("{}/api/", server.uri())))
        .expect("client should build")
}

#[tokio::test]
async fn upload_status_defeats_caches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/upload-status"))
        .and(header("Cache-Control", "no-cache"))
        .and(|req: &Request| req.url.query_pairs().any(|(k, v)| k == "_t" && !v.is_empty()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "hasInvoices": true,
                "hasBankStatements": false,
                "invoiceCount": 14,
                "bankCount": 0
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let status = gateway_for(&server).await.upload_status().await.unwrap();

    assert!(status.has_invoices);
    assert!(!status.has_bank_statements);
    assert_eq!(status.invoice_count, 14);
}

#[tokio::test]
async fn reconcile_posts_camel_case_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/reconcile"))
        .and(header("x-request-id", "session_1700000000000_0a1b2c3d"))
        .and(body_json(json!({
            "limit": 500,
            "daysBack": 14,
            "latestOnly": true,
            "uploadBatchOnly": false,
            "sessionId": "session_1700000000000_0a1b2c3d"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "reconciliationCount": 4 },
            "message": "Reconciliation completed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = gateway_for(&server)
        .await
        .reconcile(&ReconcileRequest {
            limit: 500,
            days_back: 14,
            latest_only: true,
            upload_batch_only: false,
            session_id: "session_1700000000000_0a1b2c3d".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(result.reconciliation_count, 4);
}

#[tokio::test]
async fn structured_failure_becomes_application_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/reconcile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "No bank statements in the selected window"
        })))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .await
        .reconcile(&ReconcileRequest {
            limit: 1000,
            days_back: 30,
            latest_only: false,
            upload_batch_only: true,
            session_id: "session_1_00000000".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(
        err,
        GatewayError::Application {
            endpoint: "reconcile",
            message: "No bank statements in the selected window".to_string()
        }
    );
    assert_eq!(err.to_string(), "No bank statements in the selected window");
}

#[tokio::test]
async fn server_error_keeps_status_and_body_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/fetch-invoices"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "success": false,
            "message": "warehouse insert failed"
        })))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .await
        .fetch_invoices(&FetchInvoicesRequest {
            date_from: "2024-01-01".to_string(),
            date_to: "2024-01-31".to_string(),
            limit: 1000,
        })
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(500));
    assert!(err.to_string().contains("warehouse insert failed"));
}

#[tokio::test]
async fn refused_connection_is_unreachable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    common::init_tracing();
    let gateway = HttpGateway::new(GatewaySettings::with_base_url(format!(
        "http://127.0.0.1:{}/api",
        port
    )))
    .unwrap();

    let err = gateway.health().await.unwrap_err();

    assert!(err.is_unreachable(), "got {:?}", err);
    assert!(err.to_string().contains(&format!("127.0.0.1:{}", port)));
}

#[tokio::test]
async fn results_tolerate_unexpected_shapes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reconciliation-results"))
        .and(query_param("limit", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "rows": [] }
        })))
        .mount(&server)
        .await;

    let records = gateway_for(&server)
        .await
        .reconciliation_results(1000)
        .await
        .unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn results_skip_malformed_elements() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reconciliation-results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                {
                    "id": 17,
                    "invoiceNumber": "INV-0017",
                    "matchConfidence": 0.93,
                    "matchType": "AI_MATCH",
                    "status": "matched",
                    "sessionId": "session_1_abcdef01"
                },
                "not a record",
                { "id": { "nested": true } }
            ]
        })))
        .mount(&server)
        .await;

    let records = gateway_for(&server)
        .await
        .reconciliation_results(50)
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "17");
    assert_eq!(records[0].invoice_number.as_deref(), Some("INV-0017"));
    assert_eq!(records[0].session_id.as_deref(), Some("session_1_abcdef01"));
}

#[tokio::test]
async fn results_accept_numeric_ids_and_null_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reconciliation-results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                {
                    "id": 1,
                    "invoice_id": 42,
                    "bank_transaction_id": 9001,
                    "match_confidence": 0.97,
                    "match_type": "EXACT_MATCH"
                },
                { "id": 2, "amount_difference": null, "match_confidence": 0.9 },
                { "id": 3, "match_confidence": "0.72" }
            ]
        })))
        .mount(&server)
        .await;

    let records = gateway_for(&server)
        .await
        .reconciliation_results(1000)
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].invoice_id.as_deref(), Some("42"));
    assert_eq!(records[0].bank_transaction_id.as_deref(), Some("9001"));
    assert_eq!(records[1].amount_difference, 0.0);
    assert_eq!(records[2].match_confidence, 0.72);
}

#[tokio::test]
async fn stats_with_null_average_still_load() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "total_reconciliations": 0,
                "matched": 0,
                "pending": 0,
                "avg_confidence": null
            }
        })))
        .mount(&server)
        .await;

    let stats = gateway_for(&server).await.stats().await.unwrap();

    assert_eq!(stats.total_reconciliations, 0);
    assert_eq!(stats.avg_confidence, 0.0);
}

#[tokio::test]
async fn delete_uses_results_resource() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/reconciliation-results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Deleted"
        })))
        .expect(1)
        .mount(&server)
        .await;

    gateway_for(&server)
        .await
        .delete_reconciliation_results()
        .await
        .unwrap();
}

#[tokio::test]
async fn missing_delete_route_is_an_error() {
    let server = MockServer::start().await;

    let err = gateway_for(&server)
        .await
        .delete_reconciliation_results()
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn upload_sends_file_and_flags_as_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload-bank-statement"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "processedRows": 3 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = gateway_for(&server)
        .await
        .upload_bank_statement(
            "march.csv",
            b"date,amount\n2024-03-01,10.00\n".to_vec(),
            UploadOptions {
                upload_batch_only: true,
                clear_previous: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(result.processed_rows, 3);

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("filename=\"march.csv\""));
    assert!(body.contains("name=\"uploadBatchOnly\""));
    assert!(body.contains("name=\"clearPrevious\""));
    assert!(body.contains("2024-03-01,10.00"));
}

#[tokio::test]
async fn export_returns_raw_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/export/csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("id,confidence\n1,0.97\n"))
        .mount(&server)
        .await;

    let bytes = gateway_for(&server)
        .await
        .export(ExportFormat::Csv)
        .await
        .unwrap();

    assert_eq!(bytes, b"id,confidence\n1,0.97\n".to_vec());
}

#[tokio::test]
async fn health_report_lists_failing_services() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "degraded",
            "services": {
                "bigquery": { "success": true, "message": "connected" },
                "matcher": { "success": false, "message": "model timeout" }
            }
        })))
        .mount(&server)
        .await;

    let report = gateway_for(&server).await.health().await.unwrap();

    assert_eq!(report.status, "degraded");
    assert_eq!(report.unhealthy_services(), vec!["matcher"]);
}
