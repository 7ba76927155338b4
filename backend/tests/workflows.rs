//! End-to-end workflow tests against a mock PostgREST server.

use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use wiremock::matchers::{any, body_json, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use libadmin::logs::MemorySink;
use libadmin::{
    delete_library, update_library, upload_csv, AdminError, CsvError, Diagnostics, LetterWriter,
    LibraryUpdate, LogLevel, PostgrestStore, StoreConfig, StoreError, UploadOptions,
    ValidationError,
};

const EXTENDED_CSV: &str = "fscs_id,name,address,tag,api_key\n\
    KY0069,Library 1,\"123 Sesame Street, Public Television, TV 40404\",tag 1,apple-banana-cherry\n\
    ME0119,Library 2,\"1800F St NW, Lewiston, ME, 04240\",tag 2,delta-echo-foxtrot\n";

// =============================================================================
// Test Helpers
// =============================================================================

fn create_config(server: &MockServer) -> StoreConfig {
    let addr = server.address();
    StoreConfig::new("http", addr.ip().to_string(), addr.port(), "admin", "correct-horse")
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/rpc/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok" })))
        .mount(server)
        .await;
}

async fn mount_lookup(server: &MockServer, fscs_id: &str, rows: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/libraries"))
        .and(query_param("fscs_id", format!("eq.{}", fscs_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .expect(1)
        .mount(server)
        .await;
}

fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
    let file = dir.join(name);
    fs::write(&file, content).unwrap();
    file
}

// =============================================================================
// Upload
// =============================================================================

#[tokio::test]
async fn test_upload_inserts_only_missing_libraries() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_lookup(&server, "KY0069", json!([])).await;
    mount_lookup(&server, "ME0119", json!([{ "fscs_id": "ME0119" }])).await;

    Mock::given(method("POST"))
        .and(path("/rpc/insert_library"))
        .and(body_partial_json(json!({
            "fscs_id": "KY0069",
            "name": "Library 1",
            "api_key": "apple-banana-cherry"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "OK" })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(dir.path(), "extended_libraries.csv", EXTENDED_CSV);
    let config = create_config(&server);
    let diag = Diagnostics::silent();
    let store = PostgrestStore::new(&config, &diag);
    let options = UploadOptions {
        letters: Some(LetterWriter::new(dir.path().join("letters")).html_only()),
        ..Default::default()
    };

    let report = upload_csv(&input, &store, &options, &diag).await.unwrap();

    let summary = report.summary();
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(report.letters.len(), 1);
    assert_eq!(
        report.letters[0].html,
        dir.path()
            .join("letters/KY0069-123SesameStreetPublicTelevisionTV40404.html")
    );
    assert!(report.letter_failures.is_empty());
}

#[tokio::test]
async fn test_upload_accepts_legacy_passphrase_column() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_lookup(&server, "KY0069", json!([{ "fscs_id": "KY0069" }])).await;
    mount_lookup(&server, "ME0119", json!([{ "fscs_id": "ME0119" }])).await;

    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(
        dir.path(),
        "extended_libraries.csv",
        &EXTENDED_CSV.replacen("api_key", "passphrase", 1),
    );
    let config = create_config(&server);
    let diag = Diagnostics::silent();
    let store = PostgrestStore::new(&config, &diag);

    let report = upload_csv(&input, &store, &UploadOptions::default(), &diag)
        .await
        .unwrap();

    assert_eq!(report.summary().skipped, 2);
}

#[tokio::test]
async fn test_invalid_file_makes_no_remote_calls() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(
        dir.path(),
        "extended_libraries.csv",
        &EXTENDED_CSV.replacen("address", "addr", 1),
    );
    let config = create_config(&server);
    let sink = MemorySink::new();
    let diag = Diagnostics::silent().with_sink(LogLevel::Debug, sink.clone());
    let store = PostgrestStore::new(&config, &diag);

    let err = upload_csv(&input, &store, &UploadOptions::default(), &diag)
        .await
        .unwrap_err();

    match err {
        AdminError::Validation(ValidationError::SchemaFieldMismatch(mismatches)) => {
            assert_eq!(mismatches.len(), 1);
            assert_eq!(mismatches[0].expected, "address");
            assert_eq!(mismatches[0].actual, "addr");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(sink
        .messages(LogLevel::Error)
        .iter()
        .any(|m| m.contains("'address'") && m.contains("'addr'")));
}

#[tokio::test]
async fn test_shifted_row_makes_no_remote_calls() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(
        dir.path(),
        "extended_libraries.csv",
        "fscs_id,name,address,tag,api_key\n\
         KY0069,Library 1,123 Sesame Street, Public Television,tag 1,apple-banana\n",
    );
    let config = create_config(&server);
    let diag = Diagnostics::silent();
    let store = PostgrestStore::new(&config, &diag);

    let err = upload_csv(&input, &store, &UploadOptions::default(), &diag)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AdminError::Validation(ValidationError::Csv(CsvError::ParseError { .. }))
    ));
}

#[tokio::test]
async fn test_upload_requires_credential_column() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(
        dir.path(),
        "libraries.csv",
        "fscs_id,name,address,tag\nKY0069,Library 1,1 Main St,tag 1\n",
    );
    let config = create_config(&server);
    let diag = Diagnostics::silent();
    let store = PostgrestStore::new(&config, &diag);

    let err = upload_csv(&input, &store, &UploadOptions::default(), &diag)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AdminError::Validation(ValidationError::SchemaCountMismatch {
            expected: 5,
            actual: 4
        })
    ));
}

#[tokio::test]
async fn test_store_failure_keeps_earlier_inserts_and_letters() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_lookup(&server, "KY0069", json!([])).await;
    mount_lookup(&server, "ME0119", json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rpc/insert_library"))
        .and(body_partial_json(json!({ "fscs_id": "KY0069" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "OK" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rpc/insert_library"))
        .and(body_partial_json(json!({ "fscs_id": "ME0119" })))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(dir.path(), "extended_libraries.csv", EXTENDED_CSV);
    let letters = dir.path().join("letters");
    let config = create_config(&server);
    let diag = Diagnostics::silent();
    let store = PostgrestStore::new(&config, &diag);
    let options = UploadOptions {
        letters: Some(LetterWriter::new(&letters).html_only()),
        ..Default::default()
    };

    let err = upload_csv(&input, &store, &options, &diag).await.unwrap_err();

    match err {
        AdminError::Reconcile(e) => {
            assert_eq!(e.row, 1);
            assert_eq!(e.key, "ME0119");
            assert_eq!(e.completed.len(), 1);
            assert!(matches!(
                e.source,
                StoreError::UnexpectedResponse { status: 500, .. }
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fs::read_dir(&letters).unwrap().count(), 1);
}

// =============================================================================
// Update / Delete
// =============================================================================

#[tokio::test]
async fn test_update_without_changes_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_config(&server);
    let diag = Diagnostics::silent();
    let store = PostgrestStore::new(&config, &diag);

    let result = update_library(&store, &LibraryUpdate::new("KY0069"), None, &diag)
        .await
        .unwrap();

    assert_eq!(result, json!({ "updated": "", "rows_updated": 0 }));
}

#[tokio::test]
async fn test_update_api_key_writes_new_letter() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/rpc/update_library"))
        .and(body_json(json!({ "fscs_id": "KY0069", "api_key": "golf-hotel-india" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "updated": "KY0069", "rows_updated": 1 })),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_lookup(
        &server,
        "KY0069",
        json!([{
            "fscs_id": "KY0069",
            "name": "Library 1",
            "address": "1 Main St",
            "tag": "tag 1"
        }]),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let writer = LetterWriter::new(dir.path()).html_only();
    let config = create_config(&server);
    let diag = Diagnostics::silent();
    let store = PostgrestStore::new(&config, &diag);
    let update = LibraryUpdate {
        api_key: Some("golf-hotel-india".into()),
        ..LibraryUpdate::new("KY0069")
    };

    let result = update_library(&store, &update, Some(&writer), &diag)
        .await
        .unwrap();

    assert_eq!(result["rows_updated"], 1);
    let letter = fs::read_to_string(dir.path().join("KY0069-1MainSt.html")).unwrap();
    assert!(letter.contains("golf-hotel-india"));
}

#[tokio::test]
async fn test_update_fields_without_letter() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/rpc/update_library"))
        .and(body_json(json!({ "fscs_id": "KY0069", "address": "2 Main St" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "updated": "KY0069", "rows_updated": 1 })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let writer = LetterWriter::new(dir.path()).html_only();
    let config = create_config(&server);
    let diag = Diagnostics::silent();
    let store = PostgrestStore::new(&config, &diag);
    let update = LibraryUpdate {
        address: Some("2 Main St".into()),
        ..LibraryUpdate::new("KY0069")
    };

    update_library(&store, &update, Some(&writer), &diag)
        .await
        .unwrap();

    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_delete_library() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/rpc/delete_library"))
        .and(body_json(json!({ "fscs_id": "KY0069" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rows_deleted": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_config(&server);
    let diag = Diagnostics::silent();
    let store = PostgrestStore::new(&config, &diag);

    let result = delete_library(&store, "KY0069", &diag).await.unwrap();
    assert_eq!(result["rows_deleted"], 1);
}
