//! Folder endpoint tests.

use http::{Method, StatusCode};
use serde_json::json;

use safemate_core::traits::LedgerError;

use crate::helpers::{ALICE, BOB, TestApp};

fn path(id: &str) -> String {
    format!("/api/folders/{id}")
}

#[tokio::test]
async fn test_health_needs_no_account() {
    let app = TestApp::new();
    let (status, json) = app.request(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
}

#[tokio::test]
async fn test_missing_or_malformed_account_is_unauthorized() {
    let app = TestApp::new();
    let (status, json) = app.request(Method::GET, "/api/folders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Unauthorized");
}

#[tokio::test]
async fn test_new_account_lists_empty_tree() {
    let app = TestApp::new();
    let (status, json) = app.list(ALICE, "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"], json!([]));
    assert_eq!(json["totalFolders"], 0);
    assert_eq!(app.ledger.collections_owned_by(&ALICE), 0);
}

#[tokio::test]
async fn test_create_and_list_nested_folders() {
    let app = TestApp::new();
    let docs = app.create(ALICE, "Docs", None).await;
    let reports = app.create(ALICE, "Reports", Some((docs.as_str(), 0))).await;
    let _archive = app.create(ALICE, "Archive", None).await;

    let (status, json) = app.list(ALICE, "?order=name").await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["totalFolders"], 3);

    let roots = json["data"].as_array().unwrap();
    let names: Vec<&str> = roots.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Archive", "Docs"]);

    let docs_node = &roots[1];
    assert_eq!(docs_node["id"], docs.as_str());
    assert_eq!(docs_node["level"], 0);
    assert_eq!(docs_node["children"][0]["id"], reports.as_str());
    assert_eq!(docs_node["children"][0]["parentId"], docs.as_str());
    assert_eq!(docs_node["children"][0]["level"], 1);

    // All three folders share one collection.
    assert_eq!(app.ledger.collections_owned_by(&ALICE), 1);
}

#[tokio::test]
async fn test_get_and_delete_folder() {
    let app = TestApp::new();
    let docs = app.create(ALICE, "Docs", None).await;
    let child = app.create(ALICE, "Child", Some((docs.as_str(), 0))).await;

    let (status, json) = app.request(Method::GET, &path(&docs), Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["name"], "Docs");
    assert_eq!(json["data"]["ownerAccountId"], ALICE.to_string());

    let (status, json) = app
        .request(Method::DELETE, &path(&docs), Some(ALICE), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{json}");

    let (status, _) = app
        .request(Method::DELETE, &path(&child), Some(ALICE), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .request(Method::DELETE, &path(&docs), Some(ALICE), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app.request(Method::GET, &path(&docs), Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "NotFound");

    let (_, json) = app.list(ALICE, "").await;
    assert_eq!(json["totalFolders"], 0);
}

#[tokio::test]
async fn test_accounts_do_not_see_each_others_folders() {
    let app = TestApp::new();
    let docs = app.create(ALICE, "Docs", None).await;

    let (_, json) = app.list(BOB, "").await;
    assert_eq!(json["totalFolders"], 0);

    let (status, json) = app.request(Method::GET, &path(&docs), Some(BOB), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "Forbidden");

    let (status, _) = app
        .request(Method::DELETE, &path(&docs), Some(BOB), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_the_ledger() {
    let app = TestApp::new();
    app.ledger.reset_counters();

    let cases = [
        (json!({ "name": "   " }), StatusCode::BAD_REQUEST, "InvalidName"),
        (json!({ "name": "a/b" }), StatusCode::BAD_REQUEST, "InvalidName"),
        (json!({ "name": "x".repeat(41) }), StatusCode::BAD_REQUEST, "InvalidName"),
        (
            json!({ "name": "Deep", "parentId": "0.0.5000/1", "parentLevel": 4 }),
            StatusCode::UNPROCESSABLE_ENTITY,
            "DepthExceeded",
        ),
        (
            json!({ "name": "Lost", "parentLevel": 1 }),
            StatusCode::BAD_REQUEST,
            "ValidationError",
        ),
        (
            json!({ "name": "Bad", "parentId": "not-an-id" }),
            StatusCode::BAD_REQUEST,
            "ValidationError",
        ),
    ];

    for (body, expected_status, expected_code) in cases {
        let (status, json) = app
            .request(Method::POST, "/api/folders", Some(ALICE), Some(body.clone()))
            .await;
        assert_eq!(status, expected_status, "{body}");
        assert_eq!(json["error"], expected_code, "{body}");
    }

    assert_eq!(app.ledger.read_calls(), 0);
    assert_eq!(app.ledger.write_calls(), 0);
}

#[tokio::test]
async fn test_depth_limit_through_the_api() {
    let app = TestApp::new();
    let mut parent = app.create(ALICE, "L0", None).await;
    for level in 1..=4u64 {
        parent = app
            .create(ALICE, &format!("L{level}"), Some((parent.as_str(), level - 1)))
            .await;
    }

    // The level-4 folder cannot take a child, even when the client lies about the level.
    let (status, json) = app
        .request(
            Method::POST,
            "/api/folders",
            Some(ALICE),
            Some(json!({ "name": "L5", "parentId": parent, "parentLevel": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "DepthExceeded");

    let (_, json) = app.list(ALICE, "").await;
    assert_eq!(json["totalFolders"], 5);
    assert_eq!(json["unresolved"], json!([]));
}

#[tokio::test]
async fn test_bad_query_and_path_are_validation_errors() {
    let app = TestApp::new();
    let (status, json) = app.list(ALICE, "?order=size").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "ValidationError");

    let (status, json) = app
        .request(Method::GET, "/api/folders/0.0.5000/0", Some(ALICE), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "ValidationError");
}

#[tokio::test(start_paused = true)]
async fn test_expected_folder_is_reported_pending_when_absent() {
    let app = TestApp::new();
    let docs = app.create(ALICE, "Docs", None).await;

    let (status, json) = app
        .list(ALICE, &format!("?expect={docs},0.0.5000/99"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalFolders"], 1);
    assert_eq!(json["pending"], json!(["0.0.5000/99"]));
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_ledger_is_service_unavailable() {
    let app = TestApp::new();
    app.ledger
        .fail_reads(LedgerError::Unavailable("mirror down".into()), 100);

    let (status, json) = app.list(ALICE, "").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "DiscoveryUnavailable");
}

#[tokio::test]
async fn test_revoked_key_is_service_unavailable() {
    let app = TestApp::new();
    app.custody.revoke(&ALICE);

    let (status, json) = app
        .request(
            Method::POST,
            "/api/folders",
            Some(ALICE),
            Some(json!({ "name": "Docs" })),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "KeyUnavailable");
    assert_eq!(app.ledger.write_calls(), 0);
}
