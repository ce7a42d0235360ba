//! Shared test helpers for integration tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use safemate_api::{AppState, build_app};
use safemate_core::config::AppConfig;
use safemate_core::types::AccountId;
use safemate_ledger::memory::{InMemoryKeyCustody, InMemoryLedger, provision_account};
use safemate_service::folder::{FolderRepository, FolderService};

pub const ALICE: AccountId = AccountId::new(0, 0, 1001);
pub const BOB: AccountId = AccountId::new(0, 0, 1002);

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// The sandbox ledger behind the router
    pub ledger: InMemoryLedger,
    /// Key custody behind the router
    pub custody: InMemoryKeyCustody,
}

impl TestApp {
    /// Create an app with ALICE and BOB provisioned.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create an app from an explicit configuration.
    pub fn with_config(config: AppConfig) -> Self {
        let ledger = InMemoryLedger::new();
        let custody = InMemoryKeyCustody::new();
        provision_account(&ledger, &custody, ALICE);
        provision_account(&ledger, &custody, BOB);

        let repository = Arc::new(FolderRepository::new(
            Arc::new(ledger.clone()),
            config.ledger.clone(),
            config.folders.clone(),
        ));
        let service = Arc::new(FolderService::new(repository, Arc::new(custody.clone())));
        let state = AppState::new(Arc::new(config), service);

        Self {
            router: build_app(state),
            ledger,
            custody,
        }
    }

    /// Send a request as `account` and return the status and JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        account: Option<AccountId>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(account) = account {
            builder = builder.header("x-safemate-account", account.to_string());
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Create a folder as `account` and return its id.
    pub async fn create(
        &self,
        account: AccountId,
        name: &str,
        parent: Option<(&str, u64)>,
    ) -> String {
        let body = match parent {
            Some((id, level)) => {
                serde_json::json!({ "name": name, "parentId": id, "parentLevel": level })
            }
            None => serde_json::json!({ "name": name }),
        };
        let (status, json) = self
            .request(Method::POST, "/api/folders", Some(account), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["data"]["id"].as_str().unwrap().to_string()
    }

    /// List folders as `account`.
    pub async fn list(&self, account: AccountId, query: &str) -> (StatusCode, Value) {
        self.request(Method::GET, &format!("/api/folders{query}"), Some(account), None)
            .await
    }
}
