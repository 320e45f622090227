//! HarvestClient against a local stub of the Harvest API.

mod common;

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use common::ScriptedPrompter;
use harvest_migrate::auth::{Authorizer, OAuthTokens, StoredAccount};
use harvest_migrate::network::RetryConfig;
use harvest_migrate::{
    AccountRole, CreateOutcome, CredentialProvider, EntityDirectory, HarvestClient,
    HarvestIdClient, HttpClient, MigrateError, NewTimeEntry, OAuthSettings, Result,
    TimeEntrySink, TokenStore,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Clone, Default)]
struct Stub {
    requests: Arc<Mutex<Vec<String>>>,
    posted: Arc<Mutex<Vec<Value>>>,
}

impl Stub {
    fn record(&self, line: String) {
        self.requests.lock().unwrap().push(line);
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn posted(&self) -> Vec<Value> {
        self.posted.lock().unwrap().clone()
    }
}

fn header(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn revoked(headers: &HeaderMap) -> bool {
    header(headers, "authorization") == "Bearer revoked"
}

async fn users(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if revoked(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_token", "error_description": "Token revoked"})),
        )
            .into_response();
    }

    let page = query.get("page").cloned().unwrap_or_default();
    stub.record(format!(
        "GET /users page={} per_page={} account={} auth={} agent={}",
        page,
        query.get("per_page").cloned().unwrap_or_default(),
        header(&headers, "harvest-account-id"),
        header(&headers, "authorization"),
        header(&headers, "user-agent"),
    ));

    let user = |id: u64, first: &str| {
        json!({
            "id": id,
            "first_name": first,
            "last_name": "Allen",
            "email": "k@example.com",
            "is_active": true,
        })
    };
    match page.as_str() {
        "1" => Json(json!({"users": [user(1, "Kim")], "next_page": 2})).into_response(),
        _ => Json(json!({"users": [user(2, "Lee")], "next_page": null})).into_response(),
    }
}

async fn project(State(stub): State<Stub>, Path(id): Path<u64>) -> Response {
    stub.record(format!("GET /projects/{}", id));
    if id == 2 {
        Json(json!({"id": 2, "name": "Website 2024", "code": "W24", "is_active": true}))
            .into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"message": "Not found"}))).into_response()
    }
}

async fn task_assignments(State(stub): State<Stub>, Path(id): Path<u64>) -> Json<Value> {
    stub.record(format!("GET /projects/{}/task_assignments", id));
    Json(json!({
        "task_assignments": [
            {"id": 900, "is_active": true, "task": {"id": 23, "name": "Design"}}
        ],
        "next_page": null
    }))
}

async fn list_entries(
    State(stub): State<Stub>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    stub.record(format!(
        "GET /time_entries from={} to={} user_id={}",
        query.get("from").cloned().unwrap_or_default(),
        query.get("to").cloned().unwrap_or_default(),
        query.get("user_id").cloned().unwrap_or_default(),
    ));
    Json(json!({
        "time_entries": [{
            "id": 636709355,
            "spent_date": "2024-03-15",
            "hours": 2.0,
            "notes": "Homepage",
            "project": {"id": 1, "name": "Website"},
            "task": {"id": 11, "name": "Design"},
            "user": {"id": 1, "name": "Kim Allen"}
        }],
        "next_page": null
    }))
}

async fn create_entry(State(stub): State<Stub>, Json(body): Json<Value>) -> Response {
    stub.record("POST /time_entries".to_string());
    stub.posted.lock().unwrap().push(body.clone());
    if body["notes"] == "locked" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"message": "Spent date is locked"})),
        )
            .into_response();
    }
    (StatusCode::CREATED, Json(json!({"id": 555, "hours": body["hours"]}))).into_response()
}

async fn spawn_api(stub: Stub) -> String {
    let app = Router::new()
        .route("/users", get(users))
        .route("/projects/:id", get(project))
        .route("/projects/:id/task_assignments", get(task_assignments))
        .route("/time_entries", get(list_entries).post(create_entry))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

struct NoAuthorizer;

#[async_trait]
impl Authorizer for NoAuthorizer {
    async fn authorize(&self, _url: &str, _state: &str) -> Result<String> {
        Err(MigrateError::OAuth {
            message: "not available in tests".into(),
        })
    }
}

fn stored(id: u64, token: &str) -> StoredAccount {
    StoredAccount {
        id,
        name: format!("Account {}", id),
        tokens: OAuthTokens {
            access_token: token.into(),
            refresh_token: "refresh".into(),
            token_type: "bearer".into(),
            expires_in: 1_209_600,
            scope: None,
            created_at: chrono::Utc::now().timestamp(),
        },
    }
}

struct Harness {
    source: HarvestClient,
    destination: HarvestClient,
    stub: Stub,
    _temp: TempDir,
}

async fn harness() -> Harness {
    let stub = Stub::default();
    let base = spawn_api(stub.clone()).await;

    let temp = TempDir::new().unwrap();
    let store = TokenStore::new(temp.path().join("tokens.json"));
    store
        .update(AccountRole::Source, Some(stored(42, "source-token")))
        .unwrap();
    store
        .update(AccountRole::Destination, Some(stored(43, "revoked")))
        .unwrap();

    let http = HttpClient::new()
        .unwrap()
        .with_retry(RetryConfig::new().with_max_attempts(1));
    let settings = OAuthSettings {
        client_id: "id".into(),
        client_secret: "secret".into(),
        redirect_uri: "http://localhost:3000/oauth/callback".into(),
        scope: "all".into(),
    };
    let credentials = Arc::new(CredentialProvider::new(
        HarvestIdClient::with_base_url(http.clone(), settings, "http://127.0.0.1:9"),
        store,
        Arc::new(NoAuthorizer),
        Arc::new(ScriptedPrompter::new(vec![])),
    ));

    Harness {
        source: HarvestClient::with_base_url(
            AccountRole::Source,
            credentials.clone(),
            http.clone(),
            &base,
        ),
        destination: HarvestClient::with_base_url(
            AccountRole::Destination,
            credentials,
            http,
            &base,
        ),
        stub,
        _temp: temp,
    }
}

fn new_entry(project_id: u64, task_id: u64, notes: &str) -> NewTimeEntry {
    NewTimeEntry {
        user_id: 2,
        project_id,
        task_id,
        spent_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        hours: 2.0,
        notes: Some(notes.to_string()),
    }
}

#[tokio::test]
async fn test_list_users_follows_next_page() {
    let h = harness().await;

    let users = h.source.list_users().await.unwrap();

    let ids: Vec<u64> = users.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![1, 2]);
    let request = |page: u32| {
        format!(
            "GET /users page={} per_page=2000 account=42 auth=Bearer source-token \
             agent=Harvest Time Migration Tool",
            page
        )
    };
    assert_eq!(h.stub.requests(), vec![request(1), request(2)]);
}

#[tokio::test]
async fn test_list_time_entries_filters_by_date_and_user() {
    let h = harness().await;
    let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

    let entries = h.source.list_time_entries(date, Some(1)).await.unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].summary(), "Website (Design): 2h - Homepage");
    assert_eq!(
        h.stub.requests(),
        vec!["GET /time_entries from=2024-03-15 to=2024-03-15 user_id=1"]
    );
}

#[tokio::test]
async fn test_rejected_credentials_are_unauthorized() {
    let h = harness().await;

    let err = h.destination.list_users().await.unwrap_err();

    assert!(matches!(
        err,
        MigrateError::Unauthorized {
            role: AccountRole::Destination,
            ..
        }
    ));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_create_rejects_missing_project_without_posting() {
    let h = harness().await;

    let outcome = h
        .source
        .create_time_entry(&new_entry(99, 23, "Homepage"))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        CreateOutcome::Rejected { ref error } if error.contains("Project 99")
    ));
    assert_eq!(h.stub.requests(), vec!["GET /projects/99"]);
    assert!(h.stub.posted().is_empty());
}

#[tokio::test]
async fn test_create_rejects_unassigned_task_without_posting() {
    let h = harness().await;

    let outcome = h
        .source
        .create_time_entry(&new_entry(2, 24, "Homepage"))
        .await
        .unwrap();

    assert!(matches!(outcome, CreateOutcome::Rejected { ref error } if error.contains("Task 24")));
    assert!(h.stub.posted().is_empty());
}

#[tokio::test]
async fn test_create_posts_validated_entry() {
    let h = harness().await;

    let outcome = h
        .source
        .create_time_entry(&new_entry(2, 23, "Homepage"))
        .await
        .unwrap();

    assert_eq!(outcome, CreateOutcome::Created { id: 555 });
    assert_eq!(
        h.stub.requests(),
        vec![
            "GET /projects/2",
            "GET /projects/2/task_assignments",
            "POST /time_entries"
        ]
    );
    assert_eq!(
        h.stub.posted(),
        vec![json!({
            "user_id": 2,
            "project_id": 2,
            "task_id": 23,
            "spent_date": "2024-03-15",
            "hours": 2.0,
            "notes": "Homepage"
        })]
    );
}

#[tokio::test]
async fn test_create_maps_validation_failure_to_rejected() {
    let h = harness().await;

    let outcome = h
        .source
        .create_time_entry(&new_entry(2, 23, "locked"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CreateOutcome::Rejected {
            error: "Spent date is locked (422 Unprocessable Entity)".into()
        }
    );
}
