//! HTTP API tests. Each test drives the router in-process against its own
//! temporary database.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use halodb::auth::TokenGenerator;
use halodb::server::{AppState, REQUEST_ID_HEADER, create_router};
use halodb::store::{SqliteStore, Store};

struct TestApp {
    _dir: TempDir,
    store: Arc<SqliteStore>,
    router: Router,
}

struct Response {
    status: StatusCode,
    body: Value,
    request_id: Option<String>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_rate_limit(0)
    }

    fn with_rate_limit(per_minute: u32) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let store = Arc::new(SqliteStore::new(dir.path().join("halodb.db")).expect("open store"));
        store.initialize().expect("initialize store");

        let state = Arc::new(AppState::new(store.clone(), per_minute));
        Self {
            _dir: dir,
            store,
            router: create_router(state),
        }
    }

    fn admin_token(&self) -> String {
        let (token, raw) = TokenGenerator::new()
            .issue(true, None, None)
            .expect("issue admin token");
        self.store.create_token(&token).expect("store admin token");
        raw
    }

    /// Creates a user named after `uid` and returns a token for them.
    fn user_token(&self, uid: &str) -> String {
        let user = self
            .store
            .create_user(uid, &format!("{uid}@example.org"), uid, "Tester")
            .expect("create user");
        let (token, raw) = TokenGenerator::new()
            .issue(false, Some(user.id), None)
            .expect("issue user token");
        self.store.create_token(&token).expect("store user token");
        raw
    }

    async fn send(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self.router.clone().oneshot(request).await.expect("send request");
        let status = response.status();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Response {
            status,
            body,
            request_id,
        }
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Response {
        self.send(Method::GET, path, token, None).await
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Response {
        self.send(Method::POST, path, token, Some(body)).await
    }

    /// Creates a sample owned by the token's user and returns its id.
    async fn create_sample(&self, token: &str, name: &str) -> i64 {
        let res = self
            .post("/api/v1/sample", Some(token), json!({"name": name}))
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body["data"]["id"].as_i64().expect("sample id")
    }
}

#[tokio::test]
async fn health_check_carries_request_id() {
    let app = TestApp::new();

    let res = app.get("/health", None).await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res.request_id.is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn sequences_are_listed_with_their_steps() {
    let app = TestApp::new();

    let res = app.get("/api/v1/sequences", None).await;
    assert_eq!(res.status, StatusCode::OK);
    let sequences = res.body["data"].as_array().expect("sequence list");
    assert_eq!(sequences.len(), 8);
    assert_eq!(sequences[0]["name"], "METAGENOME");
    assert!(
        sequences[0]["steps"]
            .as_array()
            .expect("steps")
            .contains(&json!("RAW READS"))
    );

    let res = app.get("/api/v1/query/sequence/genome_virus", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["name"], "GENOME VIRUS");

    let res = app.get("/api/v1/query/sequence/unknown", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn range_values_are_classified() {
    let app = TestApp::new();

    let res = app.get("/api/v1/query/salinity/5,5", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["description"], "Moderately halophilic");

    let res = app.get("/api/v1/query/salinity/abc", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.get("/api/v1/query/sequencing", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(!res.body["data"].as_array().expect("rows").is_empty());
}

#[tokio::test]
async fn admin_creates_user_and_token() {
    let app = TestApp::new();
    let admin = app.admin_token();

    let res = app
        .post(
            "/api/v1/admin/users",
            Some(&admin),
            json!({"uid": "ada", "email": "ada@example.org", "name": "Ada", "surname": "Lovelace"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["data"]["uid"], "ada");

    let res = app
        .post(
            "/api/v1/admin/users",
            Some(&admin),
            json!({"uid": "ada", "email": "other@example.org", "name": "A", "surname": "B"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app
        .post("/api/v1/admin/users/ada/tokens", Some(&admin), json!({}))
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    let token = res.body["data"]["token"].as_str().expect("raw token").to_string();
    assert!(token.starts_with("halodb_"));

    let res = app.get("/api/v1/users/me", Some(&token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["email"], "ada@example.org");
}

#[tokio::test]
async fn authentication_is_enforced() {
    let app = TestApp::new();
    let admin = app.admin_token();
    let user = app.user_token("bob");

    let res = app.get("/api/v1/users/me", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.get("/api/v1/users/me", Some("halodb_bogus_token")).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.get("/api/v1/admin/users", Some(&user)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.get("/api/v1/users/me", Some(&admin)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn private_sample_access_follows_sharing() {
    let app = TestApp::new();
    let alice = app.user_token("alice");
    let bob = app.user_token("bob");

    let res = app
        .post("/api/v1/sample", Some(&alice), json!({"name": "lake", "temo": "20,5"}))
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["data"]["access_mode"], "readwrite");
    assert_eq!(res.body["data"]["temo"], json!(20.5));
    let id = res.body["data"]["id"].as_i64().expect("sample id");
    let path = format!("/api/v1/sample/{id}");

    assert_eq!(app.get(&path, None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get(&path, Some(&bob)).await.status, StatusCode::FORBIDDEN);

    let res = app
        .post(
            &format!("{path}/share/user"),
            Some(&alice),
            json!({"user_uuid": "bob", "readwrite": false}),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["users"].as_array().expect("users").len(), 1);

    let res = app.get(&path, Some(&bob)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["access_mode"], "read");

    let res = app
        .send(Method::PATCH, &path, Some(&bob), Some(json!({"name": "pond"})))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .send(Method::PUT, &format!("{path}/share/public"), Some(&bob), None)
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .send(Method::PUT, &format!("{path}/share/public"), Some(&alice), None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["is_public"], true);

    let res = app.get(&path, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["access_mode"], "read");

    let res = app.get("/api/v1/public/sample", None).await;
    assert_eq!(res.body["data"], json!([id]));
}

#[tokio::test]
async fn shared_readwrite_user_can_update() {
    let app = TestApp::new();
    let alice = app.user_token("alice");
    let bob = app.user_token("bob");
    let id = app.create_sample(&alice, "soil").await;
    let path = format!("/api/v1/sample/{id}");

    app.post(
        &format!("{path}/share/user"),
        Some(&alice),
        json!({"user_uuid": "bob", "readwrite": true}),
    )
    .await;

    let res = app
        .send(Method::PATCH, &path, Some(&bob), Some(json!({"name": "clay", "lati": "-3,5"})))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["name"], "clay");
    assert_eq!(res.body["data"]["lati"], json!(-3.5));
    assert_eq!(res.body["data"]["access_mode"], "readwrite");

    let res = app
        .send(Method::DELETE, &format!("{path}/share/user/bob"), Some(&alice), None)
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&path, Some(&bob)).await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn wrong_field_names_are_reported() {
    let app = TestApp::new();
    let alice = app.user_token("alice");

    let res = app
        .post(
            "/api/v1/sample",
            Some(&alice),
            json!({"name": "ok", "Bad-Name": 1, "rreads": "ignored"}),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["fields"], json!(["Bad-Name"]));
}

#[tokio::test]
async fn step_chain_follows_the_sequence() {
    let app = TestApp::new();
    let alice = app.user_token("alice");
    let sample = app.create_sample(&alice, "sea water").await;

    let res = app
        .post(
            "/api/v1/raw_reads",
            Some(&alice),
            json!({"sequence": "METAGENOME", "source_id": sample, "name": "run 1"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["data"]["sequence"], "METAGENOME");
    assert_eq!(res.body["data"]["source_id"], sample);
    let reads = res.body["data"]["id"].as_i64().expect("reads id");

    let res = app
        .post("/api/v1/raw_reads", Some(&alice), json!({"source_id": sample}))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .post(
            "/api/v1/raw_reads",
            Some(&alice),
            json!({"sequence": "NOT A SEQUENCE", "source_id": sample}),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .post(
            "/api/v1/raw_reads",
            Some(&alice),
            json!({"sequence": "METAGENOME", "source_id": 9999}),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app
        .send(Method::DELETE, &format!("/api/v1/sample/{sample}"), Some(&alice), None)
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app
        .send(Method::DELETE, &format!("/api/v1/raw_reads/{reads}"), Some(&alice), None)
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let res = app
        .send(Method::DELETE, &format!("/api/v1/sample/{sample}"), Some(&alice), None)
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn child_step_requires_write_access_on_parent() {
    let app = TestApp::new();
    let alice = app.user_token("alice");
    let bob = app.user_token("bob");
    let sample = app.create_sample(&alice, "reef").await;

    app.post(
        &format!("/api/v1/sample/{sample}/share/user"),
        Some(&alice),
        json!({"user_uuid": "bob", "readwrite": false}),
    )
    .await;

    let res = app
        .post(
            "/api/v1/raw_reads",
            Some(&bob),
            json!({"sequence": "METAGENOME", "source_id": sample}),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn group_sharing_needs_an_accepted_invitation() {
    let app = TestApp::new();
    let alice = app.user_token("alice");
    let bob = app.user_token("bob");
    let sample = app.create_sample(&alice, "hot spring").await;

    let res = app
        .post("/api/v1/groups", Some(&alice), json!({"name": "extremophiles"}))
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["data"]["relation"], "owner");
    let group = res.body["data"]["id"].as_i64().expect("group id");

    let res = app
        .post(
            &format!("/api/v1/groups/{group}/invitations"),
            Some(&alice),
            json!({"user_uuid": "bob"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);

    let res = app
        .post(
            &format!("/api/v1/sample/{sample}/share/group"),
            Some(&alice),
            json!({"group_id": group, "readwrite": false}),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);

    let path = format!("/api/v1/sample/{sample}");
    assert_eq!(app.get(&path, Some(&bob)).await.status, StatusCode::FORBIDDEN);

    let res = app
        .send(
            Method::PUT,
            &format!("/api/v1/groups/{group}/invitation"),
            Some(&bob),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["relation"], "member");

    let res = app.get(&path, Some(&bob)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["access_mode"], "read");

    let res = app.get("/api/v1/user/list/sample", Some(&bob)).await;
    assert_eq!(res.status, StatusCode::OK);
    let rows = res.body["data"].as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["shared_by_group"], true);
    assert_eq!(rows[0]["owned"], false);
    assert_eq!(rows[0]["group_name"], "extremophiles");

    let res = app.get(&format!("/api/v1/groups/{group}/members"), Some(&bob)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"].as_array().expect("members").len(), 2);
}

#[tokio::test]
async fn projects_hold_samples() {
    let app = TestApp::new();
    let alice = app.user_token("alice");

    let res = app
        .post("/api/v1/projects", Some(&alice), json!({"name": "Antarctic survey"}))
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    let project = res.body["data"]["id"].as_i64().expect("project id");

    let res = app
        .post("/api/v1/projects", Some(&alice), json!({"name": "Antarctic survey"}))
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app
        .post(
            "/api/v1/sample",
            Some(&alice),
            json!({"name": "ice core", "project_id": project}),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["data"]["project_id"], project);

    let res = app
        .send(Method::DELETE, &format!("/api/v1/projects/{project}"), Some(&alice), None)
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app.get("/api/v1/projects/own", Some(&alice)).await;
    assert_eq!(res.body["data"].as_array().expect("projects").len(), 1);
}

#[tokio::test]
async fn unknown_steps_are_not_found() {
    let app = TestApp::new();
    let alice = app.user_token("alice");

    let res = app.post("/api/v1/spaceships", Some(&alice), json!({})).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.get("/api/v1/user/list/spaceships", Some(&alice)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn requests_over_the_limit_are_rejected() {
    let app = TestApp::with_rate_limit(2);

    assert_eq!(app.get("/health", None).await.status, StatusCode::OK);
    assert_eq!(app.get("/health", None).await.status, StatusCode::OK);

    let res = app.get("/health", None).await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.body["status"], "error");
}

#[tokio::test]
async fn peptides_are_not_reachable_as_raw_reads() {
    let app = TestApp::new();
    let alice = app.user_token("alice");
    let sample = app.create_sample(&alice, "culture").await;

    let res = app
        .post(
            "/api/v1/peptides",
            Some(&alice),
            json!({"sequence": "PROTEOMICS", "source_id": sample, "name": "digest"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    let peptides = res.body["data"]["id"].as_i64().expect("peptides id");

    let res = app
        .post(
            "/api/v1/raw_reads",
            Some(&alice),
            json!({"sequence": "METAGENOME", "source_id": sample}),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    let reads = res.body["data"]["id"].as_i64().expect("reads id");

    let wrong = format!("/api/v1/raw_reads/{peptides}");
    assert_eq!(app.get(&wrong, Some(&alice)).await.status, StatusCode::NOT_FOUND);
    let res = app
        .send(
            Method::PATCH,
            &wrong,
            Some(&alice),
            Some(json!({"sequence": "PROTEOMICS", "gsiz": 5, "meca": "x"})),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.get(&format!("{wrong}/share"), Some(&alice)).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.send(Method::DELETE, &wrong, Some(&alice), None).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.get(&format!("/api/v1/peptides/{reads}"), Some(&alice)).await.status,
        StatusCode::NOT_FOUND
    );

    let res = app.get(&format!("/api/v1/peptides/{peptides}"), Some(&alice)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["sequence"], "PROTEOMICS");

    let res = app
        .send(
            Method::PATCH,
            &format!("/api/v1/raw_reads/{reads}"),
            Some(&alice),
            Some(json!({"sequence": "PROTEOMICS", "name": "run"})),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.get("/api/v1/user/list/raw_reads", Some(&alice)).await;
    assert_eq!(res.status, StatusCode::OK);
    let rows = res.body["data"].as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], reads);
}

#[tokio::test]
async fn update_drops_fields_excluded_for_the_sequence() {
    let app = TestApp::new();
    let alice = app.user_token("alice");
    let sample = app.create_sample(&alice, "culture").await;

    let res = app
        .post(
            "/api/v1/peptides",
            Some(&alice),
            json!({"sequence": "PROTEOMICS", "source_id": sample, "name": "digest"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    let path = format!("/api/v1/peptides/{}", res.body["data"]["id"]);

    let res = app
        .send(Method::PATCH, &path, Some(&alice), Some(json!({"name": "no sequence"})))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .send(
            Method::PATCH,
            &path,
            Some(&alice),
            Some(json!({
                "sequence": "PROTEOMICS",
                "name": "digest 2",
                "gsiz": 5,
                "meca": "x",
                "seqt": 1
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["name"], "digest 2");

    let res = app.get(&path, Some(&alice)).await;
    let data = &res.body["data"];
    assert_eq!(data["name"], "digest 2");
    assert!(data.get("gsiz").is_none());
    assert!(data.get("meca").is_none());
    assert!(data.get("seqt").is_none());
}

#[tokio::test]
async fn records_are_returned_with_descriptions() {
    let app = TestApp::new();
    let alice = app.user_token("alice");

    let res = app.get("/api/v1/query/sequencing", None).await;
    let first = &res.body["data"][0];
    let seqt = first["id"].as_i64().expect("sequencing id");
    let description = first["description"].clone();

    let res = app
        .post(
            "/api/v1/sample",
            Some(&alice),
            json!({"name": "vent", "seqt": seqt, "temo": "20,5"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    let id = res.body["data"]["id"].as_i64().expect("sample id");

    let res = app.get(&format!("/api/v1/sample/{id}"), Some(&alice)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["seqt"], description);
    assert_eq!(res.body["data"]["temo"], json!(20.5));
    assert_eq!(res.body["data"]["temc"], "Mesophilic");
}

#[tokio::test]
async fn group_lifecycle() {
    let app = TestApp::new();
    let alice = app.user_token("alice");
    let bob = app.user_token("bob");

    let res = app
        .post("/api/v1/groups", Some(&alice), json!({"name": "soil lab"}))
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    let group = res.body["data"]["id"].as_i64().expect("group id");
    let path = format!("/api/v1/groups/{group}");

    let res = app
        .send(Method::PATCH, &path, Some(&alice), Some(json!({"name": "soil ecology"})))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["name"], "soil ecology");

    let invitations = format!("{path}/invitations");
    let res = app.post(&invitations, Some(&alice), json!({"user_uuid": "bob"})).await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);

    let res = app
        .send(Method::DELETE, &format!("{path}/invitation"), Some(&bob), None)
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    let res = app
        .send(Method::PUT, &format!("{path}/invitation"), Some(&bob), None)
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get(&path, Some(&bob)).await.status, StatusCode::FORBIDDEN);

    let res = app.post(&invitations, Some(&alice), json!({"user_uuid": "bob"})).await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    let res = app
        .send(Method::PUT, &format!("{path}/invitation"), Some(&bob), None)
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);

    let res = app.post(&format!("{path}/leave"), Some(&bob), json!({})).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&path, Some(&bob)).await.status, StatusCode::FORBIDDEN);

    let res = app.post(&format!("{path}/leave"), Some(&alice), json!({})).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["message"], "The owner cannot leave the group");

    let res = app.send(Method::DELETE, &path, Some(&alice), None).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&path, Some(&alice)).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn account_deletion_waits_for_owned_records() {
    let app = TestApp::new();
    let alice = app.user_token("alice");
    let sample = app.create_sample(&alice, "moss").await;

    let res = app.send(Method::DELETE, "/api/v1/users/me", Some(&alice), None).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["message"], "User still owns 1 record(s)");

    let res = app
        .send(Method::DELETE, &format!("/api/v1/sample/{sample}"), Some(&alice), None)
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let res = app.send(Method::DELETE, "/api/v1/users/me", Some(&alice), None).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert!(app.store.get_user_by_uid("alice").expect("query user").is_none());
    assert_eq!(
        app.get("/api/v1/users/me", Some(&alice)).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn duplicate_reference_rows_conflict() {
    let app = TestApp::new();
    let admin = app.admin_token();
    let path = "/api/v1/admin/reference/keywords";

    let res = app
        .post(path, Some(&admin), json!({"description": "hydrothermal"}))
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["data"]["description"], "hydrothermal");

    let res = app
        .post(path, Some(&admin), json!({"description": "hydrothermal"}))
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app.get("/api/v1/query/keywords", None).await;
    assert_eq!(res.body["data"].as_array().expect("rows").len(), 1);
}

#[tokio::test]
async fn anonymous_listing_shows_public_rows_as_read_only() {
    let app = TestApp::new();
    let alice = app.user_token("alice");
    let public = app.create_sample(&alice, "beach").await;
    app.create_sample(&alice, "private garden").await;

    let res = app
        .send(
            Method::PUT,
            &format!("/api/v1/sample/{public}/share/public"),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.get("/api/v1/user/list/sample", None).await;
    assert_eq!(res.status, StatusCode::OK);
    let rows = res.body["data"].as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], public);
    assert_eq!(rows[0]["name"], "beach");
    assert_eq!(rows[0]["public"], true);
    assert_eq!(rows[0]["owned"], false);
    assert_eq!(rows[0]["shared_by_group"], false);
    assert_eq!(rows[0]["access_mode"], "read");
}
