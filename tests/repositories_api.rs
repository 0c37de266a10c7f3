mod support;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use repositories_api::{ServerConfig, UpdateMode};
use serde_json::json;
use support::{TestApp, id_of};

const UNKNOWN_ID: &str = "9b2f6c3e-0d4a-4f7e-9a51-2c8d7e6f1a30";

#[tokio::test]
async fn list_starts_empty() {
    let app = TestApp::new();
    assert!(app.list().await.is_empty());
}

#[tokio::test]
async fn create_returns_record_with_zero_likes() {
    let app = TestApp::new();

    let created = app
        .create("umbriel", "https://github.com/user/umbriel", &["Node", "Express"])
        .await;

    assert_eq!(created["title"], "umbriel");
    assert_eq!(created["url"], "https://github.com/user/umbriel");
    assert_eq!(created["techs"], json!(["Node", "Express"]));
    assert_eq!(created["likes"], 0);
    assert!(uuid::Uuid::parse_str(&id_of(&created)).is_ok());
}

#[tokio::test]
async fn create_rejects_client_supplied_likes() {
    let app = TestApp::new();

    let response = app
        .send(
            Method::POST,
            "/repositories",
            Some(json!({
                "title": "t",
                "url": "https://example.com/t",
                "likes": 10,
            })),
        )
        .await;

    // likes is not part of the create body
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.validation_keys(), vec!["likes"]);
    assert!(app.list().await.is_empty());
}

#[tokio::test]
async fn create_without_techs_omits_the_field() {
    let app = TestApp::new();
    let created = app
        .send(
            Method::POST,
            "/repositories",
            Some(json!({ "title": "bare", "url": "example.com/bare" })),
        )
        .await;

    assert_eq!(created.status, StatusCode::OK);
    let body = created.json();
    assert!(body.get("techs").is_none());
    assert_eq!(body["likes"], 0);
}

#[tokio::test]
async fn list_reflects_created_records_in_order() {
    let app = TestApp::new();
    let a = app.create("a", "https://a.example.com", &[]).await;
    let b = app.create("b", "https://b.example.com", &["Rust"]).await;

    let listed = app.list().await;
    assert_eq!(listed, vec![a, b]);
}

#[tokio::test]
async fn delete_keeps_remaining_order() {
    // Arrange
    let app = TestApp::new();
    let a = app.create("a", "https://a.example.com", &[]).await;
    let b = app.create("b", "https://b.example.com", &[]).await;
    let c = app.create("c", "https://c.example.com", &[]).await;

    // Act
    let response = app
        .send(Method::DELETE, &format!("/repositories/{}", id_of(&b)), None)
        .await;

    // Assert
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert!(response.body.is_empty());
    assert_eq!(app.list().await, vec![a, c]);
}

#[tokio::test]
async fn delete_twice_reports_not_found() {
    let app = TestApp::new();
    let created = app.create("once", "https://once.example.com", &[]).await;
    let uri = format!("/repositories/{}", id_of(&created));

    assert_eq!(app.send(Method::DELETE, &uri, None).await.status, StatusCode::NO_CONTENT);
    let second = app.send(Method::DELETE, &uri, None).await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert!(second.body.is_empty());
}

#[tokio::test]
async fn like_increments_by_one_each_time() {
    let app = TestApp::new();
    let created = app.create("liked", "https://liked.example.com", &[]).await;
    let id = id_of(&created);

    for expected in 1..=3 {
        let response = app.like(&id).await;
        assert_eq!(response.status, StatusCode::OK);
        let body = response.json();
        assert_eq!(body["likes"], expected);
        assert_eq!(body["title"], "liked");
    }

    assert_eq!(app.list().await[0]["likes"], 3);
}

#[tokio::test]
async fn update_keeps_id_and_likes() {
    let app = TestApp::new();
    let created = app.create("old", "https://old.example.com", &["Go"]).await;
    let id = id_of(&created);
    app.like(&id).await;

    let response = app
        .send(
            Method::PUT,
            &format!("/repositories/{id}"),
            Some(json!({
                "title": "new",
                "url": "https://new.example.com",
                "techs": ["Rust"],
                "likes": 99,
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["title"], "new");
    assert_eq!(body["url"], "https://new.example.com");
    assert_eq!(body["techs"], json!(["Rust"]));
    assert_eq!(body["likes"], 1);
    assert_eq!(app.list().await, vec![body]);
}

#[tokio::test]
async fn overwrite_update_clears_omitted_fields() {
    let app = TestApp::with_update_mode(UpdateMode::Overwrite);
    let created = app.create("keep?", "https://keep.example.com", &["Rust"]).await;
    let id = id_of(&created);

    let response = app
        .send(
            Method::PUT,
            &format!("/repositories/{id}"),
            Some(json!({ "title": "only title" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["title"], "only title");
    assert!(body.get("url").is_none());
    assert!(body.get("techs").is_none());
    assert_eq!(body["likes"], 0);
}

#[tokio::test]
async fn merge_update_keeps_omitted_fields() {
    let app = TestApp::with_update_mode(UpdateMode::Merge);
    let created = app.create("keep", "https://keep.example.com", &["Rust"]).await;
    let id = id_of(&created);

    let response = app
        .send(
            Method::PUT,
            &format!("/repositories/{id}"),
            Some(json!({ "techs": ["Rust", "Tokio"] })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["title"], "keep");
    assert_eq!(body["url"], "https://keep.example.com");
    assert_eq!(body["techs"], json!(["Rust", "Tokio"]));
}

#[tokio::test]
async fn unknown_ids_are_bad_requests_with_empty_bodies() {
    let app = TestApp::new();
    let existing = app.create("stay", "https://stay.example.com", &[]).await;

    let update = app
        .send(
            Method::PUT,
            &format!("/repositories/{UNKNOWN_ID}"),
            Some(json!({ "title": "x" })),
        )
        .await;
    let delete = app
        .send(Method::DELETE, &format!("/repositories/{UNKNOWN_ID}"), None)
        .await;
    let like = app.like(UNKNOWN_ID).await;
    let garbage = app.like("not-a-uuid").await;

    for response in [update, delete, like, garbage] {
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.body.is_empty(), "body was {:?}", response.text());
    }
    assert_eq!(app.list().await, vec![existing]);
}

#[tokio::test]
async fn invalid_update_body_wins_over_unknown_id() {
    let app = TestApp::new();

    let response = app
        .send(
            Method::PUT,
            &format!("/repositories/{UNKNOWN_ID}"),
            Some(json!({ "url": "not a url" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.validation_keys(), vec!["url"]);
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let app = TestApp::new();

    let response = app
        .send_raw(Method::POST, "/repositories", "{\"title\": ")
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "Bad Request");
    assert!(app.list().await.is_empty());
}

#[tokio::test]
async fn cors_headers_are_attached_by_default() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::GET)
        .uri("/repositories")
        .header("origin", "http://localhost:3000")
        .body(Body::empty())
        .expect("build request");

    let response = app.send_request(request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response
            .headers
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn cors_can_be_disabled() {
    let app = TestApp::with_config(ServerConfig {
        cors_enabled: false,
        ..ServerConfig::default()
    });
    let request = Request::builder()
        .method(Method::GET)
        .uri("/repositories")
        .header("origin", "http://localhost:3000")
        .body(Body::empty())
        .expect("build request");

    let response = app.send_request(request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.headers.get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn other_spellings_of_an_id_do_not_match() {
    // Arrange
    let app = TestApp::new();
    let created = app.create("exact", "https://exact.example.com", &[]).await;
    let id = id_of(&created);
    let aliases = [
        id.to_uppercase(),
        id.replace('-', ""),
        format!("%7B{id}%7D"),
        format!("urn:uuid:{id}"),
    ];

    for alias in &aliases {
        // Act
        let update = app
            .send(
                Method::PUT,
                &format!("/repositories/{alias}"),
                Some(json!({ "title": "hijacked" })),
            )
            .await;
        let like = app.like(alias).await;
        let delete = app
            .send(Method::DELETE, &format!("/repositories/{alias}"), None)
            .await;

        // Assert
        for response in [update, like, delete] {
            assert_eq!(response.status, StatusCode::BAD_REQUEST, "alias {alias}");
            assert!(response.body.is_empty(), "alias {alias}: {:?}", response.text());
        }
    }
    assert_eq!(app.list().await, vec![created]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mutations_are_not_lost() {
    const LIKES: usize = 64;
    const CREATES: usize = 16;

    let app = std::sync::Arc::new(TestApp::new());
    let target = app.create("hot", "https://hot.example.com", &[]).await;
    let target_id = id_of(&target);
    let doomed = app.create("doomed", "https://doomed.example.com", &[]).await;
    let doomed_id = id_of(&doomed);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..LIKES {
        let app = app.clone();
        let id = target_id.clone();
        tasks.spawn(async move { app.like(&id).await.status });
    }
    for index in 0..CREATES {
        let app = app.clone();
        tasks.spawn(async move {
            app.send(
                Method::POST,
                "/repositories",
                Some(json!({ "title": format!("c{index}"), "url": "https://c.example.com" })),
            )
            .await
            .status
        });
    }
    {
        let app = app.clone();
        let id = doomed_id.clone();
        tasks.spawn(async move {
            app.send(Method::DELETE, &format!("/repositories/{id}"), None)
                .await
                .status
        });
    }

    while let Some(status) = tasks.join_next().await {
        let status = status.expect("task completed");
        assert!(
            status == StatusCode::OK || status == StatusCode::NO_CONTENT,
            "unexpected status {status}"
        );
    }

    let listed = app.list().await;
    assert_eq!(listed.len(), 1 + CREATES);
    assert_eq!(listed[0]["id"], target_id.as_str());
    assert_eq!(listed[0]["likes"], LIKES as u64);
    assert!(listed.iter().all(|repository| id_of(repository) != doomed_id));

    let ids: std::collections::HashSet<_> = listed.iter().map(id_of).collect();
    assert_eq!(ids.len(), listed.len());
}
