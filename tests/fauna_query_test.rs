//! Query-DSL bridge against a mock Fauna endpoint

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use tinabridge::bridge::{FaunaQueryBridge, FaunaQueryConfig};
use tinabridge::error::Error;
use tinabridge::DocumentBridge;
use tokio::net::TcpListener;

/// Secret used by every test; `fnTEST:` in base64
const SECRET: &str = "fnTEST";
const BASIC_AUTH: &str = "Basic Zm5URVNUOg==";

#[derive(Default)]
struct MockFauna {
    /// Canned (status, body) replies, served in order
    replies: Mutex<VecDeque<(StatusCode, Value)>>,
    /// Every (authorization, api version, body) received
    requests: Mutex<Vec<(String, String, Value)>>,
}

async fn handle(
    State(mock): State<Arc<MockFauna>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    mock.requests
        .lock()
        .push((header("authorization"), header("x-faunadb-api-version"), body));

    let (status, reply) = mock
        .replies
        .lock()
        .pop_front()
        .unwrap_or((StatusCode::OK, json!({ "resource": null })));
    (status, Json(reply)).into_response()
}

/// Start a mock endpoint answering with `replies`, in order
async fn start_mock(replies: Vec<(StatusCode, Value)>) -> (DocumentBridge, Arc<MockFauna>) {
    let mock = Arc::new(MockFauna {
        replies: Mutex::new(replies.into()),
        requests: Mutex::new(Vec::new()),
    });

    let app = Router::new().route("/", post(handle)).with_state(mock.clone());
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let config = FaunaQueryConfig::new(SECRET).with_endpoint(format!("http://{}/", addr));
    let bridge = FaunaQueryBridge::new(config).expect("Failed to build bridge");
    (DocumentBridge::new(Box::new(bridge)), mock)
}

#[tokio::test]
async fn test_get_sends_authenticated_query() -> tinabridge::error::Result<()> {
    let (bridge, mock) = start_mock(vec![(StatusCode::OK, json!({ "resource": "# Hello" }))]).await;

    assert_eq!(bridge.get("posts/hello.md").await?, "# Hello");

    let requests = mock.requests.lock();
    assert_eq!(requests.len(), 1);
    let (auth, version, body) = &requests[0];
    assert_eq!(auth, BASIC_AUTH);
    assert_eq!(version, "4");
    assert_eq!(body["if"]["exists"]["terms"], json!("posts/hello.md"));
    Ok(())
}

#[tokio::test]
async fn test_missing_document_is_empty() -> tinabridge::error::Result<()> {
    let (bridge, _) = start_mock(vec![(StatusCode::OK, json!({ "resource": "" }))]).await;
    assert_eq!(bridge.get("posts/missing.md").await?, "");
    Ok(())
}

#[tokio::test]
async fn test_unauthorized_maps_to_auth() {
    let (bridge, _) = start_mock(vec![(
        StatusCode::UNAUTHORIZED,
        json!({ "errors": [{ "code": "unauthorized", "description": "Unauthorized" }] }),
    )])
    .await;

    let err = bridge.get("posts/hello.md").await.unwrap_err();
    assert!(err.is_auth(), "expected auth error, got {err:?}");
}

#[tokio::test]
async fn test_query_errors_map_to_transport() {
    let (bridge, _) = start_mock(vec![(
        StatusCode::BAD_REQUEST,
        json!({ "errors": [{ "code": "invalid ref", "description": "Ref refers to undefined index" }] }),
    )])
    .await;

    match bridge.put("posts/hello.md", "# Hello").await {
        Err(Error::Transport(message)) => {
            assert!(message.contains("invalid ref"));
            assert!(message.contains("undefined index"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_put_sends_upsert() -> tinabridge::error::Result<()> {
    let (bridge, mock) = start_mock(vec![(StatusCode::OK, json!({ "resource": {} }))]).await;

    bridge.put("posts/hello.md", "# Hello").await?;

    let requests = mock.requests.lock();
    let (_, _, body) = &requests[0];
    assert_eq!(
        body["else"]["params"]["object"]["data"]["object"],
        json!({ "filename": "posts/hello.md", "content": "# Hello" })
    );
    Ok(())
}

#[tokio::test]
async fn test_glob_follows_cursor() -> tinabridge::error::Result<()> {
    let (bridge, mock) = start_mock(vec![
        (
            StatusCode::OK,
            json!({ "resource": { "data": ["posts/a.md", "posts/b.md"], "after": [{ "@ref": "next" }] } }),
        ),
        (StatusCode::OK, json!({ "resource": { "data": ["posts/c.md"] } })),
    ])
    .await;

    let paths = bridge.glob("posts/").await?;
    assert_eq!(paths, vec!["posts/a.md", "posts/b.md", "posts/c.md"]);

    let requests = mock.requests.lock();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1].2["collection"]["collection"]["after"],
        json!([{ "@ref": "next" }])
    );
    Ok(())
}

#[tokio::test]
async fn test_delete_of_missing_document_succeeds() -> tinabridge::error::Result<()> {
    let (bridge, _) = start_mock(vec![
        (StatusCode::OK, json!({ "resource": null })),
        (StatusCode::OK, json!({ "resource": null })),
    ])
    .await;

    bridge.delete("posts/gone.md").await?;
    bridge.delete("posts/gone.md").await?;
    Ok(())
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport() {
    let config = FaunaQueryConfig::new(SECRET).with_endpoint("http://127.0.0.1:9/");
    let bridge = FaunaQueryBridge::new(config).expect("bridge");
    let bridge = DocumentBridge::new(Box::new(bridge));

    let err = bridge.get("posts/hello.md").await.unwrap_err();
    assert!(err.is_transport(), "expected transport error, got {err:?}");
}
