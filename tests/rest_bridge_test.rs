//! REST bridge against the development content server

use std::net::SocketAddr;
use std::sync::Arc;
use tinabridge::bridge::{MemoryBridge, RestBridge};
use tinabridge::server::{serve, AppState, ServerConfig};
use tinabridge::{BridgeKind, DocumentBridge};
use tokio::net::TcpListener;

/// Helper to start a content server over an in-memory bridge
async fn start_test_server(token: Option<&str>) -> (SocketAddr, MemoryBridge) {
    let documents = MemoryBridge::with_documents([
        ("content/posts/hello.md", "# Hello"),
        ("content/posts/world.md", "# World"),
        ("content/authors/ada.json", "{\"name\":\"Ada\"}"),
    ]);

    let state = AppState {
        bridge: Arc::new(DocumentBridge::new(Box::new(documents.clone()))),
        config: ServerConfig {
            token: token.map(str::to_string),
            ..ServerConfig::default()
        },
    };

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = serve(listener, state).await;
    });

    (addr, documents)
}

fn rest_bridge(addr: SocketAddr) -> DocumentBridge {
    let rest = RestBridge::new(&format!("http://{}/", addr)).expect("Failed to build bridge");
    DocumentBridge::new(Box::new(rest))
}

#[tokio::test]
async fn test_round_trip() -> tinabridge::error::Result<()> {
    let (addr, documents) = start_test_server(None).await;
    let bridge = rest_bridge(addr);
    assert_eq!(bridge.kind(), BridgeKind::FaunaRest);

    assert_eq!(bridge.get("content/posts/hello.md").await?, "# Hello");

    bridge.put("content/posts/new.md", "# New\n\nwith body").await?;
    assert_eq!(bridge.get("content/posts/new.md").await?, "# New\n\nwith body");
    assert_eq!(documents.len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_missing_document_is_empty() -> tinabridge::error::Result<()> {
    let (addr, _) = start_test_server(None).await;
    let bridge = rest_bridge(addr);

    assert_eq!(bridge.get("content/posts/missing.md").await?, "");
    Ok(())
}

#[tokio::test]
async fn test_glob_matches_prefix() -> tinabridge::error::Result<()> {
    let (addr, _) = start_test_server(None).await;
    let bridge = rest_bridge(addr);

    let mut posts = bridge.glob("content/posts/").await?;
    posts.sort();
    assert_eq!(posts, vec!["content/posts/hello.md", "content/posts/world.md"]);

    assert_eq!(bridge.glob("content/").await?.len(), 3);
    assert!(bridge.glob("nothing/").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_delete_is_idempotent() -> tinabridge::error::Result<()> {
    let (addr, _) = start_test_server(None).await;
    let bridge = rest_bridge(addr);

    bridge.delete("content/posts/hello.md").await?;
    assert_eq!(bridge.get("content/posts/hello.md").await?, "");
    bridge.delete("content/posts/hello.md").await?;
    Ok(())
}

#[tokio::test]
async fn test_wrong_token_is_auth_error() {
    let (addr, _) = start_test_server(Some("s3cret")).await;

    let anonymous = rest_bridge(addr);
    let err = anonymous.get("content/posts/hello.md").await.unwrap_err();
    assert!(err.is_auth(), "expected auth error, got {err:?}");

    let wrong = DocumentBridge::new(Box::new(
        RestBridge::new(&format!("http://{}", addr))
            .expect("bridge")
            .with_token("guess"),
    ));
    assert!(wrong.put("content/posts/x.md", "x").await.unwrap_err().is_auth());
}

#[tokio::test]
async fn test_token_grants_access() -> tinabridge::error::Result<()> {
    let (addr, _) = start_test_server(Some("s3cret")).await;
    let bridge = DocumentBridge::new(Box::new(
        RestBridge::new(&format!("http://{}", addr))?.with_token("s3cret"),
    ));

    assert_eq!(bridge.get("content/posts/world.md").await?, "# World");
    Ok(())
}

#[tokio::test]
async fn test_empty_path_is_rejected_before_sending() {
    let (addr, _) = start_test_server(None).await;
    let bridge = rest_bridge(addr);

    let err = bridge.put("", "x").await.unwrap_err();
    assert!(matches!(err, tinabridge::error::Error::InvalidArgument(_)));
}

#[tokio::test]
async fn test_health_is_public() {
    let (addr, _) = start_test_server(Some("s3cret")).await;

    let response = reqwest::get(format!("http://{}/_health", addr))
        .await
        .expect("health request");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("health body");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn test_metrics_count_bridge_operations() -> tinabridge::error::Result<()> {
    let (addr, _) = start_test_server(None).await;
    let bridge = rest_bridge(addr);
    bridge.get("content/posts/hello.md").await?;

    let text = reqwest::get(format!("http://{}/_metrics", addr))
        .await?
        .text()
        .await?;
    assert!(text.contains("tinabridge_operations_total"));
    Ok(())
}
