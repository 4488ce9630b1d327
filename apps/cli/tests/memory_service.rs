//! A-mem service client and the smoke test against a mocked service

use amem_setup_lib::config::BackendChoice;
use amem_setup_lib::memory::samples::SAMPLE_NOTES;
use amem_setup_lib::memory::{
    AmemServiceClient, AmemServiceConnector, MemoryConnector, MemoryOptions, MemorySystem,
    SmokeMode, SmokeTester,
};
use amem_setup_lib::{Reporter, SetupError};

use mockito::{Matcher, Server};
use serde_json::json;

fn options() -> MemoryOptions {
    MemoryOptions {
        embedding_model: "all-MiniLM-L6-v2".to_string(),
        backend: BackendChoice::ollama("llama3.2"),
    }
}

async fn healthy(server: &mut Server) -> mockito::Mock {
    server
        .mock("GET", "/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"service":"amem","status":"healthy","version":"0.3.1","features":[]}"#)
        .create_async()
        .await
}

#[tokio::test]
async fn add_note_sends_backend_and_returns_id() {
    let mut server = Server::new_async().await;
    let add = server
        .mock("POST", "/amem/add")
        .match_body(Matcher::PartialJson(json!({
            "content": "hello",
            "tags": ["a", "b"],
            "embedding_model": "all-MiniLM-L6-v2",
            "llm_backend": "ollama",
            "llm_model": "llama3.2",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"memory_id":"0b7f6c1e-2f7a-4c0e-9d55-000000000001","message":"stored"}"#)
        .create_async()
        .await;

    let client = AmemServiceClient::new(server.url(), options()).expect("client");
    let id = client.add_note("hello", &["a".to_string(), "b".to_string()]).await.expect("add");

    add.assert_async().await;
    assert_eq!(id, "0b7f6c1e-2f7a-4c0e-9d55-000000000001");
}

#[tokio::test]
async fn search_passes_query_and_k() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/amem/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "architecture decisions".into()),
            Matcher::UrlEncoded("k".into(), "2".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "query": "architecture decisions",
                "count": 1,
                "memories": [{ "id": "m1", "content": "Decided to integrate A-mem" }],
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = AmemServiceClient::new(server.url(), options()).expect("client");
    let results = client.search_agentic("architecture decisions", 2).await.expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "m1");
}

#[tokio::test]
async fn read_maps_404_to_not_found() {
    let mut server = Server::new_async().await;
    server.mock("GET", "/amem/memory/missing").with_status(404).create_async().await;

    let client = AmemServiceClient::new(server.url(), options()).expect("client");
    let err = client.read("missing").await.expect_err("not found");

    assert!(matches!(err, SetupError::NoteNotFound(ref id) if id == "missing"));
}

#[tokio::test]
async fn read_escapes_the_note_id() {
    let mut server = Server::new_async().await;
    let read = server
        .mock("GET", "/amem/memory/a%2Fb%3Fc")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"a/b?c","content":"odd id"}"#)
        .create_async()
        .await;

    let client = AmemServiceClient::new(server.url(), options()).expect("client");
    let note = client.read("a/b?c").await.expect("read");

    read.assert_async().await;
    assert_eq!(note.id, "a/b?c");
}

#[tokio::test]
async fn closed_port_keeps_the_connection_error_as_cause() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let endpoint = format!("http://{}", listener.local_addr().expect("addr"));
    drop(listener);

    let err = match AmemServiceConnector::new(endpoint.clone()).connect(&options()).await {
        Ok(_) => panic!("nothing is listening"),
        Err(err) => err,
    };

    assert!(matches!(err, SetupError::ServiceUnavailable { .. }));
    assert!(err.is_fatal());
    assert!(err.chain().to_lowercase().contains("refused"), "{}", err.chain());

    let mut reporter = Reporter::quiet();
    reporter.fail(format!("Failed to initialize: {}", err));
    reporter.trace(&err);
    let lines = reporter.lines();
    assert_eq!(lines.iter().filter(|line| line.contains("is not available")).count(), 1);
    assert!(lines.iter().any(|line| line.to_lowercase().contains("refused")));
}

#[tokio::test]
async fn unhealthy_service_fails_initialization() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"service":"amem","status":"degraded"}"#)
        .create_async()
        .await;

    let err = match AmemServiceConnector::new(server.url()).connect(&options()).await {
        Ok(_) => panic!("degraded service must not connect"),
        Err(err) => err,
    };

    assert!(matches!(err, SetupError::MemoryInitError(_)));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn full_smoke_test_reports_every_insert() {
    let mut server = Server::new_async().await;
    healthy(&mut server).await;

    for (index, note) in SAMPLE_NOTES.iter().enumerate() {
        server
            .mock("POST", "/amem/add")
            .match_body(Matcher::PartialJson(json!({ "content": note.content })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "memory_id": format!("id-{}", index + 1), "message": "ok" }).to_string())
            .create_async()
            .await;
    }

    server
        .mock("GET", "/amem/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"query":"q","count":0,"memories":[]}"#)
        .expect(3)
        .create_async()
        .await;

    server
        .mock("GET", "/amem/memory/id-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "id-1",
                "content": SAMPLE_NOTES[0].content,
                "keywords": ["A-mem", "Memory Layer"],
                "tags": ["decision", "architecture"],
                "links": [],
            })
            .to_string(),
        )
        .create_async()
        .await;

    let connector = AmemServiceConnector::new(server.url());
    let mut reporter = Reporter::quiet();
    let summary = SmokeTester::new(&connector, options(), SmokeMode::Full)
        .run(&mut reporter)
        .await
        .expect("smoke test runs");

    assert_eq!(summary.inserted_ids, ["id-1", "id-2", "id-3", "id-4"]);
    assert!(summary.is_clean());
    assert_eq!(reporter.exit_code(), 0);
    for n in 1..=4 {
        let expected = format!("Memory {n} added: id-{n}...");
        assert!(
            reporter.lines().iter().any(|line| line.ends_with(&expected)),
            "missing line {expected:?}"
        );
    }
    assert!(reporter.lines().iter().any(|line| line.contains("Links: 0 connections")));
}

#[tokio::test]
async fn quick_smoke_test_uses_one_note() {
    let mut server = Server::new_async().await;
    healthy(&mut server).await;
    let add = server
        .mock("POST", "/amem/add")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"memory_id":"quick-1","message":"ok"}"#)
        .expect(1)
        .create_async()
        .await;
    let search = server
        .mock("GET", "/amem/search")
        .match_query(Matcher::UrlEncoded("k".into(), "1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"query":"test","count":1,"memories":[{"id":"quick-1","content":"A-mem test"}]}"#)
        .create_async()
        .await;

    let connector = AmemServiceConnector::new(server.url());
    let mut reporter = Reporter::quiet();
    let summary = SmokeTester::new(&connector, options(), SmokeMode::Quick)
        .run(&mut reporter)
        .await
        .expect("quick run");

    add.assert_async().await;
    search.assert_async().await;
    assert_eq!(summary.inserted_ids, ["quick-1"]);
    assert_eq!(summary.read_ok, None);
}
