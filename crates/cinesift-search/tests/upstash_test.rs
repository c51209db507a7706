//! Upstash Vector client tests against a mocked REST endpoint.

use cinesift_core::resilience::RetryPolicy;
use cinesift_search::{
    QueryRequest, RangeRequest, StoreError, UpsertRecord, UpstashIndex, VectorStore,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry(max_retries: usize) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        min_delay_ms: 1,
        max_delay_ms: 2,
    }
}

fn index(server: &MockServer) -> UpstashIndex {
    UpstashIndex::new(server.uri(), "test-token")
        .unwrap()
        .with_retry(RetryPolicy::none())
}

#[tokio::test]
async fn test_upsert_sends_data_and_metadata() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upsert-data"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({
            "id": "movie:1",
            "data": "{\"title\":\"A\"}",
            "metadata": {"name": "A"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "Success"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut metadata = serde_json::Map::new();
    metadata.insert("name".to_string(), json!("A"));
    let record = UpsertRecord {
        id: "movie:1".to_string(),
        data: "{\"title\":\"A\"}".to_string(),
        metadata,
    };

    index(&server).upsert(record).await.unwrap();
}

#[tokio::test]
async fn test_fetch_returns_one_slot_per_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fetch"))
        .and(body_partial_json(json!({"ids": ["movie:1", "movie:2"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [null, {"id": "movie:2", "metadata": {"name": "B"}}]
        })))
        .mount(&server)
        .await;

    let ids = vec!["movie:1".to_string(), "movie:2".to_string()];
    let records = index(&server).fetch(&ids).await.unwrap();

    assert_eq!(records.len(), 2);
    assert!(records[0].is_none());
    assert_eq!(records[1].as_ref().unwrap().id, "movie:2");
}

#[tokio::test]
async fn test_text_query_hits_query_data() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query-data"))
        .and(body_partial_json(json!({
            "data": "heist movie",
            "topK": 50,
            "includeMetadata": true,
            "includeVectors": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [
                {"id": "movie:1", "score": 0.91, "metadata": {"name": "Heat"}},
                {"id": "movie:2", "score": 0.72}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let matches = index(&server)
        .query(QueryRequest::text("heist movie", 50))
        .await
        .unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, "movie:1");
    assert!(matches[1].metadata.is_none());
}

#[tokio::test]
async fn test_query_with_non_array_result_is_unexpected_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {"oops": 1}})))
        .mount(&server)
        .await;

    let err = index(&server)
        .query(QueryRequest::text("anything", 10))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::UnexpectedShape(_)));
}

#[tokio::test]
async fn test_error_body_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/update"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": "Unauthorized", "status": 401})),
        )
        .mount(&server)
        .await;

    let err = index(&server)
        .update("movie:1", serde_json::Map::new())
        .await
        .unwrap_err();

    match err {
        StoreError::Http { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Unauthorized");
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_update_of_missing_record_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/update"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {"updated": 0}})))
        .mount(&server)
        .await;

    let err = index(&server)
        .update("movie:404", serde_json::Map::new())
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Api(_)));
}

#[tokio::test]
async fn test_range_maps_empty_cursor_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/range"))
        .and(body_partial_json(json!({"cursor": "0", "limit": 100})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "nextCursor": "100",
                "vectors": [{"id": "movie:1", "metadata": {"name": "A"}}]
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/range"))
        .and(body_partial_json(json!({"cursor": "100"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"nextCursor": "", "vectors": []}
        })))
        .mount(&server)
        .await;

    let store = index(&server);
    let first = store.range(RangeRequest::metadata("0", 100)).await.unwrap();
    assert_eq!(first.next_cursor.as_deref(), Some("100"));
    assert_eq!(first.vectors.len(), 1);

    let last = store.range(RangeRequest::metadata("100", 100)).await.unwrap();
    assert!(last.next_cursor.is_none());
    assert!(last.vectors.is_empty());
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upsert-data"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/upsert-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "Success"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = UpstashIndex::new(server.uri(), "test-token")
        .unwrap()
        .with_retry(fast_retry(3));

    let record = UpsertRecord {
        id: "tv:7".to_string(),
        data: "{}".to_string(),
        metadata: serde_json::Map::new(),
    };
    store.upsert(record).await.unwrap();
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query-data"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad filter"))
        .expect(1)
        .mount(&server)
        .await;

    let store = UpstashIndex::new(server.uri(), "test-token")
        .unwrap()
        .with_retry(fast_retry(3));

    let err = store
        .query(QueryRequest::text("x y", 5).with_filter("popularity = "))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Http { status: 400, .. }));
}
