//! TMDB and chat client tests against mocked HTTP endpoints.

use cinesift_core::model::{MediaKind, DIRECTOR_UNAVAILABLE};
use cinesift_core::resilience::{RateLimiter, RetryPolicy};
use cinesift_etl::{CatalogSource, ChatClient, EtlError, TextGenerator, TmdbClient};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tmdb(server: &MockServer) -> TmdbClient {
    TmdbClient::new("test-key", server.uri())
        .unwrap()
        .with_rate_limiter(RateLimiter::unlimited())
        .with_retry(RetryPolicy::none())
}

#[tokio::test]
async fn test_discover_movies_maps_results_and_clamps_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discover/movie"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("year", "2021"))
        .and(query_param("page", "3"))
        .and(query_param("sort_by", "popularity.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 3,
            "total_pages": 812,
            "results": [{
                "id": 550,
                "title": "Fight Club",
                "release_date": "1999-10-15",
                "vote_average": 8.4,
                "vote_count": 27000,
                "poster_path": "/fc.jpg",
                "overview": "An insomniac office worker.",
                "genre_ids": [18],
                "popularity": 61.4,
                "adult": false
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = tmdb(&server).discover_movies(2021, 3).await.unwrap();

    assert_eq!(page.total_pages, 500);
    assert_eq!(page.items.len(), 1);
    let item = &page.items[0];
    assert_eq!(item.kind, MediaKind::Movie);
    assert_eq!(item.title, "Fight Club");
    assert_eq!(item.genre_ids, vec![18]);
}

#[tokio::test]
async fn test_top_rated_tv_reads_series_fields() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tv/top_rated"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_pages": 2,
            "results": [{
                "id": 1396,
                "name": "Breaking Bad",
                "first_air_date": "2008-01-20",
                "vote_average": 8.9,
                "vote_count": 13000,
                "poster_path": null,
                "overview": "A chemistry teacher.",
                "genre_ids": [18, 80],
                "popularity": 310.5
            }]
        })))
        .mount(&server)
        .await;

    let page = tmdb(&server).top_rated_tv(1).await.unwrap();

    assert_eq!(page.total_pages, 2);
    let show = &page.items[0];
    assert_eq!(show.kind, MediaKind::Tv);
    assert_eq!(show.title, "Breaking Bad");
    assert_eq!(show.release_date, "2008-01-20");
    assert!(show.poster_path.is_none());
}

#[tokio::test]
async fn test_genres_build_lookup() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/genre/tv/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "genres": [{"id": 18, "name": "Drama"}, {"id": 80, "name": "Crime"}]
        })))
        .mount(&server)
        .await;

    let genres = tmdb(&server).genres(MediaKind::Tv).await.unwrap();
    assert_eq!(genres.get(&18).map(String::as_str), Some("Drama"));
    assert_eq!(genres.len(), 2);
}

#[tokio::test]
async fn test_credits_keep_top_five_and_find_director() {
    let server = MockServer::start().await;

    let cast: Vec<_> = (1..=8)
        .map(|n| json!({"name": format!("Actor {n}"), "character": format!("Role {n}")}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/movie/550/credits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cast": cast,
            "crew": [
                {"name": "Jim Uhls", "job": "Screenplay"},
                {"name": "David Fincher", "job": "Director"},
                {"name": "Someone Else", "job": "Director"}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tv/1396/credits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cast": [{"name": "Bryan Cranston", "character": "Walter White"}],
            "crew": []
        })))
        .mount(&server)
        .await;

    let client = tmdb(&server);
    let credits = client.credits(MediaKind::Movie, 550).await.unwrap();
    assert_eq!(credits.cast.len(), 5);
    assert_eq!(credits.cast[0].name, "Actor 1");
    assert_eq!(credits.director, "David Fincher");

    let credits = client.credits(MediaKind::Tv, 1396).await.unwrap();
    assert_eq!(credits.cast_line(), "Bryan Cranston as Walter White");
    assert_eq!(credits.director, DIRECTOR_UNAVAILABLE);
}

#[tokio::test]
async fn test_details_read_external_imdb_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tv/1396"))
        .and(query_param("append_to_response", "external_ids"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "popularity": 310.5,
            "adult": false,
            "external_ids": {"imdb_id": "tt0903747"}
        })))
        .mount(&server)
        .await;

    let details = tmdb(&server).details(MediaKind::Tv, 1396).await.unwrap();
    assert_eq!(details.imdb_id.as_deref(), Some("tt0903747"));
    assert_eq!(details.popularity, 310.5);
}

#[tokio::test]
async fn test_missing_item_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/movie/1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"status_code": 34})))
        .mount(&server)
        .await;

    let err = tmdb(&server).details(MediaKind::Movie, 1).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_rate_limited_page_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tv/top_rated"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tv/top_rated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_pages": 1,
            "results": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = tmdb(&server).with_retry(RetryPolicy {
        max_retries: 2,
        min_delay_ms: 1,
        max_delay_ms: 2,
    });
    let page = client.top_rated_tv(1).await.unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn test_chat_client_returns_trimmed_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/llm/v1/chat/completions"))
        .and(header("authorization", "Bearer llm-token"))
        .and(body_partial_json(json!({
            "model": "mistralai/Mistral-7B-Instruct-v0.2",
            "messages": [{"role": "user", "content": "Describe Heat."}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "  {\"summary\": \"s\"}\n"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(
        format!("{}/llm/v1/chat/completions", server.uri()),
        "llm-token",
        "mistralai/Mistral-7B-Instruct-v0.2",
    )
    .unwrap()
    .with_retry(RetryPolicy::none());

    let reply = client.generate("Describe Heat.").await.unwrap();
    assert_eq!(reply, "{\"summary\": \"s\"}");
}

#[tokio::test]
async fn test_chat_client_reports_empty_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let client = ChatClient::new(server.uri(), "t", "m")
        .unwrap()
        .with_retry(RetryPolicy::none());

    let err = client.generate("anything").await.unwrap_err();
    assert!(matches!(err, EtlError::Parse { .. }));
}
