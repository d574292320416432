//! HTTP-level tests for the TMDB client against a mock server.

use std::collections::HashSet;

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use availarr::error::Error;
use availarr::tmdb::{AvailabilitySource, TmdbClient};

fn client(server: &MockServer) -> TmdbClient {
    TmdbClient::with_base_url("tmdb-key".to_string(), server.uri())
}

#[tokio::test]
async fn fetch_providers_parses_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/watch/providers/movie"))
        .and(query_param("api_key", "tmdb-key"))
        .and(query_param("watch_region", "GB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "provider_id": 8, "provider_name": "Netflix", "display_priority": 0 },
                { "provider_id": 337, "provider_name": "Disney Plus", "display_priority": 1 },
            ]
        })))
        .mount(&server)
        .await;

    let providers = client(&server).fetch_providers("GB").await.unwrap();
    assert_eq!(providers.len(), 2);
    assert_eq!(providers[0].id, 8);
    assert_eq!(providers[1].name, "Disney Plus");
}

#[tokio::test]
async fn fetch_providers_tolerates_empty_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/watch/providers/movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&server)
        .await;

    let providers = client(&server).fetch_providers("GB").await.unwrap();
    assert!(providers.is_empty());
}

#[tokio::test]
async fn fetch_availability_extracts_flatrate_for_region() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/603/watch/providers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 603,
            "results": {
                "GB": {
                    "flatrate": [
                        { "provider_id": 8, "provider_name": "Netflix" },
                        { "provider_id": 350, "provider_name": "Apple TV+" },
                    ],
                    "rent": [ { "provider_id": 2, "provider_name": "Apple TV" } ],
                },
                "US": {
                    "flatrate": [ { "provider_id": 15, "provider_name": "Hulu" } ],
                }
            }
        })))
        .mount(&server)
        .await;

    // Only GB flatrate offers; rent/buy and other regions are ignored.
    let ids = client(&server).fetch_availability(603, "GB").await.unwrap();
    assert_eq!(ids, HashSet::from([8, 350]));
}

#[tokio::test]
async fn fetch_availability_missing_region_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/603/watch/providers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 603,
            "results": {
                "US": { "rent": [ { "provider_id": 2, "provider_name": "Apple TV" } ] }
            }
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.fetch_availability(603, "GB").await.unwrap().is_empty());
    // Region present but without a flatrate block is also empty.
    assert!(client.fetch_availability(603, "US").await.unwrap().is_empty());
}

#[tokio::test]
async fn fetch_availability_maps_404_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/999/watch/providers"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = client(&server).fetch_availability(999, "GB").await;
    assert_matches!(result, Err(Error::NotFound(_)));
}

#[tokio::test]
async fn rate_limited_request_retries_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/movie/603/watch/providers"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/603/watch/providers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 603,
            "results": { "GB": { "flatrate": [ { "provider_id": 8, "provider_name": "Netflix" } ] } }
        })))
        .mount(&server)
        .await;

    let ids = client(&server).fetch_availability(603, "GB").await.unwrap();
    assert_eq!(ids, HashSet::from([8]));
}

#[tokio::test]
async fn persistent_rate_limiting_becomes_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/603/watch/providers"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .mount(&server)
        .await;

    let result = client(&server).fetch_availability(603, "GB").await;
    assert_matches!(result, Err(Error::Upstream(_)));
}

#[tokio::test]
async fn malformed_payload_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/watch/providers/movie"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = client(&server).fetch_providers("GB").await;
    assert_matches!(result, Err(Error::Upstream(_)));
}

#[tokio::test]
async fn fetch_regions_parses_region_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/watch/providers/regions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "iso_3166_1": "GB", "english_name": "United Kingdom", "native_name": "United Kingdom" },
                { "iso_3166_1": "US", "english_name": "United States of America", "native_name": "United States" },
            ]
        })))
        .mount(&server)
        .await;

    let regions = client(&server).fetch_regions().await.unwrap();
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0].code, "GB");
}
