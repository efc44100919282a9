// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::net::IpAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::http::{Request, StatusCode};
use axum::{Extension, Router};
use tower::ServiceExt;

use geoip_server::{AppState, RateLimitConfig, RateLimiter, RemoteAddr};
use geoip_sources::{
    Ip2Location, Ip2LocationConfig, MaxMind, MaxMindConfig, SourceSet, Tor, TorConfig,
};
use geoip_store::{NewIp, Statistics, Store};

const CLIENT: &str = "198.51.100.77";

fn test_sources() -> SourceSet {
    let interval = Duration::from_secs(3600);
    SourceSet {
        maxmind: MaxMind::new(MaxMindConfig {
            license_key: String::new(),
            product_id: "GeoLite2".into(),
            downstream: "download.maxmind.com".into(),
            update_interval: interval,
            retry_interval: interval,
        }),
        ip2location: Ip2Location::new(Ip2LocationConfig {
            token: String::new(),
            product_id: "PX8LITEBIN".into(),
            csv_product_id: "PX8LITECSV".into(),
            downstream: "www.ip2location.com".into(),
            update_interval: interval,
            retry_interval: interval,
        }),
        tor: Tor::new(TorConfig {
            exit_check: "8.8.8.8".into(),
            downstream: "check.torproject.org".into(),
            update_interval: interval,
            retry_interval: interval,
        }),
    }
}

fn test_app(rate_limit: RateLimitConfig) -> (Store, Router) {
    let store = Store::open_in_memory().unwrap();
    let ingestor = geoip_ingest::Ingestor::start(
        geoip_ingest::IngestConfig::default(),
        store.clone(),
        test_sources(),
    );
    let state = AppState {
        store: store.clone(),
        ingestor,
        statistics: Arc::new(RwLock::new(Statistics::default())),
        rate_limiter: Arc::new(RateLimiter::new(rate_limit)),
    };
    let app = geoip_server::router("/", "*", state)
        .layer(Extension(RemoteAddr(CLIENT.parse::<IpAddr>().unwrap())));
    (store, app)
}

fn seeded_ip(address: &str) -> NewIp {
    NewIp {
        address: address.into(),
        is_tor_exit_node: true,
        latitude: 52.52,
        longitude: 13.40,
        ..Default::default()
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<hyper::Body> {
    Request::builder()
        .uri(uri)
        .body(hyper::Body::empty())
        .unwrap()
}

#[tokio::test]
async fn detail_returns_the_stored_record() {
    let (store, app) = test_app(RateLimitConfig::default());
    store.upsert_ip(&seeded_ip("192.0.2.1")).unwrap();

    let response = app.oneshot(get("/api/detail/192.0.2.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["ip"], "192.0.2.1");
    assert_eq!(value["is_tor_exit_node"], true);
    assert_eq!(value["latitude"], 52.52);
}

#[tokio::test]
async fn language_and_useragent_are_pure_header_functions() {
    let (_store, app) = test_app(RateLimitConfig::default());

    let request = Request::builder()
        .uri("/api/language")
        .header("Accept-Language", "fr-CA,en;q=0.8")
        .body(hyper::Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let value = body_json(response).await;
    assert_eq!(value["language"], "fr");
    assert_eq!(value["region"], "CA");

    let request = Request::builder()
        .uri("/api/useragent")
        .header(
            "User-Agent",
            "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
        )
        .body(hyper::Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let value = body_json(response).await;
    assert_eq!(value["bot"], true);
}

#[tokio::test]
async fn statistic_serves_the_snapshot() {
    let (_store, app) = test_app(RateLimitConfig::default());
    let response = app.oneshot(get("/api/statistic")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["ips"], 0);
    assert_eq!(value["countries"], 0);
}

#[tokio::test]
async fn country_metadata_is_always_ok() {
    let (_store, app) = test_app(RateLimitConfig::default());

    let response = app.clone().oneshot(get("/api/country/SE")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["name"]["common"], "Sweden");
    assert_eq!(value["eu_member"], true);

    let response = app.oneshot(get("/api/country/ZZ")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["name"]["common"], "");
}

#[tokio::test]
async fn search_rejects_bad_json() {
    let (_store, app) = test_app(RateLimitConfig::default());
    let request = Request::builder()
        .method("POST")
        .uri("/api/search")
        .body(hyper::Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_pages_and_clamps() {
    let (store, app) = test_app(RateLimitConfig::default());
    for i in 0..12 {
        store.upsert_ip(&seeded_ip(&format!("10.0.0.{i}"))).unwrap();
    }

    let request = Request::builder()
        .method("POST")
        .uri("/api/search?limit=5000&page=1")
        .body(hyper::Body::from("{}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["limit"], 1000);
    assert_eq!(value["total_rows"], 12);
    assert_eq!(value["rows"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn lookups_are_rate_limited_but_helpers_are_not() {
    let (store, app) = test_app(RateLimitConfig {
        limit: 1.0,
        burst: 2,
        expiry: Duration::from_secs(180),
    });
    store.upsert_ip(&seeded_ip("192.0.2.1")).unwrap();

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(get("/api/detail/192.0.2.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app
        .clone()
        .oneshot(get("/api/detail/192.0.2.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // Pure helpers stay reachable for an exhausted visitor.
    let response = app.oneshot(get("/api/language")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn legacy_schema_flattens_the_record() {
    let (store, app) = test_app(RateLimitConfig::default());
    store.upsert_ip(&seeded_ip("192.0.2.1")).unwrap();

    let response = app.oneshot(get("/json/192.0.2.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["network"]["ip"], "192.0.2.1");
    assert_eq!(value["network"]["tor"], true);
    assert_eq!(value["location"]["latitude"], 52.52);
    assert_eq!(value["user"]["language"]["language"], "en");
}
