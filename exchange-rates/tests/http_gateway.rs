use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use exchange_rates::{
    CacheConfig, CircuitBreaker, CircuitBreakerConfig, CircuitBreakingGateway, CircuitState,
    ExchangeRateService, FailureCause, GatewayConfig, HttpRateGateway, PriceEnricher,
    RateCurrency, RateGateway, RateKey, RateLookupError, build_cache,
};
use httpmock::prelude::*;
use rust_decimal_macros::dec;
use serde_json::json;

const PATH: &str = "/tecajn-eur/v3";

fn gateway(server: &MockServer) -> HttpRateGateway {
    HttpRateGateway::new(GatewayConfig {
        url_template: format!(
            "{}{}?valuta={{currency}}&datum-primjene={{date}}",
            server.base_url(),
            PATH
        ),
        timeout: Duration::from_millis(500),
        connect_timeout: Duration::from_millis(500),
    })
    .unwrap()
}

fn new_year() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn usd_key() -> RateKey {
    RateKey::new(RateCurrency::USD, new_year())
}

#[tokio::test]
async fn test_single_entry_is_parsed() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(PATH)
                .query_param("valuta", "USD")
                .query_param("datum-primjene", "2025-01-01");
            then.status(200).json_body(json!([
                {"broj_tecajnice": "1", "valuta": "USD", "srednji_tecaj": "1,039200"}
            ]));
        })
        .await;

    let rate = gateway(&server).fetch_rate(usd_key()).await.unwrap();

    assert_eq!(rate, dec!(1.0392));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_array_is_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(PATH);
            then.status(200).json_body(json!([]));
        })
        .await;

    let err = gateway(&server).fetch_rate(usd_key()).await.unwrap_err();

    assert!(matches!(err, RateLookupError::Unavailable(_)));
    assert_eq!(
        err.to_string(),
        "Exchange rate not sent for currency USD on date 2025-01-01."
    );
}

#[tokio::test]
async fn test_null_body_is_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(PATH);
            then.status(200).body("null");
        })
        .await;

    let err = gateway(&server).fetch_rate(usd_key()).await.unwrap_err();
    assert!(err.to_string().starts_with("Exchange rate not sent for currency"));
}

#[tokio::test]
async fn test_multiple_entries_are_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(PATH);
            then.status(200).json_body(json!([
                {"srednji_tecaj": "1,039200"},
                {"srednji_tecaj": "1,040100"}
            ]));
        })
        .await;

    let err = gateway(&server).fetch_rate(usd_key()).await.unwrap_err();

    assert!(matches!(err, RateLookupError::Unavailable(_)));
    assert!(
        err.to_string()
            .starts_with("Multiple exchange rates sent for currency")
    );
}

#[tokio::test]
async fn test_error_status_is_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(PATH);
            then.status(500);
        })
        .await;

    let err = gateway(&server).fetch_rate(usd_key()).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed to fetch exchange rate for currency USD on date 2025-01-01. Status code: 500."
    );
}

#[tokio::test]
async fn test_malformed_rate_is_unexpected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(PATH);
            then.status(200)
                .json_body(json!([{"srednji_tecaj": "not_a_number"}]));
        })
        .await;

    let err = gateway(&server).fetch_rate(usd_key()).await.unwrap_err();

    match err {
        RateLookupError::Unexpected { message, cause } => {
            assert!(message.starts_with("Unexpected error happened."));
            assert!(matches!(cause, FailureCause::MalformedPayload(_)));
        }
        other => panic!("expected Unexpected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(PATH);
            then.status(200)
                .delay(Duration::from_secs(2))
                .json_body(json!([{"srednji_tecaj": "1,0"}]));
        })
        .await;

    let err = gateway(&server).fetch_rate(usd_key()).await.unwrap_err();

    match err {
        RateLookupError::Unexpected { cause, .. } => assert!(cause.is_timeout()),
        other => panic!("expected Unexpected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_refused_connection_is_unexpected() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let gateway = HttpRateGateway::new(GatewayConfig {
        url_template: format!(
            "http://127.0.0.1:{port}{PATH}?valuta={{currency}}&datum-primjene={{date}}"
        ),
        timeout: Duration::from_millis(500),
        connect_timeout: Duration::from_millis(500),
    })
    .unwrap();

    let err = gateway.fetch_rate(usd_key()).await.unwrap_err();

    match err {
        RateLookupError::Unexpected { cause, .. } => {
            assert!(matches!(cause, FailureCause::Transport(ref e) if e.is_connect()));
            assert!(!cause.is_timeout());
        }
        other => panic!("expected Unexpected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_service_hits_provider_once_per_key() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path(PATH).query_param("valuta", "USD");
            then.status(200)
                .json_body(json!([{"srednji_tecaj": "1,100000"}]));
        })
        .await;

    let service = Arc::new(ExchangeRateService::new(
        gateway(&server),
        build_cache(&CacheConfig::default()),
    ));

    for _ in 0..3 {
        assert_eq!(service.get_eur_to_usd_rate(new_year()).await, Some(dec!(1.1)));
    }
    assert_eq!(mock.hits_async().await, 1);

    let enricher = PriceEnricher::new(service.clone());
    assert_eq!(
        enricher.usd_price(Some(dec!(100.00)), new_year()).await,
        Some(dec!(110.00))
    );
    assert_eq!(mock.hits_async().await, 1);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path(PATH);
            then.status(200).json_body(json!([]));
        })
        .await;

    let service = ExchangeRateService::new(gateway(&server), build_cache(&CacheConfig::default()));

    assert_eq!(service.get_eur_to_usd_rate(new_year()).await, None);
    assert_eq!(service.get_eur_to_usd_rate(new_year()).await, None);
    assert_eq!(mock.hits_async().await, 2);
    assert!(service.cache().is_empty());
}

#[tokio::test]
async fn test_breaker_stops_calling_failing_provider() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path(PATH);
            then.status(503);
        })
        .await;

    let breaker = Arc::new(CircuitBreaker::new(
        "exchange-rate-api",
        CircuitBreakerConfig::default(),
    ));
    let service = ExchangeRateService::new(
        CircuitBreakingGateway::new(gateway(&server), breaker.clone()),
        build_cache(&CacheConfig::default()),
    );

    for _ in 0..5 {
        assert_eq!(service.get_eur_to_usd_rate(new_year()).await, None);
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    assert_eq!(service.get_eur_to_usd_rate(new_year()).await, None);
    assert_eq!(mock.hits_async().await, 5);
}
