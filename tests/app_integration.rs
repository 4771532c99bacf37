use axum::body::Body;
use axum::http::{Request, StatusCode};
use coinboard::core::config::AppConfig;
use serde_json::Value;
use std::fs;
use std::sync::Arc;
use tower::ServiceExt;
use tracing::info;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount(server: &MockServer, url_path: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(url_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    /// Public market endpoints only; private account endpoints are left
    /// unmounted so a stray signed request would surface as a 404.
    pub async fn create_market_mock_server() -> MockServer {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/ticker"))
            .and(query_param("markets", "KRW-USDT"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"[{"market": "KRW-USDT", "trade_price": 1400.0}]"#),
            )
            .mount(&server)
            .await;

        mount(
            &server,
            "/v1/ticker/all",
            r#"[
                {"market": "KRW-BTC", "trade_price": 95000000, "prev_closing_price": 94000000,
                 "acc_trade_price_24h": 300000000000, "acc_trade_volume_24h": 3200},
                {"market": "KRW-XRP", "trade_price": 800, "prev_closing_price": 820,
                 "acc_trade_price_24h": 450000000000, "acc_trade_volume_24h": 560000000},
                {"market": "KRW-ETH", "trade_price": 5000000, "prev_closing_price": 5000000,
                 "acc_trade_price_24h": 120000000000, "acc_trade_volume_24h": 24000}
            ]"#,
        )
        .await;

        mount(
            &server,
            "/v1/market/all",
            r#"[
                {"market": "KRW-BTC", "korean_name": "비트코인", "english_name": "Bitcoin"},
                {"market": "KRW-XRP", "korean_name": "리플", "english_name": "XRP"}
            ]"#,
        )
        .await;

        mount(
            &server,
            "/api/v3/ticker/24hr",
            r#"[
                {"symbol": "BTCUSDT", "lastPrice": "68000.00", "priceChangePercent": "1.50",
                 "volume": "20000", "quoteVolume": "1360000000"},
                {"symbol": "ETHBTC", "lastPrice": "0.05", "priceChangePercent": "0.10",
                 "volume": "1000", "quoteVolume": "50"},
                {"symbol": "ETHUSDT", "lastPrice": "3500.00", "priceChangePercent": "-2.00",
                 "volume": "200000", "quoteVolume": "700000000"}
            ]"#,
        )
        .await;

        mount(
            &server,
            "/fng/",
            r#"{"data": [{"value": "64", "value_classification": "Greed", "timestamp": "1718064000"}]}"#,
        )
        .await;

        mount(
            &server,
            "/v8/finance/chart/USDKRW=X",
            r#"{"chart": {"result": [{"meta": {"regularMarketPrice": 1380.0}}]}}"#,
        )
        .await;

        mount(
            &server,
            "/rss/search",
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <rss version="2.0"><channel>
              <item>
                <title>코스피 2,600선 회복</title>
                <link>https://news.example/kospi</link>
                <pubDate>Mon, 10 Jun 2024 01:00:00 GMT</pubDate>
                <source url="https://news.example">연합뉴스</source>
              </item>
            </channel></rss>"#,
        )
        .await;

        server
    }

    pub fn config_yaml(base_url: &str) -> String {
        format!(
            r#"
            providers:
              upbit:
                base_url: {base_url}
              binance:
                base_url: {base_url}
              yahoo:
                base_url: {base_url}
              fear_greed:
                base_url: {base_url}
              news:
                base_url: {base_url}
            dashboard:
              top_volume_limit: 2
              whale_alert_limit: 3
            stocks:
              kospi:
                - symbol: "005930.KS"
                  name: "삼성전자"
            server:
              cors_origins: ["*"]
            "#
        )
    }
}

/// Config pointing every adapter at `base_url`, with no exchange keys.
fn mock_config(base_url: &str) -> AppConfig {
    serde_yaml::from_str(&test_utils::config_yaml(base_url)).expect("valid test config")
}

async fn get_json(router: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn router_for(config: &AppConfig) -> axum::Router {
    let state = coinboard::build_state(config).expect("state");
    coinboard::server::app_router(Arc::new(state), &config.server)
}

#[test_log::test(tokio::test)]
async fn test_dashboard_endpoint_without_credentials() {
    let server = test_utils::create_market_mock_server().await;
    let config = mock_config(&server.uri());

    let (status, json) = get_json(router_for(&config), "/api/dashboard").await;
    info!(%json, "Dashboard response");
    assert_eq!(status, StatusCode::OK);

    // Private sections are null without keys, public ones are filled
    assert!(json["upbit_balance"].is_null());
    assert!(json["upbit_holdings"].is_null());
    assert!(json["binance_balance"].is_null());
    assert!(json["binance_holdings"].is_null());

    let upbit_top = json["upbit_top_volume"].as_array().unwrap();
    assert_eq!(upbit_top.len(), 2);
    assert_eq!(upbit_top[0]["market"], "KRW-XRP");
    assert_eq!(upbit_top[0]["korean_name"], "리플");
    assert_eq!(upbit_top[1]["english_name"], "Bitcoin");

    let binance_top = json["binance_top_volume"].as_array().unwrap();
    assert_eq!(binance_top.len(), 2);
    assert_eq!(binance_top[0]["symbol"], "BTCUSDT");
    assert_eq!(binance_top[0]["current_price_krw"], 68000.0 * 1400.0);
    assert_eq!(binance_top[1]["quote_volume_krw"], 700_000_000.0 * 1400.0);

    assert_eq!(json["usdt_krw_rate"]["value"], 1400.0);
    assert_eq!(json["usdt_krw_rate"]["source"], "live");
    assert_eq!(json["fear_greed"]["value"], 64);
    assert_eq!(json["whale_alerts"].as_array().unwrap().len(), 3);
    assert!(json["last_updated"].is_string());
}

#[test_log::test(tokio::test)]
async fn test_dashboard_survives_dead_upstreams() {
    // Nothing mounted: every upstream answers 404
    let server = wiremock::MockServer::start().await;
    let config = mock_config(&server.uri());

    let (status, json) = get_json(router_for(&config), "/api/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["upbit_top_volume"].is_null());
    assert!(json["binance_top_volume"].is_null());
    assert!(json["fear_greed"].is_null());
    assert_eq!(json["usdt_krw_rate"]["value"], 1450.0);
    assert_eq!(json["usdt_krw_rate"]["source"], "fallback");
}

#[test_log::test(tokio::test)]
async fn test_single_endpoints() {
    let server = test_utils::create_market_mock_server().await;
    let config = mock_config(&server.uri());
    let router = router_for(&config);

    let (status, json) = get_json(router.clone(), "/api/upbit/top-volume?limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (status, json) = get_json(router.clone(), "/api/binance/balance").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.is_null());

    let (status, json) = get_json(router.clone(), "/api/kraken/balance").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 400);
    assert_eq!(json["message"], "Unknown exchange: kraken");

    let (status, json) = get_json(router.clone(), "/api/fear-greed").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value_classification"], "Greed");

    let (status, json) = get_json(router.clone(), "/api/stock/news/%EC%BD%94%EC%8A%A4%ED%94%BC").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["title"], "코스피 2,600선 회복");
    assert_eq!(json[0]["source"], "연합뉴스");

    // No chart mock for the KOSPI universe: every symbol fails
    let (status, json) = get_json(router.clone(), "/api/stock/kospi").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.is_null());

    let (status, json) = get_json(router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Coin Dashboard API");
}

#[test_log::test(tokio::test)]
async fn test_stock_dashboard_uses_live_usd_rate() {
    let server = test_utils::create_market_mock_server().await;
    let config = mock_config(&server.uri());

    let (status, json) = get_json(router_for(&config), "/api/stock/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["usd_krw_rate"]["value"], 1380.0);
    assert_eq!(json["usd_krw_rate"]["source"], "live");
    assert!(json["kospi_top"].is_null());
    assert_eq!(json["news"].as_array().unwrap().len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let server = test_utils::create_market_mock_server().await;

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_path = config_file.path();
    fs::write(config_path, test_utils::config_yaml(&server.uri()))
        .expect("Failed to write config file");

    let path = config_path.to_str().unwrap();
    for command in [
        coinboard::AppCommand::Dashboard { json: true },
        coinboard::AppCommand::Stocks { json: false },
        coinboard::AppCommand::TopVolume {
            exchange: coinboard::core::exchange::Exchange::Binance,
            limit: Some(1),
            json: false,
        },
        coinboard::AppCommand::News {
            query: "코스피".to_string(),
            json: false,
        },
    ] {
        let result = coinboard::run_command(command.clone(), Some(path)).await;
        assert!(
            result.is_ok(),
            "{command:?} failed with: {:?}",
            result.err()
        );
    }
}

#[test_log::test(tokio::test)]
async fn test_missing_config_file_is_an_error() {
    let result = coinboard::run_command(
        coinboard::AppCommand::Dashboard { json: true },
        Some("/nonexistent/coinboard/config.yaml"),
    )
    .await;
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Failed to read config file"));
}
