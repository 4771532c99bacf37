//! Read-only HTTP API over the dashboard orchestrators.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::core::config::ServerConfig;
use crate::core::exchange::Exchange;
use crate::dashboard::schema::{
    BalanceView, DashboardData, EtfView, FearGreedView, HoldingsView, KoreaStockView, NewsView,
    SectorView, StockDashboardData, StockIndexView, TopVolumeView, UsStockView,
};
use crate::dashboard::{AssemblyError, CryptoDashboard, StockDashboard};

const MAX_LIMIT: usize = 100;

pub struct AppState {
    pub crypto: CryptoDashboard,
    pub stocks: StockDashboard,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Assembly(#[from] AssemblyError),
    #[error("{0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Assembly(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

impl LimitQuery {
    /// Missing means `default`; anything else is clamped to `1..=MAX_LIMIT`.
    fn resolve(&self, default: usize) -> usize {
        self.limit.unwrap_or(default).clamp(1, MAX_LIMIT)
    }
}

fn parse_exchange(raw: &str) -> ApiResult<Exchange> {
    raw.parse()
        .map_err(|e: anyhow::Error| ApiError::BadRequest(e.to_string()))
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Coin Dashboard API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/api/upbit/balance",
            "/api/upbit/holdings",
            "/api/upbit/top-volume",
            "/api/binance/balance",
            "/api/binance/holdings",
            "/api/binance/top-volume",
            "/api/dashboard",
            "/api/fear-greed",
            "/api/stock/kospi",
            "/api/stock/kosdaq",
            "/api/stock/us",
            "/api/stock/etf",
            "/api/stock/indices",
            "/api/stock/sectors",
            "/api/stock/news/{query}",
            "/api/stock/dashboard"
        ]
    }))
}

async fn exchange_balance(
    State(state): State<Arc<AppState>>,
    Path(exchange): Path<String>,
) -> ApiResult<Json<Option<BalanceView>>> {
    let exchange = parse_exchange(&exchange)?;
    Ok(Json(state.crypto.balance(exchange).await))
}

async fn exchange_holdings(
    State(state): State<Arc<AppState>>,
    Path(exchange): Path<String>,
) -> ApiResult<Json<Option<HoldingsView>>> {
    let exchange = parse_exchange(&exchange)?;
    Ok(Json(state.crypto.holdings(exchange).await))
}

async fn exchange_top_volume(
    State(state): State<Arc<AppState>>,
    Path(exchange): Path<String>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Option<TopVolumeView>>> {
    let exchange = parse_exchange(&exchange)?;
    let limit = query.resolve(state.crypto.settings().top_volume_limit);
    Ok(Json(state.crypto.top_volume(exchange, limit).await?))
}

async fn dashboard(State(state): State<Arc<AppState>>) -> ApiResult<Json<DashboardData>> {
    Ok(Json(state.crypto.build().await?))
}

async fn fear_greed(State(state): State<Arc<AppState>>) -> Json<Option<FearGreedView>> {
    Json(state.crypto.fear_greed().await)
}

async fn kospi(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Json<Option<Vec<KoreaStockView>>> {
    let limit = query.resolve(state.stocks.settings().list_limit);
    Json(state.stocks.kospi(limit).await)
}

async fn kosdaq(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Json<Option<Vec<KoreaStockView>>> {
    let limit = query.resolve(state.stocks.settings().list_limit);
    Json(state.stocks.kosdaq(limit).await)
}

async fn us_stocks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Option<Vec<UsStockView>>>> {
    let limit = query.resolve(state.stocks.settings().list_limit);
    Ok(Json(state.stocks.us(limit).await?))
}

async fn etfs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Option<Vec<EtfView>>>> {
    let limit = query.resolve(state.stocks.settings().list_limit);
    Ok(Json(state.stocks.etf(limit).await?))
}

async fn indices(State(state): State<Arc<AppState>>) -> Json<Option<Vec<StockIndexView>>> {
    Json(state.stocks.indices().await)
}

async fn sectors(State(state): State<Arc<AppState>>) -> Json<Option<Vec<SectorView>>> {
    Json(state.stocks.sectors().await)
}

async fn news(
    State(state): State<Arc<AppState>>,
    Path(query): Path<String>,
) -> Json<Option<Vec<NewsView>>> {
    Json(state.stocks.news(&query).await)
}

async fn stock_dashboard(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<StockDashboardData>> {
    Ok(Json(state.stocks.build().await?))
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn app_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let api = Router::new()
        .route("/dashboard", get(dashboard))
        .route("/fear-greed", get(fear_greed))
        .route("/stock/kospi", get(kospi))
        .route("/stock/kosdaq", get(kosdaq))
        .route("/stock/us", get(us_stocks))
        .route("/stock/etf", get(etfs))
        .route("/stock/indices", get(indices))
        .route("/stock/sectors", get(sectors))
        .route("/stock/news/{query}", get(news))
        .route("/stock/dashboard", get(stock_dashboard))
        .route("/{exchange}/balance", get(exchange_balance))
        .route("/{exchange}/holdings", get(exchange_holdings))
        .route("/{exchange}/top-volume", get(exchange_top_volume));

    Router::new()
        .route("/", get(root))
        .nest("/api", api)
        .with_state(state)
        .layer(cors_layer(config))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: Arc<AppState>, config: &ServerConfig, listen_addr: &str) -> anyhow::Result<()> {
    let router = app_router(state, config);
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;
    info!("Serving dashboard API on http://{}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Server error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(LimitQuery { limit: None }.resolve(10), 10);
        assert_eq!(LimitQuery { limit: Some(0) }.resolve(10), 1);
        assert_eq!(LimitQuery { limit: Some(3) }.resolve(10), 3);
        assert_eq!(LimitQuery { limit: Some(5000) }.resolve(10), MAX_LIMIT);
    }

    #[test]
    fn test_unknown_exchange_is_bad_request() {
        let err = parse_exchange("kraken").unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_exchange("UPBIT").unwrap(), Exchange::Upbit);
    }

    #[tokio::test]
    async fn test_assembly_error_is_json_500() {
        let response = ApiError::from(AssemblyError::InvalidRate(0.0)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 500);
        assert_eq!(
            json["message"],
            "Conversion rate 0 is not a positive finite number"
        );
    }
}
