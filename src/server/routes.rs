//! API routes
//!
//! - `GET /api/price` - subject USD price and cross rate
//! - `GET /api/widget` - widget display model
//! - `GET /api/pools` - dashboard cards for every configured pool
//! - `GET /api/pools/:pool_id` - normalized metrics of one pool

use super::AppState;
use crate::error::{Result, WidgetError};
use crate::normalize::{normalize, price_quote};
use crate::render::{AlertBand, PoolCard, WidgetParams, WidgetView};
use crate::types::{is_valid_pool_id, CrossRatePrice, NormalizedPoolMetrics, PriceQuote, Trend};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// Maps domain errors onto status codes
#[derive(Debug)]
pub struct ApiError(pub WidgetError);

impl From<WidgetError> for ApiError {
    fn from(err: WidgetError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_upstream() {
            warn!("Upstream failure: {}", self.0);
            StatusCode::BAD_GATEWAY
        } else if self.0.is_bad_request() {
            debug!("Rejected request: {}", self.0);
            StatusCode::BAD_REQUEST
        } else {
            error!("Request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/price", get(get_price))
        .route("/api/widget", get(get_widget))
        .route("/api/pools", get(list_pools))
        .route("/api/pools/:pool_id", get(get_pool))
        .fallback(not_found)
        .layer(middleware::map_response(no_store))
        .with_state(state)
}

async fn no_store(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}

async fn fetch_pair_price(state: &AppState) -> Result<CrossRatePrice> {
    let attrs = state.source.fetch_pool(&state.pair_pool_id).await?;
    price_quote(&attrs, &state.target_symbol)
}

/// GET /api/price
async fn get_price(State(state): State<Arc<AppState>>) -> std::result::Result<Json<PriceQuote>, ApiError> {
    debug!("GET /api/price");
    let price = fetch_pair_price(&state).await?;
    Ok(Json(PriceQuote::new(&price, Utc::now())))
}

#[derive(Debug, Deserialize)]
struct WidgetQuery {
    s: Option<String>,
    scale: Option<String>,
}

/// GET /api/widget?s=sm|md|lg&scale=1.2
async fn get_widget(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WidgetQuery>,
) -> std::result::Result<Json<WidgetView>, ApiError> {
    debug!(?query, "GET /api/widget");
    let params = WidgetParams::from_query(query.s.as_deref(), query.scale.as_deref());
    let price = fetch_pair_price(&state).await?;

    let trends = state
        .previous_pair()
        .map(|prev| {
            (
                Trend::between(prev.price.subject_usd, price.subject_usd),
                Trend::between(prev.price.cross_rate, price.cross_rate),
            )
        })
        .unwrap_or((Trend::Flat, Trend::Flat));

    Ok(Json(WidgetView::new(
        &state.pair_label,
        &state.counter_symbol,
        &PriceQuote::new(&price, Utc::now()),
        trends,
        AlertBand::new(state.alert_low, state.alert_high),
        params,
    )))
}

/// GET /api/pools
async fn list_pools(State(state): State<Arc<AppState>>) -> Json<Vec<PoolCard>> {
    debug!(pools = state.pools.len(), "GET /api/pools");

    let mut fetches = JoinSet::new();
    for (idx, pool) in state.pools.iter().enumerate() {
        let source = Arc::clone(&state.source);
        let pool_id = pool.id.clone();
        fetches.spawn(async move {
            let result = source.fetch_pool(&pool_id).await.map(|attrs| normalize(&attrs));
            (idx, result)
        });
    }

    let mut results: Vec<Option<Result<NormalizedPoolMetrics>>> =
        state.pools.iter().map(|_| None).collect();
    while let Some(joined) = fetches.join_next().await {
        match joined {
            Ok((idx, result)) => results[idx] = Some(result),
            Err(e) => warn!("Pool fetch task failed: {}", e),
        }
    }

    let cards = state
        .pools
        .iter()
        .zip(results)
        .map(|(pool, result)| match result {
            Some(Ok(metrics)) => PoolCard::new(pool, &state.network, Some(metrics), false, None),
            Some(Err(e)) => PoolCard::new(pool, &state.network, None, false, Some(e.to_string())),
            None => PoolCard::new(
                pool,
                &state.network,
                None,
                false,
                Some(WidgetError::Internal("fetch aborted".into()).to_string()),
            ),
        })
        .collect();

    Json(cards)
}

/// GET /api/pools/:pool_id
async fn get_pool(
    State(state): State<Arc<AppState>>,
    Path(pool_id): Path<String>,
) -> std::result::Result<Json<NormalizedPoolMetrics>, ApiError> {
    debug!(%pool_id, "GET /api/pools/:pool_id");
    if !is_valid_pool_id(&pool_id) {
        return Err(WidgetError::InvalidPoolId(pool_id).into());
    }
    let attrs = state.source.fetch_pool(&pool_id).await?;
    Ok(Json(normalize(&attrs)))
}
