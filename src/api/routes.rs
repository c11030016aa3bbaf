use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{FromRequest, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::api::latency::{LatencySnapshot, LatencyStats};
use crate::db::MarketplaceStore;
use crate::error::AppError;
use crate::scorer;
use crate::types::{
    BuyerRequest, MarketPriceSample, NewBuyerRequest, NewMarketPrice, Offer, RequestStatus,
    ScoredMatch,
};

#[derive(Clone)]
pub struct ApiState {
    pub store: MarketplaceStore,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/market-match", post(post_market_match))
        .route("/buyer-requests", get(get_buyer_requests).post(post_buyer_request))
        .route("/market-prices", get(get_market_prices).post(post_market_price))
        .route("/stats/summary", get(get_stats_summary))
        .route("/stats/latency", get(get_stats_latency))
        .route("/health", get(get_health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request-body extractor
// ---------------------------------------------------------------------------

/// `axum::Json` answers a malformed body with a plain-text rejection; routing
/// the rejection through [`AppError`] keeps every 4xx on this surface in the
/// `{ "error": ... }` body shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> axum::response::Response {
        let Self(value) = self;
        axum::Json(value).into_response()
    }
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct BuyerRequestsQuery {
    pub crop_type: Option<String>,
    pub county: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct MarketPricesQuery {
    pub crop_type: Option<String>,
    pub county: Option<String>,
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct MatchesResponse {
    pub matches: Vec<ScoredMatch>,
}

#[derive(Serialize)]
pub struct CropDemandResponse {
    pub crop_type: String,
    pub active_requests: i64,
    pub total_quantity_needed: f64,
    pub avg_max_price: Option<f64>,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub active_requests: i64,
    pub requests_24h: i64,
    pub prices_7d: i64,
    pub counties_covered: i64,
    pub top_crops: Vec<CropDemandResponse>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub db_ready: bool,
    pub matches_served: u64,
    pub last_match_at_ns: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// The match pipeline: validate the offer, pull pre-filtered candidates and
/// the recent price window, score, rank. A failed fetch downgrades to an
/// empty input so one unavailable source cannot turn a valid offer into a
/// 500; the response is then an empty (or price-blind) match list.
async fn post_market_match(
    State(state): State<ApiState>,
    Json(offer): Json<Offer>,
) -> Result<Json<MatchesResponse>, AppError> {
    let started = Instant::now();
    scorer::validate(&offer)?;

    let now = Utc::now();

    let candidates = match state.store.find_candidates(&offer.crop_type, offer.quantity).await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(error = %e, "candidate fetch failed, matching against empty set");
            Vec::new()
        }
    };
    let prices = match state.store.recent_prices(&offer.crop_type, &offer.county).await {
        Ok(prices) => prices,
        Err(e) => {
            warn!(error = %e, "price fetch failed, scoring without market average");
            Vec::new()
        }
    };

    let matches = scorer::find_matches(&offer, candidates, &prices, now)?;

    state.latency.record(started.elapsed());
    state.health.record_match();
    info!(
        crop_type = %offer.crop_type,
        county = %offer.county,
        matches = matches.len(),
        "market match served"
    );

    Ok(Json(MatchesResponse { matches }))
}

async fn post_buyer_request(
    State(state): State<ApiState>,
    Json(new): Json<NewBuyerRequest>,
) -> Result<Json<BuyerRequest>, AppError> {
    if new.crop_type.is_empty() {
        return Err(AppError::Validation("crop_type is required".to_string()));
    }
    if !(new.quantity_needed > 0.0) {
        return Err(AppError::Validation(
            "quantity_needed must be a positive number".to_string(),
        ));
    }

    let stored = state.store.insert_request(&new, Utc::now()).await?;
    info!(id = stored.id, crop_type = %stored.crop_type, "buyer request created");
    Ok(Json(stored))
}

async fn get_buyer_requests(
    State(state): State<ApiState>,
    Query(params): Query<BuyerRequestsQuery>,
) -> Result<Json<Vec<BuyerRequest>>, AppError> {
    let limit = params.limit.unwrap_or(50);
    let status = params.status.as_deref().map(RequestStatus::parse);

    let requests = state
        .store
        .list_requests(
            params.crop_type.as_deref(),
            params.county.as_deref(),
            status,
            limit,
        )
        .await?;
    Ok(Json(requests))
}

async fn post_market_price(
    State(state): State<ApiState>,
    Json(new): Json<NewMarketPrice>,
) -> Result<Json<MarketPriceSample>, AppError> {
    if new.crop_type.is_empty() {
        return Err(AppError::Validation("crop_type is required".to_string()));
    }
    if new.county.is_empty() {
        return Err(AppError::Validation("county is required".to_string()));
    }
    if !(new.price_per_kg > 0.0) {
        return Err(AppError::Validation(
            "price_per_kg must be a positive number".to_string(),
        ));
    }

    let stored = state.store.insert_price(&new, Utc::now()).await?;
    Ok(Json(stored))
}

async fn get_market_prices(
    State(state): State<ApiState>,
    Query(params): Query<MarketPricesQuery>,
) -> Result<Json<Vec<MarketPriceSample>>, AppError> {
    let limit = params.limit.unwrap_or(50);
    let prices = state
        .store
        .list_prices(params.crop_type.as_deref(), params.county.as_deref(), limit)
        .await?;
    Ok(Json(prices))
}

async fn get_stats_summary(
    State(state): State<ApiState>,
) -> Result<Json<SummaryResponse>, AppError> {
    let now = Utc::now();

    let active_requests = state.store.count_active_requests().await?;
    let requests_24h = state
        .store
        .count_requests_since(now - TimeDelta::hours(24))
        .await?;
    let prices_7d = state
        .store
        .count_prices_since((now - TimeDelta::days(7)).date_naive())
        .await?;
    let counties_covered = state.store.count_active_counties().await?;

    let top_crops = state
        .store
        .crop_demand(10)
        .await?
        .into_iter()
        .map(|row| CropDemandResponse {
            crop_type: row.crop_type,
            active_requests: row.active_requests,
            total_quantity_needed: row.total_quantity_needed.unwrap_or(0.0),
            avg_max_price: row.avg_max_price,
        })
        .collect();

    Ok(Json(SummaryResponse {
        active_requests,
        requests_24h,
        prices_7d,
        counties_covered,
        top_crops,
        timestamp: now,
    }))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySnapshot> {
    Json(state.latency.snapshot())
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let db_ready = state.store.ping().await.is_ok();
    Json(HealthResponse {
        status: if db_ready { "ok" } else { "degraded" },
        db_ready,
        matches_served: state.health.matches_served(),
        last_match_at_ns: state.health.last_match_at_ns(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Unit;
    use chrono::NaiveDate;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_state() -> ApiState {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
        ApiState {
            store: MarketplaceStore::new(pool),
            health: Arc::new(HealthState::new()),
            latency: Arc::new(LatencyStats::new()),
        }
    }

    fn offer(crop: &str, quantity: f64, county: &str) -> Offer {
        Offer {
            crop_type: crop.to_string(),
            quantity,
            unit: Unit::Kg,
            location: None,
            county: county.to_string(),
            min_price: 50.0,
            max_price: 60.0,
            delivery_date: Some(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()),
            quality_grade: None,
        }
    }

    fn new_request(buyer_id: i64, crop: &str, quantity: f64, county: &str) -> NewBuyerRequest {
        NewBuyerRequest {
            buyer_id,
            crop_type: crop.to_string(),
            quantity_needed: quantity,
            unit: Unit::Kg,
            county: Some(county.to_string()),
            max_price_per_unit: Some(55.0),
            delivery_date: None,
            quality_requirements: None,
            preferred_location: None,
        }
    }

    #[tokio::test]
    async fn market_match_scores_seeded_candidates() {
        let state = test_state().await;
        let buyer = state
            .store
            .insert_profile("Metro Market", Some("+254712345678"), None)
            .await
            .unwrap();
        state
            .store
            .insert_request(&new_request(buyer, "maize", 1000.0, "Nakuru"), Utc::now())
            .await
            .unwrap();
        state
            .store
            .insert_price(
                &NewMarketPrice {
                    crop_type: "maize".to_string(),
                    county: "Nakuru".to_string(),
                    market_name: None,
                    price_per_kg: 55.0,
                    date_recorded: None,
                },
                Utc::now(),
            )
            .await
            .unwrap();

        let Json(response) =
            post_market_match(State(state.clone()), Json(offer("maize", 1000.0, "Nakuru")))
                .await
                .unwrap();

        assert_eq!(response.matches.len(), 1);
        // Locality 30 + price 25 + quantity 20 + recency 10; no candidate
        // delivery date, so that factor stays 0.
        assert_eq!(response.matches[0].match_score, 85);
        assert_eq!(response.matches[0].avg_market_price, 55.0);
        assert_eq!(state.health.matches_served(), 1);
        assert_eq!(state.latency.snapshot().samples, 1);
    }

    #[tokio::test]
    async fn market_match_rejects_incomplete_offer() {
        let state = test_state().await;
        let result = post_market_match(State(state), Json(offer("maize", 1000.0, ""))).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn malformed_offer_body_rejects_as_validation() {
        let body = r#"{"cropType": "maize", "quantity": 1000, "county": "Nakuru", "deliveryDate": "soon"}"#;
        let req = axum::http::Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body))
            .unwrap();

        let Err(err) = Json::<Offer>::from_request(req, &()).await else {
            panic!("non-ISO deliveryDate must be rejected");
        };
        assert!(matches!(&err, AppError::Validation(_)));
        assert_eq!(
            err.into_response().status(),
            axum::http::StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn market_match_with_empty_store_returns_no_matches() {
        let state = test_state().await;
        let Json(response) =
            post_market_match(State(state), Json(offer("maize", 1000.0, "Nakuru")))
                .await
                .unwrap();
        assert!(response.matches.is_empty());
    }

    #[tokio::test]
    async fn market_match_answers_when_fetches_fail() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
        let state = ApiState {
            store: MarketplaceStore::new(pool.clone()),
            health: Arc::new(HealthState::new()),
            latency: Arc::new(LatencyStats::new()),
        };

        // A closed pool fails both the candidate and the price fetch; the
        // offer is still answered with an empty match list, not a 500.
        pool.close().await;
        let Json(response) =
            post_market_match(State(state.clone()), Json(offer("maize", 1000.0, "Nakuru")))
                .await
                .unwrap();
        assert!(response.matches.is_empty());
        assert_eq!(state.health.matches_served(), 1);
    }

    #[tokio::test]
    async fn buyer_request_create_then_list() {
        let state = test_state().await;
        let buyer = state
            .store
            .insert_profile("Fresh Foods Ltd", None, None)
            .await
            .unwrap();

        let Json(created) = post_buyer_request(
            State(state.clone()),
            Json(new_request(buyer, "beans", 400.0, "Kisumu")),
        )
        .await
        .unwrap();
        assert_eq!(created.status, RequestStatus::Active);

        let Json(listed) = get_buyer_requests(
            State(state),
            Query(BuyerRequestsQuery {
                crop_type: Some("beans".to_string()),
                county: None,
                status: Some("active".to_string()),
                limit: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
    }

    #[tokio::test]
    async fn buyer_request_rejects_zero_quantity() {
        let state = test_state().await;
        let result = post_buyer_request(
            State(state),
            Json(new_request(1, "beans", 0.0, "Kisumu")),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn market_price_create_then_list() {
        let state = test_state().await;
        let Json(created) = post_market_price(
            State(state.clone()),
            Json(NewMarketPrice {
                crop_type: "maize".to_string(),
                county: "Nakuru".to_string(),
                market_name: Some("Wakulima Market".to_string()),
                price_per_kg: 54.0,
                date_recorded: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(created.crop_type, "maize");

        let Json(listed) = get_market_prices(
            State(state),
            Query(MarketPricesQuery {
                crop_type: Some("maize".to_string()),
                county: Some("Nakuru".to_string()),
                limit: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
    }

    #[tokio::test]
    async fn stats_summary_counts_marketplace_state() {
        let state = test_state().await;
        let buyer = state.store.insert_profile("Green Grocer", None, None).await.unwrap();
        state
            .store
            .insert_request(&new_request(buyer, "maize", 1000.0, "Nakuru"), Utc::now())
            .await
            .unwrap();
        state
            .store
            .insert_request(&new_request(buyer, "beans", 300.0, "Kisumu"), Utc::now())
            .await
            .unwrap();

        let Json(summary) = get_stats_summary(State(state)).await.unwrap();
        assert_eq!(summary.active_requests, 2);
        assert_eq!(summary.requests_24h, 2);
        assert_eq!(summary.counties_covered, 2);
        assert_eq!(summary.top_crops.len(), 2);
    }

    #[tokio::test]
    async fn health_reports_ready_database() {
        let state = test_state().await;
        let Json(health) = get_health(State(state)).await;
        assert_eq!(health.status, "ok");
        assert!(health.db_ready);
        assert_eq!(health.matches_served, 0);
    }
}
