use crate::error::{AppError, Result};

/// Minimum rounded score a candidate must reach to be returned as a match.
/// Scores below this are noise: a candidate can collect 29 points from
/// quantity + recency alone without agreeing on location or price.
pub const MIN_MATCH_SCORE: i64 = 30;

/// Candidate quantity band relative to the offered quantity. Requests outside
/// [offer * LOWER, offer * UPPER] are not worth scoring and are excluded at
/// the query level.
pub const QUANTITY_BAND_LOWER: f64 = 0.5;
pub const QUANTITY_BAND_UPPER: f64 = 2.0;

/// How many of the most recent price samples feed the market average.
pub const PRICE_SAMPLE_LIMIT: i64 = 5;

/// A bid within this fraction below the market average still earns partial
/// price points (0.9 = up to 10% below market).
pub const MARKET_PRICE_TOLERANCE: f64 = 0.9;

/// Expiry sweep interval (seconds).
pub const SWEEP_INTERVAL_SECS: u64 = 600;

/// Active requests older than this many days are expired by the sweeper even
/// without a delivery date.
pub const REQUEST_TTL_DAYS: i64 = 30;

/// Score contribution of each factor. The bucket maxima sum to 100.
pub mod score_points {
    /// Same county as the offer.
    pub const COUNTY_EXACT: f64 = 30.0;
    /// Buyer names any county at all (reachable, county known).
    pub const COUNTY_STATED: f64 = 10.0;
    /// Bid within the buyer's own [min, max] band.
    pub const PRICE_IN_RANGE: f64 = 25.0;
    /// Bid at or above 90% of the recent market average.
    pub const PRICE_NEAR_MARKET: f64 = 15.0;
    /// Quantity alignment ceiling; scaled by min/max ratio.
    pub const QUANTITY_MAX: f64 = 20.0;
    /// Delivery dates within a week of each other.
    pub const DELIVERY_TIGHT: f64 = 15.0;
    /// Delivery dates within a month of each other.
    pub const DELIVERY_LOOSE: f64 = 8.0;
    /// Request posted within the last 3 days.
    pub const RECENCY_FRESH: f64 = 10.0;
    /// Request posted within the last week.
    pub const RECENCY_RECENT: f64 = 5.0;
}

/// Day windows used by the delivery and recency factors.
pub mod day_windows {
    pub const DELIVERY_TIGHT_DAYS: i64 = 7;
    pub const DELIVERY_LOOSE_DAYS: i64 = 30;
    pub const RECENCY_FRESH_DAYS: f64 = 3.0;
    pub const RECENCY_RECENT_DAYS: f64 = 7.0;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Insert demo profiles/requests/prices on first start (SEED_DEMO_DATA)
    pub seed_demo_data: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "bazaar.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            seed_demo_data: std::env::var("SEED_DEMO_DATA")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }
}
