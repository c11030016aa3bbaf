use chrono::{DateTime, NaiveDate, Utc};

use crate::config::{day_windows, score_points, MARKET_PRICE_TOLERANCE, MIN_MATCH_SCORE};
use crate::error::{AppError, Result};
use crate::types::{BuyerRequest, MarketPriceSample, Offer, ScoredMatch};

/// Scores pre-filtered buyer requests against a seller offer and returns the
/// ranked matches. Pure over its inputs: the clock enters as `now`, so a call
/// is reproducible and safe to run concurrently with any other.
///
/// Candidates arrive already filtered on crop type, active status, and the
/// quantity band; no crop or status check is repeated here.
pub fn find_matches(
    offer: &Offer,
    candidates: Vec<BuyerRequest>,
    market_prices: &[MarketPriceSample],
    now: DateTime<Utc>,
) -> Result<Vec<ScoredMatch>> {
    validate(offer)?;

    let avg_market_price = average_price(market_prices);

    let mut matches: Vec<ScoredMatch> = candidates
        .into_iter()
        .map(|request| {
            let score = score_candidate(offer, &request, avg_market_price, now);
            ScoredMatch {
                request,
                match_score: score.round() as i64,
                avg_market_price,
            }
        })
        .filter(|m| m.match_score >= MIN_MATCH_SCORE)
        .collect();

    // Stable sort: tied scores keep the order the store supplied (newest
    // request first, per the candidate query).
    matches.sort_by(|a, b| b.match_score.cmp(&a.match_score));

    Ok(matches)
}

/// Required-field check on the offer. Field names in the messages match the
/// wire form so the error is actionable client-side.
pub fn validate(offer: &Offer) -> Result<()> {
    if offer.crop_type.is_empty() {
        return Err(AppError::Validation("cropType is required".to_string()));
    }
    if !(offer.quantity > 0.0) {
        return Err(AppError::Validation(
            "quantity must be a positive number".to_string(),
        ));
    }
    if offer.county.is_empty() {
        return Err(AppError::Validation("county is required".to_string()));
    }
    Ok(())
}

/// Raw (unrounded) score for one candidate: the sum of the five factors.
/// Bucket maxima add up to 100, so no clamp is applied.
fn score_candidate(
    offer: &Offer,
    request: &BuyerRequest,
    avg_market_price: f64,
    now: DateTime<Utc>,
) -> f64 {
    locality_points(request.county.as_deref(), &offer.county)
        + price_points(request.max_price_per_unit, offer, avg_market_price)
        + quantity_points(request.quantity_needed, offer.quantity)
        + delivery_points(request.delivery_date, offer.delivery_date)
        + recency_points(request.created_at, now)
}

/// Mean of the recent samples, 0 when the window is empty.
pub fn average_price(samples: &[MarketPriceSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s.price_per_kg).sum::<f64>() / samples.len() as f64
}

/// Same county as the offer earns the full bucket; any other stated county
/// earns a reachability consolation; an unstated county earns nothing.
fn locality_points(request_county: Option<&str>, offer_county: &str) -> f64 {
    match request_county {
        Some(county) if county == offer_county => score_points::COUNTY_EXACT,
        Some(county) if !county.is_empty() => score_points::COUNTY_STATED,
        _ => 0.0,
    }
}

/// First match wins: a bid inside the seller's band takes the full bucket,
/// otherwise a bid holding at least 90% of the recent market average takes
/// the partial one. An inverted band (min > max) just makes the first branch
/// unsatisfiable. A missing bid contributes nothing.
fn price_points(bid: Option<f64>, offer: &Offer, avg_market_price: f64) -> f64 {
    let Some(bid) = bid else {
        return 0.0;
    };
    if bid >= offer.min_price && bid <= offer.max_price {
        score_points::PRICE_IN_RANGE
    } else if bid >= avg_market_price * MARKET_PRICE_TOLERANCE {
        score_points::PRICE_NEAR_MARKET
    } else {
        0.0
    }
}

/// Continuous alignment: min/max ratio of the two quantities scaled into the
/// bucket. Equal quantities score the full 20. Zero-for-zero carries no
/// signal and scores 0 rather than dividing by zero.
fn quantity_points(quantity_needed: f64, quantity_offered: f64) -> f64 {
    let larger = quantity_needed.max(quantity_offered);
    if larger <= 0.0 {
        return 0.0;
    }
    quantity_needed.min(quantity_offered) / larger * score_points::QUANTITY_MAX
}

/// Only scored when both sides name a delivery date.
fn delivery_points(request_date: Option<NaiveDate>, offer_date: Option<NaiveDate>) -> f64 {
    let (Some(theirs), Some(ours)) = (request_date, offer_date) else {
        return 0.0;
    };
    let diff_days = (theirs - ours).num_days().abs();
    if diff_days <= day_windows::DELIVERY_TIGHT_DAYS {
        score_points::DELIVERY_TIGHT
    } else if diff_days <= day_windows::DELIVERY_LOOSE_DAYS {
        score_points::DELIVERY_LOOSE
    } else {
        0.0
    }
}

/// Age is fractional days, so a request 3.2 days old has already left the
/// fresh bucket.
fn recency_points(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days_since = (now - created_at).num_milliseconds() as f64 / 86_400_000.0;
    if days_since <= day_windows::RECENCY_FRESH_DAYS {
        score_points::RECENCY_FRESH
    } else if days_since <= day_windows::RECENCY_RECENT_DAYS {
        score_points::RECENCY_RECENT
    } else {
        0.0
    }
}
