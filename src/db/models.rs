//! Database row types for sqlx typed queries. Enum-valued and joined
//! columns come back as plain TEXT and convert into domain types here.

use chrono::{DateTime, NaiveDate, Utc};

use crate::types::{BuyerProfile, BuyerRequest, MarketPriceSample, RequestStatus, Unit};

#[derive(Debug, sqlx::FromRow)]
pub struct BuyerRequestRow {
    pub id: i64,
    pub buyer_id: i64,
    pub crop_type: String,
    pub quantity_needed: f64,
    pub unit: String,
    pub county: Option<String>,
    pub max_price_per_unit: Option<f64>,
    pub delivery_date: Option<NaiveDate>,
    pub quality_requirements: Option<String>,
    pub preferred_location: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    /// Joined from profiles; NULL when the buyer row is gone.
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub profile_location: Option<String>,
}

impl From<BuyerRequestRow> for BuyerRequest {
    fn from(row: BuyerRequestRow) -> Self {
        let profiles = row.full_name.map(|full_name| BuyerProfile {
            full_name,
            phone_number: row.phone_number,
            location: row.profile_location,
        });
        BuyerRequest {
            id: row.id,
            buyer_id: row.buyer_id,
            crop_type: row.crop_type,
            quantity_needed: row.quantity_needed,
            unit: Unit::parse(&row.unit),
            county: row.county,
            max_price_per_unit: row.max_price_per_unit,
            delivery_date: row.delivery_date,
            quality_requirements: row.quality_requirements,
            preferred_location: row.preferred_location,
            status: RequestStatus::parse(&row.status),
            created_at: row.created_at,
            profiles,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct MarketPriceRow {
    pub id: i64,
    pub crop_type: String,
    pub county: String,
    pub market_name: Option<String>,
    pub price_per_kg: f64,
    pub date_recorded: NaiveDate,
}

impl From<MarketPriceRow> for MarketPriceSample {
    fn from(row: MarketPriceRow) -> Self {
        MarketPriceSample {
            id: row.id,
            crop_type: row.crop_type,
            county: row.county,
            market_name: row.market_name,
            price_per_kg: row.price_per_kg,
            date_recorded: row.date_recorded,
        }
    }
}

/// Per-crop demand aggregate for the stats endpoint.
#[derive(Debug, sqlx::FromRow)]
pub struct CropDemandRow {
    pub crop_type: String,
    pub active_requests: i64,
    pub total_quantity_needed: Option<f64>,
    pub avg_max_price: Option<f64>,
}
