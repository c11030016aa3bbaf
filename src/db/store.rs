use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use sqlx::SqlitePool;

use crate::config::{
    PRICE_SAMPLE_LIMIT, QUANTITY_BAND_LOWER, QUANTITY_BAND_UPPER, REQUEST_TTL_DAYS,
};
use crate::db::models::{BuyerRequestRow, CropDemandRow, MarketPriceRow};
use crate::error::Result;
use crate::types::{BuyerRequest, MarketPriceSample, NewBuyerRequest, NewMarketPrice, RequestStatus};

/// SQLite-backed marketplace state: buyer demand, price samples, and the
/// request status lifecycle. Clones share the underlying pool.
#[derive(Clone)]
pub struct MarketplaceStore {
    pool: SqlitePool,
}

impl MarketplaceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Liveness check for the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// The scorer's candidate pre-filter: same crop, still active, quantity
    /// within 0.5x-2x of the offer, newest first. Crop and status never get
    /// re-checked downstream, so this query is the gate.
    pub async fn find_candidates(&self, crop_type: &str, quantity: f64) -> Result<Vec<BuyerRequest>> {
        let min_quantity = quantity * QUANTITY_BAND_LOWER;
        let max_quantity = quantity * QUANTITY_BAND_UPPER;

        let rows: Vec<BuyerRequestRow> = sqlx::query_as(
            r#"
            SELECT r.id, r.buyer_id, r.crop_type, r.quantity_needed, r.unit, r.county,
                   r.max_price_per_unit, r.delivery_date, r.quality_requirements,
                   r.preferred_location, r.status, r.created_at,
                   p.full_name, p.phone_number, p.location AS profile_location
            FROM buyer_requests r
            LEFT JOIN profiles p ON p.id = r.buyer_id
            WHERE r.crop_type = ?
              AND r.status = 'active'
              AND r.quantity_needed >= ?
              AND r.quantity_needed <= ?
            ORDER BY datetime(r.created_at) DESC, r.id DESC
            "#,
        )
        .bind(crop_type)
        .bind(min_quantity)
        .bind(max_quantity)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The most recent price samples for a crop in a county, newest first.
    pub async fn recent_prices(&self, crop_type: &str, county: &str) -> Result<Vec<MarketPriceSample>> {
        let rows: Vec<MarketPriceRow> = sqlx::query_as(
            r#"
            SELECT id, crop_type, county, market_name, price_per_kg, date_recorded
            FROM market_prices
            WHERE crop_type = ? AND county = ?
            ORDER BY date_recorded DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(crop_type)
        .bind(county)
        .bind(PRICE_SAMPLE_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn insert_profile(
        &self,
        full_name: &str,
        phone_number: Option<&str>,
        location: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO profiles (full_name, phone_number, location) VALUES (?, ?, ?)",
        )
        .bind(full_name)
        .bind(phone_number)
        .bind(location)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Inserts a new active request and returns the stored row with the
    /// buyer profile joined in.
    pub async fn insert_request(
        &self,
        new: &NewBuyerRequest,
        now: DateTime<Utc>,
    ) -> Result<BuyerRequest> {
        let result = sqlx::query(
            r#"
            INSERT INTO buyer_requests (
                buyer_id, crop_type, quantity_needed, unit, county,
                max_price_per_unit, delivery_date, quality_requirements,
                preferred_location, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.buyer_id)
        .bind(&new.crop_type)
        .bind(new.quantity_needed)
        .bind(new.unit.to_string())
        .bind(new.county.as_deref())
        .bind(new.max_price_per_unit)
        .bind(new.delivery_date)
        .bind(new.quality_requirements.as_deref())
        .bind(new.preferred_location.as_deref())
        .bind(RequestStatus::Active.to_string())
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.fetch_request(result.last_insert_rowid()).await
    }

    async fn fetch_request(&self, id: i64) -> Result<BuyerRequest> {
        let row: BuyerRequestRow = sqlx::query_as(
            r#"
            SELECT r.id, r.buyer_id, r.crop_type, r.quantity_needed, r.unit, r.county,
                   r.max_price_per_unit, r.delivery_date, r.quality_requirements,
                   r.preferred_location, r.status, r.created_at,
                   p.full_name, p.phone_number, p.location AS profile_location
            FROM buyer_requests r
            LEFT JOIN profiles p ON p.id = r.buyer_id
            WHERE r.id = ?
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn insert_price(&self, new: &NewMarketPrice, now: DateTime<Utc>) -> Result<MarketPriceSample> {
        let date_recorded = new.date_recorded.unwrap_or_else(|| now.date_naive());
        let result = sqlx::query(
            r#"
            INSERT INTO market_prices (crop_type, county, market_name, price_per_kg, date_recorded)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.crop_type)
        .bind(&new.county)
        .bind(new.market_name.as_deref())
        .bind(new.price_per_kg)
        .bind(date_recorded)
        .execute(&self.pool)
        .await?;

        let row: MarketPriceRow = sqlx::query_as(
            r#"
            SELECT id, crop_type, county, market_name, price_per_kg, date_recorded
            FROM market_prices
            WHERE id = ?
            "#,
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    /// Browse feed over requests. Each filter is optional; absent means
    /// unconstrained.
    pub async fn list_requests(
        &self,
        crop_type: Option<&str>,
        county: Option<&str>,
        status: Option<RequestStatus>,
        limit: i64,
    ) -> Result<Vec<BuyerRequest>> {
        let status = status.map(|s| s.to_string());
        let rows: Vec<BuyerRequestRow> = sqlx::query_as(
            r#"
            SELECT r.id, r.buyer_id, r.crop_type, r.quantity_needed, r.unit, r.county,
                   r.max_price_per_unit, r.delivery_date, r.quality_requirements,
                   r.preferred_location, r.status, r.created_at,
                   p.full_name, p.phone_number, p.location AS profile_location
            FROM buyer_requests r
            LEFT JOIN profiles p ON p.id = r.buyer_id
            WHERE (?1 IS NULL OR r.crop_type = ?1)
              AND (?2 IS NULL OR r.county = ?2)
              AND (?3 IS NULL OR r.status = ?3)
            ORDER BY datetime(r.created_at) DESC, r.id DESC
            LIMIT ?4
            "#,
        )
        .bind(crop_type)
        .bind(county)
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn list_prices(
        &self,
        crop_type: Option<&str>,
        county: Option<&str>,
        limit: i64,
    ) -> Result<Vec<MarketPriceSample>> {
        let rows: Vec<MarketPriceRow> = sqlx::query_as(
            r#"
            SELECT id, crop_type, county, market_name, price_per_kg, date_recorded
            FROM market_prices
            WHERE (?1 IS NULL OR crop_type = ?1)
              AND (?2 IS NULL OR county = ?2)
            ORDER BY date_recorded DESC, id DESC
            LIMIT ?3
            "#,
        )
        .bind(crop_type)
        .bind(county)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Flips overdue active requests to expired: delivery date in the past,
    /// or posted longer ago than the TTL. Returns how many rows changed.
    pub async fn expire_stale(&self, now: DateTime<Utc>) -> Result<u64> {
        let today = now.date_naive();
        let ttl_cutoff = now - TimeDelta::days(REQUEST_TTL_DAYS);

        let result = sqlx::query(
            r#"
            UPDATE buyer_requests
            SET status = 'expired'
            WHERE status = 'active'
              AND (
                (delivery_date IS NOT NULL AND delivery_date < ?)
                OR datetime(created_at) < datetime(?)
              )
            "#,
        )
        .bind(today)
        .bind(ttl_cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Aggregates for the stats endpoint
    // -----------------------------------------------------------------------

    pub async fn count_requests(&self) -> Result<i64> {
        let n = sqlx::query_scalar("SELECT COUNT(*) FROM buyer_requests")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    pub async fn count_active_requests(&self) -> Result<i64> {
        let n = sqlx::query_scalar("SELECT COUNT(*) FROM buyer_requests WHERE status = 'active'")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    pub async fn count_requests_since(&self, cutoff: DateTime<Utc>) -> Result<i64> {
        let n = sqlx::query_scalar(
            "SELECT COUNT(*) FROM buyer_requests WHERE datetime(created_at) > datetime(?)",
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    pub async fn count_prices_since(&self, cutoff: NaiveDate) -> Result<i64> {
        let n = sqlx::query_scalar("SELECT COUNT(*) FROM market_prices WHERE date_recorded >= ?")
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    pub async fn count_active_counties(&self) -> Result<i64> {
        let n = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT county) FROM buyer_requests
            WHERE status = 'active' AND county IS NOT NULL AND county != ''
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    /// Per-crop demand breakdown over active requests, busiest crops first.
    pub async fn crop_demand(&self, limit: i64) -> Result<Vec<CropDemandRow>> {
        let rows = sqlx::query_as(
            r#"
            SELECT crop_type,
                   COUNT(*) AS active_requests,
                   SUM(quantity_needed) AS total_quantity_needed,
                   AVG(max_price_per_unit) AS avg_max_price
            FROM buyer_requests
            WHERE status = 'active'
            GROUP BY crop_type
            ORDER BY active_requests DESC, crop_type ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
