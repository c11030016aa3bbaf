//! Demo fixtures for a first run against an empty database: a handful of
//! buyers, open requests, and recent county price samples.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use crate::db::store::MarketplaceStore;
use crate::error::Result;
use crate::types::{NewBuyerRequest, NewMarketPrice, Unit};

pub async fn install_demo_data(store: &MarketplaceStore, now: DateTime<Utc>) -> Result<()> {
    if store.count_requests().await? > 0 {
        debug!("seed skipped: store already holds requests");
        return Ok(());
    }

    let buyers = [
        ("Metro Market", "+254712345678", "Central District, Market St."),
        ("Fresh Foods Ltd", "+254723456789", "Industrial Area, Processing Zone"),
        ("Green Grocer", "+254734567890", "South District, Corner Ave"),
        ("Farm to Table Co", "+254745678901", "East End, Rural Highway"),
    ];
    let mut buyer_ids = Vec::with_capacity(buyers.len());
    for (name, phone, location) in buyers {
        buyer_ids.push(store.insert_profile(name, Some(phone), Some(location)).await?);
    }

    // (buyer, crop, quantity kg, county, max price, delivery in days, posted days ago)
    let requests: [(usize, &str, f64, &str, f64, i64, i64); 6] = [
        (0, "maize", 1200.0, "Nakuru", 56.0, 5, 1),
        (1, "maize", 800.0, "Nairobi", 52.0, 14, 4),
        (2, "beans", 400.0, "Kisumu", 115.0, 10, 2),
        (3, "potatoes", 2000.0, "Nakuru", 38.0, 21, 6),
        (1, "tomatoes", 300.0, "Mombasa", 85.0, 3, 0),
        (2, "maize", 1500.0, "Nakuru", 58.0, 9, 3),
    ];
    for (buyer, crop, quantity, county, max_price, delivery_days, posted_days_ago) in requests {
        let posted_at = now - TimeDelta::days(posted_days_ago);
        let request = NewBuyerRequest {
            buyer_id: buyer_ids[buyer],
            crop_type: crop.to_string(),
            quantity_needed: quantity,
            unit: Unit::Kg,
            county: Some(county.to_string()),
            max_price_per_unit: Some(max_price),
            delivery_date: Some((now + TimeDelta::days(delivery_days)).date_naive()),
            quality_requirements: None,
            preferred_location: None,
        };
        store.insert_request(&request, posted_at).await?;
    }

    // (crop, county, market, KES/kg, recorded days ago)
    let prices: [(&str, &str, &str, f64, i64); 8] = [
        ("maize", "Nakuru", "Wakulima Market", 54.0, 1),
        ("maize", "Nakuru", "Wakulima Market", 55.0, 2),
        ("maize", "Nakuru", "Karatina Market", 56.0, 3),
        ("maize", "Nairobi", "Wakulima Market", 58.0, 1),
        ("beans", "Kisumu", "Kibuye Market", 110.0, 1),
        ("beans", "Kisumu", "Kibuye Market", 112.0, 4),
        ("potatoes", "Nakuru", "Karatina Market", 36.0, 2),
        ("tomatoes", "Mombasa", "Kongowea Market", 80.0, 1),
    ];
    for (crop, county, market, price_per_kg, days_ago) in prices {
        let sample = NewMarketPrice {
            crop_type: crop.to_string(),
            county: county.to_string(),
            market_name: Some(market.to_string()),
            price_per_kg,
            date_recorded: Some((now - TimeDelta::days(days_ago)).date_naive()),
        };
        store.insert_price(&sample, now).await?;
    }

    info!(
        buyers = buyers.len(),
        requests = requests.len(),
        prices = prices.len(),
        "demo data installed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_store() -> MarketplaceStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
        MarketplaceStore::new(pool)
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = memory_store().await;
        let now = Utc::now();

        install_demo_data(&store, now).await.unwrap();
        let after_first = store.count_requests().await.unwrap();
        assert!(after_first > 0);

        install_demo_data(&store, now).await.unwrap();
        assert_eq!(store.count_requests().await.unwrap(), after_first);
    }

    #[tokio::test]
    async fn seeded_store_produces_maize_candidates() {
        let store = memory_store().await;
        let now = Utc::now();
        install_demo_data(&store, now).await.unwrap();

        let candidates = store.find_candidates("maize", 1000.0).await.unwrap();
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| c.crop_type == "maize"));

        let prices = store.recent_prices("maize", "Nakuru").await.unwrap();
        assert!(!prices.is_empty());
    }
}
