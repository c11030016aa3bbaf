use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info};

use crate::config::SWEEP_INTERVAL_SECS;
use crate::db::store::MarketplaceStore;
use crate::error::Result;

/// Background task that retires overdue buyer requests. A request leaves the
/// active pool once its delivery date has passed or it has outlived the
/// posting TTL, so the match pipeline never scores dead demand.
pub struct RequestSweeper {
    store: MarketplaceStore,
}

impl RequestSweeper {
    pub fn new(store: MarketplaceStore) -> Self {
        Self { store }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
        ticker.tick().await; // skip immediate first tick, startup already swept

        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep().await {
                error!("Request sweep failed: {e}");
            }
        }
    }

    pub async fn sweep(&self) -> Result<()> {
        let expired = self.store.expire_stale(Utc::now()).await?;
        if expired > 0 {
            info!(expired, "retired overdue buyer requests");
        }
        Ok(())
    }
}
