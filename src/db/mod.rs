pub mod models;
pub mod seed;
pub mod store;
pub mod sweeper;

pub use store::MarketplaceStore;
pub use sweeper::RequestSweeper;
