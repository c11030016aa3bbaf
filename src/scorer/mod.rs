mod match_scorer;

pub use match_scorer::{find_matches, validate};
