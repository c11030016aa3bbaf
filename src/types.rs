use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Offer: the seller's search criteria, request-scoped, never persisted
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    #[serde(default)]
    pub crop_type: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit: Unit,
    /// Free-text finer-grained location. Not scored.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub county: String,
    #[serde(default)]
    pub min_price: f64,
    #[serde(default)]
    pub max_price: f64,
    /// The web form submits "" when unset, so blank parses as absent.
    #[serde(default, deserialize_with = "de_blank_date")]
    pub delivery_date: Option<NaiveDate>,
    /// Carried through for display only. Not scored.
    #[serde(default, deserialize_with = "de_blank_grade")]
    pub quality_grade: Option<QualityGrade>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Kg,
    /// 90kg sacks, the common wholesale lot.
    Bags,
    Tonnes,
    Bunches,
}

impl Unit {
    pub fn parse(s: &str) -> Self {
        match s {
            "bags" => Unit::Bags,
            "tonnes" => Unit::Tonnes,
            "bunches" => Unit::Bunches,
            _ => Unit::Kg,
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Unit::Kg => "kg",
            Unit::Bags => "bags",
            Unit::Tonnes => "tonnes",
            Unit::Bunches => "bunches",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityGrade {
    Premium,
    GradeA,
    GradeB,
    Standard,
}

impl QualityGrade {
    pub fn parse(s: &str) -> Self {
        match s {
            "premium" => QualityGrade::Premium,
            "grade-a" => QualityGrade::GradeA,
            "grade-b" => QualityGrade::GradeB,
            _ => QualityGrade::Standard,
        }
    }
}

impl std::fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QualityGrade::Premium => "premium",
            QualityGrade::GradeA => "grade-a",
            QualityGrade::GradeB => "grade-b",
            QualityGrade::Standard => "standard",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Buyer requests: demand posted by buyers, owned by the store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Active,
    Matched,
    Completed,
    Expired,
}

impl RequestStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "matched" => RequestStatus::Matched,
            "completed" => RequestStatus::Completed,
            "expired" => RequestStatus::Expired,
            _ => RequestStatus::Active,
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequestStatus::Active => "active",
            RequestStatus::Matched => "matched",
            RequestStatus::Completed => "completed",
            RequestStatus::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// Buyer contact info denormalized onto every request for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyerProfile {
    pub full_name: String,
    pub phone_number: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuyerRequest {
    pub id: i64,
    pub buyer_id: i64,
    pub crop_type: String,
    pub quantity_needed: f64,
    pub unit: Unit,
    pub county: Option<String>,
    /// The buyer's price ceiling. Absent on a few legacy rows; scoring
    /// treats absence as zero price points, never a batch failure.
    pub max_price_per_unit: Option<f64>,
    pub delivery_date: Option<NaiveDate>,
    pub quality_requirements: Option<String>,
    pub preferred_location: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub profiles: Option<BuyerProfile>,
}

/// Create payload for a buyer request. Mirrors the table row: these come in
/// snake_case, unlike the match form.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBuyerRequest {
    pub buyer_id: i64,
    pub crop_type: String,
    pub quantity_needed: f64,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub max_price_per_unit: Option<f64>,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub quality_requirements: Option<String>,
    #[serde(default)]
    pub preferred_location: Option<String>,
}

// ---------------------------------------------------------------------------
// Market prices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MarketPriceSample {
    pub id: i64,
    pub crop_type: String,
    pub county: String,
    pub market_name: Option<String>,
    pub price_per_kg: f64,
    pub date_recorded: NaiveDate,
}

/// Create payload for a reported price sample. `date_recorded` defaults to
/// the day of the report.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMarketPrice {
    pub crop_type: String,
    pub county: String,
    #[serde(default)]
    pub market_name: Option<String>,
    pub price_per_kg: f64,
    #[serde(default)]
    pub date_recorded: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Scored output
// ---------------------------------------------------------------------------

/// A candidate that cleared the score threshold. Serializes as the full
/// request row plus the two computed fields the results page reads.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredMatch {
    #[serde(flatten)]
    pub request: BuyerRequest,
    #[serde(rename = "matchScore")]
    pub match_score: i64,
    #[serde(rename = "avgMarketPrice")]
    pub avg_market_price: f64,
}

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

fn de_blank_date<'de, D>(de: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(de)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn de_blank_grade<'de, D>(de: D) -> std::result::Result<Option<QualityGrade>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(de)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => Ok(Some(QualityGrade::parse(s))),
    }
}
