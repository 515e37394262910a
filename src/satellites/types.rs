use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single predicted overhead transit, normalized from the pass provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PassPrediction {
    pub satellite_name: String,
    pub satellite_id: u32,
    pub start_time: DateTime<Utc>,
    pub max_elevation_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub start_azimuth: f64,
    pub max_azimuth: f64,
    pub end_azimuth: f64,
    pub max_elevation: f64,
    pub duration_seconds: i64,
    pub magnitude: Option<f64>,
    pub worth_watching: bool,
    pub commentary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrbitType {
    Leo,
    Meo,
    Geo,
    Heo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SatelliteProfile {
    pub satellite_id: u32,
    pub name: String,
    pub norad_id: String,
    pub purpose: String,
    pub orbit_type: OrbitType,
    pub altitude_km: f64,
    pub speed_kmh: f64,
    pub launch_date: Option<DateTime<Utc>>,
    pub country: Option<String>,
    pub why_care: String,
    pub recent_changes: Option<String>,
}

/// Observer position after validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    pub lat: f64,
    pub lon: f64,
    pub alt_m: f64,
}

/// Pass as reported by the provider (N2YO field names, unix seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPass {
    pub start_az: f64,
    #[serde(rename = "startUTC")]
    pub start_utc: i64,
    pub max_az: f64,
    pub max_el: f64,
    #[serde(rename = "maxUTC")]
    pub max_utc: i64,
    pub end_az: f64,
    #[serde(rename = "endUTC")]
    pub end_utc: i64,
    #[serde(default)]
    pub mag: Option<f64>,
    #[serde(default)]
    pub duration: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SatellitePasses {
    pub satellite_id: u32,
    pub satellite_name: String,
    pub passes: Vec<RawPass>,
}
