use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    None,
    Minor,
    Moderate,
    High,
}

impl RiskLevel {
    const ORDERED: [RiskLevel; 4] = [
        RiskLevel::None,
        RiskLevel::Minor,
        RiskLevel::Moderate,
        RiskLevel::High,
    ];

    /// Raises the level by `steps`, saturating at `High`.
    pub fn escalate(self, steps: usize) -> Self {
        let index = (self as usize + steps).min(Self::ORDERED.len() - 1);
        Self::ORDERED[index]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Minor => "minor",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuroraVisibility {
    Unlikely,
    VisiblePolarRegions,
    VisibleHighLatitudes,
    VisibleMidLatitudes,
    VisibleLowLatitudes,
}

impl AuroraVisibility {
    pub fn describe(&self) -> &'static str {
        match self {
            AuroraVisibility::Unlikely => "unlikely",
            AuroraVisibility::VisiblePolarRegions => "visible in polar regions",
            AuroraVisibility::VisibleHighLatitudes => "visible at high latitudes",
            AuroraVisibility::VisibleMidLatitudes => "visible at mid latitudes",
            AuroraVisibility::VisibleLowLatitudes => "visible at low latitudes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Moderate,
    High,
    Severe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SolarFlare {
    pub timestamp: DateTime<Utc>,
    /// GOES class letter: A, B, C, M or X.
    pub class_type: String,
    pub scale: f64,
    pub region: Option<String>,
    pub peak_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl SolarFlare {
    pub fn label(&self) -> String {
        format!("{}{:.1}", self.class_type, self.scale)
    }

    pub fn is_strong(&self) -> bool {
        matches!(self.class_type.as_str(), "M" | "X")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Cme {
    pub timestamp: DateTime<Utc>,
    pub speed_kms: f64,
    pub earth_directed: bool,
    pub estimated_arrival: Option<DateTime<Utc>>,
    pub impact_probability: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SpaceWeatherStatus {
    pub timestamp: DateTime<Utc>,
    pub kp_current: f64,
    pub kp_forecast_3h: Option<f64>,
    pub recent_flares: Vec<SolarFlare>,
    pub active_cmes: Vec<Cme>,
    pub gps_degradation_risk: RiskLevel,
    pub hf_radio_risk: RiskLevel,
    pub satellite_risk: RiskLevel,
    pub aurora_visibility: AuroraVisibility,
    pub summary: String,
    /// Set when the value comes from an expired cache entry.
    #[serde(default)]
    pub stale: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImpactExplanation {
    pub what_happened: String,
    pub potential_impacts: Vec<String>,
    pub who_should_care: Vec<String>,
    pub actionable_guidance: String,
    pub severity: AlertSeverity,
}

/// Raw measurements gathered from the feeds before risk assessment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherReadings {
    pub kp_current: f64,
    pub kp_forecast_3h: Option<f64>,
    pub flares: Vec<SolarFlare>,
    pub cmes: Vec<Cme>,
}
