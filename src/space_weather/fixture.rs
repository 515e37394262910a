use super::types::{Cme, SolarFlare, WeatherReadings};
use super::SpaceWeatherFeed;
use crate::upstream::ProviderError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Deterministic feed for demo mode: active conditions with a recent M5.2 flare.
pub struct FixtureFeed {
    readings: Option<WeatherReadings>,
}

impl FixtureFeed {
    pub fn new() -> Self {
        Self { readings: None }
    }

    pub fn with_readings(readings: WeatherReadings) -> Self {
        Self {
            readings: Some(readings),
        }
    }

    fn readings(&self) -> WeatherReadings {
        match &self.readings {
            Some(readings) => readings.clone(),
            None => demo_readings(Utc::now()),
        }
    }
}

impl Default for FixtureFeed {
    fn default() -> Self {
        Self::new()
    }
}

fn demo_readings(now: DateTime<Utc>) -> WeatherReadings {
    let flare_start = now - Duration::hours(3);
    WeatherReadings {
        kp_current: 5.0,
        kp_forecast_3h: Some(5.3),
        flares: vec![SolarFlare {
            timestamp: flare_start,
            class_type: "M".to_string(),
            scale: 5.2,
            region: Some("AR3590".to_string()),
            peak_time: Some(flare_start + Duration::minutes(12)),
            end_time: Some(flare_start + Duration::minutes(31)),
        }],
        cmes: Vec::new(),
    }
}

#[async_trait]
impl SpaceWeatherFeed for FixtureFeed {
    async fn current_kp(&self) -> Result<f64, ProviderError> {
        Ok(self.readings().kp_current)
    }

    async fn kp_forecast_3h(&self) -> Result<Option<f64>, ProviderError> {
        Ok(self.readings().kp_forecast_3h)
    }

    async fn recent_flares(&self, since: DateTime<Utc>) -> Result<Vec<SolarFlare>, ProviderError> {
        Ok(self
            .readings()
            .flares
            .into_iter()
            .filter(|f| f.timestamp >= since)
            .collect())
    }

    async fn active_cmes(&self, since: DateTime<Utc>) -> Result<Vec<Cme>, ProviderError> {
        Ok(self
            .readings()
            .cmes
            .into_iter()
            .filter(|c| c.timestamp >= since)
            .collect())
    }
}
