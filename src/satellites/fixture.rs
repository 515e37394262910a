use super::catalog::TrackedSatellite;
use super::types::{Observer, RawPass, SatellitePasses};
use super::PassProvider;
use crate::upstream::ProviderError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Timelike, Utc};
use std::collections::HashMap;

/// Deterministic pass provider used in demo mode and tests.
pub struct FixturePassProvider {
    passes: Option<HashMap<u32, Vec<RawPass>>>,
}

impl FixturePassProvider {
    /// Demo data: two ISS passes tonight/tomorrow morning and one low Tiangong pass.
    pub fn new() -> Self {
        Self { passes: None }
    }

    /// Serves exactly the given passes, keyed by NORAD id.
    pub fn from_passes(passes: HashMap<u32, Vec<RawPass>>) -> Self {
        Self {
            passes: Some(passes),
        }
    }

    fn demo_passes(norad_id: u32, now: DateTime<Utc>) -> Vec<RawPass> {
        let mut evening = now
            .with_hour(19)
            .and_then(|t| t.with_minute(41))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now);
        if evening < now {
            evening += Duration::days(1);
        }

        match norad_id {
            25544 => vec![
                fixture_pass(evening, 360, 63.0, (225.0, 180.0, 45.0), Some(-3.5)),
                fixture_pass(
                    evening + Duration::hours(13),
                    300,
                    45.0,
                    (270.0, 180.0, 90.0),
                    Some(-2.8),
                ),
            ],
            48274 => vec![fixture_pass(
                evening + Duration::minutes(95),
                170,
                24.0,
                (250.0, 200.0, 150.0),
                Some(-0.9),
            )],
            _ => Vec::new(),
        }
    }
}

impl Default for FixturePassProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a symmetric pass that peaks halfway through.
pub fn fixture_pass(
    start: DateTime<Utc>,
    duration_secs: i64,
    max_el: f64,
    azimuths: (f64, f64, f64),
    mag: Option<f64>,
) -> RawPass {
    let start_utc = start.timestamp();
    RawPass {
        start_az: azimuths.0,
        start_utc,
        max_az: azimuths.1,
        max_el,
        max_utc: start_utc + duration_secs / 2,
        end_az: azimuths.2,
        end_utc: start_utc + duration_secs,
        mag,
        duration: Some(duration_secs),
    }
}

#[async_trait]
impl PassProvider for FixturePassProvider {
    async fn visual_passes(
        &self,
        satellite: &TrackedSatellite,
        _observer: &Observer,
        _days: u32,
    ) -> Result<SatellitePasses, ProviderError> {
        let passes = match &self.passes {
            Some(map) => map.get(&satellite.norad_id).cloned().unwrap_or_default(),
            None => Self::demo_passes(satellite.norad_id, Utc::now()),
        };

        Ok(SatellitePasses {
            satellite_id: satellite.norad_id,
            satellite_name: satellite.name.to_string(),
            passes,
        })
    }
}
