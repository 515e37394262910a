pub mod fixture;
pub mod risk;
pub mod swpc;
pub mod types;

use crate::cache::{cache_key, TtlCache};
use crate::error::{ServiceError, ServiceResult};
use crate::upstream::{with_timeout, ProviderError};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use types::*;

pub const STATUS_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
/// CMEs launched within this many hours count as active.
pub const CME_LOOKBACK_HOURS: i64 = 72;

/// The individual space-weather products. Only the current Kp is mandatory.
#[async_trait]
pub trait SpaceWeatherFeed: Send + Sync {
    async fn current_kp(&self) -> Result<f64, ProviderError>;
    async fn kp_forecast_3h(&self) -> Result<Option<f64>, ProviderError>;
    async fn recent_flares(&self, since: DateTime<Utc>) -> Result<Vec<SolarFlare>, ProviderError>;
    async fn active_cmes(&self, since: DateTime<Utc>) -> Result<Vec<Cme>, ProviderError>;
}

pub struct SpaceWeatherService {
    feed: Arc<dyn SpaceWeatherFeed>,
    cache: TtlCache<SpaceWeatherStatus>,
    timeout: Duration,
}

impl SpaceWeatherService {
    pub fn new(
        feed: Arc<dyn SpaceWeatherFeed>,
        cache: TtlCache<SpaceWeatherStatus>,
        timeout: Duration,
    ) -> Self {
        Self {
            feed,
            cache,
            timeout,
        }
    }

    fn status_key() -> String {
        cache_key("space-weather-status", &[])
    }

    fn last_good_key() -> String {
        cache_key("space-weather-last-good", &[])
    }

    /// Cached status, refetched after five minutes. Falls back to the last
    /// good value (flagged stale) when the feeds are down, however old it is.
    pub async fn get_current_status(&self) -> ServiceResult<SpaceWeatherStatus> {
        if let Some(status) = self.cache.get(&Self::status_key()).await {
            return Ok(status);
        }

        match self.refresh_status().await {
            Ok(status) => Ok(status),
            Err(err @ ServiceError::UpstreamUnavailable(_)) => {
                match self.cache.get_stale(&Self::last_good_key()).await {
                    Some(mut status) => {
                        tracing::warn!(
                            error = %err,
                            cached_at = %status.timestamp,
                            "Serving stale space weather status"
                        );
                        status.stale = true;
                        Ok(status)
                    }
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Fetches from the feeds and overwrites the cached status.
    pub async fn refresh_status(&self) -> ServiceResult<SpaceWeatherStatus> {
        let status = self.fetch_status().await?;
        self.cache
            .set(Self::status_key(), status.clone(), Some(STATUS_CACHE_TTL))
            .await;
        self.cache.set(Self::last_good_key(), status.clone(), None).await;

        tracing::info!(
            kp = status.kp_current,
            gps_risk = status.gps_degradation_risk.as_str(),
            hf_risk = status.hf_radio_risk.as_str(),
            flares = status.recent_flares.len(),
            cmes = status.active_cmes.len(),
            "Space weather status updated"
        );
        Ok(status)
    }

    pub async fn get_impact_explanation(&self) -> ServiceResult<ImpactExplanation> {
        let status = self.get_current_status().await.map_err(|e| {
            ServiceError::Unavailable(format!("no space weather status available: {}", e))
        })?;
        Ok(risk::explain_impact(&status))
    }

    async fn fetch_status(&self) -> ServiceResult<SpaceWeatherStatus> {
        let now = Utc::now();
        let flare_since = now - ChronoDuration::hours(risk::FLARE_LOOKBACK_HOURS);
        let cme_since = now - ChronoDuration::hours(CME_LOOKBACK_HOURS);

        let (kp, forecast, flares, cmes) = tokio::join!(
            with_timeout(self.timeout, self.feed.current_kp()),
            with_timeout(self.timeout, self.feed.kp_forecast_3h()),
            with_timeout(self.timeout, self.feed.recent_flares(flare_since)),
            with_timeout(self.timeout, self.feed.active_cmes(cme_since)),
        );

        let kp_current = kp.map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch current Kp");
            ServiceError::from(e)
        })?;
        let kp_forecast_3h = forecast.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Kp forecast unavailable");
            None
        });
        let flares = flares.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Solar flare feed unavailable");
            Vec::new()
        });
        let cmes = cmes.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "CME feed unavailable");
            Vec::new()
        });

        Ok(risk::assess(
            WeatherReadings {
                kp_current,
                kp_forecast_3h,
                flares,
                cmes,
            },
            now,
        ))
    }
}
