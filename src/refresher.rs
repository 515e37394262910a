use crate::space_weather::SpaceWeatherService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Keeps the shared space-weather cache entry warm. The first refresh runs
/// immediately; failures are logged and retried on the next tick.
pub fn spawn(weather: Arc<SpaceWeatherService>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(interval_secs = every.as_secs(), "Starting space weather refresher");

        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match weather.refresh_status().await {
                Ok(status) => tracing::debug!(
                    kp = status.kp_current,
                    gps_risk = status.gps_degradation_risk.as_str(),
                    "Scheduled space weather refresh complete"
                ),
                Err(e) => tracing::warn!(error = %e, "Scheduled space weather refresh failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlCache;
    use crate::space_weather::types::{Cme, SolarFlare};
    use crate::space_weather::SpaceWeatherFeed;
    use crate::upstream::ProviderError;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingFeed {
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    #[async_trait]
    impl SpaceWeatherFeed for CountingFeed {
        async fn current_kp(&self) -> Result<f64, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(ProviderError::ApiError("HTTP 500".to_string()));
            }
            Ok(2.33)
        }
        async fn kp_forecast_3h(&self) -> Result<Option<f64>, ProviderError> {
            Ok(None)
        }
        async fn recent_flares(&self, _since: DateTime<Utc>) -> Result<Vec<SolarFlare>, ProviderError> {
            Ok(Vec::new())
        }
        async fn active_cmes(&self, _since: DateTime<Utc>) -> Result<Vec<Cme>, ProviderError> {
            Ok(Vec::new())
        }
    }

    fn weather(feed: Arc<CountingFeed>) -> Arc<SpaceWeatherService> {
        Arc::new(SpaceWeatherService::new(
            feed,
            TtlCache::new("space_weather"),
            Duration::from_secs(10),
        ))
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_on_every_tick() {
        let feed = Arc::new(CountingFeed::default());
        let handle = spawn(weather(feed.clone()), Duration::from_secs(300));

        settle().await;
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(300)).await;
        settle().await;
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);

        tokio::time::advance(Duration::from_secs(600)).await;
        settle().await;
        assert_eq!(feed.calls.load(Ordering::SeqCst), 3);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_the_task() {
        let feed = Arc::new(CountingFeed::default());
        feed.failing.store(true, Ordering::SeqCst);
        let service = weather(feed.clone());
        let handle = spawn(service.clone(), Duration::from_secs(60));

        settle().await;
        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
        assert!(!handle.is_finished());

        feed.failing.store(false, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(feed.calls.load(Ordering::SeqCst), 3);

        // the refreshed entry is served without another feed call
        let status = service.get_current_status().await.unwrap();
        assert_eq!(status.kp_current, 2.33);
        assert_eq!(feed.calls.load(Ordering::SeqCst), 3);

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
