pub mod catalog;
pub mod fixture;
pub mod n2yo;
pub mod types;

use crate::cache::{cache_key, round_coord, TtlCache};
use crate::error::{ServiceError, ServiceResult};
use crate::upstream::{with_timeout, ProviderError};
use async_trait::async_trait;
use catalog::TrackedSatellite;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use types::*;

pub const PASS_CACHE_TTL: Duration = Duration::from_secs(10 * 60);
pub const MAX_WINDOW_HOURS: u32 = 168;
pub const NEXT_PASS_LOOKAHEAD_HOURS: u32 = 48;
pub const WORTH_WATCHING_ELEVATION: f64 = 30.0;
const EXCELLENT_ELEVATION: f64 = 60.0;
const QUICK_PASS_SECS: i64 = 180;
const LONG_PASS_SECS: i64 = 600;

/// Source of pass geometry for one satellite over one observer.
#[async_trait]
pub trait PassProvider: Send + Sync {
    async fn visual_passes(
        &self,
        satellite: &TrackedSatellite,
        observer: &Observer,
        days: u32,
    ) -> Result<SatellitePasses, ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassQuery {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    pub window_hours: u32,
    pub min_elevation: f64,
}

impl PassQuery {
    pub fn validate(&self) -> ServiceResult<Observer> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(ServiceError::InvalidArgument(format!(
                "latitude {} must be between -90 and 90",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(ServiceError::InvalidArgument(format!(
                "longitude {} must be between -180 and 180",
                self.lon
            )));
        }
        if !self.alt.is_finite() || self.alt < 0.0 {
            return Err(ServiceError::InvalidArgument(format!(
                "altitude {} must be a non-negative number of meters",
                self.alt
            )));
        }
        if self.window_hours == 0 || self.window_hours > MAX_WINDOW_HOURS {
            return Err(ServiceError::InvalidArgument(format!(
                "time window {}h must be within 1..={}",
                self.window_hours, MAX_WINDOW_HOURS
            )));
        }
        if !(0.0..=90.0).contains(&self.min_elevation) {
            return Err(ServiceError::InvalidArgument(format!(
                "minimum elevation {} must be between 0 and 90",
                self.min_elevation
            )));
        }

        Ok(Observer {
            lat: self.lat,
            lon: self.lon,
            alt_m: self.alt,
        })
    }

    fn cache_params(&self) -> Vec<String> {
        vec![
            round_coord(self.lat),
            round_coord(self.lon),
            format!("{:.0}", self.alt),
            self.window_hours.to_string(),
            format!("{:.1}", self.min_elevation),
        ]
    }
}

/// Pass predictions plus the keys of tracked satellites whose provider call failed.
struct PassFetch {
    passes: Vec<PassPrediction>,
    failed: Vec<&'static str>,
}

pub struct SatelliteService {
    provider: Arc<dyn PassProvider>,
    passes: TtlCache<Vec<PassPrediction>>,
    profiles: TtlCache<SatelliteProfile>,
    timeout: Duration,
}

impl SatelliteService {
    pub fn new(
        provider: Arc<dyn PassProvider>,
        passes: TtlCache<Vec<PassPrediction>>,
        profiles: TtlCache<SatelliteProfile>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            passes,
            profiles,
            timeout,
        }
    }

    /// Passes of every tracked satellite within the window, earliest first.
    pub async fn get_overhead_satellites(
        &self,
        query: &PassQuery,
    ) -> ServiceResult<Vec<PassPrediction>> {
        let observer = query.validate()?;
        Ok(self.overhead(query, &observer).await?.passes)
    }

    pub async fn get_next_iss_pass(
        &self,
        lat: f64,
        lon: f64,
        alt: f64,
        min_elevation: f64,
    ) -> ServiceResult<PassPrediction> {
        let query = PassQuery {
            lat,
            lon,
            alt,
            window_hours: NEXT_PASS_LOOKAHEAD_HOURS,
            min_elevation,
        };
        let observer = query.validate()?;

        let key = cache_key("iss-next-pass", &query.cache_params());
        let iss_passes = match self.passes.get(&key).await {
            Some(cached) => cached,
            None => {
                let fetched = self.overhead(&query, &observer).await?;
                let iss = catalog::iss();
                if fetched.failed.contains(&iss.key) {
                    return Err(ServiceError::UpstreamUnavailable(format!(
                        "pass provider failed for {}",
                        iss.name
                    )));
                }

                let iss_passes: Vec<PassPrediction> = fetched
                    .passes
                    .into_iter()
                    .filter(|p| p.satellite_id == catalog::ISS_NORAD_ID)
                    .filter(|p| p.max_elevation >= min_elevation)
                    .collect();
                self.passes
                    .set(key, iss_passes.clone(), Some(PASS_CACHE_TTL))
                    .await;
                iss_passes
            }
        };

        iss_passes.into_iter().next().ok_or_else(|| {
            ServiceError::NotFound(format!(
                "No upcoming ISS passes above {:.0}° in the next {} hours",
                min_elevation, NEXT_PASS_LOOKAHEAD_HOURS
            ))
        })
    }

    pub async fn get_satellite_profile(&self, name: &str) -> ServiceResult<SatelliteProfile> {
        let normalized = name.trim().to_lowercase();
        let key = cache_key("profile", &[normalized.clone()]);
        if let Some(cached) = self.profiles.get(&key).await {
            return Ok(cached);
        }

        let satellite = catalog::find(&normalized)
            .ok_or_else(|| ServiceError::NotFound(format!("Satellite '{}' not found", name)))?;
        let profile = catalog::profile(satellite);
        self.profiles.set(key, profile.clone(), None).await;

        Ok(profile)
    }

    /// Only complete results are cached; a partial one is served once and refetched.
    async fn overhead(&self, query: &PassQuery, observer: &Observer) -> ServiceResult<PassFetch> {
        let key = cache_key("overhead", &query.cache_params());
        if let Some(cached) = self.passes.get(&key).await {
            return Ok(PassFetch {
                passes: cached,
                failed: Vec::new(),
            });
        }

        let fetched = self
            .fetch_passes(observer, query.window_hours, query.min_elevation)
            .await?;
        if fetched.failed.is_empty() {
            self.passes
                .set(key, fetched.passes.clone(), Some(PASS_CACHE_TTL))
                .await;
        } else {
            tracing::debug!(failed = ?fetched.failed, "Partial pass result not cached");
        }

        Ok(fetched)
    }

    async fn fetch_passes(
        &self,
        observer: &Observer,
        window_hours: u32,
        min_elevation: f64,
    ) -> ServiceResult<PassFetch> {
        let days = window_hours.div_ceil(24).max(1);
        let requests = catalog::TRACKED.iter().map(|sat| async move {
            let result = with_timeout(
                self.timeout,
                self.provider.visual_passes(sat, observer, days),
            )
            .await;
            (sat, result)
        });

        let now = Utc::now();
        let horizon = now + ChronoDuration::hours(i64::from(window_hours));
        let mut passes = Vec::new();
        let mut failures = Vec::new();
        let mut failed = Vec::new();

        for (sat, result) in join_all(requests).await {
            match result {
                Ok(reported) => passes.extend(
                    reported
                        .passes
                        .iter()
                        .filter_map(|raw| normalize_pass(&reported, raw))
                        .filter(|p| p.start_time <= horizon)
                        .filter(|p| p.max_elevation >= min_elevation),
                ),
                Err(e) => {
                    tracing::warn!(satellite = sat.key, error = %e, "Failed to get passes");
                    failures.push(format!("{}: {}", sat.key, e));
                    failed.push(sat.key);
                }
            }
        }

        if failures.len() == catalog::TRACKED.len() {
            return Err(ServiceError::UpstreamUnavailable(failures.join("; ")));
        }

        passes.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then(a.satellite_id.cmp(&b.satellite_id))
        });
        tracing::debug!(count = passes.len(), window_hours, "Pass predictions fetched");

        Ok(PassFetch { passes, failed })
    }
}

pub fn is_worth_watching(max_elevation: f64) -> bool {
    max_elevation >= WORTH_WATCHING_ELEVATION
}

pub fn commentary(max_elevation: f64, duration_seconds: i64) -> String {
    let visibility = if max_elevation >= EXCELLENT_ELEVATION {
        "Excellent high pass, easy to spot overhead."
    } else if max_elevation >= WORTH_WATCHING_ELEVATION {
        "Good pass, should be easy to spot."
    } else {
        "Low pass, hard to see near the horizon."
    };

    if duration_seconds < QUICK_PASS_SECS {
        format!("{} Quick pass ({}s).", visibility, duration_seconds)
    } else if duration_seconds > LONG_PASS_SECS {
        format!("{} Long pass ({}s).", visibility, duration_seconds)
    } else {
        visibility.to_string()
    }
}

fn to_utc(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Converts a provider pass, dropping passes that break start <= peak <= end.
fn normalize_pass(reported: &SatellitePasses, raw: &RawPass) -> Option<PassPrediction> {
    let (start, peak, end) = match (to_utc(raw.start_utc), to_utc(raw.max_utc), to_utc(raw.end_utc)) {
        (Some(start), Some(peak), Some(end)) => (start, peak, end),
        _ => {
            tracing::warn!(satellite = %reported.satellite_name, "Pass with out-of-range timestamps dropped");
            return None;
        }
    };

    if !(start <= peak && peak <= end) {
        tracing::warn!(
            satellite = %reported.satellite_name,
            start = raw.start_utc,
            peak = raw.max_utc,
            end = raw.end_utc,
            "Pass with inconsistent timing dropped"
        );
        return None;
    }

    let max_elevation = raw.max_el.clamp(0.0, 90.0);
    let duration_seconds = raw.duration.unwrap_or(raw.end_utc - raw.start_utc);

    Some(PassPrediction {
        satellite_name: reported.satellite_name.clone(),
        satellite_id: reported.satellite_id,
        start_time: start,
        max_elevation_time: peak,
        end_time: end,
        start_azimuth: raw.start_az.rem_euclid(360.0),
        max_azimuth: raw.max_az.rem_euclid(360.0),
        end_azimuth: raw.end_az.rem_euclid(360.0),
        max_elevation,
        duration_seconds,
        magnitude: raw.mag,
        worth_watching: is_worth_watching(max_elevation),
        commentary: commentary(max_elevation, duration_seconds),
    })
}

#[cfg(test)]
mod tests {
    use super::fixture::{fixture_pass, FixturePassProvider};
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingProvider;

    #[async_trait]
    impl PassProvider for FailingProvider {
        async fn visual_passes(
            &self,
            _satellite: &TrackedSatellite,
            _observer: &Observer,
            _days: u32,
        ) -> Result<SatellitePasses, ProviderError> {
            Err(ProviderError::ApiError("HTTP 503: maintenance".to_string()))
        }
    }

    struct CountingProvider {
        calls: AtomicUsize,
        inner: FixturePassProvider,
    }

    #[async_trait]
    impl PassProvider for CountingProvider {
        async fn visual_passes(
            &self,
            satellite: &TrackedSatellite,
            observer: &Observer,
            days: u32,
        ) -> Result<SatellitePasses, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.visual_passes(satellite, observer, days).await
        }
    }

    /// Fails the ISS call a set number of times, then serves demo data.
    struct FlakyIssProvider {
        iss_failures_left: AtomicUsize,
        inner: FixturePassProvider,
    }

    impl FlakyIssProvider {
        fn failing_once() -> Self {
            Self {
                iss_failures_left: AtomicUsize::new(1),
                inner: FixturePassProvider::new(),
            }
        }
    }

    #[async_trait]
    impl PassProvider for FlakyIssProvider {
        async fn visual_passes(
            &self,
            satellite: &TrackedSatellite,
            observer: &Observer,
            days: u32,
        ) -> Result<SatellitePasses, ProviderError> {
            if satellite.norad_id == catalog::ISS_NORAD_ID
                && self
                    .iss_failures_left
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
            {
                return Err(ProviderError::ApiError("HTTP 502 Bad Gateway".to_string()));
            }
            self.inner.visual_passes(satellite, observer, days).await
        }
    }

    fn service(provider: Arc<dyn PassProvider>) -> SatelliteService {
        SatelliteService::new(
            provider,
            TtlCache::new("passes"),
            TtlCache::new("profiles"),
            Duration::from_secs(10),
        )
    }

    fn seattle(window_hours: u32, min_elevation: f64) -> PassQuery {
        PassQuery {
            lat: 47.6062,
            lon: -122.3321,
            alt: 0.0,
            window_hours,
            min_elevation,
        }
    }

    fn single_iss_pass_provider() -> FixturePassProvider {
        let start = Utc::now() + ChronoDuration::hours(3);
        let mut passes = HashMap::new();
        passes.insert(
            catalog::ISS_NORAD_ID,
            vec![fixture_pass(start, 360, 63.0, (225.0, 180.0, 45.0), Some(-3.5))],
        );
        FixturePassProvider::from_passes(passes)
    }

    #[tokio::test]
    async fn test_single_iss_pass_over_seattle() {
        let service = service(Arc::new(single_iss_pass_provider()));
        let passes = service
            .get_overhead_satellites(&seattle(24, 0.0))
            .await
            .unwrap();

        assert_eq!(passes.len(), 1);
        let pass = &passes[0];
        assert_eq!(pass.satellite_id, catalog::ISS_NORAD_ID);
        assert!(pass.worth_watching);
        assert!(pass.commentary.to_lowercase().contains("excellent"));
        assert_eq!(pass.duration_seconds, 360);
    }

    #[tokio::test]
    async fn test_window_beyond_a_week_is_rejected() {
        let service = service(Arc::new(single_iss_pass_provider()));
        let result = service.get_overhead_satellites(&seattle(240, 0.0)).await;
        assert!(matches!(result, Err(ServiceError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_passes_sorted_and_consistent() {
        let now = Utc::now();
        let mut passes = HashMap::new();
        passes.insert(
            catalog::ISS_NORAD_ID,
            vec![
                fixture_pass(now + ChronoDuration::hours(9), 400, 50.0, (10.0, 90.0, 170.0), None),
                fixture_pass(now + ChronoDuration::hours(1), 300, 35.0, (10.0, 90.0, 170.0), None),
            ],
        );
        passes.insert(
            20580,
            vec![fixture_pass(now + ChronoDuration::hours(5), 200, 20.0, (0.0, 45.0, 90.0), None)],
        );
        passes.insert(
            48274,
            vec![fixture_pass(now + ChronoDuration::hours(2), 650, 70.0, (300.0, 0.0, 60.0), None)],
        );
        let service = service(Arc::new(FixturePassProvider::from_passes(passes)));

        let result = service
            .get_overhead_satellites(&seattle(24, 0.0))
            .await
            .unwrap();

        assert_eq!(result.len(), 4);
        assert!(result.windows(2).all(|w| w[0].start_time <= w[1].start_time));
        assert!(result
            .iter()
            .all(|p| p.start_time <= p.max_elevation_time && p.max_elevation_time <= p.end_time));
    }

    #[tokio::test]
    async fn test_inconsistent_and_out_of_window_passes_dropped() {
        let now = Utc::now();
        let mut broken = fixture_pass(now + ChronoDuration::hours(1), 300, 40.0, (0.0, 0.0, 0.0), None);
        broken.max_utc = broken.end_utc + 10;
        let late = fixture_pass(now + ChronoDuration::hours(30), 300, 40.0, (0.0, 0.0, 0.0), None);
        let mut passes = HashMap::new();
        passes.insert(catalog::ISS_NORAD_ID, vec![broken, late]);
        let service = service(Arc::new(FixturePassProvider::from_passes(passes)));

        let result = service
            .get_overhead_satellites(&seattle(24, 0.0))
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_min_elevation_filters_passes() {
        let service = service(Arc::new(FixturePassProvider::new()));
        let result = service
            .get_overhead_satellites(&seattle(48, 50.0))
            .await
            .unwrap();
        assert!(!result.is_empty());
        assert!(result.iter().all(|p| p.max_elevation >= 50.0));
    }

    #[test]
    fn test_worth_watching_boundary() {
        assert!(is_worth_watching(30.0));
        assert!(!is_worth_watching(29.999));
        assert!(is_worth_watching(89.0));
    }

    #[test]
    fn test_commentary_rules() {
        assert!(commentary(60.0, 300).starts_with("Excellent"));
        assert!(commentary(59.9, 300).starts_with("Good"));
        assert!(commentary(30.0, 300).starts_with("Good"));
        assert!(commentary(29.9, 300).starts_with("Low pass"));
        assert!(commentary(45.0, 179).contains("Quick pass (179s)"));
        assert!(commentary(45.0, 601).contains("Long pass (601s)"));
        assert!(!commentary(45.0, 180).contains("pass ("));
        assert!(!commentary(45.0, 600).contains("pass ("));
    }

    #[tokio::test]
    async fn test_invalid_coordinates_rejected() {
        let service = service(Arc::new(FixturePassProvider::new()));
        for query in [
            PassQuery { lat: 90.5, ..seattle(24, 10.0) },
            PassQuery { lon: -180.5, ..seattle(24, 10.0) },
            PassQuery { window_hours: 0, ..seattle(24, 10.0) },
            PassQuery { min_elevation: 91.0, ..seattle(24, 10.0) },
            PassQuery { min_elevation: -1.0, ..seattle(24, 10.0) },
            PassQuery { alt: -5.0, ..seattle(24, 10.0) },
        ] {
            assert!(matches!(
                service.get_overhead_satellites(&query).await,
                Err(ServiceError::InvalidArgument(_))
            ));
        }
        assert!(service
            .get_overhead_satellites(&PassQuery { window_hours: 168, ..seattle(24, 10.0) })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_overhead_results_are_cached() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            inner: FixturePassProvider::new(),
        });
        let service = service(provider.clone());

        let first = service.get_overhead_satellites(&seattle(24, 10.0)).await.unwrap();
        // nearby coordinates round to the same key
        let nearby = PassQuery { lat: 47.6071, ..seattle(24, 10.0) };
        let second = service.get_overhead_satellites(&nearby).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), catalog::TRACKED.len());
    }

    #[tokio::test]
    async fn test_all_providers_failing_is_upstream_unavailable() {
        let service = service(Arc::new(FailingProvider));
        let result = service.get_overhead_satellites(&seattle(24, 10.0)).await;
        assert!(matches!(result, Err(ServiceError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_partial_overhead_result_is_not_cached() {
        let service = service(Arc::new(FlakyIssProvider::failing_once()));

        let partial = service.get_overhead_satellites(&seattle(48, 10.0)).await.unwrap();
        assert!(!partial.is_empty());
        assert!(partial.iter().all(|p| p.satellite_id != catalog::ISS_NORAD_ID));

        let complete = service.get_overhead_satellites(&seattle(48, 10.0)).await.unwrap();
        assert!(complete.iter().any(|p| p.satellite_id == catalog::ISS_NORAD_ID));
    }

    #[tokio::test]
    async fn test_next_iss_pass_reports_provider_failure() {
        let service = service(Arc::new(FlakyIssProvider::failing_once()));

        let first = service.get_next_iss_pass(47.6062, -122.3321, 0.0, 30.0).await;
        assert!(matches!(first, Err(ServiceError::UpstreamUnavailable(_))));

        let second = service
            .get_next_iss_pass(47.6062, -122.3321, 0.0, 30.0)
            .await
            .unwrap();
        assert_eq!(second.satellite_id, catalog::ISS_NORAD_ID);
    }

    #[tokio::test]
    async fn test_next_iss_pass() {
        let service = service(Arc::new(FixturePassProvider::new()));
        let pass = service
            .get_next_iss_pass(47.6062, -122.3321, 0.0, 30.0)
            .await
            .unwrap();
        assert_eq!(pass.satellite_id, catalog::ISS_NORAD_ID);
        assert_eq!(pass.max_elevation, 63.0);
    }

    #[tokio::test]
    async fn test_next_iss_pass_not_found() {
        let service = service(Arc::new(FixturePassProvider::new()));
        let result = service.get_next_iss_pass(47.6062, -122.3321, 0.0, 80.0).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));

        let invalid = service.get_next_iss_pass(95.0, 0.0, 0.0, 30.0).await;
        assert!(matches!(invalid, Err(ServiceError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_profile_lookup_is_idempotent() {
        let service = service(Arc::new(FixturePassProvider::new()));
        let first = service.get_satellite_profile("ISS").await.unwrap();
        let second = service.get_satellite_profile("ISS").await.unwrap();
        let lower = service.get_satellite_profile("iss").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, lower);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(first.name, "International Space Station");
    }

    #[tokio::test]
    async fn test_unknown_profile_not_found() {
        let service = service(Arc::new(FixturePassProvider::new()));
        assert!(matches!(
            service.get_satellite_profile("Sputnik").await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
