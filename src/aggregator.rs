use crate::agent::{AgentResponse, AgentService, ExplanationMode, ExplanationResponse};
use crate::error::{ServiceError, ServiceResult};
use crate::satellites::{
    PassQuery, SatelliteService, NEXT_PASS_LOOKAHEAD_HOURS, WORTH_WATCHING_ELEVATION,
};
use crate::space_weather::risk;
use crate::space_weather::types::{AlertSeverity, ImpactExplanation, SpaceWeatherStatus};
use crate::space_weather::SpaceWeatherService;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;

const FEED_LOOKBACK_HOURS: i64 = 24;
const STORM_KP: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above sea level.
    #[serde(default)]
    pub altitude: f64,
    pub name: Option<String>,
}

impl Location {
    fn validate(&self) -> ServiceResult<()> {
        PassQuery {
            lat: self.latitude,
            lon: self.longitude,
            alt: self.altitude,
            window_hours: NEXT_PASS_LOOKAHEAD_HOURS,
            min_elevation: WORTH_WATCHING_ELEVATION,
        }
        .validate()
        .map(|_| ())
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AgentQueryRequest {
    pub query: String,
    pub location: Option<Location>,
    #[serde(default = "default_true")]
    pub include_live_context: bool,
    /// One of quick, eli10, stem, scifi. Defaults to quick.
    pub explanation_mode: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ExplainRequest {
    pub query: String,
    /// One of quick, eli10, stem, scifi. Defaults to quick.
    pub mode: Option<String>,
    #[serde(default = "default_true")]
    pub include_citations: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SpaceEvent {
    pub event_id: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub severity: Option<AlertSeverity>,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActivityFeed {
    pub period: String,
    pub events: Vec<SpaceEvent>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DailyBriefing {
    pub generated_at: DateTime<Utc>,
    pub status: SpaceWeatherStatus,
    pub impact: ImpactExplanation,
    pub feed: ActivityFeed,
    /// Omitted when the LLM is unavailable.
    pub narrative: Option<String>,
}

fn parse_mode(raw: Option<&str>) -> ServiceResult<ExplanationMode> {
    raw.map(str::parse::<ExplanationMode>).transpose().map(Option::unwrap_or_default)
}

/// Composite operations that span more than one adapter.
pub struct Aggregator {
    satellites: Arc<SatelliteService>,
    weather: Arc<SpaceWeatherService>,
    agent: Arc<AgentService>,
}

impl Aggregator {
    pub fn new(
        satellites: Arc<SatelliteService>,
        weather: Arc<SpaceWeatherService>,
        agent: Arc<AgentService>,
    ) -> Self {
        Self {
            satellites,
            weather,
            agent,
        }
    }

    pub async fn agent_query(&self, request: &AgentQueryRequest) -> ServiceResult<AgentResponse> {
        let mode = parse_mode(request.explanation_mode.as_deref())?;
        if request.query.trim().is_empty() {
            return Err(ServiceError::InvalidArgument("query must not be empty".to_string()));
        }
        if let Some(location) = &request.location {
            location.validate()?;
        }

        let context = if request.include_live_context {
            self.live_context(request.location.as_ref()).await
        } else {
            Vec::new()
        };

        match self.agent.query(&request.query, &context, mode).await {
            Err(ServiceError::UpstreamUnavailable(reason)) => {
                tracing::warn!(%reason, "Agent query degraded to fallback");
                Ok(self
                    .agent
                    .fallback_response(request.query.trim(), &context, mode))
            }
            other => other,
        }
    }

    pub async fn agent_explain(&self, request: &ExplainRequest) -> ServiceResult<ExplanationResponse> {
        let mode = parse_mode(request.mode.as_deref())?;

        match self
            .agent
            .explain(&request.query, mode, request.include_citations)
            .await
        {
            Err(ServiceError::UpstreamUnavailable(reason)) => {
                tracing::warn!(%reason, "Explanation degraded to fallback");
                Ok(self.agent.fallback_explanation(
                    request.query.trim(),
                    mode,
                    request.include_citations,
                ))
            }
            other => other,
        }
    }

    /// Never fails: without a status the feed is simply empty.
    pub async fn get_today_feed(&self) -> ActivityFeed {
        match self.weather.get_current_status().await {
            Ok(status) => build_feed(&status, Utc::now()),
            Err(e) => {
                tracing::warn!(error = %e, "Today feed built without space weather");
                build_feed_from(Vec::new())
            }
        }
    }

    pub async fn get_daily_briefing(&self) -> ServiceResult<DailyBriefing> {
        let status = self.weather.get_current_status().await.map_err(|e| {
            ServiceError::Unavailable(format!("no space weather status available: {}", e))
        })?;
        let impact = risk::explain_impact(&status);
        let feed = build_feed(&status, Utc::now());

        let mut facts = vec![status.summary.clone(), impact.actionable_guidance.clone()];
        facts.extend(feed.events.iter().skip(1).map(|event| event.title.clone()));

        let narrative = match self.agent.narrate(&facts).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(error = %e, "Briefing narrative unavailable");
                None
            }
        };

        Ok(DailyBriefing {
            generated_at: Utc::now(),
            status,
            impact,
            feed,
            narrative,
        })
    }

    /// Context lines for the LLM. Sub-fetch failures are logged and left out.
    async fn live_context(&self, location: Option<&Location>) -> Vec<String> {
        let next_pass = async {
            match location {
                Some(loc) => Some(
                    self.satellites
                        .get_next_iss_pass(
                            loc.latitude,
                            loc.longitude,
                            loc.altitude,
                            WORTH_WATCHING_ELEVATION,
                        )
                        .await,
                ),
                None => None,
            }
        };
        let (status, next_pass) = tokio::join!(self.weather.get_current_status(), next_pass);

        let mut context = Vec::new();
        match status {
            Ok(status) => context.push(format!(
                "Current space weather: {} GPS risk: {}, HF radio risk: {}, satellite risk: {}.",
                status.summary,
                status.gps_degradation_risk.as_str(),
                status.hf_radio_risk.as_str(),
                status.satellite_risk.as_str()
            )),
            Err(e) => tracing::warn!(error = %e, "Live context without space weather"),
        }
        match next_pass {
            Some(Ok(pass)) => context.push(format!(
                "Next ISS pass: {} ({:.0}° elevation, {} seconds)",
                pass.start_time.format("%Y-%m-%d %H:%M UTC"),
                pass.max_elevation,
                pass.duration_seconds
            )),
            Some(Err(e)) => tracing::warn!(error = %e, "Live context without ISS pass"),
            None => {}
        }
        context
    }
}

fn storm_scale(kp: f64) -> u8 {
    // NOAA G-scale: G1 at Kp 5 up to G5 at Kp 9
    (kp.floor() as i64 - 4).clamp(1, 5) as u8
}

fn flare_severity(class_type: &str, scale: f64) -> AlertSeverity {
    match class_type {
        "X" => AlertSeverity::High,
        "M" if scale >= 5.0 => AlertSeverity::Moderate,
        _ => AlertSeverity::Info,
    }
}

/// Turns a status into today's notable events.
pub fn build_feed(status: &SpaceWeatherStatus, now: DateTime<Utc>) -> ActivityFeed {
    let since = now - Duration::hours(FEED_LOOKBACK_HOURS);
    let mut events = vec![SpaceEvent {
        event_id: format!("sw-{}", status.timestamp.format("%Y%m%d")),
        event_type: "space_weather".to_string(),
        timestamp: status.timestamp,
        title: "Space Weather Update".to_string(),
        description: status.summary.clone(),
        severity: None,
        data: json!({
            "kp": status.kp_current,
            "kp_forecast_3h": status.kp_forecast_3h,
            "stale": status.stale,
        }),
    }];

    if status.kp_current >= STORM_KP {
        let scale = storm_scale(status.kp_current);
        events.push(SpaceEvent {
            event_id: format!("storm-{}", status.timestamp.format("%Y%m%d%H")),
            event_type: "geomagnetic_storm".to_string(),
            timestamp: status.timestamp,
            title: format!("G{} geomagnetic storm (Kp {:.1})", scale, status.kp_current),
            description: format!(
                "{}. Aurora {}.",
                risk::kp_descriptor(status.kp_current),
                status.aurora_visibility.describe()
            ),
            severity: Some(risk::severity(status.kp_current)),
            data: json!({ "kp": status.kp_current, "g_scale": scale }),
        });
    }

    for flare in status
        .recent_flares
        .iter()
        .filter(|f| f.is_strong() && f.timestamp >= since)
    {
        let region = flare
            .region
            .as_deref()
            .map(|r| format!("Region {} produced", r))
            .unwrap_or_else(|| "The Sun produced".to_string());
        let peak = flare
            .peak_time
            .map(|t| format!(", peaking at {}", t.format("%H:%M UTC")))
            .unwrap_or_default();

        events.push(SpaceEvent {
            event_id: format!("flare-{}-{}", flare.timestamp.format("%Y%m%d%H%M"), flare.label()),
            event_type: "solar_flare".to_string(),
            timestamp: flare.timestamp,
            title: format!("{} solar flare", flare.label()),
            description: format!("{} an {} flare{}.", region, flare.label(), peak),
            severity: Some(flare_severity(&flare.class_type, flare.scale)),
            data: json!({
                "class": flare.label(),
                "region": flare.region,
                "peak_time": flare.peak_time,
            }),
        });
    }

    for cme in status.active_cmes.iter().filter(|c| c.timestamp >= since) {
        let arrival = cme
            .estimated_arrival
            .map(|t| format!(" Estimated arrival {}.", t.format("%Y-%m-%d %H:%M UTC")))
            .unwrap_or_default();

        events.push(SpaceEvent {
            event_id: format!("cme-{}", cme.timestamp.format("%Y%m%d%H%M")),
            event_type: "cme".to_string(),
            timestamp: cme.timestamp,
            title: if cme.earth_directed {
                "Earth-directed coronal mass ejection".to_string()
            } else {
                "Coronal mass ejection".to_string()
            },
            description: format!("CME launched at {:.0} km/s.{}", cme.speed_kms, arrival),
            severity: Some(if cme.earth_directed {
                AlertSeverity::Moderate
            } else {
                AlertSeverity::Info
            }),
            data: json!({
                "speed_kms": cme.speed_kms,
                "earth_directed": cme.earth_directed,
                "estimated_arrival": cme.estimated_arrival,
            }),
        });
    }

    build_feed_from(events)
}

fn build_feed_from(mut events: Vec<SpaceEvent>) -> ActivityFeed {
    events.sort_by_key(|e| e.timestamp);
    ActivityFeed {
        period: "today".to_string(),
        summary: format!("Today's space activity: {} notable events", events.len()),
        events,
    }
}
