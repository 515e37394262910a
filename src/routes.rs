use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    agent::{
        knowledge::{Citation, KnowledgeBase},
        llm::LanguageModel,
        AgentResponse, AgentService, ExplanationMode, ExplanationResponse,
    },
    aggregator::{
        ActivityFeed, AgentQueryRequest, Aggregator, DailyBriefing, ExplainRequest, Location,
        SpaceEvent,
    },
    cache::TtlCache,
    error::{ErrorBody, ErrorDetail, ServiceError},
    satellites::{
        types::{OrbitType, PassPrediction, SatelliteProfile},
        PassProvider, PassQuery, SatelliteService,
    },
    space_weather::{
        types::{
            AlertSeverity, AuroraVisibility, Cme, ImpactExplanation, RiskLevel, SolarFlare,
            SpaceWeatherStatus,
        },
        SpaceWeatherFeed, SpaceWeatherService,
    },
};

/// The three upstream capabilities, live or fixture-backed.
pub struct Providers {
    pub passes: Arc<dyn PassProvider>,
    pub weather: Arc<dyn SpaceWeatherFeed>,
    pub model: Arc<dyn LanguageModel>,
}

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub demo_mode: bool,
    pub satellites: Arc<SatelliteService>,
    pub weather: Arc<SpaceWeatherService>,
    pub aggregator: Arc<Aggregator>,
}

impl AppState {
    pub fn new(
        providers: Providers,
        demo_mode: bool,
        upstream_timeout: Duration,
        llm_timeout: Duration,
    ) -> Self {
        let satellites = Arc::new(SatelliteService::new(
            providers.passes,
            TtlCache::new("passes"),
            TtlCache::new("profiles"),
            upstream_timeout,
        ));
        let weather = Arc::new(SpaceWeatherService::new(
            providers.weather,
            TtlCache::new("space_weather"),
            upstream_timeout,
        ));
        let agent = Arc::new(AgentService::new(
            providers.model,
            KnowledgeBase::default(),
            llm_timeout,
        ));
        let aggregator = Arc::new(Aggregator::new(
            satellites.clone(),
            weather.clone(),
            agent,
        ));

        Self {
            demo_mode,
            satellites,
            weather,
            aggregator,
        }
    }
}

// Request/Response types
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OverheadQuery {
    /// Observer latitude, -90 to 90.
    pub lat: f64,
    /// Observer longitude, -180 to 180.
    pub lon: f64,
    /// Altitude in meters (default 0).
    pub alt: Option<f64>,
    /// Time window in hours, 1 to 168 (default 24).
    pub hours: Option<u32>,
    /// Minimum peak elevation in degrees (default 10).
    pub min_elevation: Option<f64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NextPassQuery {
    pub lat: f64,
    pub lon: f64,
    pub alt: Option<f64>,
    /// Minimum peak elevation in degrees (default 30).
    pub min_elevation: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub demo_mode: bool,
}

// Route handlers
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        demo_mode: state.demo_mode,
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/satellites/overhead",
    params(OverheadQuery),
    responses(
        (status = 200, description = "Upcoming passes, earliest first", body = [PassPrediction]),
        (status = 400, description = "Invalid location or window", body = ErrorBody),
        (status = 500, description = "Pass provider unavailable", body = ErrorBody)
    ),
    tag = "satellites"
)]
pub async fn get_overhead_satellites(
    State(state): State<AppState>,
    Query(params): Query<OverheadQuery>,
) -> Result<Json<Vec<PassPrediction>>, ServiceError> {
    let query = PassQuery {
        lat: params.lat,
        lon: params.lon,
        alt: params.alt.unwrap_or(0.0),
        window_hours: params.hours.unwrap_or(24),
        min_elevation: params.min_elevation.unwrap_or(10.0),
    };
    let passes = state.satellites.get_overhead_satellites(&query).await?;
    Ok(Json(passes))
}

#[utoipa::path(
    get,
    path = "/api/v1/satellites/iss/next-pass",
    params(NextPassQuery),
    responses(
        (status = 200, description = "Next ISS pass", body = PassPrediction),
        (status = 400, description = "Invalid location", body = ErrorBody),
        (status = 404, description = "No pass in the next 48 hours", body = ErrorBody),
        (status = 500, description = "Pass provider unavailable", body = ErrorBody)
    ),
    tag = "satellites"
)]
pub async fn get_next_iss_pass(
    State(state): State<AppState>,
    Query(params): Query<NextPassQuery>,
) -> Result<Json<PassPrediction>, ServiceError> {
    let pass = state
        .satellites
        .get_next_iss_pass(
            params.lat,
            params.lon,
            params.alt.unwrap_or(0.0),
            params.min_elevation.unwrap_or(30.0),
        )
        .await?;
    Ok(Json(pass))
}

#[utoipa::path(
    get,
    path = "/api/v1/satellites/profile/{name}",
    params(("name" = String, Path, description = "Satellite name, alias or NORAD id")),
    responses(
        (status = 200, description = "Satellite profile", body = SatelliteProfile),
        (status = 404, description = "Unknown satellite", body = ErrorBody)
    ),
    tag = "satellites"
)]
pub async fn get_satellite_profile(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SatelliteProfile>, ServiceError> {
    let profile = state.satellites.get_satellite_profile(&name).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    get,
    path = "/api/v1/space-weather/status",
    responses(
        (status = 200, description = "Current status, possibly stale", body = SpaceWeatherStatus),
        (status = 500, description = "Feeds down and nothing cached", body = ErrorBody)
    ),
    tag = "space-weather"
)]
pub async fn get_space_weather_status(
    State(state): State<AppState>,
) -> Result<Json<SpaceWeatherStatus>, ServiceError> {
    let status = state.weather.get_current_status().await?;
    Ok(Json(status))
}

#[utoipa::path(
    get,
    path = "/api/v1/space-weather/impact-explanation",
    responses(
        (status = 200, description = "Impact of current conditions", body = ImpactExplanation),
        (status = 503, description = "No status available", body = ErrorBody)
    ),
    tag = "space-weather"
)]
pub async fn get_impact_explanation(
    State(state): State<AppState>,
) -> Result<Json<ImpactExplanation>, ServiceError> {
    let impact = state.weather.get_impact_explanation().await?;
    Ok(Json(impact))
}

#[utoipa::path(
    post,
    path = "/api/v1/agent/query",
    request_body = AgentQueryRequest,
    responses(
        (status = 200, description = "Agent answer; degraded when the LLM is down", body = AgentResponse),
        (status = 400, description = "Empty query or unknown mode", body = ErrorBody)
    ),
    tag = "agent"
)]
pub async fn agent_query(
    State(state): State<AppState>,
    Json(request): Json<AgentQueryRequest>,
) -> Result<Json<AgentResponse>, ServiceError> {
    let response = state.aggregator.agent_query(&request).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/agent/explain",
    request_body = ExplainRequest,
    responses(
        (status = 200, description = "Explanation with citations", body = ExplanationResponse),
        (status = 400, description = "Empty query or unknown mode", body = ErrorBody)
    ),
    tag = "agent"
)]
pub async fn agent_explain(
    State(state): State<AppState>,
    Json(request): Json<ExplainRequest>,
) -> Result<Json<ExplanationResponse>, ServiceError> {
    let response = state.aggregator.agent_explain(&request).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/feed/today",
    responses((status = 200, description = "Today's notable events", body = ActivityFeed)),
    tag = "feed"
)]
pub async fn get_today_feed(State(state): State<AppState>) -> Json<ActivityFeed> {
    Json(state.aggregator.get_today_feed().await)
}

#[utoipa::path(
    get,
    path = "/api/v1/briefing/daily",
    responses(
        (status = 200, description = "Daily briefing", body = DailyBriefing),
        (status = 503, description = "No status available", body = ErrorBody)
    ),
    tag = "feed"
)]
pub async fn get_daily_briefing(
    State(state): State<AppState>,
) -> Result<Json<DailyBriefing>, ServiceError> {
    let briefing = state.aggregator.get_daily_briefing().await?;
    Ok(Json(briefing))
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Space Agent API", description = "Satellite passes, space weather and an AI explainer"),
    paths(
        health,
        get_overhead_satellites,
        get_next_iss_pass,
        get_satellite_profile,
        get_space_weather_status,
        get_impact_explanation,
        agent_query,
        agent_explain,
        get_today_feed,
        get_daily_briefing,
    ),
    components(schemas(
        HealthResponse,
        PassPrediction,
        SatelliteProfile,
        OrbitType,
        SpaceWeatherStatus,
        SolarFlare,
        Cme,
        RiskLevel,
        AuroraVisibility,
        AlertSeverity,
        ImpactExplanation,
        AgentQueryRequest,
        Location,
        ExplainRequest,
        AgentResponse,
        ExplanationResponse,
        ExplanationMode,
        Citation,
        SpaceEvent,
        ActivityFeed,
        DailyBriefing,
        ErrorBody,
        ErrorDetail,
    )),
    tags(
        (name = "satellites", description = "Pass predictions and satellite profiles"),
        (name = "space-weather", description = "NOAA/NASA space weather"),
        (name = "agent", description = "LLM-backed explanations"),
        (name = "feed", description = "Activity feed and daily briefing")
    )
)]
pub struct ApiDoc;

// Create the router
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/satellites/overhead", get(get_overhead_satellites))
        .route("/satellites/iss/next-pass", get(get_next_iss_pass))
        .route("/satellites/profile/:name", get(get_satellite_profile))
        .route("/space-weather/status", get(get_space_weather_status))
        .route("/space-weather/impact-explanation", get(get_impact_explanation))
        .route("/agent/query", post(agent_query))
        .route("/agent/explain", post(agent_explain))
        .route("/feed/today", get(get_today_feed))
        .route("/briefing/daily", get(get_daily_briefing));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .merge(SwaggerUi::new("/api/docs").url("/api/v1/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}
