use super::types::{Cme, SolarFlare};
use super::SpaceWeatherFeed;
use crate::upstream::{ProviderError, UpstreamClient};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const KP_PATH: &str = "products/noaa-planetary-k-index.json";
const KP_FORECAST_PATH: &str = "products/noaa-planetary-k-index-forecast.json";
const XRAY_FLARES_PATH: &str = "json/goes/primary/xray-flares-7-day.json";

/// NOAA SWPC JSON products plus the NASA DONKI CME catalogue.
pub struct SwpcClient {
    http: UpstreamClient,
    swpc_base_url: String,
    donki_base_url: String,
    nasa_api_key: String,
}

impl SwpcClient {
    pub fn new(
        swpc_base_url: String,
        donki_base_url: String,
        nasa_api_key: String,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http: UpstreamClient::new(timeout)?,
            swpc_base_url,
            donki_base_url,
            nasa_api_key,
        })
    }

    fn swpc_url(&self, path: &str) -> String {
        format!("{}/{}", self.swpc_base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl SpaceWeatherFeed for SwpcClient {
    async fn current_kp(&self) -> Result<f64, ProviderError> {
        let json = self.http.get_json(&self.swpc_url(KP_PATH), &[]).await?;
        parse_latest_kp(&json)
    }

    async fn kp_forecast_3h(&self) -> Result<Option<f64>, ProviderError> {
        let json = self
            .http
            .get_json(&self.swpc_url(KP_FORECAST_PATH), &[])
            .await?;
        parse_kp_forecast(&json, Utc::now())
    }

    async fn recent_flares(&self, since: DateTime<Utc>) -> Result<Vec<SolarFlare>, ProviderError> {
        let json = self
            .http
            .get_json(&self.swpc_url(XRAY_FLARES_PATH), &[])
            .await?;
        parse_xray_flares(json, since)
    }

    async fn active_cmes(&self, since: DateTime<Utc>) -> Result<Vec<Cme>, ProviderError> {
        let url = format!("{}/CME", self.donki_base_url.trim_end_matches('/'));
        let start = since.date_naive().to_string();
        let end = Utc::now().date_naive().to_string();
        let json = self
            .http
            .get_json(
                &url,
                &[
                    ("startDate", start.as_str()),
                    ("endDate", end.as_str()),
                    ("api_key", self.nasa_api_key.as_str()),
                ],
            )
            .await?;
        parse_donki_cmes(json, since)
    }
}

/// Accepts the timestamp shapes used across SWPC and DONKI products.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    let trimmed = raw.trim_end_matches('Z');
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Splits a GOES class such as "M5.2" into its letter and scale.
pub fn parse_flare_class(raw: &str) -> Option<(String, f64)> {
    let raw = raw.trim();
    let mut chars = raw.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    if !matches!(letter, 'A' | 'B' | 'C' | 'M' | 'X') {
        return None;
    }
    let scale = chars.as_str().trim();
    let scale = if scale.is_empty() { 1.0 } else { scale.parse::<f64>().ok()? };
    if !scale.is_finite() || scale < 0.0 {
        return None;
    }
    Some((letter.to_string(), scale))
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

struct KpRow {
    time: Option<DateTime<Utc>>,
    kp: Option<f64>,
    observed: Option<String>,
}

/// Rows are either `[time_tag, kp, ...]` arrays behind a header row, or objects.
fn kp_rows(json: &Value) -> Result<Vec<KpRow>, ProviderError> {
    let rows = json
        .as_array()
        .ok_or_else(|| ProviderError::InvalidPayload("Kp product is not an array".to_string()))?;

    Ok(rows
        .iter()
        .filter_map(|row| match row {
            Value::Array(cells) => Some(KpRow {
                time: cells.first().and_then(Value::as_str).and_then(parse_timestamp),
                kp: cells.get(1).and_then(number),
                observed: cells.get(2).and_then(Value::as_str).map(str::to_string),
            }),
            Value::Object(fields) => Some(KpRow {
                time: fields.get("time_tag").and_then(Value::as_str).and_then(parse_timestamp),
                kp: fields
                    .get("Kp")
                    .or_else(|| fields.get("kp"))
                    .or_else(|| fields.get("kp_index"))
                    .and_then(number),
                observed: fields.get("observed").and_then(Value::as_str).map(str::to_string),
            }),
            _ => None,
        })
        .collect())
}

pub(crate) fn parse_latest_kp(json: &Value) -> Result<f64, ProviderError> {
    kp_rows(json)?
        .into_iter()
        .rev()
        .find_map(|row| row.time.and(row.kp))
        .filter(|kp| (0.0..=9.0).contains(kp))
        .ok_or_else(|| ProviderError::InvalidPayload("no Kp observation in product".to_string()))
}

/// First predicted Kp at or after `now`.
pub(crate) fn parse_kp_forecast(json: &Value, now: DateTime<Utc>) -> Result<Option<f64>, ProviderError> {
    Ok(kp_rows(json)?.into_iter().find_map(|row| {
        let predicted = row.observed.as_deref() == Some("predicted");
        match (row.time, row.kp) {
            (Some(time), Some(kp)) if predicted && time >= now => Some(kp),
            _ => None,
        }
    }))
}

#[derive(Debug, Deserialize)]
struct XrayFlare {
    begin_time: Option<String>,
    max_time: Option<String>,
    end_time: Option<String>,
    max_class: Option<String>,
}

pub(crate) fn parse_xray_flares(json: Value, since: DateTime<Utc>) -> Result<Vec<SolarFlare>, ProviderError> {
    let entries: Vec<XrayFlare> = serde_json::from_value(json)?;

    let mut flares: Vec<SolarFlare> = entries
        .into_iter()
        .filter_map(|entry| {
            let timestamp = entry.begin_time.as_deref().and_then(parse_timestamp)?;
            let (class_type, scale) = entry.max_class.as_deref().and_then(parse_flare_class)?;
            Some(SolarFlare {
                timestamp,
                class_type,
                scale,
                region: None,
                peak_time: entry.max_time.as_deref().and_then(parse_timestamp),
                end_time: entry.end_time.as_deref().and_then(parse_timestamp),
            })
        })
        .filter(|flare| flare.timestamp >= since)
        .collect();

    flares.sort_by_key(|f| f.timestamp);
    Ok(flares)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DonkiCme {
    start_time: Option<String>,
    #[serde(default)]
    cme_analyses: Option<Vec<DonkiAnalysis>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DonkiAnalysis {
    speed: Option<f64>,
    #[serde(default)]
    is_most_accurate: Option<bool>,
    #[serde(default)]
    enlil_list: Option<Vec<DonkiEnlil>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DonkiEnlil {
    estimated_shock_arrival_time: Option<String>,
    #[serde(default, rename = "isEarthGB")]
    is_earth_gb: Option<bool>,
}

pub(crate) fn parse_donki_cmes(json: Value, since: DateTime<Utc>) -> Result<Vec<Cme>, ProviderError> {
    // DONKI answers an empty range with null
    if json.is_null() {
        return Ok(Vec::new());
    }
    let entries: Vec<DonkiCme> = serde_json::from_value(json)?;

    let mut cmes: Vec<Cme> = entries
        .into_iter()
        .filter_map(|entry| {
            let timestamp = entry.start_time.as_deref().and_then(parse_timestamp)?;
            let analyses = entry.cme_analyses.unwrap_or_default();
            let analysis = analyses
                .iter()
                .find(|a| a.is_most_accurate == Some(true))
                .or_else(|| analyses.first())?;
            let speed_kms = analysis.speed?;

            let enlil = analysis.enlil_list.as_deref().unwrap_or_default();
            let estimated_arrival = enlil
                .iter()
                .filter_map(|e| e.estimated_shock_arrival_time.as_deref())
                .find_map(parse_timestamp);
            let earth_directed =
                estimated_arrival.is_some() || enlil.iter().any(|e| e.is_earth_gb == Some(true));

            Some(Cme {
                timestamp,
                speed_kms,
                earth_directed,
                estimated_arrival,
                impact_probability: None,
            })
        })
        .filter(|cme| cme.timestamp >= since)
        .collect();

    cmes.sort_by_key(|c| c.timestamp);
    Ok(cmes)
}
