use super::catalog::TrackedSatellite;
use super::types::{Observer, RawPass, SatellitePasses};
use super::PassProvider;
use crate::upstream::{ProviderError, UpstreamClient};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Minimum number of seconds a pass must be optically visible for N2YO to list it.
const MIN_VISIBILITY_SECS: u32 = 60;

#[derive(Debug, Deserialize)]
struct VisualPassesResponse {
    info: PassesInfo,
    #[serde(default)]
    passes: Vec<RawPass>,
}

#[derive(Debug, Deserialize)]
struct PassesInfo {
    satid: u32,
    satname: String,
}

pub struct N2yoClient {
    http: UpstreamClient,
    base_url: String,
    api_key: String,
}

impl N2yoClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            http: UpstreamClient::new(timeout)?,
            base_url,
            api_key,
        })
    }

    fn visual_passes_url(&self, norad_id: u32, observer: &Observer, days: u32) -> String {
        format!(
            "{}/visualpasses/{}/{}/{}/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            norad_id,
            observer.lat,
            observer.lon,
            observer.alt_m,
            days,
            MIN_VISIBILITY_SECS
        )
    }
}

#[async_trait]
impl PassProvider for N2yoClient {
    async fn visual_passes(
        &self,
        satellite: &TrackedSatellite,
        observer: &Observer,
        days: u32,
    ) -> Result<SatellitePasses, ProviderError> {
        let url = self.visual_passes_url(satellite.norad_id, observer, days.clamp(1, 10));
        let json = self
            .http
            .get_json(&url, &[("apiKey", self.api_key.as_str())])
            .await?;

        parse_visual_passes(json)
    }
}

pub(crate) fn parse_visual_passes(json: Value) -> Result<SatellitePasses, ProviderError> {
    // N2YO reports a bad key or quota problem as 200 with an "error" field
    if let Some(message) = json.get("error").and_then(Value::as_str) {
        return Err(ProviderError::ApiError(message.to_string()));
    }

    let response: VisualPassesResponse = serde_json::from_value(json)?;
    Ok(SatellitePasses {
        satellite_id: response.info.satid,
        satellite_name: response.info.satname,
        passes: response.passes,
    })
}
