//! Static reference data for the satellites the service tracks.

use super::types::{OrbitType, SatelliteProfile};
use chrono::{TimeZone, Utc};

pub const ISS_NORAD_ID: u32 = 25544;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedSatellite {
    pub key: &'static str,
    pub norad_id: u32,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

pub const TRACKED: [TrackedSatellite; 3] = [
    TrackedSatellite {
        key: "ISS",
        norad_id: ISS_NORAD_ID,
        name: "ISS (ZARYA)",
        aliases: &["international space station", "zarya", "space station"],
    },
    TrackedSatellite {
        key: "HUBBLE",
        norad_id: 20580,
        name: "HST",
        aliases: &["hubble space telescope", "hst"],
    },
    TrackedSatellite {
        key: "TIANGONG",
        norad_id: 48274,
        name: "TIANHE",
        aliases: &["tiangong space station", "tianhe", "css"],
    },
];

pub fn iss() -> &'static TrackedSatellite {
    &TRACKED[0]
}

/// Case-insensitive lookup by key, display name, alias or NORAD id.
pub fn find(query: &str) -> Option<&'static TrackedSatellite> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    TRACKED.iter().find(|sat| {
        sat.key.to_lowercase() == needle
            || sat.name.to_lowercase() == needle
            || sat.norad_id.to_string() == needle
            || sat.aliases.iter().any(|alias| *alias == needle)
    })
}

pub fn profile(satellite: &TrackedSatellite) -> SatelliteProfile {
    match satellite.key {
        "HUBBLE" => SatelliteProfile {
            satellite_id: satellite.norad_id,
            name: "Hubble Space Telescope".to_string(),
            norad_id: satellite.norad_id.to_string(),
            purpose: "Space telescope for astronomical observations".to_string(),
            orbit_type: OrbitType::Leo,
            altitude_km: 547.0,
            speed_kmh: 27_300.0,
            launch_date: Utc.with_ymd_and_hms(1990, 4, 24, 12, 33, 51).single(),
            country: Some("USA/ESA".to_string()),
            why_care: "Hubble has reshaped astronomy with its images and measurements \
                       of the expanding universe, operating since 1990."
                .to_string(),
            recent_changes: None,
        },
        "TIANGONG" => SatelliteProfile {
            satellite_id: satellite.norad_id,
            name: "Tiangong Space Station".to_string(),
            norad_id: satellite.norad_id.to_string(),
            purpose: "Chinese crewed space station".to_string(),
            orbit_type: OrbitType::Leo,
            altitude_km: 390.0,
            speed_kmh: 27_500.0,
            launch_date: Utc.with_ymd_and_hms(2021, 4, 29, 3, 23, 15).single(),
            country: Some("China".to_string()),
            why_care: "China's long-term space station, continuously crewed since 2022 \
                       and often bright enough to see with the naked eye."
                .to_string(),
            recent_changes: None,
        },
        _ => SatelliteProfile {
            satellite_id: satellite.norad_id,
            name: "International Space Station".to_string(),
            norad_id: satellite.norad_id.to_string(),
            purpose: "Research laboratory and human spaceflight".to_string(),
            orbit_type: OrbitType::Leo,
            altitude_km: 408.0,
            speed_kmh: 27_600.0,
            launch_date: Utc.with_ymd_and_hms(1998, 11, 20, 6, 40, 0).single(),
            country: Some("International".to_string()),
            why_care: "The ISS is continuously inhabited and hosts microgravity research. \
                       It is the brightest satellite in the sky and easy to spot."
                .to_string(),
            recent_changes: None,
        },
    }
}
