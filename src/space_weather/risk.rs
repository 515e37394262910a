//! Risk assessment rules. Everything here is a pure function of the readings
//! so a status can be recomputed on every fetch.

use super::types::*;
use chrono::{DateTime, Duration, Utc};

pub const FLARE_LOOKBACK_HOURS: i64 = 24;
const STRONG_M_CLASS_SCALE: f64 = 5.0;

pub fn kp_tier(kp: f64) -> RiskLevel {
    if kp >= 7.0 {
        RiskLevel::High
    } else if kp >= 6.0 {
        RiskLevel::Moderate
    } else if kp >= 5.0 {
        RiskLevel::Minor
    } else {
        RiskLevel::None
    }
}

pub fn kp_descriptor(kp: f64) -> &'static str {
    if kp < 4.0 {
        "Quiet geomagnetic conditions"
    } else if kp < 5.0 {
        "Unsettled geomagnetic conditions"
    } else if kp < 6.0 {
        "Active geomagnetic conditions"
    } else if kp < 7.0 {
        "Minor geomagnetic storm"
    } else if kp < 8.0 {
        "Moderate geomagnetic storm"
    } else if kp < 9.0 {
        "Strong geomagnetic storm"
    } else {
        "Severe geomagnetic storm"
    }
}

fn within_lookback(flare: &SolarFlare, now: DateTime<Utc>) -> bool {
    flare.timestamp >= now - Duration::hours(FLARE_LOOKBACK_HOURS)
}

pub fn flare_tier(flares: &[SolarFlare], now: DateTime<Utc>) -> RiskLevel {
    flares
        .iter()
        .filter(|f| within_lookback(f, now))
        .map(|f| match f.class_type.as_str() {
            "X" => RiskLevel::High,
            "M" if f.scale >= STRONG_M_CLASS_SCALE => RiskLevel::Moderate,
            "M" => RiskLevel::Minor,
            _ => RiskLevel::None,
        })
        .max()
        .unwrap_or(RiskLevel::None)
}

pub fn gps_risk(kp: f64, cmes: &[Cme]) -> RiskLevel {
    let tier = kp_tier(kp);
    if cmes.iter().any(|c| c.earth_directed) {
        tier.max(RiskLevel::Moderate)
    } else {
        tier
    }
}

pub fn hf_radio_risk(kp: f64, flares: &[SolarFlare], now: DateTime<Utc>) -> RiskLevel {
    kp_tier(kp).max(flare_tier(flares, now))
}

pub fn satellite_risk(kp: f64, cmes: &[Cme]) -> RiskLevel {
    let steps = if cmes.iter().any(|c| c.earth_directed) {
        2
    } else if !cmes.is_empty() {
        1
    } else {
        0
    };
    kp_tier(kp).escalate(steps)
}

pub fn aurora_visibility(kp: f64) -> AuroraVisibility {
    if kp >= 9.0 {
        AuroraVisibility::VisibleLowLatitudes
    } else if kp >= 7.0 {
        AuroraVisibility::VisibleMidLatitudes
    } else if kp >= 5.0 {
        AuroraVisibility::VisibleHighLatitudes
    } else if kp >= 4.0 {
        AuroraVisibility::VisiblePolarRegions
    } else {
        AuroraVisibility::Unlikely
    }
}

pub fn summary(kp: f64, gps: RiskLevel, hf: RiskLevel, sat: RiskLevel) -> String {
    let mut text = format!("Status: {} (Kp {:.1}).", kp_descriptor(kp), kp);
    let top = gps.max(hf).max(sat);

    let affected: Vec<&str> = [(gps, "GPS"), (hf, "HF radio"), (sat, "satellite operations")]
        .iter()
        .filter(|(level, _)| *level == top)
        .map(|(_, area)| *area)
        .collect();
    let areas = affected.join(", ");

    match top {
        RiskLevel::None => text.push_str(" Most users unaffected."),
        RiskLevel::Minor => {
            text.push_str(&format!(" Minor {} effects possible; most users unaffected.", areas))
        }
        RiskLevel::Moderate => {
            text.push_str(&format!(" Moderate {} disruption possible.", areas))
        }
        RiskLevel::High => text.push_str(&format!(
            " High risk of {} disruption; plan around it.",
            areas
        )),
    }

    text
}

/// Builds a full status from raw readings at time `now`.
pub fn assess(readings: WeatherReadings, now: DateTime<Utc>) -> SpaceWeatherStatus {
    let kp = readings.kp_current.clamp(0.0, 9.0);
    let mut flares: Vec<SolarFlare> = readings
        .flares
        .into_iter()
        .filter(|f| within_lookback(f, now))
        .collect();
    flares.sort_by_key(|f| f.timestamp);
    let mut cmes = readings.cmes;
    cmes.sort_by_key(|c| c.timestamp);

    let gps = gps_risk(kp, &cmes);
    let hf = hf_radio_risk(kp, &flares, now);
    let sat = satellite_risk(kp, &cmes);

    SpaceWeatherStatus {
        timestamp: now,
        kp_current: kp,
        kp_forecast_3h: readings.kp_forecast_3h,
        summary: summary(kp, gps, hf, sat),
        recent_flares: flares,
        active_cmes: cmes,
        gps_degradation_risk: gps,
        hf_radio_risk: hf,
        satellite_risk: sat,
        aurora_visibility: aurora_visibility(kp),
        stale: false,
    }
}

pub fn severity(kp: f64) -> AlertSeverity {
    if kp >= 9.0 {
        AlertSeverity::Severe
    } else if kp >= 7.0 {
        AlertSeverity::High
    } else if kp >= 5.0 {
        AlertSeverity::Moderate
    } else {
        AlertSeverity::Info
    }
}

pub fn explain_impact(status: &SpaceWeatherStatus) -> ImpactExplanation {
    let mut what_happened = vec![format!("Kp index: {:.1}", status.kp_current)];

    let strong: Vec<&SolarFlare> = status.recent_flares.iter().filter(|f| f.is_strong()).collect();
    if let Some(strongest) = strong.iter().max_by(|a, b| {
        a.class_type
            .cmp(&b.class_type)
            .then(a.scale.total_cmp(&b.scale))
    }) {
        what_happened.push(format!(
            "{} M/X-class solar flare(s), strongest {}",
            strong.len(),
            strongest.label()
        ));
    }
    if !status.active_cmes.is_empty() {
        let earth_directed = status.active_cmes.iter().filter(|c| c.earth_directed).count();
        what_happened.push(format!(
            "{} active CME(s), {} Earth-directed",
            status.active_cmes.len(),
            earth_directed
        ));
    }

    let mut potential_impacts = Vec::new();
    if status.gps_degradation_risk != RiskLevel::None {
        potential_impacts.push("GPS accuracy may be reduced for precision applications".to_string());
    }
    if status.hf_radio_risk != RiskLevel::None {
        potential_impacts.push("HF radio communications may experience disruption".to_string());
    }
    if status.satellite_risk != RiskLevel::None {
        potential_impacts.push("Satellite operations may experience anomalies".to_string());
    }
    if status.aurora_visibility != AuroraVisibility::Unlikely {
        potential_impacts.push("Aurora may be visible at lower latitudes than usual".to_string());
    }

    let mut who_should_care: Vec<String> = Vec::new();
    if status.gps_degradation_risk >= RiskLevel::Moderate {
        who_should_care.extend(
            ["Drone operators", "Surveyors", "Aviation professionals"].map(String::from),
        );
    }
    if status.hf_radio_risk >= RiskLevel::Moderate {
        who_should_care.extend(
            ["Ham radio operators", "Maritime communications", "Emergency services"]
                .map(String::from),
        );
    }
    if status.satellite_risk >= RiskLevel::Moderate {
        who_should_care.extend(["Satellite operators", "Space agencies"].map(String::from));
    }
    if who_should_care.is_empty() {
        who_should_care.push("Space weather enthusiasts".to_string());
    }

    let actionable_guidance = if status.kp_current < 5.0 {
        "Continue normal operations. Monitor for updates."
    } else if status.kp_current < 7.0 {
        "Monitor GPS accuracy if doing precision work. Ham radio operators may notice propagation changes."
    } else {
        "Consider delaying precision GPS work. Satellite operators should monitor spacecraft health. \
         Aurora photographers: good opportunity tonight!"
    };

    ImpactExplanation {
        what_happened: what_happened.join("; "),
        potential_impacts,
        who_should_care,
        actionable_guidance: actionable_guidance.to_string(),
        severity: severity(status.kp_current),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flare(class_type: &str, scale: f64, hours_ago: i64, now: DateTime<Utc>) -> SolarFlare {
        SolarFlare {
            timestamp: now - Duration::hours(hours_ago),
            class_type: class_type.to_string(),
            scale,
            region: None,
            peak_time: None,
            end_time: None,
        }
    }

    fn cme(earth_directed: bool, now: DateTime<Utc>) -> Cme {
        Cme {
            timestamp: now - Duration::hours(6),
            speed_kms: 800.0,
            earth_directed,
            estimated_arrival: None,
            impact_probability: None,
        }
    }

    #[test]
    fn test_kp_tier_boundaries() {
        assert_eq!(kp_tier(0.0), RiskLevel::None);
        assert_eq!(kp_tier(4.99), RiskLevel::None);
        assert_eq!(kp_tier(5.0), RiskLevel::Minor);
        assert_eq!(kp_tier(5.99), RiskLevel::Minor);
        assert_eq!(kp_tier(6.0), RiskLevel::Moderate);
        assert_eq!(kp_tier(6.99), RiskLevel::Moderate);
        assert_eq!(kp_tier(7.0), RiskLevel::High);
        assert_eq!(kp_tier(9.0), RiskLevel::High);
    }

    #[test]
    fn test_gps_risk_follows_kp_and_earth_directed_cme() {
        let now = Utc::now();
        assert_eq!(gps_risk(4.99, &[]), RiskLevel::None);
        assert_eq!(gps_risk(5.0, &[]), RiskLevel::Minor);
        assert_eq!(gps_risk(2.0, &[cme(false, now)]), RiskLevel::None);
        assert_eq!(gps_risk(2.0, &[cme(true, now)]), RiskLevel::Moderate);
        assert_eq!(gps_risk(7.5, &[cme(true, now)]), RiskLevel::High);
    }

    #[test]
    fn test_flare_tier() {
        let now = Utc::now();
        assert_eq!(flare_tier(&[], now), RiskLevel::None);
        assert_eq!(flare_tier(&[flare("C", 9.9, 1, now)], now), RiskLevel::None);
        assert_eq!(flare_tier(&[flare("M", 1.2, 1, now)], now), RiskLevel::Minor);
        assert_eq!(flare_tier(&[flare("M", 5.0, 1, now)], now), RiskLevel::Moderate);
        assert_eq!(
            flare_tier(&[flare("M", 2.0, 1, now), flare("X", 1.0, 20, now)], now),
            RiskLevel::High
        );
        // outside the lookback window
        assert_eq!(flare_tier(&[flare("X", 3.0, 25, now)], now), RiskLevel::None);
    }

    #[test]
    fn test_hf_radio_is_max_of_kp_and_flares() {
        let now = Utc::now();
        assert_eq!(hf_radio_risk(6.5, &[flare("M", 1.0, 2, now)], now), RiskLevel::Moderate);
        assert_eq!(hf_radio_risk(2.0, &[flare("X", 1.0, 2, now)], now), RiskLevel::High);
        assert_eq!(hf_radio_risk(5.0, &[], now), RiskLevel::Minor);
    }

    #[test]
    fn test_satellite_risk_escalates_with_cmes() {
        let now = Utc::now();
        assert_eq!(satellite_risk(3.0, &[]), RiskLevel::None);
        assert_eq!(satellite_risk(3.0, &[cme(false, now)]), RiskLevel::Minor);
        assert_eq!(satellite_risk(3.0, &[cme(true, now)]), RiskLevel::Moderate);
        assert_eq!(satellite_risk(6.0, &[cme(true, now)]), RiskLevel::High);
        assert_eq!(satellite_risk(8.0, &[cme(false, now)]), RiskLevel::High);
    }

    #[test]
    fn test_aurora_tiers() {
        assert_eq!(aurora_visibility(3.9), AuroraVisibility::Unlikely);
        assert_eq!(aurora_visibility(4.0), AuroraVisibility::VisiblePolarRegions);
        assert_eq!(aurora_visibility(5.0), AuroraVisibility::VisibleHighLatitudes);
        assert_eq!(aurora_visibility(7.0), AuroraVisibility::VisibleMidLatitudes);
        assert_eq!(aurora_visibility(9.0), AuroraVisibility::VisibleLowLatitudes);
    }

    #[test]
    fn test_active_conditions_with_m_flare() {
        let now = Utc::now();
        let status = assess(
            WeatherReadings {
                kp_current: 5.0,
                kp_forecast_3h: Some(5.3),
                flares: vec![flare("M", 2.1, 3, now)],
                cmes: vec![],
            },
            now,
        );

        assert_eq!(status.gps_degradation_risk, RiskLevel::Minor);
        assert!(status.hf_radio_risk >= RiskLevel::Minor);
        assert!(status.summary.contains("5.0"));
        assert!(status.summary.starts_with("Status: Active geomagnetic conditions"));
        assert!(!status.stale);
    }

    #[test]
    fn test_assess_drops_old_flares_and_orders_rest() {
        let now = Utc::now();
        let status = assess(
            WeatherReadings {
                kp_current: 2.0,
                kp_forecast_3h: None,
                flares: vec![
                    flare("C", 1.0, 2, now),
                    flare("M", 1.0, 30, now),
                    flare("C", 4.0, 10, now),
                ],
                cmes: vec![],
            },
            now,
        );

        assert_eq!(status.recent_flares.len(), 2);
        assert!(status.recent_flares[0].timestamp < status.recent_flares[1].timestamp);
        assert_eq!(status.summary, "Status: Quiet geomagnetic conditions (Kp 2.0). Most users unaffected.");
    }

    #[test]
    fn test_summary_names_top_risk() {
        let text = summary(6.2, RiskLevel::Moderate, RiskLevel::Moderate, RiskLevel::Minor);
        assert_eq!(
            text,
            "Status: Minor geomagnetic storm (Kp 6.2). Moderate GPS, HF radio disruption possible."
        );
    }

    #[test]
    fn test_impact_explanation_for_quiet_conditions() {
        let status = assess(WeatherReadings { kp_current: 1.7, ..Default::default() }, Utc::now());
        let impact = explain_impact(&status);

        assert_eq!(impact.severity, AlertSeverity::Info);
        assert!(impact.potential_impacts.is_empty());
        assert_eq!(impact.who_should_care, vec!["Space weather enthusiasts"]);
        assert!(impact.actionable_guidance.starts_with("Continue normal operations"));
    }

    #[test]
    fn test_impact_explanation_for_storm() {
        let now = Utc::now();
        let status = assess(
            WeatherReadings {
                kp_current: 7.3,
                kp_forecast_3h: None,
                flares: vec![flare("X", 1.4, 4, now), flare("M", 6.0, 8, now)],
                cmes: vec![cme(true, now)],
            },
            now,
        );
        let impact = explain_impact(&status);

        assert_eq!(impact.severity, AlertSeverity::High);
        assert!(impact.what_happened.contains("strongest X1.4"));
        assert!(impact.what_happened.contains("1 Earth-directed"));
        assert!(impact.who_should_care.iter().any(|w| w == "Satellite operators"));
        assert!(impact.who_should_care.iter().any(|w| w == "Ham radio operators"));
        assert_eq!(impact.potential_impacts.len(), 4);
        assert!(impact.actionable_guidance.contains("Aurora photographers"));
    }
}
