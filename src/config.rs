use anyhow::{anyhow, Context};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    pub demo_mode: bool,
    pub n2yo_api_key: String,
    pub n2yo_base_url: String,
    pub noaa_swpc_base_url: String,
    pub nasa_api_key: String,
    pub nasa_donki_base_url: String,
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub enable_scheduler: bool,
    pub space_weather_update_interval: Duration,
    pub upstream_timeout: Duration,
    pub llm_timeout: Duration,
    /// Empty means any origin is allowed.
    pub cors_origins: Vec<String>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_map(vars: &HashMap<String, String>) -> anyhow::Result<Self> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or_default = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let demo_mode = parse_bool("DEMO_MODE", var("DEMO_MODE"), false)?;
        let n2yo_api_key = var("N2YO_API_KEY").unwrap_or_default();
        let llm_api_key = var("LLM_API_KEY").unwrap_or_default();

        if !demo_mode {
            if n2yo_api_key.is_empty() {
                return Err(anyhow!("N2YO_API_KEY not set (set DEMO_MODE=true to run without keys)"));
            }
            if llm_api_key.is_empty() {
                return Err(anyhow!("LLM_API_KEY not set (set DEMO_MODE=true to run without keys)"));
            }
        }

        let api_port = match var("API_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("API_PORT must be a port number, got '{}'", raw))?,
            None => 8000,
        };

        let log_format = match var("LOG_FORMAT").map(|v| v.to_lowercase()).as_deref() {
            None | Some("pretty") | Some("text") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(anyhow!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other)),
        };

        let cors_origins = var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            api_host: or_default("API_HOST", "0.0.0.0"),
            api_port,
            demo_mode,
            n2yo_api_key,
            n2yo_base_url: or_default("N2YO_BASE_URL", "https://api.n2yo.com/rest/v1/satellite"),
            noaa_swpc_base_url: or_default("NOAA_SWPC_BASE_URL", "https://services.swpc.noaa.gov"),
            nasa_api_key: or_default("NASA_API_KEY", "DEMO_KEY"),
            nasa_donki_base_url: or_default("NASA_DONKI_BASE_URL", "https://api.nasa.gov/DONKI"),
            llm_api_key,
            llm_base_url: or_default("LLM_BASE_URL", "https://openrouter.ai/api/v1/chat/completions"),
            llm_model: or_default("LLM_MODEL", "deepseek/deepseek-chat-v3-0324:free"),
            enable_scheduler: parse_bool("ENABLE_SCHEDULER", var("ENABLE_SCHEDULER"), true)?,
            space_weather_update_interval: parse_secs(
                "SPACE_WEATHER_UPDATE_INTERVAL",
                var("SPACE_WEATHER_UPDATE_INTERVAL"),
                300,
            )?,
            upstream_timeout: parse_secs("UPSTREAM_TIMEOUT_SECS", var("UPSTREAM_TIMEOUT_SECS"), 10)?,
            llm_timeout: parse_secs("LLM_TIMEOUT_SECS", var("LLM_TIMEOUT_SECS"), 30)?,
            cors_origins,
            log_format,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

fn parse_bool(key: &str, raw: Option<String>, default: bool) -> anyhow::Result<bool> {
    match raw.map(|v| v.to_lowercase()).as_deref() {
        None => Ok(default),
        Some("true") | Some("1") | Some("yes") | Some("on") => Ok(true),
        Some("false") | Some("0") | Some("no") | Some("off") => Ok(false),
        Some(other) => Err(anyhow!("{} must be a boolean, got '{}'", key, other)),
    }
}

fn parse_secs(key: &str, raw: Option<String>, default: u64) -> anyhow::Result<Duration> {
    let secs = match raw {
        None => default,
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("{} must be a whole number of seconds, got '{}'", key, raw))?,
    };
    if secs == 0 {
        return Err(anyhow!("{} must be greater than zero", key));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_demo_mode_defaults() {
        let config = Config::from_map(&vars(&[("DEMO_MODE", "true")])).unwrap();

        assert!(config.demo_mode);
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.nasa_api_key, "DEMO_KEY");
        assert!(config.enable_scheduler);
        assert_eq!(config.space_weather_update_interval, Duration::from_secs(300));
        assert_eq!(config.upstream_timeout, Duration::from_secs(10));
        assert_eq!(config.llm_timeout, Duration::from_secs(30));
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_live_mode_requires_keys() {
        let err = Config::from_map(&vars(&[])).unwrap_err();
        assert!(err.to_string().contains("N2YO_API_KEY"));

        let err = Config::from_map(&vars(&[("N2YO_API_KEY", "abc")])).unwrap_err();
        assert!(err.to_string().contains("LLM_API_KEY"));

        let config = Config::from_map(&vars(&[("N2YO_API_KEY", "abc"), ("LLM_API_KEY", "sk-1")])).unwrap();
        assert!(!config.demo_mode);
    }

    #[test]
    fn test_overrides_and_lists() {
        let config = Config::from_map(&vars(&[
            ("DEMO_MODE", "1"),
            ("API_PORT", "9001"),
            ("ENABLE_SCHEDULER", "off"),
            ("SPACE_WEATHER_UPDATE_INTERVAL", "60"),
            ("CORS_ORIGINS", "http://localhost:3000, https://space.example.org,"),
            ("LOG_FORMAT", "JSON"),
        ]))
        .unwrap();

        assert_eq!(config.api_port, 9001);
        assert!(!config.enable_scheduler);
        assert_eq!(config.space_weather_update_interval, Duration::from_secs(60));
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:3000", "https://space.example.org"]
        );
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values_fail() {
        for (key, value) in [
            ("API_PORT", "eighty"),
            ("DEMO_MODE", "maybe"),
            ("UPSTREAM_TIMEOUT_SECS", "0"),
            ("LLM_TIMEOUT_SECS", "-5"),
            ("LOG_FORMAT", "xml"),
        ] {
            let mut map = vars(&[("DEMO_MODE", "true")]);
            map.insert(key.to_string(), value.to_string());
            assert!(Config::from_map(&map).is_err(), "{}={} should be rejected", key, value);
        }
    }
}
