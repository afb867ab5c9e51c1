use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::routing::DEFAULT_ORS_BASE_URL;

/// Predictor service settings, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub artifact_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub ors_api_key: Option<String>,
    pub ors_base_url: String,
    pub route_timeout: Duration,
    /// `None` allows any origin.
    pub cors_allow_origins: Option<Vec<String>>,
    pub log_predictions: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from("model/eta_pipeline.json"),
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8000),
            ors_api_key: None,
            ors_base_url: DEFAULT_ORS_BASE_URL.to_string(),
            route_timeout: Duration::from_secs(10),
            cors_allow_origins: None,
            log_predictions: false,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let host: IpAddr = match get("HOST") {
            Some(h) => h.parse().with_context(|| format!("invalid HOST '{h}'"))?,
            None => defaults.bind_addr.ip(),
        };
        let port: u16 = match get("PORT") {
            Some(p) => p.parse().with_context(|| format!("invalid PORT '{p}'"))?,
            None => defaults.bind_addr.port(),
        };
        let route_timeout = match get("ROUTE_TIMEOUT_SECS") {
            Some(s) => Duration::from_secs(
                s.parse()
                    .with_context(|| format!("invalid ROUTE_TIMEOUT_SECS '{s}'"))?,
            ),
            None => defaults.route_timeout,
        };

        Ok(Self {
            artifact_path: get("ETA_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_path),
            bind_addr: SocketAddr::new(host, port),
            ors_api_key: get("ORS_API_KEY"),
            ors_base_url: get("ORS_BASE_URL").unwrap_or(defaults.ors_base_url),
            route_timeout,
            cors_allow_origins: get("CORS_ALLOW_ORIGINS").and_then(|raw| {
                let origins: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty() && *o != "*")
                    .map(str::to_owned)
                    .collect();
                (!origins.is_empty()).then_some(origins)
            }),
            log_predictions: get("LOG_PRED").as_deref() == Some("1"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.artifact_path, PathBuf::from("model/eta_pipeline.json"));
        assert_eq!(cfg.bind_addr.port(), 8000);
        assert!(cfg.ors_api_key.is_none());
        assert!(cfg.cors_allow_origins.is_none());
        assert!(!cfg.log_predictions);
    }

    #[test]
    fn reads_overrides() {
        let cfg = ServiceConfig::from_lookup(lookup(&[
            ("ETA_MODEL_PATH", "/srv/eta.json"),
            ("HOST", "127.0.0.1"),
            ("PORT", "9100"),
            ("ORS_API_KEY", "secret"),
            ("ROUTE_TIMEOUT_SECS", "3"),
            ("CORS_ALLOW_ORIGINS", "http://localhost:3000, https://eta.example"),
            ("LOG_PRED", "1"),
        ]))
        .unwrap();
        assert_eq!(cfg.artifact_path, PathBuf::from("/srv/eta.json"));
        assert_eq!(cfg.bind_addr, "127.0.0.1:9100".parse().unwrap());
        assert_eq!(cfg.ors_api_key.as_deref(), Some("secret"));
        assert_eq!(cfg.route_timeout, Duration::from_secs(3));
        assert_eq!(
            cfg.cors_allow_origins.unwrap(),
            ["http://localhost:3000", "https://eta.example"]
        );
        assert!(cfg.log_predictions);
    }

    #[test]
    fn wildcard_origin_means_any() {
        let cfg = ServiceConfig::from_lookup(lookup(&[("CORS_ALLOW_ORIGINS", "*")])).unwrap();
        assert!(cfg.cors_allow_origins.is_none());
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(ServiceConfig::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
    }
}
