use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use anyhow::Context;

pub const DEFAULT_TRITON_URL: &str = "localhost:8000";
pub const DEFAULT_MODEL_NAME: &str = "stable_diffusion_xl";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    /// Normalized backend base URL, always carrying a scheme and no trailing slash.
    pub triton_url: String,
    pub model_name: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Bound on the liveness probe, kept short so `/health` answers quickly.
    pub health_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset or unparseable values take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("ADAPTER_HOST")
            .and_then(|v| v.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let port = lookup("ADAPTER_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let raw_url = lookup("TRITON_URL").unwrap_or_else(|| DEFAULT_TRITON_URL.to_string());
        let triton_url = normalize_base_url(&raw_url)?;

        let model_name = lookup("MODEL_NAME").unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string());

        let secs = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or_else(|| Duration::from_secs(default))
        };
        let request_timeout = secs("TRITON_TIMEOUT_SECS", 300);
        let connect_timeout = secs("TRITON_CONNECT_TIMEOUT_SECS", 5);
        let health_timeout = secs("TRITON_HEALTH_TIMEOUT_SECS", 5);

        Ok(Self {
            listen_addr: SocketAddr::new(host, port),
            triton_url,
            model_name,
            request_timeout,
            connect_timeout,
            health_timeout,
        })
    }
}

/// Turns `host:port` style addresses into a full base URL.
pub fn normalize_base_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    reqwest::Url::parse(&with_scheme)
        .with_context(|| format!("invalid TRITON_URL: {raw}"))?;

    Ok(with_scheme)
}
