//! Process settings from the environment (and `.env` when present).
//!
//! Every external sink is optional: a missing URL turns that sink off.

use serde::Deserialize;

use crate::constants::{CONNECT_TIMEOUT_MS, NOTIFY_TOPIC};
use crate::error::Result;

fn default_server_name() -> String {
    "nse".to_owned()
}

fn default_notify_topic() -> String {
    NOTIFY_TOPIC.to_owned()
}

fn default_connect_timeout_ms() -> u64 {
    CONNECT_TIMEOUT_MS
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// `REDIS_URL`
    #[serde(default)]
    pub redis_url: Option<String>,
    /// `KAFKA_BOOTSTRAP_SERVERS`
    #[serde(default)]
    pub kafka_bootstrap_servers: Option<String>,
    /// `DATABASE_URL`
    #[serde(default)]
    pub database_url: Option<String>,
    /// `ANALYTICS_HOST`, e.g. `http://127.0.0.1:5000`
    #[serde(default)]
    pub analytics_host: Option<String>,
    /// `ANALYTICS_API_KEY`
    #[serde(default)]
    pub analytics_api_key: Option<String>,
    /// `SERVER_NAME`; first segment of analytics cache keys and the
    /// `server_name` column.
    #[serde(default = "default_server_name")]
    pub server_name: String,
    /// `NOTIFY_TOPIC`
    #[serde(default = "default_notify_topic")]
    pub notify_topic: String,
    /// `CONNECT_TIMEOUT_MS`
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            redis_url: None,
            kafka_bootstrap_servers: None,
            database_url: None,
            analytics_host: None,
            analytics_api_key: None,
            server_name: default_server_name(),
            notify_topic: default_notify_topic(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let c = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;
        Ok(c.try_deserialize()?)
    }

    /// Host and key, when both are set and non-empty.
    pub fn analytics(&self) -> Option<(&str, &str)> {
        let host = self.analytics_host.as_deref().filter(|s| !s.trim().is_empty())?;
        let key = self.analytics_api_key.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((host, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_every_sink_off() {
        let s = Settings::default();
        assert!(s.redis_url.is_none());
        assert!(s.analytics().is_none());
        assert_eq!(s.server_name, "nse");
        assert_eq!(s.notify_topic, "nse.data");
        assert_eq!(s.connect_timeout_ms, 15_000);
    }

    #[test]
    fn analytics_needs_both_host_and_key() {
        let mut s = Settings {
            analytics_host: Some("http://127.0.0.1:5000".into()),
            ..Settings::default()
        };
        assert!(s.analytics().is_none());
        s.analytics_api_key = Some("  ".into());
        assert!(s.analytics().is_none());
        s.analytics_api_key = Some("secret".into());
        assert_eq!(s.analytics(), Some(("http://127.0.0.1:5000", "secret")));
    }
}
