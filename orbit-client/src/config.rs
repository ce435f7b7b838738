use std::env;
use std::time::Duration;
use tracing::warn;

const DEFAULT_SERVER_URL: &str = "ws://localhost:9001";
const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;
const DEFAULT_BACKUP_POLL_INTERVAL_MS: u64 = 10000;
const DEFAULT_RESYNC_DELAY_MS: u64 = 500;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10000;

/// Client settings, read from the environment
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    /// Signed-in user; `None` means nobody is signed in
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub access_token: Option<String>,
    pub poll_interval: Duration,
    pub backup_poll_interval: Duration,
    pub resync_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            user_id: None,
            user_name: None,
            access_token: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            backup_poll_interval: Duration::from_millis(DEFAULT_BACKUP_POLL_INTERVAL_MS),
            resync_delay: Duration::from_millis(DEFAULT_RESYNC_DELAY_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        // Zero is rejected: it would spin the poll timers or expire every request
        let millis = |key: &str, default: u64| {
            let value = match get(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|v| *v > 0)
                    .unwrap_or_else(|| {
                        warn!("Invalid value for {}: {:?}, using default", key, raw);
                        default
                    }),
                None => default,
            };
            Duration::from_millis(value)
        };

        Self {
            server_url: get("ORBIT_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            user_id: get("ORBIT_USER_ID"),
            user_name: get("ORBIT_USER_NAME"),
            access_token: get("ORBIT_ACCESS_TOKEN"),
            poll_interval: millis("ORBIT_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS),
            backup_poll_interval: millis(
                "ORBIT_BACKUP_POLL_INTERVAL_MS",
                DEFAULT_BACKUP_POLL_INTERVAL_MS,
            ),
            resync_delay: millis("ORBIT_RESYNC_DELAY_MS", DEFAULT_RESYNC_DELAY_MS),
            request_timeout: millis("ORBIT_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ClientConfig::from_lookup(|_| None);
        assert_eq!(cfg.server_url, "ws://localhost:9001");
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.backup_poll_interval, Duration::from_secs(10));
        assert_eq!(cfg.resync_delay, Duration::from_millis(500));
        assert!(cfg.user_id.is_none());
    }

    #[test]
    fn test_overrides() {
        let cfg = ClientConfig::from_lookup(|key| match key {
            "ORBIT_USER_ID" => Some("u1".to_string()),
            "ORBIT_POLL_INTERVAL_MS" => Some("250".to_string()),
            "ORBIT_RESYNC_DELAY_MS" => Some("soon".to_string()),
            "ORBIT_ACCESS_TOKEN" => Some(String::new()),
            _ => None,
        });
        assert_eq!(cfg.user_id.as_deref(), Some("u1"));
        assert_eq!(cfg.poll_interval, Duration::from_millis(250));
        assert_eq!(cfg.resync_delay, Duration::from_millis(500));
        assert!(cfg.access_token.is_none());
    }

    #[test]
    fn test_zero_durations_fall_back_to_defaults() {
        let cfg = ClientConfig::from_lookup(|key| match key {
            "ORBIT_POLL_INTERVAL_MS" => Some("0".to_string()),
            "ORBIT_BACKUP_POLL_INTERVAL_MS" => Some(" 0 ".to_string()),
            "ORBIT_REQUEST_TIMEOUT_MS" => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.backup_poll_interval, Duration::from_secs(10));
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
    }
}
