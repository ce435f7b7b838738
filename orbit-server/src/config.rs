use std::env;
use std::time::Duration;
use tracing::warn;

const DEFAULT_ADDR: &str = "0.0.0.0:9001";
const DEFAULT_DB_PATH: &str = "orbit.db";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_UPLOAD_PREFIX: &str = "/uploads";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_CALL_TOKEN_TTL_SECS: u64 = 3600;

/// Video call credentials for the hosted call provider
#[derive(Debug, Clone)]
pub struct CallConfig {
    pub app_id: u32,
    pub server_secret: String,
    pub token_ttl: Duration,
}

/// Server settings, read from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub access_token: Option<String>,
    pub db_path: String,
    pub upload_dir: String,
    pub upload_prefix: String,
    pub max_upload_bytes: usize,
    pub call: Option<CallConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            access_token: None,
            db_path: DEFAULT_DB_PATH.to_string(),
            upload_dir: DEFAULT_UPLOAD_DIR.to_string(),
            upload_prefix: DEFAULT_UPLOAD_PREFIX.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            call: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let call = match (get("ZEGO_APP_ID"), get("ZEGO_SERVER_SECRET")) {
            (Some(app_id), Some(server_secret)) => match app_id.trim().parse::<u32>() {
                Ok(app_id) => Some(CallConfig {
                    app_id,
                    server_secret,
                    token_ttl: Duration::from_secs(parse_or(
                        get("ORBIT_CALL_TOKEN_TTL_SECS"),
                        DEFAULT_CALL_TOKEN_TTL_SECS,
                        "ORBIT_CALL_TOKEN_TTL_SECS",
                    )),
                }),
                Err(_) => {
                    warn!("ZEGO_APP_ID is not a number, video calls disabled");
                    None
                }
            },
            _ => {
                warn!("ZEGO_APP_ID or ZEGO_SERVER_SECRET not set, video calls disabled");
                None
            }
        };

        Self {
            addr: get("ORBIT_SERVER_ADDR").unwrap_or(defaults.addr),
            access_token: get("ORBIT_ACCESS_TOKEN"),
            db_path: get("ORBIT_DB_PATH").unwrap_or(defaults.db_path),
            upload_dir: get("ORBIT_UPLOAD_DIR").unwrap_or(defaults.upload_dir),
            upload_prefix: get("ORBIT_PUBLIC_UPLOAD_PREFIX").unwrap_or(defaults.upload_prefix),
            max_upload_bytes: parse_or(
                get("ORBIT_MAX_UPLOAD_BYTES"),
                defaults.max_upload_bytes,
                "ORBIT_MAX_UPLOAD_BYTES",
            ),
            call,
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T, key: &str) -> T {
    match value {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value for {}: {:?}, using default", key, raw);
            default
        }),
        None => default,
    }
}
