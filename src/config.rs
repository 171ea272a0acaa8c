use std::env;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Process-level configuration: broker, sink, lookup service and file paths
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub mqtt_server: String,
    pub mqtt_port: u16,
    pub mqtt_client_id: String,
    pub mqtt_credentials: Option<(String, String)>,
    pub ha_server_url: String,
    pub ha_token: String,
    pub data_file_path: String,
    pub lookup: Option<LookupConfig>,
    pub channel_buffer: usize,
    pub audit: Option<AuditConfig>,
}

#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub url_template: String,
    pub api_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub db_path: String,
    pub retention_secs: i64,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mqtt_server = required("MQTT_SERVER")?;
        let mqtt_port = env::var("MQTT_PORT")
            .unwrap_or_else(|_| "1883".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue("MQTT_PORT must be a port number".to_string()))?;
        let mqtt_client_id = env::var("MQTT_CLIENT_ID").unwrap_or_else(|_| "aisflow".to_string());
        let mqtt_credentials = match (env::var("MQTT_USERNAME"), env::var("MQTT_PASSWORD")) {
            (Ok(user), Ok(pass)) => Some((user, pass)),
            (Ok(user), Err(_)) => Some((user, String::new())),
            _ => None,
        };

        let ha_server_url = required("HA_SERVER_URL")?;
        if !ha_server_url.starts_with("http://") && !ha_server_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "HA_SERVER_URL must start with http:// or https://".to_string(),
            ));
        }
        let ha_token = required("HA_TOKEN")?;

        let data_file_path =
            env::var("DATA_FILE_PATH").unwrap_or_else(|_| "/data/mmsi_data.json".to_string());

        let lookup = env::var("LOOKUP_URL").ok().filter(|u| !u.trim().is_empty()).map(|url| {
            LookupConfig {
                url_template: url,
                api_key: env::var("LOOKUP_API_KEY").unwrap_or_default(),
                timeout: Duration::from_secs(
                    env::var("LOOKUP_TIMEOUT_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(10),
                ),
            }
        });

        let channel_buffer = env::var("CHANNEL_BUFFER")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(1_000);

        let audit = env::var("AUDIT_DB_PATH").ok().filter(|p| !p.trim().is_empty()).map(|db_path| {
            let hours: i64 = env::var("AUDIT_RETENTION_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(24);
            AuditConfig {
                db_path,
                retention_secs: hours * 3600,
            }
        });

        Ok(Self {
            mqtt_server,
            mqtt_port,
            mqtt_client_id,
            mqtt_credentials,
            ha_server_url,
            ha_token,
            data_file_path,
            lookup,
            channel_buffer,
            audit,
        })
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVariable(name.to_string()))
}
