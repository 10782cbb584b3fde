use std::net::SocketAddr;
use std::time::Duration;

use ephra_auth::AuthConfig;
use ephra_db_memory::SeedData;
use ephra_scheduling::SchedulingConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    /// Directory records loaded into the in-memory store at start-up
    #[serde(default)]
    pub seed: SeedData,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }

        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }

        self.auth.validate().map_err(|e| format!("auth: {e}"))?;
        self.scheduling.validate()?;

        if self.notifications.poll_interval.is_zero() {
            return Err("notifications.poll_interval must be > 0".into());
        }
        if self.auth.session.sweep_interval.is_zero() {
            return Err("auth.session.sweep_interval must be > 0".into());
        }

        self.seed.validate().map_err(|e| format!("seed: {e}"))?;
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], self.server.port)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// How often due reminders are dispatched
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Shared key for delivery webhook signatures. Unset rejects all
    /// callbacks.
    pub webhook_signing_key: Option<String>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            webhook_signing_key: None,
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_FILE: &str = "ephra.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., EPHRA__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("EPHRA")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.addr().port(), 8080);
    }

    #[test]
    fn test_invalid_log_level() {
        let mut cfg = AppConfig::default();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9191

[scheduling]
min_duration = "30m"
meeting_base_url = "https://meet.example"

[notifications]
poll_interval = "5s"

[seed]
users = ["user-1"]

[[seed.providers]]
provider_id = "prov-1"
is_accepting_patients = true
is_active = true

[[seed.assignments]]
user_id = "user-1"
provider_id = "prov-1"
"#
        )
        .unwrap();

        let cfg = loader::load_config(file.path().to_str()).unwrap();
        assert_eq!(cfg.server.port, 9191);
        assert_eq!(cfg.scheduling.min_duration, Duration::from_secs(1800));
        assert_eq!(cfg.notifications.poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.seed.providers.len(), 1);
        assert_eq!(cfg.seed.assignments[0].provider_id, "prov-1");
    }

    #[test]
    fn test_dangling_seed_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[[seed.assignments]]
user_id = "user-1"
provider_id = "prov-1"
"#
        )
        .unwrap();
        assert!(loader::load_config(file.path().to_str()).unwrap_err().contains("seed"));
    }
}
