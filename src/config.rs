use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{NotifyError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub roster: RosterConfig,
    pub smtp: SmtpConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Empty means any origin is accepted
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RosterConfig {
    pub path: PathBuf,
    pub sheet: Option<String>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/students.xlsx"),
            sheet: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    Starttls,
    Tls,
    None,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub sender: String,
    pub password: String,
    pub tls: TlsMode,
    pub timeout_secs: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            sender: String::new(),
            password: String::new(),
            tls: TlsMode::Starttls,
            timeout_secs: 30,
        }
    }
}

impl SmtpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Checks the fields required to open a transport
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(NotifyError::Config("smtp.host is not set".to_string()));
        }
        if self.sender.trim().is_empty() {
            return Err(NotifyError::Config("smtp.sender is not set".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(NotifyError::Config(
                "smtp.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/notifications.db".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        dotenv::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("NOTIFIER")
                    .separator("__")
                    .try_parsing(true),
            )
            // Variable names used by earlier deployments of the service
            .set_override_option("smtp.host", std::env::var("SMTP_HOST").ok())?
            .set_override_option("smtp.port", std::env::var("SMTP_PORT").ok())?
            .set_override_option("smtp.sender", std::env::var("EMAIL_SENDER").ok())?
            .set_override_option("smtp.password", std::env::var("EMAIL_PASSWORD").ok())?
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<()> {
        self.smtp.validate()
    }

    /// Copy safe to print or log
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.smtp.password.is_empty() {
            copy.smtp.password = "********".to_string();
        }
        copy
    }
}
