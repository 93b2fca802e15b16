// Configuration management with layered configuration (file, env)
//
// Precedence: config/default.toml -> config/local.toml -> APP__ environment
// variables (e.g. APP__META__ACCESS_TOKEN).

use chrono::NaiveTime;
use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub meta: MetaConfig,
    pub platforms: PlatformConfig,
    pub media: MediaConfig,
    pub folders: FolderConfig,
    pub schedule: ScheduleConfig,
    pub database: DatabaseConfig,
    pub content: ContentConfig,
    pub observability: ObservabilityConfig,
}

/// Meta Graph API credentials and endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub access_token: String,
    pub ig_account_id: String,
    pub fb_page_id: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,
    #[serde(default = "default_upload_base_url")]
    pub upload_base_url: String,
    /// Seconds between media container status checks
    #[serde(default = "default_container_poll_seconds")]
    pub container_poll_seconds: u64,
    #[serde(default = "default_container_poll_attempts")]
    pub container_poll_attempts: u32,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_api_version() -> String {
    "v21.0".to_string()
}

fn default_graph_base_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_upload_base_url() -> String {
    "https://rupload.facebook.com".to_string()
}

fn default_container_poll_seconds() -> u64 {
    10
}

fn default_container_poll_attempts() -> u32 {
    30
}

fn default_request_timeout_seconds() -> u64 {
    120
}

/// Per-platform and per-surface toggles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_true")]
    pub ig_enabled: bool,
    #[serde(default = "default_true")]
    pub ig_post_reel: bool,
    #[serde(default = "default_true")]
    pub ig_post_story: bool,
    #[serde(default = "default_true")]
    pub fb_enabled: bool,
    #[serde(default = "default_true")]
    pub fb_post_reel: bool,
    #[serde(default = "default_true")]
    pub fb_post_feed: bool,
}

fn default_true() -> bool {
    true
}

/// Public hosting for input videos; the Graph API pulls videos by URL, so the
/// input directory must be reachable under this base URL (hosting itself is
/// an external collaborator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderConfig {
    pub input_dir: PathBuf,
    pub processed_dir: PathBuf,
}

/// Two fixed daily trigger times, evaluated in `timezone`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// First daily trigger, "HH:MM"
    pub time_1: String,
    /// Second daily trigger, "HH:MM"
    pub time_2: String,
    pub timezone: String,
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    /// Length of the trigger window; one dispatch per window
    #[serde(default = "default_trigger_window_seconds")]
    pub trigger_window_seconds: u64,
    /// A trigger missed by more than this is skipped, not fired late
    #[serde(default = "default_misfire_grace_seconds")]
    pub misfire_grace_seconds: u64,
}

fn default_poll_interval_seconds() -> u64 {
    15
}

fn default_trigger_window_seconds() -> u64 {
    120
}

fn default_misfire_grace_seconds() -> u64 {
    3600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout_seconds() -> u64 {
    30
}

/// Content readiness policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Post items whose description is empty (empty caption) instead of
    /// holding them back
    #[serde(default)]
    pub allow_empty_description: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
}

impl Settings {
    /// Load configuration with layered precedence: defaults file -> local
    /// file -> environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings; failures here are fatal at startup
    pub fn validate(&self) -> Result<(), String> {
        if self.platforms.ig_enabled || self.platforms.fb_enabled {
            if self.meta.access_token.is_empty() || self.meta.access_token.len() < 50 {
                return Err("META access_token is missing or too short".to_string());
            }
            if self.meta.access_token.to_uppercase().contains("YOUR_") {
                return Err("META access_token is a placeholder value".to_string());
            }
        }
        if self.platforms.ig_enabled && self.meta.ig_account_id.is_empty() {
            return Err("ig_account_id is required when Instagram is enabled".to_string());
        }
        if self.platforms.fb_enabled && self.meta.fb_page_id.is_empty() {
            return Err("fb_page_id is required when Facebook is enabled".to_string());
        }

        if self.media.public_base_url.is_empty() {
            return Err("media public_base_url cannot be empty".to_string());
        }

        if self.folders.input_dir.as_os_str().is_empty() {
            return Err("input_dir cannot be empty".to_string());
        }
        if self.folders.processed_dir.as_os_str().is_empty() {
            return Err("processed_dir cannot be empty".to_string());
        }

        for (name, value) in [
            ("schedule time_1", &self.schedule.time_1),
            ("schedule time_2", &self.schedule.time_2),
        ] {
            parse_trigger_time(value).map_err(|e| format!("{} is invalid: {}", name, e))?;
        }
        self.schedule
            .tz()
            .map_err(|e| format!("schedule timezone is invalid: {}", e))?;
        if self.schedule.poll_interval_seconds == 0 {
            return Err("schedule poll_interval_seconds must be greater than 0".to_string());
        }
        if self.schedule.trigger_window_seconds == 0 {
            return Err("schedule trigger_window_seconds must be greater than 0".to_string());
        }

        if self.database.path.as_os_str().is_empty() {
            return Err("database path cannot be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("database max_connections must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl ScheduleConfig {
    pub fn tz(&self) -> Result<Tz, String> {
        Tz::from_str(&self.timezone).map_err(|e| e.to_string())
    }

    /// Both configured trigger times, parsed
    pub fn trigger_times(&self) -> Result<Vec<NaiveTime>, String> {
        Ok(vec![
            parse_trigger_time(&self.time_1)?,
            parse_trigger_time(&self.time_2)?,
        ])
    }
}

/// Parse a "HH:MM" trigger time
pub fn parse_trigger_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|e| format!("expected HH:MM, got '{}': {}", value, e))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                access_token: "x".repeat(64),
                ig_account_id: "17840000000000000".to_string(),
                fb_page_id: "100000000000000".to_string(),
                api_version: default_api_version(),
                graph_base_url: default_graph_base_url(),
                upload_base_url: default_upload_base_url(),
                container_poll_seconds: default_container_poll_seconds(),
                container_poll_attempts: default_container_poll_attempts(),
                request_timeout_seconds: default_request_timeout_seconds(),
            },
            platforms: PlatformConfig {
                ig_enabled: true,
                ig_post_reel: true,
                ig_post_story: true,
                fb_enabled: true,
                fb_post_reel: true,
                fb_post_feed: true,
            },
            media: MediaConfig {
                public_base_url: "https://media.example.com/reels".to_string(),
            },
            folders: FolderConfig {
                input_dir: PathBuf::from("input"),
                processed_dir: PathBuf::from("processed"),
            },
            schedule: ScheduleConfig {
                time_1: "18:00".to_string(),
                time_2: "20:00".to_string(),
                timezone: "Asia/Kolkata".to_string(),
                poll_interval_seconds: default_poll_interval_seconds(),
                trigger_window_seconds: default_trigger_window_seconds(),
                misfire_grace_seconds: default_misfire_grace_seconds(),
            },
            database: DatabaseConfig {
                path: PathBuf::from("posting_service.db"),
                max_connections: default_max_connections(),
                connect_timeout_seconds: default_connect_timeout_seconds(),
            },
            content: ContentConfig {
                allow_empty_description: false,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_catches_short_token() {
        let mut settings = Settings::default();
        settings.meta.access_token = "short".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_placeholder_token() {
        let mut settings = Settings::default();
        settings.meta.access_token = format!("YOUR_ACCESS_TOKEN_{}", "x".repeat(50));
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_token_not_required_when_platforms_disabled() {
        let mut settings = Settings::default();
        settings.platforms.ig_enabled = false;
        settings.platforms.fb_enabled = false;
        settings.meta.access_token = String::new();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_catches_missing_ig_account() {
        let mut settings = Settings::default();
        settings.meta.ig_account_id = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_bad_trigger_time() {
        let mut settings = Settings::default();
        settings.schedule.time_1 = "25:99".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_bad_timezone() {
        let mut settings = Settings::default();
        settings.schedule.timezone = "Mars/Olympus_Mons".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_trigger_times_parse() {
        let settings = Settings::default();
        let times = settings.schedule.trigger_times().unwrap();
        assert_eq!(times.len(), 2);
        assert_eq!(times[0], NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        assert_eq!(times[1], NaiveTime::from_hms_opt(20, 0, 0).unwrap());
    }
}
