//! Configuration management for the admin client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default Supabase URL (can be overridden at compile time via SUPABASE_URL env var).
pub const DEFAULT_SUPABASE_URL: &str = match option_env!("SUPABASE_URL") {
    Some(url) => url,
    None => "https://project.supabase.co",
};

/// Default Supabase publishable key (can be overridden at compile time via
/// SUPABASE_PUBLISHABLE_KEY env var).
pub const DEFAULT_SUPABASE_PUBLISHABLE_KEY: &str = match option_env!("SUPABASE_PUBLISHABLE_KEY") {
    Some(key) => key,
    None => "publishable-key",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Login rate-limiting and session lifetime policy.
///
/// These are policy values, not structural: deployments may tune them, but
/// the defaults match the product's published security posture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPolicy {
    /// Max consecutive failed login attempts before lockout.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Lockout duration in minutes once the attempt budget is exhausted.
    #[serde(default = "default_lockout_minutes")]
    pub lockout_minutes: u32,
    /// Local session lifetime in hours.
    #[serde(default = "default_session_hours")]
    pub session_hours: u32,
    /// Minimum interval in seconds between activity-driven session extensions.
    #[serde(default = "default_activity_debounce_secs")]
    pub activity_debounce_secs: u32,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_lockout_minutes() -> u32 {
    15
}

fn default_session_hours() -> u32 {
    24
}

fn default_activity_debounce_secs() -> u32 {
    60
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            lockout_minutes: default_lockout_minutes(),
            session_hours: default_session_hours(),
            activity_debounce_secs: default_activity_debounce_secs(),
        }
    }
}

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Supabase project URL.
    #[serde(default = "default_supabase_url")]
    pub supabase_url: String,
    /// Supabase publishable API key (public, safe to expose).
    #[serde(default = "default_supabase_publishable_key")]
    pub supabase_publishable_key: String,
    /// Deployment-local shared secret. When set, the client uses the
    /// shared-secret login path instead of the managed identity service.
    /// Sourced from the environment only, never written to the config file.
    #[serde(skip)]
    pub app_password: Option<String>,
    /// Login rate-limiting and session policy.
    #[serde(default)]
    pub auth: AuthPolicy,
}

fn default_supabase_url() -> String {
    DEFAULT_SUPABASE_URL.to_string()
}

fn default_supabase_publishable_key() -> String {
    DEFAULT_SUPABASE_PUBLISHABLE_KEY.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            supabase_url: DEFAULT_SUPABASE_URL.to_string(),
            supabase_publishable_key: DEFAULT_SUPABASE_PUBLISHABLE_KEY.to_string(),
            app_password: None,
            auth: AuthPolicy::default(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from a file, falling back to defaults.
    /// Note: supabase_url and supabase_publishable_key are compile-time only
    /// and will always use the built-in defaults, regardless of what's in the
    /// config file.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        // Force compile-time values (never from config file)
        config.supabase_url = DEFAULT_SUPABASE_URL.to_string();
        config.supabase_publishable_key = DEFAULT_SUPABASE_PUBLISHABLE_KEY.to_string();

        config.load_from_env();

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let config_path = paths.config_file();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("PRODOS_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(password) = std::env::var("PRODOS_APP_PASSWORD") {
            if !password.trim().is_empty() {
                self.app_password = Some(password);
            }
        }
    }

    /// Whether the managed identity backend is configured for this deployment.
    ///
    /// An app password takes precedence: if one is set, the shared-secret
    /// login path is used even when Supabase credentials are present.
    pub fn uses_managed_auth(&self) -> bool {
        self.app_password.is_none()
            && !self.supabase_url.is_empty()
            && !self.supabase_publishable_key.is_empty()
    }

    /// Get the Supabase URL as a parsed URL.
    pub fn supabase_url(&self) -> CoreResult<Url> {
        Url::parse(&self.supabase_url).map_err(CoreError::from)
    }
}
