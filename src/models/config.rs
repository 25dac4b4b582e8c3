//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Placeholder written into the default config for the webhook.
pub const PLACEHOLDER_WEBHOOK_URL: &str = "YOUR_DISCORD_WEBHOOK_URL_HERE";

/// Placeholder written into the default config for the API key.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_STEAM_API_KEY_HERE";

/// Longest accepted poll interval (one year).
pub const MAX_CHECK_INTERVAL_MINUTES: f64 = 525_600.0;

/// Shortest poll period actually used.
const MIN_CHECK_PERIOD: Duration = Duration::from_secs(1);

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Discord-compatible webhook receiving notifications
    #[serde(default)]
    pub webhook_url: String,

    /// Minutes between poll cycles
    #[serde(default = "defaults::check_interval_minutes")]
    pub check_interval_minutes: f64,

    /// Steam Web API key; absent or placeholder means scrape only
    #[serde(default, alias = "steamApiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Category name to list of workshop item URLs
    #[serde(default)]
    pub mod_categories: BTreeMap<String, Vec<String>>,

    /// HTTP client and endpoint settings
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Load configuration from a JSON or TOML file (chosen by extension).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = if is_toml(path) {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        Ok(config)
    }

    /// Load and validate in one step.
    pub fn load_validated(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration back to `path`, keeping its format.
    ///
    /// Goes through a temporary file and a rename so an interrupted write
    /// never leaves a truncated config behind.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_toml(path) {
            toml::to_string_pretty(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Replace the watch-list, returning `(category, url)` pairs that were in
    /// the old one but are missing from `categories`.
    pub fn replace_categories(
        &mut self,
        categories: BTreeMap<String, Vec<String>>,
    ) -> Vec<(String, String)> {
        let mut dropped = Vec::new();
        for (category, urls) in &self.mod_categories {
            let kept = categories.get(category);
            for url in urls {
                if !kept.is_some_and(|kept| kept.contains(url)) {
                    dropped.push((category.clone(), url.clone()));
                }
            }
        }
        self.mod_categories = categories;
        dropped
    }

    /// Write the documented default configuration to `path`.
    pub fn write_default(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Self::default().save(path)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let webhook = self.webhook_url.trim();
        if webhook.is_empty() {
            return Err(AppError::config("webhookUrl is required"));
        }
        if webhook == PLACEHOLDER_WEBHOOK_URL {
            return Err(AppError::config(
                "webhookUrl still holds the placeholder value; edit the config first",
            ));
        }
        url::Url::parse(webhook)
            .map_err(|e| AppError::config(format!("webhookUrl is not a valid URL: {e}")))?;

        if self.mod_categories.is_empty() {
            return Err(AppError::config("modCategories is required and must not be empty"));
        }
        let minutes = self.check_interval_minutes;
        if !minutes.is_finite() || minutes <= 0.0 || minutes > MAX_CHECK_INTERVAL_MINUTES {
            return Err(AppError::validation(format!(
                "checkIntervalMinutes must be > 0 and <= {MAX_CHECK_INTERVAL_MINUTES}"
            )));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeoutSecs must be > 0"));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.userAgent is empty"));
        }
        url::Url::parse(&self.http.api_url)?;
        url::Url::parse(&self.http.community_url)?;
        Ok(())
    }

    /// The configured API key, unless missing, blank or still the placeholder.
    pub fn effective_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
    }

    /// Poll period as a duration, never shorter than one second.
    pub fn check_interval(&self) -> Result<Duration> {
        let period = Duration::try_from_secs_f64(self.check_interval_minutes * 60.0)
            .map_err(|e| AppError::validation(format!("checkIntervalMinutes: {e}")))?;
        Ok(period.max(MIN_CHECK_PERIOD))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webhook_url: PLACEHOLDER_WEBHOOK_URL.to_string(),
            check_interval_minutes: defaults::check_interval_minutes(),
            api_key: Some(PLACEHOLDER_API_KEY.to_string()),
            mod_categories: defaults::mod_categories(),
            http: HttpConfig::default(),
        }
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

/// HTTP client and endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// GetPublishedFileDetails endpoint
    #[serde(default = "defaults::api_url")]
    pub api_url: String,

    /// Steam Community base URL used for scraping
    #[serde(default = "defaults::community_url")]
    pub community_url: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            api_url: defaults::api_url(),
            community_url: defaults::community_url(),
        }
    }
}

mod defaults {
    use std::collections::BTreeMap;

    pub fn check_interval_minutes() -> f64 {
        5.0
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn api_url() -> String {
        "https://api.steampowered.com/ISteamRemoteStorage/GetPublishedFileDetails/v1/".into()
    }
    pub fn community_url() -> String {
        "https://steamcommunity.com".into()
    }

    // Sample watch-list for the bootstrap file
    pub fn mod_categories() -> BTreeMap<String, Vec<String>> {
        let url = |id: &str| format!("https://steamcommunity.com/sharedfiles/filedetails/?id={id}");
        BTreeMap::from([
            (
                "Essential Mods".to_string(),
                vec![url("123456789"), url("987654321")],
            ),
            (
                "Graphics Mods".to_string(),
                vec![url("555666777"), url("888999000")],
            ),
            ("Gameplay Mods".to_string(), vec![url("111222333")]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn valid_config() -> Config {
        Config {
            webhook_url: "https://discord.com/api/webhooks/1/abc".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn validate_default_config_rejects_placeholder_webhook() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("placeholder"));
    }

    #[test]
    fn validate_accepts_real_webhook() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_webhook() {
        let config: Config = serde_json::from_str(
            r#"{"modCategories": {"A": ["https://x/?id=1"]}}"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("webhookUrl is required"));
    }

    #[test]
    fn validate_rejects_empty_categories() {
        let mut config = valid_config();
        config.mod_categories.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("modCategories"));
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = valid_config();
        config.check_interval_minutes = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_endpoint() {
        let mut config = valid_config();
        config.http.community_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(AppError::Url(_))));
    }

    #[test]
    fn parses_legacy_field_names() {
        let config: Config = serde_json::from_str(
            r#"{
                "webhookUrl": "https://hook.example/abc",
                "steamApiKey": "KEY",
                "modCategories": {"A": ["https://x/?id=1"]}
            }"#,
        )
        .unwrap();
        assert_eq!(config.check_interval_minutes, 5.0);
        assert_eq!(config.effective_api_key(), Some("KEY"));
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn placeholder_api_key_is_ignored() {
        assert_eq!(Config::default().effective_api_key(), None);

        let mut config = valid_config();
        config.api_key = Some("   ".to_string());
        assert_eq!(config.effective_api_key(), None);
    }

    #[test]
    fn check_interval_converts_minutes() {
        let mut config = valid_config();
        config.check_interval_minutes = 0.5;
        assert_eq!(config.check_interval().unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn huge_interval_is_rejected_without_panicking() {
        let mut config = valid_config();
        config.check_interval_minutes = 1e300;
        assert!(config.validate().is_err());
        assert!(config.check_interval().is_err());

        config.check_interval_minutes = MAX_CHECK_INTERVAL_MINUTES;
        assert!(config.validate().is_ok());
        assert_eq!(
            config.check_interval().unwrap(),
            Duration::from_secs(525_600 * 60)
        );
    }

    #[test]
    fn tiny_interval_is_clamped_to_one_second() {
        let mut config = valid_config();
        config.check_interval_minutes = 1e-12;
        assert!(config.validate().is_ok());
        assert_eq!(config.check_interval().unwrap(), Duration::from_secs(1));
    }

    #[test]
    fn negative_interval_is_an_error() {
        let mut config = valid_config();
        config.check_interval_minutes = -1.0;
        assert!(config.validate().is_err());
        assert!(config.check_interval().is_err());
    }

    #[test]
    fn replace_categories_reports_dropped_urls() {
        let mut config = valid_config();
        config.mod_categories = BTreeMap::from([
            (
                "A".to_string(),
                vec!["https://x/?id=1".to_string(), "not a url".to_string()],
            ),
            ("B".to_string(), vec!["https://x/?id=2".to_string()]),
        ]);

        let dropped = config.replace_categories(BTreeMap::from([(
            "A".to_string(),
            vec!["https://x/?id=1".to_string(), "https://x/?id=3".to_string()],
        )]));

        assert_eq!(
            dropped,
            vec![
                ("A".to_string(), "not a url".to_string()),
                ("B".to_string(), "https://x/?id=2".to_string()),
            ]
        );
        assert_eq!(config.mod_categories["A"].len(), 2);
        assert!(!config.mod_categories.contains_key("B"));
    }

    #[test]
    fn save_leaves_no_temporary_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        valid_config().save(&path).unwrap();
        valid_config().save(&path).unwrap();

        assert!(path.exists());
        assert!(!tmp.path().join("config.tmp").exists());
    }

    #[test]
    fn write_default_then_load_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        Config::write_default(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.webhook_url, PLACEHOLDER_WEBHOOK_URL);
        assert_eq!(loaded.mod_categories.len(), 3);
        assert_eq!(loaded.mod_categories["Essential Mods"].len(), 2);
    }

    #[test]
    fn save_and_load_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        let config = valid_config();
        config.save(&path).unwrap();

        let loaded = Config::load_validated(&path).unwrap();
        assert_eq!(loaded.webhook_url, config.webhook_url);
        assert_eq!(loaded.mod_categories, config.mod_categories);
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load(tmp.path().join("nope.json")).unwrap_err();
        assert!(err.is_not_found());
    }
}
