//! Configuration model (`config.json`).
//!
//! All knobs live in one typed struct, constructed once at process start and
//! passed down explicitly. Nothing in the crate reads configuration from
//! ambient state.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::FukuError;

/// Global soft-failure threshold when an account carries no override.
pub const DEFAULT_SOFT_FAILURE_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub accounts: Vec<AccountConfig>,
    pub file_paths: FilePaths,

    #[serde(default = "default_action_delay_min")]
    pub action_delay_min_seconds: f64,
    #[serde(default = "default_action_delay_max")]
    pub action_delay_max_seconds: f64,

    /// Accounts are dropped from the run after this many soft suppressions.
    /// A per-account `max_soft_failures` takes precedence over this value.
    #[serde(default = "default_soft_failure_threshold")]
    pub soft_failure_threshold: u32,

    #[serde(default)]
    pub win_keywords: Vec<String>,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub deepseek: DeepseekConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilePaths {
    /// Text file holding the raw giveaway-post URLs, one or more per line.
    pub origin_urls: PathBuf,
    /// Directory holding one history database per account.
    pub database_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
    pub remark: String,
    pub cookie: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub follow_enabled: bool,
    #[serde(default)]
    pub like_enabled: bool,
    #[serde(default)]
    pub comment_enabled: bool,
    #[serde(default)]
    pub repost_enabled: bool,

    /// Prefer AI-generated comments when the deepseek section is configured.
    #[serde(default)]
    pub ai_comment: bool,

    #[serde(default)]
    pub fixed_comments: Vec<String>,
    #[serde(default)]
    pub emoticons: Vec<String>,

    #[serde(default)]
    pub use_fixed_repost: bool,
    #[serde(default)]
    pub fixed_reposts: Vec<String>,

    /// Per-account breaker threshold; wins over the global default.
    #[serde(default)]
    pub max_soft_failures: Option<u32>,
}

impl AccountConfig {
    /// Minimal account for unit tests: enabled, all actions on.
    #[doc(hidden)]
    pub fn for_tests(remark: &str) -> Self {
        Self {
            remark: remark.to_string(),
            cookie: format!("bili_jct=csrf-{remark}; SESSDATA=x"),
            enabled: true,
            follow_enabled: true,
            like_enabled: true,
            comment_enabled: true,
            repost_enabled: true,
            ai_comment: false,
            fixed_comments: vec!["好运来".to_string()],
            emoticons: vec!["[星星眼]".to_string()],
            use_fixed_repost: false,
            fixed_reposts: Vec::new(),
            max_soft_failures: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeepseekConfig {
    #[serde(default)]
    pub deepseek_api_key: String,
    #[serde(default = "default_deepseek_base_url")]
    pub deepseek_base_url: String,
    #[serde(default = "default_deepseek_model")]
    pub deepseek_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

impl Config {
    /// Load and parse the config file. Missing file or malformed JSON is a
    /// startup error; there is no partial fallback.
    pub fn load(path: &Path) -> Result<Self, FukuError> {
        let raw = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), FukuError> {
        if self.accounts.is_empty() {
            return Err(FukuError::Config("accounts list is empty".to_string()));
        }
        if self.action_delay_min_seconds > self.action_delay_max_seconds {
            return Err(FukuError::Config(format!(
                "action delay bounds are inverted: min={} max={}",
                self.action_delay_min_seconds, self.action_delay_max_seconds
            )));
        }
        Ok(())
    }

    /// Effective breaker threshold for one account.
    pub fn threshold_for(&self, account: &AccountConfig) -> u32 {
        account.max_soft_failures.unwrap_or(self.soft_failure_threshold)
    }
}

fn default_true() -> bool {
    true
}

fn default_action_delay_min() -> f64 {
    2.0
}

fn default_action_delay_max() -> f64 {
    5.0
}

fn default_soft_failure_threshold() -> u32 {
    DEFAULT_SOFT_FAILURE_THRESHOLD
}

fn default_deepseek_base_url() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_deepseek_model() -> String {
    "deepseek-chat".to_string()
}

fn default_temperature() -> f64 {
    1.3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> &'static str {
        r#"
        {
          "accounts": [
            { "remark": "alice", "cookie": "bili_jct=abc; SESSDATA=x", "like_enabled": true }
          ],
          "file_paths": {
            "origin_urls": "data/urls.txt",
            "database_dir": "data/db"
          }
        }"#
    }

    #[test]
    fn defaults_are_applied() {
        let config: Config = serde_json::from_str(minimal_json()).expect("deserialize");
        assert_eq!(config.soft_failure_threshold, 3);
        assert!(config.accounts[0].enabled);
        assert!(config.accounts[0].like_enabled);
        assert!(!config.accounts[0].follow_enabled);
        assert!(!config.telegram.enable);
        assert_eq!(config.deepseek.deepseek_model, "deepseek-chat");
    }

    #[test]
    fn per_account_threshold_wins_over_global() {
        let mut config: Config = serde_json::from_str(minimal_json()).expect("deserialize");
        config.soft_failure_threshold = 5;
        assert_eq!(config.threshold_for(&config.accounts[0]), 5);

        let mut overridden = config.accounts[0].clone();
        overridden.max_soft_failures = Some(2);
        assert_eq!(config.threshold_for(&overridden), 2);
    }

    #[test]
    fn inverted_delay_bounds_are_rejected() {
        let mut config: Config = serde_json::from_str(minimal_json()).expect("deserialize");
        config.action_delay_min_seconds = 9.0;
        config.action_delay_max_seconds = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_accounts_are_rejected() {
        let mut config: Config = serde_json::from_str(minimal_json()).expect("deserialize");
        config.accounts.clear();
        assert!(config.validate().is_err());
    }
}
