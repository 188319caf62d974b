//! Configuration management.
//!
//! Configuration is a TOML file with environment variable overrides under
//! the `PUBMED_HERALD` prefix. Secrets default from the environment so they
//! never need to live in the file:
//!
//! ```toml
//! search_url = "https://pubmed.ncbi.nlm.nih.gov/?term=%22IgG4-RD%22"
//! hashtag = "#IgG4RD"
//!
//! [schedule]
//! poll_interval_secs = 3600
//! fetch_retry_cooldown_secs = 300
//! pause_poll_secs = 5
//!
//! [publish]
//! max_post_length = 140
//! max_attempts = 100
//! backoff_base_secs = 2
//! article_cooldown_secs = 60
//!
//! [poster]
//! endpoint = "https://api.twitter.com/2/tweets"
//!
//! [telegram]
//! channel = "@mychannel"
//! recipients = ["123456789"]
//! admins = ["123456789"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::coordinator::CoordinatorSettings;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// PubMed advanced-search results URL to poll
    #[serde(default)]
    pub search_url: String,

    /// Hashtag prefixed to every post
    #[serde(default = "default_hashtag")]
    pub hashtag: String,

    /// Scheduling settings
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Publishing settings
    #[serde(default)]
    pub publish: PublishConfig,

    /// Microblog poster settings
    #[serde(default)]
    pub poster: PosterConfig,

    /// Telegram settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// State store settings
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_url: String::new(),
            hashtag: default_hashtag(),
            schedule: ScheduleConfig::default(),
            publish: PublishConfig::default(),
            poster: PosterConfig::default(),
            telegram: TelegramConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Settings slice the coordinator runs on.
    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            search_url: self.search_url.clone(),
            hashtag: self.hashtag.clone(),
            max_post_length: self.publish.max_post_length,
            poll_interval: Duration::from_secs(self.schedule.poll_interval_secs),
            fetch_retry_cooldown: Duration::from_secs(self.schedule.fetch_retry_cooldown_secs),
            pause_poll: Duration::from_secs(self.schedule.pause_poll_secs),
            article_cooldown: Duration::from_secs(self.publish.article_cooldown_secs),
            max_publish_attempts: self.publish.max_attempts,
            backoff_base: Duration::from_secs(self.publish.backoff_base_secs),
            private_recipients: self.telegram.recipients.clone(),
            admin_recipients: self.telegram.admins.clone(),
            channel: self.telegram.channel.clone(),
        }
    }
}

fn default_hashtag() -> String {
    "#PubMed".to_string()
}

/// Cycle scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Minimum seconds between poll cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Cooldown after a failed fetch, shorter than the normal interval
    #[serde(default = "default_fetch_retry_cooldown")]
    pub fetch_retry_cooldown_secs: u64,

    /// Seconds between pause-signal checks while paused
    #[serde(default = "default_pause_poll")]
    pub pause_poll_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            fetch_retry_cooldown_secs: default_fetch_retry_cooldown(),
            pause_poll_secs: default_pause_poll(),
        }
    }
}

fn default_poll_interval() -> u64 {
    60 * 60
}

fn default_fetch_retry_cooldown() -> u64 {
    60 * 5
}

fn default_pause_poll() -> u64 {
    5
}

/// Publishing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Platform post length limit
    #[serde(default = "default_max_post_length")]
    pub max_post_length: usize,

    /// Bound on publish attempts per article
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base seconds of the linear retry backoff
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: u64,

    /// Seconds between two articles, to respect platform rate limits
    #[serde(default = "default_article_cooldown")]
    pub article_cooldown_secs: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            max_post_length: default_max_post_length(),
            max_attempts: default_max_attempts(),
            backoff_base_secs: default_backoff_base(),
            article_cooldown_secs: default_article_cooldown(),
        }
    }
}

fn default_max_post_length() -> usize {
    140
}

fn default_max_attempts() -> u32 {
    100
}

fn default_backoff_base() -> u64 {
    2
}

fn default_article_cooldown() -> u64 {
    60
}

/// Microblog poster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosterConfig {
    /// Status-update endpoint
    #[serde(default = "default_poster_endpoint")]
    pub endpoint: String,

    /// Bearer token; defaults from `POSTER_TOKEN`
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            endpoint: default_poster_endpoint(),
            token: std::env::var("POSTER_TOKEN").ok(),
        }
    }
}

fn default_poster_endpoint() -> String {
    "https://api.twitter.com/2/tweets".to_string()
}

/// Telegram configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token; defaults from `TELEGRAM_BOT_TOKEN`
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Public channel for the rich message
    #[serde(default)]
    pub channel: Option<String>,

    /// Private recipients notified with the plain post text
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Recipients notified when a cycle finds nothing new
    #[serde(default)]
    pub admins: Vec<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            channel: None,
            recipients: Vec::new(),
            admins: Vec::new(),
        }
    }
}

/// State store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the JSON state file; defaults under the user data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Load configuration from a file, with environment overrides.
pub fn load_config(path: &PathBuf) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path.as_path()))
        .add_source(
            config::Environment::with_prefix("PUBMED_HERALD")
                .separator("__")
                .list_separator(","),
        )
        .build()?;

    settings.try_deserialize()
}

/// Look for a config file in the working directory, then the user config
/// directory.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("pubmed-herald.toml");
    if local.exists() {
        return Some(local);
    }
    let user = dirs::config_dir()?.join("pubmed-herald").join("config.toml");
    if user.exists() {
        return Some(user);
    }
    None
}
