use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub strings: StringsConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub suggest: SuggestConfig,
    #[serde(default)]
    pub reactions: ReactionsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StringsConfig {
    /// JSON document with keywords and reply templates
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

/// Identifier lists backing the authorization tiers.
///
/// Admin ids are matched against both chat ids and sender user ids, the
/// chat lists only against chat ids.
#[derive(Debug, Deserialize, Clone)]
pub struct AccessConfig {
    #[serde(default)]
    pub admin_ids: Vec<i64>,
    #[serde(default)]
    pub operational_chats: Vec<i64>,
    #[serde(default)]
    pub restricted_chats: Vec<i64>,
    #[serde(default = "default_recognition_phrase")]
    pub recognition_phrase: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            admin_ids: Vec::new(),
            operational_chats: Vec::new(),
            restricted_chats: Vec::new(),
            recognition_phrase: default_recognition_phrase(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    /// Long-poll wait in seconds
    #[serde(default = "default_poll_timeout")]
    pub timeout_secs: u32,
    /// Drop pending updates on startup, keeping only the newest one
    #[serde(default = "default_skip_backlog")]
    pub skip_backlog: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_poll_timeout(),
            skip_backlog: default_skip_backlog(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SuggestConfig {
    #[serde(default = "default_latitude")]
    pub fallback_latitude: f64,
    #[serde(default = "default_longitude")]
    pub fallback_longitude: f64,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            fallback_latitude: default_latitude(),
            fallback_longitude: default_longitude(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReactionsConfig {
    /// Substring that makes the bot answer a group message with a sticker
    #[serde(default = "default_sticker_trigger")]
    pub sticker_trigger: String,
    #[serde(default = "default_sticker_id")]
    pub sticker_id: String,
}

impl Default for ReactionsConfig {
    fn default() -> Self {
        Self {
            sticker_trigger: default_sticker_trigger(),
            sticker_id: default_sticker_id(),
        }
    }
}

fn default_recognition_phrase() -> String {
    "__FOR_RECOGNITION__".to_string()
}

fn default_poll_timeout() -> u32 {
    10
}

fn default_skip_backlog() -> bool {
    true
}

fn default_latitude() -> f64 {
    25.017356
}

fn default_longitude() -> f64 {
    121.539755
}

fn default_sticker_trigger() -> String {
    "蛇".to_string()
}

fn default_sticker_id() -> String {
    "CAADBAADQQsAArdZUgKNmzWicXfDmAI".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            anyhow::bail!("config: telegram.bot_token is missing");
        }
        if self.strings.path.as_os_str().is_empty() {
            anyhow::bail!("config: strings.path is missing");
        }
        if self.storage.database_path.as_os_str().is_empty() {
            anyhow::bail!("config: storage.database_path is missing");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[telegram]
bot_token = "123:abc"

[strings]
path = "strings.json"

[storage]
database_path = "restaurants.db"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert!(config.access.admin_ids.is_empty());
        assert!(config.access.operational_chats.is_empty());
        assert!(config.access.restricted_chats.is_empty());
        assert_eq!(config.access.recognition_phrase, "__FOR_RECOGNITION__");
        assert_eq!(config.polling.timeout_secs, 10);
        assert!(config.polling.skip_backlog);
        assert_eq!(config.reactions.sticker_trigger, "蛇");
    }

    #[test]
    fn test_access_lists_parsed() {
        let content = format!(
            "{}\n[access]\nadmin_ids = [42]\noperational_chats = [-100, 7]\n",
            MINIMAL
        );
        let config = Config::from_toml_str(&content).unwrap();
        assert_eq!(config.access.admin_ids, vec![42]);
        assert_eq!(config.access.operational_chats, vec![-100, 7]);
        assert!(config.access.restricted_chats.is_empty());
    }

    #[test]
    fn test_missing_section_fails() {
        let content = "[telegram]\nbot_token = \"t\"\n[strings]\npath = \"s.json\"\n";
        assert!(Config::from_toml_str(content).is_err());
    }

    #[test]
    fn test_empty_token_fails() {
        let content = MINIMAL.replace("123:abc", "  ");
        let err = Config::from_toml_str(&content).unwrap_err();
        assert!(err.to_string().contains("bot_token"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.storage.database_path, PathBuf::from("restaurants.db"));
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = Config::load(Path::new("/nonexistent/eatsnake.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/eatsnake.toml"));
    }
}
