use serde::{Deserialize, Serialize};
use snake_common::config::{ConfigManager, FileContentConfigProvider, Validate, YamlConfigSerializer};

use super::SnakeConfig;

pub fn get_config_manager(
    file_path: &str,
) -> ConfigManager<FileContentConfigProvider, BotConfig, YamlConfigSerializer> {
    ConfigManager::from_yaml_file(file_path)
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
pub struct BotConfig {
    pub snake: SnakeConfig,
    pub log_prefix: Option<String>,
}

impl Validate for BotConfig {
    fn validate(&self) -> Result<(), String> {
        self.snake.validate()?;
        if let Some(ref prefix) = self.log_prefix
            && prefix.trim().is_empty()
        {
            return Err("log_prefix must not be blank".to_string());
        }
        Ok(())
    }
}
