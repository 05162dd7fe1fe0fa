use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::log;
use super::{
    ConfigContentProvider, ConfigSerializer, FileContentConfigProvider, Validate,
    YamlConfigSerializer,
};

pub struct ConfigManager<TConfigContentProvider, TConfig, TConfigSerializer = YamlConfigSerializer>
where
    TConfigContentProvider: ConfigContentProvider,
    TConfig: Clone + for<'de> Deserialize<'de> + Serialize + Validate + Default,
    TConfigSerializer: ConfigSerializer<TConfig>,
{
    config_serializer: TConfigSerializer,
    config_content_provider: TConfigContentProvider,
    config: Arc<Mutex<Option<TConfig>>>,
}

impl<TConfig> ConfigManager<FileContentConfigProvider, TConfig, YamlConfigSerializer>
where
    TConfig: Clone + for<'de> Deserialize<'de> + Serialize + Validate + Default,
{
    pub fn from_yaml_file(file_path: &str) -> Self {
        Self::new(FileContentConfigProvider::new(file_path), YamlConfigSerializer::new())
    }
}

impl<TConfigContentProvider, TConfig, TConfigSerializer>
    ConfigManager<TConfigContentProvider, TConfig, TConfigSerializer>
where
    TConfigContentProvider: ConfigContentProvider,
    TConfig: Clone + for<'de> Deserialize<'de> + Serialize + Validate + Default,
    TConfigSerializer: ConfigSerializer<TConfig>,
{
    pub fn new(
        config_content_provider: TConfigContentProvider,
        config_serializer: TConfigSerializer,
    ) -> Self {
        Self {
            config: Arc::new(Mutex::new(None)),
            config_content_provider,
            config_serializer,
        }
    }

    fn cached(&self) -> Result<MutexGuard<'_, Option<TConfig>>, String> {
        self.config
            .lock()
            .map_err(|_| "Config cache lock poisoned".to_string())
    }

    /// Loads and validates the stored config, falling back to
    /// `TConfig::default()` when nothing is stored yet.
    pub fn get_config(&self) -> Result<TConfig, String> {
        let mut current = self.cached()?;

        if let Some(config) = current.as_ref() {
            return Ok(config.clone());
        }

        let Some(config_data) = self.config_content_provider.get_config_content()? else {
            return Ok(TConfig::default());
        };

        let config = self.config_serializer.deserialize(&config_data)?;
        config.validate().map_err(|e| {
            format!(
                "Config validation error in {}: {}",
                self.config_content_provider.location(),
                e
            )
        })?;

        *current = Some(config.clone());
        Ok(config)
    }

    pub fn set_config(&self, config: &TConfig) -> Result<(), String> {
        config
            .validate()
            .map_err(|e| format!("Config validation error: {}", e))?;

        let serialized_config = self.config_serializer.serialize(config)?;

        self.config_content_provider
            .set_config_content(&serialized_config)?;

        *self.cached()? = Some(config.clone());
        Ok(())
    }

    /// Same as `get_config`, but writes the defaults out when no config is
    /// stored so there is a file to edit next time.
    pub fn load_or_create(&self) -> Result<TConfig, String> {
        if self.config_content_provider.get_config_content()?.is_some() {
            return self.get_config();
        }

        let config = TConfig::default();
        self.set_config(&config)?;
        log!(
            "Wrote default config to {}",
            self.config_content_provider.location()
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestConfig {
        turn_timeout_secs: u64,
        greeting: String,
    }

    impl Default for TestConfig {
        fn default() -> Self {
            Self {
                turn_timeout_secs: 15,
                greeting: "hi".to_string(),
            }
        }
    }

    impl Validate for TestConfig {
        fn validate(&self) -> Result<(), String> {
            if self.turn_timeout_secs == 0 {
                return Err("turn_timeout_secs must be positive".to_string());
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryContentProvider {
        content: Mutex<Option<String>>,
    }

    impl MemoryContentProvider {
        fn with_content(content: &str) -> Self {
            Self {
                content: Mutex::new(Some(content.to_string())),
            }
        }
    }

    impl ConfigContentProvider for MemoryContentProvider {
        fn get_config_content(&self) -> Result<Option<String>, String> {
            Ok(self.content.lock().unwrap().clone())
        }

        fn set_config_content(&self, content: &str) -> Result<(), String> {
            *self.content.lock().unwrap() = Some(content.to_string());
            Ok(())
        }

        fn location(&self) -> String {
            "memory".to_string()
        }
    }

    #[test]
    fn test_missing_content_returns_default() {
        let manager: ConfigManager<_, TestConfig, _> =
            ConfigManager::new(MemoryContentProvider::default(), YamlConfigSerializer::new());
        assert_eq!(manager.get_config().unwrap(), TestConfig::default());
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let manager: ConfigManager<_, TestConfig, _> =
            ConfigManager::new(MemoryContentProvider::default(), YamlConfigSerializer::new());
        let config = manager.load_or_create().unwrap();
        assert_eq!(config, TestConfig::default());

        let stored = manager.config_content_provider.get_config_content().unwrap();
        assert!(stored.unwrap().contains("turn_timeout_secs: 15"));
    }

    #[test]
    fn test_invalid_config_is_rejected_with_location() {
        let provider = MemoryContentProvider::with_content("turn_timeout_secs: 0\ngreeting: yo\n");
        let manager: ConfigManager<_, TestConfig, _> =
            ConfigManager::new(provider, YamlConfigSerializer::new());
        let err = manager.get_config().unwrap_err();
        assert!(err.contains("memory"));
        assert!(err.contains("turn_timeout_secs"));
    }

    #[test]
    fn test_set_config_refuses_invalid_values() {
        let manager: ConfigManager<_, TestConfig, _> =
            ConfigManager::new(MemoryContentProvider::default(), YamlConfigSerializer::new());
        let invalid = TestConfig {
            turn_timeout_secs: 0,
            ..TestConfig::default()
        };
        assert!(manager.set_config(&invalid).is_err());
        assert!(manager.config_content_provider.get_config_content().unwrap().is_none());
    }

    #[test]
    fn test_config_is_cached_after_first_read() {
        let provider = MemoryContentProvider::with_content("turn_timeout_secs: 60\ngreeting: yo\n");
        let manager: ConfigManager<_, TestConfig, _> =
            ConfigManager::new(provider, YamlConfigSerializer::new());
        assert_eq!(manager.get_config().unwrap().turn_timeout_secs, 60);

        manager
            .config_content_provider
            .set_config_content("turn_timeout_secs: 5\ngreeting: yo\n")
            .unwrap();
        assert_eq!(manager.get_config().unwrap().turn_timeout_secs, 60);
    }
}
