use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub storage: StorageConfig,
    pub tokenizer: TokenizerConfig,
    pub gc: GcConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Maximum number of working-tier segments resident in memory.
    pub max_active_segments: usize,
    pub enable_indexing: bool,
    /// The sharded layout is canonical; `false` is accepted but ignored.
    pub shard_per_project: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: ".ctxstash".to_string(),
            max_active_segments: 10_000,
            enable_indexing: true,
            shard_per_project: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    pub model: String,
    pub token_limit: u64,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            token_limit: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GcConfig {
    /// Number of recent message segments seeding the root set.
    pub recent_messages_count: usize,
    /// Decisions younger than this many hours are treated as roots.
    pub recent_decision_hours: i64,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            recent_messages_count: 10,
            recent_decision_hours: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub stdout_level: String,
    pub file_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            stdout_level: "info".to_string(),
            file_level: "debug".to_string(),
        }
    }
}

/// Load settings from an optional config file plus `CTXSTASH_*` environment
/// overrides (e.g. `CTXSTASH_STORAGE__DATA_DIR`). Missing sources fall back
/// to the defaults above.
pub fn load_settings() -> Result<Settings, config::ConfigError> {
    let config_path = env::var("CTXSTASH_CONFIG").unwrap_or_else(|_| "ctxstash".to_string());

    let settings: Settings = config::Config::builder()
        .add_source(config::File::with_name(&config_path).required(false))
        .add_source(config::Environment::with_prefix("CTXSTASH").separator("__"))
        .build()?
        .try_deserialize()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.storage.data_dir, ".ctxstash");
        assert_eq!(settings.storage.max_active_segments, 10_000);
        assert!(settings.storage.enable_indexing);
        assert!(settings.storage.shard_per_project);
        assert_eq!(settings.tokenizer.model, "gpt-4");
        assert_eq!(settings.tokenizer.token_limit, 1_000_000);
        assert_eq!(settings.gc.recent_messages_count, 10);
        assert_eq!(settings.gc.recent_decision_hours, 1);
    }
}
