use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.yml";
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_output")]
    pub output_folder: String,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub story: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    /// Bearer credential. Falls back to `GROQ_API_KEY` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_chapter_delay")]
    pub chapter_delay_ms: u64,
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
}

fn default_output() -> String {
    "output".to_string()
}
fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_model() -> String {
    "deepseek-r1-distill-llama-70b".to_string()
}
fn default_timeout() -> u64 {
    120
}
fn default_chapter_delay() -> u64 {
    1000
}
fn default_context_chars() -> usize {
    200
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_folder: default_output(),
            llm: LlmConfig::default(),
            story: GenerationConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            chapter_delay_ms: default_chapter_delay(),
            context_chars: default_context_chars(),
        }
    }
}

impl LlmConfig {
    /// Picks the configured key, else the environment value.
    pub fn resolve_api_key(&self, env_value: Option<String>) -> Option<String> {
        self.api_key
            .clone()
            .or(env_value)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl GenerationConfig {
    pub fn chapter_delay(&self) -> Duration {
        Duration::from_millis(self.chapter_delay_ms)
    }
}

impl Config {
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.output_folder)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = Config::load_from(&dir.path().join("config.yml"))?;

        assert_eq!(config.output_folder, "output");
        assert_eq!(config.llm.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.story.chapter_delay(), Duration::from_secs(1));
        assert_eq!(config.story.context_chars, 200);
        assert!(config.llm.api_key.is_none());
        Ok(())
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yml");
        fs::write(
            &path,
            "llm:\n  api_key: gsk_test\n  model: llama-3.3-70b-versatile\nstory:\n  chapter_delay_ms: 0\n",
        )?;

        let config = Config::load_from(&path)?;
        assert_eq!(config.llm.api_key.as_deref(), Some("gsk_test"));
        assert_eq!(config.llm.model, "llama-3.3-70b-versatile");
        assert_eq!(config.llm.timeout_seconds, 120);
        assert_eq!(config.story.chapter_delay(), Duration::ZERO);
        assert_eq!(config.story.context_chars, 200);
        Ok(())
    }

    #[test]
    fn test_invalid_yaml_is_reported() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yml");
        fs::write(&path, "llm: [not, a, map")?;

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse"));
        Ok(())
    }

    #[test]
    fn test_save_roundtrip_omits_missing_key() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yml");
        Config::default().save_to(&path)?;

        let written = fs::read_to_string(&path)?;
        assert!(!written.contains("api_key"));
        assert_eq!(Config::load_from(&path)?.llm.model, default_model());
        Ok(())
    }

    #[test]
    fn test_resolve_api_key_precedence() {
        let mut llm = LlmConfig::default();
        assert_eq!(llm.resolve_api_key(None), None);
        assert_eq!(llm.resolve_api_key(Some("  ".to_string())), None);
        assert_eq!(llm.resolve_api_key(Some("env".to_string())).as_deref(), Some("env"));

        llm.api_key = Some("file".to_string());
        assert_eq!(llm.resolve_api_key(Some("env".to_string())).as_deref(), Some("file"));
    }
}
