use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use reflexrs_core::{CacheConfig, GenerateOptions, MatchOptions, ReflexConfig, StoreConfig};

/// Directory under `$HOME` holding `config.json` and the default database.
pub const CONFIG_DIR_NAME: &str = "reflexrs";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub agents: AgentsConfig,
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub database: StoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub matching: MatchOptions,
    #[serde(default)]
    pub reflex: ReflexSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReflexSettings {
    #[serde(default = "ReflexSettings::default_reinforce_amount")]
    pub reinforce_amount: f64,
    /// Space new patterns go to and candidates are drawn from.
    #[serde(default)]
    pub default_space: Option<String>,
    #[serde(default)]
    pub learn_generated: bool,
    #[serde(default = "ReflexSettings::default_candidate_limit")]
    pub candidate_limit: u64,
}

impl Default for ReflexSettings {
    fn default() -> Self {
        Self {
            reinforce_amount: Self::default_reinforce_amount(),
            default_space: None,
            learn_generated: false,
            candidate_limit: Self::default_candidate_limit(),
        }
    }
}

impl ReflexSettings {
    const fn default_reinforce_amount() -> f64 {
        10.0
    }

    const fn default_candidate_limit() -> u64 {
        1000
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentsConfig {
    pub defaults: AgentDefaults,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentDefaults {
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub zhipu: ProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
}

impl Config {
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(CONFIG_DIR_NAME))
    }

    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_dir()?.join("config.json");

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'reflexrs init' to create config.",
                config_path.display()
            );
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config at {}: {e}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        let db_url = StoreConfig::sqlite_file(&config_dir.join("reflexrs.db")).url;
        std::fs::write(&config_path, Self::template(&db_url))?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Edit the config file and add your Zhipu API key");
        println!("   2. Teach a reflex: reflexrs add \"hello\" \"Hi there!\" --strength 60");
        println!("   3. Run 'reflexrs ask' to start a conversation");
        println!();
        println!("🔧 Configuration options:");
        println!("   - matching.threshold: minimum confidence for a match (0-100)");
        println!("   - reflex.reinforce_amount: strength gained each time a pattern fires");
        println!("   - cache.capacity / cache.ttl_secs: in-process lookup cache sizing");
        println!();
        Ok(())
    }

    fn template(db_url: &str) -> String {
        let template = r#"{
  "agents": {
    "defaults": {
      "model": "glm-4-flash",
      "max_tokens": 1024,
      "temperature": 0.7,
      "system_prompt": "You are a concise assistant. Answer in one or two sentences."
    }
  },
  "providers": {
    "zhipu": {
      "api_key": "your-zhipu-api-key-here"
    }
  },
  "database": {
    "url": "__DB_URL__",
    "max_connections": 8,
    "min_connections": 1,
    "op_timeout_ms": 5000
  },
  "cache": {
    "enabled": true,
    "capacity": 1024,
    "ttl_secs": 300
  },
  "matching": {
    "threshold": 30.0,
    "limit": 10,
    "exact_first": true
  },
  "reflex": {
    "reinforce_amount": 10.0,
    "learn_generated": false,
    "candidate_limit": 1000
  }
}"#;
        template.replace("__DB_URL__", &db_url.replace('\\', "\\\\"))
    }

    #[must_use]
    pub fn generate_options(&self) -> GenerateOptions {
        let defaults = &self.agents.defaults;
        GenerateOptions {
            model: defaults.model.clone(),
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
            system_prompt: defaults.system_prompt.clone(),
        }
    }

    #[must_use]
    pub fn reflex_config(&self) -> ReflexConfig {
        ReflexConfig {
            reinforce_amount: self.reflex.reinforce_amount,
            space_id: self.reflex.default_space.clone(),
            candidate_limit: self.reflex.candidate_limit,
            learn_generated: self.reflex.learn_generated,
            matching: self.matching.clone(),
            generate: self.generate_options(),
        }
    }
}
