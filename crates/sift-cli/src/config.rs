use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use sift_core::PriceTable;

// claude-3-haiku pricing, USD per million tokens
const DEFAULT_DECISION_PRICES: PriceTable = PriceTable::new(0.25, 1.25, 0.03, 0.30);
const DEFAULT_ANALYSIS_PRICES: PriceTable = PriceTable::new(0.25, 1.25, 0.03, 0.30);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderEntry,
    pub models: ModelsEntry,
    pub pricing: PricingEntry,
    pub search: SearchEntry,
    pub history: HistoryEntry,
    pub auth: AuthEntry,
    pub pipeline: PipelineEntry,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEntry {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsEntry {
    pub decision: String,
    pub decision_max_tokens: u32,
    pub answer: String,
    pub answer_max_tokens: u32,
    pub analysis: String,
    pub analysis_max_tokens: u32,
}

impl Default for ModelsEntry {
    fn default() -> Self {
        Self {
            decision: "claude-3-haiku-20240307".to_string(),
            decision_max_tokens: 1000,
            answer: "claude-3-5-sonnet-20240620".to_string(),
            answer_max_tokens: 4000,
            analysis: "claude-3-haiku-20240307".to_string(),
            analysis_max_tokens: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingEntry {
    pub decision: PriceTable,
    pub analysis: PriceTable,
}

impl Default for PricingEntry {
    fn default() -> Self {
        Self {
            decision: DEFAULT_DECISION_PRICES,
            analysis: DEFAULT_ANALYSIS_PRICES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchEntry {
    /// Base URL of the SearxNG instance
    pub host: String,
    /// Candidate URLs per query (hard ceiling of 5 applies)
    pub max_results: usize,
}

impl Default for SearchEntry {
    fn default() -> Self {
        Self {
            host: "http://localhost:8080".to_string(),
            max_results: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryEntry {
    /// Maximum turns kept per user; oldest are dropped first
    pub max_turns: usize,
}

impl Default for HistoryEntry {
    fn default() -> Self {
        Self { max_turns: 10 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthEntry {
    /// User ids permitted to talk to the bot; empty means open access
    pub allowed_users: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineEntry {
    /// What a failed search-necessity call resolves to
    pub search_on_decision_error: bool,
}

impl Default for PipelineEntry {
    fn default() -> Self {
        Self {
            search_on_decision_error: true,
        }
    }
}

impl Config {
    /// Load from the given path, or from `~/.config/sift/config.toml`.
    /// A missing file yields the defaults (the API key can still come from
    /// the environment).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else if path.is_some() {
            anyhow::bail!("Config file not found: {}", config_path.display())
        } else {
            Ok(Config::default())
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("sift").join("config.toml"))
    }

    /// The API key: config value first, `ANTHROPIC_API_KEY` env var second.
    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = &self.provider.api_key {
            return Ok(key.clone());
        }
        std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            anyhow::anyhow!(
                "No API key configured. Set ANTHROPIC_API_KEY or add to {}:\n\n\
                 [provider]\n\
                 api_key = \"sk-ant-...\"\n",
                Self::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "~/.config/sift/config.toml".to_string())
            )
        })
    }
}
