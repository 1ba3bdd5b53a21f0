use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use eiweet_core::catalog::{
    DEFAULT_MASTER_BATCH, DEFAULT_PRODUCT_BATCH, DEFAULT_RATIONALE_LABELS, MASTER_SHEET,
    PRODUCTS_SHEET,
};
use eiweet_core::{
    BatchSettings, BracketPolicy, Sanitizer, DEFAULT_BATCH_DELAY, DEFAULT_CHECKPOINT_EVERY,
    DEFAULT_DIFFICULT_WORDS,
};
use eiweet_llm::{
    GenerationOptions, LlmClient, LlmProvider, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT,
};
use eiweet_sheets::{CsvWorkbook, SheetsWorkbook, TableStore};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::info;

/// Where the workbook lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Csv { path: PathBuf },
    Sheets { spreadsheet_id: String },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Csv {
            path: PathBuf::from("workbook"),
        }
    }
}

impl StoreConfig {
    /// Opens the workbook; an unreachable store fails here, before any work.
    pub fn open(&self) -> Result<Box<dyn TableStore>> {
        let store: Box<dyn TableStore> = match self {
            StoreConfig::Csv { path } => Box::new(
                CsvWorkbook::open(path)
                    .with_context(|| format!("cannot open workbook {}", path.display()))?,
            ),
            StoreConfig::Sheets { spreadsheet_id } => {
                let token = env::var("GOOGLE_SHEETS_TOKEN")
                    .map_err(|_| anyhow!("GOOGLE_SHEETS_TOKEN is not set"))?;
                Box::new(
                    SheetsWorkbook::connect(spreadsheet_id.clone(), SecretString::new(token))
                        .with_context(|| format!("cannot reach spreadsheet {spreadsheet_id}"))?,
                )
            }
        };
        info!(location = %store.location(), "workbook opened");
        Ok(store)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub master: String,
    pub products: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            master: MASTER_SHEET.to_string(),
            products: PRODUCTS_SHEET.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BatchSizes {
    pub master: usize,
    pub products: usize,
}

impl Default for BatchSizes {
    fn default() -> Self {
        Self {
            master: DEFAULT_MASTER_BATCH,
            products: DEFAULT_PRODUCT_BATCH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    pub brackets: BracketPolicy,
    pub difficult_words: Vec<String>,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            brackets: BracketPolicy::default(),
            difficult_words: DEFAULT_DIFFICULT_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub rationale_labels: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            rationale_labels: DEFAULT_RATIONALE_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub store: StoreConfig,
    pub sheets: SheetNames,
    pub batches: BatchSizes,
    pub checkpoint_every: usize,
    pub delay_ms: u64,
    pub sanitizer: SanitizerConfig,
    pub parser: ParserConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            sheets: SheetNames::default(),
            batches: BatchSizes::default(),
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            delay_ms: DEFAULT_BATCH_DELAY.as_millis() as u64,
            sanitizer: SanitizerConfig::default(),
            parser: ParserConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Reads the YAML file when it exists, then applies `EIWEET_THROTTLE_MS`.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            Self::from_yaml(&raw)
                .with_context(|| format!("invalid eiweet config {}", path.display()))?
        } else {
            Self::default()
        };
        if let Some(delay) = env::var("EIWEET_THROTTLE_MS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
        {
            config.delay_ms = delay;
        }
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn batch_settings(&self) -> BatchSettings {
        BatchSettings {
            checkpoint_every: self.checkpoint_every,
            delay: Duration::from_millis(self.delay_ms),
        }
    }

    pub fn sanitizer(&self) -> Result<Sanitizer> {
        Sanitizer::new(&self.sanitizer.difficult_words, self.sanitizer.brackets)
            .context("invalid sanitizer word list")
    }
}

/// Completion settings, taken from the environment.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub model: String,
    pub options: GenerationOptions,
}

impl LlmSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let provider_name = var("EIWEET_PROVIDER").unwrap_or_else(|| "gemini".to_string());
        let provider = LlmProvider::from_str(&provider_name)
            .ok_or_else(|| anyhow!("unknown provider {provider_name}"))?;
        let model = var("EIWEET_MODEL").unwrap_or_else(|| provider.default_model().to_string());
        let temperature = var("EIWEET_TEMPERATURE")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_TEMPERATURE);
        let timeout = var("EIWEET_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        Ok(Self {
            provider,
            model,
            options: GenerationOptions {
                temperature,
                timeout,
            },
        })
    }

    pub fn client(&self) -> Result<LlmClient> {
        let client = LlmClient::new(self.provider, self.model.clone(), self.options)?;
        info!(
            provider = client.provider().as_str(),
            model = client.model(),
            "completion client ready"
        );
        Ok(client)
    }
}
