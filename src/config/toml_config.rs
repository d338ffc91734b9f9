use crate::adapters::http::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECONDS};
use crate::config::validate_generation;
use crate::core::pacing::{PacingPolicy, DEFAULT_REQUEST_INTERVAL_MS};
use crate::core::ConfigProvider;
use crate::domain::ports::{GenerationSettings, DEFAULT_OUTPUT_FILENAME};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate, TABLE_EXTENSIONS};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub input: InputConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(flatten)]
    pub settings: GenerationSettings,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            timeout_seconds: default_timeout(),
            settings: GenerationSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_true")]
    pub auto_trim: bool,
    #[serde(default = "default_interval")]
    pub request_interval_ms: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            auto_trim: true,
            request_interval_ms: DEFAULT_REQUEST_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(default)]
    pub write_summary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_true() -> bool {
    true
}

fn default_interval() -> u64 {
    DEFAULT_REQUEST_INTERVAL_MS
}

fn default_filename() -> String {
    DEFAULT_OUTPUT_FILENAME.to_string()
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OPENAI_API_KEY})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// Everything except the API key, which a dry run does not need.
    pub fn validate_settings(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        validation::validate_path("input.path", &self.input.path)?;
        validation::validate_file_extension("input.path", &self.input.path, TABLE_EXTENSIONS)?;
        validation::validate_url("generation.endpoint", &self.generation.endpoint)?;
        validation::validate_positive_number(
            "generation.timeout_seconds",
            self.generation.timeout_seconds as usize,
            1,
        )?;
        validate_generation("generation.", &self.generation.settings)?;
        validation::validate_path("load.output_path", &self.load.output_path)?;
        validation::validate_file_name("load.filename", &self.load.filename)?;
        Ok(())
    }

    pub fn api_key(&self) -> Option<&str> {
        self.generation.api_key.as_deref()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.input.path
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_filename(&self) -> &str {
        &self.load.filename
    }

    fn auto_trim(&self) -> bool {
        self.policy.auto_trim
    }

    fn pacing(&self) -> PacingPolicy {
        PacingPolicy::from_millis(self.policy.request_interval_ms)
    }

    fn generation(&self) -> &GenerationSettings {
        &self.generation.settings
    }

    fn write_summary(&self) -> bool {
        self.load.write_summary
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_settings()?;
        validation::validate_api_key("generation.api_key", self.api_key())
    }
}
