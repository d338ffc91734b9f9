use crate::core::pacing::PacingPolicy;
use crate::domain::model::{Table, TransformResult};
use crate::utils::error::{GenerationError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 120;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_OUTPUT_FILENAME: &str = "optimized_enriched_ebay_titles.csv";

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct GenerationSettings {
    /// Model identifier sent to the generation service
    #[cfg_attr(feature = "cli", arg(long, default_value = DEFAULT_MODEL))]
    pub model: String,

    /// Maximum number of tokens the model may generate per row
    #[cfg_attr(feature = "cli", arg(long, default_value_t = DEFAULT_MAX_TOKENS))]
    pub max_tokens: u32,

    /// Sampling temperature
    #[cfg_attr(feature = "cli", arg(long, default_value_t = DEFAULT_TEMPERATURE))]
    pub temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// The external text-generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> std::result::Result<String, GenerationError>;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for std::sync::Arc<T> {
    async fn generate(&self, request: &GenerationRequest) -> std::result::Result<String, GenerationError> {
        (**self).generate(request).await
    }
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_filename(&self) -> &str;
    fn auto_trim(&self) -> bool;
    fn pacing(&self) -> PacingPolicy;
    fn generation(&self) -> &GenerationSettings;
    /// Also write `run_summary.json` beside the output table.
    fn write_summary(&self) -> bool {
        false
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Table>;
    async fn transform(&self, table: Table) -> Result<TransformResult>;
    async fn load(&self, result: &TransformResult) -> Result<String>;
}
