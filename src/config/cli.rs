use crate::adapters::http::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECONDS};
use crate::config::validate_generation;
use crate::core::pacing::{PacingPolicy, DEFAULT_REQUEST_INTERVAL_MS};
use crate::core::ConfigProvider;
use crate::domain::ports::{GenerationSettings, DEFAULT_OUTPUT_FILENAME};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate, TABLE_EXTENSIONS};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "listing-optimizer")]
#[command(about = "Rewrite product listing titles and suggest keywords with a language model")]
pub struct CliConfig {
    /// Listing table to optimize (CSV, or TSV by extension)
    #[arg(short, long)]
    pub input: String,

    /// Directory the optimized table is written to
    #[arg(long, default_value = "./output")]
    pub output_path: String,

    /// File name of the optimized table
    #[arg(long, default_value = DEFAULT_OUTPUT_FILENAME)]
    pub output_file: String,

    /// Leave titles over 80 characters untouched instead of trimming them
    #[arg(long)]
    pub no_auto_trim: bool,

    /// Pause after each row, in milliseconds (0 disables pacing)
    #[arg(long, default_value_t = DEFAULT_REQUEST_INTERVAL_MS)]
    pub request_interval_ms: u64,

    #[command(flatten)]
    pub generation: GenerationSettings,

    /// Chat-completions endpoint of the generation service
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub api_endpoint: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Per-request timeout enforced by the HTTP client
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECONDS)]
    pub timeout_seconds: u64,

    /// Also write run_summary.json next to the output table
    #[arg(long)]
    pub summary: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log as JSON lines")]
    pub log_json: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

impl CliConfig {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        &self.input
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_filename(&self) -> &str {
        &self.output_file
    }

    fn auto_trim(&self) -> bool {
        !self.no_auto_trim
    }

    fn pacing(&self) -> PacingPolicy {
        PacingPolicy::from_millis(self.request_interval_ms)
    }

    fn generation(&self) -> &GenerationSettings {
        &self.generation
    }

    fn write_summary(&self) -> bool {
        self.summary
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input", &self.input)?;
        validation::validate_file_extension("input", &self.input, TABLE_EXTENSIONS)?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_file_name("output_file", &self.output_file)?;
        validation::validate_url("api_endpoint", &self.api_endpoint)?;
        validation::validate_positive_number("timeout_seconds", self.timeout_seconds as usize, 1)?;
        validate_generation("", &self.generation)?;
        validation::validate_api_key("api_key", self.api_key())
    }
}
