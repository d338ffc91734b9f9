#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

use crate::domain::ports::GenerationSettings;
use crate::utils::error::Result;
use crate::utils::validation;

/// Checks shared by every configuration front end; `prefix` qualifies field
/// names in error messages.
pub(crate) fn validate_generation(prefix: &str, settings: &GenerationSettings) -> Result<()> {
    validation::validate_non_empty_string(&format!("{}model", prefix), &settings.model)?;
    validation::validate_positive_number(
        &format!("{}max_tokens", prefix),
        settings.max_tokens as usize,
        1,
    )?;
    validation::validate_range(&format!("{}temperature", prefix), settings.temperature, 0.0, 2.0)
}
