pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{ChatCompletionsClient, LocalStorage};
pub use crate::core::{etl::EtlEngine, pipeline::ListingPipeline};
pub use utils::error::{EtlError, Result};
