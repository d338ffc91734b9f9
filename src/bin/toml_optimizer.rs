use anyhow::Context;
use clap::Parser;
use listing_optimizer::core::enrichment::build_prompt;
use listing_optimizer::core::table_io::{delimiter_for, format_preview, read_table, PREVIEW_ROWS};
use listing_optimizer::core::{ConfigProvider, Storage};
use listing_optimizer::domain::model::{
    ListingInput, BRAND_COLUMN, CATEGORY_COLUMN, SEED_KEYWORD_COLUMN, TITLE_COLUMN,
};
use listing_optimizer::utils::{logger, validation::Validate};
use listing_optimizer::{ChatCompletionsClient, EtlEngine, ListingPipeline, LocalStorage, TomlConfig};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "toml-optimizer")]
#[command(about = "Listing optimizer driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "listing-optimizer.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override auto-trim setting from config
    #[arg(long)]
    auto_trim: Option<bool>,

    /// Inspect the input and show the first prompt without calling the model
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    let verbose = args.verbose
        || config
            .monitoring
            .as_ref()
            .and_then(|m| m.log_level.as_deref())
            .is_some_and(|level| level.eq_ignore_ascii_case("debug"));
    logger::init_cli_logger(verbose);

    tracing::info!("🚀 Starting TOML-based listing optimizer");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    if let Some(auto_trim) = args.auto_trim {
        config.policy.auto_trim = auto_trim;
        tracing::info!("🔧 Auto-trim overridden to: {}", auto_trim);
    }

    // Dry runs never call the service, so the API key is not required.
    let validation = if args.dry_run {
        config.validate_settings()
    } else {
        config.validate()
    };
    if let Err(e) = validation {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code().max(1));
    }

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No generation requests will be made");
        perform_dry_run(&config).await?;
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());

    let generator = ChatCompletionsClient::new(
        config.generation.endpoint.clone(),
        config.api_key().unwrap_or_default(),
        Duration::from_secs(config.generation.timeout_seconds),
    )?;
    let pipeline = ListingPipeline::new(LocalStorage::default(), config, generator);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(outcome) => {
            println!("🎉 Optimization complete! {} rows processed.", outcome.summary.total_rows);
            if let Some(message) = outcome.summary.length_message() {
                println!("{}", message);
            }
            println!("📥 Optimized table saved to: {}", outcome.output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Optimization failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name,
        config.pipeline.version.as_deref().unwrap_or("0")
    );
    println!("  Input: {}", config.input_path());
    println!("  Output: {}/{}", config.output_path(), config.output_filename());
    println!("  Endpoint: {}", config.generation.endpoint);
    println!(
        "  Model: {} (max_tokens: {}, temperature: {})",
        config.generation().model,
        config.generation().max_tokens,
        config.generation().temperature
    );
    println!("  Auto-trim: {}", config.auto_trim());
    println!("  Pacing: {:?} per row", config.pacing().delay());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(config: &TomlConfig) -> anyhow::Result<()> {
    let input_path = config.input_path();
    let data = LocalStorage::default()
        .read_file(input_path)
        .await
        .with_context(|| format!("read input table {}", input_path))?;
    let table = read_table(&data, delimiter_for(input_path))
        .with_context(|| format!("parse input table {}", input_path))?;

    println!("🔍 Dry Run Analysis:");
    println!();
    println!("📊 Input table: {} rows, {} columns", table.len(), table.headers.len());
    for column in [TITLE_COLUMN, BRAND_COLUMN, CATEGORY_COLUMN, SEED_KEYWORD_COLUMN] {
        let marker = if table.has_column(column) { "✅" } else { "➖" };
        println!("  {} {}", marker, column);
    }

    if !table.is_empty() {
        println!();
        println!("👀 First {} rows:", table.len().min(PREVIEW_ROWS));
        println!("{}", format_preview(&table, PREVIEW_ROWS));
    }

    let estimated = config.pacing().total_delay(table.len());
    println!();
    println!("⏱️ Minimum run time from pacing alone: {:?}", estimated);

    if let Some(record) = table.records.first() {
        let input = ListingInput::from_record(&table, record);
        println!();
        println!("📝 Prompt for the first row:");
        println!("{}", build_prompt(&input));
    }

    println!();
    println!("✅ Dry run analysis complete.");
    Ok(())
}
