use clap::Parser;
use listing_optimizer::core::ConfigProvider;
use listing_optimizer::utils::{logger, validation::Validate};
use listing_optimizer::{ChatCompletionsClient, CliConfig, EtlEngine, ListingPipeline, LocalStorage};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    logger::init(config.verbose, config.log_json);

    tracing::info!("Starting listing-optimizer");
    tracing::debug!(
        "Input: {}, output: {}/{}, auto-trim: {}, model: {}",
        config.input_path(),
        config.output_path(),
        config.output_filename(),
        config.auto_trim(),
        config.generation().model
    );

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code().max(1));
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 生成服務客戶端只建立一次，注入管道
    let generator = match ChatCompletionsClient::new(
        config.api_endpoint.clone(),
        config.api_key().unwrap_or_default(),
        Duration::from_secs(config.timeout_seconds),
    ) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code().max(1));
        }
    };

    tracing::debug!("Generation endpoint: {}", generator.endpoint());

    let pipeline = ListingPipeline::new(LocalStorage::default(), config, generator);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(outcome) => {
            println!("🎉 Optimization complete! {} rows processed.", outcome.summary.total_rows);
            if let Some(message) = outcome.summary.length_message() {
                println!("{}", message);
            }
            println!("📥 Optimized CSV saved to: {}", outcome.output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Optimization failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

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
