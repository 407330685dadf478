use anyhow::Context;
use clap::Parser;
use strategy_etl::config::toml_config::TomlConfig;
use strategy_etl::core::dataset::{cache_file_name, CsvSource};
use strategy_etl::core::ConfigProvider;
use strategy_etl::utils::error::ErrorSeverity;
use strategy_etl::utils::{logger, validation::Validate};
use strategy_etl::{aggregate, parse_csv, EtlEngine, LocalStorage, StrategyPipeline};

#[derive(Parser)]
#[command(name = "toml-etl")]
#[command(about = "Strategy report driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "strategy-etl.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Ignore the cached dataset and re-read the source
    #[arg(long)]
    refresh: bool,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // [monitoring] log_level = "debug" 等同 --verbose
    let config_debug = config
        .monitoring
        .as_ref()
        .and_then(|m| m.log_level.as_deref())
        .is_some_and(|level| level.eq_ignore_ascii_case("debug"));
    logger::init_cli_logger(args.verbose || config_debug);

    tracing::info!("🚀 Starting TOML-based strategy ETL");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 命令列覆蓋設定
    if args.refresh {
        config.cache.refresh = true;
        tracing::info!("🔧 Cache refresh forced from command line");
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No output will be written");
        perform_dry_run(&config).await?;
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = StrategyPipeline::new(storage, config);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Strategy report completed successfully!");
            println!("✅ Strategy report completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

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
        "  Report: {} v{}",
        config.report.name,
        config.report.version.as_deref().unwrap_or("-")
    );
    if let Some(description) = &config.report.description {
        println!("  Description: {}", description);
    }
    println!("  Source: {}", config.source().unwrap_or("(none)"));
    match config.cache_key() {
        Some(key) => println!("  Cache: {} (refresh: {})", key, config.refresh_cache()),
        None => println!("  Cache: disabled"),
    }
    println!("  Sample Fallback: {}", config.sample_fallback());
    println!("  Average Decimals: {}", config.average_decimals());
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(config: &TomlConfig) -> anyhow::Result<()> {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📡 Data Source Analysis:");
    match config.source().map(CsvSource::parse) {
        Some(CsvSource::Url(url)) => {
            println!("  URL: {}", url);
            println!("  Timeout: {:?}", config.request_timeout_seconds());
            println!("  (remote source is not fetched during a dry run)");
        }
        Some(CsvSource::File(path)) => {
            println!("  File: {}", path.display());
            // 本機檔案可直接預覽分組結果
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let text = String::from_utf8_lossy(&bytes);
            let records = parse_csv(text.trim_start_matches('\u{feff}'));
            let book = aggregate(&records);
            println!("  Records: {}", records.len());
            println!("  Strategies: {}", book.groups().len());
            for summary in book.summaries(config.average_decimals()) {
                println!(
                    "    {} → {} records, success {}%, collected {}%",
                    summary.name, summary.record_count, summary.success_rate, summary.collection_rate
                );
            }
        }
        None => {
            println!("  No source configured");
            if config.sample_fallback() {
                println!("  Sample dataset will be used when the cache is empty");
            }
        }
    }

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));
    if let Some(key) = config.cache_key() {
        println!("  Cache file: {}", cache_file_name(key));
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");

    Ok(())
}
