#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod toml_config;

use crate::core::dataset::CsvSource;
use crate::utils::error::Result;
use crate::utils::validation;

#[cfg(feature = "cli")]
use crate::core::dataset::DEFAULT_CACHE_KEY;
#[cfg(feature = "cli")]
use crate::core::pipeline::DEFAULT_OUTPUT_FORMATS;
#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::utils::validation::Validate;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "strategy-etl")]
#[command(about = "Aggregate payment-collection attempts into channel/bank strategies")]
pub struct CliConfig {
    /// CSV file path or http(s) URL
    #[arg(long)]
    pub source: Option<String>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    /// Storage key for the parsed dataset
    #[arg(long, default_value = DEFAULT_CACHE_KEY)]
    pub cache_key: String,

    #[arg(long, help = "Do not read or write the dataset cache")]
    pub no_cache: bool,

    #[arg(long, help = "Ignore the cached dataset and re-read the source")]
    pub refresh: bool,

    #[arg(long, help = "Fail instead of using sample data when no dataset is available")]
    pub no_sample_fallback: bool,

    #[arg(long, default_value = "2")]
    pub average_decimals: usize,

    #[arg(long, value_delimiter = ',', default_value = DEFAULT_OUTPUT_FORMATS)]
    pub output_formats: Vec<String>,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log memory and timing per phase")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn cache_key(&self) -> Option<&str> {
        if self.no_cache {
            None
        } else {
            Some(&self.cache_key)
        }
    }

    fn refresh_cache(&self) -> bool {
        self.refresh
    }

    fn sample_fallback(&self) -> bool {
        !self.no_sample_fallback
    }

    fn average_decimals(&self) -> usize {
        self.average_decimals
    }

    fn output_formats(&self) -> &[String] {
        &self.output_formats
    }

    fn request_timeout_seconds(&self) -> Option<u64> {
        self.timeout_seconds
    }
}

/// Checks a configured CSV location: URLs must be http(s), files must be `.csv`.
pub fn validate_source(field_name: &str, location: &str) -> Result<()> {
    match CsvSource::parse(location) {
        CsvSource::Url(url) => validation::validate_url(field_name, &url),
        CsvSource::File(_) => {
            validation::validate_path(field_name, location)?;
            validation::validate_file_extensions(field_name, &[location], &["csv"])
        }
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(source) = &self.source {
            validate_source("source", source)?;
        }
        validation::validate_path("output_path", &self.output_path)?;
        if !self.no_cache {
            validation::validate_non_empty_string("cache_key", &self.cache_key)?;
        }
        validation::validate_range("average_decimals", self.average_decimals, 0, 6)?;
        validation::validate_output_formats("output_formats", &self.output_formats)?;
        if let Some(timeout) = self.timeout_seconds {
            validation::validate_range("timeout_seconds", timeout, 1, 600)?;
        }
        Ok(())
    }
}
