pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig};

#[cfg(feature = "lambda")]
pub use config::lambda::{LambdaConfig, S3Storage};

pub use adapters::MemoryStorage;
pub use config::toml_config::TomlConfig;
pub use core::aggregator::{aggregate, StrategyBook, StrategyGroup};
pub use core::csv_parser::parse_csv;
pub use core::{etl::EtlEngine, pipeline::StrategyPipeline};
pub use domain::model::{CollectionAttempt, DataSource, Dataset, RawRecord, SuccessFlag};
pub use domain::report::{Fixed, PerformanceTier, StrategyReport, StrategySummary};
pub use utils::error::{EtlError, Result};
