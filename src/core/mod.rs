pub mod aggregator;
pub mod csv_parser;
pub mod dataset;
pub mod etl;
pub mod pipeline;

pub use crate::domain::model::{Dataset, RawRecord};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::domain::report::StrategyReport;
pub use crate::utils::error::Result;
