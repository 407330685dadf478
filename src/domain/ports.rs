use crate::domain::model::Dataset;
use crate::domain::report::StrategyReport;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Key-addressed byte storage. Backs both the parsed-dataset cache and the
/// exported report.
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    /// Local CSV path or http(s) URL; `None` means cache/sample only.
    fn source(&self) -> Option<&str>;
    fn output_path(&self) -> &str;
    /// `None` disables the dataset cache.
    fn cache_key(&self) -> Option<&str>;
    fn refresh_cache(&self) -> bool;
    fn sample_fallback(&self) -> bool;
    fn average_decimals(&self) -> usize;
    fn output_formats(&self) -> &[String];
    fn request_timeout_seconds(&self) -> Option<u64>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Dataset>;
    async fn transform(&self, dataset: Dataset) -> Result<StrategyReport>;
    async fn load(&self, report: StrategyReport) -> Result<String>;
}
