use crate::core::aggregator::aggregate;
use crate::core::dataset::DatasetLoader;
use crate::domain::model::Dataset;
use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
use crate::domain::report::{comparison_matrix, StrategyReport, StrategySummary};
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const REPORT_ARCHIVE: &str = "strategy_report.zip";

/// Comma-separated formats written when none are configured.
pub const DEFAULT_OUTPUT_FORMATS: &str = "csv,tsv,json";

const TABLE_HEADER: [&str; 11] = [
    "id",
    "name",
    "tipoEnvio",
    "banco",
    "records",
    "totalMonto",
    "totalCobrado",
    "successCount",
    "successRate",
    "collectionRate",
    "averageAmount",
];

/// Loads collection attempts, aggregates them into strategies and exports
/// the strategy report as a ZIP archive.
pub struct StrategyPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: Client,
}

impl<S: Storage, C: ConfigProvider> StrategyPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            client: Client::new(),
        }
    }

    pub fn config(&self) -> &C {
        &self.config
    }
}

fn render_table(summaries: &[StrategySummary], delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(TABLE_HEADER)?;
    for s in summaries {
        writer.write_record([
            s.id.clone(),
            s.name.clone(),
            s.tipo_envio.clone(),
            s.banco.clone(),
            s.record_count.to_string(),
            format!("{:.2}", s.total_monto),
            format!("{:.2}", s.total_cobrado),
            s.success_count.to_string(),
            s.success_rate.to_string(),
            s.collection_rate.to_string(),
            s.average_amount.to_string(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| EtlError::ProcessingError {
        message: format!("Failed to flush table writer: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|e| EtlError::ProcessingError {
        message: format!("Table output is not UTF-8: {}", e),
    })
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for StrategyPipeline<S, C> {
    async fn extract(&self) -> Result<Dataset> {
        tracing::info!("🚀 Resolving collection dataset");
        DatasetLoader::new(&self.storage, &self.config, &self.client)
            .load()
            .await
    }

    async fn transform(&self, dataset: Dataset) -> Result<StrategyReport> {
        tracing::info!(
            "🔧 Aggregating {} records from {}",
            dataset.records.len(),
            dataset.source
        );

        let book = aggregate(&dataset.records);
        let strategies = book.summaries(self.config.average_decimals());
        let overview = book.overview();
        let comparison = comparison_matrix(&strategies);

        tracing::info!(
            "✅ {} strategies, overall success rate {}% ({}/{})",
            overview.strategy_count,
            overview.overall_success_rate,
            overview.successful_records,
            overview.total_records
        );

        let csv_output = render_table(&strategies, b',')?;
        let tsv_output = render_table(&strategies, b'\t')?;

        Ok(StrategyReport {
            generated_at: chrono::Utc::now(),
            source: dataset.source,
            overview,
            strategies,
            comparison,
            csv_output,
            tsv_output,
        })
    }

    async fn load(&self, report: StrategyReport) -> Result<String> {
        let formats = self.config.output_formats();
        let output_path = format!("{}/{}", self.config.output_path(), REPORT_ARCHIVE);

        tracing::debug!("Creating report archive with formats: {}", formats.join(", "));

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            if formats.iter().any(|f| f == "csv") {
                zip.start_file::<_, ()>("strategies.csv", FileOptions::default())?;
                zip.write_all(report.csv_output.as_bytes())?;
            }

            if formats.iter().any(|f| f == "tsv") {
                zip.start_file::<_, ()>("strategies.tsv", FileOptions::default())?;
                zip.write_all(report.tsv_output.as_bytes())?;
            }

            if formats.iter().any(|f| f == "json") {
                zip.start_file::<_, ()>("strategies.json", FileOptions::default())?;
                let json_data = serde_json::to_string_pretty(&report)?;
                zip.write_all(json_data.as_bytes())?;
            }

            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("Writing report archive ({} bytes) to storage", zip_data.len());
        self.storage.write_file(REPORT_ARCHIVE, &zip_data).await?;

        tracing::info!("📦 Strategy report saved: {}", output_path);
        Ok(output_path)
    }
}
