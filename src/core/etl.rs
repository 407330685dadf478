use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting strategy ETL run");
        self.monitor.log_stats("Start");

        // Extract
        let dataset = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} records from {}",
            dataset.records.len(),
            dataset.source
        );
        self.monitor.log_stats("Extract");

        // Transform
        let report = self.pipeline.transform(dataset).await?;
        tracing::info!(
            "Aggregated {} strategies from {} records",
            report.strategies.len(),
            report.overview.total_records
        );
        self.monitor.log_stats("Transform");

        // Load
        let output_path = self.pipeline.load(report).await?;
        tracing::info!("Report saved to: {}", output_path);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DataSource, Dataset, RawRecord};
    use crate::domain::report::StrategyReport;
    use crate::utils::error::EtlError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPipeline {
        calls: Mutex<Vec<&'static str>>,
        fail_extract: bool,
    }

    #[async_trait::async_trait]
    impl Pipeline for RecordingPipeline {
        async fn extract(&self) -> Result<Dataset> {
            self.calls.lock().unwrap().push("extract");
            if self.fail_extract {
                return Err(EtlError::EmptyDataset {
                    message: "nothing to read".to_string(),
                });
            }
            let record: RawRecord = [("TipoEnvio", "ACH"), ("BancoSimplificado", "BBVA")]
                .into_iter()
                .collect();
            Ok(Dataset {
                records: vec![record],
                source: DataSource::Sample,
            })
        }

        async fn transform(&self, dataset: Dataset) -> Result<StrategyReport> {
            self.calls.lock().unwrap().push("transform");
            let book = crate::core::aggregator::aggregate(&dataset.records);
            let strategies = book.summaries(2);
            Ok(StrategyReport {
                generated_at: chrono::Utc::now(),
                source: dataset.source,
                overview: book.overview(),
                comparison: crate::domain::report::comparison_matrix(&strategies),
                strategies,
                csv_output: String::new(),
                tsv_output: String::new(),
            })
        }

        async fn load(&self, _report: StrategyReport) -> Result<String> {
            self.calls.lock().unwrap().push("load");
            Ok("memory/strategy_report.zip".to_string())
        }
    }

    #[tokio::test]
    async fn test_run_executes_phases_in_order() {
        let engine = EtlEngine::new(RecordingPipeline::default());
        let output = engine.run().await.unwrap();

        assert_eq!(output, "memory/strategy_report.zip");
        assert_eq!(
            *engine.pipeline().calls.lock().unwrap(),
            vec!["extract", "transform", "load"]
        );
    }

    #[tokio::test]
    async fn test_run_stops_after_failed_extract() {
        let engine = EtlEngine::new_with_monitoring(
            RecordingPipeline {
                fail_extract: true,
                ..Default::default()
            },
            true,
        );

        let result = engine.run().await;
        assert!(matches!(result, Err(EtlError::EmptyDataset { .. })));
        assert_eq!(*engine.pipeline().calls.lock().unwrap(), vec!["extract"]);
    }
}
