use crate::core::csv_parser::parse_csv;
use crate::domain::model::{DataSource, Dataset, RawRecord};
use crate::domain::ports::{ConfigProvider, Storage};
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CACHE_KEY: &str = "importedCsvData";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvSource {
    File(PathBuf),
    Url(String),
}

impl CsvSource {
    pub fn parse(location: &str) -> Self {
        let lowered = location.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            CsvSource::Url(location.to_string())
        } else {
            CsvSource::File(PathBuf::from(location))
        }
    }

    fn data_source(&self) -> DataSource {
        match self {
            CsvSource::File(path) => DataSource::File(path.display().to_string()),
            CsvSource::Url(url) => DataSource::Url(url.clone()),
        }
    }
}

pub fn cache_file_name(key: &str) -> String {
    format!("{}.json", key)
}

/// Resolves the dataset for one run: cached records first, then the CSV
/// source (written back to the cache), then the built-in sample when allowed.
pub struct DatasetLoader<'a, S: Storage, C: ConfigProvider> {
    storage: &'a S,
    config: &'a C,
    client: &'a Client,
}

impl<'a, S: Storage, C: ConfigProvider> DatasetLoader<'a, S, C> {
    pub fn new(storage: &'a S, config: &'a C, client: &'a Client) -> Self {
        Self {
            storage,
            config,
            client,
        }
    }

    pub async fn load(&self) -> Result<Dataset> {
        if let Some(key) = self.config.cache_key() {
            if self.config.refresh_cache() {
                tracing::info!("🔄 Refresh requested, ignoring cached dataset '{}'", key);
            } else if let Some(records) = self.read_cache(key).await {
                tracing::info!("📦 Loaded {} records from cache '{}'", records.len(), key);
                return Ok(Dataset {
                    records,
                    source: DataSource::Cache(key.to_string()),
                });
            }
        }

        if let Some(location) = self.config.source() {
            let source = CsvSource::parse(location);
            match self.load_from_source(&source).await {
                Ok(records) => {
                    if let Some(key) = self.config.cache_key() {
                        if let Err(e) = self.write_cache(key, &records).await {
                            tracing::warn!("⚠️ Could not cache dataset under '{}': {}", key, e);
                        }
                    }
                    return Ok(Dataset {
                        records,
                        source: source.data_source(),
                    });
                }
                Err(e) if self.config.sample_fallback() => {
                    tracing::warn!("⚠️ Failed to load {}: {}", source.data_source(), e);
                }
                Err(e) => return Err(e),
            }
        }

        if self.config.sample_fallback() {
            tracing::warn!("📝 No collection data available, using sample records");
            return Ok(Dataset {
                records: sample_records(),
                source: DataSource::Sample,
            });
        }

        Err(EtlError::EmptyDataset {
            message: "no cached dataset, no readable CSV source and sample fallback disabled"
                .to_string(),
        })
    }

    /// 快取不存在、無法解析或為空陣列時視為未命中
    async fn read_cache(&self, key: &str) -> Option<Vec<RawRecord>> {
        let bytes = match self.storage.read_file(&cache_file_name(key)).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("Cache miss for '{}': {}", key, e);
                return None;
            }
        };

        match serde_json::from_slice::<Vec<RawRecord>>(&bytes) {
            Ok(records) if !records.is_empty() => Some(records),
            Ok(_) => {
                tracing::debug!("Cached dataset '{}' is empty", key);
                None
            }
            Err(e) => {
                tracing::warn!("⚠️ Ignoring unreadable cached dataset '{}': {}", key, e);
                None
            }
        }
    }

    async fn write_cache(&self, key: &str, records: &[RawRecord]) -> Result<()> {
        let data = serde_json::to_vec(records)?;
        self.storage.write_file(&cache_file_name(key), &data).await?;
        tracing::debug!("Cached {} records under '{}'", records.len(), key);
        Ok(())
    }

    async fn load_from_source(&self, source: &CsvSource) -> Result<Vec<RawRecord>> {
        let text = match source {
            CsvSource::File(path) => {
                tracing::debug!("Reading CSV file: {}", path.display());
                let bytes = tokio::fs::read(path).await?;
                String::from_utf8_lossy(&bytes).into_owned()
            }
            CsvSource::Url(url) => self.fetch_csv(url).await?,
        };

        let records = parse_csv(text.trim_start_matches('\u{feff}'));
        if records.is_empty() {
            return Err(EtlError::EmptyDataset {
                message: format!("{} is empty or malformed", source.data_source()),
            });
        }

        tracing::info!("📄 Parsed {} records from {}", records.len(), source.data_source());
        Ok(records)
    }

    async fn fetch_csv(&self, url: &str) -> Result<String> {
        let mut request = self.client.get(url);
        if let Some(timeout) = self.config.request_timeout_seconds() {
            request = request.timeout(Duration::from_secs(timeout));
        }

        tracing::debug!("Fetching CSV from: {}", url);
        let response = request.send().await?;
        tracing::debug!("CSV response status: {}", response.status());

        if !response.status().is_success() {
            return Err(EtlError::SourceUnavailable {
                source_name: url.to_string(),
                reason: format!("HTTP status {}", response.status()),
            });
        }

        Ok(response.text().await?)
    }
}

/// Demonstration attempts covering one approved and one rejected outcome
/// per channel.
pub fn sample_records() -> Vec<RawRecord> {
    const COLUMNS: [&str; 13] = [
        "idListaCobro",
        "idEmisora",
        "TipoEnvio",
        "BancoSimplificado",
        "idCredito",
        "consecutivoCobro",
        "idBanco",
        "montoExigible",
        "montoCobrar",
        "montoCobrado",
        "fechaCobroBanco",
        "idRespuestaBanco",
        "CobroExitoso",
    ];
    const ROWS: [[&str; 13]; 4] = [
        [
            "001", "EM001", "ACH", "BBVA", "CR001", "1", "B001", "15000", "15000", "15000",
            "2024-01-15", "OK", "true",
        ],
        [
            "002", "EM002", "SPEI", "Santander", "CR002", "1", "B002", "8500", "8500", "0",
            "2024-01-15", "ERROR_FONDOS", "false",
        ],
        [
            "003", "EM003", "ACH", "Banorte", "CR003", "2", "B003", "22000", "22000", "22000",
            "2024-01-16", "OK", "true",
        ],
        [
            "004", "EM004", "TEF", "Banamex", "CR004", "1", "B004", "12000", "12000", "0",
            "2024-01-16", "CUENTA_BLOQUEADA", "false",
        ],
    ];

    ROWS.iter()
        .map(|row| {
            COLUMNS
                .iter()
                .copied()
                .zip(row.iter().copied())
                .collect::<RawRecord>()
        })
        .collect()
}
