use crate::core::aggregator::DEFAULT_AVERAGE_DECIMALS;
use crate::core::dataset::DEFAULT_CACHE_KEY;
use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub report: ReportConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// CSV file path or http(s) URL
    pub location: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub sample_fallback: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    pub key: Option<String>,
    #[serde(default)]
    pub refresh: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            key: None,
            refresh: false,
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationConfig {
    pub average_decimals: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
}

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var regex"));

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(&path).map_err(|e| EtlError::ConfigError {
                message: format!(
                    "Cannot read config file {}: {}",
                    path.as_ref().display(),
                    e
                ),
            })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CSV_URL})，未設定者保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn source(&self) -> Option<&str> {
        self.source.location.as_deref()
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn cache_key(&self) -> Option<&str> {
        if self.cache.enabled {
            Some(self.cache.key.as_deref().unwrap_or(DEFAULT_CACHE_KEY))
        } else {
            None
        }
    }

    fn refresh_cache(&self) -> bool {
        self.cache.refresh
    }

    fn sample_fallback(&self) -> bool {
        self.source.sample_fallback.unwrap_or(true)
    }

    fn average_decimals(&self) -> usize {
        self.aggregation
            .average_decimals
            .unwrap_or(DEFAULT_AVERAGE_DECIMALS)
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn request_timeout_seconds(&self) -> Option<u64> {
        self.source.timeout_seconds
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("report.name", &self.report.name)?;

        if let Some(location) = &self.source.location {
            super::validate_source("source.location", location)?;
        } else if !self.sample_fallback() && !self.cache.enabled {
            // 沒有來源也沒有快取時，只能靠範例資料
            validation::validate_required_field("source.location", &self.source.location)?;
        }

        if let Some(key) = &self.cache.key {
            validation::validate_non_empty_string("cache.key", key)?;
        }

        validation::validate_path("load.output_path", &self.load.output_path)?;
        validation::validate_output_formats("load.output_formats", &self.load.output_formats)?;
        validation::validate_range("aggregation.average_decimals", self.average_decimals(), 0, 6)?;

        if let Some(timeout) = self.source.timeout_seconds {
            validation::validate_range("source.timeout_seconds", timeout, 1, 600)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[report]
name = "monthly-strategies"
description = "Monthly strategy comparison"
version = "1.0.0"

[source]
location = "https://example.com/pruebaDatos.csv"
timeout_seconds = 30

[cache]
key = "strategyData"

[aggregation]
average_decimals = 0

[load]
output_path = "./reports"
output_formats = ["csv", "json"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.report.name, "monthly-strategies");
        assert_eq!(config.source(), Some("https://example.com/pruebaDatos.csv"));
        assert_eq!(config.cache_key(), Some("strategyData"));
        assert_eq!(config.average_decimals(), 0);
        assert_eq!(config.request_timeout_seconds(), Some(30));
        assert!(config.sample_fallback());
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_for_optional_sections() {
        let toml_content = r#"
[report]
name = "minimal"

[load]
output_path = "./output"
output_formats = ["json"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.source(), None);
        assert_eq!(config.cache_key(), Some(DEFAULT_CACHE_KEY));
        assert!(!config.refresh_cache());
        assert_eq!(config.average_decimals(), DEFAULT_AVERAGE_DECIMALS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("STRATEGY_ETL_TEST_CSV_URL", "https://test.example.com/data.csv");

        let toml_content = r#"
[report]
name = "env"

[source]
location = "${STRATEGY_ETL_TEST_CSV_URL}"

[load]
output_path = "./output"
output_formats = ["csv"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.source(), Some("https://test.example.com/data.csv"));

        std::env::remove_var("STRATEGY_ETL_TEST_CSV_URL");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[report]
name = "invalid"

[source]
location = "ftp://example.com/data.csv"

[load]
output_path = "./output"
output_formats = ["csv"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_source_without_fallback_or_cache() {
        let toml_content = r#"
[report]
name = "strict"

[source]
sample_fallback = false

[cache]
enabled = false

[load]
output_path = "./output"
output_formats = ["csv"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.cache_key(), None);
        assert!(matches!(
            config.validate(),
            Err(EtlError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[report]
name = "file-test"

[source]
location = "./data/pruebaDatos.csv"

[load]
output_path = "./output"
output_formats = ["tsv"]
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.report.name, "file-test");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let err = TomlConfig::from_file(temp_dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, EtlError::ConfigError { .. }));
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[report\nname=").unwrap_err();
        assert!(matches!(err, EtlError::ConfigValidationError { .. }));
    }
}
