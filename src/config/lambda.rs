use crate::core::dataset::DEFAULT_CACHE_KEY;
use crate::core::pipeline::DEFAULT_OUTPUT_FORMATS;
use crate::core::{ConfigProvider, Storage};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use aws_sdk_s3::Client as S3Client;
use std::env;

#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub source: Option<String>,
    pub s3_bucket: String,
    pub s3_prefix: String,
    pub s3_region: String,
    pub cache_key: String,
    pub refresh: bool,
    pub sample_fallback: bool,
    pub average_decimals: usize,
    pub output_formats: Vec<String>,
    pub timeout_seconds: Option<u64>,
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<bool>().ok())
        .unwrap_or(default)
}

fn parse_output_formats(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or(DEFAULT_OUTPUT_FORMATS)
        .split(',')
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}

impl LambdaConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            source: env::var("CSV_SOURCE").ok().filter(|s| !s.trim().is_empty()),
            s3_bucket: env::var("S3_BUCKET").map_err(|_| EtlError::MissingConfigError {
                field: "S3_BUCKET".to_string(),
            })?,
            s3_prefix: env::var("S3_PREFIX").unwrap_or_else(|_| "strategy-report".to_string()),
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            cache_key: env::var("CACHE_KEY").unwrap_or_else(|_| DEFAULT_CACHE_KEY.to_string()),
            refresh: env_flag("REFRESH_CACHE", false),
            sample_fallback: env_flag("SAMPLE_FALLBACK", false),
            average_decimals: env::var("AVERAGE_DECIMALS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(crate::core::aggregator::DEFAULT_AVERAGE_DECIMALS),
            output_formats: parse_output_formats(env::var("OUTPUT_FORMATS").ok().as_deref()),
            timeout_seconds: env::var("TIMEOUT_SECONDS").ok().and_then(|v| v.parse().ok()),
        })
    }
}

impl ConfigProvider for LambdaConfig {
    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn output_path(&self) -> &str {
        &self.s3_prefix
    }

    fn cache_key(&self) -> Option<&str> {
        Some(&self.cache_key)
    }

    fn refresh_cache(&self) -> bool {
        self.refresh
    }

    fn sample_fallback(&self) -> bool {
        self.sample_fallback
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

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        if let Some(source) = &self.source {
            // Lambda 沒有本機檔案，只接受 URL
            validation::validate_url("CSV_SOURCE", source)?;
        }
        validate_s3_bucket_name("S3_BUCKET", &self.s3_bucket)?;
        validation::validate_non_empty_string("S3_PREFIX", &self.s3_prefix)?;
        validate_aws_region("S3_REGION", &self.s3_region)?;
        validation::validate_non_empty_string("CACHE_KEY", &self.cache_key)?;
        validation::validate_range("AVERAGE_DECIMALS", self.average_decimals, 0, 6)?;
        validation::validate_output_formats("OUTPUT_FORMATS", &self.output_formats)?;

        tracing::info!("✅ Lambda configuration validation passed");
        Ok(())
    }
}

fn invalid(field_name: &str, value: &str, reason: &str) -> EtlError {
    EtlError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_s3_bucket_name(field_name: &str, bucket_name: &str) -> Result<()> {
    if bucket_name.len() < 3 || bucket_name.len() > 63 {
        return Err(invalid(
            field_name,
            bucket_name,
            "S3 bucket name must be between 3 and 63 characters",
        ));
    }

    if !bucket_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(invalid(
            field_name,
            bucket_name,
            "S3 bucket name can only contain lowercase letters, numbers, hyphens, and dots",
        ));
    }

    if bucket_name.starts_with('-') || bucket_name.ends_with('-') {
        return Err(invalid(
            field_name,
            bucket_name,
            "S3 bucket name cannot start or end with a hyphen",
        ));
    }

    Ok(())
}

fn validate_aws_region(field_name: &str, region: &str) -> Result<()> {
    validation::validate_non_empty_string(field_name, region)?;

    if !region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            field_name,
            region,
            "AWS region can only contain lowercase letters, numbers, and hyphens",
        ));
    }

    Ok(())
}

/// S3-backed storage; keys are written below `prefix/`.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
    prefix: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String, prefix: String) -> Self {
        Self {
            client,
            bucket,
            prefix,
        }
    }

    fn object_key(&self, path: &str) -> String {
        if self.prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.prefix.trim_end_matches('/'), path)
        }
    }
}

impl Storage for S3Storage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let key = self.object_key(path);
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                let kind = if service_error.is_no_such_key() {
                    std::io::ErrorKind::NotFound
                } else {
                    std::io::ErrorKind::Other
                };
                EtlError::IoError(std::io::Error::new(
                    kind,
                    format!("Failed to read s3://{}/{}: {}", self.bucket, key, service_error),
                ))
            })?;

        let data = resp.body.collect().await.map_err(|e| {
            EtlError::IoError(std::io::Error::other(format!(
                "Failed to collect s3://{}/{}: {}",
                self.bucket, key, e
            )))
        })?;

        Ok(data.into_bytes().to_vec())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let key = self.object_key(path);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(data.to_vec().into())
            .send()
            .await
            .map_err(|e| {
                EtlError::IoError(std::io::Error::other(format!(
                    "Failed to write s3://{}/{}: {}",
                    self.bucket,
                    key,
                    e.into_service_error()
                )))
            })?;

        tracing::debug!("Wrote {} bytes to s3://{}/{}", data.len(), self.bucket, key);
        Ok(())
    }
}
