use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client as S3Client;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use strategy_etl::config::lambda::{LambdaConfig, S3Storage};
use strategy_etl::utils::{logger, validation::Validate};
use strategy_etl::{EtlEngine, StrategyPipeline};

#[derive(Deserialize)]
pub struct Request {
    pub source: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_prefix: Option<String>,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Serialize)]
pub struct Response {
    pub message: String,
    pub output_path: String,
}

async fn function_handler(event: LambdaEvent<Request>) -> Result<Response, Error> {
    tracing::info!("Starting strategy ETL Lambda function");

    let mut lambda_config = match &event.payload.s3_bucket {
        // 事件帶入 bucket 時不要求環境變數
        Some(bucket) => {
            std::env::set_var("S3_BUCKET", bucket);
            LambdaConfig::from_env()?
        }
        None => LambdaConfig::from_env()?,
    };

    if let Some(source) = &event.payload.source {
        lambda_config.source = Some(source.clone());
    }
    if let Some(prefix) = &event.payload.s3_prefix {
        lambda_config.s3_prefix = prefix.clone();
    }
    lambda_config.refresh |= event.payload.refresh;

    lambda_config.validate()?;

    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .region(Region::new(lambda_config.s3_region.clone()))
        .force_path_style(true)
        .build();
    let s3_client = S3Client::from_conf(s3_config);

    let bucket = lambda_config.s3_bucket.clone();
    let storage = S3Storage::new(
        s3_client,
        bucket.clone(),
        lambda_config.s3_prefix.clone(),
    );
    let pipeline = StrategyPipeline::new(storage, lambda_config);

    let engine = EtlEngine::new(pipeline);
    let output_path = engine.run().await?;

    tracing::info!("Strategy ETL Lambda function completed successfully");
    Ok(Response {
        message: "Strategy report generated".to_string(),
        output_path: format!("s3://{}/{}", bucket, output_path),
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    run(service_fn(function_handler)).await
}
