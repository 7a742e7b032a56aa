mod metrics;
mod report;
mod uploader;

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::time::sleep;
use tracing::{error, info};

use metrics::{collect_metrics, TestRun};
use report::generate_report;
use uploader::upload_test_images;

const BUCKET_NAME: &str = "lambda-picture-input";
const FUNCTION_NAME: &str = "thumbnail";
const MEMORY_CONFIGS: [u16; 3] = [128, 512, 1024];
const IMAGE_COUNT: usize = 100;
const REPORT_PATH: &str = "report1.csv";

/// Settle time after reconfiguration, covering propagation and cold starts.
const PROPAGATION_WAIT: Duration = Duration::from_secs(60);
/// CloudWatch Logs ingestion lags the invocations by up to a few minutes.
const LOG_AVAILABILITY_WAIT: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() -> Result<()> {
    shared::log::init();

    let aws_config = aws_config::load_from_env().await;
    let lambda = aws_sdk_lambda::Client::new(&aws_config);
    let s3 = aws_sdk_s3::Client::new(&aws_config);
    let cloudwatch = aws_sdk_cloudwatch::Client::new(&aws_config);
    let logs = aws_sdk_cloudwatchlogs::Client::new(&aws_config);

    let mut test_runs: Vec<TestRun> = Vec::new();

    for memory_mb in MEMORY_CONFIGS {
        info!("Testing {memory_mb}MB configuration");

        // A configuration that cannot be applied is skipped outright; its
        // metrics would describe the previous memory size.
        if let Err(e) = update_memory_size(&lambda, FUNCTION_NAME, memory_mb).await {
            error!("Error updating Lambda: {e}");
            continue;
        }
        info!("Updated Lambda memory to {memory_mb}MB");

        sleep(PROPAGATION_WAIT).await;

        let start_time = Utc::now();
        upload_test_images(&s3, BUCKET_NAME, IMAGE_COUNT).await;

        info!("Waiting for logs to be available");
        sleep(LOG_AVAILABILITY_WAIT).await;

        let bundle = collect_metrics(&cloudwatch, &logs, FUNCTION_NAME, start_time).await;
        test_runs.push(TestRun {
            memory_mb,
            metrics: bundle,
        });
        info!("Collected metrics for {memory_mb}MB config");
    }

    match generate_report(&test_runs, REPORT_PATH) {
        Ok(()) => info!("Report written to {REPORT_PATH}"),
        Err(e) => error!("Error generating report: {e}"),
    }
    info!("Benchmark run complete");

    Ok(())
}

async fn update_memory_size(
    lambda: &aws_sdk_lambda::Client,
    function_name: &str,
    memory_mb: u16,
) -> Result<()> {
    lambda
        .update_function_configuration()
        .function_name(function_name)
        .memory_size(i32::from(memory_mb))
        .send()
        .await?;

    Ok(())
}
