use anyhow::Result;
use aws_sdk_cloudwatch::types::{Dimension, Statistic};
use aws_smithy_types::DateTime as SmithyDateTime;
use chrono::{DateTime, Duration, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::error;

const NAMESPACE: &str = "AWS/Lambda";
const PERIOD_SECONDS: i32 = 60;
const LOG_FILTER_PATTERN: &str = "REPORT Max Memory Used";

/// Queries reach back before the recorded start so that datapoints delayed
/// by CloudWatch ingestion are not missed.
const LOOKBACK_MINUTES: i64 = 15;

static MAX_MEMORY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Max Memory Used: (\d+) MB").unwrap());

/// One per-minute averaged datapoint from GetMetricStatistics.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationSample {
    pub timestamp: Option<DateTime<Utc>>,
    pub average: f64,
}

/// Everything collected for one memory configuration. Series left empty by
/// a failed or fruitless query stay empty; the report treats them as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsBundle {
    pub duration: Vec<DurationSample>,
    pub billed_duration: Vec<DurationSample>,
    pub max_memory_used: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestRun {
    pub memory_mb: u16,
    pub metrics: MetricsBundle,
}

/// Collects duration statistics and peak memory usage for the window
/// between `start_time` (minus lookback) and now. Each sub-query failure is
/// logged and leaves that series empty; this never fails as a whole.
pub async fn collect_metrics(
    cloudwatch: &aws_sdk_cloudwatch::Client,
    logs: &aws_sdk_cloudwatchlogs::Client,
    function_name: &str,
    start_time: DateTime<Utc>,
) -> MetricsBundle {
    let end_time = Utc::now();
    let window_start = start_time - Duration::minutes(LOOKBACK_MINUTES);

    let mut bundle = MetricsBundle::default();

    for (metric_name, series) in [
        ("Duration", &mut bundle.duration),
        ("Billed Duration", &mut bundle.billed_duration),
    ] {
        match fetch_statistics(cloudwatch, function_name, metric_name, window_start, end_time)
            .await
        {
            Ok(samples) => *series = samples,
            Err(e) => error!("Error getting {metric_name} metrics: {e}"),
        }
    }

    match fetch_max_memory_used(logs, function_name, window_start, end_time).await {
        Ok(samples) => bundle.max_memory_used = samples,
        Err(e) => error!("Error parsing logs: {e}"),
    }

    bundle
}

async fn fetch_statistics(
    cloudwatch: &aws_sdk_cloudwatch::Client,
    function_name: &str,
    metric_name: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<DurationSample>> {
    let response = cloudwatch
        .get_metric_statistics()
        .namespace(NAMESPACE)
        .metric_name(metric_name)
        .dimensions(
            Dimension::builder()
                .name("FunctionName")
                .value(function_name)
                .build(),
        )
        .start_time(SmithyDateTime::from_millis(start.timestamp_millis()))
        .end_time(SmithyDateTime::from_millis(end.timestamp_millis()))
        .period(PERIOD_SECONDS)
        .statistics(Statistic::Average)
        .send()
        .await?;

    let samples = response
        .datapoints
        .unwrap_or_default()
        .into_iter()
        .filter_map(|datapoint| {
            datapoint.average.map(|average| DurationSample {
                timestamp: datapoint.timestamp.and_then(to_chrono),
                average,
            })
        })
        .collect();

    Ok(samples)
}

async fn fetch_max_memory_used(
    logs: &aws_sdk_cloudwatchlogs::Client,
    function_name: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<u64>> {
    let log_group = format!("/aws/lambda/{function_name}");
    let mut samples = Vec::new();
    let mut next_token = None;

    loop {
        let mut request = logs
            .filter_log_events()
            .log_group_name(&log_group)
            .start_time(start.timestamp_millis())
            .end_time(end.timestamp_millis())
            .filter_pattern(LOG_FILTER_PATTERN);

        if let Some(token) = &next_token {
            request = request.next_token(token);
        }

        let response = request.send().await?;

        for event in response.events.unwrap_or_default() {
            if let Some(mb) = event.message.as_deref().and_then(parse_max_memory_used) {
                samples.push(mb);
            }
        }

        match response.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    Ok(samples)
}

/// Extracts the peak memory figure from a Lambda execution summary, e.g.
/// `REPORT RequestId: ...\tDuration: 102.5 ms\t...\tMax Memory Used: 128 MB`.
/// Lines without a parseable figure contribute nothing.
fn parse_max_memory_used(message: &str) -> Option<u64> {
    MAX_MEMORY_RE
        .captures(message)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

fn to_chrono(timestamp: SmithyDateTime) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(timestamp.to_millis().ok()?).single()
}
