use std::fs::File;
use std::io::Write;

use anyhow::Result;

use crate::metrics::TestRun;

/// Fixed request fee per million invocations, USD.
const REQUEST_COST_PER_MILLION: f64 = 0.20;
/// Compute rate per GB-second, USD.
const COST_PER_GB_SECOND: f64 = 0.000_016_666_7;
const INVOCATIONS: f64 = 1_000_000.0;

const HEADER: &str =
    "Memory (MB),Avg Duration (ms),Max Memory Used (MB),Cost per 1M Invocations";

pub fn generate_report(runs: &[TestRun], path: &str) -> Result<()> {
    let report = render_report(runs);

    let mut file = File::create(path)?;
    file.write_all(report.as_bytes())?;

    Ok(())
}

/// One CSV row per test run, in collection order. Pure function of the
/// input, so repeated runs produce identical bytes.
fn render_report(runs: &[TestRun]) -> String {
    let mut builder = String::new();
    builder.push_str(HEADER);
    builder.push('\n');

    for run in runs {
        let avg_duration = average_duration(run);
        let max_memory = run
            .metrics
            .max_memory_used
            .iter()
            .copied()
            .max()
            .unwrap_or(0);
        let cost = cost_per_million(run.memory_mb, avg_duration);

        builder.push_str(&format!(
            "{},{:.2},{},{:.2}\n",
            run.memory_mb, avg_duration, max_memory, cost
        ));
    }

    builder
}

fn average_duration(run: &TestRun) -> f64 {
    let samples = &run.metrics.duration;
    if samples.is_empty() {
        return 0.0;
    }

    samples.iter().map(|s| s.average).sum::<f64>() / samples.len() as f64
}

/// Estimated cost of one million invocations: the fixed request fee plus
/// GB-seconds of compute at the configured memory size.
fn cost_per_million(memory_mb: u16, avg_duration_ms: f64) -> f64 {
    let memory_gb = f64::from(memory_mb) / 1024.0;
    let compute_seconds = (avg_duration_ms / 1000.0) * INVOCATIONS;

    REQUEST_COST_PER_MILLION + compute_seconds * memory_gb * COST_PER_GB_SECOND
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{DurationSample, MetricsBundle};

    fn run(memory_mb: u16, averages: &[f64], max_memory_used: &[u64]) -> TestRun {
        TestRun {
            memory_mb,
            metrics: MetricsBundle {
                duration: averages
                    .iter()
                    .map(|&average| DurationSample {
                        timestamp: None,
                        average,
                    })
                    .collect(),
                billed_duration: Vec::new(),
                max_memory_used: max_memory_used.to_vec(),
            },
        }
    }

    #[test]
    fn cost_formula_matches_pricing_constants() {
        // 500 ms at 128 MB: 500_000 compute seconds * 0.125 GB * rate.
        let cost = cost_per_million(128, 500.0);

        assert!((cost - 1.241_668_75).abs() < 1e-9);
        assert_eq!(format!("{cost:.2}"), "1.24");
    }

    #[test]
    fn empty_series_yield_zero_row() {
        let report = render_report(&[run(128, &[], &[])]);

        assert_eq!(
            report,
            "Memory (MB),Avg Duration (ms),Max Memory Used (MB),Cost per 1M Invocations\n\
             128,0.00,0,0.20\n"
        );
    }

    #[test]
    fn averages_duration_and_takes_peak_memory() {
        let report = render_report(&[run(512, &[200.0, 400.0], &[101, 305, 214])]);

        let row = report.lines().nth(1).unwrap();
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields[0], "512");
        assert_eq!(fields[1], "300.00");
        assert_eq!(fields[2], "305");
    }

    #[test]
    fn skipped_configuration_has_no_row() {
        let report = render_report(&[run(128, &[100.0], &[90]), run(1024, &[50.0], &[130])]);

        assert_eq!(report.lines().count(), 3);
        assert!(!report.lines().any(|line| line.starts_with("512,")));
    }

    #[test]
    fn rendering_is_idempotent() {
        let runs = vec![run(128, &[123.456], &[77]), run(512, &[], &[])];

        assert_eq!(render_report(&runs), render_report(&runs));
    }

    #[test]
    fn report_file_is_overwritten_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report1.csv");
        let path = path.to_str().unwrap();
        let runs = vec![run(1024, &[80.0, 120.0], &[512])];

        generate_report(&runs, path).unwrap();
        let first = std::fs::read(path).unwrap();
        generate_report(&runs, path).unwrap();
        let second = std::fs::read(path).unwrap();

        assert_eq!(first, second);
    }
}
