//! Tests for profile parsing, overrides and validation

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use alarmsim_cli::config::{ProfileConfig, SourceConfig};
use alarmsim_cli::output::OutputFormat;
use chrono::{TimeZone, Utc};

fn profile_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../profiles").join(name)
}

fn write_profile(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const MINIMAL: &str = r#"
[metric]
namespace = "AWS/RDS"
name = "CPUUtilization"

[metric.dimension]
name = "DBInstanceIdentifier"
value = "my-rds-instance-1"

[window]
start = "2021-02-20T00:00:00+01:00"
end = "2021-02-25T00:00:00+01:00"

[trigger]
threshold = 85.0
consecutive_hits = 3
"#;

#[test]
fn test_load_rds_cpu_profile() {
    let config = ProfileConfig::from_file(profile_path("rds-cpu.toml"))
        .expect("Failed to load rds-cpu profile");
    config.validate().unwrap();

    assert_eq!(config.metric.namespace, "AWS/RDS");
    assert_eq!(config.metric.name, "CPUUtilization");
    assert_eq!(config.metric.dimension.name, "DBInstanceIdentifier");
    assert_eq!(config.metric.period, Duration::from_secs(60));
    assert_eq!(config.trigger.threshold, 85.0);
    assert_eq!(config.trigger.consecutive_hits, 3);
    assert_eq!(
        config.source,
        SourceConfig::Cloudwatch { region: Some("eu-central-1".to_string()), profile: None }
    );
    assert_eq!(config.output.format, OutputFormat::Table);
}

#[test]
fn test_load_replay_profile() {
    let config = ProfileConfig::from_file(profile_path("replay-csv.toml"))
        .expect("Failed to load replay-csv profile");
    config.validate().unwrap();

    assert_eq!(config.source, SourceConfig::File { path: "series.csv".into() });
    assert_eq!(config.output.format, OutputFormat::Json);
    assert!(config.output.color);
}

#[test]
fn test_defaults_applied() {
    let file = write_profile(MINIMAL);
    let config = ProfileConfig::from_file(file.path()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.metric.period, alarmsim_source::DEFAULT_PERIOD);
    assert_eq!(config.metric.statistic, "Average");
    assert_eq!(config.source, SourceConfig::Cloudwatch { region: None, profile: None });
    assert_eq!(config.output.format, OutputFormat::Table);
    assert!(!config.output.utc);
}

#[test]
fn test_to_query_converts_window_to_utc() {
    let file = write_profile(MINIMAL);
    let query = ProfileConfig::from_file(file.path()).unwrap().to_query();

    assert_eq!(query.start, Utc.with_ymd_and_hms(2021, 2, 19, 23, 0, 0).unwrap());
    assert_eq!(query.end, Utc.with_ymd_and_hms(2021, 2, 24, 23, 0, 0).unwrap());
    assert_eq!(query.period_secs(), 60);
    assert_eq!(query.dimension.value, "my-rds-instance-1");
}

#[test]
fn test_overrides() {
    let file = write_profile(MINIMAL);
    let overrides = vec![
        "trigger.threshold=90".to_string(),
        "trigger.consecutive_hits=5".to_string(),
        "metric.period=5m".to_string(),
        "window.start=2021-02-21T00:00:00Z".to_string(),
        "source.type=cloudwatch".to_string(),
        "source.region=eu-west-1".to_string(),
        "output.utc=true".to_string(),
    ];
    let config = ProfileConfig::from_file_with_overrides(file.path(), &overrides).unwrap();

    // Integer override lands in a float field
    assert_eq!(config.trigger.threshold, 90.0);
    assert_eq!(config.trigger.consecutive_hits, 5);
    assert_eq!(config.metric.period, Duration::from_secs(300));
    assert_eq!(config.to_query().start, Utc.with_ymd_and_hms(2021, 2, 21, 0, 0, 0).unwrap());
    assert_eq!(
        config.source,
        SourceConfig::Cloudwatch { region: Some("eu-west-1".to_string()), profile: None }
    );
    assert!(config.output.utc);
}

#[test]
fn test_period_accepts_seconds_or_duration_text() {
    let file = write_profile(MINIMAL);
    let config =
        ProfileConfig::from_file_with_overrides(file.path(), &["metric.period=300".to_string()])
            .unwrap();
    assert_eq!(config.metric.period, Duration::from_secs(300));
    assert_eq!(config.to_query().period_secs(), 300);

    let file = write_profile(&MINIMAL.replace(
        "name = \"CPUUtilization\"",
        "name = \"CPUUtilization\"\nperiod = \"2m\"",
    ));
    let config = ProfileConfig::from_file(file.path()).unwrap();
    assert_eq!(config.metric.period, Duration::from_secs(120));
}

#[test]
fn test_rejects_zero_period() {
    let file = write_profile(MINIMAL);
    let result =
        ProfileConfig::from_file_with_overrides(file.path(), &["metric.period=0".to_string()]);
    assert!(result.is_err());
}

#[test]
fn test_override_switches_to_file_source() {
    let file = write_profile(MINIMAL);
    let overrides = vec!["source.type=file".to_string(), "source.path=cpu.csv".to_string()];
    let config = ProfileConfig::from_file_with_overrides(file.path(), &overrides).unwrap();
    assert_eq!(config.source, SourceConfig::File { path: "cpu.csv".into() });
}

#[test]
fn test_invalid_override_format() {
    let file = write_profile(MINIMAL);
    let result = ProfileConfig::from_file_with_overrides(file.path(), &["trigger".to_string()]);
    assert!(result.is_err());
}

#[test]
fn test_rejects_zero_consecutive_hits() {
    let file = write_profile(MINIMAL);
    let err = ProfileConfig::from_file_with_overrides(
        file.path(),
        &["trigger.consecutive_hits=0".to_string()],
    )
    .unwrap_err();
    assert!(format!("{:#}", err).contains("consecutive hits must be >= 1"));
}

#[test]
fn test_rejects_window_ending_before_start() {
    let file = write_profile(MINIMAL);
    let result = ProfileConfig::from_file_with_overrides(
        file.path(),
        &["window.end=2021-02-19T00:00:00Z".to_string()],
    );
    assert!(result.is_err());
}

#[test]
fn test_rejects_unknown_statistic() {
    let file = write_profile(MINIMAL);
    let result = ProfileConfig::from_file_with_overrides(
        file.path(),
        &["metric.statistic=Median".to_string()],
    );
    assert!(result.is_err());
}

#[test]
fn test_rejects_output_file_for_table() {
    let file = write_profile(MINIMAL);
    let result = ProfileConfig::from_file_with_overrides(
        file.path(),
        &["output.file=report.json".to_string()],
    );
    assert!(result.is_err());

    let config = ProfileConfig::from_file_with_overrides(
        file.path(),
        &["output.file=report.json".to_string(), "output.format=json".to_string()],
    )
    .unwrap();
    assert_eq!(config.output.file, Some("report.json".into()));
}

#[test]
fn test_missing_trigger_section() {
    let file = write_profile(&MINIMAL.replace("[trigger]", "[unused]"));
    assert!(ProfileConfig::from_file(file.path()).is_err());
}
