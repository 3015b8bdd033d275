use super::runner::{FetchPlan, EXIT_API, EXIT_CHECKPOINT, EXIT_COMPLEXITY, EXIT_GENERIC, EXIT_NETWORK};
use super::*;
use crate::config::Config;
use crate::error::Error;
use crate::types::FetchMode;
use chrono::{DateTime, TimeZone, Utc};
use clap::Parser;
use pretty_assertions::assert_eq;
use test_case::test_case;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

fn no_env(_: &str) -> Option<String> {
    None
}

fn args(repository: &str) -> FetchArgs {
    FetchArgs {
        repository: repository.to_string(),
        token: Some("ghp_flag".to_string()),
        ..FetchArgs::default()
    }
}

#[test]
fn test_parse_fetch_command() {
    let cli = Cli::try_parse_from([
        "pr-relay",
        "--verbose",
        "fetch",
        "octo/repo",
        "--all",
        "--incremental",
        "--since",
        "2024-01-01",
        "--batch-size",
        "25",
        "--output",
        "prs.ndjson",
        "--metadata-file",
        "meta.json",
        "--request-timeout",
        "60",
    ])
    .unwrap();

    assert!(cli.verbose);
    let Commands::Fetch(fetch) = cli.command;
    assert_eq!(fetch.repository, "octo/repo");
    assert!(fetch.all);
    assert!(fetch.incremental);
    assert_eq!(fetch.since.as_deref(), Some("2024-01-01"));
    assert_eq!(fetch.batch_size, Some(25));
    assert_eq!(fetch.output, Some("prs.ndjson".into()));
    assert_eq!(fetch.metadata_file, Some("meta.json".into()));
    assert_eq!(fetch.request_timeout, Some(60));
}

#[test]
fn test_fetch_requires_repository() {
    assert!(Cli::try_parse_from(["pr-relay", "fetch"]).is_err());
}

#[test]
fn test_parse_date_rfc3339() {
    let parsed = parse_date("since", "2024-03-01T10:30:00+02:00", now()).unwrap();
    assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap());
}

#[test]
fn test_parse_date_day() {
    let parsed = parse_date("since", "2024-03-01", now()).unwrap();
    assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
}

#[test_case("7d", 7 ; "days")]
#[test_case("2w", 14 ; "weeks")]
#[test_case("0d", 0 ; "today")]
fn test_parse_date_relative(value: &str, days: i64) {
    let parsed = parse_date("since", value, now()).unwrap();
    assert_eq!(parsed, now() - chrono::Duration::days(days));
}

#[test_case("yesterday" ; "word")]
#[test_case("2024-13-01" ; "bad month")]
#[test_case("-3d" ; "negative")]
#[test_case("3m" ; "months")]
#[test_case("" ; "empty")]
fn test_parse_date_rejects(value: &str) {
    let err = parse_date("until", value, now()).unwrap_err();
    assert!(err.to_string().contains("until"));
}

#[test_case(Error::auth("bad"), EXIT_API ; "auth")]
#[test_case(Error::not_found("octo/repo"), EXIT_API ; "not_found")]
#[test_case(Error::rate_limited("slow down", None), EXIT_API ; "rate_limit")]
#[test_case(Error::network("reset"), EXIT_NETWORK ; "network")]
#[test_case(Error::checkpoint_corrupt("x.state", "checksum mismatch"), EXIT_CHECKPOINT ; "corrupt")]
#[test_case(Error::CheckpointMissing { resource: "octo/repo".into(), path: "x".into() }, EXIT_CHECKPOINT ; "missing")]
#[test_case(Error::ComplexityExhausted { attempts: 4, batch_size: 5 }, EXIT_COMPLEXITY ; "complexity")]
#[test_case(Error::Cancelled, EXIT_CANCELLED ; "cancelled")]
#[test_case(Error::output("disk full"), EXIT_GENERIC ; "output")]
fn test_exit_codes(err: Error, expected: i32) {
    assert_eq!(exit_code(&err), expected);
}

#[test]
fn test_plan_resolves_flags() {
    let mut fetch = args("octo/repo");
    fetch.all = true;
    fetch.since = Some("2024-01-01".to_string());
    fetch.until = Some("1w".to_string());

    let plan = FetchPlan::resolve(&fetch, &Config::default(), now(), no_env).unwrap();

    assert_eq!(plan.repo.key(), "octo/repo");
    assert_eq!(plan.mode, FetchMode::All);
    assert_eq!(plan.since, Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
    assert_eq!(plan.until, Some(now() - chrono::Duration::weeks(1)));
    assert_eq!(plan.batch_size, 50);
    assert_eq!(plan.token, "ghp_flag");
}

#[test]
fn test_plan_rejects_inverted_window() {
    let mut fetch = args("octo/repo");
    fetch.since = Some("2024-02-01".to_string());
    fetch.until = Some("2024-01-01".to_string());

    let err = FetchPlan::resolve(&fetch, &Config::default(), now(), no_env).unwrap_err();
    assert!(err.to_string().contains("--since"));
}

#[test]
fn test_plan_rejects_bad_repository() {
    let err = FetchPlan::resolve(&args("octo"), &Config::default(), now(), no_env).unwrap_err();
    assert!(err.to_string().contains("<owner>/<name>"));
}

#[test_case(0)]
#[test_case(101)]
fn test_plan_rejects_batch_size(size: u32) {
    let mut fetch = args("octo/repo");
    fetch.batch_size = Some(size);
    assert!(FetchPlan::resolve(&fetch, &Config::default(), now(), no_env).is_err());
}

#[test]
fn test_plan_batch_size_precedence() {
    let config =
        Config::from_yaml_str("repositories:\n  octo/repo:\n    batch_size: 15\n").unwrap();

    let plan = FetchPlan::resolve(&args("octo/repo"), &config, now(), no_env).unwrap();
    assert_eq!(plan.batch_size, 15);

    let mut fetch = args("octo/repo");
    fetch.batch_size = Some(80);
    let plan = FetchPlan::resolve(&fetch, &config, now(), no_env).unwrap();
    assert_eq!(plan.batch_size, 80);
}

#[test]
fn test_plan_token_from_env() {
    let mut fetch = args("octo/repo");
    fetch.token = None;
    let config = Config::from_yaml_str("github:\n  token_env: RELAY_TOKEN\n").unwrap();

    let plan = FetchPlan::resolve(&fetch, &config, now(), |key| {
        (key == "RELAY_TOKEN").then(|| "ghp_env".to_string())
    })
    .unwrap();
    assert_eq!(plan.token, "ghp_env");

    let err = FetchPlan::resolve(&fetch, &config, now(), no_env).unwrap_err();
    assert_eq!(exit_code(&err), EXIT_API);
    assert!(err.to_string().contains("RELAY_TOKEN"));
}

#[test]
fn test_plan_incremental_modes() {
    let mut fetch = args("octo/repo");
    fetch.incremental = true;
    let plan = FetchPlan::resolve(&fetch, &Config::default(), now(), no_env).unwrap();
    assert_eq!(plan.mode, FetchMode::Poll);

    fetch.all = true;
    let plan = FetchPlan::resolve(&fetch, &Config::default(), now(), no_env).unwrap();
    assert_eq!(plan.mode, FetchMode::Resume);
}
