use super::*;
use crate::github::pull_request;
use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

fn params(incremental: bool) -> FetchParams {
    FetchParams {
        organization: "octo".to_string(),
        repository: "repo".to_string(),
        since: None,
        until: None,
        fetch_all: true,
        incremental,
        batch_size: 50,
    }
}

#[test]
fn test_stats_accumulate() {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut stats = RunStats::new();

    stats.record(&pull_request(12, base + Duration::hours(1)));
    stats.record(&pull_request(10, base));
    stats.record(&pull_request(15, base + Duration::hours(2)));
    stats.add_skipped();
    stats.add_page();
    stats.add_api_calls(3);

    assert_eq!(stats.records_written, 3);
    assert_eq!(stats.records_skipped, 1);
    assert_eq!(stats.first_id, Some(10));
    assert_eq!(stats.last_id, Some(15));
    assert_eq!(stats.oldest_created_at, Some(base));
    assert_eq!(stats.newest_created_at, Some(base + Duration::hours(2)));
    assert_eq!(stats.last_written_at, Some(base + Duration::hours(2)));
    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(stats.api_calls, 3);
}

#[test]
fn test_audit_from_stats() {
    let mut stats = RunStats::new();
    stats.record(&pull_request(1, Utc::now()));

    let previous = RunRef {
        run_id: "full-1".to_string(),
        completed_at: Utc::now(),
    };
    let audit = RunAudit::from_stats(&stats, params(true), Some(previous.clone()));

    assert!(audit.run_id.starts_with("inc-"));
    assert_eq!(audit.method_version, METHOD_VERSION);
    assert_eq!(audit.tool_version, crate::VERSION);
    assert_eq!(audit.results.total_records, 1);
    assert_eq!(audit.previous_run, Some(previous));
    assert_eq!(audit.repository_key(), "octo/repo");

    let full = RunAudit::from_stats(&RunStats::new(), params(false), None);
    assert!(full.run_id.starts_with("full-"));
    assert!(!full.incremental);
}

#[tokio::test]
async fn test_save_writes_both_locations() {
    let dir = TempDir::new().unwrap();
    let store = AuditStore::new(dir.path());
    let audit = RunAudit::from_stats(&RunStats::new(), params(false), None);
    let extra = dir.path().join("out").join("metadata.json");

    let path = store.save(&audit, Some(&extra)).await.unwrap();

    assert!(path.starts_with(dir.path().join("runs").join("octo-repo")));
    let written: RunAudit = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(written, audit);
    let copy: RunAudit = serde_json::from_slice(&std::fs::read(&extra).unwrap()).unwrap();
    assert_eq!(copy, audit);
}

#[tokio::test]
async fn test_latest_picks_newest_completion() {
    let dir = TempDir::new().unwrap();
    let store = AuditStore::new(dir.path());

    assert!(store.latest("octo/repo").await.unwrap().is_none());

    let mut older = RunAudit::from_stats(&RunStats::new(), params(false), None);
    older.run_id = "full-1".to_string();
    older.results.completed_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut newer = older.clone();
    newer.run_id = "inc-2".to_string();
    newer.results.completed_at = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

    store.save(&newer, None).await.unwrap();
    store.save(&older, None).await.unwrap();
    std::fs::write(store.runs_dir("octo/repo").join("garbage.json"), b"{").unwrap();

    let latest = store.latest("octo/repo").await.unwrap().unwrap();
    assert_eq!(latest.run_id, "inc-2");
    assert_eq!(latest.reference().run_id, "inc-2");

    assert!(store.latest("octo/other").await.unwrap().is_none());
}
