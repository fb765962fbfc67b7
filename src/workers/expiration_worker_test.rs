use super::*;
use crate::domain::models::task::{
    AnalysisInput, AnalysisOptions, AnalysisTask, BusinessInfo, FailureKind,
};
use crate::infrastructure::storage::LocalStorage;
use crate::limits::rate_limiter::SlidingWindowLimiter;

fn sample_input() -> AnalysisInput {
    AnalysisInput {
        url: "https://93.184.216.34/".to_string(),
        business_info: BusinessInfo {
            industry: "Retail".to_string(),
            target_audience: "Shoppers".to_string(),
            location: None,
        },
        keywords: vec!["one".into(), "two".into(), "three".into()],
        options: AnalysisOptions::default(),
    }
}

fn worker_with(
    dir: &std::path::Path,
    retention_hours: i64,
) -> (ExpirationWorker, Arc<TaskStore>, Arc<ResultStore>) {
    let store = Arc::new(TaskStore::new());
    let results = Arc::new(ResultStore::new(
        Arc::new(LocalStorage::new(dir)),
        ChronoDuration::hours(retention_hours),
    ));
    let limiter = Arc::new(SlidingWindowLimiter::new(ChronoDuration::minutes(15), 5));
    let worker = ExpirationWorker::new(
        results.clone(),
        store.clone(),
        limiter,
        ChronoDuration::hours(retention_hours),
    );
    (worker, store, results)
}

#[tokio::test]
async fn sweep_removes_result_and_owning_task_together() {
    let dir = tempfile::tempdir().unwrap();
    let (worker, store, results) = worker_with(dir.path(), 1);

    let task = AnalysisTask::new(sample_input());
    let id = task.id;
    store.insert(task);
    store.mark_processing(id).unwrap();
    store.mark_complete(id).unwrap();

    let created = Utc::now();
    results.put(id, b"# Report", created).await.unwrap();

    let swept = worker.sweep_once(created + ChronoDuration::hours(2)).await;
    assert_eq!(swept, 1);
    assert!(store.snapshot(id).is_none());
    assert!(results.entry(id).is_none());
    assert!(results.is_empty());
    assert!(!dir.path().join(format!("{}.md", id)).exists());
}

#[tokio::test]
async fn sweep_evicts_stale_rate_limit_windows() {
    let dir = tempfile::tempdir().unwrap();
    let (worker, _store, _results) = worker_with(dir.path(), 1);

    let now = Utc::now();
    for i in 0..50 {
        worker
            .limiter
            .admit(&format!("203.0.113.{}", i), now)
            .unwrap();
    }

    let later = now + ChronoDuration::minutes(16);
    worker.sweep_once(later).await;
    // The sweep already reclaimed every window that slid out.
    assert_eq!(worker.limiter.prune_stale(later), 0);
}

#[tokio::test]
async fn stale_failed_tasks_are_pruned() {
    let dir = tempfile::tempdir().unwrap();
    let (worker, store, _results) = worker_with(dir.path(), 1);

    let task = AnalysisTask::new(sample_input());
    let id = task.id;
    store.insert(task);
    store.mark_processing(id).unwrap();
    store
        .mark_failed(id, FailureKind::Stage, "Crawl failed: boom".to_string())
        .unwrap();

    // Within retention the record survives.
    assert_eq!(worker.sweep_once(Utc::now()).await, 0);
    assert!(store.snapshot(id).is_some());

    // Past retention it is pruned.
    let swept = worker.sweep_once(Utc::now() + ChronoDuration::hours(2)).await;
    assert_eq!(swept, 1);
    assert!(store.snapshot(id).is_none());
}

#[tokio::test]
async fn fresh_entries_survive_the_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let (worker, store, results) = worker_with(dir.path(), 24);

    let task = AnalysisTask::new(sample_input());
    let id = task.id;
    store.insert(task);
    store.mark_processing(id).unwrap();
    store.mark_complete(id).unwrap();
    results.put(id, b"# Report", Utc::now()).await.unwrap();

    assert_eq!(worker.sweep_once(Utc::now() + ChronoDuration::hours(1)).await, 0);
    assert!(store.snapshot(id).is_some());
    assert!(results.entry(id).is_some());
}
