// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use url::Url;
use uuid::Uuid;

use seors::domain::models::report::{AiAnalysis, CrawlSummary};
use seors::domain::models::task::{
    AnalysisInput, AnalysisOptions, AnalysisTask, BackendKind, BusinessInfo, FailureKind,
    TaskStatus,
};
use seors::engines::renderer::MarkdownRenderer;
use seors::engines::traits::{AiAnalyzer, EngineError, SiteCrawler};
use seors::infrastructure::result_store::ResultStore;
use seors::infrastructure::storage::{ArtifactStorage, LocalStorage, StorageError};
use seors::limits::quota::QuotaManager;
use seors::queue::admission::AdmissionQueue;
use seors::queue::task_store::TaskStore;
use seors::workers::manager::WorkerManager;

/// Crawler that blocks until the gate opens, recording the URLs it
/// starts working on in arrival order.
struct GatedCrawler {
    gate: watch::Receiver<bool>,
    started: Arc<parking_lot::Mutex<Vec<String>>>,
}

#[async_trait]
impl SiteCrawler for GatedCrawler {
    async fn crawl(&self, target: &Url, _max_pages: usize) -> Result<CrawlSummary, EngineError> {
        self.started.lock().push(target.to_string());
        let mut gate = self.gate.clone();
        while !*gate.borrow() {
            if gate.changed().await.is_err() {
                break;
            }
        }
        Ok(CrawlSummary {
            root_url: target.to_string(),
            pages: vec![],
            pages_crawled: 0,
        })
    }
}

struct InstantCrawler;

#[async_trait]
impl SiteCrawler for InstantCrawler {
    async fn crawl(&self, target: &Url, _max_pages: usize) -> Result<CrawlSummary, EngineError> {
        Ok(CrawlSummary {
            root_url: target.to_string(),
            pages: vec![],
            pages_crawled: 0,
        })
    }
}

struct NeverCrawler;

#[async_trait]
impl SiteCrawler for NeverCrawler {
    async fn crawl(&self, _target: &Url, _max_pages: usize) -> Result<CrawlSummary, EngineError> {
        std::future::pending().await
    }
}

struct StubAnalyzer;

#[async_trait]
impl AiAnalyzer for StubAnalyzer {
    async fn analyze(
        &self,
        _backend: BackendKind,
        _crawl: &CrawlSummary,
        _input: &AnalysisInput,
    ) -> Result<AiAnalysis, EngineError> {
        Ok(AiAnalysis {
            overall_score: 70,
            summary: "ok".to_string(),
            recommendations: vec![],
            keyword_insights: vec![],
        })
    }
}

fn input_for(url: &str) -> AnalysisInput {
    AnalysisInput {
        url: url.to_string(),
        business_info: BusinessInfo {
            industry: "Retail".to_string(),
            target_audience: "Shoppers".to_string(),
            location: None,
        },
        keywords: vec!["one".into(), "two".into(), "three".into()],
        options: AnalysisOptions::default(),
    }
}

struct Harness {
    store: Arc<TaskStore>,
    queue: AdmissionQueue,
    manager: WorkerManager,
    _dir: tempfile::TempDir,
}

fn start_harness(
    workers: usize,
    queue_capacity: usize,
    crawler: Arc<dyn SiteCrawler>,
    quota: Arc<QuotaManager>,
    task_timeout: Duration,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(TaskStore::new());
    let results = Arc::new(ResultStore::new(
        Arc::new(LocalStorage::new(dir.path())),
        ChronoDuration::hours(24),
    ));
    let (queue, receiver) = AdmissionQueue::new(queue_capacity);

    let mut manager = WorkerManager::new(
        store.clone(),
        results,
        quota,
        crawler,
        Arc::new(StubAnalyzer),
        Arc::new(MarkdownRenderer),
        50,
        task_timeout,
    );
    manager.start_workers(workers, receiver);

    Harness {
        store,
        queue,
        manager,
        _dir: dir,
    }
}

fn submit(harness: &Harness, url: &str) -> Uuid {
    let task = AnalysisTask::new(input_for(url));
    let id = task.id;
    harness.store.insert(task);
    harness.queue.submit(id).unwrap();
    id
}

async fn wait_until<F>(deadline: Duration, mut check: F)
where
    F: FnMut() -> bool,
{
    let end = tokio::time::Instant::now() + deadline;
    while !check() {
        assert!(
            tokio::time::Instant::now() < end,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn three_workers_admit_exactly_three_and_backfill_in_order() {
    let (gate_tx, gate_rx) = watch::channel(false);
    let started = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let crawler = Arc::new(GatedCrawler {
        gate: gate_rx,
        started: started.clone(),
    });
    let harness = start_harness(
        3,
        10,
        crawler,
        Arc::new(QuotaManager::new(1500, 50)),
        Duration::from_secs(30),
    );

    let urls: Vec<String> = (0..5)
        .map(|i| format!("https://93.184.216.34/page-{}", i))
        .collect();
    let ids: Vec<Uuid> = urls.iter().map(|u| submit(&harness, u)).collect();

    // Exactly three tasks get a slot while the gate is closed.
    wait_until(Duration::from_secs(5), || started.lock().len() == 3).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(started.lock().len(), 3);

    let processing = ids
        .iter()
        .filter(|id| harness.store.snapshot(**id).unwrap().status == TaskStatus::Processing)
        .count();
    let queued = ids
        .iter()
        .filter(|id| harness.store.snapshot(**id).unwrap().status == TaskStatus::Queued)
        .count();
    assert_eq!(processing, 3);
    assert_eq!(queued, 2);

    // The first three slots went to the first three submissions.
    {
        let started = started.lock();
        let mut first_three = started.clone();
        first_three.sort();
        let mut expected = urls[..3].to_vec();
        expected.sort();
        assert_eq!(first_three, expected);
    }

    // Opening the gate drains the queue in FIFO order.
    gate_tx.send(true).unwrap();
    wait_until(Duration::from_secs(5), || {
        ids.iter()
            .all(|id| harness.store.snapshot(*id).unwrap().status == TaskStatus::Complete)
    })
    .await;

    // The two waiting tasks were backfilled after the first three.
    let started = started.lock();
    let mut last_two = started[3..].to_vec();
    last_two.sort();
    let mut expected = urls[3..].to_vec();
    expected.sort();
    assert_eq!(last_two, expected);
}

#[tokio::test]
async fn a_single_worker_drains_the_queue_in_submission_order() {
    let (gate_tx, gate_rx) = watch::channel(true);
    let started = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let crawler = Arc::new(GatedCrawler {
        gate: gate_rx,
        started: started.clone(),
    });
    let harness = start_harness(
        1,
        10,
        crawler,
        Arc::new(QuotaManager::new(1500, 50)),
        Duration::from_secs(30),
    );
    let _gate = gate_tx; // keep the sender alive, gate stays open

    let urls: Vec<String> = (0..5)
        .map(|i| format!("https://93.184.216.34/page-{}", i))
        .collect();
    let ids: Vec<Uuid> = urls.iter().map(|u| submit(&harness, u)).collect();

    wait_until(Duration::from_secs(5), || {
        ids.iter()
            .all(|id| harness.store.snapshot(*id).unwrap().status == TaskStatus::Complete)
    })
    .await;

    assert_eq!(*started.lock(), urls);
}

#[tokio::test]
async fn deadline_overrun_fails_the_task_with_timeout() {
    let harness = start_harness(
        1,
        10,
        Arc::new(NeverCrawler),
        Arc::new(QuotaManager::new(1500, 50)),
        Duration::from_millis(200),
    );

    let id = submit(&harness, "https://93.184.216.34/");
    wait_until(Duration::from_secs(5), || {
        harness.store.snapshot(id).unwrap().status == TaskStatus::Failed
    })
    .await;

    let task = harness.store.snapshot(id).unwrap();
    assert_eq!(task.failure_kind, Some(FailureKind::Timeout));
    assert!(task.error.unwrap().contains("deadline"));
    // Progress freezes where the task was interrupted.
    assert!(task.progress < 100);
}

#[tokio::test]
async fn exhausted_quota_fails_the_analysis_stage() {
    let harness = start_harness(
        1,
        10,
        Arc::new(InstantCrawler),
        Arc::new(QuotaManager::new(0, 0)),
        Duration::from_secs(30),
    );

    let id = submit(&harness, "https://93.184.216.34/");
    wait_until(Duration::from_secs(5), || {
        harness.store.snapshot(id).unwrap().status == TaskStatus::Failed
    })
    .await;

    let task = harness.store.snapshot(id).unwrap();
    assert_eq!(task.failure_kind, Some(FailureKind::QuotaExhausted));
    assert!(task.error.unwrap().contains("quota"));
    assert!(task.chosen_backend.is_none());
}

#[tokio::test]
async fn shutdown_aborts_workers_and_leaves_the_queue_untouched() {
    let mut harness = start_harness(
        1,
        10,
        Arc::new(InstantCrawler),
        Arc::new(QuotaManager::new(1500, 50)),
        Duration::from_secs(30),
    );

    let first = submit(&harness, "https://93.184.216.34/");
    wait_until(Duration::from_secs(5), || {
        harness.store.snapshot(first).unwrap().status == TaskStatus::Complete
    })
    .await;

    harness.manager.shutdown();

    // No worker is left to pick this one up.
    let second = submit(&harness, "https://93.184.216.34/later");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        harness.store.snapshot(second).unwrap().status,
        TaskStatus::Queued
    );
}

/// Storage whose save outlasts the per-task deadline.
struct SlowSaveStorage {
    inner: LocalStorage,
    delay: Duration,
}

#[async_trait]
impl ArtifactStorage for SlowSaveStorage {
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.save(key, data).await
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.read(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.delete(key).await
    }
}

#[tokio::test]
async fn report_registration_is_not_cut_off_by_the_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(TaskStore::new());
    let results = Arc::new(ResultStore::new(
        Arc::new(SlowSaveStorage {
            inner: LocalStorage::new(dir.path()),
            delay: Duration::from_millis(300),
        }),
        ChronoDuration::hours(24),
    ));
    let (queue, receiver) = AdmissionQueue::new(10);
    let mut manager = WorkerManager::new(
        store.clone(),
        results.clone(),
        Arc::new(QuotaManager::new(1500, 50)),
        Arc::new(InstantCrawler),
        Arc::new(StubAnalyzer),
        Arc::new(MarkdownRenderer),
        50,
        Duration::from_millis(100),
    );
    manager.start_workers(1, receiver);

    let task = AnalysisTask::new(input_for("https://93.184.216.34/"));
    let id = task.id;
    store.insert(task);
    queue.submit(id).unwrap();

    wait_until(Duration::from_secs(5), || {
        store.snapshot(id).unwrap().status.is_terminal()
    })
    .await;

    // The save outlasts the deadline, but the stages themselves finished
    // within it: the task completes and never ends up failed with a
    // downloadable result attached.
    let task = store.snapshot(id).unwrap();
    assert_eq!(task.status, TaskStatus::Complete);
    assert!(results.entry(id).is_some());
}

#[tokio::test]
async fn progress_is_monotone_through_the_stages() {
    let harness = start_harness(
        1,
        10,
        Arc::new(InstantCrawler),
        Arc::new(QuotaManager::new(1500, 50)),
        Duration::from_secs(30),
    );

    let id = submit(&harness, "https://93.184.216.34/");

    let mut observed = Vec::new();
    wait_until(Duration::from_secs(5), || {
        let task = harness.store.snapshot(id).unwrap();
        observed.push(task.progress);
        task.status == TaskStatus::Complete
    })
    .await;

    assert!(observed.windows(2).all(|w| w[0] <= w[1]));
    let task = harness.store.snapshot(id).unwrap();
    assert_eq!(task.progress, 100);
    assert_eq!(task.chosen_backend, Some(BackendKind::Primary));
    assert!(task.finished_at.is_some());
}
