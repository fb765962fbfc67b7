// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::Extension;
use chrono::Duration as ChronoDuration;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use seors::application::usecases::submit_analysis::SubmitAnalysisUseCase;
use seors::config::settings::Settings;
use seors::engines::crawler::ReqwestCrawler;
use seors::engines::gemini::GeminiAnalyzer;
use seors::engines::renderer::MarkdownRenderer;
use seors::infrastructure::result_store::ResultStore;
use seors::infrastructure::storage::LocalStorage;
use seors::limits::quota::QuotaManager;
use seors::limits::rate_limiter::SlidingWindowLimiter;
use seors::presentation::routes;
use seors::queue::admission::AdmissionQueue;
use seors::queue::task_store::TaskStore;
use seors::utils::telemetry;
use seors::workers::expiration_worker::ExpirationWorker;
use seors::workers::manager::WorkerManager;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting seors...");

    // Initialize Prometheus Metrics
    seors::infrastructure::metrics::init_metrics();

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    if !settings.gemini.is_configured() {
        tracing::warn!("Gemini API key not configured, analyses will fail at the AI stage");
    }

    // 3. Prepare the results directory
    tokio::fs::create_dir_all(&settings.storage.results_dir).await?;
    let retention = ChronoDuration::hours(settings.storage.retention_hours);

    // 4. Initialize admission controls
    let limiter = Arc::new(SlidingWindowLimiter::new(
        ChronoDuration::seconds(settings.rate_limiting.window_secs as i64),
        settings.rate_limiting.max_requests,
    ));
    let quota = Arc::new(QuotaManager::new(
        settings.gemini.primary_daily_limit,
        settings.gemini.fallback_daily_limit,
    ));
    let (queue, receiver) = AdmissionQueue::new(settings.concurrency.queue_capacity);
    info!("Admission controls initialized");

    // 5. Initialize stores
    let store = Arc::new(TaskStore::new());
    let storage = Arc::new(LocalStorage::new(settings.storage.results_dir.clone()));
    let results = Arc::new(ResultStore::new(storage, retention));

    // 6. Initialize engines
    let crawler = Arc::new(ReqwestCrawler::new()?);
    let analyzer = Arc::new(GeminiAnalyzer::new(&settings.gemini)?);
    let renderer = Arc::new(MarkdownRenderer);

    // 7. Start workers
    let mut worker_manager = WorkerManager::new(
        store.clone(),
        results.clone(),
        quota.clone(),
        crawler,
        analyzer,
        renderer,
        settings.analysis.max_pages_per_site,
        Duration::from_secs(settings.analysis.task_timeout_secs),
    );
    worker_manager.start_workers(settings.concurrency.max_concurrent_analyses, receiver);

    let expiration_worker =
        ExpirationWorker::new(results.clone(), store.clone(), limiter.clone(), retention);
    let sweep_handle = expiration_worker.start();

    // 8. Wire the submission use case
    let use_case = Arc::new(SubmitAnalysisUseCase::new(
        settings.clone(),
        limiter,
        store.clone(),
        queue,
    ));

    // 9. Start HTTP server
    let app = routes::routes()
        .layer(Extension(use_case))
        .layer(Extension(store))
        .layer(Extension(results))
        .layer(Extension(settings.clone()));

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => tracing::error!("Unable to listen for shutdown signal: {}", err),
        }
    })
    .await?;

    // 10. Shut down background work once the server has drained
    worker_manager.shutdown();
    sweep_handle.abort();
    info!("seors stopped");

    Ok(())
}
