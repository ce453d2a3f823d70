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

use filingrs::config::settings::Settings;
use filingrs::domain::models::task::TaskType;
use filingrs::domain::services::filing_validator::{FilingValidator, ValidationRules};
use filingrs::engines::sec_engine::SecEdgarEngine;
use filingrs::infrastructure::database::connection;
use filingrs::infrastructure::metrics::init_metrics;
use filingrs::infrastructure::repositories::filing_repo_impl::FilingRepositoryImpl;
use filingrs::infrastructure::repositories::task_repo_impl::TaskRepositoryImpl;
use filingrs::queue::registry::ProcessorRegistry;
use filingrs::queue::scheduler::TaskScheduler;
use filingrs::queue::task_queue::{DbTaskQueue, TaskQueue};
use filingrs::utils::retry_policy::RetryPolicy;
use filingrs::utils::telemetry;
use filingrs::workers::holding_merge_processor::HoldingMergeProcessor;
use filingrs::workers::maintenance_processor::MaintenanceProcessor;
use filingrs::workers::sec_scraping_processor::SecScrapingProcessor;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动调度器。
/// 命令行参数中的每个 CIK 都会提交一个 SEC_SCRAPING 任务。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting filingrs...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    init_metrics(&settings.metrics)?;

    // 3. Connect to database
    let db = Arc::new(connection::create_pool(&settings.database).await?);
    info!("Database connection established");
    connection::run_migrations(db.as_ref()).await?;

    // 4. Initialize components
    let task_repo = Arc::new(TaskRepositoryImpl::new(db.clone()));
    let filing_repo = Arc::new(FilingRepositoryImpl::new(db.clone()));
    let engine = Arc::new(SecEdgarEngine::new(&settings.sec)?);
    let validator = FilingValidator::new(ValidationRules {
        require_cusip: settings.validation.require_cusip,
        require_value: settings.validation.require_value,
    });
    let stale_task_timeout = settings.scheduler.stale_task_timeout();

    // 5. Register processors
    let mut registry = ProcessorRegistry::new();
    registry.register(
        TaskType::SecScraping,
        Arc::new(SecScrapingProcessor::new(
            engine,
            filing_repo.clone(),
            validator,
        )),
    )?;
    registry.register(
        TaskType::HoldingMerge,
        Arc::new(HoldingMergeProcessor::new(filing_repo.clone())),
    )?;
    registry.register(
        TaskType::SystemMaintenance,
        Arc::new(MaintenanceProcessor::new(
            task_repo.clone(),
            stale_task_timeout,
        )),
    )?;

    let queue = Arc::new(DbTaskQueue::new(
        task_repo.clone(),
        Arc::new(registry),
        RetryPolicy::from_settings(&settings.scheduler),
        settings.scheduler.concurrency,
    ));

    for cik in std::env::args().skip(1) {
        let id = queue
            .submit(TaskType::SecScraping, json!({ "cik": cik }))
            .await?;
        info!(task_id = %id, cik = %cik, "Submitted scraping task");
    }

    // 6. Start scheduler
    let scheduler = TaskScheduler::new(queue, task_repo, &settings.scheduler);
    let handle = scheduler.start();

    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => error!("Unable to listen for shutdown signal: {}", err),
    }

    scheduler.shutdown();
    handle.await?;
    info!("filingrs stopped");

    Ok(())
}
