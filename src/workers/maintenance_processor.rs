// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::Task;
use crate::domain::repositories::task_repository::TaskRepository;
use crate::workers::processor::{TaskError, TaskProcessor};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;

/// 系统维护处理器
///
/// 按需执行一次卡住任务的回收，与调度器的定期维护相同。
pub struct MaintenanceProcessor<R: TaskRepository> {
    repository: Arc<R>,
    stale_task_timeout: Duration,
}

impl<R: TaskRepository> MaintenanceProcessor<R> {
    pub fn new(repository: Arc<R>, stale_task_timeout: Duration) -> Self {
        Self {
            repository,
            stale_task_timeout,
        }
    }
}

#[async_trait]
impl<R: TaskRepository + 'static> TaskProcessor for MaintenanceProcessor<R> {
    async fn process(&self, task: &Task) -> Result<(), TaskError> {
        let reset = self
            .repository
            .reset_stale_tasks(self.stale_task_timeout, Utc::now())
            .await?;
        info!(task_id = %task.id, reset, "Maintenance finished");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "system_maintenance"
    }
}
