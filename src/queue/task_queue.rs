// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{DomainError, Task, TaskStatus, TaskType};
use crate::domain::repositories::task_repository::{RepositoryError, TaskRepository};
use crate::queue::registry::ProcessorRegistry;
use crate::utils::retry_policy::RetryPolicy;
use crate::workers::processor::TaskError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use metrics::counter;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// 每次调度最多读取的任务数
pub const DEFAULT_BATCH_SIZE: u64 = 100;

/// 队列使用的时钟
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// 仓库错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// 该任务类型没有注册处理器
    #[error("No processor registered for task type {0}")]
    InvalidTaskType(TaskType),

    /// 非法状态转换
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

/// 一次调度的统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    /// 成功认领的任务数
    pub claimed: usize,
    pub completed: usize,
    /// 进入 Retry 的任务数
    pub retried: usize,
    pub failed: usize,
}

#[derive(Default)]
struct TickCounters {
    claimed: AtomicUsize,
    completed: AtomicUsize,
    retried: AtomicUsize,
    failed: AtomicUsize,
}

impl TickCounters {
    fn record(&self, status: TaskStatus) {
        let counter = match status {
            TaskStatus::Completed => &self.completed,
            TaskStatus::Retry => &self.retried,
            TaskStatus::Failed => &self.failed,
            TaskStatus::Pending | TaskStatus::Running => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn summary(&self) -> TickSummary {
        TickSummary {
            claimed: self.claimed.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// 任务队列特质
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// 提交任务
    ///
    /// # 返回值
    ///
    /// * `Ok(Uuid)` - 新任务ID，状态为 Pending
    /// * `Err(QueueError::InvalidTaskType)` - 该类型没有注册处理器
    async fn submit(
        &self,
        task_type: TaskType,
        payload: serde_json::Value,
    ) -> Result<Uuid, QueueError>;

    /// 执行当前所有可执行的任务
    async fn run_eligible_tasks(&self) -> Result<TickSummary, QueueError> {
        self.run_eligible_tasks_at(Utc::now()).await
    }

    /// 以给定时间执行一次调度
    ///
    /// `now` 决定哪些任务可执行以及认领时间；执行结束后的状态转换
    /// （完成时间、下次重试时间）以队列时钟在结束时的读数为准，且不早于 `now`。
    async fn run_eligible_tasks_at(&self, now: DateTime<Utc>) -> Result<TickSummary, QueueError>;

    /// 查询任务
    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, QueueError>;
}

/// 基于任务仓库的队列实现
pub struct DbTaskQueue<R: TaskRepository> {
    /// 任务仓库
    repository: Arc<R>,
    registry: Arc<ProcessorRegistry>,
    retry_policy: RetryPolicy,
    /// 单次调度内的并发数
    concurrency: usize,
    batch_size: u64,
    clock: Clock,
}

impl<R: TaskRepository> DbTaskQueue<R> {
    /// 创建新的任务队列实例
    ///
    /// # 参数
    ///
    /// * `repository` - 任务仓库
    /// * `registry` - 处理器注册表
    /// * `retry_policy` - 失败后的退避策略，同时决定新任务的最大尝试次数
    /// * `concurrency` - 单次调度内的并发数
    pub fn new(
        repository: Arc<R>,
        registry: Arc<ProcessorRegistry>,
        retry_policy: RetryPolicy,
        concurrency: usize,
    ) -> Self {
        Self {
            repository,
            registry,
            retry_policy,
            concurrency: concurrency.max(1),
            batch_size: DEFAULT_BATCH_SIZE,
            clock: Arc::new(Utc::now),
        }
    }

    /// 替换读取当前时间的时钟
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// 设置每次调度读取的任务数上限
    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// 认领并执行单个任务，返回最终状态
    ///
    /// 已被其他调度认领，或执行期间认领被回收时返回 `Ok(None)`。
    async fn execute(
        &self,
        candidate: Task,
        now: DateTime<Utc>,
        counters: &TickCounters,
    ) -> Result<Option<TaskStatus>, QueueError> {
        let Some(task) = self.repository.claim(candidate.id, now).await? else {
            return Ok(None);
        };
        counters.claimed.fetch_add(1, Ordering::Relaxed);

        let result = match self.registry.get(task.task_type) {
            Some(processor) => {
                debug!(processor = processor.name(), attempt = task.attempt_count + 1, "Processing task");
                processor.process(&task).await
            }
            None => Err(TaskError::NoProcessor(task.task_type)),
        };

        let finished = (self.clock)().max(now);
        let task = match result {
            Ok(()) => task.complete(finished)?,
            Err(e) => {
                let retryable = e.is_retryable();
                warn!(error = %e, retryable, "Task attempt failed");
                let policy = &self.retry_policy;
                task.fail(finished, e.to_string(), retryable, |attempts| {
                    policy.next_retry_time(attempts.max(1) as u32, finished)
                })?
            }
        };

        let task = match self.repository.update(&task).await {
            Ok(task) => task,
            Err(RepositoryError::ClaimLost(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match task.status {
            TaskStatus::Retry => info!(
                attempts = task.attempt_count,
                next_run_at = ?task.next_run_at,
                "Task scheduled for retry"
            ),
            status => info!(status = %status, attempts = task.attempt_count, "Task finished"),
        }
        Ok(Some(task.status))
    }
}

#[async_trait]
impl<R: TaskRepository + 'static> TaskQueue for DbTaskQueue<R> {
    async fn submit(
        &self,
        task_type: TaskType,
        payload: serde_json::Value,
    ) -> Result<Uuid, QueueError> {
        if !self.registry.contains(task_type) {
            return Err(QueueError::InvalidTaskType(task_type));
        }

        let task = Task::new(task_type, payload, self.retry_policy.max_attempts as i32);
        let created = self.repository.create(&task).await?;
        info!(task_id = %created.id, task_type = %task_type, "Task submitted");
        Ok(created.id)
    }

    async fn run_eligible_tasks_at(&self, now: DateTime<Utc>) -> Result<TickSummary, QueueError> {
        let candidates = self.repository.find_eligible(now, self.batch_size).await?;
        if candidates.is_empty() {
            return Ok(TickSummary::default());
        }
        debug!(candidates = candidates.len(), "Running eligible tasks");

        let counters = TickCounters::default();
        futures::stream::iter(candidates)
            .for_each_concurrent(self.concurrency, |task| {
                let span = info_span!("task", task_id = %task.id, task_type = %task.task_type);
                let counters = &counters;
                async move {
                    match self.execute(task, now, counters).await {
                        Ok(Some(status)) => {
                            counters.record(status);
                            counter!("filingrs_tasks_total", "outcome" => status.to_string())
                                .increment(1);
                        }
                        Ok(None) => {}
                        Err(e) => error!(error = %e, "Failed to record task outcome"),
                    }
                }
                .instrument(span)
            })
            .await;

        let summary = counters.summary();
        if summary.claimed > 0 {
            info!(
                claimed = summary.claimed,
                completed = summary.completed,
                retried = summary.retried,
                failed = summary.failed,
                "Scheduling tick finished"
            );
        }
        Ok(summary)
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, QueueError> {
        Ok(self.repository.find_by_id(id).await?)
    }
}

#[async_trait]
impl<T: TaskQueue + ?Sized> TaskQueue for Arc<T> {
    async fn submit(
        &self,
        task_type: TaskType,
        payload: serde_json::Value,
    ) -> Result<Uuid, QueueError> {
        (**self).submit(task_type, payload).await
    }

    async fn run_eligible_tasks_at(&self, now: DateTime<Utc>) -> Result<TickSummary, QueueError> {
        (**self).run_eligible_tasks_at(now).await
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, QueueError> {
        (**self).get_task(id).await
    }
}

#[cfg(test)]
#[path = "task_queue_test.rs"]
mod tests;
