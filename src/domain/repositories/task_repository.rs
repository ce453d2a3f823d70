// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{Task, TaskStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 存储的数据无法映射回领域模型
    #[error("Corrupt record: {0}")]
    Corrupt(String),
    /// 金额累加超出可表示范围
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),
    /// 任务已不归本次执行持有（被回收或重新认领）
    #[error("Claim lost for task {0}")]
    ClaimLost(Uuid),
}

/// 任务仓库特质
///
/// 定义任务数据访问接口。每次状态转换都会被持久化，
/// 进程重启后调度可以从存储的状态继续。
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// 创建新任务
    async fn create(&self, task: &Task) -> Result<Task, RepositoryError>;
    /// 根据ID查找任务
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, RepositoryError>;
    /// 查找某状态的所有任务
    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, RepositoryError>;
    /// 查找在 `now` 时刻可执行的任务（Pending，或 next_run_at 已到的 Retry）
    async fn find_eligible(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<Task>, RepositoryError>;
    /// 原子地认领任务
    ///
    /// 仅当任务仍处于可执行状态时把它置为 Running；
    /// 已被其他调度认领时返回 `Ok(None)`。
    async fn claim(&self, id: Uuid, now: DateTime<Utc>) -> Result<Option<Task>, RepositoryError>;
    /// 持久化一次状态转换
    ///
    /// 只在存储中的任务仍为 Running 且认领令牌与 `task.claim_token` 相同时写入；
    /// 认领已被回收或重新认领时返回 `RepositoryError::ClaimLost`。
    async fn update(&self, task: &Task) -> Result<Task, RepositoryError>;
    /// 回收长时间处于 Running 的任务
    ///
    /// 每次回收计为一次失败：尝试次数加一，仍有剩余次数的任务进入 Retry，
    /// 用尽的进入 Failed。返回被回收的任务数。
    async fn reset_stale_tasks(
        &self,
        timeout: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;
}
