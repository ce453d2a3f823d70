// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 默认最大尝试次数
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// 任务实体
///
/// 表示系统中一个可调度、可重试的工作单元。任务只能由队列的
/// 认领/完成/重试/失败操作修改，核心逻辑从不删除任务。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// 任务唯一标识符
    pub id: Uuid,
    /// 任务类型，决定由哪个处理器执行
    pub task_type: TaskType,
    /// 任务状态
    pub status: TaskStatus,
    /// 任务负载数据，任务类型特定的参数（例如目标CIK）
    pub payload: serde_json::Value,
    /// 已执行失败的次数
    pub attempt_count: i32,
    /// 最大尝试次数，达到后任务进入 Failed 状态
    pub max_attempts: i32,
    /// 下次可执行时间，仅对 Retry 状态有意义
    pub next_run_at: Option<DateTime<FixedOffset>>,
    /// 最近一次失败的错误信息
    pub last_error: Option<String>,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
    /// 更新时间
    pub updated_at: DateTime<FixedOffset>,
    /// 最近一次开始执行的时间
    pub started_at: Option<DateTime<FixedOffset>>,
    /// 进入终态的时间
    pub completed_at: Option<DateTime<FixedOffset>>,
    /// 认领令牌
    ///
    /// 每次认领生成新值，写回状态转换时用于确认认领仍然有效。
    pub claim_token: Option<Uuid>,
}

/// 任务类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// 抓取某个申报人的 13F 报告
    SecScraping,
    /// 数据分析
    DataAnalysis,
    /// 数据导出
    DataExport,
    /// 系统维护
    SystemMaintenance,
    /// 持仓合并
    HoldingMerge,
}

impl TaskType {
    /// 所有任务类型
    pub const ALL: [TaskType; 5] = [
        TaskType::SecScraping,
        TaskType::DataAnalysis,
        TaskType::DataExport,
        TaskType::SystemMaintenance,
        TaskType::HoldingMerge,
    ];
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskType::SecScraping => write!(f, "sec_scraping"),
            TaskType::DataAnalysis => write!(f, "data_analysis"),
            TaskType::DataExport => write!(f, "data_export"),
            TaskType::SystemMaintenance => write!(f, "system_maintenance"),
            TaskType::HoldingMerge => write!(f, "holding_merge"),
        }
    }
}

impl FromStr for TaskType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sec_scraping" => Ok(TaskType::SecScraping),
            "data_analysis" => Ok(TaskType::DataAnalysis),
            "data_export" => Ok(TaskType::DataExport),
            "system_maintenance" => Ok(TaskType::SystemMaintenance),
            "holding_merge" => Ok(TaskType::HoldingMerge),
            other => Err(DomainError::UnknownValue(other.to_string())),
        }
    }
}

/// 任务状态枚举
///
/// 状态转换遵循以下流程：
/// Pending → Running → Completed/Retry/Failed
/// Retry → Running → Completed/Retry/Failed
///
/// Completed 和 Failed 是终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// 已提交，尚未执行
    #[default]
    Pending,
    /// 已被某次调度认领，正在执行
    Running,
    /// 执行失败，等待 next_run_at 之后重试
    Retry,
    /// 执行成功
    Completed,
    /// 执行失败且不再重试
    Failed,
}

impl TaskStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Retry => write!(f, "retry"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "retry" => Ok(TaskStatus::Retry),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(DomainError::UnknownValue(other.to_string())),
        }
    }
}

/// 领域错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 无效的状态转换
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: TaskStatus, to: TaskStatus },

    /// 无法识别的枚举值
    #[error("Unknown value: {0}")]
    UnknownValue(String),
}

impl Task {
    /// 创建一个新的待执行任务
    ///
    /// # 参数
    ///
    /// * `task_type` - 任务类型
    /// * `payload` - 任务负载数据
    /// * `max_attempts` - 最大尝试次数
    pub fn new(task_type: TaskType, payload: serde_json::Value, max_attempts: i32) -> Self {
        let now: DateTime<FixedOffset> = Utc::now().into();
        Self {
            id: Uuid::new_v4(),
            task_type,
            status: TaskStatus::Pending,
            payload,
            attempt_count: 0,
            max_attempts: max_attempts.max(1),
            next_run_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            claim_token: None,
        }
    }

    /// 判断任务在给定时间是否可被调度
    pub fn is_eligible_at(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            TaskStatus::Pending => true,
            TaskStatus::Retry => self.next_run_at.map_or(true, |at| at <= now),
            _ => false,
        }
    }

    /// 认领任务
    ///
    /// 将任务状态从 Pending/Retry 变更为 Running
    pub fn start(mut self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Pending | TaskStatus::Retry => {
                self.status = TaskStatus::Running;
                self.claim_token = Some(Uuid::new_v4());
                self.started_at = Some(now.into());
                self.updated_at = now.into();
                Ok(self)
            }
            from => Err(DomainError::InvalidStateTransition {
                from,
                to: TaskStatus::Running,
            }),
        }
    }

    /// 完成任务
    pub fn complete(mut self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        self.ensure_running(TaskStatus::Completed)?;
        self.status = TaskStatus::Completed;
        self.next_run_at = None;
        self.completed_at = Some(now.into());
        self.updated_at = now.into();
        Ok(self)
    }

    /// 记录一次失败
    ///
    /// 失败次数加一。可重试且未达到最大尝试次数时进入 Retry，
    /// 并把下次执行时间设为 `next_run_at`；否则进入 Failed。
    ///
    /// # 参数
    ///
    /// * `now` - 当前时间
    /// * `error` - 错误信息
    /// * `retryable` - 错误是否可重试
    /// * `next_run_at` - 根据新的失败次数计算下次执行时间
    pub fn fail<F>(
        mut self,
        now: DateTime<Utc>,
        error: String,
        retryable: bool,
        next_run_at: F,
    ) -> Result<Self, DomainError>
    where
        F: FnOnce(i32) -> DateTime<Utc>,
    {
        let attempts = self.attempt_count + 1;
        let target = if retryable && attempts < self.max_attempts {
            TaskStatus::Retry
        } else {
            TaskStatus::Failed
        };
        self.ensure_running(target)?;

        self.attempt_count = attempts;
        self.status = target;
        self.last_error = Some(error);
        self.updated_at = now.into();
        if target == TaskStatus::Retry {
            self.next_run_at = Some(next_run_at(attempts).into());
        } else {
            self.next_run_at = None;
            self.completed_at = Some(now.into());
        }
        Ok(self)
    }

    fn ensure_running(&self, to: TaskStatus) -> Result<(), DomainError> {
        if self.status == TaskStatus::Running {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition {
                from: self.status,
                to,
            })
        }
    }
}
