// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{Task, TaskType};
use crate::domain::repositories::task_repository::RepositoryError;
use crate::domain::services::filing_parser::ParseError;
use crate::engines::traits::FetchError;
use async_trait::async_trait;
use thiserror::Error;

/// 任务执行错误
///
/// 队列根据 [`TaskError::is_retryable`] 决定任务进入 Retry 还是 Failed。
#[derive(Error, Debug)]
pub enum TaskError {
    /// 抓取失败
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
    /// 文档不是格式良好的 XML
    #[error("Parse failed for {accession_number}: {source}")]
    Parse {
        accession_number: String,
        #[source]
        source: ParseError,
    },
    /// 报告未通过校验
    #[error("Filing {accession_number} failed validation: {}", errors.join("; "))]
    ValidationFailed {
        accession_number: String,
        errors: Vec<String>,
    },
    /// 任务负载无效
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    /// 存储错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    /// 任务类型没有注册处理器
    #[error("No processor registered for task type {0}")]
    NoProcessor(TaskType),
}

impl TaskError {
    /// 判断错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            TaskError::Fetch(e) => e.is_retryable(),
            TaskError::Parse { .. } => true,
            TaskError::Repository(e) => {
                !matches!(e, RepositoryError::Corrupt(_) | RepositoryError::Overflow(_))
            }
            TaskError::ValidationFailed { .. }
            | TaskError::InvalidPayload(_)
            | TaskError::NoProcessor(_) => false,
        }
    }
}

/// 任务处理器特质
///
/// 每种任务类型在注册表中最多对应一个处理器。处理器只负责执行，
/// 状态转换由队列完成。
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    /// 执行任务
    async fn process(&self, task: &Task) -> Result<(), TaskError>;

    /// 处理器名称
    fn name(&self) -> &'static str;
}
