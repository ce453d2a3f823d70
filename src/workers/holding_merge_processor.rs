// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::filing::MergedHoldingQuery;
use crate::domain::models::task::Task;
use crate::domain::repositories::filing_repository::FilingRepository;
use crate::domain::repositories::task_repository::RepositoryError;
use crate::workers::processor::{TaskError, TaskProcessor};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};

/// 持仓合并处理器
///
/// 负载是一个 [`MergedHoldingQuery`]。任务只在日志中记录合并结果的规模和市值合计，
/// 不持久化合并结果；需要具体行的调用方直接使用
/// [`FilingRepository::query_merged_holdings`]。
pub struct HoldingMergeProcessor<S: FilingRepository> {
    store: Arc<S>,
}

impl<S: FilingRepository> HoldingMergeProcessor<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: FilingRepository + 'static> TaskProcessor for HoldingMergeProcessor<S> {
    #[instrument(skip_all, fields(task_id = %task.id))]
    async fn process(&self, task: &Task) -> Result<(), TaskError> {
        let query: MergedHoldingQuery = serde_json::from_value(task.payload.clone())
            .map_err(|e| TaskError::InvalidPayload(e.to_string()))?;

        let merged = self.store.query_merged_holdings(&query).await?;
        let total_value = merged
            .iter()
            .try_fold(Decimal::ZERO, |acc, m| acc.checked_add(m.total_value))
            .ok_or_else(|| RepositoryError::Overflow("total value of merged holdings".to_string()))?;
        info!(
            cik = query.cik.as_deref().unwrap_or("*"),
            positions = merged.len(),
            total_value = %total_value,
            "Merged holdings"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "holding_merge"
    }
}
