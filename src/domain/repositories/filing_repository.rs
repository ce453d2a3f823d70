// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::filing::{Filing, MergedHolding, MergedHoldingQuery};
use crate::domain::repositories::task_repository::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 报告仓库特质
///
/// 以 accession number 保证每份报告最多一行。
#[async_trait]
pub trait FilingRepository: Send + Sync {
    /// 幂等保存报告
    ///
    /// 已存在同一 accession number 时只回填可变字段（公司名称）并返回已有ID；
    /// 否则在一个事务内写入报告及其全部持仓。
    async fn save_filing(&self, filing: &Filing) -> Result<Uuid, RepositoryError>;
    /// 查询申报人的全部报告，最新的在前
    async fn find_by_cik(&self, cik: &str) -> Result<Vec<Filing>, RepositoryError>;
    /// 根据 accession number 查找报告ID
    async fn find_id_by_accession_number(
        &self,
        accession_number: &str,
    ) -> Result<Option<Uuid>, RepositoryError>;
    /// 跨报告合并持仓
    async fn query_merged_holdings(
        &self,
        query: &MergedHoldingQuery,
    ) -> Result<Vec<MergedHolding>, RepositoryError>;
}
