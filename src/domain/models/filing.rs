// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 13F 持仓报告
///
/// 以 accession number 作为业务主键，持久化后除公司名称回填外不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filing {
    /// 存储层分配的标识符，未持久化时为空
    pub id: Option<Uuid>,
    /// 申报人 CIK
    pub cik: String,
    /// 全局唯一的 accession number
    pub accession_number: String,
    /// 报告类型，例如 13F-HR
    pub filing_type: Option<String>,
    /// 申报日期
    pub filing_date: Option<NaiveDate>,
    /// 报告所属期间
    pub report_period: Option<NaiveDate>,
    /// 公司名称
    pub company_name: Option<String>,
    /// 按文档顺序排列的持仓
    pub holdings: Vec<Holding>,
}

impl Filing {
    /// 创建一个空的报告
    pub fn new(cik: impl Into<String>, accession_number: impl Into<String>) -> Self {
        Self {
            id: None,
            cik: cik.into(),
            accession_number: accession_number.into(),
            filing_type: None,
            filing_date: None,
            report_period: None,
            company_name: None,
            holdings: Vec::new(),
        }
    }

    /// 用索引条目补齐文档中缺失的头部字段
    ///
    /// 文档中已有的值优先。
    pub fn apply_reference(&mut self, reference: &FilingReference) {
        if self.accession_number.trim().is_empty() {
            self.accession_number = reference.accession_number.clone();
        }
        if self.filing_type.is_none() {
            self.filing_type = reference.filing_type.clone();
        }
        if self.filing_date.is_none() {
            self.filing_date = reference.filing_date;
        }
    }

    /// 合并查询使用的期间：优先报告期，其次申报日期
    pub fn period(&self) -> Option<NaiveDate> {
        self.report_period.or(self.filing_date)
    }
}

/// 报告中的一条持仓
///
/// 任何字段都可能缺失，这是正常情况而非错误。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub issuer_name: Option<String>,
    pub title_of_class: Option<String>,
    pub cusip: Option<String>,
    /// 申报市值，使用十进制定点数避免精度丢失
    pub value: Option<Decimal>,
    pub shares: Option<i64>,
    /// SH 或 PRN
    pub share_type: Option<String>,
}

impl Holding {
    /// 是否所有字段都缺失
    pub fn is_empty(&self) -> bool {
        self.issuer_name.is_none()
            && self.title_of_class.is_none()
            && self.cusip.is_none()
            && self.value.is_none()
            && self.shares.is_none()
            && self.share_type.is_none()
    }
}

/// 申报人索引中的一条报告引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingReference {
    pub accession_number: String,
    pub filing_type: Option<String>,
    pub filing_date: Option<NaiveDate>,
    pub filing_href: Option<String>,
}

/// 申报人索引
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilingIndex {
    /// 索引中的公司名称
    pub company_name: Option<String>,
    /// 按索引顺序排列的报告引用
    pub references: Vec<FilingReference>,
}

/// 跨报告合并后的持仓
///
/// 按 (CIK, CUSIP) 分组，市值与股数求和，并保留所有贡献的 accession number。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedHolding {
    pub cik: String,
    pub cusip: String,
    /// 最新一期报告中的发行人名称
    pub issuer_name: Option<String>,
    pub total_value: Decimal,
    pub total_shares: i64,
    /// 参与合并的持仓条数
    pub holding_count: usize,
    /// 参与合并的报告数
    pub filing_count: usize,
    pub accession_numbers: Vec<String>,
    pub first_period: Option<NaiveDate>,
    pub last_period: Option<NaiveDate>,
}

/// 合并查询的排序字段
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergedHoldingSort {
    #[default]
    Value,
    Shares,
    IssuerName,
    Cusip,
    FilingCount,
}

/// 排序方向
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// 合并查询参数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergedHoldingQuery {
    pub cik: Option<String>,
    /// 合并后总市值下限
    pub min_value: Option<Decimal>,
    /// 按发行人名称或 CUSIP 的不区分大小写搜索
    pub search: Option<String>,
    pub sort_by: MergedHoldingSort,
    pub direction: SortDirection,
    pub period_from: Option<NaiveDate>,
    pub period_to: Option<NaiveDate>,
    pub limit: Option<usize>,
}
