// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::filing::{
    Filing, Holding, MergedHolding, MergedHoldingQuery, MergedHoldingSort, SortDirection,
};
use crate::domain::repositories::filing_repository::FilingRepository;
use crate::domain::repositories::task_repository::RepositoryError;
use crate::infrastructure::database::entities::{filing as filing_entity, holding as holding_entity};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{NullOrdering, Order},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use std::cmp::Ordering;
use std::str::FromStr;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// 报告仓库实现
///
/// 报告与持仓分表存储，持仓带文档序号。
#[derive(Clone)]
pub struct FilingRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl FilingRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn find_model_by_accession_number<C: ConnectionTrait>(
        conn: &C,
        accession_number: &str,
    ) -> Result<Option<filing_entity::Model>, DbErr> {
        filing_entity::Entity::find()
            .filter(filing_entity::Column::AccessionNumber.eq(accession_number))
            .one(conn)
            .await
    }

    /// 回填已存在报告的公司名称
    async fn backfill(
        &self,
        existing: filing_entity::Model,
        filing: &Filing,
    ) -> Result<Uuid, RepositoryError> {
        let id = existing.id;
        let Some(name) = filing
            .company_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        else {
            return Ok(id);
        };
        if existing.company_name.as_deref() == Some(name) {
            return Ok(id);
        }

        debug!(
            accession_number = %existing.accession_number,
            company_name = name,
            "Backfilling company name"
        );
        let mut active: filing_entity::ActiveModel = existing.into();
        active.company_name = Set(Some(name.to_string()));
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(self.db.as_ref()).await?;
        Ok(id)
    }

    async fn load_holdings(
        &self,
        filing_ids: Vec<Uuid>,
    ) -> Result<HashMap<Uuid, Vec<holding_entity::Model>>, RepositoryError> {
        let mut grouped: HashMap<Uuid, Vec<holding_entity::Model>> = HashMap::new();
        if filing_ids.is_empty() {
            return Ok(grouped);
        }
        let models = holding_entity::Entity::find()
            .filter(holding_entity::Column::FilingId.is_in(filing_ids))
            .order_by_asc(holding_entity::Column::FilingId)
            .order_by_asc(holding_entity::Column::Position)
            .all(self.db.as_ref())
            .await?;
        for model in models {
            grouped.entry(model.filing_id).or_default().push(model);
        }
        Ok(grouped)
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl TryFrom<holding_entity::Model> for Holding {
    type Error = RepositoryError;

    fn try_from(model: holding_entity::Model) -> Result<Self, Self::Error> {
        let value = model
            .value
            .as_deref()
            .map(|raw| {
                Decimal::from_str(raw).map_err(|e| {
                    RepositoryError::Corrupt(format!("holding {} value {:?}: {}", model.id, raw, e))
                })
            })
            .transpose()?;
        Ok(Self {
            issuer_name: model.issuer_name,
            title_of_class: model.title_of_class,
            cusip: model.cusip,
            value,
            shares: model.shares,
            share_type: model.share_type,
        })
    }
}

fn into_filing(
    model: filing_entity::Model,
    holdings: Vec<holding_entity::Model>,
) -> Result<Filing, RepositoryError> {
    Ok(Filing {
        id: Some(model.id),
        cik: model.cik,
        accession_number: model.accession_number,
        filing_type: model.filing_type,
        filing_date: model.filing_date,
        report_period: model.report_period,
        company_name: model.company_name,
        holdings: holdings
            .into_iter()
            .map(Holding::try_from)
            .collect::<Result<_, _>>()?,
    })
}

/// 报告期间过滤条件
///
/// 报告期间缺失时以申报日期代替；只要设置了任一边界，两者都缺失的报告被排除。
fn period_condition(query: &MergedHoldingQuery) -> Option<Condition> {
    if query.period_from.is_none() && query.period_to.is_none() {
        return None;
    }
    let bounded = |column: filing_entity::Column| {
        let mut cond = Condition::all().add(column.is_not_null());
        if let Some(from) = query.period_from {
            cond = cond.add(column.gte(from));
        }
        if let Some(to) = query.period_to {
            cond = cond.add(column.lte(to));
        }
        cond
    };
    Some(
        Condition::any()
            .add(bounded(filing_entity::Column::ReportPeriod))
            .add(
                bounded(filing_entity::Column::FilingDate)
                    .add(filing_entity::Column::ReportPeriod.is_null()),
            ),
    )
}

#[async_trait]
impl FilingRepository for FilingRepositoryImpl {
    async fn save_filing(&self, filing: &Filing) -> Result<Uuid, RepositoryError> {
        let accession_number = filing.accession_number.trim();

        if let Some(existing) =
            Self::find_model_by_accession_number(self.db.as_ref(), accession_number).await?
        {
            return self.backfill(existing, filing).await;
        }

        let id = Uuid::new_v4();
        let now = Utc::now().fixed_offset();
        let txn = self.db.begin().await?;

        let row = filing_entity::ActiveModel {
            id: Set(id),
            cik: Set(filing.cik.trim().to_string()),
            accession_number: Set(accession_number.to_string()),
            filing_type: Set(filing.filing_type.clone()),
            filing_date: Set(filing.filing_date),
            report_period: Set(filing.report_period),
            company_name: Set(filing.company_name.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        if let Err(e) = filing_entity::Entity::insert(row).exec(&txn).await {
            txn.rollback().await?;
            if !is_unique_violation(&e) {
                return Err(e.into());
            }
            // 并发写入方先插入了同一份报告
            debug!(accession_number, "Lost insert race, re-reading filing");
            let existing = Self::find_model_by_accession_number(self.db.as_ref(), accession_number)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            return self.backfill(existing, filing).await;
        }

        let mut holdings = Vec::with_capacity(filing.holdings.len());
        for (position, holding) in filing.holdings.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| RepositoryError::Corrupt("too many holdings".to_string()))?;
            holdings.push(holding_entity::ActiveModel {
                id: Set(Uuid::new_v4()),
                filing_id: Set(id),
                position: Set(position),
                issuer_name: Set(holding.issuer_name.clone()),
                title_of_class: Set(holding.title_of_class.clone()),
                cusip: Set(holding.cusip.clone()),
                value: Set(holding.value.map(|v| v.to_string())),
                shares: Set(holding.shares),
                share_type: Set(holding.share_type.clone()),
            });
        }
        if !holdings.is_empty() {
            holding_entity::Entity::insert_many(holdings)
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;

        info!(
            accession_number,
            holdings = filing.holdings.len(),
            "Filing saved"
        );
        Ok(id)
    }

    async fn find_by_cik(&self, cik: &str) -> Result<Vec<Filing>, RepositoryError> {
        let filings = filing_entity::Entity::find()
            .filter(filing_entity::Column::Cik.eq(cik.trim()))
            .order_by_with_nulls(
                filing_entity::Column::FilingDate,
                Order::Desc,
                NullOrdering::Last,
            )
            .order_by_desc(filing_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        let mut holdings = self
            .load_holdings(filings.iter().map(|f| f.id).collect())
            .await?;

        filings
            .into_iter()
            .map(|model| {
                let rows = holdings.remove(&model.id).unwrap_or_default();
                into_filing(model, rows)
            })
            .collect()
    }

    async fn find_id_by_accession_number(
        &self,
        accession_number: &str,
    ) -> Result<Option<Uuid>, RepositoryError> {
        Ok(
            Self::find_model_by_accession_number(self.db.as_ref(), accession_number.trim())
                .await?
                .map(|model| model.id),
        )
    }

    async fn query_merged_holdings(
        &self,
        query: &MergedHoldingQuery,
    ) -> Result<Vec<MergedHolding>, RepositoryError> {
        let mut select = filing_entity::Entity::find();
        if let Some(cik) = query.cik.as_deref() {
            select = select.filter(filing_entity::Column::Cik.eq(cik.trim()));
        }
        if let Some(period) = period_condition(query) {
            select = select.filter(period);
        }
        let filings: Vec<Filing> = {
            let models = select.all(self.db.as_ref()).await?;
            let mut holdings = self
                .load_holdings(models.iter().map(|f| f.id).collect())
                .await?;
            models
                .into_iter()
                .map(|model| {
                    let rows = holdings.remove(&model.id).unwrap_or_default();
                    into_filing(model, rows)
                })
                .collect::<Result<_, _>>()?
        };

        let merged = merge_holdings(&filings, query)?;
        debug!(filings = filings.len(), merged = merged.len(), "Merged holdings");
        Ok(merged)
    }
}

fn in_period(period: Option<NaiveDate>, query: &MergedHoldingQuery) -> bool {
    if query.period_from.is_none() && query.period_to.is_none() {
        return true;
    }
    let Some(period) = period else {
        return false;
    };
    query.period_from.map_or(true, |from| period >= from)
        && query.period_to.map_or(true, |to| period <= to)
}

/// 按 (CIK, CUSIP) 合并持仓并应用过滤、排序与截断
///
/// 市值合计超出 `Decimal` 表示范围时返回 `RepositoryError::Overflow`。
fn merge_holdings(
    filings: &[Filing],
    query: &MergedHoldingQuery,
) -> Result<Vec<MergedHolding>, RepositoryError> {
    let mut ordered: Vec<&Filing> = filings
        .iter()
        .filter(|filing| in_period(filing.period(), query))
        .collect();
    // 按期间升序遍历，后出现的发行人名称即最新一期的名称
    ordered.sort_by(|a, b| {
        a.period()
            .cmp(&b.period())
            .then_with(|| a.accession_number.cmp(&b.accession_number))
    });

    let mut groups: BTreeMap<(String, String), MergedHolding> = BTreeMap::new();
    for filing in ordered {
        let period = filing.period();
        for holding in &filing.holdings {
            let Some(cusip) = holding
                .cusip
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
            else {
                continue;
            };
            let cusip = cusip.to_ascii_uppercase();
            let entry = groups
                .entry((filing.cik.clone(), cusip.clone()))
                .or_insert_with(|| MergedHolding {
                    cik: filing.cik.clone(),
                    cusip,
                    issuer_name: None,
                    total_value: Decimal::ZERO,
                    total_shares: 0,
                    holding_count: 0,
                    filing_count: 0,
                    accession_numbers: Vec::new(),
                    first_period: period,
                    last_period: period,
                });

            entry.total_value = entry
                .total_value
                .checked_add(holding.value.unwrap_or_default())
                .ok_or_else(|| {
                    RepositoryError::Overflow(format!(
                        "total value of {} for CIK {}",
                        entry.cusip, entry.cik
                    ))
                })?;
            entry.total_shares = entry.total_shares.saturating_add(holding.shares.unwrap_or(0));
            entry.holding_count += 1;
            if holding.issuer_name.is_some() {
                entry.issuer_name = holding.issuer_name.clone();
            }
            if !entry.accession_numbers.contains(&filing.accession_number) {
                entry.accession_numbers.push(filing.accession_number.clone());
                entry.filing_count = entry.accession_numbers.len();
            }
            entry.first_period = match (entry.first_period, period) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            entry.last_period = match (entry.last_period, period) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
        }
    }

    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut merged: Vec<MergedHolding> = groups
        .into_values()
        .filter(|m| query.min_value.map_or(true, |min| m.total_value >= min))
        .filter(|m| match &search {
            None => true,
            Some(needle) => {
                m.cusip.to_lowercase().contains(needle.as_str())
                    || m
                        .issuer_name
                        .as_deref()
                        .is_some_and(|name| name.to_lowercase().contains(needle.as_str()))
            }
        })
        .collect();

    merged.sort_by(|a, b| {
        let primary = compare_by(a, b, query.sort_by);
        let primary = match query.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary
            .then_with(|| a.cusip.cmp(&b.cusip))
            .then_with(|| a.cik.cmp(&b.cik))
    });

    if let Some(limit) = query.limit {
        merged.truncate(limit);
    }
    Ok(merged)
}

fn compare_by(a: &MergedHolding, b: &MergedHolding, sort: MergedHoldingSort) -> Ordering {
    match sort {
        MergedHoldingSort::Value => a.total_value.cmp(&b.total_value),
        MergedHoldingSort::Shares => a.total_shares.cmp(&b.total_shares),
        MergedHoldingSort::IssuerName => a
            .issuer_name
            .as_deref()
            .map(str::to_lowercase)
            .cmp(&b.issuer_name.as_deref().map(str::to_lowercase)),
        MergedHoldingSort::Cusip => a.cusip.cmp(&b.cusip),
        MergedHoldingSort::FilingCount => a.filing_count.cmp(&b.filing_count),
    }
}

#[cfg(test)]
#[path = "filing_repo_impl_test.rs"]
mod tests;
