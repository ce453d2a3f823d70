// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::filing::FilingReference;
use crate::domain::models::task::Task;
use crate::domain::repositories::filing_repository::FilingRepository;
use crate::domain::services::filing_parser::FilingParser;
use crate::domain::services::filing_validator::FilingValidator;
use crate::engines::sec_engine::DEFAULT_FORM_TYPE;
use crate::engines::traits::FilingFetcher;
use crate::workers::processor::{TaskError, TaskProcessor};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// SEC_SCRAPING 任务负载
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecScrapingPayload {
    /// 申报人 CIK
    pub cik: String,
    /// 报告类型，同时接受其修正版（`/A` 后缀）
    #[serde(default)]
    pub form_type: Option<String>,
    /// 最多处理的报告数
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SecScrapingPayload {
    fn from_task(task: &Task) -> Result<Self, TaskError> {
        let payload: Self = serde_json::from_value(task.payload.clone())
            .map_err(|e| TaskError::InvalidPayload(e.to_string()))?;
        if payload.cik.trim().is_empty() {
            return Err(TaskError::InvalidPayload("cik is missing".to_string()));
        }
        Ok(payload)
    }

    fn form_type(&self) -> &str {
        self.form_type
            .as_deref()
            .map(str::trim)
            .filter(|form| !form.is_empty())
            .unwrap_or(DEFAULT_FORM_TYPE)
    }

    /// 引用是否属于请求的报告类型
    fn accepts(&self, reference: &FilingReference) -> bool {
        let Some(filing_type) = reference.filing_type.as_deref() else {
            return true;
        };
        let wanted = self.form_type();
        let filing_type = filing_type.trim();
        filing_type.eq_ignore_ascii_case(wanted)
            || filing_type
                .strip_suffix("/A")
                .is_some_and(|base| base.eq_ignore_ascii_case(wanted))
    }
}

/// SEC 报告抓取处理器
///
/// 获取申报人索引，跳过已存储的报告，其余逐份下载、解析、校验并保存。
/// 任意一份报告出错都会中止整个任务，已保存的报告在重试时会被跳过。
pub struct SecScrapingProcessor<F, S>
where
    F: FilingFetcher,
    S: FilingRepository,
{
    fetcher: Arc<F>,
    store: Arc<S>,
    validator: FilingValidator,
}

impl<F, S> SecScrapingProcessor<F, S>
where
    F: FilingFetcher,
    S: FilingRepository,
{
    /// 创建新的抓取处理器实例
    ///
    /// # 参数
    ///
    /// * `fetcher` - 文档获取引擎
    /// * `store` - 报告仓库
    /// * `validator` - 持久化前使用的校验器
    pub fn new(fetcher: Arc<F>, store: Arc<S>, validator: FilingValidator) -> Self {
        Self {
            fetcher,
            store,
            validator,
        }
    }

    async fn ingest(
        &self,
        cik: &str,
        company_name: Option<&str>,
        reference: &FilingReference,
    ) -> Result<(), TaskError> {
        let raw = self
            .fetcher
            .fetch_filing_document(&reference.accession_number, cik)
            .await?;

        let parsed =
            FilingParser::parse(&raw, cik, company_name).map_err(|source| TaskError::Parse {
                accession_number: reference.accession_number.clone(),
                source,
            })?;
        for warning in &parsed.warnings {
            warn!(accession_number = %reference.accession_number, "{}", warning);
        }

        let mut filing = parsed.filing;
        filing.apply_reference(reference);

        let result = self.validator.validate(&filing);
        if !result.valid {
            return Err(TaskError::ValidationFailed {
                accession_number: reference.accession_number.clone(),
                errors: result.errors,
            });
        }

        let id = self.store.save_filing(&filing).await?;
        counter!("filingrs_filings_saved_total").increment(1);
        info!(
            filing_id = %id,
            accession_number = %filing.accession_number,
            holdings = filing.holdings.len(),
            "Saved filing"
        );
        Ok(())
    }
}

#[async_trait]
impl<F, S> TaskProcessor for SecScrapingProcessor<F, S>
where
    F: FilingFetcher + 'static,
    S: FilingRepository + 'static,
{
    #[instrument(skip_all, fields(task_id = %task.id))]
    async fn process(&self, task: &Task) -> Result<(), TaskError> {
        let payload = SecScrapingPayload::from_task(task)?;
        let cik = payload.cik.trim();

        let index = self.fetcher.fetch_filing_index(cik).await?;
        let limit = payload.limit.unwrap_or(usize::MAX);
        let references: Vec<_> = index
            .references
            .iter()
            .filter(|reference| payload.accepts(reference))
            .take(limit)
            .collect();
        debug!(
            cik,
            form_type = payload.form_type(),
            references = references.len(),
            "Fetched filing index"
        );

        let mut saved = 0usize;
        for reference in references {
            if self
                .store
                .find_id_by_accession_number(&reference.accession_number)
                .await?
                .is_some()
            {
                debug!(accession_number = %reference.accession_number, "Filing already stored");
                continue;
            }
            self.ingest(cik, index.company_name.as_deref(), reference)
                .await?;
            saved += 1;
        }

        info!(cik, saved, "Scraping finished");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sec_scraping"
    }
}
