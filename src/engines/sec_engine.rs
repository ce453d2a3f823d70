// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::config::settings::SecSettings;
use crate::domain::models::filing::FilingIndex;
use crate::domain::services::filing_parser::FilingParser;
use crate::engines::traits::{FetchError, FilingFetcher};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// 所有请求携带的 Accept 头
pub const ACCEPT_XML: &str = "application/xml, text/xml, text/plain";

/// 默认索引表单类型
pub const DEFAULT_FORM_TYPE: &str = "13F-HR";

/// SEC EDGAR 抓取引擎
///
/// 共享一个 reqwest 客户端，所有请求都经过同一个限速器。
pub struct SecEdgarEngine {
    client: reqwest::Client,
    base_url: Url,
    form_type: String,
    index_count: u32,
    information_table_file: String,
    rate_limiter: DefaultDirectRateLimiter,
}

impl SecEdgarEngine {
    /// 根据配置创建引擎
    ///
    /// # 参数
    ///
    /// * `settings` - SEC 数据源配置
    ///
    /// # 返回值
    ///
    /// * `Ok(SecEdgarEngine)` - 引擎实例
    /// * `Err(FetchError)` - 根地址或请求标识无效
    pub fn new(settings: &SecSettings) -> Result<Self, FetchError> {
        let base_url = Url::parse(settings.base_url.trim_end_matches('/'))
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", settings.base_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_XML));

        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        let per_second = NonZeroU32::new(settings.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            base_url,
            form_type: DEFAULT_FORM_TYPE.to_string(),
            index_count: settings.index_count,
            information_table_file: settings.information_table_file.clone(),
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    /// 指定索引查询的表单类型
    pub fn with_form_type(mut self, form_type: impl Into<String>) -> Self {
        self.form_type = form_type.into();
        self
    }

    /// 申报人索引地址
    pub fn index_url(&self, cik: &str) -> Result<Url, FetchError> {
        let mut url = self.join("cgi-bin/browse-edgar")?;
        url.query_pairs_mut()
            .append_pair("action", "getcompany")
            .append_pair("CIK", cik.trim())
            .append_pair("type", &self.form_type)
            .append_pair("dateb", "")
            .append_pair("owner", "include")
            .append_pair("count", &self.index_count.to_string())
            .append_pair("output", "atom");
        Ok(url)
    }

    /// 报告信息表地址
    ///
    /// 路径中的 CIK 去掉前导零，accession number 去掉连字符。
    pub fn document_url(&self, accession_number: &str, cik: &str) -> Result<Url, FetchError> {
        let cik = cik.trim().trim_start_matches('0');
        let accession: String = accession_number
            .trim()
            .chars()
            .filter(|c| *c != '-')
            .collect();
        if cik.is_empty() || accession.is_empty() {
            return Err(FetchError::InvalidUrl(format!(
                "cannot build document path for cik '{}' accession '{}'",
                cik, accession_number
            )));
        }
        self.join(&format!(
            "Archives/edgar/data/{}/{}/{}",
            cik, accession, self.information_table_file
        ))
    }

    fn join(&self, path: &str) -> Result<Url, FetchError> {
        let base = format!("{}/", self.base_url.as_str().trim_end_matches('/'));
        Url::parse(&base)
            .and_then(|base| base.join(path))
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", path, e)))
    }

    async fn get_text(&self, url: Url, kind: &'static str) -> Result<String, FetchError> {
        self.rate_limiter.until_ready().await;

        let start = Instant::now();
        let result = self.send(url.clone()).await;
        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("filingrs_fetch_requests_total", "kind" => kind, "outcome" => outcome)
            .increment(1);

        match &result {
            Ok(body) => debug!(
                url = %url,
                bytes = body.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Fetched document"
            ),
            Err(e) => warn!(url = %url, error = %e, "Fetch failed"),
        }
        result
    }

    async fn send(&self, url: Url) -> Result<String, FetchError> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::RequestFailed(e)
            }
        })?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status {
                status_code: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::RequestFailed(e)
            }
        })
    }
}

#[async_trait]
impl FilingFetcher for SecEdgarEngine {
    async fn fetch_filing_index(&self, cik: &str) -> Result<FilingIndex, FetchError> {
        let url = self.index_url(cik)?;
        let body = self.get_text(url, "index").await?;
        let index = FilingParser::parse_filing_index(&body)?;
        debug!(cik, references = index.references.len(), "Parsed filing index");
        Ok(index)
    }

    async fn fetch_filing_document(
        &self,
        accession_number: &str,
        cik: &str,
    ) -> Result<String, FetchError> {
        let url = self.document_url(accession_number, cik)?;
        self.get_text(url, "document").await
    }

    fn name(&self) -> &'static str {
        "sec_edgar"
    }
}

#[cfg(test)]
#[path = "sec_engine_test.rs"]
mod tests;
