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

use crate::domain::models::filing::FilingIndex;
use crate::domain::services::filing_parser::ParseError;
use async_trait::async_trait;
use thiserror::Error;

/// 抓取错误类型
#[derive(Error, Debug)]
pub enum FetchError {
    /// 远端返回非 200 状态码
    #[error("Unexpected status {status_code} from {url}")]
    Status { status_code: u16, url: String },
    /// 请求超时
    #[error("Request timed out: {0}")]
    Timeout(String),
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 无法构造请求地址
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// 索引文档无法解析
    #[error("Invalid filing index: {0}")]
    InvalidIndex(#[from] ParseError),
}

impl FetchError {
    /// 判断错误是否可重试
    ///
    /// # 返回值
    ///
    /// 如果错误是可重试的则返回true，否则返回false
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { .. } | FetchError::Timeout(_) | FetchError::InvalidIndex(_) => {
                true
            }
            FetchError::RequestFailed(e) => !e.is_builder(),
            FetchError::InvalidUrl(_) => false,
        }
    }
}

/// 报告抓取特质
///
/// 每次调用都是一次独立的出站请求，不做内部重试；重试由任务队列负责。
#[async_trait]
pub trait FilingFetcher: Send + Sync {
    /// 获取申报人的报告索引
    ///
    /// # 参数
    ///
    /// * `cik` - 申报人 CIK
    ///
    /// # 返回值
    ///
    /// * `Ok(FilingIndex)` - 公司名称及按索引顺序排列的报告引用
    /// * `Err(FetchError)` - 请求或索引解析失败
    async fn fetch_filing_index(&self, cik: &str) -> Result<FilingIndex, FetchError>;

    /// 获取单份报告的原始信息表文档
    async fn fetch_filing_document(
        &self,
        accession_number: &str,
        cik: &str,
    ) -> Result<String, FetchError>;

    /// 引擎名称
    fn name(&self) -> &'static str;
}
