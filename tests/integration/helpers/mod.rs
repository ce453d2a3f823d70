// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use filingrs::config::settings::{DatabaseSettings, SecSettings};
use filingrs::domain::models::task::TaskType;
use filingrs::domain::services::filing_validator::FilingValidator;
use filingrs::engines::sec_engine::SecEdgarEngine;
use filingrs::infrastructure::database::connection;
use filingrs::infrastructure::repositories::filing_repo_impl::FilingRepositoryImpl;
use filingrs::infrastructure::repositories::task_repo_impl::TaskRepositoryImpl;
use filingrs::queue::registry::ProcessorRegistry;
use filingrs::queue::task_queue::DbTaskQueue;
use filingrs::utils::retry_policy::RetryPolicy;
use filingrs::workers::holding_merge_processor::HoldingMergeProcessor;
use filingrs::workers::sec_scraping_processor::SecScrapingProcessor;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CIK: &str = "0001067983";
pub const COMPANY_NAME: &str = "BERKSHIRE HATHAWAY INC";

#[allow(dead_code)]
pub struct TestApp {
    pub server: MockServer,
    pub task_repo: Arc<TaskRepositoryImpl>,
    pub filing_repo: Arc<FilingRepositoryImpl>,
    pub queue: Arc<DbTaskQueue<TaskRepositoryImpl>>,
}

/// 启动一个连接到模拟 EDGAR 的完整处理链
///
/// 最多尝试 3 次，首次重试延迟 1 秒。
pub async fn spawn_app() -> TestApp {
    let server = MockServer::start().await;

    let db = connection::create_pool(&DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: None,
        min_connections: None,
        connect_timeout: None,
        idle_timeout: None,
    })
    .await
    .expect("Failed to connect to sqlite");
    connection::run_migrations(&db)
        .await
        .expect("Failed to run migrations");
    let db = Arc::new(db);

    let task_repo = Arc::new(TaskRepositoryImpl::new(db.clone()));
    let filing_repo = Arc::new(FilingRepositoryImpl::new(db));
    let engine = Arc::new(
        SecEdgarEngine::new(&SecSettings {
            base_url: server.uri(),
            user_agent: "filingrs-tests ops@example.com".to_string(),
            timeout_secs: 2,
            requests_per_second: 100,
            index_count: 40,
            information_table_file: "infotable.xml".to_string(),
        })
        .expect("Failed to build engine"),
    );

    let mut registry = ProcessorRegistry::new();
    registry
        .register(
            TaskType::SecScraping,
            Arc::new(SecScrapingProcessor::new(
                engine,
                filing_repo.clone(),
                FilingValidator::default(),
            )),
        )
        .unwrap();
    registry
        .register(
            TaskType::HoldingMerge,
            Arc::new(HoldingMergeProcessor::new(filing_repo.clone())),
        )
        .unwrap();

    let policy = RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_secs(1),
        max_backoff: Duration::from_secs(30),
        backoff_multiplier: 2.0,
        ..RetryPolicy::default()
    };
    let queue = Arc::new(DbTaskQueue::new(
        task_repo.clone(),
        Arc::new(registry),
        policy,
        2,
    ));

    TestApp {
        server,
        task_repo,
        filing_repo,
        queue,
    }
}

/// 生成 Atom 格式的申报人索引
pub fn atom_index(accession_numbers: &[&str]) -> String {
    let entries: String = accession_numbers
        .iter()
        .map(|accession| {
            format!(
                r#"
  <entry>
    <category label="form type" scheme="https://www.sec.gov/" term="13F-HR"/>
    <content type="text/xml">
      <accession-number>{accession}</accession-number>
      <filing-date>2024-11-14</filing-date>
      <filing-type>13F-HR</filing-type>
    </content>
  </entry>"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="ISO-8859-1" ?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <company-info>
    <cik>{CIK}</cik>
    <conformed-name>{COMPANY_NAME}</conformed-name>
  </company-info>{entries}
</feed>"#
    )
}

/// 生成信息表文档，每条持仓为 (发行人, CUSIP, 市值, 股数)
pub fn information_table(holdings: &[(&str, &str, &str, &str)]) -> String {
    let records: String = holdings
        .iter()
        .map(|(issuer, cusip, value, shares)| {
            format!(
                r#"
  <infoTable>
    <nameOfIssuer>{issuer}</nameOfIssuer>
    <titleOfClass>COM</titleOfClass>
    <cusip>{cusip}</cusip>
    <value>{value}</value>
    <shrsOrPrnAmt>
      <sshPrnamt>{shares}</sshPrnamt>
      <sshPrnamtType>SH</sshPrnamtType>
    </shrsOrPrnAmt>
    <investmentDiscretion>DFND</investmentDiscretion>
  </infoTable>"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<informationTable xmlns="http://www.sec.gov/edgar/document/thirteenf/informationtable">{records}
</informationTable>"#
    )
}

pub fn document_path(accession_number: &str) -> String {
    format!(
        "/Archives/edgar/data/{}/{}/infotable.xml",
        CIK.trim_start_matches('0'),
        accession_number.replace('-', "")
    )
}

pub async fn mount_index(server: &MockServer, accession_numbers: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/cgi-bin/browse-edgar"))
        .and(query_param("CIK", CIK))
        .respond_with(ResponseTemplate::new(200).set_body_string(atom_index(accession_numbers)))
        .mount(server)
        .await;
}

pub async fn mount_document(server: &MockServer, accession_number: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(document_path(accession_number)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}
