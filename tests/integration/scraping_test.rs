// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{
    document_path, information_table, mount_document, mount_index, spawn_app, CIK, COMPANY_NAME,
};
use filingrs::domain::models::task::{TaskStatus, TaskType};
use filingrs::domain::repositories::filing_repository::FilingRepository;
use filingrs::queue::task_queue::{QueueError, TaskQueue};
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

const ACCESSION: &str = "0000950123-24-011775";

#[tokio::test]
async fn test_scraping_task_stores_filing_end_to_end() {
    let app = spawn_app().await;
    mount_index(&app.server, &[ACCESSION]).await;
    mount_document(
        &app.server,
        ACCESSION,
        information_table(&[
            ("D R HORTON INC", "23331A109", "192267725", "1491600"),
            ("LENNAR CORP", "526057104", "221522186", "7505000"),
        ]),
    )
    .await;

    let id = app
        .queue
        .submit(TaskType::SecScraping, json!({ "cik": CIK }))
        .await
        .unwrap();
    let summary = app.queue.run_eligible_tasks().await.unwrap();
    assert_eq!(summary.completed, 1);

    let task = app.queue.get_task(id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.last_error.is_none());

    let filings = app.filing_repo.find_by_cik(CIK).await.unwrap();
    assert_eq!(filings.len(), 1);
    let filing = &filings[0];
    assert_eq!(filing.accession_number, ACCESSION);
    assert_eq!(filing.company_name.as_deref(), Some(COMPANY_NAME));
    assert_eq!(filing.filing_type.as_deref(), Some("13F-HR"));

    let holdings: Vec<_> = filing
        .holdings
        .iter()
        .map(|h| {
            (
                h.issuer_name.as_deref().unwrap(),
                h.cusip.as_deref().unwrap(),
                h.value.unwrap(),
            )
        })
        .collect();
    assert_eq!(
        holdings,
        vec![
            ("D R HORTON INC", "23331A109", Decimal::from(192_267_725u64)),
            ("LENNAR CORP", "526057104", Decimal::from(221_522_186u64)),
        ]
    );
    assert_eq!(filing.holdings[1].shares, Some(7_505_000));
}

#[tokio::test]
async fn test_rescraping_skips_stored_filings() {
    let app = spawn_app().await;
    mount_index(&app.server, &[ACCESSION]).await;
    Mock::given(method("GET"))
        .and(path(document_path(ACCESSION)))
        .respond_with(ResponseTemplate::new(200).set_body_string(information_table(&[(
            "D R HORTON INC",
            "23331A109",
            "192267725",
            "1491600",
        )])))
        .expect(1)
        .mount(&app.server)
        .await;

    for _ in 0..2 {
        app.queue
            .submit(TaskType::SecScraping, json!({ "cik": CIK }))
            .await
            .unwrap();
        assert_eq!(app.queue.run_eligible_tasks().await.unwrap().completed, 1);
    }

    assert_eq!(app.filing_repo.find_by_cik(CIK).await.unwrap().len(), 1);
    assert!(app
        .filing_repo
        .find_id_by_accession_number(ACCESSION)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_invalid_filing_fails_without_retry() {
    let app = spawn_app().await;
    mount_index(&app.server, &[ACCESSION]).await;
    // no CUSIP, so the holding can never be merged
    mount_document(
        &app.server,
        ACCESSION,
        r#"<informationTable><infoTable><nameOfIssuer>UNKNOWN</nameOfIssuer><value>10</value></infoTable></informationTable>"#
            .to_string(),
    )
    .await;

    let id = app
        .queue
        .submit(TaskType::SecScraping, json!({ "cik": CIK }))
        .await
        .unwrap();
    let summary = app.queue.run_eligible_tasks().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.retried, 0);
    let task = app.queue.get_task(id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.attempt_count, 1);
    assert!(task
        .last_error
        .unwrap()
        .contains("holding 1: CUSIP is missing"));
    assert!(app.filing_repo.find_by_cik(CIK).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_cik_fails_without_retry() {
    let app = spawn_app().await;

    let id = app
        .queue
        .submit(TaskType::SecScraping, json!({ "cik": "" }))
        .await
        .unwrap();
    app.queue.run_eligible_tasks().await.unwrap();

    let task = app.queue.get_task(id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.last_error.unwrap().starts_with("Invalid payload"));
    assert!(app.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unregistered_task_type_is_rejected() {
    let app = spawn_app().await;

    for task_type in [TaskType::DataAnalysis, TaskType::DataExport] {
        let err = app.queue.submit(task_type, json!({})).await.unwrap_err();
        assert!(matches!(err, QueueError::InvalidTaskType(t) if t == task_type));
    }
}
