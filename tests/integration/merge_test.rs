// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{information_table, mount_document, mount_index, spawn_app, CIK};
use filingrs::domain::models::filing::{MergedHoldingQuery, MergedHoldingSort, SortDirection};
use filingrs::domain::models::task::{TaskStatus, TaskType};
use filingrs::domain::repositories::filing_repository::FilingRepository;
use filingrs::queue::task_queue::TaskQueue;
use rust_decimal::Decimal;
use serde_json::json;

const FIRST: &str = "0000950123-24-005000";
const SECOND: &str = "0000950123-24-008000";

#[tokio::test]
async fn test_holdings_merge_across_scraped_filings() {
    let app = spawn_app().await;
    mount_index(&app.server, &[SECOND, FIRST]).await;
    mount_document(
        &app.server,
        FIRST,
        information_table(&[
            ("D R HORTON INC", "23331A109", "1,000", "100"),
            ("LENNAR CORP", "526057104", "500", "50"),
        ]),
    )
    .await;
    mount_document(
        &app.server,
        SECOND,
        information_table(&[("D R HORTON INC", "23331A109", "2,000", "200")]),
    )
    .await;

    app.queue
        .submit(TaskType::SecScraping, json!({ "cik": CIK }))
        .await
        .unwrap();
    assert_eq!(app.queue.run_eligible_tasks().await.unwrap().completed, 1);

    let merged = app
        .filing_repo
        .query_merged_holdings(&MergedHoldingQuery {
            cik: Some(CIK.to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(merged.len(), 2);
    let horton = &merged[0];
    assert_eq!(horton.cusip, "23331A109");
    assert_eq!(horton.total_value, Decimal::from(3_000u64));
    assert_eq!(horton.total_shares, 300);
    assert_eq!(horton.filing_count, 2);
    let mut accessions = horton.accession_numbers.clone();
    accessions.sort();
    assert_eq!(accessions, vec![FIRST, SECOND]);

    let by_cusip = app
        .filing_repo
        .query_merged_holdings(&MergedHoldingQuery {
            sort_by: MergedHoldingSort::Cusip,
            direction: SortDirection::Asc,
            limit: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_cusip.len(), 1);
    assert_eq!(by_cusip[0].cusip, "23331A109");

    // the merge can also run as a queued task
    let id = app
        .queue
        .submit(
            TaskType::HoldingMerge,
            json!({ "cik": CIK, "min_value": "1000", "search": "horton" }),
        )
        .await
        .unwrap();
    app.queue.run_eligible_tasks().await.unwrap();
    let task = app.queue.get_task(id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
}
