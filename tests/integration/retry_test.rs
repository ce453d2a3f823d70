// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{document_path, information_table, mount_index, spawn_app, CIK};
use chrono::Utc;
use filingrs::domain::models::task::{TaskStatus, TaskType};
use filingrs::domain::repositories::filing_repository::FilingRepository;
use filingrs::queue::task_queue::TaskQueue;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

const ACCESSION: &str = "0000950123-24-011775";

#[tokio::test]
async fn test_unavailable_host_retries_with_growing_delay_then_fails() {
    let app = spawn_app().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&app.server)
        .await;

    let id = app
        .queue
        .submit(TaskType::SecScraping, json!({ "cik": CIK }))
        .await
        .unwrap();

    let mut now = Utc::now();
    let mut statuses = Vec::new();
    let mut run_times = Vec::new();
    for _ in 0..3 {
        app.queue.run_eligible_tasks_at(now).await.unwrap();
        let task = app.queue.get_task(id).await.unwrap().unwrap();
        statuses.push(task.status);
        assert!(task.last_error.as_deref().unwrap().contains("503"));
        if let Some(next_run_at) = task.next_run_at {
            let next_run_at = next_run_at.with_timezone(&Utc);
            run_times.push(next_run_at);
            now = next_run_at;
        }
    }

    assert_eq!(
        statuses,
        vec![TaskStatus::Retry, TaskStatus::Retry, TaskStatus::Failed]
    );
    assert_eq!(run_times.len(), 2);
    assert!(run_times[0] < run_times[1]);

    let task = app.queue.get_task(id).await.unwrap().unwrap();
    assert_eq!(task.attempt_count, 3);
    assert!(task.next_run_at.is_none());

    // terminal, never picked up again
    let later = app
        .queue
        .run_eligible_tasks_at(now + chrono::Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(later.claimed, 0);
}

#[tokio::test]
async fn test_transient_document_failure_recovers_on_retry() {
    let app = spawn_app().await;
    mount_index(&app.server, &[ACCESSION]).await;
    Mock::given(method("GET"))
        .and(path(document_path(ACCESSION)))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path(document_path(ACCESSION)))
        .respond_with(ResponseTemplate::new(200).set_body_string(information_table(&[(
            "LENNAR CORP",
            "526057104",
            "221522186",
            "7505000",
        )])))
        .mount(&app.server)
        .await;

    let id = app
        .queue
        .submit(TaskType::SecScraping, json!({ "cik": CIK }))
        .await
        .unwrap();

    let now = Utc::now();
    assert_eq!(app.queue.run_eligible_tasks_at(now).await.unwrap().retried, 1);
    let task = app.queue.get_task(id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Retry);

    let retry_at = task.next_run_at.unwrap().with_timezone(&Utc);
    assert_eq!(
        app.queue.run_eligible_tasks_at(retry_at).await.unwrap().completed,
        1
    );

    let task = app.queue.get_task(id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.attempt_count, 1);
    assert_eq!(app.filing_repo.find_by_cik(CIK).await.unwrap().len(), 1);
}
