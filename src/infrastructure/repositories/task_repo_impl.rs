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

use crate::domain::models::task::{Task, TaskStatus};
use crate::domain::repositories::task_repository::{RepositoryError, TaskRepository};
use crate::infrastructure::database::entities::task as task_entity;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// 任务仓库实现
///
/// 基于SeaORM实现的任务数据访问层
#[derive(Clone)]
pub struct TaskRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl TaskRepositoryImpl {
    /// 创建新的任务仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

const STALE_CLAIM_ERROR: &str = "claim expired before the task finished";

/// 在 `now` 时刻可被认领的条件
fn eligible_at(now: DateTime<FixedOffset>) -> Condition {
    Condition::any()
        .add(task_entity::Column::Status.eq(TaskStatus::Pending.to_string()))
        .add(
            Condition::all()
                .add(task_entity::Column::Status.eq(TaskStatus::Retry.to_string()))
                .add(
                    Condition::any()
                        .add(task_entity::Column::NextRunAt.is_null())
                        .add(task_entity::Column::NextRunAt.lte(now)),
                ),
        )
}

impl TryFrom<task_entity::Model> for Task {
    type Error = RepositoryError;

    fn try_from(model: task_entity::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            task_type: model
                .task_type
                .parse()
                .map_err(|e| RepositoryError::Corrupt(format!("task {}: {}", model.id, e)))?,
            status: model
                .status
                .parse()
                .map_err(|e| RepositoryError::Corrupt(format!("task {}: {}", model.id, e)))?,
            payload: model.payload,
            attempt_count: model.attempt_count,
            max_attempts: model.max_attempts,
            next_run_at: model.next_run_at,
            last_error: model.last_error,
            created_at: model.created_at,
            updated_at: model.updated_at,
            started_at: model.started_at,
            completed_at: model.completed_at,
            claim_token: model.claim_token,
        })
    }
}

impl From<&Task> for task_entity::ActiveModel {
    fn from(task: &Task) -> Self {
        Self {
            id: Set(task.id),
            task_type: Set(task.task_type.to_string()),
            status: Set(task.status.to_string()),
            payload: Set(task.payload.clone()),
            attempt_count: Set(task.attempt_count),
            max_attempts: Set(task.max_attempts),
            next_run_at: Set(task.next_run_at),
            last_error: Set(task.last_error.clone()),
            started_at: Set(task.started_at),
            completed_at: Set(task.completed_at),
            // 离开 Running 即释放认领
            claim_token: Set(if task.status == TaskStatus::Running {
                task.claim_token
            } else {
                None
            }),
            created_at: Set(task.created_at),
            updated_at: Set(task.updated_at),
        }
    }
}

fn into_tasks(models: Vec<task_entity::Model>) -> Result<Vec<Task>, RepositoryError> {
    models.into_iter().map(Task::try_from).collect()
}

#[async_trait]
impl TaskRepository for TaskRepositoryImpl {
    async fn create(&self, task: &Task) -> Result<Task, RepositoryError> {
        let model: task_entity::ActiveModel = task.into();
        model.insert(self.db.as_ref()).await?.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, RepositoryError> {
        task_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .map(Task::try_from)
            .transpose()
    }

    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, RepositoryError> {
        let models = task_entity::Entity::find()
            .filter(task_entity::Column::Status.eq(status.to_string()))
            .order_by_asc(task_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        into_tasks(models)
    }

    async fn find_eligible(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<Task>, RepositoryError> {
        let models = task_entity::Entity::find()
            .filter(eligible_at(now.into()))
            .order_by_asc(task_entity::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;
        into_tasks(models)
    }

    async fn claim(&self, id: Uuid, now: DateTime<Utc>) -> Result<Option<Task>, RepositoryError> {
        let now: DateTime<FixedOffset> = now.into();

        // 条件更新：只有仍处于可执行状态的任务会被修改
        let result = task_entity::Entity::update_many()
            .col_expr(
                task_entity::Column::Status,
                Expr::value(TaskStatus::Running.to_string()),
            )
            .col_expr(
                task_entity::Column::StartedAt,
                Expr::value::<Option<DateTime<FixedOffset>>>(Some(now)),
            )
            .col_expr(
                task_entity::Column::ClaimToken,
                Expr::value::<Option<Uuid>>(Some(Uuid::new_v4())),
            )
            .col_expr(task_entity::Column::UpdatedAt, Expr::value(now))
            .filter(task_entity::Column::Id.eq(id))
            .filter(eligible_at(now))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            debug!(task_id = %id, "Task already claimed or not eligible");
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    async fn update(&self, task: &Task) -> Result<Task, RepositoryError> {
        let model: task_entity::ActiveModel = task.into();
        let token = match task.claim_token {
            Some(token) => task_entity::Column::ClaimToken.eq(token),
            None => task_entity::Column::ClaimToken.is_null(),
        };

        // 只有仍持有本次认领的执行可以写回
        let result = task_entity::Entity::update_many()
            .set(model)
            .filter(task_entity::Column::Id.eq(task.id))
            .filter(task_entity::Column::Status.eq(TaskStatus::Running.to_string()))
            .filter(token)
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return match self.find_by_id(task.id).await? {
                None => Err(RepositoryError::NotFound),
                Some(current) => {
                    warn!(
                        task_id = %task.id,
                        status = %current.status,
                        "Discarding transition from a lost claim"
                    );
                    Err(RepositoryError::ClaimLost(task.id))
                }
            };
        }

        self.find_by_id(task.id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn reset_stale_tasks(
        &self,
        timeout: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let threshold: DateTime<FixedOffset> = (now - timeout).into();
        let now: DateTime<FixedOffset> = now.into();
        let stale = Condition::all()
            .add(task_entity::Column::Status.eq(TaskStatus::Running.to_string()))
            .add(task_entity::Column::StartedAt.lte(threshold));
        let last_attempt = Expr::col(task_entity::Column::MaxAttempts).sub(1);

        // 回收计为一次失败；用尽尝试次数的任务直接进入 Failed
        let txn = self.db.begin().await?;
        let failed = task_entity::Entity::update_many()
            .col_expr(
                task_entity::Column::Status,
                Expr::value(TaskStatus::Failed.to_string()),
            )
            .col_expr(
                task_entity::Column::AttemptCount,
                Expr::col(task_entity::Column::AttemptCount).add(1),
            )
            .col_expr(
                task_entity::Column::NextRunAt,
                Expr::value::<Option<DateTime<FixedOffset>>>(None),
            )
            .col_expr(
                task_entity::Column::CompletedAt,
                Expr::value::<Option<DateTime<FixedOffset>>>(Some(now)),
            )
            .col_expr(
                task_entity::Column::LastError,
                Expr::value::<Option<String>>(Some(STALE_CLAIM_ERROR.to_string())),
            )
            .col_expr(
                task_entity::Column::ClaimToken,
                Expr::value::<Option<Uuid>>(None),
            )
            .col_expr(task_entity::Column::UpdatedAt, Expr::value(now))
            .filter(stale.clone())
            .filter(Expr::col(task_entity::Column::AttemptCount).gte(last_attempt.clone()))
            .exec(&txn)
            .await?;

        let retried = task_entity::Entity::update_many()
            .col_expr(
                task_entity::Column::Status,
                Expr::value(TaskStatus::Retry.to_string()),
            )
            .col_expr(
                task_entity::Column::AttemptCount,
                Expr::col(task_entity::Column::AttemptCount).add(1),
            )
            .col_expr(
                task_entity::Column::NextRunAt,
                Expr::value::<Option<DateTime<FixedOffset>>>(Some(now)),
            )
            .col_expr(
                task_entity::Column::LastError,
                Expr::value::<Option<String>>(Some(STALE_CLAIM_ERROR.to_string())),
            )
            .col_expr(
                task_entity::Column::ClaimToken,
                Expr::value::<Option<Uuid>>(None),
            )
            .col_expr(task_entity::Column::UpdatedAt, Expr::value(now))
            .filter(stale)
            .filter(Expr::col(task_entity::Column::AttemptCount).lt(last_attempt))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        if failed.rows_affected > 0 {
            warn!(
                failed = failed.rows_affected,
                "Stale tasks exhausted their attempts"
            );
        }
        Ok(failed.rows_affected + retried.rows_affected)
    }
}
