// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::SchedulerSettings;
use crate::domain::repositories::task_repository::TaskRepository;
use crate::queue::task_queue::TaskQueue;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

/// 任务调度器
///
/// 按固定间隔驱动队列执行可调度任务，并定期把卡在 Running 的任务放回 Retry。
/// 同一时刻最多只有一次调度在执行。
pub struct TaskScheduler<Q, R>
where
    Q: TaskQueue + 'static,
    R: TaskRepository + 'static,
{
    queue: Arc<Q>,
    /// 任务仓库，用于维护
    repository: Arc<R>,
    tick_interval: Duration,
    maintenance_interval: Duration,
    stale_task_timeout: chrono::Duration,
    shutdown: watch::Sender<bool>,
}

impl<Q, R> TaskScheduler<Q, R>
where
    Q: TaskQueue + 'static,
    R: TaskRepository + 'static,
{
    /// 创建新的任务调度器实例
    ///
    /// # 参数
    ///
    /// * `queue` - 任务队列
    /// * `repository` - 任务仓库
    /// * `settings` - 调度配置
    pub fn new(queue: Arc<Q>, repository: Arc<R>, settings: &SchedulerSettings) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            queue,
            repository,
            tick_interval: Duration::from_secs(settings.tick_interval_secs.max(1)),
            maintenance_interval: Duration::from_secs(settings.maintenance_interval_secs.max(1)),
            stale_task_timeout: settings.stale_task_timeout(),
            shutdown,
        }
    }

    /// 启动调度器后台任务
    ///
    /// 调用 [`TaskScheduler::shutdown`] 后，正在进行的调度会执行完毕，
    /// 之后不再开始新的调度。
    ///
    /// # 返回值
    ///
    /// 返回后台任务的句柄
    pub fn start(&self) -> JoinHandle<()> {
        let queue = self.queue.clone();
        let repository = self.repository.clone();
        let stale_task_timeout = self.stale_task_timeout;
        let mut shutdown = self.shutdown.subscribe();

        let mut ticks = interval(self.tick_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut maintenance = interval(self.maintenance_interval);
        maintenance.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            tick_interval = ?self.tick_interval,
            maintenance_interval = ?self.maintenance_interval,
            "Task scheduler started"
        );

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = maintenance.tick() => {
                        match repository.reset_stale_tasks(stale_task_timeout, Utc::now()).await {
                            Ok(0) => {}
                            Ok(count) => warn!(count, "Reset stale running tasks"),
                            Err(e) => error!(error = %e, "Failed to reset stale tasks"),
                        }
                    }
                    _ = ticks.tick() => {
                        if let Err(e) = queue.run_eligible_tasks().await {
                            error!(error = %e, "Scheduling tick failed");
                        }
                    }
                }
            }
            info!("Task scheduler stopped");
        })
    }

    /// 请求调度器停止
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}
