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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含数据库、SEC 数据源、调度、校验和指标等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// SEC EDGAR 数据源配置
    pub sec: SecSettings,
    /// 调度器配置
    pub scheduler: SchedulerSettings,
    /// 报告校验配置
    pub validation: ValidationSettings,
    /// 指标导出配置
    pub metrics: MetricsSettings,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// SEC EDGAR 数据源配置
#[derive(Debug, Clone, Deserialize)]
pub struct SecSettings {
    /// EDGAR 根地址
    pub base_url: String,
    /// 请求标识，SEC 要求包含联系方式
    pub user_agent: String,
    /// 单次请求超时（秒）
    pub timeout_secs: u64,
    /// 每秒最大请求数
    pub requests_per_second: u32,
    /// 每次读取索引的条目数
    pub index_count: u32,
    /// 信息表文件名
    pub information_table_file: String,
}

/// 调度器配置
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// 调度间隔（秒）
    pub tick_interval_secs: u64,
    /// 维护间隔（秒）
    pub maintenance_interval_secs: u64,
    /// Running 状态超过该时长视为卡住（秒）
    pub stale_task_timeout_secs: u64,
    /// 每次调度并发执行的任务数
    pub concurrency: usize,
    /// 任务默认最大尝试次数
    pub max_attempts: i32,
    /// 首次重试延迟（毫秒）
    pub initial_backoff_ms: u64,
    /// 最大重试延迟（秒）
    pub max_backoff_secs: u64,
    /// 退避倍数
    pub backoff_multiplier: f64,
}

impl SchedulerSettings {
    /// 卡住任务的判定时长，超出可表示范围时取最大值
    pub fn stale_task_timeout(&self) -> chrono::Duration {
        i64::try_from(self.stale_task_timeout_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

/// 报告校验配置
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationSettings {
    pub require_cusip: bool,
    pub require_value: bool,
}

/// 指标导出配置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    /// Prometheus 导出监听地址
    pub listen_addr: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加默认值、配置文件和环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("FILINGRS").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 只包含默认值的配置构建器
    fn builder() -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, ConfigError>
    {
        Config::builder()
            // Default DB pool settings
            .set_default("database.url", "sqlite://filingrs.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Default SEC settings
            .set_default("sec.base_url", "https://www.sec.gov")?
            .set_default("sec.user_agent", "filingrs admin@example.com")?
            .set_default("sec.timeout_secs", 30)?
            .set_default("sec.requests_per_second", 10)?
            .set_default("sec.index_count", 40)?
            .set_default("sec.information_table_file", "infotable.xml")?
            // Default scheduler settings
            .set_default("scheduler.tick_interval_secs", 5)?
            .set_default("scheduler.maintenance_interval_secs", 60)?
            .set_default("scheduler.stale_task_timeout_secs", 900)?
            .set_default("scheduler.concurrency", 4)?
            .set_default("scheduler.max_attempts", 3)?
            .set_default("scheduler.initial_backoff_ms", 1000)?
            .set_default("scheduler.max_backoff_secs", 300)?
            .set_default("scheduler.backoff_multiplier", 2.0)?
            // Default validation settings
            .set_default("validation.require_cusip", true)?
            .set_default("validation.require_value", false)?
            // Default metrics settings
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
