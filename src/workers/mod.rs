// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 任务处理器特质及内置处理器：
/// - SEC 报告抓取（sec_scraping_processor）
/// - 持仓合并（holding_merge_processor）
/// - 系统维护（maintenance_processor）
pub mod holding_merge_processor;
pub mod maintenance_processor;
pub mod processor;
pub mod sec_scraping_processor;

pub use processor::{TaskError, TaskProcessor};
