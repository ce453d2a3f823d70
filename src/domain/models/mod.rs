// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 报告（filing）：13F 持仓报告、持仓、索引引用及合并结果
/// - 任务（task）：由队列调度、可重试的工作单元
pub mod filing;
pub mod task;
