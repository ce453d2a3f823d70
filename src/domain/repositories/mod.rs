// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层的仓库接口，遵循依赖倒置原则。
/// 具体实现由基础设施层提供。
///
/// 包含的仓库接口：
/// - 报告仓库（filing_repository）：报告与持仓的幂等存储及合并查询
/// - 任务仓库（task_repository）：任务的调度状态持久化
pub mod filing_repository;
pub mod task_repository;
