// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 提供处理器注册表、任务队列和调度功能
/// 负责任务的认领、执行、重试和周期性驱动
pub mod registry;
pub mod scheduler;
pub mod task_queue;
