// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 包含核心业务实体（models）、仓库接口（repositories）
/// 以及无 I/O 的领域服务（services）
pub mod models;
pub mod repositories;
pub mod services;
