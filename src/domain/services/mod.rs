// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 无 I/O 的同步转换：
/// - 报告解析（filing_parser）：XML 文档到报告模型的容错解析
/// - 报告校验（filing_validator）：持久化前的结构性业务规则检查
pub mod filing_parser;
pub mod filing_validator;
