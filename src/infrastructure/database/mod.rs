// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 数据库模块
///
/// 提供数据库连接、迁移和实体定义
pub mod connection;
pub mod entities;

/// 已完成迁移的内存 SQLite 数据库，供单元测试使用
#[cfg(test)]
pub(crate) async fn memory_database() -> std::sync::Arc<sea_orm::DatabaseConnection> {
    let settings = crate::config::settings::DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: None,
        min_connections: None,
        connect_timeout: None,
        idle_timeout: None,
    };
    let db = connection::create_pool(&settings)
        .await
        .expect("in-memory database");
    connection::run_migrations(&db)
        .await
        .expect("migrations");
    std::sync::Arc::new(db)
}
