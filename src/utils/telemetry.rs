// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 安装全局 tracing 订阅器
///
/// 过滤规则取自 `RUST_LOG`；`FILINGRS_LOG_FORMAT=json` 时输出 JSON 行。
pub fn init_telemetry() {
    let json = std::env::var("FILINGRS_LOG_FORMAT").is_ok_and(|format| format == "json");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,filingrs=debug".into()),
        )
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .init();
}
