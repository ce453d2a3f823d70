// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::MetricsSettings;
use metrics::describe_counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::{AddrParseError, SocketAddr};
use thiserror::Error;
use tracing::info;

/// 指标初始化错误
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Invalid metrics address: {0}")]
    InvalidAddress(#[from] AddrParseError),
    #[error("Failed to install Prometheus recorder: {0}")]
    Install(#[from] BuildError),
}

/// 初始化指标系统
///
/// 未启用时不安装导出器，指标宏调用为空操作。
pub fn init_metrics(settings: &MetricsSettings) -> Result<(), MetricsError> {
    if !settings.enabled {
        return Ok(());
    }

    let addr: SocketAddr = settings.listen_addr.parse()?;
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(
        "filingrs_tasks_total",
        "Tasks that reached a new state after an execution attempt, by outcome"
    );
    describe_counter!(
        "filingrs_fetch_requests_total",
        "Outbound requests to the filings host, by kind and outcome"
    );
    describe_counter!(
        "filingrs_filings_saved_total",
        "Filings persisted by the scraping processor"
    );

    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_metrics_is_noop() {
        let settings = MetricsSettings {
            enabled: false,
            listen_addr: "not an address".to_string(),
        };
        assert!(init_metrics(&settings).is_ok());
    }

    #[test]
    fn test_invalid_address_is_rejected() {
        let settings = MetricsSettings {
            enabled: true,
            listen_addr: "not an address".to_string(),
        };
        assert!(matches!(
            init_metrics(&settings),
            Err(MetricsError::InvalidAddress(_))
        ));
    }
}
