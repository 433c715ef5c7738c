//! Transport-agnostic control surface for starting and stopping monitoring
//!
//! Mirrors a `GET /api/start-monitor?total_monitoring_time=<secs>` endpoint:
//! responses carry an HTTP-style status and a machine-readable reason on
//! rejection.

use serde::Serialize;
use std::num::IntErrorKind;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::monitoring::{Monitor, MonitorSession};
use crate::shared::errors::MonitorError;

pub const MONITORING_TIME_PARAM: &str = "total_monitoring_time";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InvalidMonitoringTime,
    AlreadyRunning,
    NotRunning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlResponse {
    pub status: u16,
    pub accepted: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
}

impl ControlResponse {
    fn accepted(message: &str) -> Self {
        Self {
            status: 200,
            accepted: true,
            message: message.to_string(),
            reason: None,
        }
    }

    fn rejected(reason: RejectReason, message: String) -> Self {
        Self {
            status: 400,
            accepted: false,
            message,
            reason: Some(reason),
        }
    }
}

impl From<MonitorError> for ControlResponse {
    fn from(err: MonitorError) -> Self {
        let reason = match err {
            MonitorError::InvalidParameter(_) => RejectReason::InvalidMonitoringTime,
            MonitorError::AlreadyRunning => RejectReason::AlreadyRunning,
        };
        ControlResponse::rejected(reason, err.to_string())
    }
}

/// Response of a start request plus the session it opened, if any
#[derive(Debug)]
pub struct StartOutcome {
    pub response: ControlResponse,
    pub session: Option<MonitorSession>,
}

/// Value of `name` in a `k=v&k2=v2` query string
pub fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query
        .trim_start_matches('?')
        .split('&')
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// A positive whole number of seconds
pub fn parse_monitoring_time(raw: Option<&str>) -> Result<u64, MonitorError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| MonitorError::InvalidParameter(format!("{} is required", MONITORING_TIME_PARAM)))?;

    match raw.parse::<i64>() {
        Ok(secs) if secs > 0 => Ok(secs as u64),
        Ok(secs) => Err(MonitorError::InvalidParameter(format!("{} must be positive, got {}", MONITORING_TIME_PARAM, secs))),
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => Err(
            MonitorError::InvalidParameter(format!("{} is too large: '{}'", MONITORING_TIME_PARAM, raw)),
        ),
        Err(_) => Err(MonitorError::InvalidParameter(format!("{} is not a number: '{}'", MONITORING_TIME_PARAM, raw))),
    }
}

pub struct ControlSurface {
    monitor: Arc<Monitor>,
}

impl ControlSurface {
    pub fn new(monitor: Arc<Monitor>) -> Self {
        Self { monitor }
    }

    pub fn monitor(&self) -> &Arc<Monitor> {
        &self.monitor
    }

    /// Handle the raw query string of a start request
    pub async fn start_from_query(&self, query: &str) -> StartOutcome {
        self.start_monitor(query_param(query, MONITORING_TIME_PARAM)).await
    }

    pub async fn start_monitor(&self, total_monitoring_time: Option<&str>) -> StartOutcome {
        let started = match parse_monitoring_time(total_monitoring_time) {
            Ok(secs) => self.monitor.start(secs).await,
            Err(e) => Err(e),
        };

        match started {
            Ok(session) => {
                info!("Start request accepted");
                StartOutcome {
                    response: ControlResponse::accepted("Monitoring started"),
                    session: Some(session),
                }
            }
            Err(e) => {
                warn!("Start request rejected: {}", e);
                StartOutcome {
                    response: e.into(),
                    session: None,
                }
            }
        }
    }

    pub async fn stop_monitor(&self) -> ControlResponse {
        if self.monitor.stop().await {
            ControlResponse::accepted("Monitoring stopped")
        } else {
            ControlResponse::rejected(RejectReason::NotRunning, "Monitoring is not running".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::allocation::Optimizer;
    use crate::domain::monitoring::{MonitorConfig, PoolDataSource};
    use crate::infrastructure::DryRunAction;
    use crate::shared::errors::DataSourceError;
    use crate::shared::types::{CapitalSnapshot, PoolSnapshot};
    use async_trait::async_trait;
    use serde_json::json;

    struct StaticSource;

    #[async_trait]
    impl PoolDataSource for StaticSource {
        async fn read_pool_snapshot(&self) -> Result<PoolSnapshot, DataSourceError> {
            Ok(PoolSnapshot::new(json!({ "4pool": 1 })))
        }

        async fn read_balances(&self) -> Result<CapitalSnapshot, DataSourceError> {
            Ok(CapitalSnapshot::from_pairs([("4pool", 1.0)]))
        }
    }

    fn surface() -> ControlSurface {
        let monitor = Monitor::new(
            MonitorConfig::default(),
            Arc::new(Optimizer::default()),
            Arc::new(StaticSource),
            Arc::new(DryRunAction::new(0.0)),
        );
        ControlSurface::new(Arc::new(monitor))
    }

    #[test]
    fn test_query_param() {
        assert_eq!(query_param("?total_monitoring_time=10&x=1", MONITORING_TIME_PARAM), Some("10"));
        assert_eq!(query_param("x=1", MONITORING_TIME_PARAM), None);
        assert_eq!(query_param("total_monitoring_time", MONITORING_TIME_PARAM), Some(""));
    }

    #[test]
    fn test_parse_monitoring_time() {
        assert_eq!(parse_monitoring_time(Some("10")), Ok(10));
        assert_eq!(parse_monitoring_time(Some(" 60 ")), Ok(60));
        for bad in [None, Some(""), Some("0"), Some("-5"), Some("ten"), Some("1.5")] {
            assert!(
                matches!(parse_monitoring_time(bad), Err(MonitorError::InvalidParameter(_))),
                "{:?} accepted",
                bad
            );
        }
    }

    #[test]
    fn test_parse_monitoring_time_reports_overflow() {
        let err = parse_monitoring_time(Some("99999999999999999999")).unwrap_err();
        assert!(err.to_string().contains("too large"), "{}", err);
        let err = parse_monitoring_time(Some("abc")).unwrap_err();
        assert!(err.to_string().contains("not a number"), "{}", err);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_duration_is_rejected() {
        let surface = surface();
        let outcome = surface.start_from_query("total_monitoring_time=9223372036854775807").await;
        assert_eq!(outcome.response.status, 400);
        assert_eq!(outcome.response.reason, Some(RejectReason::InvalidMonitoringTime));
        assert!(!surface.monitor().is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_rejections_are_machine_readable() {
        let surface = surface();

        let invalid = surface.start_from_query("total_monitoring_time=abc").await;
        assert_eq!(invalid.response.status, 400);
        assert_eq!(invalid.response.reason, Some(RejectReason::InvalidMonitoringTime));
        assert!(invalid.session.is_none());

        let first = surface.start_from_query("total_monitoring_time=10").await;
        assert!(first.response.accepted);
        assert_eq!(first.response.status, 200);

        let second = surface.start_monitor(Some("10")).await;
        assert_eq!(second.response.reason, Some(RejectReason::AlreadyRunning));
        let body = serde_json::to_value(&second.response).unwrap();
        assert_eq!(body["reason"], "already_running");

        assert!(surface.stop_monitor().await.accepted);
        assert!(!surface.monitor().is_running().await);
        first.session.unwrap().wait().await;
        assert_eq!(surface.stop_monitor().await.reason, Some(RejectReason::NotRunning));
    }
}
