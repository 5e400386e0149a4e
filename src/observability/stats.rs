//! Read-only aggregation of gateway and registry state.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::modules::{ModuleRegistry, Summary};
use crate::security::{RejectionCounts, SecurityGateway};

#[derive(Debug, Clone, Serialize)]
pub struct GatewayStats {
    pub rate_limiting_enabled: bool,
    pub csrf_protection_enabled: bool,
    pub tracked_clients: usize,
    pub tracked_requests: usize,
    pub active_csrf_tokens: usize,
    pub requests_total: u64,
    pub rejected: RejectionCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct KernelStats {
    pub uptime_secs: u64,
    pub gateway: GatewayStats,
    pub modules: Summary,
}

#[derive(Debug, Clone)]
pub struct StatsReporter {
    gateway: Arc<SecurityGateway>,
    registry: Arc<ModuleRegistry>,
    started_at: Instant,
}

impl StatsReporter {
    pub fn new(gateway: Arc<SecurityGateway>, registry: Arc<ModuleRegistry>) -> Self {
        Self {
            gateway,
            registry,
            started_at: Instant::now(),
        }
    }

    pub fn gateway_stats(&self) -> GatewayStats {
        let policy = self.gateway.policy();
        let limiter = self.gateway.rate_limiter();
        GatewayStats {
            rate_limiting_enabled: policy.config.enable_rate_limiting,
            csrf_protection_enabled: policy.config.enable_csrf_protection,
            tracked_clients: limiter.tracked_clients(),
            tracked_requests: limiter.tracked_requests(),
            active_csrf_tokens: self.gateway.csrf_store().len(),
            requests_total: self.gateway.counters().requests(),
            rejected: self.gateway.counters().rejections(),
        }
    }

    pub fn snapshot(&self) -> KernelStats {
        KernelStats {
            uptime_secs: self.started_at.elapsed().as_secs(),
            gateway: self.gateway_stats(),
            modules: self.registry.summary(),
        }
    }
}
