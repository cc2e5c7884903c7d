//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `stakingd_txs_delivered_total{msg_type}` - Transactions applied
//! - `stakingd_txs_failed_total{msg_type}` - Transactions rejected in deliver
//! - `stakingd_blocks_committed_total` - Committed blocks
//! - `stakingd_bonded_validators` - Size of the bonded set after end block

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Transactions applied, by first message type
    pub txs_delivered: IntCounterVec,

    /// Transactions rejected, by first message type
    pub txs_failed: IntCounterVec,

    /// Committed blocks
    pub blocks_committed: IntCounter,

    /// Bonded validators
    pub bonded_validators: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector on a private registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let txs_delivered = IntCounterVec::new(
            Opts::new("stakingd_txs_delivered_total", "Transactions applied"),
            &["msg_type"],
        )?;
        registry.register(Box::new(txs_delivered.clone()))?;

        let txs_failed = IntCounterVec::new(
            Opts::new("stakingd_txs_failed_total", "Transactions rejected in deliver"),
            &["msg_type"],
        )?;
        registry.register(Box::new(txs_failed.clone()))?;

        let blocks_committed =
            IntCounter::new("stakingd_blocks_committed_total", "Committed blocks")?;
        registry.register(Box::new(blocks_committed.clone()))?;

        let bonded_validators = IntGauge::new("stakingd_bonded_validators", "Bonded validators")?;
        registry.register(Box::new(bonded_validators.clone()))?;

        Ok(Self {
            txs_delivered,
            txs_failed,
            blocks_committed,
            bonded_validators,
            registry,
        })
    }

    /// Record a delivered transaction
    pub fn record_tx(&self, msg_type: &str, ok: bool) {
        let counter = if ok {
            &self.txs_delivered
        } else {
            &self.txs_failed
        };
        counter.with_label_values(&[msg_type]).inc();
    }

    /// Prometheus text exposition
    pub fn gather_text(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        // Private registries, so two collectors never collide
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();

        first.record_tx("delegate", true);
        first.record_tx("delegate", false);
        first.blocks_committed.inc();
        assert_eq!(
            first.txs_delivered.with_label_values(&["delegate"]).get(),
            1
        );
        assert_eq!(second.blocks_committed.get(), 0);

        let text = first.gather_text();
        assert!(text.contains("stakingd_txs_failed_total{msg_type=\"delegate\"} 1"));
        assert!(text.contains("stakingd_blocks_committed_total 1"));
    }
}
