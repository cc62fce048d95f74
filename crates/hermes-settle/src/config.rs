//! Settler configuration.

use std::time::Duration;

use hermes_econ::Threshold;
use hermes_types::HermesId;

/// Static configuration the settler is constructed with.
#[derive(Debug, Clone)]
pub struct SettlerConfig {
    /// The hermes operator this settler reconciles channels against.
    pub hermes_address: HermesId,
    /// Fraction of available balance that must be unsettled before a
    /// provider is settled.
    pub threshold: Threshold,
    /// How long to wait for an on-chain `PromiseSettled` confirmation
    /// before giving up on a settlement attempt.
    pub max_wait_for_settlement: Duration,
}

impl SettlerConfig {
    /// Build a config, validating the threshold.
    pub fn new(
        hermes_address: HermesId,
        threshold: f64,
        max_wait_for_settlement: Duration,
    ) -> Result<Self, hermes_econ::ThresholdError> {
        Ok(Self {
            hermes_address,
            threshold: Threshold::new(threshold)?,
            max_wait_for_settlement,
        })
    }
}
