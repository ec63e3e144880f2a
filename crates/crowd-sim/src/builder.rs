//! Simulator construction.

use crowd_core::{CrowdResult, SimulationConfig};

use crate::sim::Simulator;

/// Builds a [`Simulator`] from a [`SimulationConfig`].
///
/// Construction can fail under the `parallel` feature (the dedicated Rayon
/// pool); `Simulator::new()` stays infallible for the default setup.
#[derive(Default)]
pub struct SimulatorBuilder {
    config: SimulationConfig,
}

impl SimulatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> CrowdResult<Simulator> {
        Simulator::from_config(self.config)
    }
}
