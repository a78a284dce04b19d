use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use wab_abi::QUANTUM_FRAMES;

/// Largest channel count accepted on a single bus.
pub const MAX_CHANNELS_PER_BUS: usize = 32;

/// Channel counts of the input and output buses, fixed for a node's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusTopology {
    inputs: Vec<usize>,
    outputs: Vec<usize>,
}

impl BusTopology {
    pub fn new(inputs: impl Into<Vec<usize>>, outputs: impl Into<Vec<usize>>) -> Self {
        Self {
            inputs: inputs.into(),
            outputs: outputs.into(),
        }
    }

    /// Channel count of each input bus.
    pub fn inputs(&self) -> &[usize] {
        &self.inputs
    }

    /// Channel count of each output bus.
    pub fn outputs(&self) -> &[usize] {
        &self.outputs
    }

    pub fn input_channels(&self) -> usize {
        self.inputs.iter().sum()
    }

    pub fn output_channels(&self) -> usize {
        self.outputs.iter().sum()
    }

    /// Number of foreign buffers a bridge allocates for this topology.
    pub fn buffer_count(&self) -> usize {
        self.input_channels() + self.output_channels()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_buses("input", &self.inputs)?;
        validate_buses("output", &self.outputs)
    }
}

fn validate_buses(side: &'static str, buses: &[usize]) -> Result<(), ConfigError> {
    for (bus, &channels) in buses.iter().enumerate() {
        if channels == 0 || channels > MAX_CHANNELS_PER_BUS {
            return Err(ConfigError::ChannelCount {
                side,
                bus,
                channels,
            });
        }
    }
    Ok(())
}

impl Default for BusTopology {
    fn default() -> Self {
        Self::new([1], [1])
    }
}

/// Construction parameters for a node and its rendering host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub topology: BusTopology,
    pub sample_rate: f32,
    pub descriptor: String,
    pub command_queue_capacity: usize,
    pub response_queue_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            topology: BusTopology::default(),
            sample_rate: 48_000.0,
            descriptor: String::new(),
            command_queue_capacity: 256,
            response_queue_capacity: 64,
        }
    }
}

impl BridgeConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_topology(mut self, topology: BusTopology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_descriptor<S: Into<String>>(mut self, descriptor: S) -> Self {
        self.descriptor = descriptor.into();
        self
    }

    pub fn with_queue_capacities(mut self, commands: usize, responses: usize) -> Self {
        self.command_queue_capacity = commands;
        self.response_queue_capacity = responses;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }
        if self.command_queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("command"));
        }
        if self.response_queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("response"));
        }
        self.topology.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topology_counts_buffers() {
        let topology = BusTopology::new([1, 2], [1]);
        assert_eq!(topology.input_channels(), 3);
        assert_eq!(topology.output_channels(), 1);
        assert_eq!(topology.buffer_count(), 4);
    }

    #[test]
    fn rejects_empty_bus() {
        let config = BridgeConfig::default().with_topology(BusTopology::new([2, 0], [1]));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ChannelCount {
                side: "input",
                bus: 1,
                channels: 0
            })
        ));
    }

    #[test]
    fn output_buses_are_numbered_on_their_own() {
        let config = BridgeConfig::default().with_topology(BusTopology::new([2, 2], [1, 33]));
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ChannelCount {
                side: "output",
                bus: 1,
                channels: 33
            }
        ));
        assert_eq!(err.to_string(), "output bus 1 has 33 channels");
    }

    #[test]
    fn rejects_bad_sample_rate() {
        let config = BridgeConfig::default().with_sample_rate(f32::NAN);
        assert!(matches!(config.validate(), Err(ConfigError::SampleRate(_))));
    }
}
