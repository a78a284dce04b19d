//! Copies host audio into and out of a foreign module's linear memory.

use wab_abi::{LinearMemory, MemPtr, MemoryError};

use crate::audio::AudioBuffer;
use crate::config::{BusTopology, QUANTUM_FRAMES};

const SAMPLE_BYTES: usize = std::mem::size_of::<f32>();

/// Fixed set of quantum-sized foreign buffers, one per channel.
///
/// Handles are stored flat in bus-then-channel order, inputs and outputs in
/// separate sets. That order is the index the foreign `process` call sees.
#[derive(Debug)]
pub struct BufferBridge {
    topology: BusTopology,
    inputs: Vec<MemPtr>,
    outputs: Vec<MemPtr>,
}

impl BufferBridge {
    /// Allocates every buffer the topology needs. On failure the buffers
    /// allocated so far are released again.
    pub fn init(topology: &BusTopology, memory: &mut LinearMemory) -> Result<Self, MemoryError> {
        let mut inputs = Vec::with_capacity(topology.input_channels());
        let mut outputs = Vec::with_capacity(topology.output_channels());
        let allocated = allocate_buses(memory, topology.inputs(), &mut inputs)
            .and_then(|()| allocate_buses(memory, topology.outputs(), &mut outputs));

        if let Err(err) = allocated {
            for ptr in inputs.into_iter().chain(outputs) {
                let _ = memory.free(ptr);
            }
            return Err(err);
        }

        Ok(Self {
            topology: topology.clone(),
            inputs,
            outputs,
        })
    }

    pub fn topology(&self) -> &BusTopology {
        &self.topology
    }

    pub fn input_handles(&self) -> &[MemPtr] {
        &self.inputs
    }

    pub fn output_handles(&self) -> &[MemPtr] {
        &self.outputs
    }

    pub fn buffer_count(&self) -> usize {
        self.inputs.len() + self.outputs.len()
    }

    /// Host inputs → foreign buffers. A bus or channel the host did not
    /// supply is written as silence.
    pub fn push(&self, memory: &mut LinearMemory, inputs: &[AudioBuffer]) {
        let mut handles = self.inputs.iter();
        for (bus, &channels) in self.topology.inputs().iter().enumerate() {
            let source = inputs.get(bus);
            for channel in 0..channels {
                let Some(&handle) = handles.next() else {
                    return;
                };
                let Ok(target) = memory.f32s_mut(handle, QUANTUM_FRAMES) else {
                    continue;
                };
                match source.and_then(|buffer| buffer.channel(channel)) {
                    Some(samples) => {
                        debug_assert_eq!(samples.len(), QUANTUM_FRAMES, "input quantum length");
                        if samples.len() == QUANTUM_FRAMES {
                            target.copy_from_slice(samples);
                        }
                    }
                    None => target.fill(0.0),
                }
            }
        }
    }

    /// Foreign buffers → host outputs.
    pub fn pull(&self, memory: &LinearMemory, outputs: &mut [AudioBuffer]) {
        let mut handles = self.outputs.iter();
        for (bus, &channels) in self.topology.outputs().iter().enumerate() {
            let mut target = outputs.get_mut(bus);
            for channel in 0..channels {
                let Some(&handle) = handles.next() else {
                    return;
                };
                let Some(samples) = target.as_mut().and_then(|buffer| buffer.channel_mut(channel))
                else {
                    continue;
                };
                let Ok(source) = memory.f32s(handle, QUANTUM_FRAMES) else {
                    continue;
                };
                debug_assert_eq!(samples.len(), QUANTUM_FRAMES, "output quantum length");
                if samples.len() == QUANTUM_FRAMES {
                    samples.copy_from_slice(source);
                }
            }
        }
    }
}

fn allocate_buses(
    memory: &mut LinearMemory,
    buses: &[usize],
    handles: &mut Vec<MemPtr>,
) -> Result<(), MemoryError> {
    for &channels in buses {
        for _ in 0..channels {
            handles.push(memory.allocate(QUANTUM_FRAMES * SAMPLE_BYTES)?);
        }
    }
    Ok(())
}
