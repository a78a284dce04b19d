use std::ops::{Index, IndexMut};

use crate::config::QUANTUM_FRAMES;

/// Host-side samples of one bus for one render quantum.
///
/// Channel-major storage, one `Vec<f32>` per channel, allocated up front so
/// the render thread only ever copies into it.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    frames: usize,
}

impl AudioBuffer {
    /// Creates a silent buffer with the provided number of channels and frames.
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            channels: (0..channels).map(|_| vec![0.0; frames]).collect(),
            frames,
        }
    }

    /// Creates a silent buffer holding exactly one quantum per channel.
    pub fn quantum(channels: usize) -> Self {
        Self::new(channels, QUANTUM_FRAMES)
    }

    /// One quantum buffer per bus, in bus order.
    pub fn for_buses(channel_counts: &[usize]) -> Vec<AudioBuffer> {
        channel_counts
            .iter()
            .map(|&channels| Self::quantum(channels))
            .collect()
    }

    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        self.channels.get_mut(index).map(Vec::as_mut_slice)
    }

    /// Clears the contents of the buffer back to silence.
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    pub fn channel_slices(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    pub fn channel_slices_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.channels.iter_mut().map(Vec::as_mut_slice)
    }

    pub fn is_silent(&self) -> bool {
        self.channel_slices()
            .all(|channel| channel.iter().all(|sample| *sample == 0.0))
    }
}

impl Index<usize> for AudioBuffer {
    type Output = [f32];

    fn index(&self, index: usize) -> &Self::Output {
        self.channels[index].as_slice()
    }
}

impl IndexMut<usize> for AudioBuffer {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        self.channels[index].as_mut_slice()
    }
}
