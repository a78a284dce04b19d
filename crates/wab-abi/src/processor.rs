use crate::memory::{LinearMemory, MemPtr};

/// Values handed to [`Processor::init`] once, before any processing.
#[derive(Debug, Clone, Copy)]
pub struct InitContext<'a> {
    pub quantum_frames: usize,
    pub sample_rate: f32,
    pub descriptor: &'a str,
}

/// The computation unit living inside a foreign module.
///
/// All sample data is exchanged through the module's [`LinearMemory`]: the
/// host passes one [`MemPtr`] per channel, flattened bus-then-channel, each
/// pointing at `quantum_frames` samples.
pub trait Processor: Send {
    /// Returns `false` to refuse the configuration.
    fn init(&mut self, memory: &mut LinearMemory, context: &InitContext<'_>) -> bool;

    fn process(&mut self, memory: &mut LinearMemory, inputs: &[MemPtr], outputs: &[MemPtr]);

    fn set_param(&mut self, _key: u32, _value: f64) {}

    /// Receives a binary payload copied into scratch memory at `ptr`. The
    /// scratch region is freed by the host as soon as this returns.
    fn on_message(
        &mut self,
        _memory: &mut LinearMemory,
        _verb: &str,
        _prop: u32,
        _ptr: MemPtr,
        _len: usize,
    ) {
    }
}
