use wab_abi::{InitContext, LinearMemory, MemPtr, ModuleFactory, Processor, QUANTUM_FRAMES};

pub const PASSTHROUGH_ID: &str = "wab.passthrough";

/// Copies input channel `n` to output channel `n`. Outputs without a
/// matching input are silent.
pub struct PassthroughModule;

impl ModuleFactory for PassthroughModule {
    fn id(&self) -> &str {
        PASSTHROUGH_ID
    }

    fn memory_bytes(&self) -> usize {
        1 << 16
    }

    fn create(&self, instance_type: u32) -> Option<Box<dyn Processor>> {
        (instance_type == 0).then(|| Box::new(Passthrough) as Box<dyn Processor>)
    }
}

struct Passthrough;

impl Processor for Passthrough {
    fn init(&mut self, _memory: &mut LinearMemory, _context: &InitContext<'_>) -> bool {
        true
    }

    fn process(&mut self, memory: &mut LinearMemory, inputs: &[MemPtr], outputs: &[MemPtr]) {
        for (index, &output) in outputs.iter().enumerate() {
            match inputs.get(index) {
                Some(&input) => {
                    if let Ok((source, target)) = memory.io_pair(input, output, QUANTUM_FRAMES) {
                        target.copy_from_slice(source);
                    }
                }
                None => {
                    if let Ok(target) = memory.f32s_mut(output, QUANTUM_FRAMES) {
                        target.fill(0.0);
                    }
                }
            }
        }
    }
}
