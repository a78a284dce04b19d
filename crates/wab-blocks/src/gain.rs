use wab_abi::{InitContext, LinearMemory, MemPtr, ModuleFactory, Processor, QUANTUM_FRAMES};

pub const GAIN_ID: &str = "wab.gain";
pub const GAIN_PARAM: u32 = 0;

const MANIFEST: &str = r#"{"name":"wab.gain","kind":"effect","params":[{"id":0,"name":"gain","default":1.0}]}"#;

/// Per-channel gain, parameter [`GAIN_PARAM`].
pub struct GainModule;

impl ModuleFactory for GainModule {
    fn id(&self) -> &str {
        GAIN_ID
    }

    fn manifest(&self) -> Option<&str> {
        Some(MANIFEST)
    }

    fn memory_bytes(&self) -> usize {
        1 << 16
    }

    fn create(&self, instance_type: u32) -> Option<Box<dyn Processor>> {
        (instance_type == 0).then(|| Box::new(Gain { gain: 1.0 }) as Box<dyn Processor>)
    }
}

struct Gain {
    gain: f32,
}

impl Processor for Gain {
    fn init(&mut self, _memory: &mut LinearMemory, _context: &InitContext<'_>) -> bool {
        true
    }

    fn process(&mut self, memory: &mut LinearMemory, inputs: &[MemPtr], outputs: &[MemPtr]) {
        for (&input, &output) in inputs.iter().zip(outputs) {
            if let Ok((source, target)) = memory.io_pair(input, output, QUANTUM_FRAMES) {
                for (out, sample) in target.iter_mut().zip(source) {
                    *out = *sample * self.gain;
                }
            }
        }
    }

    fn set_param(&mut self, key: u32, value: f64) {
        if key == GAIN_PARAM {
            self.gain = value as f32;
        }
    }
}
