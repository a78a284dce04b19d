use wab_abi::{InitContext, LinearMemory, MemPtr, ModuleFactory, Processor, QUANTUM_FRAMES};

use super::{accepts_descriptor, LogueKind, LowPass, PARAM_CUTOFF, PARAM_RESONANCE};

pub const LOGUE_FILTER_ID: &str = "logue.filter";

/// Instance type of the effect processor.
const EFFECT_INSTANCE: u32 = 1;

const MANIFEST: &str = r#"{
  "name": "logue.filter",
  "kind": "effect",
  "params": [
    { "id": 102, "name": "cutoff", "default": 1.0 },
    { "id": 103, "name": "resonance", "default": 0.0 }
  ],
  "inputs": [{ "name": "in", "channels": 2 }],
  "outputs": [{ "name": "out", "channels": 1 }]
}"#;

/// Resonant low-pass effect: the two input channels are summed to mono.
pub struct LogueFilterModule;

impl ModuleFactory for LogueFilterModule {
    fn id(&self) -> &str {
        LOGUE_FILTER_ID
    }

    fn manifest(&self) -> Option<&str> {
        Some(MANIFEST)
    }

    fn memory_bytes(&self) -> usize {
        1 << 16
    }

    fn create(&self, instance_type: u32) -> Option<Box<dyn Processor>> {
        (instance_type == EFFECT_INSTANCE)
            .then(|| Box::new(LogueFilter::default()) as Box<dyn Processor>)
    }
}

struct LogueFilter {
    sample_rate: f32,
    cutoff: f32,
    resonance: f32,
    filter: LowPass,
    mix: [f32; QUANTUM_FRAMES],
}

impl Default for LogueFilter {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            cutoff: 1.0,
            resonance: 0.0,
            filter: LowPass::new(),
            mix: [0.0; QUANTUM_FRAMES],
        }
    }
}

impl Processor for LogueFilter {
    fn init(&mut self, _memory: &mut LinearMemory, context: &InitContext<'_>) -> bool {
        if context.quantum_frames != QUANTUM_FRAMES
            || context.sample_rate <= 0.0
            || !accepts_descriptor(context.descriptor, LogueKind::Effect)
        {
            return false;
        }
        self.sample_rate = context.sample_rate;
        self.filter
            .configure(self.sample_rate, self.cutoff, self.resonance);
        true
    }

    fn process(&mut self, memory: &mut LinearMemory, inputs: &[MemPtr], outputs: &[MemPtr]) {
        self.mix.fill(0.0);
        let gain = 1.0 / inputs.len().max(1) as f32;
        for &input in inputs {
            if let Ok(source) = memory.f32s(input, QUANTUM_FRAMES) {
                for (mixed, sample) in self.mix.iter_mut().zip(source) {
                    *mixed += *sample * gain;
                }
            }
        }
        for (index, &output) in outputs.iter().enumerate() {
            let Ok(target) = memory.f32s_mut(output, QUANTUM_FRAMES) else {
                continue;
            };
            if index == 0 {
                for (out, sample) in target.iter_mut().zip(&self.mix) {
                    *out = self.filter.process(*sample);
                }
            } else {
                target.fill(0.0);
            }
        }
    }

    fn set_param(&mut self, key: u32, value: f64) {
        match key {
            PARAM_CUTOFF => self.cutoff = value as f32,
            PARAM_RESONANCE => self.resonance = value as f32,
            _ => return,
        }
        self.filter
            .configure(self.sample_rate, self.cutoff, self.resonance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{quantum_buffers, CONTEXT};

    #[test]
    fn only_effect_instance_type_exists() {
        assert!(LogueFilterModule.create(0).is_none());
        assert!(LogueFilterModule.create(EFFECT_INSTANCE).is_some());
    }

    #[test]
    fn refuses_oscillator_descriptor() {
        let mut memory = LinearMemory::new(1 << 16);
        let mut filter = LogueFilterModule.create(EFFECT_INSTANCE).unwrap();
        let context = InitContext {
            descriptor: "oscillator",
            ..CONTEXT
        };
        assert!(!filter.init(&mut memory, &context));
    }

    #[test]
    fn sums_inputs_to_mono_when_open() {
        let mut memory = LinearMemory::new(1 << 16);
        let (inputs, outputs) = quantum_buffers(&mut memory, 2, 1);
        memory.f32s_mut(inputs[0], QUANTUM_FRAMES).unwrap().fill(1.0);
        memory.f32s_mut(inputs[1], QUANTUM_FRAMES).unwrap().fill(0.5);

        let mut filter = LogueFilterModule.create(EFFECT_INSTANCE).unwrap();
        assert!(filter.init(&mut memory, &CONTEXT));
        filter.process(&mut memory, &inputs, &outputs);
        assert!(memory
            .f32s(outputs[0], QUANTUM_FRAMES)
            .unwrap()
            .iter()
            .all(|sample| *sample == 0.75));
    }

    #[test]
    fn closed_cutoff_attenuates_alternating_signal() {
        let mut memory = LinearMemory::new(1 << 16);
        let (inputs, outputs) = quantum_buffers(&mut memory, 2, 1);
        for &input in &inputs {
            for (index, sample) in memory
                .f32s_mut(input, QUANTUM_FRAMES)
                .unwrap()
                .iter_mut()
                .enumerate()
            {
                *sample = if index % 2 == 0 { 1.0 } else { -1.0 };
            }
        }

        let mut filter = LogueFilterModule.create(EFFECT_INSTANCE).unwrap();
        assert!(filter.init(&mut memory, &CONTEXT));
        filter.set_param(PARAM_CUTOFF, 0.2);
        filter.process(&mut memory, &inputs, &outputs);
        let peak = memory
            .f32s(outputs[0], QUANTUM_FRAMES)
            .unwrap()
            .iter()
            .skip(QUANTUM_FRAMES / 2)
            .fold(0.0_f32, |peak, sample| peak.max(sample.abs()));
        assert!(peak < 0.05, "{peak}");
    }
}
