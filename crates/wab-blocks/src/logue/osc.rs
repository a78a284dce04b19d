use std::f32::consts::TAU;

use wab_abi::{InitContext, LinearMemory, MemPtr, ModuleFactory, Processor};

use super::{
    accepts_descriptor, soft_clip, LogueKind, LowPass, PARAM_CUTOFF, PARAM_GATE, PARAM_PITCH, PARAM_RESONANCE, PARAM_SHAPE,
    PARAM_SHIFT_SHAPE, WAVE_SLOT_BASE,
};

pub const LOGUE_OSC_ID: &str = "logue.osc";

const LEVEL_PARAM: u32 = 0;
const MAX_WAVE_SAMPLES: usize = 4096;

const MANIFEST: &str = r#"{
  "name": "logue.osc",
  "kind": "oscillator",
  "params": [
    { "id": 0, "name": "level", "default": 1.0 },
    { "id": 6, "name": "shape", "default": 0.0 },
    { "id": 7, "name": "shift_shape", "default": 0.0 },
    { "id": 100, "name": "gate", "default": 0.0 },
    { "id": 101, "name": "pitch", "default": 69.0 },
    { "id": 102, "name": "cutoff", "default": 1.0 },
    { "id": 103, "name": "resonance", "default": 0.0 }
  ],
  "inputs": [{ "name": "shape_lfo", "channels": 1 }],
  "outputs": [{ "name": "out", "channels": 1 }]
}"#;

/// Phase-distortion sine oscillator with an optional user waveform.
pub struct LogueOscModule;

impl ModuleFactory for LogueOscModule {
    fn id(&self) -> &str {
        LOGUE_OSC_ID
    }

    fn manifest(&self) -> Option<&str> {
        Some(MANIFEST)
    }

    fn create(&self, instance_type: u32) -> Option<Box<dyn Processor>> {
        (instance_type == 0).then(|| Box::new(LogueOsc::default()) as Box<dyn Processor>)
    }
}

struct LogueOsc {
    sample_rate: f32,
    quantum: usize,
    note: f32,
    phase: f32,
    drive: f32,
    dist: f32,
    level: f32,
    lfoz: f32,
    gate: bool,
    reset: bool,
    cutoff: f32,
    resonance: f32,
    filter: LowPass,
    wave: Option<Vec<f32>>,
}

impl Default for LogueOsc {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            quantum: wab_abi::QUANTUM_FRAMES,
            note: 69.0,
            phase: 0.0,
            drive: 1.0,
            dist: 0.0,
            level: 1.0,
            lfoz: 0.0,
            gate: false,
            reset: false,
            cutoff: 1.0,
            resonance: 0.0,
            filter: LowPass::new(),
            wave: None,
        }
    }
}

impl LogueOsc {
    fn phase_increment(&self) -> f32 {
        let frequency = 440.0 * 2.0_f32.powf((self.note - 69.0) / 12.0);
        (frequency / self.sample_rate).min(0.5)
    }

    #[inline]
    fn waveform(&self, phase: f32) -> f32 {
        match &self.wave {
            Some(table) => {
                let position = phase * table.len() as f32;
                let index = position as usize % table.len();
                let next = (index + 1) % table.len();
                let frac = position - position.floor();
                table[index] + (table[next] - table[index]) * frac
            }
            None => (TAU * phase).sin(),
        }
    }

    fn update_filter(&mut self) {
        self.filter
            .configure(self.sample_rate, self.cutoff, self.resonance);
    }
}

impl Processor for LogueOsc {
    fn init(&mut self, _memory: &mut LinearMemory, context: &InitContext<'_>) -> bool {
        if context.sample_rate <= 0.0
            || context.quantum_frames == 0
            || !accepts_descriptor(context.descriptor, LogueKind::Oscillator)
        {
            return false;
        }
        self.sample_rate = context.sample_rate;
        self.quantum = context.quantum_frames;
        self.update_filter();
        true
    }

    fn process(&mut self, memory: &mut LinearMemory, inputs: &[MemPtr], outputs: &[MemPtr]) {
        let frames = self.quantum;
        let lfo = inputs
            .first()
            .and_then(|&ptr| memory.f32s(ptr, 1).ok())
            .map_or(0.0, |samples| samples[0]);

        for &extra in outputs.iter().skip(1) {
            if let Ok(target) = memory.f32s_mut(extra, frames) {
                target.fill(0.0);
            }
        }
        let Some(&output) = outputs.first() else {
            return;
        };
        let Ok(target) = memory.f32s_mut(output, frames) else {
            return;
        };
        if !self.gate {
            target.fill(0.0);
            return;
        }

        if std::mem::take(&mut self.reset) {
            self.phase = 0.0;
            self.lfoz = lfo;
            self.filter.reset();
        }
        let w0 = self.phase_increment();
        let lfo_inc = (lfo - self.lfoz) / frames as f32;
        let mut phase = self.phase;
        let mut lfoz = self.lfoz;

        for sample in target.iter_mut() {
            let dist_mod = self.dist + lfoz * self.dist;
            let p = (phase + dist_mod * dist_mod * (TAU * phase).sin()).rem_euclid(1.0);
            let signal = soft_clip(self.drive * self.waveform(p));
            *sample = self.filter.process(signal) * self.level;

            phase += w0;
            phase -= phase.floor();
            lfoz += lfo_inc;
        }

        self.phase = phase;
        self.lfoz = lfoz;
    }

    fn set_param(&mut self, key: u32, value: f64) {
        let value = value as f32;
        match key {
            LEVEL_PARAM => self.level = value.clamp(0.0, 1.0),
            PARAM_SHAPE => self.dist = 0.3 * value.clamp(0.0, 1.0),
            PARAM_SHIFT_SHAPE => self.drive = 1.0 + value.clamp(0.0, 1.0),
            PARAM_GATE => {
                let gate = value > 0.5;
                self.reset |= gate && !self.gate;
                self.gate = gate;
            }
            PARAM_PITCH => self.note = value.clamp(0.0, 127.0),
            PARAM_CUTOFF => {
                self.cutoff = value;
                self.update_filter();
            }
            PARAM_RESONANCE => {
                self.resonance = value;
                self.update_filter();
            }
            _ => {}
        }
    }

    /// Slots from [`WAVE_SLOT_BASE`] carry little-endian `f32` waveforms. The
    /// latest one replaces the sine.
    fn on_message(
        &mut self,
        memory: &mut LinearMemory,
        verb: &str,
        prop: u32,
        ptr: MemPtr,
        len: usize,
    ) {
        if verb != "set" || prop < WAVE_SLOT_BASE {
            tracing::debug!(verb, prop, "logue.osc ignored message");
            return;
        }
        let Ok(bytes) = memory.bytes(ptr, len) else {
            return;
        };
        let table: Vec<f32> = bytes
            .chunks_exact(4)
            .take(MAX_WAVE_SAMPLES)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        if table.is_empty() {
            self.wave = None;
        } else {
            self.wave = Some(table);
        }
    }
}
