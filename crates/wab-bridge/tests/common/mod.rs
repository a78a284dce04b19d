#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use wab_abi::{InitContext, LinearMemory, MemPtr, ModuleFactory, Processor, QUANTUM_FRAMES};
use wab_bridge::{
    AudioBuffer, BridgeConfig, BusTopology, ControlProxy, HostState, ModuleRegistry,
    ModuleSource, RenderingHost,
};

pub const IDENTITY: &str = "test.identity";
pub const HALF: &str = "test.half";
pub const RECORDER: &str = "test.recorder";
pub const GATED: &str = "test.gated";
pub const FAILING: &str = "test.failing";

pub const IDENTITY_MANIFEST: &str = r#"{"name":"identity","params":[]}"#;

/// Factory over a closure creating instance type 0.
pub struct TestFactory<F> {
    id: &'static str,
    manifest: Option<&'static str>,
    make: F,
}

impl<F> ModuleFactory for TestFactory<F>
where
    F: Fn() -> Box<dyn Processor> + Send + Sync,
{
    fn id(&self) -> &str {
        self.id
    }

    fn manifest(&self) -> Option<&str> {
        self.manifest
    }

    fn memory_bytes(&self) -> usize {
        1 << 16
    }

    fn create(&self, instance_type: u32) -> Option<Box<dyn Processor>> {
        (instance_type == 0).then(|| (self.make)())
    }
}

pub fn factory<F>(id: &'static str, make: F) -> TestFactory<F>
where
    F: Fn() -> Box<dyn Processor> + Send + Sync,
{
    TestFactory {
        id,
        manifest: None,
        make,
    }
}

/// Multiplies every input channel into the output channel at the same index.
pub struct Scale(pub f32);

impl Processor for Scale {
    fn init(&mut self, _memory: &mut LinearMemory, context: &InitContext<'_>) -> bool {
        context.quantum_frames == QUANTUM_FRAMES
    }

    fn process(&mut self, memory: &mut LinearMemory, inputs: &[MemPtr], outputs: &[MemPtr]) {
        for (&input, &output) in inputs.iter().zip(outputs) {
            if let Ok((source, target)) = memory.io_pair(input, output, QUANTUM_FRAMES) {
                for (out, sample) in target.iter_mut().zip(source) {
                    *out = *sample * self.0;
                }
            }
        }
    }
}

/// Straight copy, bit for bit.
pub struct Identity;

impl Processor for Identity {
    fn init(&mut self, _memory: &mut LinearMemory, _context: &InitContext<'_>) -> bool {
        true
    }

    fn process(&mut self, memory: &mut LinearMemory, inputs: &[MemPtr], outputs: &[MemPtr]) {
        for (&input, &output) in inputs.iter().zip(outputs) {
            if let Ok((source, target)) = memory.io_pair(input, output, QUANTUM_FRAMES) {
                target.copy_from_slice(source);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Param(u32, f64),
    Binary {
        verb: String,
        prop: u32,
        data: Vec<u8>,
        live_allocations: usize,
    },
}

/// Records every parameter and binary message it receives.
pub struct Recorder(pub Arc<Mutex<Vec<Event>>>);

impl Processor for Recorder {
    fn init(&mut self, _memory: &mut LinearMemory, _context: &InitContext<'_>) -> bool {
        true
    }

    fn process(&mut self, _memory: &mut LinearMemory, _inputs: &[MemPtr], _outputs: &[MemPtr]) {}

    fn set_param(&mut self, key: u32, value: f64) {
        self.0.lock().push(Event::Param(key, value));
    }

    fn on_message(
        &mut self,
        memory: &mut LinearMemory,
        verb: &str,
        prop: u32,
        ptr: MemPtr,
        len: usize,
    ) {
        let data = memory.bytes(ptr, len).map(<[u8]>::to_vec).unwrap_or_default();
        self.0.lock().push(Event::Binary {
            verb: verb.to_owned(),
            prop,
            data,
            live_allocations: memory.live_allocations(),
        });
    }
}

/// Identity whose `init` blocks until the gate receives a value or closes.
pub struct Gated(pub Receiver<()>);

impl Processor for Gated {
    fn init(&mut self, _memory: &mut LinearMemory, _context: &InitContext<'_>) -> bool {
        let _ = self.0.recv();
        true
    }

    fn process(&mut self, memory: &mut LinearMemory, inputs: &[MemPtr], outputs: &[MemPtr]) {
        Identity.process(memory, inputs, outputs);
    }
}

pub struct FailingInit;

impl Processor for FailingInit {
    fn init(&mut self, _memory: &mut LinearMemory, _context: &InitContext<'_>) -> bool {
        false
    }

    fn process(&mut self, _memory: &mut LinearMemory, _inputs: &[MemPtr], _outputs: &[MemPtr]) {}
}

pub struct Fixture {
    pub events: Arc<Mutex<Vec<Event>>>,
    pub gate: crossbeam_channel::Sender<()>,
    pub registry: Arc<ModuleRegistry>,
}

/// A registry holding every test module.
pub fn fixture() -> Fixture {
    let events = Arc::new(Mutex::new(Vec::new()));
    let (gate, gate_rx) = crossbeam_channel::unbounded();
    let recorded = Arc::clone(&events);
    let registry = ModuleRegistry::new()
        .with_module(TestFactory {
            id: IDENTITY,
            manifest: Some(IDENTITY_MANIFEST),
            make: || Box::new(Identity) as Box<dyn Processor>,
        })
        .with_module(factory(HALF, || Box::new(Scale(0.5)) as Box<dyn Processor>))
        .with_module(factory(RECORDER, move || {
            Box::new(Recorder(Arc::clone(&recorded))) as Box<dyn Processor>
        }))
        .with_module(factory(GATED, move || {
            Box::new(Gated(gate_rx.clone())) as Box<dyn Processor>
        }))
        .with_module(factory(FAILING, || Box::new(FailingInit) as Box<dyn Processor>));
    Fixture {
        events,
        gate,
        registry: Arc::new(registry),
    }
}

pub fn code(module: &str) -> String {
    ModuleSource::registered(module)
        .to_code()
        .expect("module source serialises")
}

pub fn node(config: &BridgeConfig, registry: &Arc<ModuleRegistry>) -> (ControlProxy, RenderingHost) {
    wab_bridge::node(config, Arc::clone(registry)).expect("node")
}

/// Polls `host` until it leaves [`HostState::Loading`].
pub fn settle(host: &mut RenderingHost) -> HostState {
    for _ in 0..5_000 {
        host.poll();
        if host.state() != HostState::Loading {
            return host.state();
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("module load did not finish");
}

/// Drives a [`RenderingHost`] from its own thread, like an audio callback.
pub struct RenderThread {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<RenderingHost>,
}

impl RenderThread {
    pub fn spawn(mut host: RenderingHost, topology: &BusTopology) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let inputs = AudioBuffer::for_buses(topology.inputs());
        let mut outputs = AudioBuffer::for_buses(topology.outputs());
        let handle = thread::spawn(move || {
            while !flag.load(Ordering::Acquire) {
                host.render(&inputs, &mut outputs);
                thread::sleep(Duration::from_micros(500));
            }
            host
        });
        Self { stop, handle }
    }

    pub fn stop(self) -> RenderingHost {
        self.stop.store(true, Ordering::Release);
        self.handle.join().expect("render thread")
    }
}
