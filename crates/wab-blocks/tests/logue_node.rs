use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pretty_assertions::assert_eq;
use wab_blocks::{register_all, LogueKind, LogueNode, GAIN_ID, LOGUE_FILTER_ID, LOGUE_OSC_ID};
use wab_bridge::{
    AudioBuffer, BridgeConfig, HostState, LoadError, ModuleRegistry, ModuleSource, RenderingHost,
};

const DEADLINE: Duration = Duration::from_secs(5);

struct Renderer {
    stop: Arc<AtomicBool>,
    last: Arc<Mutex<Vec<f32>>>,
    handle: JoinHandle<RenderingHost>,
}

impl Renderer {
    fn spawn(mut host: RenderingHost, kind: LogueKind) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let last = Arc::new(Mutex::new(Vec::new()));
        let (flag, sink) = (Arc::clone(&stop), Arc::clone(&last));
        let topology = kind.topology();
        let handle = thread::spawn(move || {
            let inputs = AudioBuffer::for_buses(topology.inputs());
            let mut outputs = AudioBuffer::for_buses(topology.outputs());
            while !flag.load(Ordering::Acquire) {
                host.render(&inputs, &mut outputs);
                *sink.lock().unwrap() = outputs[0][0].to_vec();
                thread::sleep(Duration::from_micros(500));
            }
            host
        });
        Self { stop, last, handle }
    }

    fn last(&self) -> Vec<f32> {
        self.last.lock().unwrap().clone()
    }

    fn stop(self) -> RenderingHost {
        self.stop.store(true, Ordering::Release);
        self.handle.join().expect("render thread")
    }
}

fn registry() -> Arc<ModuleRegistry> {
    let registry = ModuleRegistry::new();
    register_all(&registry);
    Arc::new(registry)
}

fn code(module: &str) -> String {
    ModuleSource::registered(module).to_code().unwrap()
}

async fn wait_for(renderer: &Renderer, predicate: impl Fn(&[f32]) -> bool) -> Vec<f32> {
    tokio::time::timeout(DEADLINE, async {
        loop {
            let last = renderer.last();
            if !last.is_empty() && predicate(&last) {
                return last;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("render output")
}

#[tokio::test]
async fn oscillator_plays_while_gate_is_open() {
    let (mut node, host) =
        LogueNode::new(LogueKind::Oscillator, &BridgeConfig::default(), registry()).unwrap();
    let renderer = Renderer::spawn(host, node.kind());

    tokio::time::timeout(DEADLINE, node.load_code(code(LOGUE_OSC_ID)))
        .await
        .expect("load finished")
        .expect("oscillator loads");
    assert_eq!(node.proxy().remote_state(), HostState::Ready);

    node.set_pitch(60.0).unwrap();
    node.set_shape(0.5).unwrap();
    node.set_gate(true).unwrap();
    let playing = wait_for(&renderer, |out| out.iter().any(|sample| *sample != 0.0)).await;
    assert!(playing.iter().all(|sample| sample.abs() <= 1.0));

    node.set_gate(false).unwrap();
    wait_for(&renderer, |out| out.iter().all(|sample| *sample == 0.0)).await;
    renderer.stop();
}

#[tokio::test]
async fn manifest_describes_loaded_unit() {
    let (mut node, host) =
        LogueNode::new(LogueKind::Oscillator, &BridgeConfig::default(), registry()).unwrap();
    let renderer = Renderer::spawn(host, node.kind());
    node.load_code(code(LOGUE_OSC_ID)).await.unwrap();

    let manifest = tokio::time::timeout(DEADLINE, node.manifest())
        .await
        .expect("manifest reply")
        .unwrap()
        .expect("logue.osc has a manifest");
    assert!(manifest.contains("\"shift_shape\""));
    renderer.stop();
}

#[tokio::test]
async fn uploaded_wave_drives_output() {
    let (mut node, host) =
        LogueNode::new(LogueKind::Oscillator, &BridgeConfig::default(), registry()).unwrap();
    let renderer = Renderer::spawn(host, node.kind());
    node.load_code(code(LOGUE_OSC_ID)).await.unwrap();

    node.load_wave(0, &[0.25; 32]).unwrap();
    node.set_gate(true).unwrap();
    let out = wait_for(&renderer, |out| out.iter().all(|sample| *sample != 0.0)).await;
    let first = out[0];
    assert!(out.iter().all(|sample| (*sample - first).abs() < 1e-6));
    renderer.stop();
}

#[tokio::test]
async fn highest_wave_slot_drives_output() {
    let (mut node, host) =
        LogueNode::new(LogueKind::Oscillator, &BridgeConfig::default(), registry()).unwrap();
    let renderer = Renderer::spawn(host, node.kind());
    node.load_code(code(LOGUE_OSC_ID)).await.unwrap();

    node.load_wave(u16::MAX, &[-0.5; 16]).unwrap();
    node.set_gate(true).unwrap();
    let out = wait_for(&renderer, |out| out.iter().all(|sample| *sample < 0.0)).await;
    assert!(out.iter().all(|sample| (*sample - out[0]).abs() < 1e-6));
    renderer.stop();
}

#[tokio::test]
async fn effect_needs_effect_instance_type() {
    let (mut node, host) =
        LogueNode::new(LogueKind::Effect, &BridgeConfig::default(), registry()).unwrap();
    let renderer = Renderer::spawn(host, node.kind());

    let err = node.load_code(code(GAIN_ID)).await.unwrap_err();
    assert!(matches!(err, LoadError::Rejected { .. }));

    tokio::time::timeout(DEADLINE, node.load_code(code(LOGUE_FILTER_ID)))
        .await
        .expect("load finished")
        .expect("filter loads as effect");
    node.set_cutoff(0.5).unwrap();
    node.set_resonance(0.2).unwrap();

    let host = renderer.stop();
    let loaded = host.module().expect("module");
    assert_eq!(loaded.module.id(), LOGUE_FILTER_ID);
    assert_eq!(loaded.bridge.input_handles().len(), 2);
    assert_eq!(loaded.bridge.output_handles().len(), 1);
}
