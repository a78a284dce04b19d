use std::sync::Arc;
use std::thread;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use wab_blocks::{register_all, LOGUE_OSC_ID, PASSTHROUGH_ID};
use wab_bridge::{
    AudioBuffer, BridgeConfig, BusTopology, Envelope, HostState, ModuleRegistry, ModuleSource,
    RenderingHost,
};

fn loaded_host(topology: BusTopology, module: &str, params: &[(u32, f64)]) -> RenderingHost {
    let registry = ModuleRegistry::new();
    register_all(&registry);
    let config = BridgeConfig::default().with_topology(topology);
    let (proxy, mut host) = wab_bridge::node(&config, Arc::new(registry)).expect("node");
    let code = ModuleSource::registered(module).to_code().expect("source");
    proxy.post(Envelope::create(0, code)).expect("post create");
    while matches!(host.state(), HostState::Uninitialized | HostState::Loading) {
        host.poll();
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(host.state(), HostState::Ready, "module failed to load");
    for &(key, value) in params {
        proxy.set_param(key, value).expect("param");
    }
    host.poll();
    host
}

fn render_quantum(c: &mut Criterion) {
    let mut group = c.benchmark_group("bridge");

    group.bench_function("passthrough_8ch", |b| {
        let topology = BusTopology::new([2, 2, 2, 2], [2, 2, 2, 2]);
        let mut host = loaded_host(topology, PASSTHROUGH_ID, &[]);
        let inputs = AudioBuffer::for_buses(&[2, 2, 2, 2]);
        let mut outputs = AudioBuffer::for_buses(&[2, 2, 2, 2]);
        b.iter(|| host.render(&inputs, &mut outputs));
    });

    group.bench_function("logue_osc_gate_on", |b| {
        let mut host = loaded_host(
            BusTopology::new([1], [1]),
            LOGUE_OSC_ID,
            &[(100, 1.0), (101, 57.0), (6, 0.4), (102, 0.6)],
        );
        let inputs = AudioBuffer::for_buses(&[1]);
        let mut outputs = AudioBuffer::for_buses(&[1]);
        b.iter(|| host.render(&inputs, &mut outputs));
    });

    group.bench_function("silent_before_ready", |b| {
        let (_proxy, mut host) =
            wab_bridge::node(&BridgeConfig::default(), Arc::new(ModuleRegistry::new()))
                .expect("node");
        let inputs = AudioBuffer::for_buses(&[1]);
        let mut outputs = AudioBuffer::for_buses(&[1]);
        b.iter(|| host.render(&inputs, &mut outputs));
    });

    group.finish();
}

criterion_group!(benches, render_quantum);
criterion_main!(benches);
