//! # Codec Benchmarks
//!
//! | Path | What is measured |
//! |------|------------------|
//! | `Packet::encode` / `Packet::decode` | header plus payload, by payload size |
//! | `ModuleProxy::receive_frame` | class discovery of a module until ready |
//! | `ModuleProxy::receive_frame` | data frames into a ready component |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hub_runtime::test_utils::{SimObject, SimulatedModule};
use onb_protocol::{Header, ModuleEvent, ModuleProxy, Packet, ValueType};
use rand::Rng;
use std::time::Duration;

// ============================================================================
// PACKET CODEC
// ============================================================================

fn bench_packet_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet-codec");
    group.measurement_time(Duration::from_secs(5));

    let mut rng = rand::thread_rng();
    for size in [0usize, 16, 256, 4096] {
        let payload: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
        let packet = Packet::new(Header::data(3, 42), payload);
        let frame = packet.encode();

        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &packet, |b, packet| {
            b.iter(|| black_box(packet.encode()))
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &frame, |b, frame| {
            b.iter(|| black_box(Packet::decode(frame).is_ok()))
        });
    }

    group.finish();
}

// ============================================================================
// MODULE DISCOVERY
// ============================================================================

fn simulated_module(classes: u32) -> SimulatedModule {
    (0..classes).fold(SimulatedModule::new(), |sim, class| {
        let objects = (0..8u8)
            .map(|oid| {
                if oid % 2 == 0 {
                    SimObject::output(oid, &format!("out{oid}"), ValueType::Int).with_rmip(50)
                } else {
                    SimObject::input(oid, &format!("in{oid}"), ValueType::Double)
                }
            })
            .collect();
        sim.with_class(0x100 + class, &format!("Class{class}"), objects)
    })
}

fn bench_class_discovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("module-discovery");

    for classes in [1u32, 8, 32] {
        let frames = simulated_module(classes).class_frames();
        group.throughput(Throughput::Elements(u64::from(classes)));
        group.bench_with_input(BenchmarkId::new("classes", classes), &frames, |b, frames| {
            b.iter(|| {
                let mut module = ModuleProxy::new("BenchMod");
                let mut ready = false;
                for frame in frames {
                    let events = module.receive_frame(frame).unwrap_or_default();
                    ready |= events.iter().any(|e| matches!(e, ModuleEvent::Ready));
                }
                black_box(ready)
            })
        });
    }

    group.finish();
}

fn bench_data_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("data-frames");

    let sim = simulated_module(1);
    let mut module = ModuleProxy::new("BenchMod");
    for frame in sim.class_frames() {
        let _ = module.receive_frame(&frame);
    }
    let _ = module.receive_frame(&SimulatedModule::hello());
    module.assign_component_id(1);
    for frame in sim.component_frames(1, "Class0", "Bench1") {
        let _ = module.receive_frame(&frame);
    }
    let _ = module.sink().drain();

    let mut rng = rand::thread_rng();
    let frames: Vec<Vec<u8>> = (0..1000)
        .map(|_| SimulatedModule::data(1, 0, &rng.gen::<i32>().to_le_bytes()))
        .collect();

    group.throughput(Throughput::Elements(frames.len() as u64));
    group.bench_function("int_updates", |b| {
        b.iter(|| {
            for frame in &frames {
                black_box(module.receive_frame(frame).map(|e| e.len()).unwrap_or(0));
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_packet_codec,
    bench_class_discovery,
    bench_data_frames
);
criterion_main!(benches);
