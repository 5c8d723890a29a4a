//! Bridge round-trip benchmark suite.
//!
//! Benchmarks the in-process path at different scales:
//! - Invoke round trips: sequential and concurrent batches
//! - Event dispatch fan-out: 1, 10, 100 subscribers
//!
//! Run with: cargo bench --bench roundtrip
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};
use tokio::runtime::Runtime;

use webview_bridge::protocol::{ClientFrame, Response};
use webview_bridge::transport::channel;
use webview_bridge::{Bridge, EventBus, HostEndpoint, ReadyData};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const BATCH_SIZES: &[usize] = &[1, 10, 50];
const SUBSCRIBER_COUNTS: &[usize] = &[1, 10, 100];

// ============================================================================
// Echo Host
// ============================================================================

/// Answers every invoke with its arguments and acks every emit.
fn spawn_echo_host(mut endpoint: HostEndpoint) {
    let sender = endpoint.sender();

    tokio::spawn(async move {
        if sender.ready(ReadyData::for_window("bench")).is_err() {
            return;
        }

        while let Some(Ok(frame)) = endpoint.recv().await {
            let response = match frame {
                ClientFrame::Invoke(request) => Response::success(request.id, request.args),
                ClientFrame::Emit(request) => Response::success(request.id, Value::Null),
            };

            if sender.respond(response).is_err() {
                break;
            }
        }
    });
}

fn attached_bridge(rt: &Runtime) -> Bridge {
    rt.block_on(async {
        let bridge = Bridge::builder().max_pending(1024).build().expect("build");
        let (transport, endpoint) = channel::pair();
        spawn_echo_host(endpoint);
        bridge.attach(transport).await.expect("attach");
        bridge
    })
}

// ============================================================================
// Benchmark: Invoke Round Trip
// ============================================================================

fn bench_invoke(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let bridge = attached_bridge(&rt);

    let mut group = c.benchmark_group("invoke");

    for &batch in BATCH_SIZES {
        group.bench_with_input(BenchmarkId::new("concurrent", batch), &batch, |b, &batch| {
            b.to_async(&rt).iter(|| {
                let bridge = bridge.clone();
                async move {
                    let calls = (0..batch).map(|i| {
                        let bridge = bridge.clone();
                        tokio::spawn(async move {
                            bridge.invoke_value("echo", json!({ "n": i })).await
                        })
                    });

                    for call in calls.collect::<Vec<_>>() {
                        black_box(call.await.expect("join").expect("invoke"));
                    }
                }
            });
        });
    }

    group.bench_function("emit_ack", |b| {
        b.to_async(&rt)
            .iter(|| async { bridge.emit("tick", 1).await.expect("emit") });
    });

    group.finish();
}

// ============================================================================
// Benchmark: Event Dispatch
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    let payload = json!({ "time": "12:00", "seq": 7 });

    for &count in SUBSCRIBER_COUNTS {
        let bus = EventBus::new();
        let handles: Vec<_> = (0..count)
            .map(|_| {
                bus.subscribe("time", |_, payload| {
                    black_box(payload);
                    Ok(())
                })
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("fan_out", count), &count, |b, _| {
            b.iter(|| black_box(bus.dispatch("time", &payload)));
        });

        for handle in handles {
            handle.unlisten();
        }
    }

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = bench_invoke, bench_dispatch
}

criterion_main!(benches);
