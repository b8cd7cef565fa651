//! Benchmark tests for split-player-core operations
//!
//! Run with: cargo bench -p split-player-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use split_player_core::{
    format_time, BackendRegistry, NativeState, PlayerConfig, ReadinessBarrier, SimulatedBackend,
    SplitPlayer, VideoDescriptor,
};

// ============================================================================
// Helpers
// ============================================================================

fn ready_player(videos: usize) -> (SplitPlayer, SimulatedBackend) {
    let backend = (0..videos).fold(SimulatedBackend::new(), |backend, i| {
        backend.with_duration(format!("video-{}", i), 30.0 + i as f64 * 10.0)
    });
    let mut registry = BackendRegistry::new();
    registry.register(backend.clone());

    let config = PlayerConfig::new(
        "simulated",
        (0..videos)
            .map(|i| VideoDescriptor::new(format!("video-{}", i), i as f64))
            .collect(),
    )
    .with_max_videos(videos);

    let mut player = SplitPlayer::new(config, &registry).unwrap();
    tokio_test::block_on(player.load_dependencies()).unwrap();
    player.process_pending();
    (player, backend)
}

// ============================================================================
// Transport Benchmarks
// ============================================================================

fn bench_transport(c: &mut Criterion) {
    let mut group = c.benchmark_group("Transport");

    for videos in [1, 4, 16] {
        group.bench_with_input(
            BenchmarkId::new("play_pause_cycle", videos),
            &videos,
            |b, &videos| {
                let (mut player, backend) = ready_player(videos);
                b.iter(|| {
                    black_box(player.play());
                    black_box(player.pause());
                    backend.log().clear();
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("time_to", videos), &videos, |b, &videos| {
            let (mut player, backend) = ready_player(videos);
            b.iter(|| {
                player.time_to(black_box(12.5));
                backend.log().clear();
            });
        });
    }

    group.finish();
}

fn bench_event_handling(c: &mut Criterion) {
    let mut group = c.benchmark_group("Event Handling");

    group.bench_function("buffering_round_trip", |b| {
        let (mut player, backend) = ready_player(4);
        player.play();
        b.iter(|| {
            backend.emit_native("video-1", NativeState::Buffering).unwrap();
            backend.emit_native("video-2", NativeState::Playing).unwrap();
            black_box(player.process_pending());
            backend.log().clear();
        });
    });

    group.finish();
}

// ============================================================================
// Barrier and Formatting Benchmarks
// ============================================================================

fn bench_barrier(c: &mut Criterion) {
    c.bench_function("barrier_fill_64", |b| {
        b.iter(|| {
            let mut barrier = ReadinessBarrier::new();
            for _ in 0..64 {
                barrier.register();
            }
            for _ in 0..64 {
                black_box(barrier.mark_ready());
            }
            barrier.is_satisfied()
        });
    });
}

fn bench_format_time(c: &mut Criterion) {
    c.bench_function("format_time", |b| {
        b.iter(|| format_time(black_box(3725.4)));
    });
}

criterion_group!(transport_benches, bench_transport, bench_event_handling);

criterion_group!(support_benches, bench_barrier, bench_format_time);

criterion_main!(transport_benches, support_benches);
