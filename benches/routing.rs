use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use gantt_rs_renderer::layout::routing::{Rect, route_dependency};

/// Staggered cascade layout: one bar per row, each shifted right, the
/// shape real schedules produce.
fn cascade(rows: usize) -> Vec<Rect> {
    (0..rows)
        .map(|row| {
            let x_min = row as f32 * 24.0;
            let y_center = (row as f32 + 0.5) * 28.0;
            Rect::new(x_min, x_min + 90.0, y_center - 8.0, y_center + 8.0)
        })
        .collect()
}

/// Interleaved layout where the straight corridors are blocked, forcing
/// the detour and grid tiers.
fn congested(rows: usize) -> Vec<Rect> {
    (0..rows)
        .map(|row| {
            let x_min = if row % 2 == 0 { 0.0 } else { 40.0 };
            let y_center = (row as f32 + 0.5) * 28.0;
            Rect::new(x_min, x_min + 400.0, y_center - 8.0, y_center + 8.0)
        })
        .collect()
}

fn bench_route(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_dependency");

    for rows in [10usize, 40, 120] {
        let rects = cascade(rows);
        group.bench_with_input(BenchmarkId::new("cascade", rows), &rects, |b, rects| {
            b.iter(|| {
                let route =
                    route_dependency(rects[0], rects[rects.len() - 1], black_box(rects));
                black_box(route)
            })
        });
    }

    for rows in [10usize, 40] {
        let rects = congested(rows);
        group.bench_with_input(BenchmarkId::new("congested", rows), &rects, |b, rects| {
            b.iter(|| {
                let route =
                    route_dependency(rects[1], rects[rects.len() - 2], black_box(rects));
                black_box(route)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_route);
criterion_main!(benches);
