use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gantt_rs_renderer::layout::routing::{
    Rect, polyline_intersects_any, route_dependency,
};

const ROW_HEIGHT: f32 = 28.0;
const BAR_HEIGHT: f32 = 16.0;

fn bar(day_start: f32, day_len: f32, row: usize) -> Rect {
    let x_min = day_start * 18.0;
    let y_center = (row as f32 + 0.5) * ROW_HEIGHT;
    Rect::new(
        x_min,
        x_min + day_len * 18.0,
        y_center - BAR_HEIGHT / 2.0,
        y_center + BAR_HEIGHT / 2.0,
    )
}

/// Random staggered bar layout: one bar per row, so bars never overlap,
/// exactly like real chart rows.
fn random_layout(rng: &mut StdRng, rows: usize) -> Vec<Rect> {
    (0..rows)
        .map(|row| {
            let start = rng.random_range(0.0..40.0);
            let len = rng.random_range(1.0..12.0);
            bar(start, len, row)
        })
        .collect()
}

#[test]
fn routes_are_idempotent() {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..20 {
        let rects = random_layout(&mut rng, 10);
        let first = route_dependency(rects[0], rects[9], &rects);
        let second = route_dependency(rects[0], rects[9], &rects);
        assert_eq!(first, second);
    }
}

#[test]
fn accepted_routes_clear_all_bars_under_reduced_clearance() {
    // The router validates candidates against bars inflated by its own
    // clearance; checking with a smaller inflation must therefore pass
    // for every pattern-routed polyline, and grid routes keep at least
    // the rasterized clearance. Interior segments only: the first and
    // last segment legitimately approach the two endpoint bars.
    let mut rng = StdRng::seed_from_u64(99);
    for round in 0..50 {
        let rects = random_layout(&mut rng, 12);
        for (from, to) in [(0usize, 6usize), (2, 11), (5, 1), (10, 3)] {
            let route = route_dependency(rects[from], rects[to], &rects);
            assert!(route.len() >= 2, "round {round}: degenerate route");

            let obstacles: Vec<Rect> = rects
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != from && *idx != to)
                .map(|(_, rect)| *rect)
                .collect();
            let interior = &route[1..route.len() - 1];
            if interior.len() < 2 {
                continue;
            }
            assert!(
                !polyline_intersects_any(interior, &obstacles, 0.0, 0.0),
                "round {round}: route {from}->{to} crosses a bar: {route:?}"
            );
        }
    }
}

#[test]
fn backward_dependency_still_routes() {
    // Successor placed left of and above the predecessor; only the
    // detour or grid tiers can serve this.
    let a = bar(20.0, 6.0, 5);
    let b = bar(2.0, 4.0, 1);
    let rects = vec![a, b, bar(10.0, 8.0, 2), bar(8.0, 6.0, 3), bar(12.0, 5.0, 4)];
    let route = route_dependency(a, b, &rects);
    assert!(route.len() >= 2);
    assert_eq!(route[0].0, a.x_max + 6.0);
    assert_eq!(route[route.len() - 1].0, b.x_min - 6.0);
}

#[test]
fn dense_layout_always_produces_a_route() {
    let mut rng = StdRng::seed_from_u64(2024);
    let rects = random_layout(&mut rng, 40);
    for from in 0..rects.len() {
        let to = (from + 7) % rects.len();
        if from == to {
            continue;
        }
        let route = route_dependency(rects[from], rects[to], &rects);
        assert!(route.len() >= 2, "no route for {from}->{to}");
    }
}
