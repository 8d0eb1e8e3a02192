use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use tracing::debug;

// ── Route anchoring ─────────────────────────────────────────────────
/// Horizontal gap between a bar edge and the connector endpoint.
const ROUTE_X_PAD: f32 = 6.0;
/// Inflation applied to every bar when validating candidate polylines.
const ROUTE_CLEARANCE: f32 = 3.0;

// ── Detour pattern ──────────────────────────────────────────────────
/// Leftward shift applied per blocked probe when picking a detour column.
const DETOUR_STEP_X: f32 = 9.0;
/// Maximum leftward shifts to try.
const DETOUR_MAX_STEPS: u32 = 8;
/// Guard rail: detour columns never pass the layout minimum minus this.
const DETOUR_MARGIN_X: f32 = 18.0;

// ── Routing grid ────────────────────────────────────────────────────
/// Grid cell width in chart pixels.
const GRID_DX: f32 = 6.0;
/// Grid cell height in chart pixels.
const GRID_DY: f32 = 7.0;
/// Inflation applied to bars when rasterizing the obstacle grid.
const GRID_CLEARANCE: f32 = 3.0;
/// Margin added around the layout bounding box before gridding.
const GRID_MARGIN: f32 = 18.0;

// ── A* cost scaling ─────────────────────────────────────────────────
/// Integer cost of one orthogonal step.
const STEP_COST: u32 = 10;
/// Extra cost whenever the path direction changes.
const BEND_PENALTY: u32 = 50;

// ── Smoothing ───────────────────────────────────────────────────────
/// Diagonal cut length at each interior elbow.
const BEVEL: f32 = 4.0;
/// Cross-product tolerance when dropping collinear interior points.
const COLLINEAR_EPS: f32 = 1e-4;

/// Axis-aligned bar rectangle in chart pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

impl Rect {
    pub fn new(x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    fn inflate(self, cx: f32, cy: f32) -> Self {
        Self {
            x_min: self.x_min - cx,
            x_max: self.x_max + cx,
            y_min: self.y_min - cy,
            y_max: self.y_max + cy,
        }
    }

    fn mid_y(self) -> f32 {
        (self.y_min + self.y_max) / 2.0
    }
}

pub type Point = (f32, f32);

/// Deterministic obstacle-avoiding route from a predecessor bar to its
/// successor. Candidates are tried in order — 3-segment pattern, 5-segment
/// detour, grid A*, straight lane — and the first collision-free one wins.
/// Never fails: the final tiers always produce a polyline.
pub fn route_dependency(a: Rect, b: Rect, all: &[Rect]) -> Vec<Point> {
    let start = exit_anchor(a);
    let goal = entry_anchor(b);

    let mut attempts: Vec<Vec<Point>> = Vec::new();
    if b.x_min >= a.x_max + ROUTE_CLEARANCE {
        attempts.push(route_pattern_simple(a, b));
    }
    attempts.push(route_pattern_detour(a, b));

    for candidate in attempts {
        if candidate.first() != Some(&start) || candidate.last() != Some(&goal) {
            continue;
        }
        if !polyline_intersects_any(&candidate, all, ROUTE_CLEARANCE, ROUTE_CLEARANCE) {
            return simplify_polyline(&candidate);
        }
    }

    debug!("pattern routes blocked, falling back to grid search");
    route_grid_astar(a, b, all)
}

fn exit_anchor(rect: Rect) -> Point {
    (rect.x_max + ROUTE_X_PAD, rect.mid_y())
}

fn entry_anchor(rect: Rect) -> Point {
    (rect.x_min - ROUTE_X_PAD, rect.mid_y())
}

/// Three-segment pattern: exit right, vertical jog at the midpoint
/// column, enter left.
fn route_pattern_simple(a: Rect, b: Rect) -> Vec<Point> {
    let start = exit_anchor(a);
    let goal = entry_anchor(b);
    let x_lane = (start.0 + goal.0) / 2.0;
    vec![start, (x_lane, start.1), (x_lane, goal.1), goal]
}

/// Five-segment detour: exit right, vertical, leftward jog to a detour
/// column, vertical, enter left.
fn route_pattern_detour(a: Rect, b: Rect) -> Vec<Point> {
    let start = exit_anchor(a);
    let goal = entry_anchor(b);
    let x_lane = a.x_max + ROUTE_X_PAD * 2.0;
    let x_detour = choose_detour_x(a, b);
    let y_mid = (start.1 + goal.1) / 2.0;
    vec![
        start,
        (x_lane, start.1),
        (x_lane, y_mid),
        (x_detour, y_mid),
        (x_detour, goal.1),
        goal,
    ]
}

/// Pick the detour column: start at the successor entry and step left in
/// fixed increments until a vertical probe between the two midlines
/// clears both endpoint bars, bounded by the step limit and the global
/// left guard rail.
fn choose_detour_x(a: Rect, b: Rect) -> f32 {
    let global_x_min = a.x_min.min(b.x_min) - DETOUR_MARGIN_X;
    let mut candidate = b.x_min - ROUTE_X_PAD;
    let probe_rects = [a, b];

    for _ in 0..=DETOUR_MAX_STEPS {
        let probe = [(candidate, a.mid_y()), (candidate, b.mid_y())];
        if !polyline_intersects_any(&probe, &probe_rects, ROUTE_CLEARANCE, ROUTE_CLEARANCE) {
            return candidate;
        }
        candidate = (candidate - DETOUR_STEP_X).max(global_x_min);
    }
    candidate
}

/// True when an orthogonal segment touches or crosses the rectangle.
/// Diagonal segments are treated as intersecting, keeping the check
/// conservative.
fn segment_intersects_rect(p1: Point, p2: Point, rect: Rect) -> bool {
    let (x1, y1) = p1;
    let (x2, y2) = p2;
    if y1 == y2 {
        if !(rect.y_min <= y1 && y1 <= rect.y_max) {
            return false;
        }
        let (lo, hi) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        return !(hi < rect.x_min || lo > rect.x_max);
    }
    if x1 == x2 {
        if !(rect.x_min <= x1 && x1 <= rect.x_max) {
            return false;
        }
        let (lo, hi) = if y1 <= y2 { (y1, y2) } else { (y2, y1) };
        return !(hi < rect.y_min || lo > rect.y_max);
    }
    true
}

/// Check an orthogonal polyline against every rectangle inflated by the
/// given clearances.
pub fn polyline_intersects_any(points: &[Point], rects: &[Rect], cx: f32, cy: f32) -> bool {
    if points.len() < 2 {
        return false;
    }
    for segment in points.windows(2) {
        for rect in rects {
            if segment_intersects_rect(segment[0], segment[1], rect.inflate(cx, cy)) {
                return true;
            }
        }
    }
    false
}

/// Rasterized obstacle field over the layout bounding box. Cells are
/// blocked when their lattice point falls inside any inflated bar.
struct ObstacleGrid {
    blocked: Vec<bool>,
    cols: i32,
    rows: i32,
    min_x: f32,
    min_y: f32,
}

impl ObstacleGrid {
    fn build(rects: &[Rect]) -> Option<Self> {
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for rect in rects {
            min_x = min_x.min(rect.x_min);
            min_y = min_y.min(rect.y_min);
            max_x = max_x.max(rect.x_max);
            max_y = max_y.max(rect.y_max);
        }
        if min_x == f32::MAX {
            return None;
        }
        min_x -= GRID_MARGIN;
        min_y -= GRID_MARGIN;
        max_x += GRID_MARGIN;
        max_y += GRID_MARGIN;

        let cols = ((max_x - min_x) / GRID_DX).ceil() as i32 + 1;
        let rows = ((max_y - min_y) / GRID_DY).ceil() as i32 + 1;
        let mut blocked = vec![false; (cols as usize) * (rows as usize)];

        for rect in rects {
            let inflated = rect.inflate(GRID_CLEARANCE, GRID_CLEARANCE);
            let start_x = ((inflated.x_min - min_x) / GRID_DX).ceil().max(0.0) as i32;
            let end_x = ((inflated.x_max - min_x) / GRID_DX).floor().min((cols - 1) as f32) as i32;
            let start_y = ((inflated.y_min - min_y) / GRID_DY).ceil().max(0.0) as i32;
            let end_y = ((inflated.y_max - min_y) / GRID_DY).floor().min((rows - 1) as f32) as i32;
            for iy in start_y..=end_y {
                for ix in start_x..=end_x {
                    blocked[(iy * cols + ix) as usize] = true;
                }
            }
        }

        Some(Self {
            blocked,
            cols,
            rows,
            min_x,
            min_y,
        })
    }

    fn cell_for(&self, point: Point) -> (i32, i32) {
        (
            ((point.0 - self.min_x) / GRID_DX).floor() as i32,
            ((point.1 - self.min_y) / GRID_DY).floor() as i32,
        )
    }

    fn world_for(&self, cell: (i32, i32)) -> Point {
        (
            self.min_x + cell.0 as f32 * GRID_DX,
            self.min_y + cell.1 as f32 * GRID_DY,
        )
    }

    fn is_blocked(&self, cell: (i32, i32)) -> bool {
        let (ix, iy) = cell;
        if ix < 0 || iy < 0 || ix >= self.cols || iy >= self.rows {
            return true;
        }
        self.blocked[(iy * self.cols + ix) as usize]
    }

    fn unblock(&mut self, cell: (i32, i32)) {
        let (ix, iy) = cell;
        if ix >= 0 && iy >= 0 && ix < self.cols && iy < self.rows {
            self.blocked[(iy * self.cols + ix) as usize] = false;
        }
    }
}

/// Search state: a cell plus the direction it was entered from, so bends
/// can be penalized. dir 0 is the start state; 1..=4 map to +x, -x, +y, -y.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
struct GridState {
    x: i32,
    y: i32,
    dir: u8,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct GridEntry {
    est: u32,
    cost: u32,
    state: GridState,
}

impl Ord for GridEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .est
            .cmp(&self.est)
            .then_with(|| other.cost.cmp(&self.cost))
            .then_with(|| self.state.y.cmp(&other.state.y))
            .then_with(|| self.state.x.cmp(&other.state.x))
            .then_with(|| self.state.dir.cmp(&other.state.dir))
    }
}

impl PartialOrd for GridEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

fn manhattan(a: (i32, i32), b: (i32, i32)) -> u32 {
    (a.0.abs_diff(b.0) + a.1.abs_diff(b.1)) * STEP_COST
}

/// Orthogonal A* over grid cells with a bend penalty. Deterministic:
/// integer costs and a total order on heap entries, no hash iteration.
fn astar(grid: &ObstacleGrid, start: (i32, i32), goal: (i32, i32)) -> Option<Vec<(i32, i32)>> {
    let start_state = GridState {
        x: start.0,
        y: start.1,
        dir: 0,
    };
    let mut frontier = BinaryHeap::new();
    frontier.push(GridEntry {
        est: manhattan(start, goal),
        cost: 0,
        state: start_state,
    });
    let mut cost_so_far: HashMap<GridState, u32> = HashMap::new();
    cost_so_far.insert(start_state, 0);
    let mut came_from: HashMap<GridState, GridState> = HashMap::new();
    let mut goal_state = None;

    while let Some(entry) = frontier.pop() {
        let state = entry.state;
        if (state.x, state.y) == goal {
            goal_state = Some(state);
            break;
        }
        if entry.cost > cost_so_far.get(&state).copied().unwrap_or(u32::MAX) {
            continue;
        }
        for (idx, (dx, dy)) in DIRECTIONS.iter().enumerate() {
            let next_cell = (state.x + dx, state.y + dy);
            if grid.is_blocked(next_cell) {
                continue;
            }
            let dir = idx as u8 + 1;
            let mut step = STEP_COST;
            if state.dir != 0 && state.dir != dir {
                step += BEND_PENALTY;
            }
            let next_state = GridState {
                x: next_cell.0,
                y: next_cell.1,
                dir,
            };
            let new_cost = entry.cost + step;
            if new_cost < cost_so_far.get(&next_state).copied().unwrap_or(u32::MAX) {
                cost_so_far.insert(next_state, new_cost);
                came_from.insert(next_state, state);
                frontier.push(GridEntry {
                    est: new_cost + manhattan(next_cell, goal),
                    cost: new_cost,
                    state: next_state,
                });
            }
        }
    }

    let mut state = goal_state?;
    let mut path = vec![(state.x, state.y)];
    while state != start_state {
        state = came_from.get(&state).copied()?;
        path.push((state.x, state.y));
    }
    path.reverse();
    Some(path)
}

/// Grid fallback: rasterize every bar, force-unblock the anchor cells and
/// search. When even the grid yields nothing, route a single lane around
/// the rightmost extent of the layout.
fn route_grid_astar(a: Rect, b: Rect, all: &[Rect]) -> Vec<Point> {
    let start = exit_anchor(a);
    let goal = entry_anchor(b);

    if let Some(mut grid) = ObstacleGrid::build(all) {
        let start_cell = grid.cell_for(start);
        let goal_cell = grid.cell_for(goal);
        grid.unblock(start_cell);
        grid.unblock(goal_cell);

        if let Some(cells) = astar(&grid, start_cell, goal_cell) {
            let mut points = Vec::with_capacity(cells.len() + 2);
            points.push(start);
            for cell in cells.iter().skip(1).take(cells.len().saturating_sub(2)) {
                points.push(grid.world_for(*cell));
            }
            points.push(goal);
            return simplify_polyline(&dedupe_points(&points));
        }
    }

    let lane_x = all
        .iter()
        .map(|rect| rect.x_max)
        .fold(a.x_max.max(b.x_max), f32::max)
        + ROUTE_X_PAD * 4.0;
    debug!(lane_x, "grid search exhausted, using lane fallback");
    vec![start, (lane_x, start.1), (lane_x, goal.1), goal]
}

/// Drop consecutive duplicate points so no zero-length segments remain.
pub fn dedupe_points(points: &[Point]) -> Vec<Point> {
    let mut cleaned: Vec<Point> = Vec::with_capacity(points.len());
    for &point in points {
        if cleaned.last() != Some(&point) {
            cleaned.push(point);
        }
    }
    cleaned
}

/// Remove collinear interior points from an orthogonal polyline.
pub fn simplify_polyline(points: &[Point]) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let mut simplified = vec![points[0]];
    for i in 1..points.len() - 1 {
        let (x1, y1) = *simplified.last().expect("non-empty");
        let (x2, y2) = points[i];
        let (x3, y3) = points[i + 1];
        let cross = (x2 - x1) * (y3 - y2) - (y2 - y1) * (x3 - x2);
        if cross.abs() < COLLINEAR_EPS {
            continue;
        }
        simplified.push(points[i]);
    }
    simplified.push(points[points.len() - 1]);
    simplified
}

/// Replace each interior elbow with a short diagonal cut so arrows render
/// with softened corners.
pub fn bevel_polyline(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut beveled = vec![points[0]];
    for i in 1..points.len() - 1 {
        let prev = points[i - 1];
        let corner = points[i];
        let next = points[i + 1];
        let (vx1, vy1) = (corner.0 - prev.0, corner.1 - prev.1);
        let (vx2, vy2) = (next.0 - corner.0, next.1 - corner.1);
        let len1 = (vx1 * vx1 + vy1 * vy1).sqrt();
        let len2 = (vx2 * vx2 + vy2 * vy2).sqrt();

        if len1 > 0.0 {
            let trim = BEVEL.min(len1 / 2.0);
            beveled.push((corner.0 - vx1 / len1 * trim, corner.1 - vy1 / len1 * trim));
        } else {
            beveled.push(corner);
        }
        if len2 > 0.0 {
            let trim = BEVEL.min(len2 / 2.0);
            beveled.push((corner.0 + vx2 / len2 * trim, corner.1 + vy2 / len2 * trim));
        } else {
            beveled.push(corner);
        }
    }
    beveled.push(points[points.len() - 1]);
    beveled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(x_min: f32, x_max: f32, row: f32) -> Rect {
        Rect::new(x_min, x_max, row * 28.0 + 6.0, row * 28.0 + 22.0)
    }

    #[test]
    fn clear_corridor_uses_simple_pattern() {
        let a = bar(0.0, 60.0, 0.0);
        let b = bar(120.0, 200.0, 2.0);
        let route = route_dependency(a, b, &[a, b]);
        // Simplified 3-segment route: start, two elbows, goal.
        assert_eq!(route.len(), 4);
        assert_eq!(route[0], exit_anchor(a));
        assert_eq!(route[route.len() - 1], entry_anchor(b));
    }

    #[test]
    fn route_is_deterministic() {
        let rects: Vec<Rect> = (0..6)
            .map(|i| bar(i as f32 * 30.0, i as f32 * 30.0 + 50.0, i as f32))
            .collect();
        let first = route_dependency(rects[0], rects[5], &rects);
        let second = route_dependency(rects[0], rects[5], &rects);
        assert_eq!(first, second);
    }

    #[test]
    fn blocked_corridor_still_reaches_anchors() {
        let a = bar(0.0, 60.0, 0.0);
        let b = bar(140.0, 220.0, 4.0);
        // A wide blocker sits squarely across the simple route's column.
        let blocker = bar(40.0, 180.0, 2.0);
        let all = [a, b, blocker];
        let route = route_dependency(a, b, &all);
        assert_eq!(route[0], exit_anchor(a));
        assert_eq!(route[route.len() - 1], entry_anchor(b));
    }

    #[test]
    fn walled_in_goal_falls_back_to_lane() {
        let a = bar(0.0, 40.0, 0.0);
        let b = bar(100.0, 140.0, 6.0);
        // Ring of bars sealing the successor on every side.
        let walls = [
            Rect::new(60.0, 180.0, 140.0, 150.0),
            Rect::new(60.0, 180.0, 200.0, 210.0),
            Rect::new(60.0, 70.0, 140.0, 210.0),
            Rect::new(170.0, 180.0, 140.0, 210.0),
        ];
        let mut all = vec![a, b];
        all.extend_from_slice(&walls);
        let route = route_dependency(a, b, &all);
        assert!(route.len() >= 2);
        assert_eq!(route[0], exit_anchor(a));
        assert_eq!(route[route.len() - 1], entry_anchor(b));
    }

    #[test]
    fn simplify_drops_collinear_points() {
        let points = vec![(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (10.0, 8.0)];
        assert_eq!(
            simplify_polyline(&points),
            vec![(0.0, 0.0), (10.0, 0.0), (10.0, 8.0)]
        );
    }

    #[test]
    fn bevel_cuts_interior_corners() {
        let points = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)];
        let beveled = bevel_polyline(&points);
        assert_eq!(beveled.len(), 4);
        assert_eq!(beveled[0], (0.0, 0.0));
        assert_eq!(beveled[1], (6.0, 0.0));
        assert_eq!(beveled[2], (10.0, 4.0));
        assert_eq!(beveled[3], (10.0, 10.0));
    }

    #[test]
    fn dedupe_removes_zero_length_segments() {
        let points = vec![(0.0, 0.0), (0.0, 0.0), (3.0, 0.0), (3.0, 0.0)];
        assert_eq!(dedupe_points(&points), vec![(0.0, 0.0), (3.0, 0.0)]);
    }
}
