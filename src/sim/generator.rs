/// Procedural maze provider.
///
/// Each call lays out a fresh walled room, carves a self-avoiding route of
/// `path_length` numbered cells from S to E, then sprinkles decoys and inner
/// walls by complexity. The result is serialized to the same text format the
/// level files use, so it goes through `domain::maze::parse` like any other.
///
/// Route numbering: the history starts at [S], which takes slot 0 of the
/// sorted sequence. A single `0` decoy fills that slot, and the route digits
/// run 1..=9, non-decreasing, so step k always expects the k-th route cell.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::future::{ready, Future};
use std::sync::Mutex;

use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::domain::cell::Position;
use crate::domain::color::palette_names;
use super::level::{GenerationParams, MazeProvider, ProviderError};

const DIRS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Expansions allowed per random walk before trying another start cell.
const WALK_BUDGET: u32 = 20_000;
const WALK_TRIES: u32 = 8;

pub struct ProceduralProvider {
    rng: Mutex<StdRng>,
}

impl ProceduralProvider {
    /// A fixed seed makes the sequence of generated mazes reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        ProceduralProvider { rng: Mutex::new(rng) }
    }
}

impl MazeProvider for ProceduralProvider {
    fn generate(
        &self,
        params: GenerationParams,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send {
        let result = match self.rng.lock() {
            Ok(mut rng) => Ok(build_layout(params, &mut *rng).to_text()),
            Err(_) => Err(ProviderError::Interrupted("generator state poisoned".into())),
        };
        ready(result)
    }
}

// ══════════════════════════════════════════════════════════════
// Layout
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Layout {
    pub rows: Vec<Vec<char>>,
    /// S, each numbered cell in order, E.
    pub route: Vec<Position>,
    pub legend: BTreeMap<u32, &'static str>,
}

impl Layout {
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            out.extend(row.iter());
            out.push('\n');
        }
        out.push_str("Colors:\n");
        for (n, name) in &self.legend {
            let _ = writeln!(out, "{n}: {name}");
        }
        out
    }
}

pub fn build_layout<R: Rng + ?Sized>(params: GenerationParams, rng: &mut R) -> Layout {
    let complexity = params.maze_complexity.clamp(1, 10) as i32;
    let steps = params.path_length.max(1) as usize;
    let route_len = steps + 2;

    // Interior size, grown until the route plus decoys fit with room to spare.
    let mut w = 4 + complexity;
    let mut h = 3 + complexity / 2;
    while ((w * h) as usize) < route_len * 2 {
        w += 1;
        h += 1;
    }

    let route = carve_route(w, h, route_len, rng);

    // Border walls, floor inside.
    let mut rows = vec![vec![' '; (w + 2) as usize]; (h + 2) as usize];
    for (y, row) in rows.iter_mut().enumerate() {
        for (x, ch) in row.iter_mut().enumerate() {
            if x == 0 || y == 0 || x == (w + 1) as usize || y == (h + 1) as usize {
                *ch = '#';
            }
        }
    }

    let mut legend_digits = vec![0u32];
    for (k, pos) in route.iter().enumerate() {
        let ch = if k == 0 {
            'S'
        } else if k == route.len() - 1 {
            'E'
        } else {
            let d = route_digit(k - 1, steps);
            if legend_digits.last() != Some(&d) {
                legend_digits.push(d);
            }
            char::from_digit(d, 10).unwrap_or('9')
        };
        rows[pos.y as usize][pos.x as usize] = ch;
    }

    let mut free: Vec<Position> = (1..=h)
        .flat_map(|y| (1..=w).map(move |x| Position::new(x, y)))
        .filter(|p| rows[p.y as usize][p.x as usize] == ' ')
        .collect();
    free.shuffle(rng);

    // One `0` decoy, then unnumbered decoys, then inner walls.
    let decoys = 1 + complexity as usize / 2;
    let walls = (complexity * w * h / 20) as usize;
    let mut free = free.into_iter();
    if let Some(p) = free.next() {
        rows[p.y as usize][p.x as usize] = '0';
    }
    for p in free.by_ref().take(decoys) {
        rows[p.y as usize][p.x as usize] = '.';
    }
    for p in free.take(walls) {
        rows[p.y as usize][p.x as usize] = '#';
    }

    let legend = build_legend(&legend_digits, params.color_palette_similarity, rng);
    debug!(
        "generated {}x{} maze, {} steps, {} colors",
        w + 2,
        h + 2,
        steps,
        legend.values().collect::<std::collections::BTreeSet<_>>().len(),
    );

    Layout { rows, route, legend }
}

/// Digit for the k-th of `steps` route cells: spreads 1..=9 evenly, never
/// decreasing.
fn route_digit(k: usize, steps: usize) -> u32 {
    (1 + k * 9 / steps) as u32
}

/// More similar palettes use fewer distinct names, so neighbors on the
/// route repeat colors more often.
fn build_legend<R: Rng + ?Sized>(
    digits: &[u32],
    similarity: f64,
    rng: &mut R,
) -> BTreeMap<u32, &'static str> {
    let names: Vec<&'static str> = palette_names().collect();
    let distinct = (((1.0 - similarity.clamp(0.0, 1.0)) * 10.0).round() as usize)
        .clamp(2, names.len());
    let offset = rng.gen_range(0..names.len());

    digits
        .iter()
        .map(|&d| (d, names[(offset + d as usize % distinct) % names.len()]))
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Route carving
// ══════════════════════════════════════════════════════════════

/// A simple path of `len` cells inside the `w` x `h` interior (1-based).
/// Random self-avoiding walk that never brushes against itself; falls back
/// to a serpentine sweep if the walk keeps running out of budget.
fn carve_route<R: Rng + ?Sized>(w: i32, h: i32, len: usize, rng: &mut R) -> Vec<Position> {
    for _ in 0..WALK_TRIES {
        let start = Position::new(rng.gen_range(1..=w), rng.gen_range(1..=h));
        let mut path = vec![start];
        let mut budget = WALK_BUDGET;
        if walk(&mut path, w, h, len, &mut budget, rng) {
            return path;
        }
    }
    debug!("route walk exhausted, using serpentine route");
    serpentine(w, h, len)
}

fn walk<R: Rng + ?Sized>(
    path: &mut Vec<Position>,
    w: i32,
    h: i32,
    len: usize,
    budget: &mut u32,
    rng: &mut R,
) -> bool {
    if path.len() == len {
        return true;
    }
    if *budget == 0 {
        return false;
    }
    *budget -= 1;

    let head = path[path.len() - 1];
    let mut dirs = DIRS;
    dirs.shuffle(rng);
    for (dx, dy) in dirs {
        let next = head.offset(dx, dy);
        if !(1..=w).contains(&next.x) || !(1..=h).contains(&next.y) {
            continue;
        }
        if !fits(path, next) {
            continue;
        }
        path.push(next);
        if walk(path, w, h, len, budget, rng) {
            return true;
        }
        path.pop();
    }
    false
}

/// `next` may only touch the current head of the route.
fn fits(path: &[Position], next: Position) -> bool {
    let head = path[path.len() - 1];
    path.iter().all(|&p| {
        let d = (p.x - next.x).abs() + (p.y - next.y).abs();
        d > 1 || (p == head && d == 1)
    })
}

fn serpentine(w: i32, h: i32, len: usize) -> Vec<Position> {
    (1..=h)
        .flat_map(|y| {
            let xs: Vec<i32> = if y % 2 == 1 { (1..=w).collect() } else { (1..=w).rev().collect() };
            xs.into_iter().map(move |x| Position::new(x, y))
        })
        .take(len)
        .collect()
}
