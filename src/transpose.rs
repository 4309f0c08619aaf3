//! Matrix transpose kernels evaluated on the simulated cache.
//!
//! A kernel transposes the `rows x cols` matrix `A` into the `cols x rows`
//! matrix `B`. Every element it reads from `A` or reads/writes in `B` goes
//! through a [`TransposeContext`], which replays the access as a 4-byte load
//! or store on a 1KB direct-mapped cache with 32-byte blocks. Values held in
//! local variables are registers and cost nothing.

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::address::Geometry;
use crate::error::{Error, Result};
use crate::simulation::Simulation;
use crate::simulation_result::SimulationResult;
use crate::trace::{Operation, TraceEvent};

/// Largest supported dimension, `A` and `B` are laid out as 256x256 arrays.
pub const MAX_DIMENSION: usize = 256;
pub const ELEMENT_SIZE: u64 = size_of::<i32>() as u64;
pub const MATRIX_A_ADDRESS: u64 = 0x0030_0000;
pub const MATRIX_B_ADDRESS: u64 =
    MATRIX_A_ADDRESS + (MAX_DIMENSION * MAX_DIMENSION) as u64 * ELEMENT_SIZE;

pub const SUBMISSION_DESCRIPTION: &str = "Transpose submission";
pub const ROW_SCAN_DESCRIPTION: &str = "Simple row-wise scan transpose";

pub fn evaluation_geometry() -> Geometry {
    Geometry::new(5, 1, 5).expect("s=5, E=1, b=5 is a valid geometry")
}

pub type TransposeFn = fn(&mut TransposeContext<'_>);

#[derive(Debug, Copy, Clone)]
pub struct TransposeFunction {
    pub description: &'static str,
    pub run: TransposeFn,
}

pub fn registered_functions() -> [TransposeFunction; 2] {
    [
        TransposeFunction {
            description: SUBMISSION_DESCRIPTION,
            run: transpose_submit,
        },
        TransposeFunction {
            description: ROW_SCAN_DESCRIPTION,
            run: transpose_row_scan,
        },
    ]
}

pub struct TransposeContext<'a> {
    rows: usize,
    cols: usize,
    a: &'a [i32],
    b: &'a mut [i32],
    simulation: &'a mut Simulation,
    events: Option<&'a mut Vec<TraceEvent>>,
}

impl TransposeContext<'_> {
    /// Rows of `A`, columns of `B`.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Columns of `A`, rows of `B`.
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn load_a(&mut self, row: usize, col: usize) -> i32 {
        let index = row * self.cols + col;
        self.record(Operation::Load, MATRIX_A_ADDRESS, index);
        self.a[index]
    }

    pub fn load_b(&mut self, row: usize, col: usize) -> i32 {
        let index = row * self.rows + col;
        self.record(Operation::Load, MATRIX_B_ADDRESS, index);
        self.b[index]
    }

    pub fn store_b(&mut self, row: usize, col: usize, value: i32) {
        let index = row * self.rows + col;
        self.record(Operation::Store, MATRIX_B_ADDRESS, index);
        self.b[index] = value;
    }

    fn record(&mut self, operation: Operation, base: u64, index: usize) {
        let event = TraceEvent::new(
            operation,
            base + index as u64 * ELEMENT_SIZE,
            ELEMENT_SIZE as usize,
        );
        self.simulation.step(&event);
        if let Some(events) = self.events.as_deref_mut() {
            events.push(event);
        }
    }
}

/// Picks a blocking strategy by shape.
pub fn transpose_submit(ctx: &mut TransposeContext<'_>) {
    match (ctx.rows(), ctx.cols()) {
        (32, 32) => transpose_8x8(ctx),
        (64, 64) => transpose_8x8_split(ctx),
        _ => transpose_blocked(ctx, 16),
    }
}

/// Baseline, not optimized for the cache.
pub fn transpose_row_scan(ctx: &mut TransposeContext<'_>) {
    for i in 0..ctx.rows() {
        for j in 0..ctx.cols() {
            let tmp = ctx.load_a(i, j);
            ctx.store_b(j, i, tmp);
        }
    }
}

// 8x8 blocks, a whole block row of A is buffered in locals before it is
// written so the diagonal blocks do not thrash between A and B
fn transpose_8x8(ctx: &mut TransposeContext<'_>) {
    for i in (0..ctx.rows()).step_by(8) {
        for j in (0..ctx.cols()).step_by(8) {
            for k in i..i + 8 {
                let row: [i32; 8] = std::array::from_fn(|t| ctx.load_a(k, j + t));
                for (t, value) in row.into_iter().enumerate() {
                    ctx.store_b(j + t, k, value);
                }
            }
        }
    }
}

// 8x8 blocks handled as 4x4 quadrants: with 64 columns only four rows of a
// block fit in the cache at once, the upper right quadrant is parked in B
// and moved to its place while the lower left one is copied
fn transpose_8x8_split(ctx: &mut TransposeContext<'_>) {
    for i in (0..ctx.rows()).step_by(8) {
        for j in (0..ctx.cols()).step_by(8) {
            for k in i..i + 4 {
                let row: [i32; 8] = std::array::from_fn(|t| ctx.load_a(k, j + t));
                for t in 0..4 {
                    ctx.store_b(j + t, k, row[t]);
                    ctx.store_b(j + t, k + 4, row[t + 4]);
                }
            }

            for k in j..j + 4 {
                let lower_left: [i32; 4] = std::array::from_fn(|t| ctx.load_a(i + 4 + t, k));
                let parked: [i32; 4] = std::array::from_fn(|t| ctx.load_b(k, i + 4 + t));
                for t in 0..4 {
                    ctx.store_b(k, i + 4 + t, lower_left[t]);
                }
                for t in 0..4 {
                    ctx.store_b(k + 4, i + t, parked[t]);
                }
            }

            for k in i + 4..i + 8 {
                let row: [i32; 4] = std::array::from_fn(|t| ctx.load_a(k, j + 4 + t));
                for (t, value) in row.into_iter().enumerate() {
                    ctx.store_b(j + 4 + t, k, value);
                }
            }
        }
    }
}

fn transpose_blocked(ctx: &mut TransposeContext<'_>, block: usize) {
    let (rows, cols) = (ctx.rows(), ctx.cols());
    for i in (0..rows).step_by(block) {
        for j in (0..cols).step_by(block) {
            for k in i..(i + block).min(rows) {
                for l in j..(j + block).min(cols) {
                    let tmp = ctx.load_a(k, l);
                    ctx.store_b(l, k, tmp);
                }
            }
        }
    }
}

/// `a` is `rows x cols`, `b` is `cols x rows`, both row-major.
pub fn is_transpose(rows: usize, cols: usize, a: &[i32], b: &[i32]) -> bool {
    (0..rows).all(|i| (0..cols).all(|j| a[i * cols + j] == b[j * rows + i]))
}

#[derive(Debug, Clone)]
pub struct TransposeReport {
    pub description: &'static str,
    pub rows: usize,
    pub cols: usize,
    pub correct: bool,
    pub result: SimulationResult,
    /// Accesses of the kernel, only kept when requested.
    pub events: Vec<TraceEvent>,
}

impl std::fmt::Display for TransposeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}x{}): correctness={} {}",
            self.description,
            self.rows,
            self.cols,
            u8::from(self.correct),
            self.result
        )
    }
}

/// Runs `function` on a random `rows x cols` matrix against a cold cache.
pub fn evaluate(
    function: &TransposeFunction,
    rows: usize,
    cols: usize,
    seed: u64,
    keep_events: bool,
) -> Result<TransposeReport> {
    for (name, dimension) in [("rows", rows), ("cols", cols)] {
        if !(1..=MAX_DIMENSION).contains(&dimension) {
            return Err(Error::Configuration(format!(
                "matrix {name} must be within 1..={MAX_DIMENSION}, got {dimension}"
            )));
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let a: Vec<i32> = (0..rows * cols).map(|_| rng.random()).collect();
    let mut b = vec![0; rows * cols];

    let mut simulation = Simulation::new(evaluation_geometry())?;
    let mut events = Vec::new();

    info!("evaluating '{}' on {rows}x{cols}", function.description);
    let mut ctx = TransposeContext {
        rows,
        cols,
        a: &a,
        b: &mut b,
        simulation: &mut simulation,
        events: keep_events.then_some(&mut events),
    };
    (function.run)(&mut ctx);

    let correct = is_transpose(rows, cols, &a, &b);
    let result = simulation.result();
    debug!(
        "'{}' {rows}x{cols}: {result} ({:.3}% misses)",
        function.description,
        result.percent_miss()
    );

    Ok(TransposeReport {
        description: function.description,
        rows,
        cols,
        correct,
        result,
        events,
    })
}
