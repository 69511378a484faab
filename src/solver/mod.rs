//! Search for colorings that satisfy a grid's constraints.
//!
//! Every backend implements [`Solver`]. A solve produces a lazy [`Solutions`] stream: each pull yields a
//! [`Candidate::Found`] grid, the stream ends with [`Candidate::NoMoreSolutions`] once the search space is
//! exhausted, and ends without that sentinel if the search was cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::cell::Color;
use crate::grid::Grid;
use crate::instruction::Instruction;

pub use auto::AutoSolver;
pub use backtrack::BacktrackSolver;
pub use registry::SolverRegistry;
#[cfg(feature = "sat")]
pub use sat::SatSolver;

pub mod auto;
pub mod backtrack;
pub mod registry;
#[cfg(feature = "sat")]
pub mod sat;

/// One item of a solution stream.
#[derive(Clone, Debug)]
pub enum Candidate {
    /// A solution, or on underclued grids the cells every solution agrees on.
    Found(Grid),
    /// The search space is exhausted. Nothing follows.
    NoMoreSolutions,
}

/// A lazy stream of [`Candidate`]s. Dropping it abandons the search.
pub type Solutions = Box<dyn Iterator<Item = Candidate>>;

/// Reasons a solve could not even start. Running out of solutions is not one of them.
#[derive(Debug, Error)]
pub enum SolveError {
    /// The grid holds a constraint or cell the solver cannot handle.
    #[error("no available solver supports this grid")]
    UnsupportedGrid,
    /// No solver is registered under this id.
    #[error("no solver is registered as {0:?}")]
    UnknownSolver(String),
    /// The search thread could not be spawned.
    #[error("could not start the search worker")]
    Worker(#[from] std::io::Error),
}

/// A shared flag asking a running solve to stop. Cloning shares the flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Default::default()
    }

    /// Ask every solve holding this token to stop at its next pull.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether [`cancel`](Self::cancel) was called on this token or a clone of it.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A solving backend, consumed through its declared capabilities.
pub trait Solver: Send + Sync {
    /// Stable identifier, used for lookup in a [`SolverRegistry`].
    fn id(&self) -> &'static str;

    /// A one-line summary for users choosing a solver.
    fn description(&self) -> &'static str;

    /// Whether the solver honors a [`CancellationToken`] between pulls.
    fn supports_cancellation(&self) -> bool {
        true
    }

    /// Whether this backend understands `instruction` as attached to `grid`.
    fn is_instruction_supported(&self, grid: &Grid, instruction: Instruction) -> bool;

    /// Whether this backend can solve `grid` as is. By default, whether it supports every attached instruction.
    fn is_grid_supported(&self, grid: &Grid) -> bool {
        grid.instructions().all(|instruction| self.is_instruction_supported(grid, instruction))
    }

    /// Whether this backend works in the current environment. Implementations cache the answer.
    fn is_environment_supported(&self) -> bool;

    /// Start solving `grid`. Fails only when the search cannot be attempted.
    fn solve(&self, grid: &Grid, token: &CancellationToken) -> Result<Solutions, SolveError>;
}

/// Solve a 1x1 undetermined grid and report whether it produced anything.
pub(crate) fn self_test(solver: &dyn Solver) -> bool {
    let Ok(grid) = Grid::from_rows(&["n"]) else {
        return false;
    };
    let supported = match solver.solve(&grid, &CancellationToken::new()) {
        Ok(mut solutions) => solutions.any(|candidate| matches!(candidate, Candidate::Found(_))),
        Err(_) => false,
    };
    debug!("environment check for {}: {}", solver.id(), supported);
    supported
}

/// Copy the colors of `solution` onto `grid`, leaving holes and fixed cells alone.
pub fn fill_solution(grid: &Grid, solution: &Grid) -> Grid {
    grid.with_tiles(|location, cell| {
        if !cell.exists || cell.fixed || location.0 >= solution.width() || location.1 >= solution.height() {
            cell
        } else {
            cell.with_color(solution.tile_at(location).color)
        }
    })
}

/// Mark every determined cell as fixed, so later passes cannot change it.
pub fn fix_grid(grid: &Grid) -> Grid {
    grid.with_tiles(|_, cell| {
        if cell.fixed {
            cell
        } else {
            cell.with_fixed(cell.color != Color::Empty)
        }
    })
}
