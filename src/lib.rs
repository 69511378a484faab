#![warn(missing_docs)]

//! # `gridlogic`
//!
//! Constraint evaluation and solving for two-color grid logic puzzles, in which every cell of a rectangular grid is
//! painted dark or light subject to a set of rules and clue symbols.
//! Begin by building a [`Grid`], either from fixture rows with [`Grid::from_rows`] or with a [`GridBuilder`].
//! Attach [rules](rules) and [symbols](symbols), then call [`validate_grid`] to judge a coloring, or hand the grid to
//! a [`Solver`](solver::Solver) from a [`SolverRegistry`](solver::SolverRegistry) to search for colorings.
//!
//! Grids need not be planar: either pair of opposite edges may wrap around, optionally flipping or mirroring the grid
//! on the way, as encoded by [`WrapMode`]. Every constraint follows the grid's [`Topology`] for adjacency.
//!
//! # Internals
//! Constraints are written once against [`TileView`](view::TileView), a read-only view of cell colors, so the same
//! evaluator judges both a user's [`Grid`] and the search engine's compact state.
//! A constraint's verdict is data, never an error: a violated constraint reports the cells it implicates.
//!
//! Two backends are provided:
//! 1. `backtrack`, a depth-first search pruned by one module per constraint. Each module rejects dead states early
//! and scores the undetermined cells it cares about, and the search always branches on the best-scored cell.
//! The search runs on a worker thread and hands over one solution per pull.
//! 2. `sat` (cargo feature `sat`, on by default), which expresses local constraints as a Boolean satisfiability
//! problem and enumerates models with [`varisat`](https://docs.rs/varisat).
//!
//! The `auto` solver negotiates between them. When no backend supports every constraint of a grid, each backend in
//! turn solves a relaxed copy holding only the constraints it understands, and every cell it manages to determine is
//! fixed for the next.

pub use builder::{BuilderInvalidReason, GridBuilder};
pub use cell::{Cell, Color};
pub use connections::Connections;
pub use grid::{Grid, GridError};
pub use instruction::Instruction;
pub use location::Location;
pub use rules::Rule;
pub use shape::{Topology, WrapMode};
pub use symbols::{Anchor, Symbol};
pub use validate::{validate_grid, GridValidation, State, Verdict};

mod tests;
pub mod builder;
pub(crate) mod cell;
pub(crate) mod connections;
pub(crate) mod grid;
pub(crate) mod instruction;
pub(crate) mod location;
#[cfg(feature = "sat")]
pub(crate) mod logic;
pub mod rules;
pub mod shape;
pub mod solver;
pub mod symbols;
pub(crate) mod validate;
pub mod view;
