//! A constraint-propagating backtracking search, run on its own worker thread.

use std::ops::ControlFlow;
use std::sync::OnceLock;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use itertools::Itertools;
use log::{debug, warn};
use ndarray::Array2;

use crate::cell::Color;
use crate::grid::Grid;
use crate::instruction::Instruction;
use crate::rules::Rule;
use crate::symbols::Symbol;

use super::{self_test, CancellationToken, Candidate, SolveError, Solutions, Solver};

pub use data::{BTGridData, BTModule, BTTile, CheckResult, Rating, Rejected, TileMask};

pub mod data;
mod engine;
mod modules;

use engine::Engine;
use modules::{AreaNumberModule, BanPatternModule, CellCountModule, ConnectAllModule, LetterModule, NoLoopsModule};

enum WorkerMessage {
    Solution(Array2<BTTile>),
    Exhausted,
}

/// Solves every rule and symbol except minesweeper by exhaustive search with pruning.
///
/// Underclued grids yield a single candidate: the cells on which every solution agrees.
pub struct BacktrackSolver {
    color_order: [BTTile; 2],
    environment: OnceLock<bool>,
}

impl Default for BacktrackSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl BacktrackSolver {
    /// Tries dark before light.
    pub fn new() -> Self {
        Self {
            color_order: [BTTile::Dark, BTTile::Light],
            environment: OnceLock::new(),
        }
    }

    /// Try `first` before its opposite at every branch. This changes the order solutions are found in.
    pub fn with_color_order(self, first: Color) -> Self {
        let first = match first {
            Color::Light => BTTile::Light,
            _ => BTTile::Dark,
        };
        Self {
            color_order: [first, first.opposite()],
            ..self
        }
    }

    fn build_modules(grid: &Grid) -> Vec<Box<dyn BTModule>> {
        let mut modules: Vec<Box<dyn BTModule>> = Vec::new();
        for rule in grid.rules() {
            match rule {
                Rule::NoLoops(rule) => modules.push(Box::new(NoLoopsModule { rule: *rule })),
                Rule::ConnectAll(rule) => modules.push(Box::new(ConnectAllModule { rule: *rule })),
                Rule::CellCount(rule) => modules.push(Box::new(CellCountModule { rule: *rule })),
                Rule::BanPattern(rule) => modules.push(Box::new(BanPatternModule::new(rule))),
                Rule::Underclued => {}
            }
        }

        for symbol in grid.symbols() {
            if let Symbol::AreaNumber(symbol) = symbol {
                modules.push(Box::new(AreaNumberModule { symbol: *symbol }));
            }
        }
        let letters = grid.symbols()
            .iter()
            .filter_map(|symbol| match symbol {
                Symbol::Letter(letter) => Some(*letter),
                _ => None,
            })
            .collect_vec();
        if !letters.is_empty() {
            modules.push(Box::new(LetterModule {
                letters,
                symbols: grid.symbols().to_vec(),
            }));
        }

        modules
    }

    fn initial_state(grid: &Grid) -> BTGridData {
        let tiles = grid.tiles().map(|cell| BTTile::from_cell(*cell));
        let mut data = BTGridData::new(tiles.clone(), grid.connections(), *grid.topology());
        // spread givens across their connection groups
        for (index, tile) in tiles.indexed_iter() {
            if matches!(tile, BTTile::Dark | BTTile::Light) {
                data.set_tile_with_connection(index.into(), *tile);
            }
        }
        data
    }
}

/// Run the search, sending each solution through `sender` as the consumer asks for it.
fn work(
    data: BTGridData,
    modules: Vec<Box<dyn BTModule>>,
    color_order: [BTTile; 2],
    token: CancellationToken,
    sender: Sender<WorkerMessage>,
) {
    let mut engine = Engine::new(&modules, &token, color_order);
    let flow = engine.search(data, &[], &mut |solution| {
        match sender.send(WorkerMessage::Solution(solution.tiles.clone())) {
            Ok(()) => ControlFlow::Continue(()),
            // the consumer is gone
            Err(_) => ControlFlow::Break(()),
        }
    });

    debug!("backtrack search visited {} nodes", engine.nodes);
    if flow.is_continue() {
        let _ = sender.send(WorkerMessage::Exhausted);
    }
}

/// Run the search to completion and send only the cells every solution agrees on.
fn work_backbone(
    data: BTGridData,
    modules: Vec<Box<dyn BTModule>>,
    color_order: [BTTile; 2],
    token: CancellationToken,
    sender: Sender<WorkerMessage>,
) {
    let mut engine = Engine::new(&modules, &token, color_order);
    let mut backbone: Option<Array2<BTTile>> = None;
    let flow = engine.search(data.clone(), &[], &mut |solution| {
        let agreed = backbone.get_or_insert_with(|| solution.tiles.clone());
        agreed.zip_mut_with(&solution.tiles, |mine, theirs| {
            if mine != theirs {
                *mine = BTTile::Empty;
            }
        });

        // nothing left to learn once every cell beyond the givens is contested
        if *agreed == data.tiles {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    debug!("backtrack backbone search visited {} nodes, stopped early: {}", engine.nodes, flow.is_break());
    if flow.is_break() && token.is_cancelled() {
        return;
    }
    if let Some(agreed) = backbone {
        if sender.send(WorkerMessage::Solution(agreed)).is_err() {
            return;
        }
    }
    let _ = sender.send(WorkerMessage::Exhausted);
}

struct BacktrackSolutions {
    receiver: Option<Receiver<WorkerMessage>>,
    template: Grid,
    token: CancellationToken,
}

impl Iterator for BacktrackSolutions {
    type Item = Candidate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.token.is_cancelled() {
            // dropping the receiver unblocks the worker
            self.receiver = None;
            return None;
        }

        let message = self.receiver.as_ref()?.recv();
        match message {
            Ok(WorkerMessage::Solution(tiles)) => {
                let solution = self.template.with_tiles(|location, cell| {
                    if !cell.exists || cell.fixed {
                        return cell;
                    }
                    tiles[location.as_index()].color().map_or(cell, |color| cell.with_color(color))
                });
                Some(Candidate::Found(solution))
            }
            Ok(WorkerMessage::Exhausted) => {
                self.receiver = None;
                Some(Candidate::NoMoreSolutions)
            }
            Err(_) => {
                self.receiver = None;
                None
            }
        }
    }
}

impl Solver for BacktrackSolver {
    fn id(&self) -> &'static str {
        "backtrack"
    }

    fn description(&self) -> &'static str {
        "Exhaustive search with constraint propagation. Supports every rule and most symbols."
    }

    fn is_instruction_supported(&self, _grid: &Grid, instruction: Instruction) -> bool {
        !matches!(instruction, Instruction::Symbol(Symbol::Minesweeper(_)))
    }

    fn is_grid_supported(&self, grid: &Grid) -> bool {
        grid.instructions().all(|instruction| self.is_instruction_supported(grid, instruction))
            && grid.tile_count(true, Some(true), Color::Empty) == 0
    }

    fn is_environment_supported(&self) -> bool {
        *self.environment.get_or_init(|| self_test(self))
    }

    fn solve(&self, grid: &Grid, token: &CancellationToken) -> Result<Solutions, SolveError> {
        if !self.is_grid_supported(grid) {
            return Err(SolveError::UnsupportedGrid);
        }

        let data = Self::initial_state(grid);
        if !data.connections_consistent() {
            warn!("connected cells have conflicting givens");
            return Ok(Box::new(std::iter::once(Candidate::NoMoreSolutions)));
        }

        let modules = Self::build_modules(grid);
        let color_order = self.color_order;
        let worker_token = token.clone();
        let (sender, receiver) = bounded(0);
        let worker = if grid.is_underclued() { work_backbone } else { work };
        thread::Builder::new()
            .name("backtrack".to_string())
            .spawn(move || worker(data, modules, color_order, worker_token, sender))?;

        Ok(Box::new(BacktrackSolutions {
            receiver: Some(receiver),
            template: grid.clone(),
            token: token.clone(),
        }))
    }
}
