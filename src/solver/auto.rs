//! A composite solver that picks among other backends, relaxing constraints none of them handle in full.

use std::collections::VecDeque;
use std::sync::Arc;

use itertools::Itertools;
use log::{debug, warn};

use crate::cell::Color;
use crate::grid::Grid;
use crate::instruction::Instruction;
use crate::rules::Rule;
use crate::symbols::Symbol;
use crate::validate::{validate_grid, State};

use super::{fill_solution, fix_grid, CancellationToken, Candidate, SolveError, SolverRegistry, Solutions, Solver};

/// Delegates to the first backend that supports a grid.
///
/// When none does, the backends take turns on a relaxed copy of the grid: each keeps only the constraints it
/// understands, is told the grid is underclued, and fixes whatever it could determine for the next one.
pub struct AutoSolver {
    backends: SolverRegistry,
}

impl AutoSolver {
    /// Negotiate between `backends`, in their registry order.
    pub fn new(backends: SolverRegistry) -> Self {
        Self { backends }
    }

    /// The backends this solver delegates to.
    pub fn backends(&self) -> &SolverRegistry {
        &self.backends
    }

    /// `grid` stripped of everything `backend` cannot handle, marked underclued.
    ///
    /// Area numbers and letters survive regardless, since an underclued solve can still use them.
    pub fn relax(grid: &Grid, backend: &dyn Solver) -> Grid {
        let rules = grid.rules()
            .iter()
            .filter(|rule| !matches!(rule, Rule::Underclued))
            .filter(|rule| backend.is_instruction_supported(grid, Instruction::Rule(rule)))
            .cloned()
            .collect_vec();
        let symbols = grid.symbols()
            .iter()
            .filter(|symbol| {
                matches!(symbol, Symbol::AreaNumber(_) | Symbol::Letter(_))
                    || backend.is_instruction_supported(grid, Instruction::Symbol(symbol))
            })
            .cloned()
            .collect_vec();

        grid.with_rules(rules)
            .with_symbols(symbols)
            .add_rule(Rule::Underclued)
    }

    fn direct_backend(&self, grid: &Grid) -> Option<&Arc<dyn Solver>> {
        self.backends.iter().find(|backend| backend.is_grid_supported(grid))
    }
}

impl Solver for AutoSolver {
    fn id(&self) -> &'static str {
        "auto"
    }

    fn description(&self) -> &'static str {
        "Picks the fastest backend that supports the grid, combining backends when none supports it alone."
    }

    fn is_instruction_supported(&self, grid: &Grid, instruction: Instruction) -> bool {
        self.backends.iter().any(|backend| backend.is_instruction_supported(grid, instruction))
    }

    fn is_grid_supported(&self, grid: &Grid) -> bool {
        if self.direct_backend(grid).is_some() {
            return true;
        }
        // wrapped grids are solved whole or not at all
        !grid.topology().is_wrapped()
            && self.backends.iter().any(|backend| backend.is_grid_supported(&Self::relax(grid, backend.as_ref())))
    }

    fn is_environment_supported(&self) -> bool {
        self.backends.iter().any(|backend| backend.is_environment_supported())
    }

    fn solve(&self, grid: &Grid, token: &CancellationToken) -> Result<Solutions, SolveError> {
        if grid.topology().is_wrapped() {
            let backend = self.direct_backend(grid).ok_or(SolveError::UnsupportedGrid)?;
            debug!("wrapped grid, handing off to {}", backend.id());
            return backend.solve(grid, token);
        }
        let stage = match self.direct_backend(grid) {
            Some(backend) => {
                debug!("{} supports the grid", backend.id());
                Stage::Streaming(backend.solve(grid, token)?)
            }
            None if self.is_grid_supported(grid) => Stage::Probing,
            None => return Err(SolveError::UnsupportedGrid),
        };

        Ok(Box::new(AutoSolutions {
            original: grid.clone(),
            progress: grid.clone(),
            backends: self.backends.iter().cloned().collect(),
            token: token.clone(),
            stage,
            pending: VecDeque::new(),
        }))
    }
}

enum Stage {
    /// Trying the remaining backends in turn.
    Probing,
    /// A backend supports the grid; its solutions are forwarded.
    Streaming(Solutions),
    /// Only `pending` remains to be emitted.
    Draining,
}

struct AutoSolutions {
    original: Grid,
    /// The grid with every cell determined so far fixed.
    progress: Grid,
    /// Backends not yet tried, highest priority first.
    backends: VecDeque<Arc<dyn Solver>>,
    token: CancellationToken,
    stage: Stage,
    pending: VecDeque<Candidate>,
}

impl AutoSolutions {
    fn finish_with(&mut self, candidates: impl IntoIterator<Item = Candidate>) {
        self.pending.extend(candidates);
        self.stage = Stage::Draining;
    }

    fn stream(&mut self, backend: &dyn Solver, grid: &Grid) {
        match backend.solve(grid, &self.token) {
            Ok(solutions) => self.stage = Stage::Streaming(solutions),
            Err(err) => warn!("{} failed to start: {}", backend.id(), err),
        }
    }

    /// Give the next backend its turn.
    fn advance(&mut self) {
        let Some(backend) = self.backends.pop_front() else {
            let best = fill_solution(&self.original, &self.progress);
            if validate_grid(&best, None).final_state == State::Error {
                debug!("every backend had a turn, and the best effort breaks the full grid");
                self.finish_with([Candidate::NoMoreSolutions]);
            } else {
                debug!("every backend had a turn, emitting the best effort");
                self.finish_with([Candidate::Found(best), Candidate::NoMoreSolutions]);
            }
            return;
        };

        if backend.is_grid_supported(&self.progress) {
            debug!("{} supports the grid", backend.id());
            let progress = self.progress.clone();
            return self.stream(backend.as_ref(), &progress);
        }
        if backend.is_grid_supported(&self.original) {
            debug!("{} supports the original grid", backend.id());
            let original = self.original.clone();
            return self.stream(backend.as_ref(), &original);
        }

        let relaxed = AutoSolver::relax(&self.progress, backend.as_ref());
        if !backend.is_grid_supported(&relaxed) {
            debug!("{} cannot take even a relaxed grid", backend.id());
            return;
        }

        debug!("{} solving a relaxed grid", backend.id());
        let partial = match backend.solve(&relaxed, &self.token) {
            Ok(mut solutions) => solutions.next(),
            Err(err) => {
                warn!("{} failed to start: {}", backend.id(), err);
                return;
            }
        };
        let partial = match partial {
            Some(Candidate::Found(partial)) => partial,
            // a relaxed grid with no solution rules out the full one too
            Some(Candidate::NoMoreSolutions) => {
                debug!("{} found the relaxed grid unsolvable", backend.id());
                return self.finish_with([Candidate::NoMoreSolutions]);
            }
            None => return,
        };

        let filled = fill_solution(&self.progress, &partial);
        if filled.tile_count(true, Some(false), Color::Empty) > 0 {
            self.progress = fix_grid(&filled);
            return;
        }

        let result = fill_solution(&self.original, &filled);
        if validate_grid(&result, None).final_state == State::Error {
            warn!("{} completed the relaxed grid, but the result breaks the full grid", backend.id());
            self.finish_with([Candidate::NoMoreSolutions]);
        } else {
            self.finish_with([Candidate::Found(result), Candidate::NoMoreSolutions]);
        }
    }
}

impl Iterator for AutoSolutions {
    type Item = Candidate;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.token.is_cancelled() {
                self.stage = Stage::Draining;
                self.pending.clear();
                return None;
            }

            match &mut self.stage {
                Stage::Probing => self.advance(),
                Stage::Streaming(solutions) => match solutions.next() {
                    Some(Candidate::Found(solution)) => {
                        let filled = fill_solution(&self.original, &solution);
                        if validate_grid(&filled, None).final_state == State::Error {
                            warn!("skipping a candidate that breaks the full grid");
                            continue;
                        }
                        return Some(Candidate::Found(filled));
                    }
                    end => {
                        self.stage = Stage::Draining;
                        return end;
                    }
                },
                Stage::Draining => return self.pending.pop_front(),
            }
        }
    }
}
