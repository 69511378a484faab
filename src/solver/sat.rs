//! A backend that encodes local constraints as CNF and hands them to varisat.

use std::collections::HashSet;
use std::sync::OnceLock;

use itertools::Itertools;
use log::{debug, warn};
use ndarray::Array2;
use varisat::{CnfFormula, ExtendFormula, Lit, Var};

use crate::cell::{Cell, Color};
use crate::grid::Grid;
use crate::instruction::Instruction;
use crate::location::Location;
use crate::logic::{equal, exactly_k};
use crate::rules::{BanPatternRule, CellCountRule, Rule};
use crate::symbols::{MinesweeperSymbol, Symbol};

use super::{self_test, CancellationToken, Candidate, SolveError, Solutions, Solver};

/// Solves pattern, count and minesweeper constraints with a SAT solver. Connectivity is out of its reach.
pub struct SatSolver {
    environment: OnceLock<bool>,
}

impl Default for SatSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SatSolver {
    /// A solver whose environment check has not run yet.
    pub fn new() -> Self {
        Self { environment: OnceLock::new() }
    }

    /// A sub-cell symbol can only be encoded when its touching cells are bound to one color up front.
    fn is_placement_supported(grid: &Grid, symbol: &MinesweeperSymbol) -> bool {
        if !symbol.anchor.is_subtile() {
            return true;
        }
        let Some(touching) = symbol.anchor.touching(grid.topology()) else {
            return false;
        };
        let Some((first, rest)) = touching.split_first() else {
            return false;
        };

        let connected = rest.iter().all(|location| grid.connections().is_connected(*first, *location));
        let settled = touching.iter()
            .map(|location| grid.tile_at(*location))
            .all(|cell| cell.exists && cell.fixed && cell.color.is_determined())
            && touching.iter().map(|location| grid.tile_at(*location).color).all_equal();
        connected || settled
    }
}

/// One variable per existing cell, true when the cell is dark.
struct Encoding {
    vars: Array2<Option<Var>>,
    formula: CnfFormula,
}

impl Encoding {
    fn new(grid: &Grid) -> Self {
        let mut formula = CnfFormula::new();
        let vars = grid.tiles().map(|cell| cell.exists.then(|| formula.new_var()));
        Self { vars, formula }
    }

    fn lit(&self, location: Location, color: Color) -> Option<Lit> {
        self.vars[location.as_index()].map(|var| Lit::from_var(var, color == Color::Dark))
    }

    fn dark_lits(&self, grid: &Grid) -> Vec<Lit> {
        grid.topology()
            .locations()
            .filter_map(|location| self.lit(location, Color::Dark))
            .collect_vec()
    }

    fn add_givens(&mut self, grid: &Grid) {
        for location in grid.topology().locations() {
            let cell = grid.tile_at(location);
            if cell.fixed && cell.color.is_determined() {
                if let Some(lit) = self.lit(location, cell.color) {
                    self.formula.add_clause(&[lit]);
                }
            }
        }
        for pair in grid.connections().pairs() {
            if let (Some(a), Some(b)) = (self.lit(pair.0, Color::Dark), self.lit(pair.1, Color::Dark)) {
                equal(a, b).iter().for_each(|clause| self.formula.add_clause(clause));
            }
        }
    }

    fn add_cell_count(&mut self, grid: &Grid, rule: &CellCountRule) {
        let dark = self.dark_lits(grid);
        match rule.color {
            Color::Dark => exactly_k(&mut self.formula, &dark, rule.count, None),
            Color::Light => {
                let light = dark.iter().map(|lit| !*lit).collect_vec();
                exactly_k(&mut self.formula, &light, rule.count, None);
            }
            // a solved grid has no undetermined cells to count
            Color::Empty if rule.count > 0 => self.formula.add_clause(&[]),
            Color::Empty => {}
        }
    }

    fn add_ban_pattern(&mut self, grid: &Grid, rule: &BanPatternRule) {
        let topology = grid.topology();
        for variant in rule.variants() {
            for origin in BanPatternRule::placements(grid, variant.dim()) {
                let clause = variant.indexed_iter()
                    .filter(|(_, color)| color.is_determined())
                    .map(|((row, col), color)| {
                        topology.normalize(origin.0 + col as isize, origin.1 + row as isize)
                            .and_then(|location| self.lit(location, *color))
                            .map(|lit| !lit)
                    })
                    .collect::<Option<Vec<_>>>();
                // placements over holes can never match
                if let Some(clause) = clause {
                    self.formula.add_clause(&clause);
                }
            }
        }
    }

    fn add_minesweeper(&mut self, grid: &Grid, symbol: &MinesweeperSymbol) {
        let topology = grid.topology();
        let touching = symbol.anchor.touching(topology).unwrap_or_default();
        let block = touching.iter().map(|location| self.lit(*location, Color::Dark)).collect::<Option<Vec<_>>>();
        let Some(block) = block.filter(|block| !block.is_empty()) else {
            self.formula.add_clause(&[]);
            return;
        };
        for other in block.iter().skip(1) {
            equal(block[0], *other).iter().for_each(|clause| self.formula.add_clause(clause));
        }

        let ring = touching.iter()
            .flat_map(|location| topology.neighbors8(*location))
            .filter(|location| !touching.contains(location))
            .unique()
            .filter_map(|location| self.lit(location, Color::Dark))
            .collect_vec();
        let light_ring = ring.iter().map(|lit| !*lit).collect_vec();
        // a dark block counts light neighbors and the other way round
        exactly_k(&mut self.formula, &light_ring, symbol.number, Some(block[0]));
        exactly_k(&mut self.formula, &ring, symbol.number, Some(!block[0]));
    }
}

struct SatSolutions {
    solver: varisat::Solver<'static>,
    vars: Array2<Option<Var>>,
    template: Grid,
    token: CancellationToken,
    backbone: bool,
    done: bool,
}

impl SatSolutions {
    /// The grid described by `color_of`, leaving fixed cells and holes alone.
    fn grid_from(&self, color_of: impl Fn(Var) -> Color) -> Grid {
        self.template.with_tiles(|location, cell| match (cell, self.vars[location.as_index()]) {
            (Cell { fixed: true, .. }, _) | (_, None) => cell,
            (_, Some(var)) => cell.with_color(color_of(var)),
        })
    }

    fn cell_vars(&self) -> Vec<Var> {
        self.vars.iter().flatten().copied().collect_vec()
    }

    /// Exclude `model` from every later search.
    fn block(&mut self, model: &HashSet<Var>) {
        let clause = self.cell_vars()
            .into_iter()
            .map(|var| Lit::from_var(var, !model.contains(&var)))
            .collect_vec();
        self.solver.add_clause(&clause);
    }

    /// Cells whose color is the same in every model, found by asking for a model that flips each one.
    fn backbone(&mut self, model: &HashSet<Var>) -> Option<Grid> {
        let mut forced = HashSet::new();
        for var in self.cell_vars() {
            if self.token.is_cancelled() {
                return None;
            }
            let dark = model.contains(&var);
            self.solver.assume(&[Lit::from_var(var, !dark)]);
            if let Ok(false) = self.solver.solve() {
                forced.insert(var);
            }
        }
        self.solver.assume(&[]);
        debug!("sat backbone fixes {} of {} cells", forced.len(), self.cell_vars().len());

        Some(self.grid_from(|var| match (forced.contains(&var), model.contains(&var)) {
            (false, _) => Color::Empty,
            (true, true) => Color::Dark,
            (true, false) => Color::Light,
        }))
    }
}

impl Iterator for SatSolutions {
    type Item = Candidate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.token.is_cancelled() {
            return None;
        }

        let model = match self.solver.solve() {
            Ok(true) => self.solver.model(),
            Ok(false) => None,
            Err(err) => {
                warn!("sat solver failed: {}", err);
                self.done = true;
                return None;
            }
        };
        let Some(model) = model else {
            self.done = true;
            return Some(Candidate::NoMoreSolutions);
        };
        // the variables assigned true
        let model: HashSet<Var> = model.into_iter().filter(|lit| lit.is_positive()).map(|lit| lit.var()).collect();
        if self.backbone {
            let backbone = self.backbone(&model)?;
            // the next pull reports exhaustion
            self.solver.add_clause(&[]);
            return Some(Candidate::Found(backbone));
        }

        self.block(&model);
        Some(Candidate::Found(self.grid_from(|var| {
            if model.contains(&var) {
                Color::Dark
            } else {
                Color::Light
            }
        })))
    }
}

impl Solver for SatSolver {
    fn id(&self) -> &'static str {
        "sat"
    }

    fn description(&self) -> &'static str {
        "Encodes the grid for a SAT solver. Fast, but only for patterns, counts and minesweeper clues."
    }

    fn is_instruction_supported(&self, grid: &Grid, instruction: Instruction) -> bool {
        match instruction {
            Instruction::Rule(rule) => matches!(rule, Rule::BanPattern(_) | Rule::CellCount(_) | Rule::Underclued),
            Instruction::Symbol(Symbol::Minesweeper(symbol)) => Self::is_placement_supported(grid, symbol),
            Instruction::Symbol(_) => false,
        }
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

        let mut encoding = Encoding::new(grid);
        encoding.add_givens(grid);
        for rule in grid.rules() {
            match rule {
                Rule::CellCount(rule) => encoding.add_cell_count(grid, rule),
                Rule::BanPattern(rule) => encoding.add_ban_pattern(grid, rule),
                _ => {}
            }
        }
        for symbol in grid.symbols() {
            if let Symbol::Minesweeper(symbol) = symbol {
                encoding.add_minesweeper(grid, symbol);
            }
        }
        debug!(
            "sat encoding: {} variables, {} clauses",
            encoding.formula.var_count(),
            encoding.formula.len()
        );

        let mut solver = varisat::Solver::new();
        solver.add_formula(&encoding.formula);
        Ok(Box::new(SatSolutions {
            solver,
            vars: encoding.vars,
            template: grid.clone(),
            token: token.clone(),
            backbone: grid.is_underclued(),
            done: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use unordered_pair::UnorderedPair;

    use super::*;
    use crate::connections::Connections;
    use crate::symbols::Anchor;
    use crate::validate::{validate_grid, State};

    fn solutions(grid: &Grid) -> Vec<Grid> {
        SatSolver::new()
            .solve(grid, &CancellationToken::new())
            .unwrap()
            .map_while(|candidate| match candidate {
                Candidate::Found(grid) => Some(grid),
                Candidate::NoMoreSolutions => None,
            })
            .collect_vec()
    }

    #[test]
    fn enumerates_counts() {
        let grid = Grid::from_rows(&["nn", "nn"]).unwrap().add_rule(Rule::CellCount(CellCountRule::new(Color::Dark, 2)));
        let found = solutions(&grid);
        assert_eq!(found.len(), 6);
        assert_eq!(found.iter().unique_by(|grid| grid.to_string()).count(), 6);
        assert!(found.iter().all(|grid| grid.tile_count(true, None, Color::Dark) == 2));
    }

    #[test]
    fn minesweeper_counts_the_other_color() {
        let grid = Grid::from_rows(&["nnn", "nBn", "nnn"])
            .unwrap()
            .add_symbol(Symbol::Minesweeper(MinesweeperSymbol::new(Anchor::new(1.0, 1.0), 8)));
        let found = solutions(&grid);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tile_count(true, None, Color::Light), 8);
    }

    /// Every coloring of the unfixed cells of `grid` that validates, as fixture strings.
    fn brute_force(grid: &Grid) -> Vec<String> {
        let free = grid.topology()
            .locations()
            .filter(|location| grid.tile_at(*location).exists && !grid.tile_at(*location).fixed)
            .collect_vec();
        (0..1usize << free.len())
            .map(|mask| {
                free.iter().enumerate().fold(grid.clone(), |grid, (bit, location)| {
                    let color = if mask & (1 << bit) != 0 { Color::Dark } else { Color::Light };
                    grid.with_color(*location, color)
                })
            })
            .filter(|grid| validate_grid(grid, None).final_state == State::Satisfied)
            .map(|grid| grid.to_string())
            .sorted()
            .collect_vec()
    }

    #[test]
    fn corner_minesweeper_needs_bound_cells() {
        let corner = |rows: &[&str]| {
            Grid::from_rows(rows)
                .unwrap()
                .add_symbol(Symbol::Minesweeper(MinesweeperSymbol::new(Anchor::new(0.5, 0.5), 1)))
        };
        let solver = SatSolver::new();

        assert!(!solver.is_grid_supported(&corner(&["nnn", "nnn", "nnn"])));
        assert!(solver.is_grid_supported(&corner(&["BBn", "BBn", "nnn"])));
        assert!(!solver.is_grid_supported(&corner(&["BWn", "BBn", "nnn"])));
        assert!(!solver.is_grid_supported(&corner(&["BBn", "Bbn", "nnn"])));

        let mut connections = Connections::new();
        for location in [Location(1, 0), Location(0, 1), Location(1, 1)] {
            connections.connect(UnorderedPair(Location(0, 0), location));
        }
        assert!(solver.is_grid_supported(&corner(&["nnn", "nnn", "nnn"]).with_connections(connections)));

        let grid = corner(&["BBn", "BBn", "nnn"]);
        let found = solutions(&grid).iter().map(Grid::to_string).sorted().collect_vec();
        // one light cell among the five around the block
        assert_eq!(found.len(), 5);
        assert_eq!(found, brute_force(&grid));
    }

    #[test]
    fn underclued_yields_the_backbone() {
        let grid = Grid::from_rows(&["Bn", "nn"])
            .unwrap()
            .add_rule(Rule::BanPattern(BanPatternRule::from_rows(&["bb"]).unwrap()))
            .add_rule(Rule::Underclued);
        let found = solutions(&grid);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tile(1, 0).color, Color::Light);
        assert_eq!(found[0].tile(0, 1).color, Color::Light);
        assert_eq!(found[0].tile(1, 1).color, Color::Empty);
    }

    #[test]
    fn unsupported_instructions() {
        let grid = Grid::from_rows(&["nn"]).unwrap().add_rule(Rule::NoLoops(crate::rules::NoLoopsRule::new(Color::Dark)));
        assert!(matches!(
            SatSolver::new().solve(&grid, &CancellationToken::new()),
            Err(SolveError::UnsupportedGrid)
        ));
        assert!(SatSolver::new().is_environment_supported());
    }
}
