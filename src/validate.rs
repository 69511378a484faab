use itertools::Itertools;
use strum::Display;

use crate::cell::Color;
use crate::grid::Grid;
use crate::location::Location;
use crate::rules::Rule;

/// The outcome of evaluating a constraint, without the implicated locations.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum State {
    /// Fully met.
    Satisfied,
    /// Not violated yet.
    Incomplete,
    /// Violated.
    Error,
}

/// The outcome of evaluating a single rule or symbol.
///
/// Violations are data, not errors: the locations are used for highlighting and by the search engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// The constraint is fully met.
    Satisfied,
    /// Nothing is violated yet, but undetermined cells could still go either way.
    Incomplete,
    /// The constraint is violated; these are the cells implicated.
    Error(Vec<Location>),
}

impl Verdict {
    /// The verdict without its locations.
    pub fn state(&self) -> State {
        match self {
            Self::Satisfied => State::Satisfied,
            Self::Incomplete => State::Incomplete,
            Self::Error(_) => State::Error,
        }
    }

    /// Whether the constraint is violated.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The implicated locations; empty unless this is an error.
    pub fn positions(&self) -> &[Location] {
        match self {
            Self::Error(positions) => positions,
            _ => &[],
        }
    }

    /// `Satisfied` when `complete`, `Incomplete` otherwise.
    pub(crate) fn settled(complete: bool) -> Self {
        if complete {
            Self::Satisfied
        } else {
            Self::Incomplete
        }
    }
}

/// Verdicts for a whole grid, in the order the rules and symbols are attached.
#[derive(Clone, Debug)]
pub struct GridValidation {
    /// One verdict per attached rule.
    pub rules: Vec<Verdict>,
    /// One verdict per attached symbol.
    pub symbols: Vec<Verdict>,
    /// Present only when validating against a known solution.
    pub solution: Option<Verdict>,
    /// The combined state of the grid.
    pub final_state: State,
}

impl GridValidation {
    /// Every implicated location, deduplicated, in row-major order.
    pub fn error_positions(&self) -> Vec<Location> {
        self.rules.iter()
            .chain(self.symbols.iter())
            .chain(self.solution.iter())
            .flat_map(|verdict| verdict.positions().iter().copied())
            .sorted()
            .dedup()
            .collect_vec()
    }
}

/// Evaluate every rule and symbol on `grid`, and optionally compare against a known `solution`.
///
/// Any error makes the final state `Error`. Otherwise any incomplete verdict, or an undetermined cell on a grid
/// without the underclued rule, makes it `Incomplete`.
pub fn validate_grid(grid: &Grid, solution: Option<&Grid>) -> GridValidation {
    let rules = grid.rules().iter().map(|rule| rule.validate(grid)).collect_vec();
    let symbols = grid.symbols().iter().map(|symbol| symbol.validate(grid)).collect_vec();
    let solution = solution.map(|solution| compare_with_solution(grid, solution));

    let states = rules.iter()
        .chain(symbols.iter())
        .chain(solution.iter())
        .map(Verdict::state)
        .collect_vec();

    let final_state = if states.contains(&State::Error) {
        State::Error
    } else if states.contains(&State::Incomplete)
        || (grid.find_rule(|rule| matches!(rule, Rule::Underclued)).is_none() && grid.tile_count(true, None, Color::Empty) > 0)
    {
        State::Incomplete
    } else {
        State::Satisfied
    };

    GridValidation {
        rules,
        symbols,
        solution,
        final_state,
    }
}

fn compare_with_solution(grid: &Grid, solution: &Grid) -> Verdict {
    let mut mismatched = Vec::new();
    let mut complete = true;
    for location in grid.topology().locations() {
        let cell = grid.tile_at(location);
        if !cell.exists {
            continue;
        }
        let expected = if location.0 < solution.width() && location.1 < solution.height() {
            solution.tile_at(location).color
        } else {
            Color::Empty
        };
        match (cell.color, expected) {
            (_, Color::Empty) => {}
            (Color::Empty, _) => complete = false,
            (actual, expected) if actual != expected => mismatched.push(location),
            _ => {}
        }
    }

    if mismatched.is_empty() {
        Verdict::settled(complete)
    } else {
        Verdict::Error(mismatched)
    }
}
