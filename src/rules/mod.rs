//! Grid-wide constraints.

pub use ban_pattern::BanPatternRule;
pub use cell_count::CellCountRule;
pub use connect_all::ConnectAllRule;
pub use no_loops::NoLoopsRule;

use crate::grid::Grid;
use crate::validate::Verdict;
use crate::view::TileView;

pub(crate) mod ban_pattern;
mod cell_count;
mod connect_all;
mod no_loops;

/// A rule attached to a grid. Each variant owns its parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum Rule {
    /// See [`NoLoopsRule`].
    NoLoops(NoLoopsRule),
    /// See [`ConnectAllRule`].
    ConnectAll(ConnectAllRule),
    /// See [`CellCountRule`].
    CellCount(CellCountRule),
    /// See [`BanPatternRule`].
    BanPattern(BanPatternRule),
    /// The puzzle may be solved with undetermined cells left over.
    Underclued,
}

impl Rule {
    /// Stable identifier, used in solver capability lists.
    pub fn id(&self) -> &'static str {
        match self {
            Self::NoLoops(_) => "no_loops",
            Self::ConnectAll(_) => "connect_all",
            Self::CellCount(_) => "cell_count",
            Self::BanPattern(_) => "ban_pattern",
            Self::Underclued => "underclued",
        }
    }

    /// A short human-readable statement of the rule.
    pub fn explanation(&self) -> String {
        match self {
            Self::NoLoops(rule) => format!("No loops in {} cells", rule.color),
            Self::ConnectAll(rule) => format!("Connect all {} cells", rule.color),
            Self::CellCount(rule) => format!("There are {} {} cells", rule.count, rule.color),
            Self::BanPattern(_) => "Don't make this pattern".to_string(),
            Self::Underclued => "Underclued".to_string(),
        }
    }

    /// Evaluate the rule on `grid`.
    pub fn validate(&self, grid: &Grid) -> Verdict {
        self.validate_view(grid)
    }

    pub(crate) fn validate_view<V: TileView>(&self, view: &V) -> Verdict {
        match self {
            Self::NoLoops(rule) => rule.validate_view(view),
            Self::ConnectAll(rule) => rule.validate_view(view),
            Self::CellCount(rule) => rule.validate_view(view),
            Self::BanPattern(rule) => rule.validate_view(view),
            Self::Underclued => Verdict::Satisfied,
        }
    }
}
