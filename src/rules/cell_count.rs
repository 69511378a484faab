use itertools::Itertools;

use crate::cell::Color;
use crate::grid::Grid;
use crate::validate::Verdict;
use crate::view::TileView;

/// Exactly `count` cells of `color`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CellCountRule {
    /// The color being counted.
    pub color: Color,
    /// The required number of cells.
    pub count: usize,
}

impl CellCountRule {
    /// Require exactly `count` cells of `color`.
    pub fn new(color: Color, count: usize) -> Self {
        Self { color, count }
    }

    /// Evaluate the rule on `grid`.
    pub fn validate(&self, grid: &Grid) -> Verdict {
        self.validate_view(grid)
    }

    pub(crate) fn validate_view<V: TileView>(&self, view: &V) -> Verdict {
        let (colored, rest): (Vec<_>, Vec<_>) = view.topology()
            .locations()
            .filter_map(|location| view.color_at(location).map(|color| (location, color)))
            .partition(|(_, color)| *color == self.color);
        let empty = rest.iter().filter(|(_, color)| *color == Color::Empty).count();

        if colored.len() > self.count {
            return Verdict::Error(colored.into_iter().map(|(location, _)| location).collect_vec());
        }
        if colored.len() + empty < self.count {
            return Verdict::Error(rest.into_iter()
                .filter(|(_, color)| color.is_determined())
                .map(|(location, _)| location)
                .collect_vec());
        }

        Verdict::settled(colored.len() == self.count && empty == 0)
    }
}
