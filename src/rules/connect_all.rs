use itertools::Itertools;

use crate::cell::Color;
use crate::grid::Grid;
use crate::location::Location;
use crate::validate::Verdict;
use crate::view::{flood, TileView};

/// Every cell of `color` must belong to a single 4-connected region.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ConnectAllRule {
    /// The color that must stay connected.
    pub color: Color,
}

impl ConnectAllRule {
    /// Require every `color` cell to be connected.
    pub fn new(color: Color) -> Self {
        Self { color }
    }

    /// Evaluate the rule on `grid`. Reports the cells cut off from the first one, even through undetermined cells.
    pub fn validate(&self, grid: &Grid) -> Verdict {
        self.validate_view(grid)
    }

    pub(crate) fn validate_view<V: TileView>(&self, view: &V) -> Verdict {
        let targets = view.topology()
            .locations()
            .filter(|location| view.color_at(*location) == Some(self.color))
            .collect_vec();
        let Some(seed) = targets.first() else {
            return Verdict::settled(!view.has_empty());
        };

        let reachable = flood(view, &[*seed], |color| color == Some(self.color) || color == Some(Color::Empty));
        let stranded = targets.iter()
            .filter(|location| !reachable.contains(location))
            .copied()
            .collect::<Vec<Location>>();
        if !stranded.is_empty() {
            return Verdict::Error(stranded);
        }

        let connected = flood(view, &[*seed], |color| color == Some(self.color));
        Verdict::settled(connected.len() == targets.len())
    }
}
