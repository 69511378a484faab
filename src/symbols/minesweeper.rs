use itertools::Itertools;

use crate::cell::Color;
use crate::validate::Verdict;
use crate::view::TileView;

use super::{placement, Anchor};

/// Exactly `number` cells of the opposite color surround the anchor's block of cells.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct MinesweeperSymbol {
    /// Where the symbol sits.
    pub anchor: Anchor,
    /// The required count of opposite-colored neighbors.
    pub number: usize,
}

impl MinesweeperSymbol {
    /// A symbol at `anchor`.
    pub fn new(anchor: Anchor, number: usize) -> Self {
        Self { anchor, number }
    }

    pub(crate) fn validate_view<V: TileView>(&self, view: &V) -> Verdict {
        let (touching, color) = match placement(view, self.anchor) {
            Ok(placed) => placed,
            Err(positions) => return Verdict::Error(positions),
        };
        if color == Color::Empty {
            return Verdict::Incomplete;
        }

        let ring = touching.iter()
            .flat_map(|location| view.topology().neighbors8(*location))
            .filter(|location| !touching.contains(location))
            .unique()
            .sorted()
            .collect_vec();
        let (mines, rest): (Vec<_>, Vec<_>) = ring.into_iter()
            .filter_map(|location| view.color_at(location).map(|c| (location, c)))
            .partition(|(_, c)| *c == color.opposite());
        let empty = rest.iter().filter(|(_, c)| *c == Color::Empty).count();

        if mines.len() > self.number {
            return Verdict::Error(mines.into_iter().map(|(location, _)| location).collect_vec());
        }
        if mines.len() + empty < self.number {
            return Verdict::Error(rest.into_iter()
                .filter(|(_, c)| c.is_determined())
                .map(|(location, _)| location)
                .collect_vec());
        }

        Verdict::settled(mines.len() == self.number && empty == 0)
    }
}
