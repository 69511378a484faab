//! Constraints anchored at a point of the grid.
//!
//! A symbol sits either on a cell or on the edge or corner between cells. Its "touching" cells are the one, two or
//! four cells around that point; they must all exist and agree on a color before the symbol means anything.

use std::fmt::{Display, Formatter};

use itertools::Itertools;

pub use area_number::AreaNumberSymbol;
pub use letter::LetterSymbol;
pub use minesweeper::MinesweeperSymbol;

use crate::cell::Color;
use crate::grid::Grid;
use crate::location::Location;
use crate::shape::Topology;
use crate::validate::Verdict;
use crate::view::TileView;

mod area_number;
mod letter;
mod minesweeper;

/// A point on the grid in doubled coordinates, so that half-integer positions are exact.
///
/// `Anchor { x2: 3, y2: 0 }` is the edge between cells `(1, 0)` and `(2, 0)`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Anchor {
    /// Twice the x coordinate.
    pub x2: isize,
    /// Twice the y coordinate.
    pub y2: isize,
}

impl Anchor {
    /// Round `(x, y)` to the nearest half.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x2: (x * 2.0).round() as isize,
            y2: (y * 2.0).round() as isize,
        }
    }

    /// The anchor at the center of `location`.
    pub fn at(location: Location) -> Self {
        let (x, y) = location.signed();
        Self { x2: 2 * x, y2: 2 * y }
    }

    /// The x coordinate in cells.
    pub fn x(&self) -> f64 {
        self.x2 as f64 / 2.0
    }

    /// The y coordinate in cells.
    pub fn y(&self) -> f64 {
        self.y2 as f64 / 2.0
    }

    /// Whether the anchor sits on an edge or corner rather than a cell center.
    pub fn is_subtile(&self) -> bool {
        self.x2 % 2 != 0 || self.y2 % 2 != 0
    }

    /// Whether this anchor lies within the rectangle spanned by the cell centers of `topology`.
    pub fn is_in_bounds(&self, topology: &Topology) -> bool {
        (0..=2 * (topology.width() as isize - 1)).contains(&self.x2)
            && (0..=2 * (topology.height() as isize - 1)).contains(&self.y2)
    }

    /// Unnormalized coordinates of the cells around this point, row-major.
    pub(crate) fn touching_raw(&self) -> Vec<(isize, isize)> {
        let (min_x, max_x) = (self.x2.div_euclid(2), (self.x2 + 1).div_euclid(2));
        let (min_y, max_y) = (self.y2.div_euclid(2), (self.y2 + 1).div_euclid(2));
        [(min_x, min_y), (max_x, min_y), (min_x, max_y), (max_x, max_y)]
            .into_iter()
            .unique()
            .collect_vec()
    }

    /// The cells around this point, after normalization. `None` if any of them is off the grid.
    pub fn touching(&self, topology: &Topology) -> Option<Vec<Location>> {
        self.touching_raw()
            .into_iter()
            .map(|(x, y)| topology.normalize(x, y))
            .collect::<Option<Vec<_>>>()
            .map(|cells| cells.into_iter().unique().collect_vec())
    }
}

impl Display for Anchor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x(), self.y())
    }
}

/// Check that every cell touching `anchor` exists and that the determined ones agree.
///
/// Returns the touching cells and their shared color ([`Empty`](Color::Empty) if none is determined yet),
/// or the implicated cells when the placement is illegal.
pub(crate) fn placement<V: TileView>(view: &V, anchor: Anchor) -> Result<(Vec<Location>, Color), Vec<Location>> {
    let topology = view.topology();
    let Some(touching) = anchor.touching(topology) else {
        return Err(anchor.touching_raw()
            .into_iter()
            .filter_map(|(x, y)| topology.normalize(x, y))
            .collect_vec());
    };

    let mut shared = Color::Empty;
    for location in touching.iter() {
        match view.color_at(*location) {
            None => return Err(touching),
            Some(Color::Empty) => {}
            Some(color) if shared == Color::Empty => shared = color,
            Some(color) if color != shared => return Err(touching),
            Some(_) => {}
        }
    }

    Ok((touching, shared))
}

/// A symbol attached to a grid.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Symbol {
    /// See [`AreaNumberSymbol`].
    AreaNumber(AreaNumberSymbol),
    /// See [`LetterSymbol`].
    Letter(LetterSymbol),
    /// See [`MinesweeperSymbol`].
    Minesweeper(MinesweeperSymbol),
}

impl Symbol {
    /// Stable identifier, used in solver capability lists.
    pub fn id(&self) -> &'static str {
        match self {
            Self::AreaNumber(_) => "area_number",
            Self::Letter(_) => "letter",
            Self::Minesweeper(_) => "minesweeper",
        }
    }

    /// Where the symbol sits.
    pub fn anchor(&self) -> Anchor {
        match self {
            Self::AreaNumber(symbol) => symbol.anchor,
            Self::Letter(symbol) => symbol.anchor,
            Self::Minesweeper(symbol) => symbol.anchor,
        }
    }

    /// The same symbol moved to `anchor`.
    pub fn with_anchor(&self, anchor: Anchor) -> Self {
        match self {
            Self::AreaNumber(symbol) => Self::AreaNumber(AreaNumberSymbol { anchor, ..*symbol }),
            Self::Letter(symbol) => Self::Letter(LetterSymbol { anchor, ..*symbol }),
            Self::Minesweeper(symbol) => Self::Minesweeper(MinesweeperSymbol { anchor, ..*symbol }),
        }
    }

    /// A short human-readable statement of the clue.
    pub fn explanation(&self) -> String {
        match self {
            Self::AreaNumber(symbol) => format!("The area at {} has {} cells", symbol.anchor, symbol.number),
            Self::Letter(symbol) => format!("Letters {} share a region; other letters do not", symbol.letter),
            Self::Minesweeper(symbol) => {
                format!("{} cells of the other color surround {}", symbol.number, symbol.anchor)
            }
        }
    }

    /// Evaluate against `grid`, using the other symbols on it as context.
    pub fn validate(&self, grid: &Grid) -> Verdict {
        self.validate_view(grid, grid.symbols())
    }

    pub(crate) fn validate_view<V: TileView>(&self, view: &V, symbols: &[Symbol]) -> Verdict {
        match self {
            Self::AreaNumber(symbol) => symbol.validate_view(view),
            Self::Letter(symbol) => symbol.validate_view(view, symbols),
            Self::Minesweeper(symbol) => symbol.validate_view(view),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZero;

    use super::*;
    use crate::shape::WrapMode;

    #[test]
    fn touching_cells() {
        let topology = Topology::new((NonZero::new(3).unwrap(), NonZero::new(3).unwrap()));
        assert_eq!(Anchor::new(1.0, 1.0).touching(&topology), Some(vec![Location(1, 1)]));
        assert_eq!(Anchor::new(1.5, 1.0).touching(&topology), Some(vec![Location(1, 1), Location(2, 1)]));
        assert_eq!(
            Anchor::new(0.5, 0.5).touching(&topology),
            Some(vec![Location(0, 0), Location(1, 0), Location(0, 1), Location(1, 1)])
        );
        assert_eq!(Anchor::new(2.5, 0.0).touching(&topology), None);

        let wrapped = topology.with_wrap(WrapMode::Wrap, WrapMode::None);
        assert_eq!(Anchor::new(2.5, 0.0).touching(&wrapped), Some(vec![Location(2, 0), Location(0, 0)]));
    }

    #[test]
    fn illegal_placements() {
        let grid = Grid::from_rows(&["bw", "nn"]).unwrap();
        assert!(placement(&grid, Anchor::new(0.5, 0.5)).is_err());
        assert_eq!(
            placement(&grid, Anchor::new(0.0, 0.5)),
            Ok((vec![Location(0, 0), Location(0, 1)], Color::Dark))
        );

        let holed = Grid::from_rows(&["b.", "nn"]).unwrap();
        assert!(placement(&holed, Anchor::new(0.5, 0.0)).is_err());
    }
}
