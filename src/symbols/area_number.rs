use crate::cell::Color;
use crate::validate::Verdict;
use crate::view::{flood, has_empty_border, TileView};

use super::{placement, Anchor};

/// The region of the anchor's color containing the anchor has exactly `number` cells.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct AreaNumberSymbol {
    /// Where the symbol sits.
    pub anchor: Anchor,
    /// The required region size.
    pub number: usize,
}

impl AreaNumberSymbol {
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

        let region = flood(view, &touching, |c| c == Some(color));
        if region.len() > self.number {
            return Verdict::Error(region);
        }

        let potential = flood(view, &touching, |c| c == Some(color) || c == Some(Color::Empty));
        if potential.len() < self.number {
            return Verdict::Error(potential);
        }

        Verdict::settled(region.len() == self.number
            && touching.iter().all(|location| region.contains(location))
            && !has_empty_border(view, &region))
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;
    use crate::grid::Grid;
    use crate::location::Location;

    fn area(x: f64, y: f64, number: usize) -> AreaNumberSymbol {
        AreaNumberSymbol::new(Anchor::new(x, y), number)
    }

    #[test]
    fn exact_area() {
        let grid = Grid::from_rows(&["bbw", "wwb"]).unwrap();
        assert_eq!(area(0.0, 0.0, 2).validate_view(&grid), Verdict::Satisfied);
        assert_eq!(area(0.5, 0.0, 2).validate_view(&grid), Verdict::Satisfied);
        assert_eq!(area(0.0, 1.0, 2).validate_view(&grid), Verdict::Satisfied);
    }

    #[test]
    fn too_large_and_too_small() {
        let grid = Grid::from_rows(&["bbb", "wwn"]).unwrap();
        let too_large = area(0.0, 0.0, 2).validate_view(&grid);
        assert_eq!(too_large.positions().len(), 3);

        let too_small = area(0.0, 1.0, 4).validate_view(&grid);
        assert_eq!(
            too_small.positions().iter().copied().sorted().collect_vec(),
            vec![Location(0, 1), Location(1, 1), Location(2, 1)]
        );
    }

    #[test]
    fn open_region_is_incomplete() {
        let grid = Grid::from_rows(&["bbn", "www"]).unwrap();
        assert_eq!(area(0.0, 0.0, 2).validate_view(&grid), Verdict::Incomplete);
        assert_eq!(area(2.0, 0.0, 1).validate_view(&grid), Verdict::Incomplete);
    }
}
