//! A read-only view of cell colors that every constraint is written against.

use ndarray::Array2;

use crate::cell::Color;
use crate::location::Location;
use crate::shape::Topology;

/// Read access to the colors of a grid-shaped state.
///
/// Constraints are written once against this trait and evaluated both on a [`Grid`](crate::Grid)
/// and on the backtracking engine's compact state.
pub trait TileView {
    /// Dimensions and wrap modes of the state.
    fn topology(&self) -> &Topology;

    /// The color at an in-bounds `location`, or `None` for a hole.
    fn color_at(&self, location: Location) -> Option<Color>;

    /// The color at signed coordinates after normalization; `None` for holes and for positions off the grid.
    fn color_at_signed(&self, x: isize, y: isize) -> Option<Color> {
        self.topology()
            .normalize(x, y)
            .and_then(|location| self.color_at(location))
    }

    /// The first location, row-major, whose color passes `predicate`.
    fn find(&self, mut predicate: impl FnMut(Location, Option<Color>) -> bool) -> Option<Location> {
        self.topology()
            .locations()
            .find(|location| predicate(*location, self.color_at(*location)))
    }

    /// Whether any existing cell is undetermined.
    fn has_empty(&self) -> bool {
        self.find(|_, color| color == Some(Color::Empty)).is_some()
    }
}

/// 4-connected flood fill from every location in `seeds` through cells whose color passes `admits`.
///
/// Seeds themselves are only included when they pass. The result is in visiting order.
pub(crate) fn flood<V: TileView>(
    view: &V,
    seeds: &[Location],
    admits: impl Fn(Option<Color>) -> bool,
) -> Vec<Location> {
    let topology = view.topology();
    let mut visited = Array2::from_elem(topology.shape(), false);
    let mut region = Vec::new();
    let mut stack = seeds.iter()
        .copied()
        .filter(|seed| admits(view.color_at(*seed)))
        .collect::<Vec<_>>();

    while let Some(location) = stack.pop() {
        if visited[location.as_index()] {
            continue;
        }
        visited[location.as_index()] = true;
        region.push(location);
        for neighbor in topology.neighbors4(location) {
            if !visited[neighbor.as_index()] && admits(view.color_at(neighbor)) {
                stack.push(neighbor);
            }
        }
    }

    region
}

/// Whether any cell 4-adjacent to `region` (and outside it) is undetermined.
pub(crate) fn has_empty_border<V: TileView>(view: &V, region: &[Location]) -> bool {
    region.iter()
        .flat_map(|location| view.topology().neighbors4(*location))
        .any(|neighbor| view.color_at(neighbor) == Some(Color::Empty) && !region.contains(&neighbor))
}
