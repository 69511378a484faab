use std::cmp::Ordering;
use std::num::NonZero;

use ndarray::Ix;

/// One coordinate of a [`Location`].
pub type Coord = usize;
/// A grid width or height.
pub type Dimension = NonZero<Coord>;

#[derive(Clone, Eq, Hash, Copy, PartialEq, Debug)]
/// A location `(x, y)` on a grid. The top left corner is `Location(0, 0)`.
///
/// Locations order row-major, so sorting a list of them yields reading order.
pub struct Location(pub Coord, pub Coord);

impl Location {
    pub(crate) fn as_index(&self) -> (Coord, Coord) {
        (self.1, self.0)
    }

    /// This location as signed coordinates, suitable for offsetting past the grid edge.
    pub fn signed(&self) -> (isize, isize) {
        (self.0 as isize, self.1 as isize)
    }

    /// Offset this location by `rhs`, without any bounds handling.
    /// Use [`Topology::normalize`](crate::shape::Topology::normalize) to bring the result back onto a grid.
    pub fn offset_by(self, rhs: (isize, isize)) -> (isize, isize) {
        let (x, y) = self.signed();
        (x + rhs.0, y + rhs.1)
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> Ordering {
        self.1.cmp(&other.1).then(self.0.cmp(&other.0))
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<(Ix, Ix)> for Location {
    fn from(value: (Ix, Ix)) -> Self {
        Self(value.1, value.0)
    }
}
