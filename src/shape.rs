//! Grid dimensions, wrap modes and coordinate normalization.

use itertools::Itertools;
use strum::{Display, EnumString, VariantArray};

use crate::location::{Dimension, Location};

/// How positions past one pair of opposite grid edges map back onto the grid.
#[derive(Clone, Copy, Debug, Default, Display, EnumString, Eq, Hash, PartialEq, VariantArray)]
#[strum(serialize_all = "kebab-case")]
pub enum WrapMode {
    /// The edge is a wall; positions past it do not exist.
    #[default]
    None,
    /// Leaving one edge re-enters from the opposite edge.
    Wrap,
    /// As [`Wrap`](WrapMode::Wrap), but the other axis is flipped on every crossing.
    WrapReverse,
    /// The grid continues as its own mirror image past the edge.
    Reflect,
    /// As [`Reflect`](WrapMode::Reflect), but the other axis is flipped on every crossing.
    ReflectReverse,
}

impl WrapMode {
    /// Whether positions past this edge exist at all.
    pub fn is_wrapping(self) -> bool {
        self != Self::None
    }

    fn is_reverse(self) -> bool {
        matches!(self, Self::WrapReverse | Self::ReflectReverse)
    }

    /// Fold one doubled coordinate into `[0, 2 * size)`, reporting whether the other axis must be flipped.
    fn fold(self, v2: isize, size: usize) -> Option<(isize, bool)> {
        let span = 2 * size as isize;
        match self {
            Self::None => (0..=span - 2).contains(&v2).then_some((v2, false)),
            Self::Wrap | Self::WrapReverse => {
                let crossings = v2.div_euclid(span);
                Some((v2.rem_euclid(span), self.is_reverse() && crossings.rem_euclid(2) == 1))
            }
            Self::Reflect | Self::ReflectReverse => {
                // seams sit at u = 0 and u = span
                let u = v2 + 1;
                let crossings = u.div_euclid(span);
                let folded = u.rem_euclid(2 * span);
                let v = if folded < span { folded - 1 } else { 2 * span - folded - 1 };
                // a point exactly on the mirror only touches the mirrored cell
                Some((v.clamp(0, span - 2), self.is_reverse() && crossings.rem_euclid(2) == 1))
            }
        }
    }
}

/// Orthogonal steps: up, down, left, right.
pub const NEIGHBOR_OFFSETS: [(isize, isize); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

/// Orthogonal and diagonal steps, row-major.
pub const NEIGHBOR_OFFSETS_8: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// The shape of a grid: its dimensions and the wrap rule of each axis.
///
/// All coordinate handling goes through [`normalize`](Self::normalize) so that wrapped, reflected and planar
/// grids share one code path.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Topology {
    pub(crate) dims: (Dimension, Dimension),
    /// Rule for the left and right edges.
    pub horizontal: WrapMode,
    /// Rule for the top and bottom edges.
    pub vertical: WrapMode,
}

impl Topology {
    /// A planar topology of `(width, height)`.
    pub fn new(dims: (Dimension, Dimension)) -> Self {
        Self {
            dims,
            horizontal: WrapMode::None,
            vertical: WrapMode::None,
        }
    }

    /// The same dimensions with new wrap modes.
    pub fn with_wrap(self, horizontal: WrapMode, vertical: WrapMode) -> Self {
        Self {
            horizontal,
            vertical,
            ..self
        }
    }

    /// Number of columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.dims.0.get()
    }

    /// Number of rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.dims.1.get()
    }

    /// `(rows, columns)`, the shape of every per-cell [`ndarray::Array2`].
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    /// Whether either axis wraps.
    pub fn is_wrapped(&self) -> bool {
        self.horizontal.is_wrapping() || self.vertical.is_wrapping()
    }

    /// Whether `(x, y)` lies on the grid without any wrapping.
    pub fn is_in_bounds(&self, x: isize, y: isize) -> bool {
        (0..self.width() as isize).contains(&x) && (0..self.height() as isize).contains(&y)
    }

    /// Map doubled coordinates (so `(1, 0)` is the edge between the first two cells) back onto the grid.
    ///
    /// The horizontal rule is applied first; a reversing crossing flips the other axis.
    /// Returns `None` only when an axis without wrapping is left.
    pub fn normalize_half(&self, x2: isize, y2: isize) -> Option<(isize, isize)> {
        let (x2, flip_y) = self.horizontal.fold(x2, self.width())?;
        let y2 = if flip_y { mirror(y2, self.height()) } else { y2 };
        let (y2, flip_x) = self.vertical.fold(y2, self.height())?;
        let x2 = if flip_x {
            let mirrored = mirror(x2, self.width());
            self.horizontal.fold(mirrored, self.width()).map_or(mirrored, |(v, _)| v)
        } else {
            x2
        };
        Some((x2, y2))
    }

    /// Map signed cell coordinates back onto the grid, or `None` if they fall past a non-wrapping edge.
    pub fn normalize(&self, x: isize, y: isize) -> Option<Location> {
        self.normalize_half(2 * x, 2 * y)
            .map(|(x2, y2)| Location((x2 / 2) as usize, (y2 / 2) as usize))
    }

    /// Distinct orthogonal neighbors of `location`, after normalization.
    pub fn neighbors4(&self, location: Location) -> Vec<Location> {
        self.neighbors_by(location, &NEIGHBOR_OFFSETS)
    }

    /// Distinct orthogonal and diagonal neighbors of `location`, after normalization.
    pub fn neighbors8(&self, location: Location) -> Vec<Location> {
        self.neighbors_by(location, &NEIGHBOR_OFFSETS_8)
    }

    fn neighbors_by(&self, location: Location, offsets: &[(isize, isize)]) -> Vec<Location> {
        offsets.iter()
            .filter_map(|offset| {
                let (x, y) = location.offset_by(*offset);
                self.normalize(x, y)
            })
            .filter(|neighbor| *neighbor != location)
            .unique()
            .collect_vec()
    }

    /// Every location, row-major.
    pub fn locations(&self) -> impl Iterator<Item = Location> {
        let width = self.width();
        (0..self.height()).flat_map(move |y| (0..width).map(move |x| Location(x, y)))
    }
}

#[inline]
fn mirror(v2: isize, size: usize) -> isize {
    2 * (size as isize - 1) - v2
}

#[cfg(test)]
mod tests {
    use std::num::NonZero;

    use super::*;

    fn topology(w: usize, h: usize, horizontal: WrapMode, vertical: WrapMode) -> Topology {
        Topology::new((NonZero::new(w).unwrap(), NonZero::new(h).unwrap())).with_wrap(horizontal, vertical)
    }

    #[test]
    fn planar_rejects_out_of_bounds() {
        let t = topology(3, 2, WrapMode::None, WrapMode::None);
        assert_eq!(t.normalize(2, 1), Some(Location(2, 1)));
        assert_eq!(t.normalize(-1, 0), None);
        assert_eq!(t.normalize(0, 2), None);
    }

    #[test]
    fn wrap_is_periodic() {
        let t = topology(4, 3, WrapMode::Wrap, WrapMode::None);
        assert_eq!(t.normalize(-1, 1), Some(Location(3, 1)));
        assert_eq!(t.normalize(9, 2), Some(Location(1, 2)));
        assert_eq!(t.normalize(0, -1), None);
    }

    #[test]
    fn wrap_reverse_flips_other_axis() {
        let t = topology(4, 3, WrapMode::WrapReverse, WrapMode::None);
        assert_eq!(t.normalize(4, 0), Some(Location(0, 2)));
        assert_eq!(t.normalize(-1, 2), Some(Location(3, 0)));
        // two crossings cancel out
        assert_eq!(t.normalize(8, 0), Some(Location(0, 0)));
    }

    #[test]
    fn reflect_mirrors() {
        let t = topology(3, 3, WrapMode::Reflect, WrapMode::Reflect);
        assert_eq!(t.normalize(-1, 0), Some(Location(0, 0)));
        assert_eq!(t.normalize(-2, 0), Some(Location(1, 0)));
        assert_eq!(t.normalize(3, 4), Some(Location(2, 1)));
        assert_eq!(t.normalize(6, 0), Some(Location(0, 0)));
    }

    #[test]
    fn half_coordinates_are_total_when_wrapping() {
        let t = topology(3, 2, WrapMode::Wrap, WrapMode::ReflectReverse);
        for x2 in -13..13 {
            for y2 in -13..13 {
                let (x, y) = t.normalize_half(x2, y2).unwrap();
                assert!((0..6).contains(&x), "{x2},{y2} -> {x}");
                assert!((0..4).contains(&y), "{x2},{y2} -> {y}");
            }
        }
    }

    #[test]
    fn neighbors_follow_seams() {
        let t = topology(3, 3, WrapMode::Wrap, WrapMode::Wrap);
        let mut around = t.neighbors4(Location(0, 0));
        around.sort();
        assert_eq!(around, vec![Location(1, 0), Location(2, 0), Location(0, 1), Location(0, 2)]);
        assert_eq!(t.neighbors8(Location(1, 1)).len(), 8);

        let planar = topology(3, 3, WrapMode::None, WrapMode::None);
        assert_eq!(planar.neighbors8(Location(0, 0)).len(), 3);
    }
}
