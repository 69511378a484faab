use itertools::Itertools;
use ndarray::Array2;

use crate::cell::{Cell, Color};
use crate::grid::Grid;
use crate::location::Location;
use crate::validate::Verdict;
use crate::view::TileView;

/// Forbids a pattern of colors, in any rotation or reflection.
///
/// [`Empty`](Color::Empty) entries in the pattern are wildcards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BanPatternRule {
    /// Indexed `(row, column)`.
    pub pattern: Array2<Color>,
}

impl BanPatternRule {
    /// Ban `pattern` as given.
    pub fn new(pattern: Array2<Color>) -> Self {
        Self { pattern }
    }

    /// Read a pattern in fixture notation. Holes are not meaningful in a pattern and are read as wildcards.
    pub fn from_rows(rows: &[&str]) -> Option<Self> {
        let width = rows.first()?.chars().count();
        if width == 0 || rows.iter().any(|row| row.chars().count() != width) {
            return None;
        }

        let colors = rows.iter()
            .flat_map(|row| row.chars().map(|c| Cell::from_char(c).map(|cell| cell.color)))
            .collect::<Option<Vec<_>>>()?;
        Array2::from_shape_vec((rows.len(), width), colors).ok().map(Self::new)
    }

    /// Every distinct rotation and reflection of the pattern.
    pub fn variants(&self) -> Vec<Array2<Color>> {
        let mut variants: Vec<Array2<Color>> = Vec::with_capacity(8);
        let mut current = self.pattern.clone();
        for _ in 0..4 {
            for candidate in [current.clone(), flip(&current)] {
                if !variants.contains(&candidate) {
                    variants.push(candidate);
                }
            }
            current = rotate(&current);
        }

        variants
    }

    /// Top-left corners at which a pattern of `(rows, cols)` may be laid on the grid.
    /// Wrapped axes admit every offset; planar axes keep the pattern in bounds.
    pub(crate) fn placements<V: TileView>(view: &V, shape: (usize, usize)) -> Vec<(isize, isize)> {
        let topology = view.topology();
        let span = |size: usize, len: usize, wrapping: bool| -> Vec<isize> {
            if wrapping {
                (0..size as isize).collect()
            } else if len > size {
                Vec::new()
            } else {
                (0..=(size - len) as isize).collect()
            }
        };

        let xs = span(topology.width(), shape.1, topology.horizontal.is_wrapping());
        let ys = span(topology.height(), shape.0, topology.vertical.is_wrapping());
        ys.into_iter()
            .cartesian_product(xs)
            .map(|(y, x)| (x, y))
            .collect_vec()
    }

    /// Evaluate the rule on `grid`. Reports the cells of the first matching placement.
    pub fn validate(&self, grid: &Grid) -> Verdict {
        self.validate_view(grid)
    }

    pub(crate) fn validate_view<V: TileView>(&self, view: &V) -> Verdict {
        let mut complete = true;
        for variant in self.variants() {
            for origin in Self::placements(view, variant.dim()) {
                match match_at(view, &variant, origin) {
                    Match::Full(positions) => return Verdict::Error(positions),
                    Match::Possible(_) => complete = false,
                    Match::Impossible => {}
                }
            }
        }

        Verdict::settled(complete)
    }
}

pub(crate) enum Match {
    /// Every determined pattern cell matches; these are the matched cells.
    Full(Vec<Location>),
    /// Nothing contradicts the pattern yet; these cells are still undetermined.
    Possible(Vec<Location>),
    Impossible,
}

/// Compare `pattern` against the grid with its top-left corner at `origin`.
pub(crate) fn match_at<V: TileView>(view: &V, pattern: &Array2<Color>, origin: (isize, isize)) -> Match {
    let mut positions = Vec::new();
    let mut undetermined = Vec::new();
    for ((row, col), expected) in pattern.indexed_iter() {
        if !expected.is_determined() {
            continue;
        }
        let Some(location) = view.topology().normalize(origin.0 + col as isize, origin.1 + row as isize) else {
            return Match::Impossible;
        };
        match view.color_at(location) {
            Some(color) if color == *expected => positions.push(location),
            Some(Color::Empty) => undetermined.push(location),
            _ => return Match::Impossible,
        }
    }

    if undetermined.is_empty() {
        Match::Full(positions.into_iter().sorted().dedup().collect_vec())
    } else {
        Match::Possible(undetermined.into_iter().sorted().dedup().collect_vec())
    }
}

fn rotate(pattern: &Array2<Color>) -> Array2<Color> {
    let (rows, cols) = pattern.dim();
    Array2::from_shape_fn((cols, rows), |(i, j)| pattern[(rows - 1 - j, i)])
}

fn flip(pattern: &Array2<Color>) -> Array2<Color> {
    let (rows, cols) = pattern.dim();
    Array2::from_shape_fn((rows, cols), |(i, j)| pattern[(i, cols - 1 - j)])
}
