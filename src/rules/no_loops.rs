use itertools::Itertools;
use ndarray::Array2;

use crate::cell::Color;
use crate::grid::Grid;
use crate::location::Location;
use crate::shape::{NEIGHBOR_OFFSETS, NEIGHBOR_OFFSETS_8};
use crate::validate::Verdict;
use crate::view::TileView;

/// No closed loop of `color` cells may exist.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NoLoopsRule {
    /// The color that may not loop.
    pub color: Color,
}

impl NoLoopsRule {
    /// Forbid loops of `color`.
    pub fn new(color: Color) -> Self {
        Self { color }
    }

    /// Evaluate the rule on `grid`.
    pub fn validate(&self, grid: &Grid) -> Verdict {
        self.validate_view(grid)
    }

    pub(crate) fn validate_view<V: TileView>(&self, view: &V) -> Verdict {
        // a wrapped grid has no edge for the island search below to escape to
        if view.topology().is_wrapped() {
            self.validate_wrapped(view)
        } else {
            self.validate_planar(view)
        }
    }

    /// Walk every component of `color`, never stepping straight back over the edge just used.
    /// Reaching a cell twice means two distinct paths lead there, which closes a loop.
    fn validate_wrapped<V: TileView>(&self, view: &V) -> Verdict {
        let topology = view.topology();
        let mut visited = Array2::from_shape_fn(topology.shape(), |index| {
            match view.color_at(Location::from(index)) {
                None => true,
                Some(color) => color != self.color && color != Color::Empty,
            }
        });

        loop {
            let Some(seed) = view.find(|location, color| !visited[location.as_index()] && color == Some(self.color)) else {
                break;
            };

            let mut invalid = false;
            let mut positions = Vec::new();
            // positions stay in unbounded coordinates so that offsets remain meaningful across seams
            let mut stack: Vec<((isize, isize), Option<(isize, isize)>)> = vec![(seed.signed(), None)];
            while let Some(((x, y), from)) = stack.pop() {
                let Some(location) = topology.normalize(x, y) else {
                    continue;
                };
                positions.push(location);
                if visited[location.as_index()] {
                    invalid = true;
                    continue;
                }
                visited[location.as_index()] = true;

                for offset in NEIGHBOR_OFFSETS {
                    if from.is_some_and(|(fx, fy)| (-offset.0, -offset.1) == (fx, fy)) {
                        continue;
                    }
                    let next = (x + offset.0, y + offset.1);
                    let Some(next_location) = topology.normalize(next.0, next.1) else {
                        continue;
                    };
                    // a reflect seam makes a cell its own neighbor; that is not a path
                    if next_location != location && view.color_at(next_location) == Some(self.color) {
                        stack.push((next, Some(offset)));
                    }
                }
            }

            if invalid {
                return Verdict::Error(positions.into_iter().unique().collect_vec());
            }
        }

        Verdict::settled(visited.iter().all(|seen| *seen))
    }

    /// On a planar grid, a loop encloses an island of other cells that cannot reach the grid edge.
    fn validate_planar<V: TileView>(&self, view: &V) -> Verdict {
        let topology = view.topology();
        let (width, height) = (topology.width(), topology.height());

        // 2x2 blocks enclose nothing but are still loops
        for location in topology.locations() {
            let (x, y) = location.signed();
            let square = [(x, y), (x + 1, y), (x, y + 1), (x + 1, y + 1)];
            if square.iter().all(|(sx, sy)| view.color_at_signed(*sx, *sy) == Some(self.color)) {
                return Verdict::Error(square.iter()
                    .map(|(sx, sy)| Location(*sx as usize, *sy as usize))
                    .collect_vec());
            }
        }

        let mut visited = Array2::from_shape_fn(topology.shape(), |index| {
            view.color_at(Location::from(index)) == Some(self.color)
        });
        let mut shape = Array2::from_elem(topology.shape(), false);
        let mut complete = true;

        loop {
            let seed = view.find(|location, color| !visited[location.as_index()] && color != Some(self.color));
            shape.fill(false);
            let Some(seed) = seed else {
                break;
            };

            let mut is_island = true;
            let mut stack = vec![seed];
            while let Some(location) = stack.pop() {
                if view.color_at(location) == Some(Color::Empty) {
                    complete = false;
                }
                if visited[location.as_index()] {
                    continue;
                }
                visited[location.as_index()] = true;

                for offset in NEIGHBOR_OFFSETS_8 {
                    let (nx, ny) = location.offset_by(offset);
                    match topology.normalize(nx, ny) {
                        Some(next) => {
                            shape[next.as_index()] = true;
                            if view.color_at(next) != Some(self.color) {
                                stack.push(next);
                            }
                        }
                        None => is_island = false,
                    }
                }
            }

            if is_island {
                let outline = topology.locations()
                    .filter(|location| shape[location.as_index()])
                    .filter(|Location(x, y)| {
                        let (x, y) = (*x, *y);
                        let interior = x > 0 && y > 0 && x < width - 1 && y < height - 1
                            && NEIGHBOR_OFFSETS_8.iter().all(|(dx, dy)| {
                                shape[((y as isize + dy) as usize, (x as isize + dx) as usize)]
                            });
                        !interior
                    })
                    .collect_vec();
                return Verdict::Error(outline);
            }
        }

        Verdict::settled(complete)
    }
}
