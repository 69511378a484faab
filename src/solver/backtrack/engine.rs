use std::ops::ControlFlow;

use ndarray::Array2;

use crate::location::Location;
use crate::solver::CancellationToken;

use super::data::{BTGridData, BTModule, BTTile, TileMask};

/// Depth-first search over [`BTGridData`], pruned by a list of modules.
pub(crate) struct Engine<'a> {
    modules: &'a [Box<dyn BTModule>],
    token: &'a CancellationToken,
    color_order: [BTTile; 2],
    pub(crate) nodes: usize,
}

impl<'a> Engine<'a> {
    pub(crate) fn new(modules: &'a [Box<dyn BTModule>], token: &'a CancellationToken, color_order: [BTTile; 2]) -> Self {
        Self {
            modules,
            token,
            color_order,
            nodes: 0,
        }
    }

    /// Run every module, returning the aggregate score map and recheck mask, or `None` if any module rejects.
    fn check(&self, grid: &BTGridData, changed: &[Location]) -> Option<(Array2<f64>, TileMask)> {
        let mut scores = Array2::zeros(grid.tiles.raw_dim());
        let mut mask = TileMask::create(grid);

        for module in self.modules {
            let result = if changed.is_empty() {
                module.check_global(grid).map(Some)
            } else {
                module.check_local(grid, changed)
            };
            let Ok(result) = result else {
                return None;
            };
            let Some(result) = result else {
                continue;
            };

            if let Some(tiles) = result.tiles_need_check {
                mask.merge(&tiles);
            }
            for rating in result.ratings.unwrap_or_default() {
                scores[rating.pos.as_index()] += rating.score;
                mask.set(rating.pos, 1);
            }
        }

        Some((scores, mask))
    }

    /// The flagged undetermined cell with the highest score, lowest row-major index first.
    /// Falls back to the first undetermined cell.
    fn pick(grid: &BTGridData, scores: &Array2<f64>, mask: &TileMask) -> Option<Location> {
        let mut best: Option<(Location, f64)> = None;
        let mut first = None;
        for location in grid.empty_tiles() {
            first.get_or_insert(location);
            if mask.get(location) == 0 {
                continue;
            }
            let score = scores[location.as_index()];
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((location, score));
            }
        }

        best.map(|(location, _)| location).or(first)
    }

    /// Explore every completion of `grid`, calling `on_solution` for each. `changed` lists the cells set since the
    /// parent node; an empty list asks modules for a global check.
    pub(crate) fn search(
        &mut self,
        grid: BTGridData,
        changed: &[Location],
        on_solution: &mut dyn FnMut(&BTGridData) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        if self.token.is_cancelled() {
            return ControlFlow::Break(());
        }
        self.nodes += 1;

        let Some((scores, mask)) = self.check(&grid, changed) else {
            return ControlFlow::Continue(());
        };

        let Some(next) = Self::pick(&grid, &scores, &mask) else {
            // a leaf is checked globally once more so local checks cannot let anything slip
            if !changed.is_empty() && self.check(&grid, &[]).is_none() {
                return ControlFlow::Continue(());
            }
            return on_solution(&grid);
        };

        for tile in self.color_order {
            let mut branch = grid.clone();
            let set = branch.set_tile_with_connection(next, tile);
            self.search(branch, &set, on_solution)?;
        }

        ControlFlow::Continue(())
    }
}
