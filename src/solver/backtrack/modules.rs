use itertools::Itertools;
use ndarray::Array2;

use crate::cell::Color;
use crate::location::Location;
use crate::rules::ban_pattern::{match_at, Match};
use crate::rules::{BanPatternRule, CellCountRule, ConnectAllRule, NoLoopsRule};
use crate::symbols::{AreaNumberSymbol, LetterSymbol, Symbol};
use crate::validate::Verdict;
use crate::view::{flood, TileView};

use super::data::{check_subtile_placement, create_one_tile_result, BTGridData, BTModule, BTTile, CheckResult, Rating, Rejected, TileMask};

fn reject_on_error(verdict: Verdict) -> Result<(), Rejected> {
    match verdict {
        Verdict::Error(_) => Err(Rejected),
        _ => Ok(()),
    }
}

/// Flag every location in `ratings` for recheck.
fn rated(grid: &BTGridData, ratings: Vec<Rating>) -> CheckResult {
    let mut tiles_need_check = TileMask::create(grid);
    ratings.iter().for_each(|rating| tiles_need_check.set(rating.pos, 1));
    CheckResult {
        tiles_need_check: Some(tiles_need_check),
        ratings: Some(ratings),
    }
}

/// Undetermined cells 4-adjacent to `region`.
fn frontier(grid: &BTGridData, region: &[Location]) -> Vec<Location> {
    region.iter()
        .flat_map(|location| grid.get_edges(*location))
        .filter(|neighbor| grid.get_tile(*neighbor) == BTTile::Empty)
        .unique()
        .collect_vec()
}

pub(crate) struct NoLoopsModule {
    pub(crate) rule: NoLoopsRule,
}

impl BTModule for NoLoopsModule {
    fn check_global(&self, grid: &BTGridData) -> Result<CheckResult, Rejected> {
        reject_on_error(self.rule.validate_view(grid))?;

        // an undetermined cell between two of the color might close a loop
        let target = BTTile::from(self.rule.color);
        let ratings = grid.empty_tiles()
            .filter_map(|location| {
                let touching = grid.get_edges(location)
                    .into_iter()
                    .filter(|neighbor| grid.get_tile(*neighbor) == target)
                    .count();
                (touching >= 2).then_some(Rating { pos: location, score: touching as f64 })
            })
            .collect_vec();
        Ok(rated(grid, ratings))
    }
}

pub(crate) struct ConnectAllModule {
    pub(crate) rule: ConnectAllRule,
}

impl BTModule for ConnectAllModule {
    fn check_global(&self, grid: &BTGridData) -> Result<CheckResult, Rejected> {
        reject_on_error(self.rule.validate_view(grid))?;

        let color = self.rule.color;
        let Some(seed) = grid.find(|_, c| c == Some(color)) else {
            return Ok(CheckResult::default());
        };
        let region = flood(grid, &[seed], |c| c == Some(color));
        let edge = frontier(grid, &region);
        // a single way out of the region is forced
        if let [exit] = edge[..] {
            return Ok(create_one_tile_result(grid, exit, 4.0));
        }
        Ok(rated(grid, edge.into_iter().map(|pos| Rating { pos, score: 1.0 }).collect_vec()))
    }
}

pub(crate) struct CellCountModule {
    pub(crate) rule: CellCountRule,
}

impl BTModule for CellCountModule {
    fn check_global(&self, grid: &BTGridData) -> Result<CheckResult, Rejected> {
        reject_on_error(self.rule.validate_view(grid))?;

        let target = BTTile::from(self.rule.color);
        let colored = grid.tiles.iter().filter(|tile| **tile == target).count();
        let empty = grid.empty_tiles().collect_vec();
        // either every remaining cell is needed, or none of them may take the color
        if colored == self.rule.count || colored + empty.len() == self.rule.count {
            return Ok(rated(grid, empty.into_iter().map(|pos| Rating { pos, score: 2.0 }).collect_vec()));
        }

        Ok(CheckResult::default())
    }
}

pub(crate) struct BanPatternModule {
    variants: Vec<Array2<Color>>,
}

impl BanPatternModule {
    pub(crate) fn new(rule: &BanPatternRule) -> Self {
        Self { variants: rule.variants() }
    }

    fn check(&self, grid: &BTGridData, touches: impl Fn(&Array2<Color>, (isize, isize)) -> bool) -> Result<CheckResult, Rejected> {
        let mut ratings = Vec::new();
        for variant in self.variants.iter() {
            for origin in BanPatternRule::placements(grid, variant.dim()) {
                if !touches(variant, origin) {
                    continue;
                }
                match match_at(grid, variant, origin) {
                    Match::Full(_) => return Err(Rejected),
                    // the last open cell of a pattern is forced to break it
                    Match::Possible(open) if open.len() == 1 => ratings.push(Rating { pos: open[0], score: 3.0 }),
                    _ => {}
                }
            }
        }

        Ok(rated(grid, ratings))
    }
}

impl BTModule for BanPatternModule {
    fn check_global(&self, grid: &BTGridData) -> Result<CheckResult, Rejected> {
        self.check(grid, |_, _| true)
    }

    /// Only placements covering a changed cell can have started matching.
    fn check_local(&self, grid: &BTGridData, changed: &[Location]) -> Result<Option<CheckResult>, Rejected> {
        let topology = *grid.topology();
        self.check(grid, |variant, origin| {
            variant.indexed_iter().any(|((row, col), _)| {
                topology.normalize(origin.0 + col as isize, origin.1 + row as isize)
                    .is_some_and(|location| changed.contains(&location))
            })
        }).map(Some)
    }
}

pub(crate) struct AreaNumberModule {
    pub(crate) symbol: AreaNumberSymbol,
}

impl BTModule for AreaNumberModule {
    fn check_global(&self, grid: &BTGridData) -> Result<CheckResult, Rejected> {
        if let Some(result) = check_subtile_placement(grid, self.symbol.anchor)? {
            return Ok(result);
        }
        reject_on_error(self.symbol.validate_view(grid))?;

        let Some(touching) = self.symbol.anchor.touching(grid.topology()) else {
            return Err(Rejected);
        };
        let Some(color) = touching.first().and_then(|location| grid.get_tile(*location).color()) else {
            return Err(Rejected);
        };
        if color == Color::Empty {
            return Ok(rated(grid, touching.into_iter().map(|pos| Rating { pos, score: 1.0 }).collect_vec()));
        }

        let region = flood(grid, &touching, |c| c == Some(color));
        // a full region must be walled off
        let score = if region.len() == self.symbol.number { 3.0 } else { 1.0 };
        Ok(rated(grid, frontier(grid, &region).into_iter().map(|pos| Rating { pos, score }).collect_vec()))
    }
}

pub(crate) struct LetterModule {
    pub(crate) letters: Vec<LetterSymbol>,
    // every symbol on the grid, the context letters are judged in
    pub(crate) symbols: Vec<Symbol>,
}

impl BTModule for LetterModule {
    fn check_global(&self, grid: &BTGridData) -> Result<CheckResult, Rejected> {
        let mut ratings = Vec::new();
        for letter in self.letters.iter() {
            if let Some(result) = check_subtile_placement(grid, letter.anchor)? {
                ratings.extend(result.ratings.unwrap_or_default());
                continue;
            }
            reject_on_error(letter.validate_view(grid, &self.symbols))?;

            let touching = letter.anchor.touching(grid.topology()).ok_or(Rejected)?;
            match touching.first().map(|location| grid.get_tile(*location)) {
                Some(BTTile::Empty) => ratings.extend(touching.into_iter().map(|pos| Rating { pos, score: 1.0 })),
                Some(tile) => {
                    let color = tile.color();
                    let region = flood(grid, &touching, |c| c == color);
                    ratings.extend(frontier(grid, &region).into_iter().map(|pos| Rating { pos, score: 1.0 }));
                }
                None => return Err(Rejected),
            }
        }

        Ok(rated(grid, ratings))
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZero;

    use super::*;
    use crate::connections::Connections;
    use crate::shape::Topology;

    fn data(rows: &[&str]) -> BTGridData {
        let (h, w) = (rows.len(), rows[0].len());
        let tiles = Array2::from_shape_fn((h, w), |(y, x)| match rows[y].as_bytes()[x] {
            b'b' => BTTile::Dark,
            b'w' => BTTile::Light,
            b'.' => BTTile::NonExist,
            _ => BTTile::Empty,
        });
        let topology = Topology::new((NonZero::new(w).unwrap(), NonZero::new(h).unwrap()));
        BTGridData::new(tiles, &Connections::new(), topology)
    }

    #[test]
    fn ban_pattern_forces_last_cell() {
        let module = BanPatternModule::new(&BanPatternRule::from_rows(&["bb", "bb"]).unwrap());
        let result = module.check_global(&data(&["bb", "bn"])).unwrap();
        assert_eq!(result.ratings.unwrap(), vec![Rating { pos: Location(1, 1), score: 3.0 }]);

        assert_eq!(module.check_global(&data(&["bb", "bb"])).unwrap_err(), Rejected);
        assert!(module.check_local(&data(&["bb", "bb", "ww"]), &[Location(0, 2)]).unwrap().is_some());
        assert_eq!(module.check_local(&data(&["bb", "bb", "ww"]), &[Location(0, 1)]).unwrap_err(), Rejected);
    }

    #[test]
    fn cell_count_forces_the_rest() {
        let module = CellCountModule { rule: CellCountRule::new(Color::Dark, 2) };
        let result = module.check_global(&data(&["bb", "nn"])).unwrap();
        assert_eq!(result.ratings.unwrap().len(), 2);
        assert_eq!(module.check_global(&data(&["bb", "bn"])).unwrap_err(), Rejected);
    }

    #[test]
    fn no_loops_rates_closing_cells() {
        let module = NoLoopsModule { rule: NoLoopsRule::new(Color::Dark) };
        let result = module.check_global(&data(&["bb", "bn"])).unwrap();
        assert_eq!(result.ratings.unwrap(), vec![Rating { pos: Location(1, 1), score: 2.0 }]);
    }
}
