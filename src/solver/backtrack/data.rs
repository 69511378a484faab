//! The compact search state and the interface its constraint modules implement.

use std::sync::Arc;

use itertools::Itertools;
use ndarray::Array2;

use crate::cell::{Cell, Color};
use crate::connections::Connections;
use crate::location::Location;
use crate::shape::Topology;
use crate::symbols::Anchor;
use crate::view::TileView;

/// The compact per-cell state the search runs on.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum BTTile {
    /// Not decided yet.
    #[default]
    Empty,
    /// Dark.
    Dark,
    /// Light.
    Light,
    /// A hole.
    NonExist,
}

impl BTTile {
    /// Only fixed cells are givens; everything else starts undetermined.
    pub(crate) fn from_cell(cell: Cell) -> Self {
        match cell {
            Cell { exists: false, .. } => Self::NonExist,
            Cell { fixed: true, color, .. } => Self::from(color),
            _ => Self::Empty,
        }
    }

    /// The matching [`Color`], or `None` for a hole.
    pub fn color(self) -> Option<Color> {
        match self {
            Self::Empty => Some(Color::Empty),
            Self::Dark => Some(Color::Dark),
            Self::Light => Some(Color::Light),
            Self::NonExist => None,
        }
    }

    /// The other color. Undecided tiles and holes map to themselves.
    pub fn opposite(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
            other => other,
        }
    }
}

impl From<Color> for BTTile {
    fn from(color: Color) -> Self {
        match color {
            Color::Dark => Self::Dark,
            Color::Light => Self::Light,
            Color::Empty => Self::Empty,
        }
    }
}

/// Search state: one [`BTTile`] per cell plus the connection groups, which are shared between branches.
#[derive(Clone, Debug)]
pub struct BTGridData {
    pub(crate) tiles: Array2<BTTile>,
    // for every cell, the cells that must share its color, itself included
    connections: Arc<Array2<Vec<Location>>>,
    topology: Topology,
}

impl BTGridData {
    pub(crate) fn new(tiles: Array2<BTTile>, connections: &Connections, topology: Topology) -> Self {
        let groups = Array2::from_shape_fn(tiles.raw_dim(), |index| {
            connections.connected_locations(Location::from(index))
                .into_iter()
                .filter(|location| {
                    tiles.get(location.as_index()).is_some_and(|tile| *tile != BTTile::NonExist)
                })
                .collect_vec()
        });

        Self {
            tiles,
            connections: Arc::new(groups),
            topology,
        }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.topology.width()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.topology.height()
    }

    /// The tile at an in-bounds `location`.
    pub fn get_tile(&self, location: Location) -> BTTile {
        self.tiles[location.as_index()]
    }

    /// Set `location` and every cell connected to it. Returns the cells that changed.
    pub fn set_tile_with_connection(&mut self, location: Location, tile: BTTile) -> Vec<Location> {
        let mut changed = Vec::new();
        for connected in self.connections[location.as_index()].iter() {
            let slot = &mut self.tiles[connected.as_index()];
            if *slot != tile {
                *slot = tile;
                changed.push(*connected);
            }
        }
        changed
    }

    /// Whether every connection group agrees on its determined color.
    pub(crate) fn connections_consistent(&self) -> bool {
        self.connections.indexed_iter().all(|(index, group)| {
            let own = self.tiles[index];
            own == BTTile::Empty || group.iter().all(|other| {
                let tile = self.get_tile(*other);
                tile == BTTile::Empty || tile == own
            })
        })
    }

    /// Existing 4-neighbors of `location`, following the grid topology.
    pub fn get_edges(&self, location: Location) -> Vec<Location> {
        self.topology
            .neighbors4(location)
            .into_iter()
            .filter(|neighbor| self.get_tile(*neighbor) != BTTile::NonExist)
            .collect_vec()
    }

    /// Undecided cells, row-major.
    pub fn empty_tiles(&self) -> impl Iterator<Item = Location> + '_ {
        self.topology.locations().filter(|location| self.get_tile(*location) == BTTile::Empty)
    }
}

impl TileView for BTGridData {
    fn topology(&self) -> &Topology {
        &self.topology
    }

    fn color_at(&self, location: Location) -> Option<Color> {
        self.get_tile(location).color()
    }
}

/// A dense per-cell flag map, marking cells a module wants reconsidered.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TileMask(Array2<u8>);

impl TileMask {
    /// A map of `grid`'s size with nothing flagged.
    pub fn create(grid: &BTGridData) -> Self {
        Self(Array2::zeros(grid.tiles.raw_dim()))
    }

    /// Flag `location` with `value`; zero clears it.
    pub fn set(&mut self, location: Location, value: u8) {
        self.0[location.as_index()] = value;
    }

    /// The flag at `location`.
    pub fn get(&self, location: Location) -> u8 {
        self.0[location.as_index()]
    }

    pub(crate) fn merge(&mut self, other: &TileMask) {
        self.0.zip_mut_with(&other.0, |mine, theirs| *mine |= *theirs);
    }
}

/// How strongly a module wants the search to branch on `pos` next.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rating {
    /// The undecided cell.
    pub pos: Location,
    /// Summed across modules; the highest total wins.
    pub score: f64,
}

/// What a module learned from a state it accepts.
#[derive(Clone, Debug, Default)]
pub struct CheckResult {
    /// Cells to reconsider, if any.
    pub tiles_need_check: Option<TileMask>,
    /// Branching preferences, if any.
    pub ratings: Option<Vec<Rating>>,
}

/// No completion of the state can satisfy the module.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Rejected;

/// A unit of constraint propagation for the backtracking search.
pub trait BTModule: Send + Sync {
    /// Inspect the whole state.
    fn check_global(&self, grid: &BTGridData) -> Result<CheckResult, Rejected>;

    /// Inspect the state after `changed` cells were just set. `Ok(None)` accepts without new information.
    fn check_local(&self, grid: &BTGridData, _changed: &[Location]) -> Result<Option<CheckResult>, Rejected> {
        self.check_global(grid).map(Some)
    }
}

/// A result that flags and rates the single cell `pos`.
pub fn create_one_tile_result(grid: &BTGridData, pos: Location, score: f64) -> CheckResult {
    let mut tiles_need_check = TileMask::create(grid);
    tiles_need_check.set(pos, 1);

    CheckResult {
        tiles_need_check: Some(tiles_need_check),
        ratings: Some(vec![Rating { pos, score }]),
    }
}

/// Check the cells touching a symbol anchored at `anchor`.
///
/// `Ok(None)` when the anchor is on a single cell or its touching cells are all determined and agree,
/// a result flagging the undetermined ones otherwise.
pub fn check_subtile_placement(grid: &BTGridData, anchor: Anchor) -> Result<Option<CheckResult>, Rejected> {
    if !anchor.is_subtile() {
        return Ok(None);
    }
    let touching = anchor.touching(grid.topology()).ok_or(Rejected)?;

    let mut color = None;
    let mut undetermined = Vec::new();
    for location in touching {
        match grid.get_tile(location) {
            BTTile::NonExist => return Err(Rejected),
            BTTile::Empty => undetermined.push(location),
            tile => {
                if color.is_some_and(|c| c != tile) {
                    return Err(Rejected);
                }
                color = Some(tile);
            }
        }
    }

    if undetermined.is_empty() {
        return Ok(None);
    }

    let mut tiles_need_check = TileMask::create(grid);
    let ratings = undetermined.into_iter()
        .map(|pos| {
            tiles_need_check.set(pos, 1);
            Rating { pos, score: 1.0 }
        })
        .collect_vec();
    Ok(Some(CheckResult {
        tiles_need_check: Some(tiles_need_check),
        ratings: Some(ratings),
    }))
}
