use std::fmt::{Display, Formatter};
use std::num::NonZero;

use itertools::Itertools;
use ndarray::Array2;
use thiserror::Error;

use crate::cell::{Cell, Color};
use crate::connections::Connections;
use crate::instruction::Instruction;
use crate::location::{Dimension, Location};
use crate::rules::Rule;
use crate::shape::{Topology, WrapMode};
use crate::symbols::Symbol;
use crate::view::TileView;

/// Reasons a grid could not be read from fixture rows.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum GridError {
    /// No rows, or an empty first row.
    #[error("a grid needs at least one row and one column")]
    Empty,
    /// A row whose length differs from the first.
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        /// Index of the offending row.
        row: usize,
        /// Cells in that row.
        found: usize,
        /// Cells in the first row.
        expected: usize,
    },
    /// A character outside the fixture notation.
    #[error("unknown cell character {0:?}")]
    UnknownCell(char),
}

/// A puzzle grid: cells, topology, connections and the constraints attached to it.
///
/// Grids are values. Every transform returns a new grid and leaves `self` untouched, so a grid can be shared
/// between evaluations and solver threads freely.
#[derive(Clone, Debug)]
pub struct Grid {
    tiles: Array2<Cell>,
    topology: Topology,
    connections: Connections,
    rules: Vec<Rule>,
    symbols: Vec<Symbol>,
}

impl Grid {
    /// An undetermined grid of the given `(width, height)`.
    pub fn new(dims: (Dimension, Dimension)) -> Self {
        let topology = Topology::new(dims);
        Self {
            tiles: Array2::from_elem(topology.shape(), Cell::default()),
            topology,
            connections: Connections::new(),
            rules: Vec::new(),
            symbols: Vec::new(),
        }
    }

    /// Read a grid written one string per row: `w` light, `b` dark, `n` undetermined, `.` hole.
    /// An uppercase letter marks a fixed cell.
    pub fn from_rows(rows: &[&str]) -> Result<Self, GridError> {
        let width = rows.first().map(|row| row.chars().count()).unwrap_or(0);
        let (Some(w), Some(h)) = (NonZero::new(width), NonZero::new(rows.len())) else {
            return Err(GridError::Empty);
        };

        let mut cells = Vec::with_capacity(width * rows.len());
        for (row, line) in rows.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(GridError::Ragged { row, found, expected: width });
            }
            for c in line.chars() {
                cells.push(Cell::from_char(c).ok_or(GridError::UnknownCell(c))?);
            }
        }

        let mut grid = Self::new((w, h));
        grid.tiles = Array2::from_shape_vec(grid.topology.shape(), cells)
            .map_err(|_| GridError::Empty)?;
        Ok(grid)
    }

    pub(crate) fn from_parts(
        tiles: Array2<Cell>,
        topology: Topology,
        connections: Connections,
        rules: Vec<Rule>,
        symbols: Vec<Symbol>,
    ) -> Self {
        Self { tiles, topology, connections, rules, symbols }
    }

    /// Number of columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.topology.width()
    }

    /// Number of rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.topology.height()
    }

    /// Dimensions and wrap modes.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Every cell, indexed `(row, column)`.
    pub fn tiles(&self) -> &Array2<Cell> {
        &self.tiles
    }

    /// Locations that must share a color.
    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    /// Attached rules in order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Attached symbols in order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Rules first, then symbols, in attachment order.
    pub fn instructions(&self) -> impl Iterator<Item = Instruction<'_>> {
        self.rules.iter()
            .map(Instruction::Rule)
            .chain(self.symbols.iter().map(Instruction::Symbol))
    }

    /// The cell at an in-bounds `location`.
    ///
    /// # Panics
    /// If `location` is outside the grid.
    pub fn tile_at(&self, location: Location) -> Cell {
        self.tiles[location.as_index()]
    }

    /// The cell at signed coordinates after normalization. Positions past a non-wrapping edge read as holes.
    pub fn tile(&self, x: isize, y: isize) -> Cell {
        self.topology
            .normalize(x, y)
            .map_or(Cell::HOLE, |location| self.tile_at(location))
    }

    /// Count cells with the given existence, color and (if given) fixed flag.
    pub fn tile_count(&self, exists: bool, fixed: Option<bool>, color: Color) -> usize {
        self.tiles.iter()
            .filter(|cell| cell.exists == exists && cell.color == color && fixed.map_or(true, |f| cell.fixed == f))
            .count()
    }

    /// The first rule matching `predicate`.
    pub fn find_rule(&self, predicate: impl Fn(&Rule) -> bool) -> Option<&Rule> {
        self.rules.iter().find(|rule| predicate(rule))
    }

    /// The first symbol matching `predicate`.
    pub fn find_symbol(&self, predicate: impl Fn(&Symbol) -> bool) -> Option<&Symbol> {
        self.symbols.iter().find(|symbol| predicate(symbol))
    }

    /// Whether the [`Underclued`](Rule::Underclued) marker is attached.
    pub fn is_underclued(&self) -> bool {
        self.find_rule(|rule| matches!(rule, Rule::Underclued)).is_some()
    }

    /// Whether every existing cell is determined.
    pub fn is_complete(&self) -> bool {
        self.tile_count(true, None, Color::Empty) == 0
    }

    /// Rebuild every cell with `f`.
    pub fn with_tiles(&self, f: impl Fn(Location, Cell) -> Cell) -> Self {
        Self {
            tiles: Array2::from_shape_fn(self.tiles.raw_dim(), |index| f(Location::from(index), self.tiles[index])),
            ..self.clone()
        }
    }

    /// Recolor `location` together with every location connected to it. Holes stay holes.
    pub fn with_color(&self, location: Location, color: Color) -> Self {
        let group = self.connections.connected_locations(location);
        self.with_tiles(|at, cell| {
            if cell.exists && group.contains(&at) {
                cell.with_color(color)
            } else {
                cell
            }
        })
    }

    /// The same grid with new wrap modes for the left/right and top/bottom edges.
    pub fn with_wrap(&self, horizontal: WrapMode, vertical: WrapMode) -> Self {
        Self {
            topology: self.topology.with_wrap(horizontal, vertical),
            ..self.clone()
        }
    }

    /// The same grid with `connections` replacing the current ones.
    pub fn with_connections(&self, connections: Connections) -> Self {
        Self {
            connections,
            ..self.clone()
        }
    }

    /// The same grid with `rules` replacing the current ones.
    pub fn with_rules(&self, rules: Vec<Rule>) -> Self {
        Self {
            rules,
            ..self.clone()
        }
    }

    /// The same grid with `rule` appended.
    pub fn add_rule(&self, rule: Rule) -> Self {
        let mut rules = self.rules.clone();
        rules.push(rule);
        self.with_rules(rules)
    }

    /// The same grid with `symbols` replacing the current ones.
    pub fn with_symbols(&self, symbols: Vec<Symbol>) -> Self {
        Self {
            symbols,
            ..self.clone()
        }
    }

    /// The same grid with `symbol` appended.
    pub fn add_symbol(&self, symbol: Symbol) -> Self {
        let mut symbols = self.symbols.clone();
        symbols.push(symbol);
        self.with_symbols(symbols)
    }

    /// Change the dimensions, anchored at the top left. Overlapping cells are kept and new cells are undetermined.
    /// Symbols and connections that no longer fit are dropped.
    pub fn resized(&self, dims: (Dimension, Dimension)) -> Self {
        let topology = Topology { dims, ..self.topology };
        let tiles = Array2::from_shape_fn(topology.shape(), |index| {
            self.tiles.get(index).copied().unwrap_or_default()
        });
        let connections = self.connections.retain(|Location(x, y)| x < topology.width() && y < topology.height());
        let symbols = self.symbols.iter()
            .filter(|symbol| symbol.anchor().is_in_bounds(&topology))
            .cloned()
            .collect_vec();

        Self {
            tiles,
            topology,
            connections,
            rules: self.rules.clone(),
            symbols,
        }
    }
}

impl TileView for Grid {
    fn topology(&self) -> &Topology {
        &self.topology
    }

    fn color_at(&self, location: Location) -> Option<Color> {
        let cell = self.tile_at(location);
        cell.exists.then_some(cell.color)
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for row in self.tiles.rows() {
            writeln!(f, "{}", row.iter().map(|cell| cell.to_char()).collect::<String>())?;
        }
        Ok(())
    }
}
