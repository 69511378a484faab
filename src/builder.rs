//! Assembling a [`Grid`] cell by cell.

use std::collections::HashSet;
use std::num::NonZero;

use ndarray::Array2;
use unordered_pair::UnorderedPair;

use crate::cell::{Cell, Color};
use crate::connections::Connections;
use crate::grid::Grid;
use crate::location::{Dimension, Location};
use crate::rules::Rule;
use crate::shape::{Topology, WrapMode};
use crate::symbols::Symbol;

/// Reasons a builder may become invalid while building.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BuilderInvalidReason {
    /// A cell, connection or symbol was placed outside the bounds specified by `dims` on a builder.
    FeatureOutOfBounds,
    /// A symbol was placed so that one of the cells it touches does not exist.
    SymbolPlacementInvalid,
}

/// A builder for [`Grid`]s.
///
/// Builders mutate themselves while building but can be [`Clone`]d to save their state at some point.
/// Once any call invalidates the builder, further calls do nothing and [`build`](Self::build) reports every reason.
#[derive(Clone, Debug)]
pub struct GridBuilder {
    // width, height
    dims: (Dimension, Dimension),
    cells: Array2<Cell>,
    invalid_reasons: Vec<BuilderInvalidReason>,
    // holes
    location_blacklist: HashSet<Location>,
    connections: Vec<UnorderedPair<Location>>,
    wrap: (WrapMode, WrapMode),
    rules: Vec<Rule>,
    symbols: Vec<Symbol>,
}

impl Default for GridBuilder {
    fn default() -> Self {
        Self::with_dims((NonZero::<usize>::MIN.saturating_add(4), NonZero::<usize>::MIN.saturating_add(4)))
    }
}

impl GridBuilder {
    /// Construct a new [`Self`] with the specified dimensions, specified in `(x, y)` order.
    pub fn with_dims(dims: (Dimension, Dimension)) -> Self {
        Self {
            dims,
            cells: Array2::from_elem((dims.1.get(), dims.0.get()), Cell::default()),
            invalid_reasons: Default::default(),
            location_blacklist: Default::default(),
            connections: Default::default(),
            wrap: Default::default(),
            rules: Default::default(),
            symbols: Default::default(),
        }
    }

    #[inline]
    fn in_bounds(&self, location: Location) -> bool {
        location.0 < self.dims.0.get() && location.1 < self.dims.1.get()
    }

    /// Run `f` only if the builder is still valid and `location` is in bounds, invalidating it otherwise.
    fn at(&mut self, location: Location, f: impl FnOnce(&mut Self)) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        if !self.in_bounds(location) {
            self.invalid_reasons.push(BuilderInvalidReason::FeatureOutOfBounds);
            return self;
        }

        f(self);
        self
    }

    /// Color the cell at `location`.
    ///
    /// May cause the builder to enter a [`FeatureOutOfBounds`](BuilderInvalidReason::FeatureOutOfBounds) invalid state if `location` is out of bounds.
    /// If the builder is already in an invalid state, this function does nothing.
    pub fn color(&mut self, location: Location, color: Color) -> &mut Self {
        self.at(location, |builder| {
            let cell = &mut builder.cells[location.as_index()];
            *cell = cell.with_color(color);
        })
    }

    /// Color the cell at `location` and mark it as a given which solvers must not change.
    ///
    /// Same conditions as [`Self::color`].
    pub fn fix(&mut self, location: Location, color: Color) -> &mut Self {
        self.at(location, |builder| {
            let cell = &mut builder.cells[location.as_index()];
            *cell = cell.with_color(color).with_fixed(true);
        })
    }

    /// Drop a location from the grid, leaving a hole.
    /// Any color set on this location is discarded regardless of where in the chain this method is called.
    ///
    /// Same conditions as [`Self::color`].
    pub fn drop_location(&mut self, location: Location) -> &mut Self {
        self.at(location, |builder| {
            builder.location_blacklist.insert(location);
        })
    }

    /// Declare the two `locations` the same logical cell.
    ///
    /// May cause the builder to enter a [`FeatureOutOfBounds`](BuilderInvalidReason::FeatureOutOfBounds) invalid state if either location is out of bounds.
    pub fn connect(&mut self, locations: UnorderedPair<Location>) -> &mut Self {
        self.at(locations.0, |_| {}).at(locations.1, |builder| {
            builder.connections.push(locations);
        })
    }

    /// Set the wrap modes of the left/right and top/bottom edges.
    pub fn wrap(&mut self, horizontal: WrapMode, vertical: WrapMode) -> &mut Self {
        self.wrap = (horizontal, vertical);
        self
    }

    /// Attach a rule.
    pub fn add_rule(&mut self, rule: Rule) -> &mut Self {
        if self.invalid_reasons.is_empty() {
            self.rules.push(rule);
        }
        self
    }

    /// Attach a symbol.
    ///
    /// May cause the builder to enter a [`FeatureOutOfBounds`](BuilderInvalidReason::FeatureOutOfBounds) invalid state if its anchor lies outside the grid.
    /// Placement against holes is checked in [`Self::build`], once every hole is known.
    pub fn add_symbol(&mut self, symbol: Symbol) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        if !symbol.anchor().is_in_bounds(&Topology::new(self.dims)) {
            self.invalid_reasons.push(BuilderInvalidReason::FeatureOutOfBounds);
            return self;
        }

        self.symbols.push(symbol);
        self
    }

    /// Check the validity of this builder, ensuring no [`BuilderInvalidReason`] condition has arisen.
    ///
    /// Returns `None` if the builder is valid, `Some(&Vec<BuilderInvalidReason>)` otherwise.
    pub fn is_valid(&self) -> Option<&Vec<BuilderInvalidReason>> {
        if self.invalid_reasons.is_empty() {
            None
        } else {
            Some(&self.invalid_reasons)
        }
    }

    /// Convert the state of this builder into a [`Grid`].
    /// If the builder is invalid for any reason, a reference to a [`Vec`] of [`BuilderInvalidReason`] will indicate why.
    pub fn build(&mut self) -> Result<Grid, &Vec<BuilderInvalidReason>> {
        if !self.invalid_reasons.is_empty() {
            return Err(&self.invalid_reasons);
        }

        let topology = Topology::new(self.dims).with_wrap(self.wrap.0, self.wrap.1);
        let tiles = Array2::from_shape_fn(self.cells.raw_dim(), |index| {
            if self.location_blacklist.contains(&Location::from(index)) {
                Cell::HOLE
            } else {
                self.cells[index]
            }
        });

        let misplaced = self.symbols.iter().any(|symbol| {
            match symbol.anchor().touching(&topology) {
                None => true,
                Some(touching) => touching.iter().any(|location| self.location_blacklist.contains(location)),
            }
        });
        if misplaced {
            self.invalid_reasons.push(BuilderInvalidReason::SymbolPlacementInvalid);
            return Err(&self.invalid_reasons);
        }

        let mut connections = Connections::new();
        for pair in self.connections.iter() {
            connections.connect(*pair);
        }

        Ok(Grid::from_parts(tiles, topology, connections, self.rules.clone(), self.symbols.clone()))
    }
}
