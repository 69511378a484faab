use itertools::Itertools;
use petgraph::graphmap::UnGraphMap;
use petgraph::visit::Dfs;
use unordered_pair::UnorderedPair;

use crate::location::Location;

/// Groups of locations that are logically the same cell and must always share a color.
///
/// Stored as an undirected graph; a group is a connected component.
/// Locations never mentioned are in a group of their own.
#[derive(Clone, Debug, Default)]
pub struct Connections {
    graph: UnGraphMap<Location, ()>,
}

impl Connections {
    /// No connections at all.
    pub fn new() -> Self {
        Default::default()
    }

    /// Record that the two `locations` are the same cell. Connecting a location to itself does nothing.
    pub fn connect(&mut self, locations: UnorderedPair<Location>) -> &mut Self {
        let UnorderedPair(a, b) = locations;
        if a != b {
            self.graph.add_edge(a, b, ());
        }
        self
    }

    /// Whether no two locations are connected.
    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    /// The full group `location` belongs to, itself included, in row-major order.
    pub fn connected_locations(&self, location: Location) -> Vec<Location> {
        if !self.graph.contains_node(location) {
            return vec![location];
        }

        let mut dfs = Dfs::new(&self.graph, location);
        let mut group = Vec::new();
        while let Some(next) = dfs.next(&self.graph) {
            group.push(next);
        }
        group.sort();
        group
    }

    /// Whether `a` and `b` are in the same group.
    pub fn is_connected(&self, a: Location, b: Location) -> bool {
        a == b || self.connected_locations(a).contains(&b)
    }

    /// Every group with more than one member.
    pub fn groups(&self) -> Vec<Vec<Location>> {
        let mut seen = Vec::new();
        let mut groups = Vec::new();
        for node in self.graph.nodes().sorted() {
            if seen.contains(&node) {
                continue;
            }
            let group = self.connected_locations(node);
            seen.extend(group.iter().copied());
            groups.push(group);
        }
        groups
    }

    /// Every connected pair, as originally recorded.
    pub fn pairs(&self) -> impl Iterator<Item = UnorderedPair<Location>> + '_ {
        self.graph.all_edges().map(|(a, b, _)| UnorderedPair(a, b))
    }

    /// Keep only pairs whose endpoints both satisfy `keep`.
    pub(crate) fn retain(&self, keep: impl Fn(Location) -> bool) -> Self {
        let mut filtered = Self::new();
        for pair in self.pairs().filter(|UnorderedPair(a, b)| keep(*a) && keep(*b)) {
            filtered.connect(pair);
        }
        filtered
    }
}
