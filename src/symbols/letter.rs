use itertools::Itertools;

use crate::cell::Color;
use crate::location::Location;
use crate::validate::Verdict;
use crate::view::{flood, has_empty_border, TileView};

use super::{placement, Anchor, Symbol};

/// All letters with the same character share one region; different characters never do.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct LetterSymbol {
    /// Where the symbol sits.
    pub anchor: Anchor,
    /// Symbols with equal characters are grouped.
    pub letter: char,
}

impl LetterSymbol {
    /// A symbol at `anchor`.
    pub fn new(anchor: Anchor, letter: char) -> Self {
        Self { anchor, letter }
    }

    /// Evaluated against every other letter in `symbols`.
    pub(crate) fn validate_view<V: TileView>(&self, view: &V, symbols: &[Symbol]) -> Verdict {
        let (touching, color) = match placement(view, self.anchor) {
            Ok(placed) => placed,
            Err(positions) => return Verdict::Error(positions),
        };
        if color == Color::Empty {
            return Verdict::Incomplete;
        }

        let region = flood(view, &touching, |c| c == Some(color));
        let mut potential: Option<Vec<Location>> = None;
        let mut complete = touching.iter().all(|location| region.contains(location));

        let others = symbols.iter().filter_map(|symbol| match symbol {
            Symbol::Letter(other) if other != self => Some(other),
            _ => None,
        });
        for other in others {
            let Some(other_touching) = other.anchor.touching(view.topology()) else {
                continue;
            };
            let inside = other_touching.iter().any(|location| region.contains(location));

            if other.letter != self.letter {
                if inside {
                    return Verdict::Error(region);
                }
                continue;
            }

            if !inside {
                let reachable = potential.get_or_insert_with(|| {
                    flood(view, &touching, |c| c == Some(color) || c == Some(Color::Empty))
                });
                if !other_touching.iter().any(|location| reachable.contains(location)) {
                    return Verdict::Error(region.into_iter().chain(other_touching).unique().collect_vec());
                }
                complete = false;
            }
        }

        Verdict::settled(complete && !has_empty_border(view, &region))
    }
}
